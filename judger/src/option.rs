use std::{path::PathBuf, time::Duration};

use chrono::Local;
use clap::{Parser, Subcommand};
use judge_core::{compiler::Language, judge::JudgeSettings};
use std::io::Write;

#[derive(Parser, Debug, Clone)]
#[command(name = "judger", about = "Judges submissions inside isolate boxes")]
pub struct JudgerOpt {
    /// For loading Opt from .env file
    #[arg(long, default_value = ".env")]
    pub env_path: PathBuf,
    #[arg(long, default_value = "override.env")]
    pub override_env_path: PathBuf,

    #[command(subcommand)]
    pub cmd: JudgerCommand,

    #[arg(long, env = "ISOLATE_PATH", default_value = "isolate")]
    pub isolate_path: PathBuf,
    /// Where per-submission sources, artifacts and sidecars are kept
    #[arg(long, env = "RUNTIME_DIR", default_value = "/tmp/judger")]
    pub runtime_dir: PathBuf,
    /// Host compile timeout in seconds
    #[arg(long, env = "COMPILE_TIMEOUT", default_value_t = 30)]
    pub compile_timeout: u64,
    /// Seconds of wall time allowed beyond the CPU time limit
    #[arg(long, env = "WALL_TIME_GRACE", default_value_t = 1.0)]
    pub wall_time_grace: f64,
}

#[derive(Subcommand, Debug, Clone)]
pub enum JudgerCommand {
    /// Accept submissions over HTTP, fetching tasks from and reporting to the platform
    Serve {
        #[arg(long, env = "PLATFORM_URI", default_value = "http://localhost:8080/")]
        platform_uri: String,
        #[arg(long, env = "SECRET_KEY", default_value = "")]
        secret_key: String,
        #[arg(long, env = "PORT", default_value_t = 8000)]
        port: u16,
        /// Number of isolate boxes, which bounds concurrent judging
        #[arg(
            long,
            env = "BOX_COUNT",
            default_value_t = 4,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        box_count: u32,
        #[arg(long, env = "FIRST_BOX_ID", default_value_t = 0)]
        first_box_id: u32,
    },
    /// Judge a local source file against a task file and print the outcome
    Judge {
        #[arg(short, long)]
        language: Language,
        #[arg(short, long)]
        src_path: PathBuf,
        /// Task info JSON, same shape as the platform serves
        #[arg(short, long)]
        task_file: PathBuf,
        #[arg(long, default_value_t = 0)]
        box_id: u32,
    },
}

impl JudgerOpt {
    pub fn judge_settings(&self) -> JudgeSettings {
        JudgeSettings {
            runtime_dir: self.runtime_dir.clone(),
            wall_time_grace: self.wall_time_grace,
            compile_timeout: Duration::from_secs(self.compile_timeout),
        }
    }
}

/// Try to load env from a .env file, if not found, fallback to ENV
pub fn load_option() -> JudgerOpt {
    // First load env_path from Args
    let opt = JudgerOpt::parse();
    if opt.env_path.exists() {
        println!("loading env from file: {:?}", opt.env_path);
        dotenv::from_path(&opt.env_path).ok();
    } else {
        println!("loading env from ENV");
        dotenv::dotenv().ok();
    }
    if opt.override_env_path.exists() {
        println!(
            "loading override env from file: {:?}",
            opt.override_env_path
        );
        dotenv::from_path(&opt.override_env_path).ok();
    }

    setup_logger();

    // Load opt again with ENV
    let opt = JudgerOpt::parse();
    log::debug!("load opt: {:?}", opt);
    opt
}

fn setup_logger() {
    let env = env_logger::Env::default().default_filter_or("debug");
    env_logger::Builder::from_env(env)
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:5} [{}:{}] {}",
                Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.file().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                &record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_judge_command() {
        let opt = JudgerOpt::try_parse_from([
            "judger",
            "--runtime-dir",
            "/var/tmp/judger",
            "judge",
            "--language",
            "cpp",
            "--src-path",
            "main.cpp",
            "--task-file",
            "task.json",
        ])
        .unwrap();
        match opt.cmd {
            JudgerCommand::Judge {
                language,
                ref src_path,
                box_id,
                ..
            } => {
                assert_eq!(language, Language::Cpp);
                assert_eq!(src_path, &PathBuf::from("main.cpp"));
                assert_eq!(box_id, 0);
            }
            _ => panic!("expected judge command"),
        }
        let settings = opt.judge_settings();
        assert_eq!(settings.runtime_dir, PathBuf::from("/var/tmp/judger"));
    }

    #[test]
    fn test_unknown_language_is_rejected() {
        let result = JudgerOpt::try_parse_from([
            "judger",
            "judge",
            "--language",
            "brainfuck",
            "--src-path",
            "a",
            "--task-file",
            "b",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_box_count_is_rejected() {
        let result = JudgerOpt::try_parse_from(["judger", "serve", "--box-count", "0"]);
        assert!(result.is_err());

        let opt = JudgerOpt::try_parse_from(["judger", "serve", "--box-count", "2"]).unwrap();
        match opt.cmd {
            JudgerCommand::Serve { box_count, .. } => assert_eq!(box_count, 2),
            _ => panic!("expected serve command"),
        }
    }
}
