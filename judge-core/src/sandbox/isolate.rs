use std::{
    io::Write,
    path::{Path, PathBuf},
    process::{Command, Output, Stdio},
    thread,
};

use super::{RunLimits, RunRequest, Sandbox};
use crate::{error::JudgeCoreError, utils::get_pathbuf_str};

/// Drives the `isolate` command line tool.
#[derive(Debug, Clone)]
pub struct Isolate {
    binary: PathBuf,
}

impl Default for Isolate {
    fn default() -> Self {
        Self::new(PathBuf::from("isolate"))
    }
}

impl Isolate {
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }

    fn command(&self, box_id: u32) -> Command {
        let mut command = Command::new(&self.binary);
        command.arg("-b").arg(box_id.to_string());
        command
    }

    fn check_status(output: &Output, action: &str, box_id: u32) -> Result<(), JudgeCoreError> {
        if output.status.success() {
            return Ok(());
        }
        Err(JudgeCoreError::SandboxError(format!(
            "{} of box {} exited with {}: {}",
            action,
            box_id,
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

/// Arguments after `isolate -b <id>` for one run.
pub fn run_args(
    limits: &RunLimits,
    metadata_path: &Path,
    args: &[String],
) -> Result<Vec<String>, JudgeCoreError> {
    let mut run_args = vec![
        "-M".to_string(),
        get_pathbuf_str(metadata_path)?,
        "-t".to_string(),
        limits.time_limit.to_string(),
        "-w".to_string(),
        limits.wall_time_limit.to_string(),
        "-m".to_string(),
        limits.memory_limit_kb.to_string(),
        "--stderr-to-stdout".to_string(),
        "--silent".to_string(),
        "--run".to_string(),
        "--".to_string(),
    ];
    run_args.extend(args.iter().cloned());
    Ok(run_args)
}

impl Sandbox for Isolate {
    fn init(&self, box_id: u32) -> Result<PathBuf, JudgeCoreError> {
        let output = self
            .command(box_id)
            .arg("--init")
            .stdin(Stdio::null())
            .output()?;
        Self::check_status(&output, "init", box_id)?;
        let workdir = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if workdir.is_empty() {
            return Err(JudgeCoreError::SandboxError(format!(
                "init of box {} printed no directory",
                box_id
            )));
        }
        Ok(PathBuf::from(workdir).join("box"))
    }

    fn run(&self, box_id: u32, request: &RunRequest) -> Result<Vec<u8>, JudgeCoreError> {
        let mut child = self
            .command(box_id)
            .args(run_args(
                &request.limits,
                request.metadata_path,
                request.args,
            )?)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        // Feed stdin from another thread so a chatty program cannot deadlock us.
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| JudgeCoreError::SandboxError("stdin not piped".to_string()))?;
        let input = request.stdin.to_owned();
        let writer = thread::spawn(move || {
            // The program may exit without reading everything.
            if let Err(e) = stdin.write_all(input.as_bytes()) {
                log::debug!("Stopped writing input: {}", e);
            }
        });

        let output = child.wait_with_output()?;
        if writer.join().is_err() {
            log::warn!("Input writer for box {} panicked", box_id);
        }
        // Non-zero exit is expected whenever the program fails; the sidecar tells why.
        log::debug!(
            "Run in box {} finished with {}, {} bytes of output",
            box_id,
            output.status,
            output.stdout.len()
        );
        if !output.stderr.is_empty() {
            log::debug!(
                "isolate stderr: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output.stdout)
    }

    fn cleanup(&self, box_id: u32) -> Result<(), JudgeCoreError> {
        let output = self
            .command(box_id)
            .arg("--cleanup")
            .stdin(Stdio::null())
            .output()?;
        Self::check_status(&output, "cleanup", box_id)
    }
}
