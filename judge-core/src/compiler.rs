use std::{
    collections::HashMap,
    fmt,
    fs::{self, File},
    io,
    path::Path,
    process::{Child, Command, Stdio},
    str::FromStr,
    time::Duration,
};

use lazy_static::lazy_static;
use serde_derive::{Deserialize, Serialize};
use wait_timeout::ChildExt;

use crate::{error::JudgeCoreError, utils::get_pathbuf_str};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "c")]
    C,
    #[serde(rename = "cpp")]
    Cpp,
    #[serde(rename = "ocaml")]
    OCaml,
    #[serde(rename = "pas")]
    Pascal,
    #[serde(rename = "kt")]
    Kotlin,
    #[serde(rename = "py")]
    Python,
}

impl Language {
    pub const ALL: [Language; 6] = [
        Self::C,
        Self::Cpp,
        Self::OCaml,
        Self::Pascal,
        Self::Kotlin,
        Self::Python,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Self::C => "c",
            Self::Cpp => "cpp",
            Self::OCaml => "ocaml",
            Self::Pascal => "pas",
            Self::Kotlin => "kt",
            Self::Python => "py",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for Language {
    type Err = JudgeCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|language| language.token() == s)
            .copied()
            .ok_or_else(|| JudgeCoreError::UnsupportedLanguage(s.to_string()))
    }
}

/// A command line with `{source}` and `{executable}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandTemplate {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        }
    }

    /// Program followed by its arguments, placeholders substituted.
    pub fn render(&self, source: &str, executable: &str) -> Vec<String> {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|part| {
                part.replace("{source}", source)
                    .replace("{executable}", executable)
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct LanguageDescriptor {
    pub extension: String,
    /// File name of what gets copied into the box. For interpreted
    /// languages this is the source file itself.
    pub artifact_name: String,
    pub compile: Option<CommandTemplate>,
    /// Rendered with box-relative file names.
    pub run: CommandTemplate,
}

impl LanguageDescriptor {
    pub fn source_name(&self) -> String {
        format!("code.{}", self.extension)
    }

    pub fn needs_compile(&self) -> bool {
        self.compile.is_some()
    }

    pub fn run_args(&self) -> Vec<String> {
        self.run.render(&self.source_name(), &self.artifact_name)
    }
}

fn native(extension: &str, compile: CommandTemplate) -> LanguageDescriptor {
    LanguageDescriptor {
        extension: extension.to_string(),
        artifact_name: "code".to_string(),
        compile: Some(compile),
        run: CommandTemplate::new("./{executable}", &[]),
    }
}

lazy_static! {
    static ref BUILTIN_LANGUAGES: HashMap<Language, LanguageDescriptor> = {
        let mut languages = HashMap::new();
        languages.insert(
            Language::C,
            native(
                "c",
                CommandTemplate::new("gcc", &["-O2", "-o", "{executable}", "{source}"]),
            ),
        );
        languages.insert(
            Language::Cpp,
            native(
                "cpp",
                CommandTemplate::new("g++", &["-O2", "-o", "{executable}", "{source}"]),
            ),
        );
        languages.insert(
            Language::OCaml,
            native(
                "ml",
                CommandTemplate::new("ocamlopt", &["-S", "-o", "{executable}", "{source}"]),
            ),
        );
        languages.insert(
            Language::Pascal,
            native(
                "pas",
                CommandTemplate::new(
                    "fpc",
                    &["-O2", "-Sg", "-v0", "-XS", "{source}", "-o{executable}"],
                ),
            ),
        );
        languages.insert(
            Language::Kotlin,
            LanguageDescriptor {
                extension: "kt".to_string(),
                artifact_name: "code.jar".to_string(),
                compile: Some(CommandTemplate::new(
                    "kotlinc",
                    &["{source}", "-include-runtime", "-d", "{executable}"],
                )),
                run: CommandTemplate::new("java", &["-jar", "{executable}"]),
            },
        );
        languages.insert(
            Language::Python,
            LanguageDescriptor {
                extension: "py".to_string(),
                artifact_name: "code.py".to_string(),
                compile: None,
                run: CommandTemplate::new("/usr/bin/python3", &["{source}"]),
            },
        );
        languages
    };
}

/// Maps a language to its build and run commands.
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: HashMap<Language, LanguageDescriptor>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl LanguageRegistry {
    pub fn builtin() -> Self {
        Self {
            languages: BUILTIN_LANGUAGES.clone(),
        }
    }

    pub fn with(mut self, language: Language, descriptor: LanguageDescriptor) -> Self {
        self.languages.insert(language, descriptor);
        self
    }

    pub fn get(&self, language: Language) -> Result<&LanguageDescriptor, JudgeCoreError> {
        self.languages
            .get(&language)
            .ok_or_else(|| JudgeCoreError::UnsupportedLanguage(language.to_string()))
    }
}

#[derive(Debug, PartialEq)]
pub enum CompileOutcome {
    Success,
    Failed { exit_code: Option<i32>, log: String },
    TimedOut,
}

impl CompileOutcome {
    pub fn is_success(&self) -> bool {
        *self == Self::Success
    }
}

/// Kills `child` and waits for it. The child may already have exited on its own.
fn kill_and_reap(child: &mut Child) -> io::Result<()> {
    match child.kill() {
        Err(e) if e.kind() != io::ErrorKind::InvalidInput => return Err(e),
        _ => {}
    }
    child.wait()?;
    Ok(())
}

pub struct Compiler<'a> {
    template: &'a CommandTemplate,
    timeout: Duration,
}

impl<'a> Compiler<'a> {
    pub fn new(template: &'a CommandTemplate, timeout: Duration) -> Self {
        Self { template, timeout }
    }

    /// Runs the toolchain on the host. Diagnostics go to `log_path`.
    pub fn compile(
        &self,
        src_path: &Path,
        target_path: &Path,
        log_path: &Path,
    ) -> Result<CompileOutcome, JudgeCoreError> {
        let command = self
            .template
            .render(&get_pathbuf_str(src_path)?, &get_pathbuf_str(target_path)?);
        log::debug!("Compiling with {:?}", command);

        let log_file = File::create(log_path)?;
        let mut child = Command::new(&command[0])
            .args(&command[1..])
            .stdin(Stdio::null())
            .stdout(log_file.try_clone()?)
            .stderr(log_file)
            .spawn()?;

        let status = match child.wait_timeout(self.timeout)? {
            Some(status) => status,
            None => {
                log::warn!("Compiler exceeded {:?}, killing it", self.timeout);
                kill_and_reap(&mut child)?;
                return Ok(CompileOutcome::TimedOut);
            }
        };

        let log = fs::read_to_string(log_path).unwrap_or_default();
        if !log.is_empty() {
            log::debug!("Compiler output:\n{}", log);
        }
        if status.success() {
            Ok(CompileOutcome::Success)
        } else {
            Ok(CompileOutcome::Failed {
                exit_code: status.code(),
                log,
            })
        }
    }
}
