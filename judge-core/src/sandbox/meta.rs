use std::{fs, path::Path, str::FromStr};

use crate::error::JudgeCoreError;

/// Abnormal termination reported by the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SandboxStatus {
    /// `RE`: non-zero exit code.
    RuntimeError,
    /// `SG`: killed by a signal.
    Signaled,
    /// `XX`: the sandbox itself failed while running the program.
    InternalError,
    /// `TO`: time or wall time limit hit.
    TimedOut,
    Other(String),
}

impl FromStr for SandboxStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "RE" => Self::RuntimeError,
            "SG" => Self::Signaled,
            "XX" => Self::InternalError,
            "TO" => Self::TimedOut,
            other => Self::Other(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionMetadata {
    pub status: Option<SandboxStatus>,
    /// CPU seconds.
    pub time: f64,
    pub max_rss_kb: u64,
    pub time_wall: Option<f64>,
    pub exit_code: Option<i32>,
    pub exit_signal: Option<i32>,
    pub message: Option<String>,
}

impl ExecutionMetadata {
    pub fn memory_used_mb(&self) -> f64 {
        self.max_rss_kb as f64 / 1024.0
    }

    pub fn load(path: &Path) -> Result<Self, JudgeCoreError> {
        let content = fs::read_to_string(path).map_err(|e| {
            JudgeCoreError::MetadataError(format!("cannot read {:?}: {}", path, e))
        })?;
        content.parse()
    }
}

fn parse_field<T: FromStr>(key: &str, value: &str) -> Result<T, JudgeCoreError> {
    value
        .parse()
        .map_err(|_| JudgeCoreError::MetadataError(format!("invalid {}: {:?}", key, value)))
}

impl FromStr for ExecutionMetadata {
    type Err = JudgeCoreError;

    /// One `key:value` pair per line; unknown keys are ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut status: Option<SandboxStatus> = None;
        let mut time: Option<f64> = None;
        let mut max_rss_kb: Option<u64> = None;
        let mut time_wall: Option<f64> = None;
        let mut exit_code: Option<i32> = None;
        let mut exit_signal: Option<i32> = None;
        let mut message: Option<String> = None;

        for line in s.lines().map(str::trim).filter(|line| !line.is_empty()) {
            let (key, value) = line.split_once(':').ok_or_else(|| {
                JudgeCoreError::MetadataError(format!("malformed line: {:?}", line))
            })?;
            let value = value.trim();
            match key.trim() {
                "status" if !value.is_empty() => status = Some(parse_field(key, value)?),
                "time" => time = Some(parse_field(key, value)?),
                "max-rss" => max_rss_kb = Some(parse_field(key, value)?),
                "time-wall" => time_wall = Some(parse_field(key, value)?),
                "exitcode" => exit_code = Some(parse_field(key, value)?),
                "exitsig" => exit_signal = Some(parse_field(key, value)?),
                "message" => message = Some(value.to_string()),
                _ => {}
            }
        }

        Ok(Self {
            status,
            time: time.ok_or_else(|| JudgeCoreError::MetadataError("missing time".into()))?,
            max_rss_kb: max_rss_kb
                .ok_or_else(|| JudgeCoreError::MetadataError("missing max-rss".into()))?,
            time_wall,
            exit_code,
            exit_signal,
            message,
        })
    }
}
