use std::{fs, io, path::Path};

use crate::{
    error::JudgeCoreError,
    sandbox::{ExecutionMetadata, RunLimits, RunRequest, SandboxSession},
    task::TaskInfo,
};

/// Wall clock allowance on top of the CPU limit. Catches programs that sleep.
pub const DEFAULT_WALL_TIME_GRACE: f64 = 1.0;

pub fn limits_for(task: &TaskInfo, wall_time_grace: f64) -> RunLimits {
    RunLimits {
        time_limit: task.time_limit,
        wall_time_limit: task.time_limit + wall_time_grace,
        memory_limit_kb: task.memory_limit_kb(),
    }
}

#[derive(Debug)]
pub struct RunOutput {
    pub stdout: Vec<u8>,
    pub metadata: ExecutionMetadata,
}

/// Runs the program once on `input`. Interpretation of the result is left to the caller.
pub fn run_test_case(
    session: &SandboxSession,
    limits: RunLimits,
    args: &[String],
    input: &str,
    metadata_path: &Path,
) -> Result<RunOutput, JudgeCoreError> {
    // A sidecar left over from the previous case must not be mistaken for this one.
    match fs::remove_file(metadata_path) {
        Err(e) if e.kind() != io::ErrorKind::NotFound => return Err(e.into()),
        _ => {}
    }

    let stdout = session.run(&RunRequest {
        limits,
        metadata_path,
        args,
        stdin: input,
    })?;
    let metadata = ExecutionMetadata::load(metadata_path)?;
    log::debug!("Run metadata: {:?}", metadata);
    Ok(RunOutput { stdout, metadata })
}
