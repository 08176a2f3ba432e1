use std::path::{Path, PathBuf};

use serde_derive::Serialize;

use crate::error::JudgeCoreError;

pub mod isolate;
pub mod meta;
pub mod pool;

pub use isolate::Isolate;
pub use meta::{ExecutionMetadata, SandboxStatus};
pub use pool::{BoxLease, BoxPool};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunLimits {
    /// CPU seconds.
    pub time_limit: f64,
    /// Wall clock seconds.
    pub wall_time_limit: f64,
    pub memory_limit_kb: u64,
}

#[derive(Debug, Clone)]
pub struct RunRequest<'a> {
    pub limits: RunLimits,
    /// Host path the sandbox writes its metadata sidecar to.
    pub metadata_path: &'a Path,
    /// Command line, relative to the box directory.
    pub args: &'a [String],
    pub stdin: &'a str,
}

/// An isolation environment addressed by a small integer box id.
///
/// All calls block until the underlying process finishes.
pub trait Sandbox: Send + Sync {
    /// Prepares box `box_id` and returns the directory that the program will see.
    fn init(&self, box_id: u32) -> Result<PathBuf, JudgeCoreError>;
    /// Runs `request.args` in the box and returns its captured stdout.
    fn run(&self, box_id: u32, request: &RunRequest) -> Result<Vec<u8>, JudgeCoreError>;
    fn cleanup(&self, box_id: u32) -> Result<(), JudgeCoreError>;
}

/// An initialized box. Cleanup runs exactly once: through [`SandboxSession::finish`]
/// or, if the session is abandoned (for example while unwinding), on drop.
pub struct SandboxSession<'a> {
    sandbox: &'a dyn Sandbox,
    box_id: u32,
    box_path: PathBuf,
    cleaned: bool,
}

impl<'a> SandboxSession<'a> {
    pub fn init(sandbox: &'a dyn Sandbox, box_id: u32) -> Result<Self, JudgeCoreError> {
        let box_path = sandbox.init(box_id)?;
        log::debug!("Box {} initialized at {:?}", box_id, box_path);
        Ok(Self {
            sandbox,
            box_id,
            box_path,
            cleaned: false,
        })
    }

    pub fn box_id(&self) -> u32 {
        self.box_id
    }

    pub fn box_path(&self) -> &Path {
        &self.box_path
    }

    pub fn run(&self, request: &RunRequest) -> Result<Vec<u8>, JudgeCoreError> {
        self.sandbox.run(self.box_id, request)
    }

    pub fn finish(mut self) -> Result<(), JudgeCoreError> {
        self.cleaned = true;
        self.sandbox.cleanup(self.box_id)
    }
}

impl Drop for SandboxSession<'_> {
    fn drop(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        log::warn!("Box {} abandoned, cleaning up", self.box_id);
        if let Err(e) = self.sandbox.cleanup(self.box_id) {
            log::error!("Failed to clean up box {}: {}", self.box_id, e);
        }
    }
}
