pub mod http;
pub mod platform;

use judge_core::judge::result::JudgeOutcome;

use crate::error::ClientError;

/// Destination of finished judging outcomes.
pub trait ResultReporter: Send + Sync {
    fn report(&self, submission_id: &str, outcome: &JudgeOutcome) -> Result<(), ClientError>;
}

/// Prints outcomes for local runs.
pub struct StdoutReporter;

impl ResultReporter for StdoutReporter {
    fn report(&self, submission_id: &str, outcome: &JudgeOutcome) -> Result<(), ClientError> {
        log::debug!("Printing outcome of {}", submission_id);
        println!("{}", serde_json::to_string_pretty(outcome)?);
        Ok(())
    }
}
