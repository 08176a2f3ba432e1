use std::sync::Arc;

use judge_core::{
    judge::{
        result::{JudgeOutcome, JudgeVerdict},
        Judge, Submission,
    },
    sandbox::{pool::PoolState, BoxPool},
};

use crate::agent::ResultReporter;

pub struct JudgeWorker {
    judge: Judge,
    pool: BoxPool,
    reporter: Arc<dyn ResultReporter>,
}

impl JudgeWorker {
    pub fn new(judge: Judge, pool: BoxPool, reporter: Arc<dyn ResultReporter>) -> Self {
        Self {
            judge,
            pool,
            reporter,
        }
    }

    pub fn pool_state(&self) -> PoolState {
        self.pool.state()
    }

    /// Blocks until a box is free, judges, then reports. Nothing is retried.
    pub fn run_judge(&self, submission: Submission) -> Result<JudgeOutcome, anyhow::Error> {
        let outcome = {
            let lease = self.pool.lease();
            self.judge.judge(&lease, &submission).map_err(|e| {
                anyhow::anyhow!(
                    "Failed to judge submission {}: {}",
                    submission.submission_id,
                    e
                )
            })?
        };

        match outcome.terminal_verdict() {
            Some(verdict) => log::info!(
                "Submission {} finished with {}",
                submission.submission_id,
                verdict
            ),
            None => {
                let results = outcome.test_case_results();
                let accepted = results
                    .iter()
                    .filter(|result| result.verdict == JudgeVerdict::Accepted)
                    .count();
                log::info!(
                    "Submission {} passed {}/{} test cases",
                    submission.submission_id,
                    accepted,
                    results.len()
                );
            }
        }

        self.reporter
            .report(&submission.submission_id, &outcome)
            .map_err(|e| {
                anyhow::anyhow!(
                    "Report of submission {} failed: {}",
                    submission.submission_id,
                    e
                )
            })?;
        log::info!("Submission {:?} report success", submission.submission_id);
        Ok(outcome)
    }
}
