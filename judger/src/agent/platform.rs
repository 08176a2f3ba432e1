use judge_core::{
    error::JudgeCoreError,
    judge::result::JudgeOutcome,
    task::{TaskInfo, TaskInfoProvider},
};

use super::{http::HttpClient, ResultReporter};
use crate::error::ClientError;

/// Talks to the platform that owns tasks and submissions.
pub struct PlatformClient {
    client: HttpClient,
}

impl PlatformClient {
    pub fn new(base_url: &str, secret_key: &str) -> Result<Self, ClientError> {
        Ok(Self {
            client: HttpClient::new(base_url, secret_key)?,
        })
    }

    pub fn fetch_task_info(&self, task_id: &str) -> Result<TaskInfo, ClientError> {
        let response = self
            .client
            .get(&task_info_path(task_id))?
            .send()?
            .error_for_status()?;
        let task_info = response.json::<TaskInfo>()?;
        log::debug!(
            "Fetched task {} with {} test cases",
            task_id,
            task_info.test_cases.len()
        );
        Ok(task_info)
    }

    pub fn report_outcome(
        &self,
        submission_id: &str,
        outcome: &JudgeOutcome,
    ) -> Result<(), ClientError> {
        self.client
            .post(&report_path(submission_id))?
            .json(outcome)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

fn task_info_path(task_id: &str) -> String {
    format!("task/{}/info", task_id)
}

fn report_path(submission_id: &str) -> String {
    format!("submission/{}/report", submission_id)
}

impl TaskInfoProvider for PlatformClient {
    fn fetch(&self, task_id: &str) -> Result<TaskInfo, JudgeCoreError> {
        self.fetch_task_info(task_id)
            .map_err(|e| JudgeCoreError::TaskInfoError(format!("task {}: {}", task_id, e)))
    }
}

impl ResultReporter for PlatformClient {
    fn report(&self, submission_id: &str, outcome: &JudgeOutcome) -> Result<(), ClientError> {
        self.report_outcome(submission_id, outcome)
    }
}
