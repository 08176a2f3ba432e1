use std::{fs, path::Path};

use serde_derive::{Deserialize, Serialize};

use crate::{
    compiler::Language,
    error::{path_not_exist, JudgeCoreError},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub subtask: i32,
    pub test_case: i32,
    pub input: String,
    /// Expected output. Only optional when a grader decides correctness.
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    /// Seconds of CPU time per test case.
    pub time_limit: f64,
    /// Megabytes.
    pub memory_limit: u64,
    #[serde(default)]
    pub grader: bool,
    #[serde(default)]
    pub grader_source_code: Option<String>,
    #[serde(default)]
    pub grader_language: Option<Language>,
    pub test_cases: Vec<TestCase>,
}

impl TaskInfo {
    pub fn from_json(json: &str) -> Result<Self, JudgeCoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn memory_limit_kb(&self) -> u64 {
        self.memory_limit * 1024
    }
}

/// Source of task definitions. Calls block the judging thread.
pub trait TaskInfoProvider: Send + Sync {
    fn fetch(&self, task_id: &str) -> Result<TaskInfo, JudgeCoreError>;
}

/// Serves one fixture task regardless of the requested id.
#[derive(Debug, Clone)]
pub struct StaticTaskProvider {
    task: TaskInfo,
}

impl StaticTaskProvider {
    pub fn new(task: TaskInfo) -> Self {
        Self { task }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, JudgeCoreError> {
        log::debug!("Loading fixture task from {:?}", path);
        if !path.exists() {
            return Err(path_not_exist(path));
        }
        let json = fs::read_to_string(path)?;
        Ok(Self::new(TaskInfo::from_json(&json)?))
    }
}

impl TaskInfoProvider for StaticTaskProvider {
    fn fetch(&self, task_id: &str) -> Result<TaskInfo, JudgeCoreError> {
        log::debug!("Serving fixture task for {}", task_id);
        Ok(self.task.clone())
    }
}
