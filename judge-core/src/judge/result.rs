use serde_derive::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

use crate::error::JudgeCoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JudgeVerdict {
    #[serde(rename = "ac")]
    Accepted,
    #[serde(rename = "ce")]
    CompileError,
    #[serde(rename = "wa")]
    WrongAnswer,
    #[serde(rename = "re")]
    RuntimeError,
    #[serde(rename = "tle")]
    TimeLimitExceeded,
    /// Reserved for grader failures.
    #[serde(rename = "ie")]
    InternalError,
    #[serde(rename = "se")]
    SystemError,
}

impl JudgeVerdict {
    pub const ALL: [JudgeVerdict; 7] = [
        Self::Accepted,
        Self::CompileError,
        Self::WrongAnswer,
        Self::RuntimeError,
        Self::TimeLimitExceeded,
        Self::InternalError,
        Self::SystemError,
    ];

    pub fn token(&self) -> &'static str {
        match self {
            Self::Accepted => "ac",
            Self::CompileError => "ce",
            Self::WrongAnswer => "wa",
            Self::RuntimeError => "re",
            Self::TimeLimitExceeded => "tle",
            Self::InternalError => "ie",
            Self::SystemError => "se",
        }
    }

    /// Binary credit per test case.
    pub fn score(&self) -> f64 {
        match self {
            Self::Accepted => 100.0,
            _ => 0.0,
        }
    }
}

impl fmt::Display for JudgeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.token())
    }
}

impl FromStr for JudgeVerdict {
    type Err = JudgeCoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|verdict| verdict.token() == s)
            .copied()
            .ok_or_else(|| JudgeCoreError::AnyhowError(anyhow::anyhow!("Unknown verdict: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseResult {
    pub subtask: i32,
    pub test_case: i32,
    pub verdict: JudgeVerdict,
    pub score: f64,
    /// Seconds.
    pub time_used: f64,
    /// Megabytes.
    pub memory_used: f64,
}

impl TestCaseResult {
    pub fn new(
        subtask: i32,
        test_case: i32,
        verdict: JudgeVerdict,
        time_used: f64,
        memory_used: f64,
    ) -> Self {
        Self {
            subtask,
            test_case,
            verdict,
            score: verdict.score(),
            time_used,
            memory_used,
        }
    }
}

/// What gets reported for one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JudgeOutcome {
    Terminal { verdict: JudgeVerdict },
    TestCases { test_case_results: Vec<TestCaseResult> },
}

impl JudgeOutcome {
    pub fn terminal(verdict: JudgeVerdict) -> Self {
        Self::Terminal { verdict }
    }

    pub fn terminal_verdict(&self) -> Option<JudgeVerdict> {
        match self {
            Self::Terminal { verdict } => Some(*verdict),
            Self::TestCases { .. } => None,
        }
    }

    pub fn test_case_results(&self) -> &[TestCaseResult] {
        match self {
            Self::Terminal { .. } => &[],
            Self::TestCases { test_case_results } => test_case_results,
        }
    }
}
