use crate::{
    sandbox::{ExecutionMetadata, SandboxStatus},
    task::TestCase,
    utils::trimmed_eq,
};

use super::result::{JudgeVerdict, TestCaseResult};

pub fn check_user_result(status: &SandboxStatus) -> JudgeVerdict {
    match status {
        SandboxStatus::RuntimeError | SandboxStatus::Signaled | SandboxStatus::InternalError => {
            JudgeVerdict::RuntimeError
        }
        SandboxStatus::TimedOut => JudgeVerdict::TimeLimitExceeded,
        SandboxStatus::Other(status) => {
            log::warn!("Unrecognized sandbox status {:?}", status);
            JudgeVerdict::SystemError
        }
    }
}

/// A reported sandbox status always wins over the output comparison.
pub fn evaluate(stdout: &[u8], answer: &str, metadata: &ExecutionMetadata) -> JudgeVerdict {
    let compared = if trimmed_eq(stdout, answer.as_bytes()) {
        JudgeVerdict::Accepted
    } else {
        JudgeVerdict::WrongAnswer
    };
    match &metadata.status {
        Some(status) => check_user_result(status),
        None => compared,
    }
}

pub fn judge_test_case(
    test_case: &TestCase,
    answer: &str,
    stdout: &[u8],
    metadata: &ExecutionMetadata,
) -> TestCaseResult {
    let verdict = evaluate(stdout, answer, metadata);
    log::debug!(
        "Test case {}.{}: {} in {}s, {} KB",
        test_case.subtask,
        test_case.test_case,
        verdict,
        metadata.time,
        metadata.max_rss_kb
    );
    TestCaseResult::new(
        test_case.subtask,
        test_case.test_case,
        verdict,
        metadata.time,
        metadata.memory_used_mb(),
    )
}

/// Result for a case the judge could not run or grade.
pub fn system_error(test_case: &TestCase) -> TestCaseResult {
    TestCaseResult::new(
        test_case.subtask,
        test_case.test_case,
        JudgeVerdict::SystemError,
        0.0,
        0.0,
    )
}
