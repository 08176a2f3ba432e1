use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use serde_derive::{Deserialize, Serialize};

use crate::{
    compiler::{Compiler, Language, LanguageDescriptor, LanguageRegistry},
    error::JudgeCoreError,
    run::{self, DEFAULT_WALL_TIME_GRACE},
    sandbox::{BoxLease, Sandbox, SandboxSession},
    task::TaskInfoProvider,
    utils::copy_into_dir,
};

use self::result::{JudgeOutcome, JudgeVerdict};

pub mod common;
pub mod result;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub submission_id: String,
    pub task_id: String,
    pub language: Language,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct JudgeSettings {
    /// Host directory holding one scratch directory per submission.
    pub runtime_dir: PathBuf,
    pub wall_time_grace: f64,
    pub compile_timeout: Duration,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            runtime_dir: PathBuf::from("/tmp/judger"),
            wall_time_grace: DEFAULT_WALL_TIME_GRACE,
            compile_timeout: Duration::from_secs(30),
        }
    }
}

/// Judges submissions, one box per call.
pub struct Judge {
    sandbox: Arc<dyn Sandbox>,
    tasks: Arc<dyn TaskInfoProvider>,
    languages: LanguageRegistry,
    settings: JudgeSettings,
}

impl Judge {
    pub fn new(
        sandbox: Arc<dyn Sandbox>,
        tasks: Arc<dyn TaskInfoProvider>,
        settings: JudgeSettings,
    ) -> Self {
        Self {
            sandbox,
            tasks,
            languages: LanguageRegistry::builtin(),
            settings,
        }
    }

    pub fn with_languages(mut self, languages: LanguageRegistry) -> Self {
        self.languages = languages;
        self
    }

    /// Judges `submission` in the leased box.
    ///
    /// Failures before the test loop give a single terminal verdict, failures
    /// of one test case only affect that case. Only errors from the task
    /// provider are returned to the caller, after the box has been cleaned up.
    pub fn judge(
        &self,
        lease: &BoxLease,
        submission: &Submission,
    ) -> Result<JudgeOutcome, JudgeCoreError> {
        let descriptor = match self.languages.get(submission.language) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                log::error!("Cannot judge submission {}: {}", submission.submission_id, e);
                return Ok(JudgeOutcome::terminal(JudgeVerdict::SystemError));
            }
        };
        let runtime_path = self
            .settings
            .runtime_dir
            .join(uuid::Uuid::new_v4().to_string());
        log::info!(
            "Judging submission {} ({}) in box {}",
            submission.submission_id,
            submission.language,
            lease.box_id()
        );
        log::debug!("runtime_path: {:?}", runtime_path);
        if let Err(e) = fs::create_dir_all(&runtime_path) {
            log::error!("Failed to create runtime dir {:?}: {}", runtime_path, e);
            return Ok(JudgeOutcome::terminal(JudgeVerdict::SystemError));
        }

        let outcome = self.judge_in_box(lease.box_id(), submission, descriptor, &runtime_path);

        if let Err(e) = fs::remove_dir_all(&runtime_path) {
            log::warn!("Failed to remove runtime dir {:?}: {}", runtime_path, e);
        }
        outcome
    }

    fn judge_in_box(
        &self,
        box_id: u32,
        submission: &Submission,
        descriptor: &LanguageDescriptor,
        runtime_path: &Path,
    ) -> Result<JudgeOutcome, JudgeCoreError> {
        let src_path = runtime_path.join(descriptor.source_name());
        if let Err(e) = fs::write(&src_path, &submission.code) {
            log::error!("Failed to write source {:?}: {}", src_path, e);
            return Ok(JudgeOutcome::terminal(JudgeVerdict::SystemError));
        }

        let session = match SandboxSession::init(self.sandbox.as_ref(), box_id) {
            Ok(session) => session,
            Err(e) => {
                log::error!("Failed to init box {}: {}", box_id, e);
                return Ok(JudgeOutcome::terminal(JudgeVerdict::SystemError));
            }
        };

        let outcome = self.build_and_run(&session, submission, descriptor, runtime_path, &src_path);

        if let Err(e) = session.finish() {
            log::error!("Failed to clean up box {}: {}", box_id, e);
            if let Err(judge_error) = outcome {
                log::error!("Judging had already failed: {}", judge_error);
            }
            return Ok(JudgeOutcome::terminal(JudgeVerdict::SystemError));
        }
        log::debug!("Box {} cleaned up", box_id);
        outcome
    }

    fn build_and_run(
        &self,
        session: &SandboxSession,
        submission: &Submission,
        descriptor: &LanguageDescriptor,
        runtime_path: &Path,
        src_path: &Path,
    ) -> Result<JudgeOutcome, JudgeCoreError> {
        let artifact_path = match &descriptor.compile {
            Some(template) => {
                let executable_path = runtime_path.join(&descriptor.artifact_name);
                let compiler = Compiler::new(template, self.settings.compile_timeout);
                match compiler.compile(
                    src_path,
                    &executable_path,
                    &runtime_path.join("compile.log"),
                ) {
                    Ok(outcome) if outcome.is_success() => executable_path,
                    Ok(outcome) => {
                        log::info!(
                            "Submission {} failed to compile: {:?}",
                            submission.submission_id,
                            outcome
                        );
                        return Ok(JudgeOutcome::terminal(JudgeVerdict::CompileError));
                    }
                    Err(e) => {
                        log::error!("Failed to run compiler: {}", e);
                        return Ok(JudgeOutcome::terminal(JudgeVerdict::SystemError));
                    }
                }
            }
            None => src_path.to_path_buf(),
        };

        if let Err(e) = copy_into_dir(&artifact_path, session.box_path()) {
            log::error!(
                "Failed to copy {:?} into box {}: {}",
                artifact_path,
                session.box_id(),
                e
            );
            return Ok(JudgeOutcome::terminal(JudgeVerdict::SystemError));
        }

        let task = self.tasks.fetch(&submission.task_id)?;
        if task.grader {
            log::error!(
                "Task {} needs a custom grader, which is not supported",
                submission.task_id
            );
            return Ok(JudgeOutcome::terminal(JudgeVerdict::SystemError));
        }

        let limits = run::limits_for(&task, self.settings.wall_time_grace);
        let args = descriptor.run_args();
        let metadata_path = runtime_path.join("meta.txt");
        let mut test_case_results = Vec::with_capacity(task.test_cases.len());
        // Cases share the box, so they run one after another.
        for test_case in &task.test_cases {
            let result = match &test_case.output {
                None => {
                    log::error!(
                        "Test case {}.{} has no expected output",
                        test_case.subtask,
                        test_case.test_case
                    );
                    common::system_error(test_case)
                }
                Some(answer) => match run::run_test_case(
                    session,
                    limits,
                    &args,
                    &test_case.input,
                    &metadata_path,
                ) {
                    Ok(output) => {
                        common::judge_test_case(test_case, answer, &output.stdout, &output.metadata)
                    }
                    Err(e) => {
                        log::error!(
                            "Failed to run test case {}.{}: {}",
                            test_case.subtask,
                            test_case.test_case,
                            e
                        );
                        common::system_error(test_case)
                    }
                },
            };
            test_case_results.push(result);
        }

        log::debug!("Judge finished");
        Ok(JudgeOutcome::TestCases { test_case_results })
    }
}
