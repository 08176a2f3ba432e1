use std::{
    fs,
    panic::{self, AssertUnwindSafe},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use judge_core::{
    compiler::{CommandTemplate, Language, LanguageDescriptor, LanguageRegistry},
    error::JudgeCoreError,
    judge::{
        result::{JudgeOutcome, JudgeVerdict},
        Judge, JudgeSettings, Submission,
    },
    sandbox::{BoxPool, RunLimits, RunRequest, Sandbox},
    task::{StaticTaskProvider, TaskInfo, TaskInfoProvider, TestCase},
};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Simulated program: input -> (stdout, metadata sidecar).
type Program = Box<dyn Fn(&str) -> (String, Option<String>) + Send + Sync>;

struct FakeSandbox {
    root: tempfile::TempDir,
    program: Program,
    init_fails: bool,
    cleanup_fails: bool,
    calls: Mutex<Vec<String>>,
    runs: Mutex<Vec<(Vec<String>, RunLimits)>>,
}

impl FakeSandbox {
    fn new(program: Program) -> Self {
        Self {
            root: tempfile::tempdir().unwrap(),
            program,
            init_fails: false,
            cleanup_fails: false,
            calls: Mutex::new(vec![]),
            runs: Mutex::new(vec![]),
        }
    }

    fn box_path(&self, box_id: u32) -> PathBuf {
        self.root.path().join(box_id.to_string()).join("box")
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(call)).count()
    }
}

impl Sandbox for FakeSandbox {
    fn init(&self, box_id: u32) -> Result<PathBuf, JudgeCoreError> {
        self.calls.lock().unwrap().push(format!("init {}", box_id));
        if self.init_fails {
            return Err(JudgeCoreError::SandboxError("box busy".to_string()));
        }
        let path = self.box_path(box_id);
        fs::create_dir_all(&path)?;
        Ok(path)
    }

    fn run(&self, box_id: u32, request: &RunRequest) -> Result<Vec<u8>, JudgeCoreError> {
        self.calls.lock().unwrap().push(format!("run {}", box_id));
        self.runs
            .lock()
            .unwrap()
            .push((request.args.to_vec(), request.limits));
        let (stdout, metadata) = (self.program)(request.stdin);
        if let Some(metadata) = metadata {
            fs::write(request.metadata_path, metadata)?;
        }
        Ok(stdout.into_bytes())
    }

    fn cleanup(&self, box_id: u32) -> Result<(), JudgeCoreError> {
        self.calls.lock().unwrap().push(format!("cleanup {}", box_id));
        let _ = fs::remove_dir_all(self.root.path().join(box_id.to_string()));
        if self.cleanup_fails {
            return Err(JudgeCoreError::SandboxError("cannot unmount".to_string()));
        }
        Ok(())
    }
}

fn quadrant(input: &str) -> String {
    let numbers: Vec<i32> = input
        .split_whitespace()
        .map(|n| n.parse().unwrap())
        .collect();
    let answer = match (numbers[0], numbers[1]) {
        (x, y) if x > 0 && y > 0 => "Quadrant I",
        (x, y) if x < 0 && y > 0 => "Quadrant II",
        (x, y) if x < 0 && y < 0 => "Quadrant III",
        (x, y) if x > 0 && y < 0 => "Quadrant IV",
        _ => "None",
    };
    format!("{}\n", answer)
}

const CLEAN_RUN: &str = "time:0.010\ntime-wall:0.050\nmax-rss:2048\nexitcode:0\n";

fn solver() -> Program {
    Box::new(|input| (quadrant(input), Some(CLEAN_RUN.to_string())))
}

fn case(test_case: i32, input: &str) -> TestCase {
    TestCase {
        subtask: 1,
        test_case,
        input: input.to_string(),
        output: Some(quadrant(input)),
    }
}

fn quadrant_task() -> TaskInfo {
    TaskInfo {
        time_limit: 1.0,
        memory_limit: 256,
        grader: false,
        grader_source_code: None,
        grader_language: None,
        test_cases: vec![
            case(1, "1 1\n"),
            case(2, "-50 -33\n"),
            case(3, "94 -87\n"),
            case(4, "-100 100\n"),
            case(5, "0 -24\n"),
            case(6, "66 0\n"),
            case(7, "0 0\n"),
        ],
    }
}

struct Fixture {
    sandbox: Arc<FakeSandbox>,
    runtime_dir: tempfile::TempDir,
    judge: Judge,
}

fn fixture_with(sandbox: FakeSandbox, tasks: Arc<dyn TaskInfoProvider>) -> Fixture {
    init();
    let sandbox = Arc::new(sandbox);
    let runtime_dir = tempfile::tempdir().unwrap();
    let settings = JudgeSettings {
        runtime_dir: runtime_dir.path().to_path_buf(),
        compile_timeout: Duration::from_secs(10),
        ..Default::default()
    };
    let judge = Judge::new(sandbox.clone(), tasks, settings);
    Fixture {
        sandbox,
        runtime_dir,
        judge,
    }
}

fn fixture(sandbox: FakeSandbox) -> Fixture {
    fixture_with(sandbox, Arc::new(StaticTaskProvider::new(quadrant_task())))
}

fn submission(language: Language) -> Submission {
    Submission {
        submission_id: "submission-1".to_string(),
        task_id: "quadrant".to_string(),
        language,
        code: "print('hello')\n".to_string(),
    }
}

fn judge_once(fixture: &Fixture, language: Language) -> Result<JudgeOutcome, JudgeCoreError> {
    let pool = BoxPool::new(3, 1).unwrap();
    let lease = pool.lease();
    fixture.judge.judge(&lease, &submission(language))
}

fn verdicts(outcome: &JudgeOutcome) -> Vec<JudgeVerdict> {
    outcome
        .test_case_results()
        .iter()
        .map(|result| result.verdict)
        .collect()
}

fn registry_with_cpp(compile: CommandTemplate) -> LanguageRegistry {
    LanguageRegistry::builtin().with(
        Language::Cpp,
        LanguageDescriptor {
            extension: "cpp".to_string(),
            artifact_name: "code".to_string(),
            compile: Some(compile),
            run: CommandTemplate::new("./{executable}", &[]),
        },
    )
}

#[test]
fn test_all_accepted() {
    let fixture = fixture(FakeSandbox::new(solver()));
    let outcome = judge_once(&fixture, Language::Python).unwrap();

    let results = outcome.test_case_results();
    assert_eq!(results.len(), 7);
    for (idx, result) in results.iter().enumerate() {
        assert_eq!(result.test_case, idx as i32 + 1);
        assert_eq!(result.verdict, JudgeVerdict::Accepted);
        assert_eq!(result.score, 100.0);
        assert_eq!(result.time_used, 0.01);
        assert_eq!(result.memory_used, 2.0);
    }

    let mut expected_calls = vec!["init 3".to_string()];
    expected_calls.extend((0..7).map(|_| "run 3".to_string()));
    expected_calls.push("cleanup 3".to_string());
    assert_eq!(fixture.sandbox.calls(), expected_calls);
}

#[test]
fn test_run_request() {
    let fixture = fixture(FakeSandbox::new(solver()));
    judge_once(&fixture, Language::Python).unwrap();

    let runs = fixture.sandbox.runs.lock().unwrap();
    let (args, limits) = &runs[0];
    assert_eq!(args, &vec!["/usr/bin/python3".to_string(), "code.py".to_string()]);
    assert_eq!(limits.time_limit, 1.0);
    assert_eq!(limits.wall_time_limit, 2.0);
    assert_eq!(limits.memory_limit_kb, 256 * 1024);
}

#[test]
fn test_wrong_answer() {
    let fixture = fixture(FakeSandbox::new(Box::new(|input| {
        let output = quadrant(input).replace("Quadrant I\n", "Quadrant 1\n");
        (output, Some(CLEAN_RUN.to_string()))
    })));
    let outcome = judge_once(&fixture, Language::Python).unwrap();

    let verdicts = verdicts(&outcome);
    assert_eq!(verdicts[0], JudgeVerdict::WrongAnswer);
    assert!(verdicts[1..].iter().all(|v| *v == JudgeVerdict::Accepted));
    assert_eq!(outcome.test_case_results()[0].score, 0.0);
}

#[test]
fn test_status_verdicts_do_not_stop_the_loop() {
    let fixture = fixture(FakeSandbox::new(Box::new(|input| {
        let status = match input {
            "1 1\n" => "TO",
            "-50 -33\n" => "SG",
            "94 -87\n" => "RE",
            "-100 100\n" => "XX",
            "0 -24\n" => "XY",
            _ => "",
        };
        // A matching answer must not rescue an abnormal run.
        let metadata = format!("status:{}\ntime:1.001\nmax-rss:1024\n", status);
        (quadrant(input), Some(metadata))
    })));
    let outcome = judge_once(&fixture, Language::Python).unwrap();

    assert_eq!(
        verdicts(&outcome),
        vec![
            JudgeVerdict::TimeLimitExceeded,
            JudgeVerdict::RuntimeError,
            JudgeVerdict::RuntimeError,
            JudgeVerdict::RuntimeError,
            JudgeVerdict::SystemError,
            JudgeVerdict::Accepted,
            JudgeVerdict::Accepted,
        ]
    );
    assert_eq!(fixture.sandbox.count("run"), 7);
    assert_eq!(fixture.sandbox.count("cleanup"), 1);
}

#[test]
fn test_missing_sidecar_fails_only_that_case() {
    let fixture = fixture(FakeSandbox::new(Box::new(|input| {
        let metadata = (input != "66 0\n").then(|| CLEAN_RUN.to_string());
        (quadrant(input), metadata)
    })));
    let outcome = judge_once(&fixture, Language::Python).unwrap();

    let verdicts = verdicts(&outcome);
    assert_eq!(verdicts.len(), 7);
    assert_eq!(verdicts[5], JudgeVerdict::SystemError);
    assert_eq!(verdicts[6], JudgeVerdict::Accepted);
}

#[test]
fn test_compile_error() {
    let fixture = fixture(FakeSandbox::new(solver()));
    let fixture = Fixture {
        judge: fixture.judge.with_languages(registry_with_cpp(CommandTemplate::new(
            "sh",
            &["-c", "echo 'expected ;' >&2; exit 1"],
        ))),
        ..fixture
    };
    let outcome = judge_once(&fixture, Language::Cpp).unwrap();

    assert_eq!(outcome, JudgeOutcome::terminal(JudgeVerdict::CompileError));
    assert!(outcome.test_case_results().is_empty());
    assert_eq!(fixture.sandbox.calls(), vec!["init 3", "cleanup 3"]);
}

#[test]
fn test_compiled_artifact_is_copied_into_box() {
    init();
    let sandbox = Arc::new(FakeSandbox::new(solver()));
    let runtime_dir = tempfile::tempdir().unwrap();
    let copied = Arc::new(Mutex::new(None));
    // The provider is consulted after the copy and before cleanup.
    let probe = {
        let copied = copied.clone();
        let box_path = sandbox.box_path(3);
        move || {
            *copied.lock().unwrap() = fs::read_to_string(box_path.join("code")).ok();
        }
    };
    let judge = Judge::new(
        sandbox.clone(),
        Arc::new(ProbingProvider {
            probe: Box::new(probe),
        }),
        JudgeSettings {
            runtime_dir: runtime_dir.path().to_path_buf(),
            ..Default::default()
        },
    )
    .with_languages(registry_with_cpp(CommandTemplate::new(
        "cp",
        &["{source}", "{executable}"],
    )));

    let pool = BoxPool::new(3, 1).unwrap();
    let lease = pool.lease();
    let outcome = judge.judge(&lease, &submission(Language::Cpp)).unwrap();

    assert_eq!(copied.lock().unwrap().as_deref(), Some("print('hello')\n"));
    assert_eq!(verdicts(&outcome), vec![JudgeVerdict::Accepted]);
    let runs = sandbox.runs.lock().unwrap();
    assert_eq!(runs[0].0, vec!["./code".to_string()]);
}

struct ProbingProvider {
    probe: Box<dyn Fn() + Send + Sync>,
}

impl TaskInfoProvider for ProbingProvider {
    fn fetch(&self, _task_id: &str) -> Result<TaskInfo, JudgeCoreError> {
        (self.probe)();
        let mut task = quadrant_task();
        task.test_cases.truncate(1);
        Ok(task)
    }
}

#[test]
fn test_init_failure() {
    let mut sandbox = FakeSandbox::new(solver());
    sandbox.init_fails = true;
    let fixture = fixture(sandbox);
    let outcome = judge_once(&fixture, Language::Python).unwrap();

    assert_eq!(outcome, JudgeOutcome::terminal(JudgeVerdict::SystemError));
    assert_eq!(fixture.sandbox.calls(), vec!["init 3"]);
}

#[test]
fn test_cleanup_failure_overrides_result() {
    let mut sandbox = FakeSandbox::new(solver());
    sandbox.cleanup_fails = true;
    let fixture = fixture(sandbox);
    let outcome = judge_once(&fixture, Language::Python).unwrap();

    assert_eq!(outcome, JudgeOutcome::terminal(JudgeVerdict::SystemError));
    assert_eq!(fixture.sandbox.count("run"), 7);
    assert_eq!(fixture.sandbox.count("cleanup"), 1);
}

struct FailingProvider;

impl TaskInfoProvider for FailingProvider {
    fn fetch(&self, task_id: &str) -> Result<TaskInfo, JudgeCoreError> {
        Err(JudgeCoreError::TaskInfoError(format!(
            "task service unreachable for {}",
            task_id
        )))
    }
}

#[test]
fn test_task_provider_error_still_cleans_up() {
    let fixture = fixture_with(FakeSandbox::new(solver()), Arc::new(FailingProvider));
    let result = judge_once(&fixture, Language::Python);

    assert!(matches!(result, Err(JudgeCoreError::TaskInfoError(_))));
    assert_eq!(fixture.sandbox.calls(), vec!["init 3", "cleanup 3"]);
}

struct PanickingProvider;

impl TaskInfoProvider for PanickingProvider {
    fn fetch(&self, _task_id: &str) -> Result<TaskInfo, JudgeCoreError> {
        panic!("malformed task payload");
    }
}

#[test]
fn test_panic_still_cleans_up_and_releases_box() {
    let fixture = fixture_with(FakeSandbox::new(solver()), Arc::new(PanickingProvider));
    let pool = BoxPool::new(3, 1).unwrap();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let lease = pool.lease();
        fixture.judge.judge(&lease, &submission(Language::Python))
    }));

    assert!(result.is_err());
    assert_eq!(fixture.sandbox.calls(), vec!["init 3", "cleanup 3"]);
    assert_eq!(pool.try_lease().map(|lease| lease.box_id()), Some(3));
}

#[test]
fn test_grader_task_is_system_error() {
    let mut task = quadrant_task();
    task.grader = true;
    let fixture = fixture_with(
        FakeSandbox::new(solver()),
        Arc::new(StaticTaskProvider::new(task)),
    );
    let outcome = judge_once(&fixture, Language::Python).unwrap();

    assert_eq!(outcome, JudgeOutcome::terminal(JudgeVerdict::SystemError));
    assert_eq!(fixture.sandbox.count("run"), 0);
    assert_eq!(fixture.sandbox.count("cleanup"), 1);
}

#[test]
fn test_missing_expected_output() {
    let mut task = quadrant_task();
    task.test_cases[1].output = None;
    let fixture = fixture_with(
        FakeSandbox::new(solver()),
        Arc::new(StaticTaskProvider::new(task)),
    );
    let outcome = judge_once(&fixture, Language::Python).unwrap();

    let verdicts = verdicts(&outcome);
    assert_eq!(verdicts[1], JudgeVerdict::SystemError);
    assert_eq!(verdicts.len(), 7);
    assert_eq!(fixture.sandbox.count("run"), 6);
}

#[test]
fn test_runtime_dir_removed_and_box_reusable() {
    let fixture = fixture(FakeSandbox::new(solver()));
    let pool = BoxPool::new(3, 1).unwrap();
    for _ in 0..2 {
        let lease = pool.lease();
        fixture
            .judge
            .judge(&lease, &submission(Language::Python))
            .unwrap();
    }

    assert_eq!(fixture.sandbox.count("init"), 2);
    assert_eq!(fixture.sandbox.count("cleanup"), 2);
    assert_eq!(pool.available(), 1);
    let leftovers = fs::read_dir(fixture.runtime_dir.path()).unwrap().count();
    assert_eq!(leftovers, 0);
}

#[test]
fn test_unusable_runtime_dir_is_system_error() {
    init();
    let scratch = tempfile::tempdir().unwrap();
    let not_a_dir = scratch.path().join("judger");
    fs::write(&not_a_dir, "").unwrap();

    let sandbox = Arc::new(FakeSandbox::new(solver()));
    let judge = Judge::new(
        sandbox.clone(),
        Arc::new(StaticTaskProvider::new(quadrant_task())),
        JudgeSettings {
            runtime_dir: not_a_dir,
            ..Default::default()
        },
    );
    let pool = BoxPool::new(3, 1).unwrap();
    let outcome = judge
        .judge(&pool.lease(), &submission(Language::Python))
        .unwrap();

    assert_eq!(outcome, JudgeOutcome::terminal(JudgeVerdict::SystemError));
    assert!(sandbox.calls().is_empty());
    assert_eq!(pool.available(), 1);
}
