mod agent;
mod error;
mod handler;
mod option;
mod worker;

#[macro_use]
extern crate serde_derive;

use std::{fs, sync::Arc};

use agent::{platform::PlatformClient, StdoutReporter};
use judge_core::{
    judge::{Judge, Submission},
    sandbox::{BoxPool, Isolate},
    task::StaticTaskProvider,
};
use option::JudgerCommand;
use worker::JudgeWorker;

fn main() -> anyhow::Result<()> {
    let opt = option::load_option();
    let sandbox = Arc::new(Isolate::new(opt.isolate_path.clone()));

    match opt.cmd.clone() {
        JudgerCommand::Serve {
            platform_uri,
            secret_key,
            port,
            box_count,
            first_box_id,
        } => {
            // Built before the runtime starts: the blocking client must not live inside it.
            let platform_client = Arc::new(PlatformClient::new(&platform_uri, &secret_key)?);
            let pool = BoxPool::new(first_box_id, box_count)?;
            let judge = Judge::new(sandbox, platform_client.clone(), opt.judge_settings());
            log::info!(
                "Serving with {} boxes starting at {}",
                pool.capacity(),
                first_box_id
            );
            let worker = Arc::new(JudgeWorker::new(judge, pool, platform_client));
            actix_web::rt::System::new().block_on(handler::serve(worker, port))?;
        }
        JudgerCommand::Judge {
            language,
            src_path,
            task_file,
            box_id,
        } => {
            let code = fs::read_to_string(&src_path)?;
            let tasks = Arc::new(StaticTaskProvider::from_json_file(&task_file)?);
            let judge = Judge::new(sandbox, tasks, opt.judge_settings());
            let worker = JudgeWorker::new(
                judge,
                BoxPool::new(box_id, 1)?,
                Arc::new(StdoutReporter),
            );
            let task_id = task_file
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            worker.run_judge(Submission {
                submission_id: "local".to_string(),
                task_id,
                language,
                code,
            })?;
        }
    }
    Ok(())
}
