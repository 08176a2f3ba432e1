use actix_web::{post, web, HttpResponse};
use judge_core::{compiler::Language, judge::Submission};
use utoipa::ToSchema;

use crate::worker::JudgeWorker;

#[derive(utoipa::OpenApi)]
#[openapi(paths(submit), components(schemas(SubmitBody, SubmitResponse)))]
pub struct JudgeApiDoc;

pub fn route(cfg: &mut web::ServiceConfig) {
    cfg.service(submit);
}

#[derive(Debug, ToSchema, Deserialize)]
pub struct SubmitBody {
    submission_id: String,
    task_id: String,
    /// One of c, cpp, ocaml, pas, kt, py
    #[schema(value_type = String)]
    language: Language,
    code: String,
}

impl From<SubmitBody> for Submission {
    fn from(body: SubmitBody) -> Self {
        Self {
            submission_id: body.submission_id,
            task_id: body.task_id,
            language: body.language,
            code: body.code,
        }
    }
}

#[derive(Debug, ToSchema, Serialize)]
pub struct SubmitResponse {
    message: String,
}

/// The outcome is posted to the platform once judging completes.
#[utoipa::path(
    context_path = "/api/v1",
    request_body(content = SubmitBody, content_type = "application/json", description = "The submission to judge"),
    responses(
        (status = 202, description = "Submission queued for judging", body = SubmitResponse)
    )
)]
#[post("/judge")]
pub async fn submit(body: web::Json<SubmitBody>, worker: web::Data<JudgeWorker>) -> HttpResponse {
    let submission: Submission = body.into_inner().into();
    log::info!(
        "Received submission {} for task {}",
        submission.submission_id,
        submission.task_id
    );
    let message = format!("Submission {} queued", submission.submission_id);

    let worker = worker.into_inner();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = worker.run_judge(submission) {
            log::error!("{:?}", e);
        }
    });

    HttpResponse::Accepted().json(SubmitResponse { message })
}
