mod judge;
mod state;

use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use utoipa::OpenApi;

use crate::worker::JudgeWorker;

#[derive(utoipa::OpenApi)]
#[openapi(external_docs(
    url = "/swagger-ui/?urls.primaryName=judge",
    description = "Judger API docs",
))]
pub struct ApiDoc;

pub fn route(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .configure(judge::route)
            .configure(state::route),
    )
    .service(
        utoipa_swagger_ui::SwaggerUi::new("/swagger-ui/{_:.*}").urls(vec![
            (
                utoipa_swagger_ui::Url::new("root", "/api-docs/openapi.json"),
                ApiDoc::openapi(),
            ),
            (
                utoipa_swagger_ui::Url::new("judge", "/api-docs/judge.json"),
                judge::JudgeApiDoc::openapi(),
            ),
            (
                utoipa_swagger_ui::Url::new("state", "/api-docs/state.json"),
                state::StateApiDoc::openapi(),
            ),
        ]),
    );
}

pub async fn serve(worker: Arc<JudgeWorker>, port: u16) -> std::io::Result<()> {
    log::info!("Listening on port {}", port);
    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(web::Data::from(worker.clone()))
            .configure(route)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
