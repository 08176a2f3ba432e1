use actix_web::{get, web, HttpResponse};
use utoipa::ToSchema;

use crate::worker::JudgeWorker;

#[derive(utoipa::OpenApi)]
#[openapi(paths(get_state), components(schemas(StateResponse)))]
pub struct StateApiDoc;

pub fn route(cfg: &mut web::ServiceConfig) {
    cfg.service(get_state);
}

#[derive(Debug, ToSchema, Serialize)]
pub struct StateResponse {
    /// `busy` once every box is leased
    state: String,
    capacity: usize,
    available: usize,
}

#[utoipa::path(
    context_path = "/api/v1",
    responses(
        (status = 200, description = "Box pool occupancy", body = StateResponse)
    )
)]
#[get("/state")]
pub async fn get_state(worker: web::Data<JudgeWorker>) -> HttpResponse {
    let pool = worker.pool_state();
    let state = if pool.available == 0 { "busy" } else { "idle" };
    HttpResponse::Ok().json(StateResponse {
        state: state.to_string(),
        capacity: pool.capacity,
        available: pool.available,
    })
}
