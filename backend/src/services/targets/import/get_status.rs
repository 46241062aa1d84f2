use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse, Responder};

pub(crate) async fn process(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> impl Responder {
    match state.get(&job_id.into_inner()).await {
        Some(job) => HttpResponse::Ok().json(job),
        None => HttpResponse::NotFound().body("Job ID not found"),
    }
}
