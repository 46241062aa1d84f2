use crate::job_controller::state::JobsState;
use actix_web::{web, HttpResponse, Responder};
use log::info;

/// `202 Accepted` when the run will stop at its next boundary, `404` when the
/// job is unknown or already finished.
pub(crate) async fn process(
    job_id: web::Path<String>,
    state: web::Data<JobsState>,
) -> impl Responder {
    let job_id = job_id.into_inner();
    if state.cancel(&job_id).await {
        info!("Cancellation requested for import job {}", job_id);
        HttpResponse::Accepted().finish()
    } else {
        HttpResponse::NotFound().body("Job ID not found or already finished")
    }
}
