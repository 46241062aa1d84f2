use crate::services::ImportContext;
use actix_web::{web, HttpResponse, Responder};
use common::requests::ListTargetsQuery;
use log::error;

pub(crate) async fn process(
    context: web::Data<ImportContext>,
    query: web::Query<ListTargetsQuery>,
) -> impl Responder {
    let department = query.into_inner().department;
    let result = web::block(move || context.store().list(department.as_deref())).await;

    match result {
        Ok(Ok(targets)) => HttpResponse::Ok().json(targets),
        Ok(Err(e)) => {
            error!("Listing targets failed: {}", e);
            HttpResponse::ServiceUnavailable().body(format!("Error listing targets: {}", e))
        }
        Err(e) => HttpResponse::InternalServerError().body(format!("join error: {}", e)),
    }
}
