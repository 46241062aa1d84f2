use crate::services::ImportContext;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpResponse, Responder};

/// Header-only CSV listing the columns an import file must carry.
pub(crate) async fn process(context: web::Data<ImportContext>) -> impl Responder {
    let delimiter = char::from(context.delimiter).to_string();
    let header = context.orchestrator.schema().column_names().join(&delimiter);

    HttpResponse::Ok()
        .content_type("text/csv; charset=utf-8")
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename("targets_template.csv".to_string())],
        })
        .body(format!("{}\n", header))
}
