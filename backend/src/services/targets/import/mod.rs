use actix_web::web::{get, post, scope};
use actix_web::Scope;

mod cancel;
mod get_status;
mod template;
mod upload;

pub fn configure_routes() -> Scope {
    scope("/import")
        // Upload a file and start an import run.
        .route("/upload", post().to(upload::process))
        // Poll a run.
        .route("/status/{job_id}", get().to(get_status::process))
        .route("/cancel/{job_id}", post().to(cancel::process))
        .route("/template", get().to(template::process))
}
