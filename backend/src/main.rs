use actix_web::{web, App, HttpServer};
use env_logger::Env;
use log::info;
use std::io;
use target_import::config::Settings;
use target_import::job_controller::state::{start_job_updater, JobsState};
use target_import::services::{self, ImportContext};

#[actix_web::main]
async fn main() -> io::Result<()> {
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let settings = Settings::load().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let context = ImportContext::from_settings(&settings)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    let context = web::Data::new(context);

    // Job controller state and the task that applies progress updates.
    let (jobs_state, rx) = JobsState::new(settings.import.job_channel_capacity);
    let updater_state = jobs_state.clone();
    tokio::spawn(async move {
        start_job_updater(updater_state, rx).await;
    });

    let host = settings.server.host.clone();
    let port = settings.server.port;
    info!("Server running at http://{}:{}", host, port);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(jobs_state.clone()))
            .app_data(context.clone())
            .service(services::targets::configure_routes())
    })
        .bind((host, port))?
        .run()
        .await
}
