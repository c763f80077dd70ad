use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpServer, Responder, get};
use anyhow::Context;
use dotenvy::dotenv;

mod api;
mod config;
mod db;
mod docs;
mod error;
mod extract;
mod model;
mod payroll;
mod report;
mod routes;
mod service;
mod store;
mod utils;

use config::Config;
use db::init_db;

use crate::docs::ApiDoc;
use crate::extract::AttendanceExtractor;
use crate::service::{EmployeeService, IngestService, PayrollService};
use crate::store::{MemoryRepository, Repository};
use tracing::{info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/")]
async fn index() -> impl Responder {
    "DTR payroll service"
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!("Server starting...");

    let rules = Arc::new(config.payroll_rules()?);
    info!(
        schemes = ?rules.scheme_names().collect::<Vec<_>>(),
        default = %rules.default_scheme,
        "Payroll rules loaded"
    );

    let repo: Arc<dyn Repository> = match &config.database_url {
        Some(url) => Arc::new(init_db(url).await.context("connecting to the database")?),
        None => {
            warn!("DATABASE_URL is not set, records are kept in memory only");
            Arc::new(MemoryRepository::new())
        }
    };

    let ingest = Data::new(IngestService::new(
        repo.clone(),
        AttendanceExtractor::new(config.extractor_config()),
    ));
    let payroll = Data::new(PayrollService::new(repo.clone(), rules.clone()));
    let employees = Data::new(EmployeeService::new(repo, rules));

    let limiter = routes::build_limiter(config.rate_per_min)?;
    let server_addr = config.server_addr.clone();

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard {_:.*} to match JS/CSS files
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(ingest.clone())
            .app_data(payroll.clone())
            .app_data(employees.clone())
            .service(index)
            .configure(|cfg| routes::configure(cfg, &config, limiter.clone()))
    })
    .bind(&server_addr)?
    .run()
    .await?;

    Ok(())
}
