use crate::application::IngestionUseCase;
use crate::domain::error::AppError;
use actix_cors::Cors;
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub ingestion: Arc<IngestionUseCase>,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

#[derive(Serialize)]
pub struct EntitiesResponse {
    pub entities: Vec<String>,
}

fn error_response(err: &AppError) -> HttpResponse {
    match err {
        AppError::NotFound(_) => HttpResponse::NotFound().json(err),
        AppError::ValidationError(_) => HttpResponse::BadRequest().json(err),
        AppError::LockError(_) => HttpResponse::Conflict().json(err),
        _ => HttpResponse::InternalServerError().json(err),
    }
}

#[post("/ingest")]
async fn ingest_all(data: web::Data<HttpState>) -> impl Responder {
    add_log(&data.logs, "INFO", "Ingestion", "Ingestion pass requested");

    match data.ingestion.run_pass().await {
        Ok(report) => {
            add_log(
                &data.logs,
                "INFO",
                "Ingestion",
                &format!(
                    "Pass finished: {} datasets, {} failed, {} entities",
                    report.datasets.len(),
                    report.failed_count(),
                    report.entities.len()
                ),
            );
            HttpResponse::Ok().json(report)
        }
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "Ingestion",
                &format!("Ingestion pass failed: {}", e),
            );
            error_response(&e)
        }
    }
}

#[post("/ingest/{file_name}")]
async fn ingest_one(data: web::Data<HttpState>, file_name: web::Path<String>) -> impl Responder {
    let file_name = file_name.into_inner();
    if !is_plain_file_name(&file_name) {
        return error_response(&AppError::ValidationError(format!(
            "Invalid staged file name: {}",
            file_name
        )));
    }

    add_log(
        &data.logs,
        "INFO",
        "Ingestion",
        &format!("Ingesting {}", file_name),
    );

    let path = data.ingestion.config().staging_dir.join(&file_name);
    match data.ingestion.ingest_dataset(&path).await {
        Ok(report) => {
            if report.is_failed() {
                add_log(
                    &data.logs,
                    "WARN",
                    "Ingestion",
                    &format!("{} could not be ingested", file_name),
                );
            }
            HttpResponse::Ok().json(report)
        }
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "Ingestion",
                &format!("Ingesting {} failed: {}", file_name, e),
            );
            error_response(&e)
        }
    }
}

#[get("/entities")]
async fn list_entities(data: web::Data<HttpState>) -> impl Responder {
    match data.ingestion.registered_entities() {
        Ok(entities) => HttpResponse::Ok().json(EntitiesResponse { entities }),
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "Registry",
                &format!("Failed to read entities: {}", e),
            );
            error_response(&e)
        }
    }
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap_or_else(|e| e.into_inner());
    HttpResponse::Ok().json(&*logs)
}

/// A bare file name, no separators or parent references
fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains('/')
        && !name.contains('\\')
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap_or_else(|e| e.into_inner());
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(ingest_all)
            .service(ingest_one)
            .service(list_entities)
            .service(get_logs),
    );
}

pub fn start_server(
    ingestion: Arc<IngestionUseCase>,
    logs: Arc<Mutex<Vec<LogEntry>>>,
    bind: &str,
) -> std::io::Result<Server> {
    let state = web::Data::new(HttpState { ingestion, logs });

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for local tool

        App::new()
            .wrap(cors)
            .app_data(state.clone())
            .configure(configure)
    })
    .bind(bind)?
    .run();

    tracing::info!(bind = %bind, "HTTP server listening");
    Ok(server)
}
