use actix_web::{HttpResponse, Responder, delete, get, post, put, web};
use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::adapters::store::CsvUsageStore;
use crate::app::services::{
    ServiceError, UsageCommandHandler, UsageQueryHandler, UsageSessionService,
};
use crate::domain::grouping::BackfillOutcome;
use crate::domain::models::{NewUsageRecord, RecordEdit, TIMESTAMP_FORMAT};

#[derive(Clone)]
pub struct ApiState {
    pub usage: UsageSessionService<CsvUsageStore>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendRequest {
    pub owner: String,
    /// Omitted timestamp means "now".
    pub timestamp: Option<String>,
    pub activity: String,
    pub quantity: f64,
    pub note: Option<String>,
    pub location_tag: Option<String>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AppendResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummaryResponse {
    pub session_id: String,
    pub started_at: String,
    pub total_quantity: f64,
    pub activities: String,
    pub location: String,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecordResponse {
    pub position: usize,
    pub timestamp: String,
    pub activity: String,
    pub quantity: f64,
    pub note: String,
    pub location_tag: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditRequest {
    pub edits: Vec<EditEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditEntry {
    pub position: usize,
    pub timestamp: String,
    pub activity: String,
    /// Raw text; an unparseable value keeps the stored quantity.
    pub quantity: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub location_tag: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRecordsRequest {
    pub positions: Vec<usize>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub deleted: usize,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackfillResponse {
    pub outcome: String,
    pub sessions_created: usize,
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(append_usage_endpoint)
        .service(backfill_endpoint)
        .service(list_sessions_endpoint)
        .service(get_session_detail_endpoint)
        .service(edit_session_endpoint)
        .service(delete_session_endpoint)
        .service(delete_records_endpoint);
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[post("/usage")]
async fn append_usage_endpoint(
    state: web::Data<ApiState>,
    request: web::Json<AppendRequest>,
) -> impl Responder {
    let request = request.into_inner();
    let timestamp = request
        .timestamp
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| Local::now().format(TIMESTAMP_FORMAT).to_string());

    let entry = NewUsageRecord {
        owner: request.owner,
        timestamp,
        activity: request.activity,
        quantity: request.quantity,
        note: request.note.unwrap_or_default(),
        location_tag: request.location_tag.unwrap_or_default(),
    };

    match state.usage.append(entry) {
        Ok(session_id) => HttpResponse::Created().json(AppendResponse { session_id }),
        Err(error) => service_error_response(error),
    }
}

#[post("/usage/backfill")]
async fn backfill_endpoint(state: web::Data<ApiState>) -> impl Responder {
    match state.usage.backfill() {
        Ok(BackfillOutcome::Applied { sessions_created }) => {
            HttpResponse::Ok().json(BackfillResponse {
                outcome: "applied".to_string(),
                sessions_created,
            })
        }
        Ok(BackfillOutcome::AlreadyGrouped) => HttpResponse::Ok().json(BackfillResponse {
            outcome: "alreadyGrouped".to_string(),
            sessions_created: 0,
        }),
        Err(error) => service_error_response(error),
    }
}

#[get("/usage/{owner}/sessions")]
async fn list_sessions_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<String>,
) -> impl Responder {
    let owner = path.into_inner();

    match state.usage.summarize(&owner) {
        Ok(summaries) => {
            let mapped: Vec<SessionSummaryResponse> = summaries
                .into_iter()
                .map(|summary| SessionSummaryResponse {
                    session_id: summary.session_id,
                    started_at: summary.started_at,
                    total_quantity: summary.total_quantity,
                    activities: summary.activities,
                    location: summary.location,
                })
                .collect();
            HttpResponse::Ok().json(mapped)
        }
        Err(error) => service_error_response(error),
    }
}

#[get("/usage/{owner}/sessions/{session_id}")]
async fn get_session_detail_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (owner, session_id) = path.into_inner();

    match state.usage.detail(&owner, &session_id) {
        Ok(members) => {
            let mapped: Vec<SessionRecordResponse> = members
                .into_iter()
                .map(|member| SessionRecordResponse {
                    position: member.position,
                    timestamp: member.record.timestamp,
                    activity: member.record.activity,
                    quantity: member.record.quantity,
                    note: member.record.note,
                    location_tag: member.record.location_tag,
                })
                .collect();
            HttpResponse::Ok().json(mapped)
        }
        Err(error) => service_error_response(error),
    }
}

#[put("/usage/{owner}/sessions/{session_id}")]
async fn edit_session_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<(String, String)>,
    request: web::Json<EditRequest>,
) -> impl Responder {
    let (owner, session_id) = path.into_inner();
    let edits: Vec<RecordEdit> = request
        .into_inner()
        .edits
        .into_iter()
        .map(|edit| RecordEdit {
            position: edit.position,
            timestamp: edit.timestamp,
            activity: edit.activity,
            quantity: edit.quantity,
            note: edit.note,
            location_tag: edit.location_tag,
        })
        .collect();

    match state.usage.apply_edits(&owner, &session_id, &edits) {
        Ok(()) => HttpResponse::NoContent().finish(),
        Err(error) => service_error_response(error),
    }
}

#[delete("/usage/{owner}/sessions/{session_id}")]
async fn delete_session_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<(String, String)>,
) -> impl Responder {
    let (owner, session_id) = path.into_inner();

    match state.usage.delete_session(&owner, &session_id) {
        Ok(deleted) => HttpResponse::Ok().json(DeletedResponse { deleted }),
        Err(error) => service_error_response(error),
    }
}

#[delete("/usage/{owner}/records")]
async fn delete_records_endpoint(
    state: web::Data<ApiState>,
    path: web::Path<String>,
    request: web::Json<DeleteRecordsRequest>,
) -> impl Responder {
    let owner = path.into_inner();

    match state.usage.delete_records(&owner, &request.positions) {
        Ok(deleted) => HttpResponse::Ok().json(DeletedResponse { deleted }),
        Err(error) => service_error_response(error),
    }
}

fn service_error_response(error: ServiceError) -> HttpResponse {
    match error {
        ServiceError::Session(error) => HttpResponse::NotFound().json(serde_json::json!({
            "error": error.to_string()
        })),
        ServiceError::Backfill(error) => HttpResponse::Conflict().json(serde_json::json!({
            "error": error.to_string()
        })),
        ServiceError::StoreLockPoisoned => {
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "usage store lock poisoned"
            }))
        }
        ServiceError::Store(error) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("usage store operation failed: {error}")
        })),
    }
}
