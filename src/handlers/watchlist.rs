use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::handlers::{ApiResponse, AppState};
use crate::models::WatchStatus;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/watchlist/{user_id}").route(web::get().to(list)))
        .service(web::resource("/watchlist/{user_id}/{title_id}/rate").route(web::post().to(rate)))
        .service(web::resource("/watchlist/{user_id}/clear").route(web::delete().to(clear)));
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

fn parse_status(raw: &str) -> Result<WatchStatus> {
    match raw {
        "watching" => Ok(WatchStatus::Watching),
        "completed" => Ok(WatchStatus::Completed),
        "dropped" => Ok(WatchStatus::Dropped),
        "paused" => Ok(WatchStatus::Paused),
        other => Err(AppError::Validation(format!("unknown status '{other}'"))),
    }
}

async fn list(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    let records = state
        .orchestrator
        .get_watchlist(user_id.into_inner(), status, query.page.unwrap_or(0), query.limit.unwrap_or(20))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(records)))
}

#[derive(Debug, Deserialize)]
pub struct RateBody {
    pub rating: i16,
}

async fn rate(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
    body: web::Json<RateBody>,
) -> Result<HttpResponse> {
    let (user_id, title_id) = path.into_inner();
    state.orchestrator.rate(user_id, title_id, body.rating).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({}))))
}

#[derive(Debug, Default, Deserialize)]
pub struct ClearBody {
    #[serde(default)]
    pub title_id: Option<Uuid>,
    #[serde(default)]
    pub older_than_days: Option<i64>,
}

async fn clear(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
    body: Option<web::Json<ClearBody>>,
) -> Result<HttpResponse> {
    let body = body.map(web::Json::into_inner).unwrap_or_default();
    let deleted = state
        .orchestrator
        .clear_history(user_id.into_inner(), body.title_id, body.older_than_days)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({ "deleted": deleted }))))
}
