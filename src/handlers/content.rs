use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::handlers::{ApiResponse, AppState};
use crate::models::WatchRecord;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/content/{title_id}").route(web::get().to(get_title)))
        .service(web::resource("/content/{title_id}/episodes").route(web::get().to(list_episodes)))
        .service(web::resource("/content/{title_id}/similar").route(web::get().to(similar)));
}

#[derive(Debug, Deserialize)]
pub struct TitleQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct TitleDetail {
    #[serde(flatten)]
    title: crate::models::Title,
    progress: Vec<WatchRecord>,
}

async fn get_title(
    state: web::Data<AppState>,
    title_id: web::Path<Uuid>,
    query: web::Query<TitleQuery>,
) -> Result<HttpResponse> {
    let title_id = title_id.into_inner();
    let title = state.orchestrator.get_title(title_id).await?;
    let progress = match query.user_id {
        Some(user_id) => state.orchestrator.get_progress_on_title(user_id, title_id).await?,
        None => Vec::new(),
    };
    Ok(HttpResponse::Ok().json(ApiResponse::ok(TitleDetail { title, progress })))
}

#[derive(Debug, Deserialize)]
pub struct EpisodesQuery {
    pub season_number: Option<i32>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[allow(dead_code)]
    pub user_id: Option<Uuid>,
}

async fn list_episodes(
    state: web::Data<AppState>,
    title_id: web::Path<Uuid>,
    query: web::Query<EpisodesQuery>,
) -> Result<HttpResponse> {
    let episodes = state
        .orchestrator
        .list_episodes(
            title_id.into_inner(),
            query.season_number,
            query.page.unwrap_or(1).max(1),
            query.limit.unwrap_or(50).clamp(1, 100),
        )
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(episodes)))
}

#[derive(Debug, Deserialize)]
pub struct SimilarQuery {
    pub limit: Option<i64>,
}

async fn similar(
    state: web::Data<AppState>,
    title_id: web::Path<Uuid>,
    query: web::Query<SimilarQuery>,
) -> Result<HttpResponse> {
    let titles = state
        .orchestrator
        .get_similar(title_id.into_inner(), query.limit.unwrap_or(10))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(titles)))
}
