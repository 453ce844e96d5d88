use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;
use crate::handlers::{ApiResponse, AppState};
use crate::services::SessionDelta;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/episodes/{episode_id}").route(web::get().to(get_episode)))
        .service(web::resource("/episodes/{episode_id}/start").route(web::post().to(start)))
        .service(web::resource("/episodes/{episode_id}/progress").route(web::put().to(update_progress)))
        .service(web::resource("/episodes/{episode_id}/complete").route(web::post().to(complete)))
        .service(web::resource("/episodes/{episode_id}/like").route(web::post().to(like)))
        .service(web::resource("/episodes/{episode_id}/share").route(web::post().to(share)));
}

#[derive(Debug, Deserialize)]
pub struct EpisodeQuery {
    #[allow(dead_code)]
    pub user_id: Option<Uuid>,
    pub quality: Option<String>,
}

#[derive(Debug, Serialize)]
struct EpisodeDetail {
    #[serde(flatten)]
    episode: crate::models::Episode,
    stream_url: Option<String>,
}

async fn get_episode(
    state: web::Data<AppState>,
    episode_id: web::Path<Uuid>,
    query: web::Query<EpisodeQuery>,
) -> Result<HttpResponse> {
    let episode = state.orchestrator.get_episode(episode_id.into_inner()).await?;
    let quality = query
        .quality
        .clone()
        .unwrap_or_else(|| state.orchestrator.core_config().stream_quality.clone());
    let stream_url = episode.stream_url(&quality);
    Ok(HttpResponse::Ok().json(ApiResponse::ok(EpisodeDetail { episode, stream_url })))
}

#[derive(Debug, Deserialize)]
pub struct StartBody {
    pub user_id: Uuid,
    #[allow(dead_code)]
    pub quality: Option<String>,
    pub watched_via: Option<String>,
}

async fn start(
    state: web::Data<AppState>,
    episode_id: web::Path<Uuid>,
    body: web::Json<StartBody>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let record = state
        .orchestrator
        .start_watching(
            body.user_id,
            episode_id.into_inner(),
            body.watched_via.as_deref().unwrap_or("autoplay"),
        )
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(record)))
}

#[derive(Debug, Deserialize)]
pub struct ProgressBody {
    pub user_id: Uuid,
    pub current_position: f64,
    #[serde(default)]
    pub session_duration: i64,
    #[serde(default)]
    pub pause_count: i64,
    #[serde(default)]
    pub seek_count: i64,
    #[serde(default)]
    pub buffering_time: i64,
}

async fn update_progress(
    state: web::Data<AppState>,
    episode_id: web::Path<Uuid>,
    body: web::Json<ProgressBody>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let record = state
        .orchestrator
        .update_progress(
            body.user_id,
            episode_id.into_inner(),
            body.current_position,
            SessionDelta {
                session_duration: body.session_duration,
                pause_count: body.pause_count,
                seek_count: body.seek_count,
                buffering_time: body.buffering_time,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(record)))
}

#[derive(Debug, Deserialize)]
pub struct CompleteBody {
    pub user_id: Uuid,
    pub final_position: f64,
    #[allow(dead_code)]
    pub total_watch_time: Option<i64>,
}

async fn complete(
    state: web::Data<AppState>,
    episode_id: web::Path<Uuid>,
    body: web::Json<CompleteBody>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let record = state
        .orchestrator
        .mark_completed(body.user_id, episode_id.into_inner(), body.final_position)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(record)))
}

#[derive(Debug, Deserialize)]
pub struct LikeBody {
    pub user_id: Uuid,
}

async fn like(
    state: web::Data<AppState>,
    episode_id: web::Path<Uuid>,
    body: web::Json<LikeBody>,
) -> Result<HttpResponse> {
    let episode_id = episode_id.into_inner();
    let episode = state.orchestrator.get_episode(episode_id).await?;
    let liked = state
        .orchestrator
        .toggle_like(body.user_id, episode_id, episode.title_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({ "liked": liked }))))
}

#[derive(Debug, Deserialize)]
pub struct ShareBody {
    pub user_id: Uuid,
    #[allow(dead_code)]
    pub share_method: Option<String>,
}

async fn share(
    state: web::Data<AppState>,
    episode_id: web::Path<Uuid>,
    body: web::Json<ShareBody>,
) -> Result<HttpResponse> {
    let episode_id = episode_id.into_inner();
    let episode = state.orchestrator.get_episode(episode_id).await?;
    state
        .orchestrator
        .share(body.user_id, episode_id, episode.title_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(serde_json::json!({}))))
}
