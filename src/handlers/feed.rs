use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::handlers::{ApiResponse, AppState};
use crate::services::FeedQuery;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/feed/random").route(web::get().to(random)))
        .service(web::resource("/feed/personalized").route(web::post().to(personalized)))
        .service(web::resource("/feed/trending").route(web::get().to(trending)))
        .service(web::resource("/feed/popular/{genre}").route(web::get().to(popular_by_genre)))
        .service(web::resource("/feed/continue/{user_id}").route(web::get().to(continue_watching)))
        .service(web::resource("/feed/search").route(web::get().to(search)))
        .service(web::resource("/feed/featured").route(web::get().to(featured)))
        .service(web::resource("/feed/editors-picks").route(web::get().to(editors_picks)));
}

#[derive(Debug, Deserialize)]
pub struct RandomFeedQuery {
    pub user_id: Option<Uuid>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    pub genre: Option<String>,
    pub language: Option<String>,
    #[serde(default)]
    pub exclude_watched: bool,
}

async fn random(state: web::Data<AppState>, query: web::Query<RandomFeedQuery>) -> Result<HttpResponse> {
    let query = query.into_inner();
    let page = state
        .orchestrator
        .get_feed(FeedQuery {
            user_id: query.user_id,
            limit: query.limit.unwrap_or(20),
            offset: query.offset.unwrap_or(0),
            override_genre: query.genre,
            override_language: query.language,
            exclude_watched: query.exclude_watched,
        })
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

#[derive(Debug, Deserialize)]
pub struct PersonalizedFeedBody {
    pub user_id: Option<Uuid>,
    pub preferences: Option<PersonalizedPreferences>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct PersonalizedPreferences {
    pub genre: Option<String>,
    pub language: Option<String>,
}

async fn personalized(
    state: web::Data<AppState>,
    body: web::Json<PersonalizedFeedBody>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let (genre, language) = body
        .preferences
        .map(|p| (p.genre, p.language))
        .unwrap_or((None, None));
    let page = state
        .orchestrator
        .get_feed(FeedQuery {
            user_id: body.user_id,
            limit: body.limit.unwrap_or(20),
            offset: body.offset.unwrap_or(0),
            override_genre: genre,
            override_language: language,
            exclude_watched: false,
        })
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(page)))
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    pub limit: Option<i64>,
    #[allow(dead_code)]
    pub timeframe: Option<String>,
}

async fn trending(state: web::Data<AppState>, query: web::Query<TrendingQuery>) -> Result<HttpResponse> {
    let titles = state.orchestrator.get_trending(query.limit.unwrap_or(20)).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(titles)))
}

#[derive(Debug, Deserialize)]
pub struct PopularQuery {
    pub limit: Option<i64>,
    #[allow(dead_code)]
    pub language: Option<String>,
}

async fn popular_by_genre(
    state: web::Data<AppState>,
    genre: web::Path<String>,
    query: web::Query<PopularQuery>,
) -> Result<HttpResponse> {
    let titles = state
        .orchestrator
        .get_popular_by_genre(&genre, query.limit.unwrap_or(20))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(titles)))
}

#[derive(Debug, Deserialize)]
pub struct ContinueQuery {
    pub limit: Option<i64>,
}

async fn continue_watching(
    state: web::Data<AppState>,
    user_id: web::Path<Uuid>,
    query: web::Query<ContinueQuery>,
) -> Result<HttpResponse> {
    let records = state
        .orchestrator
        .get_continue_watching(user_id.into_inner(), query.limit.unwrap_or(10))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(records)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub genre: Option<String>,
    pub language: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub user_id: Option<Uuid>,
}

async fn search(state: web::Data<AppState>, query: web::Query<SearchQuery>) -> Result<HttpResponse> {
    let query = query.into_inner();
    let titles = state
        .orchestrator
        .search(
            &query.q,
            query.genre.as_deref(),
            query.language.as_deref(),
            query.kind.as_deref(),
            query.page.unwrap_or(0),
            query.limit.unwrap_or(20),
            query.user_id,
        )
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(titles)))
}

async fn featured(state: web::Data<AppState>) -> Result<HttpResponse> {
    let titles = state.orchestrator.get_featured(20).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(titles)))
}

async fn editors_picks(state: web::Data<AppState>) -> Result<HttpResponse> {
    let titles = state.orchestrator.get_editors_picks(20).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::ok(titles)))
}
