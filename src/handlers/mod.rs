//! HTTP surface (§6). Every handler is a thin translation from an Actix
//! request onto one `Orchestrator` call; business logic lives in
//! `services`, not here.

pub mod content;
pub mod episodes;
pub mod feed;
pub mod watchlist;

use actix_web::web;
use serde::Serialize;
use std::sync::Arc;

use crate::services::Orchestrator;

/// Shared application state injected into every handler.
pub struct AppState {
    pub orchestrator: Orchestrator,
}

/// `{success, data, message?}` envelope every endpoint returns on success.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            message: None,
        }
    }
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .configure(feed::configure)
            .configure(content::configure)
            .configure(episodes::configure)
            .configure(watchlist::configure),
    );
}
