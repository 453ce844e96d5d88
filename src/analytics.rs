//! Analytics sink (§6): a narrow, fire-and-forget `track(event)` interface.
//! Every emission is spawned onto its own task so a slow or failing sink
//! never adds latency to the request path it was observed from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    VideoStart,
    VideoEnd,
    VideoPause,
    VideoResume,
    SwipeLeft,
    SwipeRight,
    TapEpisode,
    Like,
    Share,
    AppOpen,
    AppClose,
    SessionStart,
    SessionEnd,
    ContentView,
    Search,
    Error,
    BufferStart,
    BufferEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    UserInteraction,
    VideoPlayback,
    Navigation,
    Engagement,
    Performance,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub user_id: Option<Uuid>,
    pub event_type: EventType,
    pub category: EventCategory,
    pub content_id: Option<Uuid>,
    pub episode_id: Option<Uuid>,
    pub session_id: Option<String>,
    #[serde(default)]
    pub event_data: Value,
    #[serde(default)]
    pub device_info: Value,
    #[serde(default)]
    pub location: Value,
    pub timestamp: DateTime<Utc>,
}

/// Thin client over the external analytics collector. The spec treats this
/// as an out-of-scope collaborator (§1); here it is a logging stub that
/// never blocks and never returns an error to its caller.
#[derive(Clone, Default)]
pub struct Analytics;

impl Analytics {
    pub fn new() -> Self {
        Self
    }

    pub fn track(&self, event: AnalyticsEvent) {
        tokio::spawn(async move {
            tracing::info!(
                event_type = ?event.event_type,
                category = ?event.category,
                user_id = ?event.user_id,
                content_id = ?event.content_id,
                "analytics event"
            );
        });
    }

    pub fn track_content_view(&self, user_id: Option<Uuid>, content_id: Uuid) {
        self.track(AnalyticsEvent {
            user_id,
            event_type: EventType::ContentView,
            category: EventCategory::Navigation,
            content_id: Some(content_id),
            episode_id: None,
            session_id: None,
            event_data: Value::Null,
            device_info: Value::Null,
            location: Value::Null,
            timestamp: Utc::now(),
        });
    }

    pub fn track_search(&self, user_id: Option<Uuid>, query: &str) {
        self.track(AnalyticsEvent {
            user_id,
            event_type: EventType::Search,
            category: EventCategory::Navigation,
            content_id: None,
            episode_id: None,
            session_id: None,
            event_data: serde_json::json!({ "query": query }),
            device_info: Value::Null,
            location: Value::Null,
            timestamp: Utc::now(),
        });
    }
}
