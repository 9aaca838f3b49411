//! Dashboard view state
//!
//! `DashboardView` is the union of everything the dashboard displays. Each
//! field is one named slice owned by exactly one poll operation: a slice is
//! replaced atomically when its fetch succeeds and keeps its last-known
//! value when the fetch fails. Timestamps stay as the backend's ISO-8601
//! strings since they are display-only.

use serde::{Deserialize, Serialize};

/// Headline counters from `GET /api/dashboard/stats`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub sources_count: i64,
    pub contents_today: i64,
    pub contents_yesterday: i64,
    pub contents_total: i64,
    pub pipelines_running: i64,
    pub pipelines_failed: i64,
    pub pipelines_pending: i64,
}

/// One day of the collection trend from `GET /api/dashboard/collection-trend`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// Calendar day, `YYYY-MM-DD`
    pub date: String,
    pub count: i64,
}

/// Health classification the backend derives from consecutive collection
/// failures (0 = healthy, 1-2 = warning, 3+ = error, inactive = disabled)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthLevel {
    Healthy,
    Warning,
    Error,
    Disabled,
}

/// Per-source health row from `GET /api/dashboard/source-health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceHealth {
    pub id: i64,
    pub name: String,
    pub source_type: String,
    pub health: HealthLevel,
    pub consecutive_failures: i64,
    pub last_collected_at: Option<String>,
    pub is_active: bool,
}

/// Recently collected item from `GET /api/dashboard/recent-content`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentItem {
    pub id: i64,
    pub title: String,
    pub url: Option<String>,
    pub status: Option<String>,
    pub source_name: Option<String>,
    pub collected_at: Option<String>,
}

/// Everything the dashboard shows, merged from the four poll operations
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardView {
    pub stats: DashboardStats,
    pub trend: Vec<TrendPoint>,
    pub source_health: Vec<SourceHealth>,
    pub recent: Vec<RecentItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_health_decodes_backend_row() {
        let json = r#"{
            "id": 3,
            "name": "Hacker News",
            "source_type": "rss",
            "health": "warning",
            "consecutive_failures": 2,
            "last_collected_at": "2026-08-22T07:15:00",
            "is_active": true
        }"#;

        let row: SourceHealth = serde_json::from_str(json).unwrap();
        assert_eq!(row.health, HealthLevel::Warning);
        assert_eq!(row.consecutive_failures, 2);
    }

    #[test]
    fn test_recent_item_tolerates_null_fields() {
        let json = r#"{"id": 9, "title": "untitled", "url": null, "status": null,
                       "source_name": null, "collected_at": null}"#;

        let item: RecentItem = serde_json::from_str(json).unwrap();
        assert!(item.url.is_none());
        assert!(item.collected_at.is_none());
    }

    #[test]
    fn test_default_view_is_empty() {
        let view = DashboardView::default();
        assert_eq!(view.stats.sources_count, 0);
        assert!(view.trend.is_empty());
        assert!(view.source_health.is_empty());
        assert!(view.recent.is_empty());
    }
}
