//! Named dashboard poll operations
//!
//! Wires each backend endpoint to the view slice it owns: an explicit
//! name-to-setter mapping, never positional correspondence. Adding a slice
//! means adding one entry here and one field on `DashboardView`.

use crate::client::BackendClient;
use crate::poller::{PollOperation, SliceUpdate};
use crate::view::DashboardView;

/// The fixed operation set one dashboard refresh cycle fans out
pub fn dashboard_operations(
    client: BackendClient,
    trend_days: u32,
    recent_limit: u32,
) -> Vec<PollOperation<DashboardView>> {
    let stats_client = client.clone();
    let trend_client = client.clone();
    let health_client = client.clone();
    let recent_client = client;

    vec![
        PollOperation::new("dashboard_stats", move || {
            let client = stats_client.clone();
            async move {
                let stats = client.dashboard_stats().await?;
                Ok(SliceUpdate::new(move |view: &mut DashboardView| {
                    view.stats = stats;
                }))
            }
        }),
        PollOperation::new("collection_trend", move || {
            let client = trend_client.clone();
            async move {
                let trend = client.collection_trend(trend_days).await?;
                Ok(SliceUpdate::new(move |view: &mut DashboardView| {
                    view.trend = trend;
                }))
            }
        }),
        PollOperation::new("source_health", move || {
            let client = health_client.clone();
            async move {
                let rows = client.source_health().await?;
                Ok(SliceUpdate::new(move |view: &mut DashboardView| {
                    view.source_health = rows;
                }))
            }
        }),
        PollOperation::new("recent_content", move || {
            let client = recent_client.clone();
            async move {
                let items = client.recent_content(recent_limit).await?;
                Ok(SliceUpdate::new(move |view: &mut DashboardView| {
                    view.recent = items;
                }))
            }
        }),
    ]
}
