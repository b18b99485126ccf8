//! Client-side cache of performance data.
//!
//! Each fetch action owns one slot. A slot is replaced wholesale on success
//! and left untouched on failure, so a failed refresh never blanks data that
//! was already shown. Every slot carries a request sequence number; a
//! response that resolves after a newer request for the same slot was issued
//! is discarded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};
use url::form_urlencoded;

use crate::api::PerformanceApi;
use crate::error::{ApiError, ApiResult};
use crate::filters::{FilterOverride, Filters};
use crate::models::{
    AnalyticsSnapshot, CategoryPerformance, DashboardStats, EnvironmentalImpact,
    LeaderboardEntry, Pagination, Period, PerformanceReport, TaskMetrics, TrendPoint, ZoneStat,
};

pub const REPORTS_PATH: &str = "/performance";
pub const GENERATE_PATH: &str = "/performance/generate";
pub const BULK_GENERATE_PATH: &str = "/performance/bulk-generate";
pub const LEADERBOARD_PATH: &str = "/performance/leaderboard";
pub const TOP_PERFORMERS_PATH: &str = "/performance/top-performers";
pub const MY_ANALYTICS_PATH: &str = "/performance/my/analytics";
pub const CATEGORY_ANALYTICS_PATH: &str = "/performance/analytics/categories";
pub const TRENDS_PATH: &str = "/performance/trends";
pub const ENVIRONMENTAL_IMPACT_PATH: &str = "/performance/environmental-impact";
pub const ZONE_COMPARISON_PATH: &str = "/performance/zones/comparison";
pub const DASHBOARD_STATS_PATH: &str = "/performance/dashboard/stats";

/// Percent-encodes one path segment so an id cannot add segments or a query.
fn segment(id: &str) -> String {
    // form encoding writes a space as '+'; a literal '+' is already %2B
    form_urlencoded::byte_serialize(id.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn report_path(id: &str) -> String {
    format!("{REPORTS_PATH}/{}", segment(id))
}

fn resident_analytics_path(id: &str) -> String {
    format!("/performance/resident/{}/analytics", segment(id))
}

/// Transient user-facing notifications.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        tracing::info!(target: "notify", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::warn!(target: "notify", "{message}");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Reports,
    CurrentReport,
    Leaderboard,
    TopPerformers,
    MyAnalytics,
    ResidentAnalytics,
    CategoryAnalytics,
    Trends,
    EnvironmentalImpact,
    ZoneComparison,
    DashboardStats,
}

const SLOT_COUNT: usize = 11;

impl Slot {
    fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Reports => "reports",
            Slot::CurrentReport => "current_report",
            Slot::Leaderboard => "leaderboard",
            Slot::TopPerformers => "top_performers",
            Slot::MyAnalytics => "my_analytics",
            Slot::ResidentAnalytics => "resident_analytics",
            Slot::CategoryAnalytics => "category_analytics",
            Slot::Trends => "trends",
            Slot::EnvironmentalImpact => "environmental_impact",
            Slot::ZoneComparison => "zone_comparison",
            Slot::DashboardStats => "dashboard_stats",
        }
    }
}

/// What happened to a fetch once its response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    /// A newer request for the same slot was issued; the response was dropped.
    Stale,
    Failed,
}

#[derive(Debug, Clone, Default)]
pub struct StoreState {
    pub reports: Vec<PerformanceReport>,
    pub reports_pagination: Option<Pagination>,
    pub current_report: Option<PerformanceReport>,
    pub leaderboard: Vec<LeaderboardEntry>,
    pub top_performers: Vec<LeaderboardEntry>,
    pub my_analytics: Option<AnalyticsSnapshot>,
    pub resident_analytics: Option<AnalyticsSnapshot>,
    pub category_analytics: Vec<CategoryPerformance>,
    pub trends: Vec<TrendPoint>,
    pub environmental_impact: Option<EnvironmentalImpact>,
    pub zone_comparison: Vec<ZoneStat>,
    pub dashboard_stats: Option<DashboardStats>,
    pub filters: Filters,
    pub error: Option<String>,
    in_flight: usize,
    sequence: [u64; SLOT_COUNT],
}

impl StoreState {
    pub fn is_loading(&self) -> bool {
        self.in_flight > 0
    }
}

struct Ticket {
    slot: Slot,
    seq: u64,
}

struct Payload<T> {
    data: T,
    pagination: Option<Pagination>,
}

pub struct PerformanceStore<A> {
    api: A,
    notifier: Arc<dyn Notifier>,
    defaults: Filters,
    state: Mutex<StoreState>,
}

impl<A: PerformanceApi> PerformanceStore<A> {
    pub fn new(api: A, defaults: Filters) -> Self {
        let state = StoreState {
            filters: defaults.clone(),
            ..StoreState::default()
        };
        Self {
            api,
            notifier: Arc::new(TracingNotifier),
            defaults,
            state: Mutex::new(state),
        }
    }

    #[cfg(test)]
    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> StoreState {
        self.lock().clone()
    }

    pub fn read<R>(&self, f: impl FnOnce(&StoreState) -> R) -> R {
        f(&self.lock())
    }

    pub fn set_filters(&self, over: &FilterOverride) {
        let mut state = self.lock();
        state.filters = state.filters.merged(over);
    }

    pub fn clear_filters(&self) {
        self.lock().filters = self.defaults.clone();
    }

    fn query(&self, over: &FilterOverride) -> Vec<(String, String)> {
        self.lock().filters.merged(over).query_pairs()
    }

    fn begin(&self, slot: Slot) -> Ticket {
        let mut state = self.lock();
        state.in_flight += 1;
        state.error = None;
        let seq = &mut state.sequence[slot.index()];
        *seq += 1;
        Ticket { slot, seq: *seq }
    }

    async fn request<T>(&self, path: &str, query: &[(String, String)]) -> ApiResult<Payload<T>>
    where
        T: DeserializeOwned + Default,
    {
        let envelope = self.api.get(path, query).await?;
        let data = if envelope.data.is_null() {
            T::default()
        } else {
            serde_json::from_value(envelope.data)?
        };
        Ok(Payload {
            data,
            pagination: envelope.pagination,
        })
    }

    /// Settles one response against the state. Returns the message to surface, if any.
    fn settle<T>(
        state: &mut StoreState,
        ticket: Ticket,
        result: ApiResult<Payload<T>>,
        fallback: &str,
        apply: impl FnOnce(&mut StoreState, Payload<T>),
    ) -> (Outcome, Option<String>) {
        state.in_flight = state.in_flight.saturating_sub(1);

        let latest = state.sequence[ticket.slot.index()];
        if latest != ticket.seq {
            debug!(
                slot = ticket.slot.as_str(),
                seq = ticket.seq,
                latest,
                "discarding out-of-order response"
            );
            return (Outcome::Stale, None);
        }

        match result {
            Ok(payload) => {
                apply(state, payload);
                (Outcome::Applied, None)
            }
            Err(err) => {
                let message = err.user_message(fallback);
                warn!(slot = ticket.slot.as_str(), error = %err, "fetch failed");
                state.error = Some(message.clone());
                (Outcome::Failed, Some(message))
            }
        }
    }

    async fn fetch<T, F>(
        &self,
        slot: Slot,
        path: &str,
        query: Vec<(String, String)>,
        fallback: &'static str,
        apply: F,
    ) -> Outcome
    where
        T: DeserializeOwned + Default + Send,
        F: FnOnce(&mut StoreState, Payload<T>) + Send,
    {
        let ticket = self.begin(slot);
        let result = self.request::<T>(path, &query).await;
        let (outcome, message) = {
            let mut state = self.lock();
            Self::settle(&mut state, ticket, result, fallback, apply)
        };
        if let Some(message) = message {
            self.notifier.error(&message);
        }
        outcome
    }

    pub async fn fetch_reports(&self, over: &FilterOverride) -> Outcome {
        let query = self.query(over);
        self.fetch(
            Slot::Reports,
            REPORTS_PATH,
            query,
            "Failed to fetch performance reports",
            |state, payload: Payload<Vec<PerformanceReport>>| {
                for report in &payload.data {
                    warn_on_anomalies(&report.id, &report.task_metrics);
                }
                state.reports = payload.data;
                state.reports_pagination = payload.pagination;
            },
        )
        .await
    }

    pub async fn fetch_report(&self, id: &str) -> Outcome {
        self.fetch(
            Slot::CurrentReport,
            &report_path(id),
            Vec::new(),
            "Failed to fetch performance report",
            |state, payload: Payload<Option<PerformanceReport>>| {
                if let Some(report) = &payload.data {
                    warn_on_anomalies(&report.id, &report.task_metrics);
                }
                state.current_report = payload.data;
            },
        )
        .await
    }

    pub async fn fetch_leaderboard(&self, over: &FilterOverride) -> Outcome {
        let query = self.query(over);
        self.fetch(
            Slot::Leaderboard,
            LEADERBOARD_PATH,
            query,
            "Failed to fetch leaderboard",
            |state, payload: Payload<Vec<LeaderboardEntry>>| state.leaderboard = payload.data,
        )
        .await
    }

    pub async fn fetch_top_performers(&self, over: &FilterOverride) -> Outcome {
        let query = self.query(over);
        self.fetch(
            Slot::TopPerformers,
            TOP_PERFORMERS_PATH,
            query,
            "Failed to fetch top performers",
            |state, payload: Payload<Vec<LeaderboardEntry>>| state.top_performers = payload.data,
        )
        .await
    }

    pub async fn fetch_my_analytics(&self, over: &FilterOverride) -> Outcome {
        let query = self.query(over);
        self.fetch(
            Slot::MyAnalytics,
            MY_ANALYTICS_PATH,
            query,
            "Failed to fetch analytics",
            |state, payload: Payload<Option<AnalyticsSnapshot>>| {
                if let Some(snapshot) = &payload.data {
                    warn_on_anomalies("my analytics", &snapshot.task_metrics);
                }
                state.my_analytics = payload.data;
            },
        )
        .await
    }

    pub async fn fetch_resident_analytics(&self, id: &str, over: &FilterOverride) -> Outcome {
        let query = self.query(over);
        self.fetch(
            Slot::ResidentAnalytics,
            &resident_analytics_path(id),
            query,
            "Failed to fetch resident analytics",
            |state, payload: Payload<Option<AnalyticsSnapshot>>| {
                if let Some(snapshot) = &payload.data {
                    warn_on_anomalies("resident analytics", &snapshot.task_metrics);
                }
                state.resident_analytics = payload.data;
            },
        )
        .await
    }

    pub async fn fetch_category_analytics(&self, over: &FilterOverride) -> Outcome {
        let query = self.query(over);
        self.fetch(
            Slot::CategoryAnalytics,
            CATEGORY_ANALYTICS_PATH,
            query,
            "Failed to fetch category analytics",
            |state, payload: Payload<Vec<CategoryPerformance>>| {
                state.category_analytics = payload.data
            },
        )
        .await
    }

    pub async fn fetch_trends(&self, over: &FilterOverride) -> Outcome {
        let query = self.query(over);
        self.fetch(
            Slot::Trends,
            TRENDS_PATH,
            query,
            "Failed to fetch performance trends",
            |state, payload: Payload<Vec<TrendPoint>>| state.trends = payload.data,
        )
        .await
    }

    pub async fn fetch_environmental_impact(&self, over: &FilterOverride) -> Outcome {
        let query = self.query(over);
        self.fetch(
            Slot::EnvironmentalImpact,
            ENVIRONMENTAL_IMPACT_PATH,
            query,
            "Failed to fetch environmental impact",
            |state, payload: Payload<Option<EnvironmentalImpact>>| {
                state.environmental_impact = payload.data
            },
        )
        .await
    }

    pub async fn fetch_zone_comparison(&self, over: &FilterOverride) -> Outcome {
        let query = self.query(over);
        self.fetch(
            Slot::ZoneComparison,
            ZONE_COMPARISON_PATH,
            query,
            "Failed to fetch zone comparison",
            |state, payload: Payload<Vec<ZoneStat>>| state.zone_comparison = payload.data,
        )
        .await
    }

    pub async fn fetch_dashboard_stats(&self, over: &FilterOverride) -> Outcome {
        let query = self.query(over);
        self.fetch(
            Slot::DashboardStats,
            DASHBOARD_STATS_PATH,
            query,
            "Failed to fetch dashboard stats",
            |state, payload: Payload<Option<DashboardStats>>| state.dashboard_stats = payload.data,
        )
        .await
    }

    /// Loads stats, top performers and the zone comparison together.
    /// Nothing is written until all three responses are in.
    pub async fn load_dashboard(&self, over: &FilterOverride) -> [Outcome; 3] {
        let query = self.query(over);
        let stats_ticket = self.begin(Slot::DashboardStats);
        let top_ticket = self.begin(Slot::TopPerformers);
        let zones_ticket = self.begin(Slot::ZoneComparison);

        let (stats, top, zones) = tokio::join!(
            self.request::<Option<DashboardStats>>(DASHBOARD_STATS_PATH, &query),
            self.request::<Vec<LeaderboardEntry>>(TOP_PERFORMERS_PATH, &query),
            self.request::<Vec<ZoneStat>>(ZONE_COMPARISON_PATH, &query),
        );

        let (outcomes, messages) = {
            let mut state = self.lock();
            let (stats_outcome, stats_message) = Self::settle(
                &mut state,
                stats_ticket,
                stats,
                "Failed to fetch dashboard stats",
                |state, payload| state.dashboard_stats = payload.data,
            );
            let (top_outcome, top_message) = Self::settle(
                &mut state,
                top_ticket,
                top,
                "Failed to fetch top performers",
                |state, payload| state.top_performers = payload.data,
            );
            let (zones_outcome, zones_message) = Self::settle(
                &mut state,
                zones_ticket,
                zones,
                "Failed to fetch zone comparison",
                |state, payload| state.zone_comparison = payload.data,
            );
            (
                [stats_outcome, top_outcome, zones_outcome],
                [stats_message, top_message, zones_message],
            )
        };

        for message in messages.into_iter().flatten() {
            self.notifier.error(&message);
        }
        outcomes
    }

    /// Asks the backend to build a report. The `reports` slot is not refreshed.
    pub async fn generate_report(
        &self,
        resident_id: &str,
        period: Period,
    ) -> ApiResult<PerformanceReport> {
        let body = json!({ "residentId": resident_id, "period": period });
        let result = self.write(GENERATE_PATH, &body).await.and_then(|envelope| {
            let report: PerformanceReport = serde_json::from_value(envelope.data)?;
            Ok((report, envelope.message))
        });

        match result {
            Ok((report, message)) => {
                let message =
                    message.unwrap_or_else(|| "Performance report generated successfully".into());
                self.notifier.success(&message);
                Ok(report)
            }
            Err(err) => Err(self.fail_write(err, "Failed to generate performance report")),
        }
    }

    /// Triggers report generation for every resident; returns the backend summary.
    pub async fn bulk_generate_reports(&self, period: Period) -> ApiResult<String> {
        let body = json!({ "period": period });
        match self.write(BULK_GENERATE_PATH, &body).await {
            Ok(envelope) => {
                let message = envelope
                    .message
                    .unwrap_or_else(|| "Bulk report generation started".to_string());
                self.notifier.success(&message);
                Ok(message)
            }
            Err(err) => Err(self.fail_write(err, "Failed to generate reports")),
        }
    }

    async fn write(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> ApiResult<crate::api::Envelope> {
        {
            let mut state = self.lock();
            state.in_flight += 1;
            state.error = None;
        }
        let result = self.api.post(path, body).await;
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        result
    }

    fn fail_write(&self, err: ApiError, fallback: &str) -> ApiError {
        let message = err.user_message(fallback);
        warn!(error = %err, "write failed");
        self.lock().error = Some(message.clone());
        self.notifier.error(&message);
        err
    }
}

fn warn_on_anomalies(context: &str, metrics: &TaskMetrics) {
    for anomaly in metrics.anomalies() {
        warn!(context, "{anomaly}");
    }
}
