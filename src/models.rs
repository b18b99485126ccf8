use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Reporting granularity used to bucket metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum Period {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
    AllTime,
}

impl Period {
    pub fn as_str(self) -> &'static str {
        match self {
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Quarterly => "quarterly",
            Period::Yearly => "yearly",
            Period::AllTime => "all-time",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "A+")]
    APlus,
    A,
    B,
    C,
    D,
    F,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
            Grade::Unknown => "?",
        };
        f.write_str(label)
    }
}

/// Zone reference; the backend sends either a bare id or a populated document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ZoneRef {
    Named {
        #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default)]
        name: String,
    },
    Id(String),
}

impl ZoneRef {
    pub fn display_name(&self) -> &str {
        match self {
            ZoneRef::Named { name, .. } if !name.is_empty() => name,
            ZoneRef::Named { id, .. } => id.as_deref().unwrap_or(""),
            ZoneRef::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResidentProfile {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zone: Option<ZoneRef>,
}

/// Resident reference; populated on most list endpoints, a bare id otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResidentRef {
    Profile(ResidentProfile),
    Id(String),
}

impl ResidentRef {
    pub fn display_name(&self) -> &str {
        match self {
            ResidentRef::Profile(profile) if !profile.name.is_empty() => &profile.name,
            ResidentRef::Profile(profile) => profile.id.as_deref().unwrap_or(""),
            ResidentRef::Id(id) => id,
        }
    }

    pub fn profile(&self) -> Option<&ResidentProfile> {
        match self {
            ResidentRef::Profile(profile) => Some(profile),
            ResidentRef::Id(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportPeriod {
    #[serde(rename = "type")]
    pub kind: Option<Period>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskMetrics {
    #[serde(alias = "totalAssigned")]
    pub assigned: u32,
    #[serde(alias = "totalCompleted")]
    pub completed: u32,
    pub completion_rate: f64,
    pub total_points: i64,
}

impl TaskMetrics {
    /// Numeric invariants the backend is trusted to uphold but does not guarantee.
    pub fn anomalies(&self) -> Vec<String> {
        let mut found = Vec::new();
        if !(0.0..=100.0).contains(&self.completion_rate) {
            found.push(format!(
                "completion rate {} outside 0..=100",
                self.completion_rate
            ));
        }
        if self.completed > self.assigned {
            found.push(format!(
                "completed {} exceeds assigned {}",
                self.completed, self.assigned
            ));
        }
        found
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreakMetrics {
    pub current_streak: u32,
    pub longest_streak: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PointsMetrics {
    pub total_earned: i64,
    pub rank: Option<u32>,
    pub percentile: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ComparisonMetrics {
    pub vs_average: f64,
}

/// Sustainability figures computed upstream; passed through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EnvironmentalImpact {
    pub co2_saved: f64,
    pub waste_recycled: f64,
    pub water_saved: f64,
    pub energy_saved: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerformanceReport {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub resident: Option<ResidentRef>,
    pub report_period: ReportPeriod,
    pub task_metrics: TaskMetrics,
    pub performance_grade: Option<Grade>,
    pub streak_metrics: StreakMetrics,
    pub points_metrics: PointsMetrics,
    pub comparison_metrics: ComparisonMetrics,
    pub environmental_impact: EnvironmentalImpact,
    pub engagement_level: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl PerformanceReport {
    pub fn resident_name(&self) -> &str {
        self.resident
            .as_ref()
            .map(ResidentRef::display_name)
            .unwrap_or("")
    }
}

/// One leaderboard row. Rank is positional and not carried in the payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LeaderboardEntry {
    pub resident: Option<ResidentRef>,
    pub completion_rate: f64,
    pub total_tasks: u32,
    pub completed_tasks: u32,
    pub total_points: i64,
}

impl LeaderboardEntry {
    pub fn resident_name(&self) -> &str {
        self.resident
            .as_ref()
            .map(ResidentRef::display_name)
            .unwrap_or("")
    }
}

/// Leaderboard row paired with its 1-based position in the backend ordering.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedEntry {
    pub rank: usize,
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
}

pub fn rank_entries(entries: &[LeaderboardEntry]) -> Vec<RankedEntry> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| RankedEntry {
            rank: index + 1,
            entry: entry.clone(),
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryPerformance {
    pub category: String,
    pub completion_rate: f64,
    pub total_tasks: u32,
    pub completed_tasks: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsSnapshot {
    pub task_metrics: TaskMetrics,
    pub points_metrics: PointsMetrics,
    pub streak_metrics: StreakMetrics,
    pub comparison_metrics: ComparisonMetrics,
    pub performance_grade: Option<Grade>,
    pub environmental_impact: EnvironmentalImpact,
    pub category_performance: Vec<CategoryPerformance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrendPoint {
    pub month: u32,
    pub year: i32,
    pub total_completed: u32,
    pub total_points: i64,
    pub avg_completion_rate: f64,
    pub environmental_impact: EnvironmentalImpact,
}

impl TrendPoint {
    pub fn label(&self) -> String {
        const MONTHS: [&str; 12] = [
            "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
        ];
        match self.month {
            1..=12 => format!("{} {}", MONTHS[(self.month - 1) as usize], self.year),
            _ => format!("{}-{:02}", self.year, self.month),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoneStat {
    pub zone: Option<ZoneRef>,
    #[serde(alias = "residentCount")]
    pub residents: u32,
    pub total_completed: u32,
    pub total_points: i64,
    pub avg_completion_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardStats {
    pub total_reports: u32,
    pub active_residents: u32,
    pub avg_completion_rate: f64,
    pub total_points: i64,
    pub grade_distribution: BTreeMap<String, u32>,
    pub environmental_impact: EnvironmentalImpact,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub pages: u32,
}
