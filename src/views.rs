//! Plain-text renderings of store slots for the terminal.

use std::fmt::Write;

use crate::format::{format_date, format_number, format_percentage};
use crate::insights::{CompletionBand, ImpactEquivalents};
use crate::models::{
    AnalyticsSnapshot, CategoryPerformance, DashboardStats, EnvironmentalImpact,
    LeaderboardEntry, Pagination, PerformanceReport, ResidentRef, TrendPoint, ZoneStat,
};
use crate::store::StoreState;

fn percent(rate: f64) -> String {
    format_percentage(Some(rate), 1)
}

fn number(value: f64) -> String {
    format_number(Some(value))
}

/// `Good (blue)`: the band label with its status colour.
fn band(rate: f64) -> String {
    let band = CompletionBand::from_rate(rate);
    format!("{} ({})", band.label(), band.color())
}

fn zone_of(resident: Option<&ResidentRef>) -> &str {
    resident
        .and_then(ResidentRef::profile)
        .and_then(|profile| profile.zone.as_ref())
        .map(|zone| zone.display_name())
        .unwrap_or("no zone")
}

pub fn reports(reports: &[PerformanceReport], pagination: Option<&Pagination>) -> String {
    let mut output = String::new();
    match pagination {
        Some(page) => {
            let _ = writeln!(
                output,
                "Performance reports (page {} of {}, {} total):",
                page.page, page.pages, page.total
            );
        }
        None => {
            let _ = writeln!(output, "Performance reports:");
        }
    }

    if reports.is_empty() {
        let _ = writeln!(output, "No reports for these filters.");
        return output;
    }

    for report in reports {
        let period = report
            .report_period
            .kind
            .map(|p| p.as_str())
            .unwrap_or("unknown");
        let grade = report
            .performance_grade
            .map(|g| g.to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            output,
            "- {} [{}] grade {} · {}/{} tasks ({}) · {} pts",
            report.resident_name(),
            period,
            grade,
            report.task_metrics.completed,
            report.task_metrics.assigned,
            percent(report.task_metrics.completion_rate),
            number(report.task_metrics.total_points as f64)
        );
    }
    output
}

pub fn report_detail(report: &PerformanceReport) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Report {} for {}", report.id, report.resident_name());
    if let (Some(start), Some(end)) = (report.report_period.start, report.report_period.end) {
        let _ = writeln!(
            output,
            "Period: {} to {}",
            format_date(start.date_naive()),
            format_date(end.date_naive())
        );
    }
    if let Some(grade) = report.performance_grade {
        let _ = writeln!(output, "Grade: {grade}");
    }
    let _ = writeln!(
        output,
        "Tasks: {}/{} completed ({}, {})",
        report.task_metrics.completed,
        report.task_metrics.assigned,
        percent(report.task_metrics.completion_rate),
        band(report.task_metrics.completion_rate)
    );
    let _ = writeln!(
        output,
        "Points: {} (rank {}, percentile {})",
        number(report.points_metrics.total_earned as f64),
        report
            .points_metrics
            .rank
            .map(|r| r.to_string())
            .unwrap_or_else(|| "-".to_string()),
        percent(report.points_metrics.percentile)
    );
    let _ = writeln!(
        output,
        "Streak: {} current, {} longest",
        report.streak_metrics.current_streak, report.streak_metrics.longest_streak
    );
    let _ = writeln!(
        output,
        "Versus average: {:+.1}",
        report.comparison_metrics.vs_average
    );
    if let Some(level) = &report.engagement_level {
        let _ = writeln!(output, "Engagement: {level}");
    }
    output.push_str(&impact(&report.environmental_impact));
    output
}

pub fn leaderboard(title: &str, entries: &[LeaderboardEntry]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{title}:");
    if entries.is_empty() {
        let _ = writeln!(output, "No residents ranked for these filters.");
        return output;
    }
    for (index, entry) in entries.iter().enumerate() {
        let _ = writeln!(
            output,
            "#{} {} ({}) {} [{}] {}/{} tasks · {} pts",
            index + 1,
            entry.resident_name(),
            zone_of(entry.resident.as_ref()),
            percent(entry.completion_rate),
            band(entry.completion_rate),
            entry.completed_tasks,
            entry.total_tasks,
            number(entry.total_points as f64)
        );
    }
    output
}

pub fn analytics(snapshot: &AnalyticsSnapshot) -> String {
    let mut output = String::new();
    let metrics = &snapshot.task_metrics;
    let _ = writeln!(
        output,
        "Completion: {} ({}/{} tasks, {})",
        percent(metrics.completion_rate),
        metrics.completed,
        metrics.assigned,
        band(metrics.completion_rate)
    );
    if let Some(grade) = snapshot.performance_grade {
        let _ = writeln!(output, "Grade: {grade}");
    }
    let _ = writeln!(
        output,
        "Points: {} · streak {} (best {})",
        number(snapshot.points_metrics.total_earned as f64),
        snapshot.streak_metrics.current_streak,
        snapshot.streak_metrics.longest_streak
    );
    if !snapshot.category_performance.is_empty() {
        output.push_str(&categories(&snapshot.category_performance));
    }
    output.push_str(&impact(&snapshot.environmental_impact));
    output
}

pub fn categories(categories: &[CategoryPerformance]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "By category:");
    if categories.is_empty() {
        let _ = writeln!(output, "No category data.");
    }
    for category in categories {
        let _ = writeln!(
            output,
            "- {}: {} [{}]",
            category.category,
            percent(category.completion_rate),
            band(category.completion_rate)
        );
    }
    output
}

pub fn trends(points: &[TrendPoint]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Monthly trend:");
    if points.is_empty() {
        let _ = writeln!(output, "No trend data for this window.");
    }
    for point in points {
        let _ = writeln!(
            output,
            "- {}: {} tasks, {} pts, avg completion {}",
            point.label(),
            point.total_completed,
            number(point.total_points as f64),
            percent(point.avg_completion_rate)
        );
    }
    output
}

pub fn impact(impact: &EnvironmentalImpact) -> String {
    let eq = ImpactEquivalents::from(impact);
    let mut output = String::new();
    let _ = writeln!(output, "Environmental impact:");
    let _ = writeln!(
        output,
        "- CO2 saved: {} kg (~{} trees, ~{} km not driven)",
        number(impact.co2_saved),
        number(eq.trees.round()),
        number(eq.car_km_avoided.round())
    );
    let _ = writeln!(output, "- Waste recycled: {} kg", number(impact.waste_recycled));
    let _ = writeln!(
        output,
        "- Water saved: {} L (~{} showers)",
        number(impact.water_saved),
        number(eq.showers.round())
    );
    let _ = writeln!(
        output,
        "- Energy saved: {} kWh (~{} household days)",
        number(impact.energy_saved),
        number(eq.household_days.round())
    );
    output
}

pub fn zones(zones: &[ZoneStat]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Zone comparison:");
    if zones.is_empty() {
        let _ = writeln!(output, "No zones reported.");
    }
    for zone in zones {
        let name = zone
            .zone
            .as_ref()
            .map(|z| z.display_name())
            .unwrap_or("unassigned");
        let _ = writeln!(
            output,
            "- {}: {} residents, {} tasks, {} pts, avg completion {}",
            name,
            zone.residents,
            zone.total_completed,
            number(zone.total_points as f64),
            percent(zone.avg_completion_rate)
        );
    }
    output
}

pub fn stats(totals: &DashboardStats) -> String {
    let mut output = String::new();
    let _ = writeln!(
        output,
        "{} reports · {} active residents · avg completion {} · {} pts",
        totals.total_reports,
        totals.active_residents,
        percent(totals.avg_completion_rate),
        number(totals.total_points as f64)
    );
    if !totals.grade_distribution.is_empty() {
        let grades: Vec<String> = totals
            .grade_distribution
            .iter()
            .map(|(grade, count)| format!("{grade}: {count}"))
            .collect();
        let _ = writeln!(output, "Grades: {}", grades.join(", "));
    }
    output
}

pub fn dashboard(state: &StoreState) -> String {
    let mut output = String::new();
    match &state.dashboard_stats {
        Some(totals) => output.push_str(&stats(totals)),
        None => {
            let _ = writeln!(output, "Dashboard stats unavailable.");
        }
    }
    output.push_str(&leaderboard("Top performers", &state.top_performers));
    output.push_str(&zones(&state.zone_comparison));
    if state.is_loading() {
        let _ = writeln!(output, "(refresh in progress)");
    }
    if let Some(error) = &state.error {
        let _ = writeln!(output, "(last refresh error: {error})");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ResidentProfile, TaskMetrics, ZoneRef};

    #[test]
    fn leaderboard_lines_carry_rank_zone_and_band() {
        let entries = vec![LeaderboardEntry {
            resident: Some(ResidentRef::Profile(ResidentProfile {
                name: "Avery Lee".to_string(),
                zone: Some(ZoneRef::Named {
                    id: None,
                    name: "North".to_string(),
                }),
                ..ResidentProfile::default()
            })),
            completion_rate: 64.26,
            total_tasks: 20,
            completed_tasks: 13,
            total_points: 1300,
        }];
        let text = leaderboard("Leaderboard", &entries);
        assert!(text.contains("#1 Avery Lee (North) 64.3% [Good (blue)] 13/20 tasks · 1,300 pts"));
    }

    #[test]
    fn empty_listings_say_so() {
        assert!(reports(&[], None).contains("No reports"));
        assert!(trends(&[]).contains("No trend data"));
        assert!(zones(&[]).contains("No zones"));
    }

    #[test]
    fn report_lines_show_pagination() {
        let report = PerformanceReport {
            resident: Some(ResidentRef::Id("u7".to_string())),
            task_metrics: TaskMetrics {
                assigned: 10,
                completed: 7,
                completion_rate: 70.0,
                total_points: 2500,
            },
            ..PerformanceReport::default()
        };
        let page = Pagination {
            page: 2,
            limit: 10,
            total: 11,
            pages: 2,
        };
        let text = reports(&[report], Some(&page));
        assert!(text.starts_with("Performance reports (page 2 of 2, 11 total):"));
        assert!(text.contains("- u7 [unknown] grade - · 7/10 tasks (70.0%) · 2,500 pts"));
    }

    #[test]
    fn dashboard_without_stats_still_renders() {
        let mut state = StoreState::default();
        state.error = Some("Failed to fetch dashboard stats".to_string());
        let text = dashboard(&state);
        assert!(text.contains("Dashboard stats unavailable."));
        assert!(text.contains("Top performers:"));
        assert!(text.contains("Zone comparison:"));
        assert!(text.contains("last refresh error: Failed to fetch dashboard stats"));
        assert!(!text.contains("refresh in progress"));
    }

    #[test]
    fn stats_list_grade_distribution() {
        let totals: DashboardStats = serde_json::from_value(serde_json::json!({
            "totalReports": 1200,
            "activeResidents": 85,
            "avgCompletionRate": 72.26,
            "totalPoints": 45000,
            "gradeDistribution": { "A": 10 }
        }))
        .unwrap();
        let text = stats(&totals);
        assert!(text.starts_with("1200 reports · 85 active residents · avg completion 72.3%"));
        assert!(text.contains("45,000 pts"));
        assert!(text.contains("Grades: A: 10"));
    }

    #[test]
    fn category_lines_show_band_colour() {
        let text = categories(&[CategoryPerformance {
            category: "recycling".to_string(),
            completion_rate: 35.0,
            ..CategoryPerformance::default()
        }]);
        assert!(text.contains("- recycling: 35.0% [Needs improvement (red)]"));
    }

    #[test]
    fn impact_lists_equivalents() {
        let text = impact(&EnvironmentalImpact {
            co2_saved: 2177.0,
            waste_recycled: 12.5,
            water_saved: 6500.0,
            energy_saved: 290.0,
        });
        assert!(text.contains("CO2 saved: 2,177 kg (~100 trees"));
        assert!(text.contains("Water saved: 6,500 L (~100 showers)"));
        assert!(text.contains("~10 household days"));
    }
}
