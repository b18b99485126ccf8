use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::format::{format_date_for_export, format_number, format_percentage};
use crate::insights::CompletionBand;
use crate::models::{PerformanceReport, RankedEntry, TrendPoint};

/// A projected export value. `None` at the column level means "absent".
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(text) => f.write_str(text),
            Cell::Int(value) => write!(f, "{value}"),
            Cell::Float(value) => write!(f, "{value}"),
            Cell::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<u32> for Cell {
    fn from(value: u32) -> Self {
        Cell::Int(value.into())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Float(value)
    }
}

impl From<bool> for Cell {
    fn from(value: bool) -> Self {
        Cell::Bool(value)
    }
}

type Accessor<T> = Box<dyn Fn(&T) -> Option<Cell> + Send + Sync>;

/// Header plus the projection used to pull one value out of a record.
pub struct ExportColumn<T> {
    pub header: String,
    accessor: Accessor<T>,
}

impl<T> ExportColumn<T> {
    pub fn new(
        header: impl Into<String>,
        accessor: impl Fn(&T) -> Option<Cell> + Send + Sync + 'static,
    ) -> Self {
        Self {
            header: header.into(),
            accessor: Box::new(accessor),
        }
    }

    pub fn value(&self, record: &T) -> Option<Cell> {
        (self.accessor)(record)
    }
}

impl<T: Serialize> ExportColumn<T> {
    /// Column reading a dot-delimited path (`resident.zone.name`) from the
    /// serialized record. Missing segments yield an absent value.
    pub fn keyed(header: impl Into<String>, key: &str) -> Self {
        let path: Vec<String> = key.split('.').map(str::to_string).collect();
        Self::new(header, move |record: &T| {
            let value = serde_json::to_value(record).ok()?;
            lookup_path(&value, &path).and_then(cell_from_json)
        })
    }

    /// Like [`ExportColumn::keyed`], rendering the value as an export date.
    /// Values that are not a recognised date render empty.
    pub fn keyed_date(header: impl Into<String>, key: &str) -> Self {
        let path: Vec<String> = key.split('.').map(str::to_string).collect();
        Self::new(header, move |record: &T| {
            let value = serde_json::to_value(record).ok()?;
            let raw = lookup_path(&value, &path).and_then(Value::as_str);
            Some(format_date_for_export(raw).into())
        })
    }
}

pub fn lookup_path<'a, S: AsRef<str>>(value: &'a Value, path: &[S]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, segment| {
        let segment = segment.as_ref();
        match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    })
}

fn cell_from_json(value: &Value) -> Option<Cell> {
    match value {
        Value::Null => None,
        Value::Bool(flag) => Some(Cell::Bool(*flag)),
        Value::Number(number) => match number.as_i64() {
            Some(int) => Some(Cell::Int(int)),
            None => number.as_f64().map(Cell::Float),
        },
        Value::String(text) => Some(Cell::Text(text.clone())),
        other => Some(Cell::Text(other.to_string())),
    }
}

pub fn headers<T>(columns: &[ExportColumn<T>]) -> Vec<&str> {
    columns.iter().map(|c| c.header.as_str()).collect()
}

/// CSV text: header row, then one row per record, `\n` separated with no
/// trailing newline. Cells are quoted only when they contain a delimiter,
/// quote or line break.
pub fn to_csv<T>(records: &[T], columns: &[ExportColumn<T>]) -> anyhow::Result<String> {
    if columns.is_empty() {
        return Ok(String::new());
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(headers(columns))?;
    for record in records {
        let row: Vec<String> = columns
            .iter()
            .map(|column| column.value(record).map(|v| v.to_string()).unwrap_or_default())
            .collect();
        writer.write_record(&row)?;
    }

    let bytes = writer.into_inner().map_err(|err| err.into_error())?;
    let mut text = String::from_utf8(bytes)?;
    if text.ends_with('\n') {
        text.pop();
    }
    Ok(text)
}

/// Export payload handed to whatever saves or opens it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub file_name: String,
    pub mime: &'static str,
    pub bytes: Vec<u8>,
}

impl ExportArtifact {
    pub fn csv(name: &str, text: String) -> Self {
        Self {
            file_name: format!("{name}.csv"),
            mime: "text/csv;charset=utf-8",
            bytes: text.into_bytes(),
        }
    }

    pub fn html(name: &str, text: String) -> Self {
        Self {
            file_name: format!("{name}.html"),
            mime: "text/html;charset=utf-8",
            bytes: text.into_bytes(),
        }
    }

    pub fn write_to(&self, dir: &Path) -> anyhow::Result<PathBuf> {
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

pub fn report_columns() -> Vec<ExportColumn<PerformanceReport>> {
    vec![
        ExportColumn::new("Resident", |r: &PerformanceReport| {
            Some(r.resident_name().into())
        }),
        ExportColumn::keyed("Email", "resident.email"),
        ExportColumn::new("Period", |r: &PerformanceReport| {
            r.report_period.kind.map(|p| p.as_str().into())
        }),
        ExportColumn::keyed_date("Period Start", "reportPeriod.start"),
        ExportColumn::keyed_date("Period End", "reportPeriod.end"),
        ExportColumn::new("Assigned", |r: &PerformanceReport| {
            Some(r.task_metrics.assigned.into())
        }),
        ExportColumn::new("Completed", |r: &PerformanceReport| {
            Some(r.task_metrics.completed.into())
        }),
        ExportColumn::new("Completion Rate", |r: &PerformanceReport| {
            Some(format_percentage(Some(r.task_metrics.completion_rate), 1).into())
        }),
        ExportColumn::new("Points", |r: &PerformanceReport| {
            Some(r.task_metrics.total_points.into())
        }),
        ExportColumn::new("Grade", |r: &PerformanceReport| {
            r.performance_grade.map(|g| g.to_string().into())
        }),
        ExportColumn::keyed("Current Streak", "streakMetrics.currentStreak"),
        ExportColumn::new("CO2 Saved (kg)", |r: &PerformanceReport| {
            Some(format_number(Some(r.environmental_impact.co2_saved)).into())
        }),
        ExportColumn::keyed_date("Generated", "createdAt"),
    ]
}

pub fn leaderboard_columns() -> Vec<ExportColumn<RankedEntry>> {
    vec![
        ExportColumn::keyed("Rank", "rank"),
        ExportColumn::keyed("Name", "resident.name"),
        ExportColumn::keyed("Email", "resident.email"),
        ExportColumn::keyed("Zone", "resident.zone.name"),
        ExportColumn::new("Completion Rate", |r: &RankedEntry| {
            Some(format_percentage(Some(r.entry.completion_rate), 1).into())
        }),
        ExportColumn::keyed("Completed Tasks", "completedTasks"),
        ExportColumn::keyed("Total Tasks", "totalTasks"),
        ExportColumn::keyed("Points", "totalPoints"),
        ExportColumn::new("Status", |r: &RankedEntry| {
            Some(CompletionBand::from_rate(r.entry.completion_rate).label().into())
        }),
    ]
}

pub fn trend_columns() -> Vec<ExportColumn<TrendPoint>> {
    vec![
        ExportColumn::new("Month", |t: &TrendPoint| Some(t.label().into())),
        ExportColumn::keyed("Tasks Completed", "totalCompleted"),
        ExportColumn::keyed("Points", "totalPoints"),
        ExportColumn::new("Avg Completion", |t: &TrendPoint| {
            Some(format_percentage(Some(t.avg_completion_rate), 1).into())
        }),
        ExportColumn::keyed("CO2 Saved (kg)", "environmentalImpact.co2Saved"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{rank_entries, LeaderboardEntry, ResidentProfile, ResidentRef};
    use serde_json::json;

    #[derive(Serialize)]
    struct Row {
        name: String,
        note: Option<String>,
        score: i64,
        active: bool,
        meta: Value,
    }

    fn row(name: &str, note: Option<&str>) -> Row {
        Row {
            name: name.to_string(),
            note: note.map(str::to_string),
            score: 0,
            active: false,
            meta: json!({ "zone": { "name": "North" } }),
        }
    }

    fn parse(text: &str) -> Vec<Vec<String>> {
        csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(text.as_bytes())
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[test]
    fn escapes_quotes_commas_and_newlines() {
        let columns = vec![ExportColumn::new("Note", |r: &Row| r.note.clone().map(Cell::Text))];
        let records = vec![row("a", Some("He said \"hi\", then left\n"))];

        let text = to_csv(&records, &columns).unwrap();
        assert_eq!(text, "Note\n\"He said \"\"hi\"\", then left\n\"");
    }

    #[test]
    fn plain_values_stay_unquoted() {
        let columns = vec![
            ExportColumn::keyed("Name", "name"),
            ExportColumn::keyed("Score", "score"),
            ExportColumn::keyed("Active", "active"),
        ];
        let text = to_csv(&[row("Avery", None)], &columns).unwrap();
        assert_eq!(text, "Name,Score,Active\nAvery,0,false");
    }

    #[test]
    fn zero_records_yield_header_only() {
        let columns: Vec<ExportColumn<Row>> = vec![
            ExportColumn::keyed("Name", "name"),
            ExportColumn::keyed("Note", "note"),
        ];
        assert_eq!(to_csv(&[], &columns).unwrap(), "Name,Note");
    }

    #[test]
    fn missing_nested_fields_render_empty() {
        let columns = vec![
            ExportColumn::keyed("Name", "name"),
            ExportColumn::keyed("Zone", "meta.zone.name"),
            ExportColumn::keyed("Ward", "meta.ward.name"),
            ExportColumn::keyed("Deep", "name.first.letter"),
            ExportColumn::keyed("Note", "note"),
        ];
        let text = to_csv(&[row("Jules", None)], &columns).unwrap();
        assert_eq!(text, "Name,Zone,Ward,Deep,Note\nJules,North,,,");
    }

    #[test]
    fn reparsed_csv_matches_projected_values() {
        let columns = vec![
            ExportColumn::keyed("Name", "name"),
            ExportColumn::keyed("Note", "note"),
            ExportColumn::keyed("Zone", "meta.zone.name"),
        ];
        let records = vec![
            row("Kiara, P.", Some("multi\nline")),
            row("\"Quoted\"", None),
            row("plain", Some("a,b,\"c\"\r\nd")),
        ];

        let text = to_csv(&records, &columns).unwrap();
        let parsed = parse(&text);

        assert_eq!(parsed.len(), records.len() + 1);
        assert_eq!(parsed[0], vec!["Name", "Note", "Zone"]);
        for (record, cells) in records.iter().zip(parsed.iter().skip(1)) {
            let expected: Vec<String> = columns
                .iter()
                .map(|c| c.value(record).map(|v| v.to_string()).unwrap_or_default())
                .collect();
            assert_eq!(cells, &expected);
        }
    }

    #[test]
    fn report_dates_use_export_format() {
        let report: PerformanceReport = serde_json::from_value(json!({
            "_id": "r1",
            "reportPeriod": {
                "type": "monthly",
                "start": "2026-03-01T00:00:00Z",
                "end": "2026-03-31T23:59:59Z"
            }
        }))
        .unwrap();
        let columns = report_columns();
        let cell = |header: &str| {
            columns
                .iter()
                .find(|column| column.header == header)
                .and_then(|column| column.value(&report))
                .map(|cell| cell.to_string())
        };

        assert_eq!(cell("Period Start").as_deref(), Some("Mar 1, 2026"));
        assert_eq!(cell("Period End").as_deref(), Some("Mar 31, 2026"));
        assert_eq!(cell("Generated").as_deref(), Some(""));
    }

    #[test]
    fn lookup_walks_arrays_by_index() {
        let value = json!({ "items": [{ "id": 7 }] });
        assert_eq!(lookup_path(&value, &["items", "0", "id"]), Some(&json!(7)));
        assert_eq!(lookup_path(&value, &["items", "x"]), None);
    }

    #[test]
    fn leaderboard_columns_rank_by_position() {
        let entries = vec![
            LeaderboardEntry {
                resident: Some(ResidentRef::Profile(ResidentProfile {
                    name: "Avery Lee".to_string(),
                    email: "avery@example.com".to_string(),
                    ..ResidentProfile::default()
                })),
                completion_rate: 92.5,
                total_tasks: 40,
                completed_tasks: 37,
                total_points: 370,
            },
            LeaderboardEntry {
                resident: Some(ResidentRef::Id("u2".to_string())),
                completion_rate: 35.0,
                ..LeaderboardEntry::default()
            },
        ];

        let text = to_csv(&rank_entries(&entries), &leaderboard_columns()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "Rank,Name,Email,Zone,Completion Rate,Completed Tasks,Total Tasks,Points,Status"
        );
        assert_eq!(lines[1], "1,Avery Lee,avery@example.com,,92.5%,37,40,370,Excellent");
        assert_eq!(lines[2], "2,,,,35.0%,0,0,0,Needs improvement");
    }

    #[test]
    fn artifact_names_and_writes_file() {
        let artifact = ExportArtifact::csv("leaderboard", "Rank\n1".to_string());
        assert_eq!(artifact.file_name, "leaderboard.csv");
        assert_eq!(artifact.mime, "text/csv;charset=utf-8");

        let dir = tempfile::tempdir().unwrap();
        let path = artifact.write_to(dir.path()).unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "Rank\n1");
    }
}
