use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::store::UNKNOWN_SUBSCRIBERS;
use crate::tracking::{Reconciliation, WorkingSet};

pub const TIMESTAMP_FORMAT: &str = "%m/%d/%y %I:%M %p UTC";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReportLine {
    Header { label: String, value: String },
    Section { title: String, count: usize },
    Bullet { name: String, subscribers: i64 },
    Blank,
}

impl ReportLine {
    fn render(&self) -> String {
        match self {
            // Trailing double space is a markdown line break.
            Self::Header { label, value } => format!("{label}: {value}"),
            Self::Section { title, count } => format!("{title}: {count}  "),
            Self::Bullet { name, subscribers } => format!("* /r/{name} : {subscribers}"),
            Self::Blank => String::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReportBuilder {
    lines: Vec<ReportLine>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(&mut self, label: &str, value: impl Into<String>) -> &mut Self {
        self.lines.push(ReportLine::Header {
            label: label.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(ReportLine::Blank);
        self
    }

    /// Section title with its entry count, a blank line, then one bullet per
    /// entry in the order given.
    pub fn section(&mut self, title: &str, entries: &[(String, i64)]) -> &mut Self {
        self.lines.push(ReportLine::Section {
            title: title.to_string(),
            count: entries.len(),
        });
        self.lines.push(ReportLine::Blank);
        for (name, subscribers) in entries {
            self.lines.push(ReportLine::Bullet {
                name: name.clone(),
                subscribers: *subscribers,
            });
        }
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(&line.render());
            out.push('\n');
        }
        out
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Largest first; equal counts fall back to name order.
pub fn sort_by_subscribers<'a, I>(names: I, working: &WorkingSet) -> Vec<(String, i64)>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut entries: Vec<(String, i64)> = names
        .into_iter()
        .map(|name| {
            let count = working.count(name).unwrap_or(UNKNOWN_SUBSCRIBERS);
            (name.clone(), count)
        })
        .collect();
    entries.sort_by(|a, b| Reverse(a.1).cmp(&Reverse(b.1)).then_with(|| a.0.cmp(&b.0)));
    entries
}

pub fn build_delta_report(
    now: DateTime<Utc>,
    reconciliation: &Reconciliation,
    working: &WorkingSet,
) -> ReportBuilder {
    let add = sort_by_subscribers(&reconciliation.add, working);
    let remove = sort_by_subscribers(&reconciliation.remove, working);
    let mut report = ReportBuilder::new();
    report
        .header("Updated", format_timestamp(now))
        .blank()
        .section("Add subreddits", &add)
        .blank()
        .section("Remove subreddits", &remove);
    report
}

/// Alphabetized listing of every mention in the external list, repeats
/// included.
pub fn build_listing_report(
    now: DateTime<Utc>,
    alphabetized: &[String],
    working: &WorkingSet,
) -> ReportBuilder {
    let entries: Vec<(String, i64)> = alphabetized
        .iter()
        .map(|name| {
            (
                name.clone(),
                working.count(name).unwrap_or(UNKNOWN_SUBSCRIBERS),
            )
        })
        .collect();
    let mut report = ReportBuilder::new();
    report
        .header("Updated", format_timestamp(now))
        .blank()
        .section("Subreddits", &entries);
    report
}
