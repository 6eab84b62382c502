use chrono::{Datelike, Duration, NaiveDate};

/// ISO week key used to decide whether a cached plan is still "this week", e.g. `2026-W02`.
pub fn week_identifier(date: NaiveDate) -> String {
    let week = date.iso_week();
    format!("{}-W{:02}", week.year(), week.week())
}

/// "Week of Jan 12 - Jan 18", Monday through Sunday.
pub fn week_title(date: NaiveDate) -> String {
    let monday = week_start(date);
    let sunday = monday + Duration::days(6);
    format!(
        "Week of {} - {}",
        monday.format("%b %-d"),
        sunday.format("%b %-d")
    )
}

pub fn date_label(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

fn week_start(date: NaiveDate) -> NaiveDate {
    let offset = date.weekday().num_days_from_monday();
    date - Duration::days(i64::from(offset))
}
