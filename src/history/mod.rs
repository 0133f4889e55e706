//! Read-side views over recorded sessions. Nothing here owns data; every
//! function takes the session list and the catalog it needs.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone, Utc};
use serde::Serialize;

use crate::combinations::CombinationCatalog;
use crate::models::Session;

pub const UNKNOWN_COMBINATION: &str = "Unknown combination";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One row of the history list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub session: Session,
    pub combination_name: String,
    pub actual_secs: u64,
    pub overtime_secs: Option<u64>,
}

/// `YYYY-MM-DD` of `instant` in the given zone.
pub fn date_key_in<Tz>(instant: &DateTime<Utc>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    instant.with_timezone(tz).format(DATE_FORMAT).to_string()
}

pub fn date_key(instant: &DateTime<Utc>) -> String {
    date_key_in(instant, &Local)
}

/// Sessions started on `filter_date` (local calendar), oldest first.
pub fn group_by_date(
    sessions: &[Session],
    filter_date: &str,
    include_deleted: bool,
) -> BTreeMap<String, Vec<Session>> {
    group_by_date_in(sessions, filter_date, include_deleted, &Local)
}

pub fn group_by_date_in<Tz>(
    sessions: &[Session],
    filter_date: &str,
    include_deleted: bool,
    tz: &Tz,
) -> BTreeMap<String, Vec<Session>>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut day: Vec<Session> = sessions
        .iter()
        .filter(|s| include_deleted || !s.deleted)
        .filter(|s| date_key_in(&s.start_time, tz) == filter_date)
        .cloned()
        .collect();
    day.sort_by_key(|s| s.start_time);

    let mut grouped = BTreeMap::new();
    if !day.is_empty() {
        grouped.insert(filter_date.to_string(), day);
    }
    grouped
}

/// Every date with sessions, newest date first, newest session first.
pub fn group_all(sessions: &[Session], include_deleted: bool) -> Vec<(String, Vec<Session>)> {
    group_all_in(sessions, include_deleted, &Local)
}

pub fn group_all_in<Tz>(
    sessions: &[Session],
    include_deleted: bool,
    tz: &Tz,
) -> Vec<(String, Vec<Session>)>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut grouped: BTreeMap<String, Vec<Session>> = BTreeMap::new();
    for session in sessions.iter().filter(|s| include_deleted || !s.deleted) {
        grouped
            .entry(date_key_in(&session.start_time, tz))
            .or_default()
            .push(session.clone());
    }

    grouped
        .into_iter()
        .rev()
        .map(|(date, mut day)| {
            day.sort_by(|a, b| b.start_time.cmp(&a.start_time));
            (date, day)
        })
        .collect()
}

/// Distinct session dates plus `today`, newest first.
pub fn available_dates_in<Tz>(sessions: &[Session], today: &str, tz: &Tz) -> Vec<String>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut dates: BTreeSet<String> = sessions
        .iter()
        .map(|s| date_key_in(&s.start_time, tz))
        .collect();
    dates.insert(today.to_string());
    dates.into_iter().rev().collect()
}

pub fn available_dates(sessions: &[Session]) -> Vec<String> {
    available_dates_in(sessions, &date_key(&Utc::now()), &Local)
}

/// Seconds beyond the combination's nominal total, or `None` when the
/// session finished in time or its combination no longer exists.
pub fn overtime(session: &Session, catalog: &CombinationCatalog) -> Option<u64> {
    let combination = catalog.find(&session.combination_id)?;
    combination.overtime(session.actual_secs())
}

pub fn combination_name(combination_id: &str, catalog: &CombinationCatalog) -> String {
    catalog
        .find(combination_id)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| UNKNOWN_COMBINATION.to_string())
}

pub fn entry(session: &Session, catalog: &CombinationCatalog) -> HistoryEntry {
    HistoryEntry {
        combination_name: combination_name(&session.combination_id, catalog),
        actual_secs: session.actual_secs(),
        overtime_secs: overtime(session, catalog),
        session: session.clone(),
    }
}

/// History rows for one local date.
pub fn day_entries_in<Tz>(
    sessions: &[Session],
    catalog: &CombinationCatalog,
    filter_date: &str,
    include_deleted: bool,
    tz: &Tz,
) -> Vec<HistoryEntry>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    group_by_date_in(sessions, filter_date, include_deleted, tz)
        .remove(filter_date)
        .unwrap_or_default()
        .iter()
        .map(|s| entry(s, catalog))
        .collect()
}

pub fn day_entries(
    sessions: &[Session],
    catalog: &CombinationCatalog,
    filter_date: &str,
    include_deleted: bool,
) -> Vec<HistoryEntry> {
    day_entries_in(sessions, catalog, filter_date, include_deleted, &Local)
}
