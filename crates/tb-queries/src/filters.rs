//! Task filters
//!
//! Each filter is optional; set filters are combined with AND.

use chrono::{DateTime, NaiveDate, Utc};
use std::str::FromStr;
use tb_core::{Id, ValidationErrors};
use tb_models::{TaskPriority, TaskStatus};

pub const SEARCH_MAX: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssigneeFilter {
    /// The requesting user
    Me,
    Unassigned,
    User(Id),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatorFilter {
    Me,
    User(Id),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryFilter {
    Uncategorized,
    Category(Id),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilters {
    /// Any of these statuses; empty means all
    pub statuses: Vec<TaskStatus>,
    /// Any of these priorities; empty means all
    pub priorities: Vec<TaskPriority>,
    pub assignee: Option<AssigneeFilter>,
    pub creator: Option<CreatorFilter>,
    pub category: Option<CategoryFilter>,
    pub workspace_id: Option<Id>,
    /// `due_date < due_before`
    pub due_before: Option<DateTime<Utc>>,
    /// `due_date >= due_after`
    pub due_after: Option<DateTime<Utc>>,
    /// Due in the past and not completed
    pub overdue: bool,
    /// Case-insensitive substring of title or description
    pub search: Option<String>,
}

impl TaskFilters {
    pub fn is_empty(&self) -> bool {
        *self == TaskFilters::default()
    }
}

/// Comma separated list of enum values; blanks are skipped, duplicates dropped
pub(crate) fn parse_list<T>(param: &str, raw: &str, errors: &mut ValidationErrors) -> Vec<T>
where
    T: FromStr + PartialEq,
{
    let mut values = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        match part.parse::<T>() {
            Ok(value) if !values.contains(&value) => values.push(value),
            Ok(_) => {}
            Err(_) => errors.add(param, format!("'{part}' is not a valid value")),
        }
    }
    values
}

pub(crate) fn parse_id(param: &str, raw: &str, errors: &mut ValidationErrors) -> Option<Id> {
    match raw.trim().parse::<Id>() {
        Ok(id) if id > 0 => Some(id),
        _ => {
            errors.add(param, format!("'{raw}' is not a valid id"));
            None
        }
    }
}

pub(crate) fn parse_assignee(raw: &str, errors: &mut ValidationErrors) -> Option<AssigneeFilter> {
    match raw.trim() {
        "me" => Some(AssigneeFilter::Me),
        "none" => Some(AssigneeFilter::Unassigned),
        other => parse_id("assignee", other, errors).map(AssigneeFilter::User),
    }
}

pub(crate) fn parse_creator(raw: &str, errors: &mut ValidationErrors) -> Option<CreatorFilter> {
    match raw.trim() {
        "me" => Some(CreatorFilter::Me),
        other => parse_id("creator", other, errors).map(CreatorFilter::User),
    }
}

pub(crate) fn parse_category(raw: &str, errors: &mut ValidationErrors) -> Option<CategoryFilter> {
    match raw.trim() {
        "none" => Some(CategoryFilter::Uncategorized),
        other => parse_id("category", other, errors).map(CategoryFilter::Category),
    }
}

/// Which end of a bare date is meant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DateBound {
    /// Midnight at the start of the day
    StartOfDay,
    /// Midnight at the start of the following day
    EndOfDay,
}

/// RFC 3339 timestamp or `YYYY-MM-DD` (UTC)
pub(crate) fn parse_date(
    param: &str,
    raw: &str,
    bound: DateBound,
    errors: &mut ValidationErrors,
) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let day = NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().and_then(|d| match bound {
        DateBound::StartOfDay => Some(d),
        DateBound::EndOfDay => d.succ_opt(),
    });
    match day.and_then(|d| d.and_hms_opt(0, 0, 0)) {
        Some(naive) => Some(naive.and_utc()),
        None => {
            errors.add(param, "must be an RFC 3339 timestamp or a YYYY-MM-DD date");
            None
        }
    }
}

pub(crate) fn parse_bool(param: &str, raw: &str, errors: &mut ValidationErrors) -> bool {
    match raw.trim() {
        "true" | "1" => true,
        "false" | "0" | "" => false,
        _ => {
            errors.add(param, "must be true or false");
            false
        }
    }
}

pub(crate) fn parse_search(raw: &str, errors: &mut ValidationErrors) -> Option<String> {
    let term = raw.trim();
    if term.is_empty() {
        None
    } else if term.chars().count() > SEARCH_MAX {
        errors.add("search", format!("is too long (maximum is {SEARCH_MAX} characters)"));
        None
    } else {
        Some(term.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_list_dedupes_and_reports_invalid() {
        let mut errors = ValidationErrors::new();
        let statuses: Vec<TaskStatus> =
            parse_list("status", "todo, completed,todo,,bogus", &mut errors);
        assert_eq!(statuses, vec![TaskStatus::Todo, TaskStatus::Completed]);
        assert_eq!(
            errors.get("status").unwrap(),
            &vec!["'bogus' is not a valid value".to_string()]
        );
    }

    #[test]
    fn test_assignee_forms() {
        let mut errors = ValidationErrors::new();
        assert_eq!(parse_assignee("me", &mut errors), Some(AssigneeFilter::Me));
        assert_eq!(parse_assignee("none", &mut errors), Some(AssigneeFilter::Unassigned));
        assert_eq!(parse_assignee("12", &mut errors), Some(AssigneeFilter::User(12)));
        assert!(errors.is_empty());
        assert_eq!(parse_assignee("-3", &mut errors), None);
        assert!(errors.has_error("assignee"));
    }

    #[test]
    fn test_dates() {
        let mut errors = ValidationErrors::new();
        assert_eq!(
            parse_date("dueAfter", "2024-05-01", DateBound::StartOfDay, &mut errors),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date("dueBefore", "2024-05-01", DateBound::EndOfDay, &mut errors),
            Some(Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_date("dueBefore", "2024-05-01T10:00:00+02:00", DateBound::EndOfDay, &mut errors),
            Some(Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap())
        );
        assert!(errors.is_empty());

        parse_date("dueBefore", "next week", DateBound::EndOfDay, &mut errors);
        assert!(errors.has_error("dueBefore"));
    }

    #[test]
    fn test_search_limits() {
        let mut errors = ValidationErrors::new();
        assert_eq!(parse_search("  ", &mut errors), None);
        assert_eq!(parse_search(" report ", &mut errors), Some("report".into()));
        assert_eq!(parse_search(&"x".repeat(SEARCH_MAX + 1), &mut errors), None);
        assert!(errors.has_error("search"));
    }
}
