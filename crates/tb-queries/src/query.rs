//! Task list query
//!
//! Mirrors the query string of `GET /api/v1/tasks`:
//!
//! | parameter | values |
//! |---|---|
//! | `status`, `priority` | comma separated list |
//! | `assignee` | `me`, `none` or a user id |
//! | `creator` | `me` or a user id |
//! | `category` | a category id or `none` |
//! | `workspace` | a workspace id |
//! | `dueBefore`, `dueAfter` | RFC 3339 or `YYYY-MM-DD` |
//! | `overdue` | `true` / `false` |
//! | `search` | free text, max 200 characters |
//! | `sortBy` | `field:dir,...` |
//! | `offset`, `pageSize` | pagination |

use serde::Deserialize;
use tb_core::{Id, PaginationParams, ValidationErrors, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use url::form_urlencoded;

use crate::filters::{
    parse_assignee, parse_bool, parse_category, parse_creator, parse_date, parse_id, parse_list,
    parse_search, DateBound, TaskFilters,
};
use crate::sorts::TaskSortOrder;

/// Raw query string values
///
/// Everything arrives as text so a bad value becomes a validation error
/// naming the parameter instead of a generic rejection.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueryParams {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub assignee: Option<String>,
    pub creator: Option<String>,
    pub category: Option<String>,
    pub workspace: Option<String>,
    pub due_before: Option<String>,
    pub due_after: Option<String>,
    pub overdue: Option<String>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub offset: Option<String>,
    pub page_size: Option<String>,
}

impl TaskQueryParams {
    /// `path` plus every non-pagination parameter, for collection links
    pub fn link_base(&self, path: &str) -> String {
        let pairs = [
            ("status", &self.status),
            ("priority", &self.priority),
            ("assignee", &self.assignee),
            ("creator", &self.creator),
            ("category", &self.category),
            ("workspace", &self.workspace),
            ("dueBefore", &self.due_before),
            ("dueAfter", &self.due_after),
            ("overdue", &self.overdue),
            ("search", &self.search),
            ("sortBy", &self.sort_by),
        ];
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        let mut any = false;
        for (name, value) in pairs {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                serializer.append_pair(name, value);
                any = true;
            }
        }
        if any {
            format!("{}?{}", path, serializer.finish())
        } else {
            path.to_string()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskQuery {
    pub filters: TaskFilters,
    pub sort: TaskSortOrder,
    pub pagination: PaginationParams,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            filters: TaskFilters::default(),
            sort: TaskSortOrder::default(),
            pagination: PaginationParams::default(),
        }
    }
}

impl TaskQuery {
    /// All tasks of one workspace, default order
    pub fn for_workspace(workspace_id: Id) -> Self {
        let mut query = Self::default();
        query.filters.workspace_id = Some(workspace_id);
        query
    }

    pub fn parse(params: &TaskQueryParams) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut filters = TaskFilters::default();

        if let Some(raw) = &params.status {
            filters.statuses = parse_list("status", raw, &mut errors);
        }
        if let Some(raw) = &params.priority {
            filters.priorities = parse_list("priority", raw, &mut errors);
        }
        if let Some(raw) = non_blank(&params.assignee) {
            filters.assignee = parse_assignee(raw, &mut errors);
        }
        if let Some(raw) = non_blank(&params.creator) {
            filters.creator = parse_creator(raw, &mut errors);
        }
        if let Some(raw) = non_blank(&params.category) {
            filters.category = parse_category(raw, &mut errors);
        }
        if let Some(raw) = non_blank(&params.workspace) {
            filters.workspace_id = parse_id("workspace", raw, &mut errors);
        }
        if let Some(raw) = non_blank(&params.due_before) {
            filters.due_before = parse_date("dueBefore", raw, DateBound::EndOfDay, &mut errors);
        }
        if let Some(raw) = non_blank(&params.due_after) {
            filters.due_after = parse_date("dueAfter", raw, DateBound::StartOfDay, &mut errors);
        }
        if let (Some(after), Some(before)) = (filters.due_after, filters.due_before) {
            if after >= before {
                errors.add("dueAfter", "must be earlier than dueBefore");
            }
        }
        if let Some(raw) = &params.overdue {
            filters.overdue = parse_bool("overdue", raw, &mut errors);
        }
        if let Some(raw) = &params.search {
            filters.search = parse_search(raw, &mut errors);
        }

        let sort = match non_blank(&params.sort_by) {
            Some(raw) => TaskSortOrder::parse(raw, &mut errors),
            None => TaskSortOrder::default(),
        };

        let offset = match non_blank(&params.offset) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if n >= 0 => n,
                _ => {
                    errors.add("offset", "must be a number greater than or equal to 0");
                    0
                }
            },
            None => 0,
        };
        let page_size = match non_blank(&params.page_size) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(n) if (1..=MAX_PAGE_SIZE).contains(&n) => n,
                _ => {
                    errors.add(
                        "pageSize",
                        format!("must be a number between 1 and {MAX_PAGE_SIZE}"),
                    );
                    DEFAULT_PAGE_SIZE
                }
            },
            None => DEFAULT_PAGE_SIZE,
        };

        errors.into_result()?;
        Ok(Self {
            filters,
            sort,
            pagination: PaginationParams::new(offset, page_size),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{AssigneeFilter, CategoryFilter, CreatorFilter};
    use tb_models::{TaskPriority, TaskStatus};

    fn params(query: &str) -> TaskQueryParams {
        // same decoding the HTTP layer applies
        let map: serde_json::Map<String, serde_json::Value> = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), serde_json::Value::String(v.into_owned())))
            .collect();
        serde_json::from_value(serde_json::Value::Object(map)).unwrap()
    }

    #[test]
    fn test_defaults() {
        let query = TaskQuery::parse(&TaskQueryParams::default()).unwrap();
        assert!(query.filters.is_empty());
        assert_eq!(query.sort, TaskSortOrder::default());
        assert_eq!(query.pagination, PaginationParams::new(0, 20));
    }

    #[test]
    fn test_full_query() {
        let query = TaskQuery::parse(&params(
            "status=todo,in_review&priority=high,urgent&assignee=me&creator=7&category=none\
             &workspace=3&dueAfter=2024-01-01&dueBefore=2024-01-31&search=%20invoice%20\
             &sortBy=priority:desc&offset=40&pageSize=10",
        ))
        .unwrap();

        let f = &query.filters;
        assert_eq!(f.statuses, vec![TaskStatus::Todo, TaskStatus::InReview]);
        assert_eq!(f.priorities, vec![TaskPriority::High, TaskPriority::Urgent]);
        assert_eq!(f.assignee, Some(AssigneeFilter::Me));
        assert_eq!(f.creator, Some(CreatorFilter::User(7)));
        assert_eq!(f.category, Some(CategoryFilter::Uncategorized));
        assert_eq!(f.workspace_id, Some(3));
        assert_eq!(f.search.as_deref(), Some("invoice"));
        assert!(!f.overdue);
        assert_eq!(query.sort.to_param(), "priority:desc");
        assert_eq!(query.pagination.offset(), 40);
        assert_eq!(query.pagination.limit(), 10);
    }

    #[test]
    fn test_errors_name_each_parameter() {
        let errors = TaskQuery::parse(&params(
            "status=done&assignee=someone&overdue=maybe&sortBy=secret&offset=-1&pageSize=500",
        ))
        .unwrap_err();

        for param in ["status", "assignee", "overdue", "sortBy", "offset", "pageSize"] {
            assert!(errors.has_error(param), "missing error for {param}");
        }
    }

    #[test]
    fn test_inverted_due_range() {
        let errors =
            TaskQuery::parse(&params("dueAfter=2024-02-01&dueBefore=2024-01-01")).unwrap_err();
        assert!(errors.has_error("dueAfter"));
    }

    #[test]
    fn test_link_base_keeps_filters() {
        let p = params("status=todo&search=a b&offset=20");
        assert_eq!(p.link_base("/api/v1/tasks"), "/api/v1/tasks?status=todo&search=a+b");
        assert_eq!(TaskQueryParams::default().link_base("/api/v1/tasks"), "/api/v1/tasks");
    }

    #[test]
    fn test_for_workspace() {
        let query = TaskQuery::for_workspace(9);
        assert_eq!(query.filters.workspace_id, Some(9));
    }
}
