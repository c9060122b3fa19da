//! Task sort orders
//!
//! Sorting happens on a fixed set of fields so every `ORDER BY` fragment is
//! built from static SQL. Priority and status sort by meaning rather than
//! alphabetically, due dates put tasks without one last, and the task id
//! always breaks ties so pages never overlap.

use tb_core::{SortDirection, SortParam, ValidationErrors};
use tb_models::{TaskPriority, TaskStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskSortField {
    CreatedAt,
    UpdatedAt,
    DueDate,
    Priority,
    Status,
    Title,
}

impl TaskSortField {
    pub const ALL: [TaskSortField; 6] = [
        TaskSortField::CreatedAt,
        TaskSortField::UpdatedAt,
        TaskSortField::DueDate,
        TaskSortField::Priority,
        TaskSortField::Status,
        TaskSortField::Title,
    ];

    pub fn from_param(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_param() == s)
    }

    pub fn as_param(&self) -> &'static str {
        match self {
            TaskSortField::CreatedAt => "createdAt",
            TaskSortField::UpdatedAt => "updatedAt",
            TaskSortField::DueDate => "dueDate",
            TaskSortField::Priority => "priority",
            TaskSortField::Status => "status",
            TaskSortField::Title => "title",
        }
    }

    /// SQL expression over the `t` (tasks) alias
    pub fn sql_expr(&self) -> String {
        match self {
            TaskSortField::CreatedAt => "t.created_at".to_string(),
            TaskSortField::UpdatedAt => "t.updated_at".to_string(),
            TaskSortField::DueDate => "t.due_date".to_string(),
            TaskSortField::Title => "LOWER(t.title)".to_string(),
            TaskSortField::Priority => rank_case(
                "t.priority",
                TaskPriority::ALL.iter().map(|p| (p.as_str(), p.weight())),
            ),
            TaskSortField::Status => rank_case(
                "t.status",
                TaskStatus::ALL
                    .iter()
                    .enumerate()
                    .map(|(i, s)| (s.as_str(), i as i32)),
            ),
        }
    }
}

fn rank_case<'a>(column: &str, ranks: impl Iterator<Item = (&'a str, i32)>) -> String {
    let arms: Vec<String> = ranks
        .map(|(value, rank)| format!("WHEN '{value}' THEN {rank}"))
        .collect();
    format!("CASE {column} {} END", arms.join(" "))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSort {
    pub field: TaskSortField,
    pub direction: SortDirection,
}

impl TaskSort {
    pub fn new(field: TaskSortField, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    fn to_sql(self) -> String {
        let nulls = match self.field {
            TaskSortField::DueDate => " NULLS LAST",
            _ => "",
        };
        format!("{} {}{}", self.field.sql_expr(), self.direction.as_sql(), nulls)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSortOrder {
    criteria: Vec<TaskSort>,
}

impl Default for TaskSortOrder {
    /// Newest first
    fn default() -> Self {
        Self {
            criteria: vec![TaskSort::new(TaskSortField::CreatedAt, SortDirection::Desc)],
        }
    }
}

impl TaskSortOrder {
    pub fn new(criteria: Vec<TaskSort>) -> Self {
        if criteria.is_empty() {
            Self::default()
        } else {
            Self { criteria }
        }
    }

    /// Parse `sortBy`, e.g. `priority:desc,dueDate:asc`
    pub fn parse(raw: &str, errors: &mut ValidationErrors) -> Self {
        let mut criteria: Vec<TaskSort> = Vec::new();
        for param in SortParam::parse(raw) {
            match TaskSortField::from_param(&param.field) {
                Some(field) if criteria.iter().any(|c| c.field == field) => {
                    errors.add("sortBy", format!("'{}' is given more than once", param.field));
                }
                Some(field) => criteria.push(TaskSort::new(field, param.direction)),
                None => errors.add(
                    "sortBy",
                    format!("'{}' is not a sortable field", param.field),
                ),
            }
        }
        Self::new(criteria)
    }

    pub fn criteria(&self) -> &[TaskSort] {
        &self.criteria
    }

    /// Back to `sortBy` syntax
    pub fn to_param(&self) -> String {
        self.criteria
            .iter()
            .map(|c| {
                let dir = match c.direction {
                    SortDirection::Asc => "asc",
                    SortDirection::Desc => "desc",
                };
                format!("{}:{}", c.field.as_param(), dir)
            })
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Full `ORDER BY` clause ending with the id tie-breaker
    pub fn to_sql(&self) -> String {
        let tie_break = self
            .criteria
            .first()
            .map(|c| c.direction)
            .unwrap_or_default();
        let mut parts: Vec<String> = self.criteria.iter().map(|c| c.to_sql()).collect();
        parts.push(format!("t.id {}", tie_break.as_sql()));
        format!("ORDER BY {}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_order() {
        assert_eq!(
            TaskSortOrder::default().to_sql(),
            "ORDER BY t.created_at DESC, t.id DESC"
        );
    }

    #[test]
    fn test_parse_multiple() {
        let mut errors = ValidationErrors::new();
        let order = TaskSortOrder::parse("dueDate:asc,title", &mut errors);
        assert!(errors.is_empty());
        assert_eq!(
            order.to_sql(),
            "ORDER BY t.due_date ASC NULLS LAST, LOWER(t.title) ASC, t.id ASC"
        );
        assert_eq!(order.to_param(), "dueDate:asc,title:asc");
    }

    #[test]
    fn test_priority_sorts_by_weight() {
        let sql = TaskSortField::Priority.sql_expr();
        assert_eq!(
            sql,
            "CASE t.priority WHEN 'low' THEN 1 WHEN 'medium' THEN 2 WHEN 'high' THEN 3 WHEN 'urgent' THEN 4 END"
        );
        assert!(TaskSortField::Status
            .sql_expr()
            .contains("WHEN 'completed' THEN 3"));
    }

    #[test]
    fn test_invalid_fields_reported() {
        let mut errors = ValidationErrors::new();
        let order = TaskSortOrder::parse("password:asc,createdAt,createdAt:desc", &mut errors);
        assert_eq!(errors.get("sortBy").unwrap().len(), 2);
        assert_eq!(order.criteria().len(), 1);
    }

    #[test]
    fn test_unknown_direction_is_rejected() {
        let mut errors = ValidationErrors::new();
        TaskSortOrder::parse("title:sideways", &mut errors);
        assert!(errors.has_error("sortBy"));
    }
}
