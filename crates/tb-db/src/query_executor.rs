//! Task query executor
//!
//! Renders a [`TaskQuery`] to SQL with `QueryBuilder`. Every user supplied
//! value is bound as a parameter; only the `ORDER BY` clause is spliced in,
//! and that comes from a closed set of sort fields.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use tb_core::Id;
use tb_models::Task;
use tb_queries::{AssigneeFilter, CategoryFilter, CreatorFilter, TaskFilters, TaskQuery};

use crate::repository::{like_pattern, Pagination, PaginatedResult, RepositoryResult};

/// Who runs a task query and what they may see
#[derive(Debug, Clone, PartialEq)]
pub struct TaskScope {
    pub user_id: Id,
    /// Workspaces where the user is an active member
    pub workspace_ids: Vec<Id>,
    /// Reference time for the `overdue` filter
    pub now: DateTime<Utc>,
}

impl TaskScope {
    pub fn new(user_id: Id, workspace_ids: Vec<Id>) -> Self {
        Self {
            user_id,
            workspace_ids,
            now: Utc::now(),
        }
    }
}

pub struct TaskQueryExecutor<'a> {
    pool: &'a PgPool,
}

impl<'a> TaskQueryExecutor<'a> {
    pub fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Run the count and page queries for `query` within `scope`
    pub async fn execute(
        &self,
        query: &TaskQuery,
        scope: &TaskScope,
    ) -> RepositoryResult<PaginatedResult<Task>> {
        let pagination = Pagination::from(query.pagination);
        if scope.workspace_ids.is_empty() {
            return Ok(PaginatedResult::empty(pagination));
        }

        let mut count = count_query(&query.filters, scope);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool).await?;

        if total == 0 || pagination.offset >= total {
            return Ok(PaginatedResult::new(Vec::new(), total, pagination));
        }

        let mut select = select_query(query, scope, pagination);
        let tasks = select.build_query_as::<Task>().fetch_all(self.pool).await?;

        tracing::debug!(total, returned = tasks.len(), "Task query executed");
        Ok(PaginatedResult::new(tasks, total, pagination))
    }
}

fn count_query(filters: &TaskFilters, scope: &TaskScope) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM tasks t");
    push_conditions(&mut qb, filters, scope);
    qb
}

fn select_query(
    query: &TaskQuery,
    scope: &TaskScope,
    pagination: Pagination,
) -> QueryBuilder<'static, Postgres> {
    let mut qb = QueryBuilder::new("SELECT t.* FROM tasks t");
    push_conditions(&mut qb, &query.filters, scope);
    qb.push(" ");
    qb.push(query.sort.to_sql());
    qb.push(" LIMIT ").push_bind(pagination.limit);
    qb.push(" OFFSET ").push_bind(pagination.offset);
    qb
}

fn push_conditions(
    qb: &mut QueryBuilder<'static, Postgres>,
    filters: &TaskFilters,
    scope: &TaskScope,
) {
    qb.push(" WHERE t.workspace_id = ANY(")
        .push_bind(scope.workspace_ids.clone())
        .push(")");

    if let Some(workspace_id) = filters.workspace_id {
        qb.push(" AND t.workspace_id = ").push_bind(workspace_id);
    }

    if !filters.statuses.is_empty() {
        let statuses: Vec<String> = filters
            .statuses
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        qb.push(" AND t.status = ANY(").push_bind(statuses).push(")");
    }

    if !filters.priorities.is_empty() {
        let priorities: Vec<String> = filters
            .priorities
            .iter()
            .map(|p| p.as_str().to_string())
            .collect();
        qb.push(" AND t.priority = ANY(").push_bind(priorities).push(")");
    }

    match filters.assignee {
        Some(AssigneeFilter::Me) => {
            qb.push(" AND t.assignee_id = ").push_bind(scope.user_id);
        }
        Some(AssigneeFilter::User(id)) => {
            qb.push(" AND t.assignee_id = ").push_bind(id);
        }
        Some(AssigneeFilter::Unassigned) => {
            qb.push(" AND t.assignee_id IS NULL");
        }
        None => {}
    }

    match filters.creator {
        Some(CreatorFilter::Me) => {
            qb.push(" AND t.creator_id = ").push_bind(scope.user_id);
        }
        Some(CreatorFilter::User(id)) => {
            qb.push(" AND t.creator_id = ").push_bind(id);
        }
        None => {}
    }

    match filters.category {
        Some(CategoryFilter::Category(id)) => {
            qb.push(" AND t.category_id = ").push_bind(id);
        }
        Some(CategoryFilter::Uncategorized) => {
            qb.push(" AND t.category_id IS NULL");
        }
        None => {}
    }

    if let Some(before) = filters.due_before {
        qb.push(" AND t.due_date < ").push_bind(before);
    }

    if let Some(after) = filters.due_after {
        qb.push(" AND t.due_date >= ").push_bind(after);
    }

    if filters.overdue {
        qb.push(" AND t.due_date < ")
            .push_bind(scope.now)
            .push(" AND t.status <> 'completed'");
    }

    if let Some(search) = &filters.search {
        let pattern = like_pattern(search);
        qb.push(" AND (t.title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR t.description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
