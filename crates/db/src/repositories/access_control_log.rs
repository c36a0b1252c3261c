//! Access control log repository.
//!
//! The log is append-only: there is deliberately no update or delete here.

use std::sync::Arc;

use crate::entities::{AccessControlLog, access_control_log, access_control_log::AuditAction};
use campus_common::{AppError, AppResult};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Filter for audit log queries.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    /// Only entries for this student.
    pub student_id: Option<String>,
    /// Only entries of this action type.
    pub action: Option<AuditAction>,
    /// Only entries at or after this instant.
    pub since: Option<DateTime<Utc>>,
    /// Only entries strictly before this instant.
    pub until: Option<DateTime<Utc>>,
    /// Page size.
    pub limit: u64,
    /// Rows to skip.
    pub offset: u64,
}

/// Access control log repository.
#[derive(Clone)]
pub struct AccessControlLogRepository {
    db: Arc<DatabaseConnection>,
}

impl AccessControlLogRepository {
    /// Create a new access control log repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Append an entry.
    pub async fn append(
        &self,
        model: access_control_log::ActiveModel,
    ) -> AppResult<access_control_log::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find an entry by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<access_control_log::Model>> {
        AccessControlLog::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Entries matching `filter`, newest first.
    pub async fn query(&self, filter: &AuditLogFilter) -> AppResult<Vec<access_control_log::Model>> {
        let mut query = AccessControlLog::find()
            .order_by_desc(access_control_log::Column::CreatedAt)
            .order_by_desc(access_control_log::Column::Id);

        if let Some(student_id) = &filter.student_id {
            query = query.filter(access_control_log::Column::StudentId.eq(student_id.as_str()));
        }
        if let Some(action) = filter.action {
            query = query.filter(access_control_log::Column::Action.eq(action));
        }
        if let Some(since) = filter.since {
            query = query.filter(access_control_log::Column::CreatedAt.gte(since));
        }
        if let Some(until) = filter.until {
            query = query.filter(access_control_log::Column::CreatedAt.lt(until));
        }

        query
            .limit(filter.limit)
            .offset(filter.offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
