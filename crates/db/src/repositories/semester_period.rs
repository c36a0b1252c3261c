//! Semester period repository.

use std::sync::Arc;

use crate::entities::{SemesterPeriod, semester_period};
use campus_common::{AppError, AppResult};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Semester period repository for database operations.
#[derive(Clone)]
pub struct SemesterPeriodRepository {
    db: Arc<DatabaseConnection>,
}

impl SemesterPeriodRepository {
    /// Create a new semester period repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a semester period by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<semester_period::Model>> {
        Self::find_by_id_in(self.db.as_ref(), id).await
    }

    /// Find a semester period by ID on an arbitrary connection or transaction.
    pub async fn find_by_id_in<C: ConnectionTrait>(
        conn: &C,
        id: &str,
    ) -> AppResult<Option<semester_period::Model>> {
        SemesterPeriod::find_by_id(id)
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a semester period by ID, or fail with `NotFound`.
    pub async fn get_by_id(&self, id: &str) -> AppResult<semester_period::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Semester period {id}")))
    }

    /// All periods, newest first (paginated).
    pub async fn list(&self, limit: u64, offset: u64) -> AppResult<Vec<semester_period::Model>> {
        SemesterPeriod::find()
            .order_by_desc(semester_period::Column::StartDate)
            .order_by_desc(semester_period::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active periods among `ids`.
    pub async fn find_active_by_ids(
        &self,
        ids: Vec<String>,
    ) -> AppResult<Vec<semester_period::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        SemesterPeriod::find()
            .filter(semester_period::Column::Id.is_in(ids))
            .filter(semester_period::Column::IsActive.eq(true))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Active periods containing `day`, latest end date first.
    pub async fn find_current_on(&self, day: NaiveDate) -> AppResult<Vec<semester_period::Model>> {
        SemesterPeriod::find()
            .filter(semester_period::Column::IsActive.eq(true))
            .filter(semester_period::Column::StartDate.lte(day))
            .filter(semester_period::Column::EndDate.gte(day))
            .order_by_desc(semester_period::Column::EndDate)
            .order_by_desc(semester_period::Column::StartDate)
            .order_by_desc(semester_period::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Other active periods whose dates overlap `[start, end]`.
    pub async fn find_active_overlapping(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        exclude_id: &str,
    ) -> AppResult<Vec<semester_period::Model>> {
        SemesterPeriod::find()
            .filter(semester_period::Column::IsActive.eq(true))
            .filter(semester_period::Column::Id.ne(exclude_id))
            .filter(semester_period::Column::StartDate.lte(end))
            .filter(semester_period::Column::EndDate.gte(start))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new semester period.
    pub async fn create(
        &self,
        model: semester_period::ActiveModel,
    ) -> AppResult<semester_period::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Update a semester period.
    pub async fn update(
        &self,
        model: semester_period::ActiveModel,
    ) -> AppResult<semester_period::Model> {
        model
            .update(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures;
    use sea_orm::{DatabaseBackend, MockDatabase};

    #[tokio::test]
    async fn test_find_active_by_ids_empty_skips_query() {
        // No query results queued: a query would fail.
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let repo = SemesterPeriodRepository::new(Arc::new(db));
        let periods = repo.find_active_by_ids(vec![]).await.unwrap();

        assert!(periods.is_empty());
    }

    #[tokio::test]
    async fn test_find_current_on() {
        let period = fixtures::semester_period(
            "sp1",
            fixtures::date(2024, 1, 8),
            fixtures::date(2024, 5, 31),
        );
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[period]])
            .into_connection();

        let repo = SemesterPeriodRepository::new(Arc::new(db));
        let periods = repo
            .find_current_on(fixtures::date(2024, 3, 1))
            .await
            .unwrap();

        assert_eq!(periods.len(), 1);
        assert!(periods[0].is_current_on(fixtures::date(2024, 3, 1)));
    }
}
