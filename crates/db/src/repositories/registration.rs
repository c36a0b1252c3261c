//! Student semester registration repository.

use std::sync::Arc;

use super::is_unique_violation;
use crate::entities::{
    StudentSemesterRegistration, student_semester_registration,
    student_semester_registration::RegistrationStatus,
};
use campus_common::{AppError, AppResult};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

/// Registration repository for database operations.
#[derive(Clone)]
pub struct RegistrationRepository {
    db: Arc<DatabaseConnection>,
}

impl RegistrationRepository {
    /// Create a new registration repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a registration by ID.
    pub async fn find_by_id(
        &self,
        id: &str,
    ) -> AppResult<Option<student_semester_registration::Model>> {
        StudentSemesterRegistration::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a registration by ID, or fail with `NotFound`.
    pub async fn get_by_id(&self, id: &str) -> AppResult<student_semester_registration::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Registration {id}")))
    }

    /// Find the registration for a (student, period) pair.
    pub async fn find_by_pair_in<C: ConnectionTrait>(
        conn: &C,
        student_id: &str,
        semester_period_id: &str,
    ) -> AppResult<Option<student_semester_registration::Model>> {
        StudentSemesterRegistration::find()
            .filter(student_semester_registration::Column::StudentId.eq(student_id))
            .filter(
                student_semester_registration::Column::SemesterPeriodId.eq(semester_period_id),
            )
            .one(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Approved registrations held by a student.
    pub async fn find_approved_by_student(
        &self,
        student_id: &str,
    ) -> AppResult<Vec<student_semester_registration::Model>> {
        StudentSemesterRegistration::find()
            .filter(student_semester_registration::Column::StudentId.eq(student_id))
            .filter(student_semester_registration::Column::Status.eq(RegistrationStatus::Approved))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Registrations of a student, newest first (paginated).
    pub async fn find_by_student(
        &self,
        student_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<student_semester_registration::Model>> {
        StudentSemesterRegistration::find()
            .filter(student_semester_registration::Column::StudentId.eq(student_id))
            .order_by_desc(student_semester_registration::Column::RegistrationDate)
            .order_by_desc(student_semester_registration::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Registrations for a period, optionally narrowed to one status (paginated).
    pub async fn find_by_period(
        &self,
        semester_period_id: &str,
        status: Option<RegistrationStatus>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<student_semester_registration::Model>> {
        let mut query = StudentSemesterRegistration::find()
            .filter(student_semester_registration::Column::SemesterPeriodId.eq(semester_period_id))
            .order_by_asc(student_semester_registration::Column::RegistrationDate)
            .order_by_asc(student_semester_registration::Column::Id);

        if let Some(status) = status {
            query = query.filter(student_semester_registration::Column::Status.eq(status));
        }

        query
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Insert a registration on `conn`.
    ///
    /// A unique-key violation on (student, period) is returned as `Conflict`.
    pub async fn create_in<C: ConnectionTrait>(
        conn: &C,
        model: student_semester_registration::ActiveModel,
    ) -> AppResult<student_semester_registration::Model> {
        model.insert(conn).await.map_err(|e| {
            if is_unique_violation(&e) {
                AppError::Conflict("already registered for this period".to_string())
            } else {
                AppError::Database(e.to_string())
            }
        })
    }

    /// Apply `changes` only while the row is still in one of `expected`.
    pub async fn update_if_status(
        &self,
        id: &str,
        expected: &[RegistrationStatus],
        changes: student_semester_registration::ActiveModel,
    ) -> AppResult<student_semester_registration::Model> {
        let result = StudentSemesterRegistration::update_many()
            .set(changes)
            .filter(student_semester_registration::Column::Id.eq(id))
            .filter(student_semester_registration::Column::Status.is_in(expected.iter().copied()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let current = self.get_by_id(id).await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Registration {id} is {}",
                current.status.as_str()
            )));
        }
        Ok(current)
    }
}
