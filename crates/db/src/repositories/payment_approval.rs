//! Payment approval repository.

use std::sync::Arc;

use crate::entities::{
    PaymentApproval, payment_approval, payment_approval::PaymentApprovalStatus,
};
use campus_common::{AppError, AppResult};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};

/// Payment approval repository for database operations.
#[derive(Clone)]
pub struct PaymentApprovalRepository {
    db: Arc<DatabaseConnection>,
}

impl PaymentApprovalRepository {
    /// Create a new payment approval repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a payment approval by ID.
    pub async fn find_by_id(&self, id: &str) -> AppResult<Option<payment_approval::Model>> {
        PaymentApproval::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a payment approval by ID, or fail with `NotFound`.
    pub async fn get_by_id(&self, id: &str) -> AppResult<payment_approval::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Payment approval {id}")))
    }

    /// Approved rows whose validity window contains `day`, latest `valid_until` first.
    pub async fn find_effective(
        &self,
        student_id: &str,
        day: NaiveDate,
    ) -> AppResult<Vec<payment_approval::Model>> {
        effective_on(student_id, day)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// [`Self::find_effective`] taking `FOR SHARE` locks on the matched rows.
    ///
    /// Call inside a transaction: a concurrent revoke of a returned row waits
    /// until the transaction ends.
    pub async fn lock_effective_in<C: ConnectionTrait>(
        conn: &C,
        student_id: &str,
        day: NaiveDate,
    ) -> AppResult<Vec<payment_approval::Model>> {
        effective_on(student_id, day)
            .lock_shared()
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Approvals for a student, newest first (paginated).
    pub async fn find_by_student(
        &self,
        student_id: &str,
        limit: u64,
        offset: u64,
    ) -> AppResult<Vec<payment_approval::Model>> {
        PaymentApproval::find()
            .filter(payment_approval::Column::StudentId.eq(student_id))
            .order_by_desc(payment_approval::Column::CreatedAt)
            .order_by_desc(payment_approval::Column::Id)
            .limit(limit)
            .offset(offset)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Create a new payment approval.
    pub async fn create(
        &self,
        model: payment_approval::ActiveModel,
    ) -> AppResult<payment_approval::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Apply `changes` only while the row is still in one of `expected`.
    ///
    /// Returns `Conflict` when another reviewer moved the row first, and
    /// `NotFound` when the row does not exist.
    pub async fn update_if_status(
        &self,
        id: &str,
        expected: &[PaymentApprovalStatus],
        changes: payment_approval::ActiveModel,
    ) -> AppResult<payment_approval::Model> {
        let result = PaymentApproval::update_many()
            .set(changes)
            .filter(payment_approval::Column::Id.eq(id))
            .filter(payment_approval::Column::Status.is_in(expected.iter().copied()))
            .exec(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let current = self.get_by_id(id).await?;
        if result.rows_affected == 0 {
            return Err(AppError::Conflict(format!(
                "Payment approval {id} is {}",
                current.status.as_str()
            )));
        }
        Ok(current)
    }
}

fn effective_on(student_id: &str, day: NaiveDate) -> Select<PaymentApproval> {
    PaymentApproval::find()
        .filter(payment_approval::Column::StudentId.eq(student_id))
        .filter(payment_approval::Column::Status.eq(PaymentApprovalStatus::Approved))
        .filter(payment_approval::Column::AccessValidFrom.lte(day))
        .filter(payment_approval::Column::AccessValidUntil.gte(day))
        .order_by_desc(payment_approval::Column::AccessValidUntil)
        .order_by_desc(payment_approval::Column::Id)
}
