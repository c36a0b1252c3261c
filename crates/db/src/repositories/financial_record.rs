//! Financial record repository (read model of the ledger subsystem).

use std::sync::Arc;

use crate::entities::{FinancialRecord, financial_record};
use campus_common::{AppError, AppResult};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder,
};
use serde::Serialize;

/// Aggregated balance over a student's financial records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialSummary {
    /// Sum of all record balances.
    pub total_balance: Decimal,
    /// Number of records found.
    pub record_count: usize,
}

impl FinancialSummary {
    /// Sum a slice of records.
    #[must_use]
    pub fn from_records(records: &[financial_record::Model]) -> Self {
        Self {
            total_balance: records.iter().map(|r| r.balance).sum(),
            record_count: records.len(),
        }
    }

    /// Whether the student has any financial statement at all.
    #[must_use]
    pub const fn has_statements(&self) -> bool {
        self.record_count > 0
    }
}

/// Financial record repository. Read-only except for seeding.
#[derive(Clone)]
pub struct FinancialRecordRepository {
    db: Arc<DatabaseConnection>,
}

impl FinancialRecordRepository {
    /// Create a new financial record repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// All records for a student, oldest first.
    pub async fn find_by_student(
        &self,
        student_id: &str,
    ) -> AppResult<Vec<financial_record::Model>> {
        Self::find_by_student_in(self.db.as_ref(), student_id).await
    }

    /// All records for a student on an arbitrary connection or transaction.
    pub async fn find_by_student_in<C: ConnectionTrait>(
        conn: &C,
        student_id: &str,
    ) -> AppResult<Vec<financial_record::Model>> {
        FinancialRecord::find()
            .filter(financial_record::Column::StudentId.eq(student_id))
            .order_by_asc(financial_record::Column::CreatedAt)
            .all(conn)
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Balance summary for a student.
    pub async fn summarize(&self, student_id: &str) -> AppResult<FinancialSummary> {
        let records = self.find_by_student(student_id).await?;
        Ok(FinancialSummary::from_records(&records))
    }

    /// Insert a record. Used by fixtures and standalone deployments.
    pub async fn create(
        &self,
        model: financial_record::ActiveModel,
    ) -> AppResult<financial_record::Model> {
        model
            .insert(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
