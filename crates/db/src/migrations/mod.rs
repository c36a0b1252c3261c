//! Database migrations.
//!
//! Schema migrations for the database.

#![allow(missing_docs)]

use sea_orm_migration::prelude::*;

mod m20250101_000001_create_semester_period_table;
mod m20250101_000002_create_payment_approval_table;
mod m20250101_000003_create_student_semester_registration_table;
mod m20250101_000004_create_financial_record_table;
mod m20250101_000005_create_access_control_log_table;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_semester_period_table::Migration),
            Box::new(m20250101_000002_create_payment_approval_table::Migration),
            Box::new(m20250101_000003_create_student_semester_registration_table::Migration),
            Box::new(m20250101_000004_create_financial_record_table::Migration),
            Box::new(m20250101_000005_create_access_control_log_table::Migration),
        ]
    }
}
