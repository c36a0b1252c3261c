//! Database integration tests.
//!
//! These tests require a running `PostgreSQL` instance.
//! Run with: `cargo test -p campus-db --test db_integration -- --ignored`
//!
//! Environment variables:
//!   `TEST_DB_HOST` (default: localhost)
//!   `TEST_DB_PORT` (default: 5433)
//!   `TEST_DB_USER` (default: `campus_test`)
//!   `TEST_DB_PASSWORD` (default: `campus_test`)
//!   `TEST_DB_NAME` (default: `campus_test`)

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use campus_common::AppError;
use campus_db::{
    entities::{
        payment_approval::{self, PaymentApprovalStatus},
        semester_period, student_semester_registration,
    },
    repositories::{PaymentApprovalRepository, RegistrationRepository, SemesterPeriodRepository},
    test_utils::{TestDatabase, TestDbConfig, fixtures},
};
use sea_orm::{ActiveModelTrait, ActiveValue::Set, Database, IntoActiveModel};

fn registration_model(id: &str) -> student_semester_registration::ActiveModel {
    let mut model = fixtures::registration(id, "student1", "sp1", Default::default())
        .into_active_model()
        .reset_all();
    model.payment_approval_id = Set(None);
    model
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_database_connection() {
    let config = TestDbConfig::default();
    let result = TestDatabase::with_config(config).await;
    assert!(result.is_ok(), "Failed to connect: {:?}", result.err());
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_unique_index_rejects_second_registration() {
    let db = TestDatabase::create_unique().await.unwrap();
    let conn = Arc::new(Database::connect(&db.config.database_url()).await.unwrap());

    let periods = SemesterPeriodRepository::new(conn.clone());
    let period: semester_period::ActiveModel = fixtures::semester_period(
        "sp1",
        fixtures::date(2024, 1, 8),
        fixtures::date(2024, 5, 31),
    )
    .into_active_model()
    .reset_all();
    periods.create(period).await.unwrap();

    let first = RegistrationRepository::create_in(db.connection(), registration_model("reg1")).await;
    let second = RegistrationRepository::create_in(db.connection(), registration_model("reg2")).await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(AppError::Conflict(_))));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_check_constraint_rejects_inverted_window() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repo = PaymentApprovalRepository::new(Arc::new(
        Database::connect(&db.config.database_url()).await.unwrap(),
    ));

    let model: payment_approval::ActiveModel = fixtures::payment_approval(
        "pa1",
        "student1",
        PaymentApprovalStatus::Approved,
        fixtures::date(2024, 6, 30),
        fixtures::date(2024, 1, 1),
    )
    .into_active_model()
    .reset_all();
    let result = repo.create(model).await;

    assert!(matches!(result, Err(AppError::Database(_))));

    db.drop_database().await.unwrap();
}

#[tokio::test]
#[ignore = "requires running PostgreSQL instance"]
async fn test_effective_window_is_inclusive() {
    let db = TestDatabase::create_unique().await.unwrap();
    let repo = PaymentApprovalRepository::new(Arc::new(
        Database::connect(&db.config.database_url()).await.unwrap(),
    ));

    let model: payment_approval::ActiveModel = fixtures::payment_approval(
        "pa1",
        "student1",
        PaymentApprovalStatus::Approved,
        fixtures::date(2024, 1, 1),
        fixtures::date(2024, 6, 30),
    )
    .into_active_model()
    .reset_all();
    repo.create(model).await.unwrap();

    let last_day = repo
        .find_effective("student1", fixtures::date(2024, 6, 30))
        .await
        .unwrap();
    let day_after = repo
        .find_effective("student1", fixtures::date(2024, 7, 1))
        .await
        .unwrap();

    assert_eq!(last_day.len(), 1);
    assert!(day_after.is_empty());

    db.drop_database().await.unwrap();
}

#[test]
fn test_config_from_env() {
    let config = TestDbConfig::default();
    assert!(!config.host.is_empty());
    assert!(config.port > 0);
    assert!(!config.username.is_empty());
    assert!(!config.database.is_empty());
}

#[test]
fn test_postgres_url_format() {
    let config = TestDbConfig::default();
    let url = config.postgres_url();
    assert!(url.ends_with("/postgres"));
}
