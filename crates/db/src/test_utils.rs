//! Test utilities for database operations.
//!
//! Provides helpers for setting up and tearing down live test databases, and
//! model fixtures for `MockDatabase`-backed tests.

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use tracing::info;

/// Test database configuration.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: std::env::var("TEST_DB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: std::env::var("TEST_DB_USER").unwrap_or_else(|_| "campus_test".to_string()),
            password: std::env::var("TEST_DB_PASSWORD")
                .unwrap_or_else(|_| "campus_test".to_string()),
            database: std::env::var("TEST_DB_NAME").unwrap_or_else(|_| "campus_test".to_string()),
        }
    }
}

impl TestDbConfig {
    /// Get the database URL.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    /// Get URL for connecting to postgres database (for creating test DB).
    #[must_use]
    pub fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/postgres",
            self.username, self.password, self.host, self.port
        )
    }
}

/// A test database context that manages the lifecycle of a test database.
pub struct TestDatabase {
    /// Database connection.
    pub conn: DatabaseConnection,
    /// Database configuration.
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Connect to the configured test database and run migrations.
    pub async fn new() -> Result<Self, DbErr> {
        Self::with_config(TestDbConfig::default()).await
    }

    /// Connect with a custom configuration and run migrations.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;
        run_migrations(&conn).await?;

        info!(database = %config.database, "Connected to test database");

        Ok(Self { conn, config })
    }

    /// Create a unique, migrated test database (for parallel tests).
    pub async fn create_unique() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let unique_suffix = uuid::Uuid::new_v4().simple().to_string();
        config.database = format!("campus_test_{}", &unique_suffix[..8]);

        let postgres_conn = Database::connect(&config.postgres_url()).await?;
        let create_db = format!("CREATE DATABASE \"{}\"", config.database);
        postgres_conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, create_db))
            .await?;
        postgres_conn.close().await?;

        let conn = Database::connect(&config.database_url()).await?;
        run_migrations(&conn).await?;

        info!(database = %config.database, "Created unique test database");

        Ok(Self { conn, config })
    }

    /// Get the database connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Truncate every application table.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        let tables = self
            .conn
            .query_all(Statement::from_string(
                DatabaseBackend::Postgres,
                "SELECT tablename FROM pg_tables WHERE schemaname = 'public'".to_string(),
            ))
            .await?;

        for row in tables {
            if let Ok(table_name) = row.try_get::<String>("", "tablename") {
                if table_name == "seaql_migrations" {
                    continue;
                }

                let truncate = format!("TRUNCATE TABLE \"{table_name}\" CASCADE");
                self.conn
                    .execute(Statement::from_string(DatabaseBackend::Postgres, truncate))
                    .await?;
            }
        }

        info!("Cleaned up test database");
        Ok(())
    }

    /// Drop the test database (for unique databases).
    pub async fn drop_database(self) -> Result<(), DbErr> {
        self.conn.close().await?;

        let postgres_conn = Database::connect(&self.config.postgres_url()).await?;

        let terminate = format!(
            "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{}'",
            self.config.database
        );
        postgres_conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, terminate))
            .await
            .ok();

        let drop_db = format!("DROP DATABASE IF EXISTS \"{}\"", self.config.database);
        postgres_conn
            .execute(Statement::from_string(DatabaseBackend::Postgres, drop_db))
            .await?;

        postgres_conn.close().await?;

        info!(database = %self.config.database, "Dropped test database");
        Ok(())
    }
}

async fn run_migrations(conn: &DatabaseConnection) -> Result<(), DbErr> {
    use sea_orm_migration::MigratorTrait;
    crate::migrations::Migrator::up(conn, None).await
}

/// Model fixtures for mock-backed tests.
pub mod fixtures {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use crate::entities::{
        access_control_log, financial_record, payment_approval,
        payment_approval::PaymentApprovalStatus, semester_period, student_semester_registration,
        student_semester_registration::RegistrationStatus,
    };

    /// Build a date, falling back to the epoch for impossible dates.
    #[must_use]
    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
    }

    /// A payment approval covering `[from, until]`.
    #[must_use]
    pub fn payment_approval(
        id: &str,
        student_id: &str,
        status: PaymentApprovalStatus,
        from: NaiveDate,
        until: NaiveDate,
    ) -> payment_approval::Model {
        payment_approval::Model {
            id: id.to_string(),
            student_id: student_id.to_string(),
            payment_id: None,
            amount_paid: Decimal::new(150_000, 2),
            payment_reference: Some(format!("REF-{id}")),
            payment_date: from,
            approved_by: (status == PaymentApprovalStatus::Approved)
                .then(|| "accountant1".to_string()),
            approval_date: (status == PaymentApprovalStatus::Approved)
                .then(|| Utc::now().into()),
            access_valid_from: from,
            access_valid_until: until,
            status,
            notes: None,
            auto_expire: true,
            revoked_by: None,
            revoked_at: None,
            revocation_reason: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    /// An active semester period with an open registration window.
    #[must_use]
    pub fn semester_period(id: &str, start: NaiveDate, end: NaiveDate) -> semester_period::Model {
        semester_period::Model {
            id: id.to_string(),
            name: format!("Semester {id}"),
            academic_year: "2023/2024".to_string(),
            semester: 2,
            start_date: start,
            end_date: end,
            registration_start_date: start,
            registration_end_date: end,
            is_active: true,
            is_registration_open: true,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    /// A registration in `status` for (`student_id`, `period_id`).
    #[must_use]
    pub fn registration(
        id: &str,
        student_id: &str,
        period_id: &str,
        status: RegistrationStatus,
    ) -> student_semester_registration::Model {
        student_semester_registration::Model {
            id: id.to_string(),
            student_id: student_id.to_string(),
            semester_period_id: period_id.to_string(),
            registration_date: Utc::now().into(),
            registered_by: "accountant1".to_string(),
            approved_by: None,
            approval_date: None,
            status,
            payment_approval_id: Some("pa1".to_string()),
            notes: None,
            updated_at: None,
        }
    }

    /// A financial statement line with `balance` in minor units (cents).
    #[must_use]
    pub fn financial_record(id: &str, student_id: &str, balance_cents: i64) -> financial_record::Model {
        financial_record::Model {
            id: id.to_string(),
            student_id: student_id.to_string(),
            description: Some("Tuition".to_string()),
            term: Some("2023/2024-2".to_string()),
            balance: Decimal::new(balance_cents, 2),
            created_at: Utc::now().into(),
        }
    }

    /// An audit entry for `student_id`.
    #[must_use]
    pub fn audit_entry(
        id: &str,
        student_id: &str,
        action: access_control_log::AuditAction,
        reason: access_control_log::ReasonCode,
    ) -> access_control_log::Model {
        access_control_log::Model {
            id: id.to_string(),
            student_id: student_id.to_string(),
            action,
            reason,
            payment_approval_id: None,
            registration_id: None,
            actor_id: None,
            notes: None,
            details: None,
            ip_address: None,
            user_agent: None,
            created_at: Utc::now().into(),
        }
    }
}
