//! Semester period administration.

use campus_common::{AppError, AppResult, IdGenerator};
use campus_db::{entities::semester_period, repositories::SemesterPeriodRepository};
use chrono::{NaiveDate, Utc};
use sea_orm::Set;
use serde::Deserialize;
use tracing::{info, warn};
use validator::Validate;

use super::clock::ClockService;
use super::policy::compare_periods;

/// Input for creating a semester period.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSemesterPeriodInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 20))]
    pub academic_year: String,
    #[validate(range(min = 1, max = 2))]
    pub semester: i16,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub registration_start_date: NaiveDate,
    pub registration_end_date: NaiveDate,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_registration_open: bool,
}

/// Service for managing semester periods.
#[derive(Clone)]
pub struct SemesterPeriodService {
    repo: SemesterPeriodRepository,
    clock: ClockService,
    id_gen: IdGenerator,
}

impl SemesterPeriodService {
    /// Create a new semester period service.
    #[must_use]
    pub const fn new(repo: SemesterPeriodRepository, clock: ClockService) -> Self {
        Self {
            repo,
            clock,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a period.
    pub async fn create(
        &self,
        input: CreateSemesterPeriodInput,
    ) -> AppResult<semester_period::Model> {
        input.validate()?;

        if input.end_date <= input.start_date {
            return Err(AppError::Validation(
                "end date must be after start date".to_string(),
            ));
        }
        if input.registration_end_date < input.registration_start_date {
            return Err(AppError::Validation(
                "registration end date must not precede registration start date".to_string(),
            ));
        }

        let model = semester_period::ActiveModel {
            id: Set(self.id_gen.generate()),
            name: Set(input.name),
            academic_year: Set(input.academic_year),
            semester: Set(input.semester),
            start_date: Set(input.start_date),
            end_date: Set(input.end_date),
            registration_start_date: Set(input.registration_start_date),
            registration_end_date: Set(input.registration_end_date),
            is_active: Set(input.is_active),
            is_registration_open: Set(input.is_registration_open),
            created_at: Set(Utc::now().into()),
            updated_at: Set(None),
        };

        let period = self.repo.create(model).await?;
        info!(period_id = %period.id, name = %period.name, "Semester period created");

        if period.is_active {
            self.warn_on_overlap(&period).await;
        }

        Ok(period)
    }

    /// Periods, newest first.
    pub async fn list(&self, limit: u64, offset: u64) -> AppResult<Vec<semester_period::Model>> {
        self.repo.list(limit, offset).await
    }

    /// Get a period by ID.
    pub async fn get(&self, id: &str) -> AppResult<semester_period::Model> {
        self.repo.get_by_id(id).await
    }

    /// Mark a period active. Other active periods are left alone.
    pub async fn activate(&self, id: &str) -> AppResult<semester_period::Model> {
        let period = self
            .set_flags(id, |model| model.is_active = Set(true))
            .await?;
        self.warn_on_overlap(&period).await;
        info!(period_id = %id, "Semester period activated");
        Ok(period)
    }

    /// Mark a period inactive.
    pub async fn deactivate(&self, id: &str) -> AppResult<semester_period::Model> {
        let period = self
            .set_flags(id, |model| model.is_active = Set(false))
            .await?;
        info!(period_id = %id, "Semester period deactivated");
        Ok(period)
    }

    /// Start accepting registrations.
    pub async fn open_registration(&self, id: &str) -> AppResult<semester_period::Model> {
        let period = self
            .set_flags(id, |model| model.is_registration_open = Set(true))
            .await?;
        info!(period_id = %id, "Registration opened");
        Ok(period)
    }

    /// Stop accepting registrations.
    pub async fn close_registration(&self, id: &str) -> AppResult<semester_period::Model> {
        let period = self
            .set_flags(id, |model| model.is_registration_open = Set(false))
            .await?;
        info!(period_id = %id, "Registration closed");
        Ok(period)
    }

    /// The active period containing today, if any.
    pub async fn current_active(&self) -> AppResult<Option<semester_period::Model>> {
        self.current_active_on(self.clock.today()).await
    }

    /// The active period containing `day`. Latest end date wins, then latest
    /// start date, then greatest id.
    pub async fn current_active_on(
        &self,
        day: NaiveDate,
    ) -> AppResult<Option<semester_period::Model>> {
        let periods = self.repo.find_current_on(day).await?;
        if periods.len() > 1 {
            warn!(
                day = %day,
                count = periods.len(),
                "Multiple active semester periods contain the same day"
            );
        }
        Ok(periods
            .into_iter()
            .filter(|p| p.is_current_on(day))
            .max_by(compare_periods))
    }

    async fn set_flags(
        &self,
        id: &str,
        apply: impl FnOnce(&mut semester_period::ActiveModel),
    ) -> AppResult<semester_period::Model> {
        let period = self.repo.get_by_id(id).await?;
        let mut model: semester_period::ActiveModel = period.into();
        apply(&mut model);
        model.updated_at = Set(Some(Utc::now().into()));
        self.repo.update(model).await
    }

    /// Log active periods overlapping `period`. Runs after the write has
    /// committed, so a failed lookup is logged and never reported to the caller.
    async fn warn_on_overlap(&self, period: &semester_period::Model) {
        match self
            .repo
            .find_active_overlapping(period.start_date, period.end_date, &period.id)
            .await
        {
            Ok(overlapping) if !overlapping.is_empty() => {
                let ids: Vec<&str> = overlapping.iter().map(|p| p.id.as_str()).collect();
                warn!(
                    period_id = %period.id,
                    overlapping = ?ids,
                    "Active semester periods overlap"
                );
            }
            Ok(_) => {}
            Err(e) => {
                warn!(period_id = %period.id, error = %e, "Overlap check failed");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::services::clock::FixedClock;
    use campus_db::test_utils::fixtures::{self, date};
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use std::sync::Arc;

    fn service(db: MockDatabase) -> SemesterPeriodService {
        SemesterPeriodService::new(
            SemesterPeriodRepository::new(Arc::new(db.into_connection())),
            Arc::new(FixedClock(date(2024, 3, 15))),
        )
    }

    fn input() -> CreateSemesterPeriodInput {
        CreateSemesterPeriodInput {
            name: "Second Semester".to_string(),
            academic_year: "2023/2024".to_string(),
            semester: 2,
            start_date: date(2024, 1, 8),
            end_date: date(2024, 5, 31),
            registration_start_date: date(2023, 12, 1),
            registration_end_date: date(2024, 1, 31),
            is_active: false,
            is_registration_open: false,
        }
    }

    #[tokio::test]
    async fn test_create_period() {
        let mut created = fixtures::semester_period("sp1", date(2024, 1, 8), date(2024, 5, 31));
        created.is_active = false;
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[created]]);

        let period = service(db).create(input()).await.unwrap();

        assert_eq!(period.id, "sp1");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_semester_number() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .create(CreateSemesterPeriodInput {
                semester: 3,
                ..input()
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_end_before_start() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .create(CreateSemesterPeriodInput {
                end_date: date(2024, 1, 8),
                ..input()
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_rejects_inverted_registration_window() {
        let result = service(MockDatabase::new(DatabaseBackend::Postgres))
            .create(CreateSemesterPeriodInput {
                registration_end_date: date(2023, 11, 30),
                ..input()
            })
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_activate_tolerates_overlap() {
        let mut inactive = fixtures::semester_period("sp1", date(2024, 1, 8), date(2024, 5, 31));
        inactive.is_active = false;
        let active = fixtures::semester_period("sp1", date(2024, 1, 8), date(2024, 5, 31));
        let other = fixtures::semester_period("sp2", date(2024, 2, 1), date(2024, 7, 15));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[inactive]])
            .append_query_results([[active]])
            .append_query_results([[other]]);

        let period = service(db).activate("sp1").await.unwrap();

        assert!(period.is_active);
    }

    #[tokio::test]
    async fn test_create_succeeds_when_overlap_lookup_fails() {
        let created = fixtures::semester_period("sp1", date(2024, 1, 8), date(2024, 5, 31));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[created]])
            .append_query_errors([DbErr::Custom("connection reset".to_string())]);

        let period = service(db)
            .create(CreateSemesterPeriodInput {
                is_active: true,
                ..input()
            })
            .await
            .unwrap();

        assert_eq!(period.id, "sp1");
        assert!(period.is_active);
    }

    #[tokio::test]
    async fn test_activate_succeeds_when_overlap_lookup_fails() {
        let mut inactive = fixtures::semester_period("sp1", date(2024, 1, 8), date(2024, 5, 31));
        inactive.is_active = false;
        let active = fixtures::semester_period("sp1", date(2024, 1, 8), date(2024, 5, 31));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([[inactive]])
            .append_query_results([[active]])
            .append_query_errors([DbErr::Custom("connection reset".to_string())]);

        let period = service(db).activate("sp1").await.unwrap();

        assert!(period.is_active);
    }

    #[tokio::test]
    async fn test_current_active_picks_latest_ending() {
        let late = fixtures::semester_period("sp2", date(2024, 2, 1), date(2024, 7, 15));
        let early = fixtures::semester_period("sp1", date(2024, 1, 8), date(2024, 5, 31));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![early, late]]);

        let current = service(db).current_active().await.unwrap().unwrap();

        assert_eq!(current.id, "sp2");
    }

    #[tokio::test]
    async fn test_current_active_none() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<semester_period::Model>::new()]);

        assert!(service(db).current_active().await.unwrap().is_none());
    }
}
