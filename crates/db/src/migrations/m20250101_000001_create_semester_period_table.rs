//! Create `semester_period` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SemesterPeriod::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SemesterPeriod::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SemesterPeriod::Name).string_len(128).not_null())
                    .col(
                        ColumnDef::new(SemesterPeriod::AcademicYear)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SemesterPeriod::Semester).small_integer().not_null())
                    .col(ColumnDef::new(SemesterPeriod::StartDate).date().not_null())
                    .col(ColumnDef::new(SemesterPeriod::EndDate).date().not_null())
                    .col(
                        ColumnDef::new(SemesterPeriod::RegistrationStartDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SemesterPeriod::RegistrationEndDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SemesterPeriod::IsActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SemesterPeriod::IsRegistrationOpen)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SemesterPeriod::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(SemesterPeriod::UpdatedAt).timestamp_with_time_zone())
                    .check(Expr::col(SemesterPeriod::EndDate).gt(Expr::col(SemesterPeriod::StartDate)))
                    .check(
                        Expr::col(SemesterPeriod::RegistrationEndDate)
                            .gte(Expr::col(SemesterPeriod::RegistrationStartDate)),
                    )
                    .check(Expr::col(SemesterPeriod::Semester).is_in([1, 2]))
                    .to_owned(),
            )
            .await?;

        // Index: is_active (current-period lookups)
        manager
            .create_index(
                Index::create()
                    .name("idx_semester_period_is_active")
                    .table(SemesterPeriod::Table)
                    .col(SemesterPeriod::IsActive)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SemesterPeriod::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SemesterPeriod {
    Table,
    Id,
    Name,
    AcademicYear,
    Semester,
    StartDate,
    EndDate,
    RegistrationStartDate,
    RegistrationEndDate,
    IsActive,
    IsRegistrationOpen,
    CreatedAt,
    UpdatedAt,
}
