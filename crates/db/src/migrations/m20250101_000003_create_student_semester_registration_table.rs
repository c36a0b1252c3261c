//! Create `student_semester_registration` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StudentSemesterRegistration::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StudentSemesterRegistration::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(StudentSemesterRegistration::StudentId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentSemesterRegistration::SemesterPeriodId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(StudentSemesterRegistration::RegistrationDate)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(StudentSemesterRegistration::RegisteredBy)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(StudentSemesterRegistration::ApprovedBy).string_len(64))
                    .col(
                        ColumnDef::new(StudentSemesterRegistration::ApprovalDate)
                            .timestamp_with_time_zone(),
                    )
                    .col(
                        ColumnDef::new(StudentSemesterRegistration::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(StudentSemesterRegistration::PaymentApprovalId)
                            .string_len(32),
                    )
                    .col(ColumnDef::new(StudentSemesterRegistration::Notes).text())
                    .col(
                        ColumnDef::new(StudentSemesterRegistration::UpdatedAt)
                            .timestamp_with_time_zone(),
                    )
                    .check(Expr::col(StudentSemesterRegistration::Status).is_in([
                        "pending", "approved", "rejected", "cancelled",
                    ]))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_registration_semester_period")
                            .from(
                                StudentSemesterRegistration::Table,
                                StudentSemesterRegistration::SemesterPeriodId,
                            )
                            .to(SemesterPeriod::Table, SemesterPeriod::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_registration_payment_approval")
                            .from(
                                StudentSemesterRegistration::Table,
                                StudentSemesterRegistration::PaymentApprovalId,
                            )
                            .to(PaymentApproval::Table, PaymentApproval::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (student_id, semester_period_id) - one registration per period
        manager
            .create_index(
                Index::create()
                    .name("idx_registration_student_period")
                    .table(StudentSemesterRegistration::Table)
                    .col(StudentSemesterRegistration::StudentId)
                    .col(StudentSemesterRegistration::SemesterPeriodId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index: semester_period_id (listing a period's registrations)
        manager
            .create_index(
                Index::create()
                    .name("idx_registration_semester_period_id")
                    .table(StudentSemesterRegistration::Table)
                    .col(StudentSemesterRegistration::SemesterPeriodId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(StudentSemesterRegistration::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(Iden)]
enum StudentSemesterRegistration {
    Table,
    Id,
    StudentId,
    SemesterPeriodId,
    RegistrationDate,
    RegisteredBy,
    ApprovedBy,
    ApprovalDate,
    Status,
    PaymentApprovalId,
    Notes,
    UpdatedAt,
}

#[derive(Iden)]
enum SemesterPeriod {
    Table,
    Id,
}

#[derive(Iden)]
enum PaymentApproval {
    Table,
    Id,
}
