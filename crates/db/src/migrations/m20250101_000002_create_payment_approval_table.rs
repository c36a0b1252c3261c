//! Create `payment_approval` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PaymentApproval::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PaymentApproval::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(PaymentApproval::StudentId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentApproval::PaymentId).string_len(64))
                    .col(
                        ColumnDef::new(PaymentApproval::AmountPaid)
                            .decimal_len(12, 2)
                            .not_null(),
                    )
                    .col(ColumnDef::new(PaymentApproval::PaymentReference).string_len(128))
                    .col(ColumnDef::new(PaymentApproval::PaymentDate).date().not_null())
                    .col(ColumnDef::new(PaymentApproval::ApprovedBy).string_len(64))
                    .col(ColumnDef::new(PaymentApproval::ApprovalDate).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(PaymentApproval::AccessValidFrom)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentApproval::AccessValidUntil)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(PaymentApproval::Status)
                            .string_len(16)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(PaymentApproval::Notes).text())
                    .col(
                        ColumnDef::new(PaymentApproval::AutoExpire)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(PaymentApproval::RevokedBy).string_len(64))
                    .col(ColumnDef::new(PaymentApproval::RevokedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(PaymentApproval::RevocationReason).text())
                    .col(
                        ColumnDef::new(PaymentApproval::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(PaymentApproval::UpdatedAt).timestamp_with_time_zone())
                    .check(Expr::col(PaymentApproval::AmountPaid).gt(0))
                    .check(
                        Expr::col(PaymentApproval::AccessValidUntil)
                            .gt(Expr::col(PaymentApproval::AccessValidFrom)),
                    )
                    .check(Expr::col(PaymentApproval::Status).is_in([
                        "pending", "approved", "rejected", "expired", "revoked",
                    ]))
                    .to_owned(),
            )
            .await?;

        // Index: (student_id, status) - effective approval lookups
        manager
            .create_index(
                Index::create()
                    .name("idx_payment_approval_student_status")
                    .table(PaymentApproval::Table)
                    .col(PaymentApproval::StudentId)
                    .col(PaymentApproval::Status)
                    .to_owned(),
            )
            .await?;

        // Index: access_valid_until (expiry reporting)
        manager
            .create_index(
                Index::create()
                    .name("idx_payment_approval_valid_until")
                    .table(PaymentApproval::Table)
                    .col(PaymentApproval::AccessValidUntil)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PaymentApproval::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PaymentApproval {
    Table,
    Id,
    StudentId,
    PaymentId,
    AmountPaid,
    PaymentReference,
    PaymentDate,
    ApprovedBy,
    ApprovalDate,
    AccessValidFrom,
    AccessValidUntil,
    Status,
    Notes,
    AutoExpire,
    RevokedBy,
    RevokedAt,
    RevocationReason,
    CreatedAt,
    UpdatedAt,
}
