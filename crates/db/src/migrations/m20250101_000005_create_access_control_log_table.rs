//! Create `access_control_log` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccessControlLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccessControlLog::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AccessControlLog::StudentId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccessControlLog::Action).string_len(32).not_null())
                    .col(ColumnDef::new(AccessControlLog::Reason).string_len(32).not_null())
                    .col(ColumnDef::new(AccessControlLog::PaymentApprovalId).string_len(32))
                    .col(ColumnDef::new(AccessControlLog::RegistrationId).string_len(32))
                    .col(ColumnDef::new(AccessControlLog::ActorId).string_len(64))
                    .col(ColumnDef::new(AccessControlLog::Notes).text())
                    .col(ColumnDef::new(AccessControlLog::Details).json_binary())
                    .col(ColumnDef::new(AccessControlLog::IpAddress).string_len(64))
                    .col(ColumnDef::new(AccessControlLog::UserAgent).text())
                    .col(
                        ColumnDef::new(AccessControlLog::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (student_id, created_at) - per-student audit history
        manager
            .create_index(
                Index::create()
                    .name("idx_access_control_log_student_created")
                    .table(AccessControlLog::Table)
                    .col(AccessControlLog::StudentId)
                    .col(AccessControlLog::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: action (filtering by action type)
        manager
            .create_index(
                Index::create()
                    .name("idx_access_control_log_action")
                    .table(AccessControlLog::Table)
                    .col(AccessControlLog::Action)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccessControlLog::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AccessControlLog {
    Table,
    Id,
    StudentId,
    Action,
    Reason,
    PaymentApprovalId,
    RegistrationId,
    ActorId,
    Notes,
    Details,
    IpAddress,
    UserAgent,
    CreatedAt,
}
