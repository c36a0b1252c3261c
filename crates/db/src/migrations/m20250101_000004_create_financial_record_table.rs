//! Create `financial_record` table migration.
//!
//! The ledger subsystem owns this table in production; creating it here lets
//! the service run against an empty database.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(FinancialRecord::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FinancialRecord::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(FinancialRecord::StudentId)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(FinancialRecord::Description).string_len(256))
                    .col(ColumnDef::new(FinancialRecord::Term).string_len(32))
                    .col(
                        ColumnDef::new(FinancialRecord::Balance)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(FinancialRecord::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_financial_record_student_id")
                    .table(FinancialRecord::Table)
                    .col(FinancialRecord::StudentId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FinancialRecord::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum FinancialRecord {
    Table,
    Id,
    StudentId,
    Description,
    Term,
    Balance,
    CreatedAt,
}
