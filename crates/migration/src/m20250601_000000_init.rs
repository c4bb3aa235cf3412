//! Initial schema.
//!
//! - `users`: identities upserted on login, with the moderator flag
//! - `site_instance`: singleton site configuration
//! - `funding_pool`: named goals (no stored balance)
//! - `ledger`: immutable monetary events
//! - `allocation`: per-pool split of each ledger entry

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    SubjectId,
    Email,
    FirstName,
    LastName,
    IsModerator,
}

#[derive(Iden)]
enum SiteInstance {
    Table,
    Id,
    SiteTitle,
    SiteHeadline,
}

#[derive(Iden)]
enum FundingPool {
    Table,
    Id,
    Name,
    Description,
    GoalAmountMinor,
}

#[derive(Iden)]
enum Ledger {
    Table,
    Id,
    TransactionId,
    AmountMinor,
    CreatedAt,
    Kind,
    UserSubjectId,
    FirstName,
    LastInitial,
    Anonymous,
    Description,
}

#[derive(Iden)]
enum Allocation {
    Table,
    Id,
    LedgerId,
    FundingPoolId,
    AmountMinor,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::SubjectId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Email).string().not_null())
                    .col(ColumnDef::new(Users::FirstName).string().not_null())
                    .col(ColumnDef::new(Users::LastName).string().not_null())
                    .col(
                        ColumnDef::new(Users::IsModerator)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Site instance
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(SiteInstance::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SiteInstance::Id)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SiteInstance::SiteTitle).string().not_null())
                    .col(ColumnDef::new(SiteInstance::SiteHeadline).string())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Funding pools
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(FundingPool::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FundingPool::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FundingPool::Name).string().not_null())
                    .col(ColumnDef::new(FundingPool::Description).text())
                    .col(
                        ColumnDef::new(FundingPool::GoalAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Ledger
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Ledger::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Ledger::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Ledger::TransactionId).string())
                    .col(ColumnDef::new(Ledger::AmountMinor).big_integer().not_null())
                    .col(
                        ColumnDef::new(Ledger::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Ledger::Kind).string().not_null())
                    .col(ColumnDef::new(Ledger::UserSubjectId).string())
                    .col(ColumnDef::new(Ledger::FirstName).string())
                    .col(ColumnDef::new(Ledger::LastInitial).string())
                    .col(
                        ColumnDef::new(Ledger::Anonymous)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Ledger::Description).text())
                    .to_owned(),
            )
            .await?;

        // A capture can only ever be recorded once.
        manager
            .create_index(
                Index::create()
                    .name("idx-ledger-transaction_id-unique")
                    .table(Ledger::Table)
                    .col(Ledger::TransactionId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-ledger-created_at")
                    .table(Ledger::Table)
                    .col(Ledger::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Allocations
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Allocation::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Allocation::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Allocation::LedgerId).integer().not_null())
                    .col(ColumnDef::new(Allocation::FundingPoolId).integer().not_null())
                    .col(
                        ColumnDef::new(Allocation::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-allocation-ledger_id")
                            .from(Allocation::Table, Allocation::LedgerId)
                            .to(Ledger::Table, Ledger::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-allocation-funding_pool_id")
                            .from(Allocation::Table, Allocation::FundingPoolId)
                            .to(FundingPool::Table, FundingPool::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-allocation-ledger_id")
                    .table(Allocation::Table)
                    .col(Allocation::LedgerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-allocation-funding_pool_id")
                    .table(Allocation::Table)
                    .col(Allocation::FundingPoolId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Allocation::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Ledger::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(FundingPool::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SiteInstance::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
