//! Initial schema.
//!
//! - `users`: HTTP Basic credentials
//! - `accounts`: checking, savings and credit card accounts with a cached balance
//! - `categories`: expense and income categories
//! - `faturas`: monthly credit card statements
//! - `entries`, `incomes`, `transfers`: the ledger
//! - `budgets`: monthly amount per expense category
//! - `events`, `tasks`: calendar items with optional RRULE
//! - `push_tokens`: device tokens for reminders

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    Password,
}

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    UserId,
    Name,
    NameNorm,
    Kind,
    CurrentBalance,
    DueDay,
    Archived,
}

#[derive(Iden)]
enum Categories {
    Table,
    Id,
    UserId,
    Name,
    NameNorm,
    Kind,
    Color,
    Icon,
}

#[derive(Iden)]
enum Faturas {
    Table,
    Id,
    UserId,
    AccountId,
    YearMonth,
    TotalAmount,
    DueDate,
    PaidAt,
    PaidFromAccountId,
}

#[derive(Iden)]
enum Entries {
    Table,
    Id,
    UserId,
    AccountId,
    CategoryId,
    Description,
    Amount,
    DueDate,
    PaidAt,
    Ignored,
    FaturaId,
    CreatedAt,
}

#[derive(Iden)]
enum Incomes {
    Table,
    Id,
    UserId,
    AccountId,
    CategoryId,
    Description,
    Amount,
    ExpectedDate,
    ReceivedAt,
    CreatedAt,
}

#[derive(Iden)]
enum Transfers {
    Table,
    Id,
    UserId,
    FromAccountId,
    ToAccountId,
    Amount,
    OccurredAt,
    Description,
    FaturaId,
}

#[derive(Iden)]
enum Budgets {
    Table,
    Id,
    UserId,
    CategoryId,
    YearMonth,
    Amount,
}

#[derive(Iden)]
enum Events {
    Table,
    Id,
    UserId,
    Title,
    StartAt,
    EndAt,
    Status,
    RecurrenceRule,
}

#[derive(Iden)]
enum Tasks {
    Table,
    Id,
    UserId,
    Title,
    StartAt,
    DueAt,
    Status,
    RecurrenceRule,
}

#[derive(Iden)]
enum PushTokens {
    Table,
    Id,
    UserId,
    Token,
    Platform,
    CreatedAt,
}

fn user_fk<T: Iden + 'static, C: Iden + 'static>(
    name: &str,
    table: T,
    column: C,
) -> ForeignKeyCreateStatement {
    ForeignKey::create()
        .name(name)
        .from(table, column)
        .to(Users::Table, Users::Username)
        .on_delete(ForeignKeyAction::Cascade)
        .to_owned()
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
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::Password).string().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Accounts::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Accounts::UserId).string().not_null())
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::NameNorm).string().not_null())
                    .col(ColumnDef::new(Accounts::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Accounts::CurrentBalance)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Accounts::DueDay).integer())
                    .col(
                        ColumnDef::new(Accounts::Archived)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(&mut user_fk(
                        "fk-accounts-user_id",
                        Accounts::Table,
                        Accounts::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-accounts-user_id-name_norm-unique")
                    .table(Accounts::Table)
                    .col(Accounts::UserId)
                    .col(Accounts::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Categories
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Categories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Categories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Categories::UserId).string().not_null())
                    .col(ColumnDef::new(Categories::Name).string().not_null())
                    .col(ColumnDef::new(Categories::NameNorm).string().not_null())
                    .col(ColumnDef::new(Categories::Kind).string().not_null())
                    .col(ColumnDef::new(Categories::Color).string())
                    .col(ColumnDef::new(Categories::Icon).string())
                    .foreign_key(&mut user_fk(
                        "fk-categories-user_id",
                        Categories::Table,
                        Categories::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-categories-user_id-name_norm-unique")
                    .table(Categories::Table)
                    .col(Categories::UserId)
                    .col(Categories::NameNorm)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Faturas
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Faturas::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Faturas::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Faturas::UserId).string().not_null())
                    .col(ColumnDef::new(Faturas::AccountId).uuid().not_null())
                    .col(ColumnDef::new(Faturas::YearMonth).string().not_null())
                    .col(
                        ColumnDef::new(Faturas::TotalAmount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(Faturas::DueDate).date().not_null())
                    .col(ColumnDef::new(Faturas::PaidAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Faturas::PaidFromAccountId).uuid())
                    .foreign_key(&mut user_fk(
                        "fk-faturas-user_id",
                        Faturas::Table,
                        Faturas::UserId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-faturas-account_id")
                            .from(Faturas::Table, Faturas::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-faturas-paid_from_account_id")
                            .from(Faturas::Table, Faturas::PaidFromAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-faturas-account_id-year_month-unique")
                    .table(Faturas::Table)
                    .col(Faturas::AccountId)
                    .col(Faturas::YearMonth)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-faturas-due_date")
                    .table(Faturas::Table)
                    .col(Faturas::DueDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Entries
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Entries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Entries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Entries::UserId).string().not_null())
                    .col(ColumnDef::new(Entries::AccountId).uuid().not_null())
                    .col(ColumnDef::new(Entries::CategoryId).uuid().not_null())
                    .col(
                        ColumnDef::new(Entries::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Entries::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Entries::DueDate).date().not_null())
                    .col(ColumnDef::new(Entries::PaidAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Entries::Ignored)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(Entries::FaturaId).uuid())
                    .col(
                        ColumnDef::new(Entries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut user_fk(
                        "fk-entries-user_id",
                        Entries::Table,
                        Entries::UserId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-entries-account_id")
                            .from(Entries::Table, Entries::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-entries-category_id")
                            .from(Entries::Table, Entries::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-entries-fatura_id")
                            .from(Entries::Table, Entries::FaturaId)
                            .to(Faturas::Table, Faturas::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-entries-user_id-due_date")
                    .table(Entries::Table)
                    .col(Entries::UserId)
                    .col(Entries::DueDate)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-entries-account_id-due_date")
                    .table(Entries::Table)
                    .col(Entries::AccountId)
                    .col(Entries::DueDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Incomes
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Incomes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Incomes::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Incomes::UserId).string().not_null())
                    .col(ColumnDef::new(Incomes::AccountId).uuid().not_null())
                    .col(ColumnDef::new(Incomes::CategoryId).uuid().not_null())
                    .col(
                        ColumnDef::new(Incomes::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Incomes::Amount).big_integer().not_null())
                    .col(ColumnDef::new(Incomes::ExpectedDate).date().not_null())
                    .col(ColumnDef::new(Incomes::ReceivedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Incomes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut user_fk(
                        "fk-incomes-user_id",
                        Incomes::Table,
                        Incomes::UserId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-incomes-account_id")
                            .from(Incomes::Table, Incomes::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-incomes-category_id")
                            .from(Incomes::Table, Incomes::CategoryId)
                            .to(Categories::Table, Categories::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-incomes-account_id")
                    .table(Incomes::Table)
                    .col(Incomes::AccountId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 7. Transfers
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transfers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transfers::UserId).string().not_null())
                    .col(ColumnDef::new(Transfers::FromAccountId).uuid().not_null())
                    .col(ColumnDef::new(Transfers::ToAccountId).uuid().not_null())
                    .col(ColumnDef::new(Transfers::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Transfers::OccurredAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transfers::Description).string())
                    .col(ColumnDef::new(Transfers::FaturaId).uuid())
                    .foreign_key(&mut user_fk(
                        "fk-transfers-user_id",
                        Transfers::Table,
                        Transfers::UserId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transfers-from_account_id")
                            .from(Transfers::Table, Transfers::FromAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transfers-to_account_id")
                            .from(Transfers::Table, Transfers::ToAccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transfers-fatura_id")
                            .from(Transfers::Table, Transfers::FaturaId)
                            .to(Faturas::Table, Faturas::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 8. Budgets
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Budgets::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Budgets::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Budgets::UserId).string().not_null())
                    .col(ColumnDef::new(Budgets::CategoryId).uuid().not_null())
                    .col(ColumnDef::new(Budgets::YearMonth).string().not_null())
                    .col(ColumnDef::new(Budgets::Amount).big_integer().not_null())
                    .foreign_key(&mut user_fk(
                        "fk-budgets-user_id",
                        Budgets::Table,
                        Budgets::UserId,
                    ))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-budgets-category_id")
                            .from(Budgets::Table, Budgets::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-budgets-user_id-category_id-year_month-unique")
                    .table(Budgets::Table)
                    .col(Budgets::UserId)
                    .col(Budgets::CategoryId)
                    .col(Budgets::YearMonth)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 9. Events and tasks
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Events::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Events::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Events::UserId).string().not_null())
                    .col(ColumnDef::new(Events::Title).string().not_null())
                    .col(
                        ColumnDef::new(Events::StartAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Events::EndAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Events::Status)
                            .string()
                            .not_null()
                            .default("scheduled"),
                    )
                    .col(ColumnDef::new(Events::RecurrenceRule).string())
                    .foreign_key(&mut user_fk(
                        "fk-events-user_id",
                        Events::Table,
                        Events::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-events-status-end_at")
                    .table(Events::Table)
                    .col(Events::Status)
                    .col(Events::EndAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Tasks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Tasks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Tasks::UserId).string().not_null())
                    .col(ColumnDef::new(Tasks::Title).string().not_null())
                    .col(ColumnDef::new(Tasks::StartAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Tasks::DueAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Tasks::Status)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Tasks::RecurrenceRule).string())
                    .foreign_key(&mut user_fk(
                        "fk-tasks-user_id",
                        Tasks::Table,
                        Tasks::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-tasks-status-due_at")
                    .table(Tasks::Table)
                    .col(Tasks::Status)
                    .col(Tasks::DueAt)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 10. Push tokens
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(PushTokens::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PushTokens::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PushTokens::UserId).string().not_null())
                    .col(
                        ColumnDef::new(PushTokens::Token)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(PushTokens::Platform).string())
                    .col(
                        ColumnDef::new(PushTokens::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(&mut user_fk(
                        "fk-push_tokens-user_id",
                        PushTokens::Table,
                        PushTokens::UserId,
                    ))
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Reverse order of creation: dependents first.
        manager
            .drop_table(Table::drop().table(PushTokens::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Tasks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Events::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Budgets::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transfers::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Incomes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Entries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Faturas::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Categories::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
