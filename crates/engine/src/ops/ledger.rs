//! Ledger writes: entries, incomes and transfers.
//!
//! Every mutation re-syncs the balances it touches (and the fatura of a
//! credit card entry) inside the same transaction.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, TransactionTrait, prelude::*,
};
use uuid::Uuid;

use crate::{
    CategoryKind, EngineError, Entry, EntryCmd, Income, IncomeCmd, MoneyCents, ResultEngine,
    Transfer, TransferCmd, YearMonth, accounts, entries, incomes, transfers,
    util::normalize_optional_text,
};

use super::{
    Engine,
    balances::{sync_account_balance, sync_accounts},
    faturas::sync_fatura,
    is_credit_card, with_tx,
};

/// Partial update of an entry. `None` leaves the field unchanged.
#[derive(Clone, Debug, Default)]
pub struct EntryUpdate {
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub amount_minor: Option<i64>,
    pub due_date: Option<NaiveDate>,
    pub ignored: Option<bool>,
}

/// Re-sync what depends on the entries of `account`: its faturas for the
/// given months, when it is a card, and its balance.
async fn after_entries_changed<C: ConnectionTrait>(
    db: &C,
    account: &accounts::Model,
    months: &[YearMonth],
) -> ResultEngine<()> {
    if is_credit_card(account) {
        for year_month in months {
            sync_fatura(db, account, *year_month).await?;
        }
    }
    sync_account_balance(db, account).await?;
    Ok(())
}

impl Engine {
    async fn require_entry<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        entry_id: Uuid,
    ) -> ResultEngine<entries::Model> {
        entries::Entity::find_by_id(entry_id)
            .filter(entries::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("entry not exists".to_string()))
    }

    async fn require_income<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        income_id: Uuid,
    ) -> ResultEngine<incomes::Model> {
        incomes::Entity::find_by_id(income_id)
            .filter(incomes::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("income not exists".to_string()))
    }

    /// Record an expense. On a credit card the entry joins the fatura of its
    /// due month.
    pub async fn new_entry(&self, cmd: EntryCmd) -> ResultEngine<Entry> {
        let amount = MoneyCents::positive(cmd.amount_minor, "entry amount")?;
        let month = YearMonth::of(cmd.due_date)?;
        let user_id = cmd.user_id.as_str();
        with_tx!(self, |db_tx| {
            let account = self
                .require_active_account(&db_tx, user_id, cmd.account_id)
                .await?;
            self.require_category(&db_tx, user_id, cmd.category_id, CategoryKind::Expense)
                .await?;

            let id = Uuid::new_v4();
            entries::ActiveModel {
                id: ActiveValue::Set(id),
                user_id: ActiveValue::Set(user_id.to_string()),
                account_id: ActiveValue::Set(account.id),
                category_id: ActiveValue::Set(cmd.category_id),
                description: ActiveValue::Set(cmd.description.trim().to_string()),
                amount: ActiveValue::Set(amount.cents()),
                due_date: ActiveValue::Set(cmd.due_date),
                paid_at: ActiveValue::Set(cmd.paid_at),
                ignored: ActiveValue::Set(cmd.ignored),
                fatura_id: ActiveValue::Set(None),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            after_entries_changed(&db_tx, &account, &[month]).await?;

            let model = self.require_entry(&db_tx, user_id, id).await?;
            Entry::try_from(model)
        })
    }

    pub async fn entry(&self, user_id: &str, entry_id: Uuid) -> ResultEngine<Entry> {
        let model = self.require_entry(&self.database, user_id, entry_id).await?;
        Entry::try_from(model)
    }

    /// Entries due in `year_month`, oldest first.
    pub async fn list_entries(
        &self,
        user_id: &str,
        year_month: YearMonth,
        account_id: Option<Uuid>,
    ) -> ResultEngine<Vec<Entry>> {
        let mut query = entries::Entity::find()
            .filter(entries::Column::UserId.eq(user_id))
            .filter(entries::Column::DueDate.between(year_month.first_day(), year_month.last_day()));
        if let Some(account_id) = account_id {
            query = query.filter(entries::Column::AccountId.eq(account_id));
        }
        query
            .order_by_asc(entries::Column::DueDate)
            .order_by_asc(entries::Column::CreatedAt)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Entry::try_from)
            .collect()
    }

    /// Edit an entry. Moving a credit card entry to another month re-syncs
    /// both faturas.
    pub async fn update_entry(
        &self,
        user_id: &str,
        entry_id: Uuid,
        update: EntryUpdate,
    ) -> ResultEngine<Entry> {
        let amount = update
            .amount_minor
            .map(|cents| MoneyCents::positive(cents, "entry amount"))
            .transpose()?;
        let moved_to = update.due_date.map(YearMonth::of).transpose()?;
        with_tx!(self, |db_tx| {
            let model = self.require_entry(&db_tx, user_id, entry_id).await?;
            let account = self
                .require_account(&db_tx, user_id, model.account_id)
                .await?;
            if let Some(category_id) = update.category_id {
                self.require_category(&db_tx, user_id, category_id, CategoryKind::Expense)
                    .await?;
            }

            let old_month = YearMonth::of(model.due_date)?;
            let mut active = entries::ActiveModel {
                id: ActiveValue::Set(model.id),
                ..Default::default()
            };
            if let Some(category_id) = update.category_id {
                active.category_id = ActiveValue::Set(category_id);
            }
            if let Some(description) = update.description.as_deref() {
                active.description = ActiveValue::Set(description.trim().to_string());
            }
            if let Some(amount) = amount {
                active.amount = ActiveValue::Set(amount.cents());
            }
            if let Some(due_date) = update.due_date {
                active.due_date = ActiveValue::Set(due_date);
                if moved_to != Some(old_month) {
                    active.fatura_id = ActiveValue::Set(None);
                }
            }
            if let Some(ignored) = update.ignored {
                active.ignored = ActiveValue::Set(ignored);
            }
            let updated = active.update(&db_tx).await?;

            let new_month = moved_to.unwrap_or(old_month);
            let months = if new_month == old_month {
                vec![old_month]
            } else {
                vec![old_month, new_month]
            };
            after_entries_changed(&db_tx, &account, &months).await?;

            let model = self.require_entry(&db_tx, user_id, entry_id).await?;
            Entry::try_from(model)
        })
    }

    pub async fn pay_entry(
        &self,
        user_id: &str,
        entry_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> ResultEngine<Entry> {
        self.set_entry_paid_at(user_id, entry_id, Some(paid_at))
            .await
    }

    pub async fn unpay_entry(&self, user_id: &str, entry_id: Uuid) -> ResultEngine<Entry> {
        self.set_entry_paid_at(user_id, entry_id, None).await
    }

    async fn set_entry_paid_at(
        &self,
        user_id: &str,
        entry_id: Uuid,
        paid_at: Option<DateTime<Utc>>,
    ) -> ResultEngine<Entry> {
        with_tx!(self, |db_tx| {
            let model = self.require_entry(&db_tx, user_id, entry_id).await?;
            match (model.paid_at, paid_at) {
                (Some(_), Some(_)) => {
                    return Err(EngineError::InvalidState("entry is already paid".to_string()));
                }
                (None, None) => {
                    return Err(EngineError::InvalidState("entry is not paid".to_string()));
                }
                _ => {}
            }
            let account = self
                .require_account(&db_tx, user_id, model.account_id)
                .await?;

            let updated = entries::ActiveModel {
                id: ActiveValue::Set(model.id),
                paid_at: ActiveValue::Set(paid_at),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            sync_account_balance(&db_tx, &account).await?;
            Entry::try_from(updated)
        })
    }

    pub async fn delete_entry(&self, user_id: &str, entry_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_entry(&db_tx, user_id, entry_id).await?;
            let account = self
                .require_account(&db_tx, user_id, model.account_id)
                .await?;
            entries::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            let month = YearMonth::of(model.due_date)?;
            after_entries_changed(&db_tx, &account, &[month]).await
        })
    }

    /// Record an expected income. It only counts toward the balance once
    /// received.
    pub async fn new_income(&self, cmd: IncomeCmd) -> ResultEngine<Income> {
        let amount = MoneyCents::positive(cmd.amount_minor, "income amount")?;
        let user_id = cmd.user_id.as_str();
        with_tx!(self, |db_tx| {
            let account = self
                .require_active_account(&db_tx, user_id, cmd.account_id)
                .await?;
            if is_credit_card(&account) {
                return Err(EngineError::InvalidState(format!(
                    "income cannot be received on the credit card '{}'",
                    account.name
                )));
            }
            self.require_category(&db_tx, user_id, cmd.category_id, CategoryKind::Income)
                .await?;

            let model = incomes::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                user_id: ActiveValue::Set(user_id.to_string()),
                account_id: ActiveValue::Set(account.id),
                category_id: ActiveValue::Set(cmd.category_id),
                description: ActiveValue::Set(cmd.description.trim().to_string()),
                amount: ActiveValue::Set(amount.cents()),
                expected_date: ActiveValue::Set(cmd.expected_date),
                received_at: ActiveValue::Set(cmd.received_at),
                created_at: ActiveValue::Set(Utc::now()),
            }
            .insert(&db_tx)
            .await?;

            sync_account_balance(&db_tx, &account).await?;
            Income::try_from(model)
        })
    }

    pub async fn receive_income(
        &self,
        user_id: &str,
        income_id: Uuid,
        received_at: DateTime<Utc>,
    ) -> ResultEngine<Income> {
        with_tx!(self, |db_tx| {
            let model = self.require_income(&db_tx, user_id, income_id).await?;
            if model.received_at.is_some() {
                return Err(EngineError::InvalidState(
                    "income is already received".to_string(),
                ));
            }
            let account = self
                .require_account(&db_tx, user_id, model.account_id)
                .await?;

            let updated = incomes::ActiveModel {
                id: ActiveValue::Set(model.id),
                received_at: ActiveValue::Set(Some(received_at)),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            sync_account_balance(&db_tx, &account).await?;
            Income::try_from(updated)
        })
    }

    /// Incomes expected in `year_month`, oldest first.
    pub async fn list_incomes(
        &self,
        user_id: &str,
        year_month: YearMonth,
    ) -> ResultEngine<Vec<Income>> {
        incomes::Entity::find()
            .filter(incomes::Column::UserId.eq(user_id))
            .filter(
                incomes::Column::ExpectedDate.between(year_month.first_day(), year_month.last_day()),
            )
            .order_by_asc(incomes::Column::ExpectedDate)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Income::try_from)
            .collect()
    }

    pub async fn delete_income(&self, user_id: &str, income_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_income(&db_tx, user_id, income_id).await?;
            let account = self
                .require_account(&db_tx, user_id, model.account_id)
                .await?;
            incomes::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            sync_account_balance(&db_tx, &account).await?;
            Ok(())
        })
    }

    pub async fn new_transfer(&self, cmd: TransferCmd) -> ResultEngine<Transfer> {
        let amount = MoneyCents::positive(cmd.amount_minor, "transfer amount")?;
        if cmd.from_account_id == cmd.to_account_id {
            return Err(EngineError::InvalidState(
                "transfer accounts must be distinct".to_string(),
            ));
        }
        let user_id = cmd.user_id.as_str();
        with_tx!(self, |db_tx| {
            let from = self
                .require_active_account(&db_tx, user_id, cmd.from_account_id)
                .await?;
            let to = self
                .require_active_account(&db_tx, user_id, cmd.to_account_id)
                .await?;

            let model = transfers::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                user_id: ActiveValue::Set(user_id.to_string()),
                from_account_id: ActiveValue::Set(from.id),
                to_account_id: ActiveValue::Set(to.id),
                amount: ActiveValue::Set(amount.cents()),
                occurred_at: ActiveValue::Set(cmd.occurred_at),
                description: ActiveValue::Set(normalize_optional_text(cmd.description.as_deref())),
                fatura_id: ActiveValue::Set(None),
            }
            .insert(&db_tx)
            .await?;

            sync_account_balance(&db_tx, &from).await?;
            sync_account_balance(&db_tx, &to).await?;
            Transfer::try_from(model)
        })
    }

    /// Delete a transfer. A transfer created by a fatura payment can only go
    /// away with [`Engine::unpay_fatura`].
    pub async fn delete_transfer(&self, user_id: &str, transfer_id: Uuid) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = transfers::Entity::find_by_id(transfer_id)
                .filter(transfers::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("transfer not exists".to_string()))?;
            if model.fatura_id.is_some() {
                return Err(EngineError::InvalidState(
                    "transfer belongs to a fatura payment; unpay the fatura instead".to_string(),
                ));
            }
            transfers::Entity::delete_by_id(model.id).exec(&db_tx).await?;
            sync_accounts(&db_tx, user_id, &[model.from_account_id, model.to_account_id]).await?;
            Ok(())
        })
    }
}
