//! Fatura lifecycle: statement sync, payment and backfill.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue, ConnectionTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
    TransactionTrait, prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    AccountKind, EngineError, Fatura, PayFaturaCmd, ResultEngine, YearMonth, accounts, entries,
    faturas, transfers,
};

use super::{
    Engine,
    balances::{sum_amount, sync_accounts},
    is_credit_card, with_tx,
};

/// Bring the fatura of `card` for `year_month` in line with its entries.
///
/// The total is re-summed from the non-ignored entries of the month and
/// every entry of the month is linked to the row. The row is created on the
/// first entry. An unpaid fatura whose month has no entries left is
/// removed. Returns the current row, if any.
pub(super) async fn sync_fatura<C: ConnectionTrait>(
    db: &C,
    card: &accounts::Model,
    year_month: YearMonth,
) -> ResultEngine<Option<faturas::Model>> {
    let month_entries = || {
        entries::Entity::find()
            .filter(entries::Column::UserId.eq(card.user_id.as_str()))
            .filter(entries::Column::AccountId.eq(card.id))
            .filter(entries::Column::DueDate.between(year_month.first_day(), year_month.last_day()))
    };

    let entry_count = month_entries().count(db).await?;
    let total = sum_amount(
        db,
        month_entries().filter(entries::Column::Ignored.eq(false)),
    )
    .await?;

    let existing = faturas::Entity::find()
        .filter(faturas::Column::AccountId.eq(card.id))
        .filter(faturas::Column::YearMonth.eq(year_month.to_string()))
        .one(db)
        .await?;

    let fatura = match existing {
        None if entry_count == 0 => return Ok(None),
        Some(existing) if entry_count == 0 && existing.paid_at.is_none() => {
            faturas::Entity::delete_by_id(existing.id).exec(db).await?;
            tracing::debug!(fatura = %existing.id, "empty fatura removed");
            return Ok(None);
        }
        Some(existing) if existing.total_amount == total => existing,
        Some(existing) => {
            if existing.paid_at.is_some() {
                tracing::warn!(
                    fatura = %existing.id,
                    from = existing.total_amount,
                    to = total,
                    "total of a paid fatura changed"
                );
            }
            faturas::ActiveModel {
                id: ActiveValue::Set(existing.id),
                total_amount: ActiveValue::Set(total),
                ..Default::default()
            }
            .update(db)
            .await?
        }
        None => {
            let due_day = card
                .due_day
                .and_then(|day| u32::try_from(day).ok())
                .unwrap_or(accounts::DEFAULT_DUE_DAY);
            faturas::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                user_id: ActiveValue::Set(card.user_id.clone()),
                account_id: ActiveValue::Set(card.id),
                year_month: ActiveValue::Set(year_month.to_string()),
                total_amount: ActiveValue::Set(total),
                due_date: ActiveValue::Set(year_month.day_clamped(due_day)),
                paid_at: ActiveValue::Set(None),
                paid_from_account_id: ActiveValue::Set(None),
            }
            .insert(db)
            .await?
        }
    };

    entries::Entity::update_many()
        .col_expr(entries::Column::FaturaId, Expr::value(fatura.id))
        .filter(entries::Column::UserId.eq(card.user_id.as_str()))
        .filter(entries::Column::AccountId.eq(card.id))
        .filter(entries::Column::DueDate.between(year_month.first_day(), year_month.last_day()))
        .exec(db)
        .await?;

    Ok(Some(fatura))
}

/// Paying account must be a different, non credit card account of the user.
fn check_payment_source(card: &accounts::Model, from: &accounts::Model) -> ResultEngine<()> {
    if from.id == card.id {
        return Err(EngineError::InvalidState(
            "a fatura cannot be paid from its own card".to_string(),
        ));
    }
    if is_credit_card(from) {
        return Err(EngineError::InvalidState(format!(
            "a fatura cannot be paid from the credit card '{}'",
            from.name
        )));
    }
    Ok(())
}

impl Engine {
    async fn require_fatura<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        fatura_id: Uuid,
    ) -> ResultEngine<faturas::Model> {
        faturas::Entity::find_by_id(fatura_id)
            .filter(faturas::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("fatura not exists".to_string()))
    }

    /// Re-sync the fatura of a card for a month, e.g. after a manual edit of
    /// the database.
    pub async fn sync_fatura(
        &self,
        user_id: &str,
        account_id: Uuid,
        year_month: YearMonth,
    ) -> ResultEngine<Option<Fatura>> {
        with_tx!(self, |db_tx| {
            let card = self.require_account(&db_tx, user_id, account_id).await?;
            if !is_credit_card(&card) {
                return Err(EngineError::InvalidState(format!(
                    "account '{}' is not a credit card",
                    card.name
                )));
            }
            sync_fatura(&db_tx, &card, year_month)
                .await?
                .map(Fatura::try_from)
                .transpose()
        })
    }

    /// Faturas of a user, newest month first.
    pub async fn list_faturas(
        &self,
        user_id: &str,
        account_id: Option<Uuid>,
    ) -> ResultEngine<Vec<Fatura>> {
        let mut query = faturas::Entity::find().filter(faturas::Column::UserId.eq(user_id));
        if let Some(account_id) = account_id {
            query = query.filter(faturas::Column::AccountId.eq(account_id));
        }
        query
            .order_by_desc(faturas::Column::YearMonth)
            .order_by_asc(faturas::Column::AccountId)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Fatura::try_from)
            .collect()
    }

    pub async fn fatura(&self, user_id: &str, fatura_id: Uuid) -> ResultEngine<Fatura> {
        let model = self
            .require_fatura(&self.database, user_id, fatura_id)
            .await?;
        Fatura::try_from(model)
    }

    /// Pay a fatura.
    ///
    /// Every unpaid, non ignored entry of the statement is marked paid at
    /// `paid_at`. With `create_transfer` the payment also moves
    /// `total_amount` from the paying account to the card, so the card
    /// balance returns to zero.
    pub async fn pay_fatura(&self, cmd: PayFaturaCmd) -> ResultEngine<Fatura> {
        let user_id = cmd.user_id.as_str();
        with_tx!(self, |db_tx| {
            let fatura = self.require_fatura(&db_tx, user_id, cmd.fatura_id).await?;
            if fatura.paid_at.is_some() {
                return Err(EngineError::InvalidState(format!(
                    "fatura {} is already paid",
                    fatura.year_month
                )));
            }
            let card = self
                .require_account(&db_tx, user_id, fatura.account_id)
                .await?;
            let from = self
                .require_active_account(&db_tx, user_id, cmd.from_account_id)
                .await?;
            check_payment_source(&card, &from)?;

            let marked = entries::Entity::update_many()
                .col_expr(entries::Column::PaidAt, Expr::value(cmd.paid_at))
                .filter(entries::Column::FaturaId.eq(fatura.id))
                .filter(entries::Column::Ignored.eq(false))
                .filter(entries::Column::PaidAt.is_null())
                .exec(&db_tx)
                .await?
                .rows_affected;

            if cmd.create_transfer && fatura.total_amount > 0 {
                transfers::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    user_id: ActiveValue::Set(user_id.to_string()),
                    from_account_id: ActiveValue::Set(from.id),
                    to_account_id: ActiveValue::Set(card.id),
                    amount: ActiveValue::Set(fatura.total_amount),
                    occurred_at: ActiveValue::Set(cmd.paid_at),
                    description: ActiveValue::Set(Some(format!(
                        "Fatura {} {}",
                        card.name, fatura.year_month
                    ))),
                    fatura_id: ActiveValue::Set(Some(fatura.id)),
                }
                .insert(&db_tx)
                .await?;
            }

            let paid = faturas::ActiveModel {
                id: ActiveValue::Set(fatura.id),
                paid_at: ActiveValue::Set(Some(cmd.paid_at)),
                paid_from_account_id: ActiveValue::Set(Some(from.id)),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            sync_accounts(&db_tx, user_id, &[card.id, from.id]).await?;
            tracing::info!(
                fatura = %paid.id,
                entries = marked,
                transfer = cmd.create_transfer,
                "fatura paid"
            );
            Fatura::try_from(paid)
        })
    }

    /// Revert a payment: entries paid by it become pending again and the
    /// linked transfer is removed.
    pub async fn unpay_fatura(&self, user_id: &str, fatura_id: Uuid) -> ResultEngine<Fatura> {
        with_tx!(self, |db_tx| {
            let fatura = self.require_fatura(&db_tx, user_id, fatura_id).await?;
            let Some(paid_at) = fatura.paid_at else {
                return Err(EngineError::InvalidState(format!(
                    "fatura {} is not paid",
                    fatura.year_month
                )));
            };

            entries::Entity::update_many()
                .col_expr(
                    entries::Column::PaidAt,
                    Expr::value(Option::<DateTime<Utc>>::None),
                )
                .filter(entries::Column::FaturaId.eq(fatura.id))
                .filter(entries::Column::PaidAt.eq(paid_at))
                .exec(&db_tx)
                .await?;

            transfers::Entity::delete_many()
                .filter(transfers::Column::FaturaId.eq(fatura.id))
                .exec(&db_tx)
                .await?;

            let unpaid = faturas::ActiveModel {
                id: ActiveValue::Set(fatura.id),
                paid_at: ActiveValue::Set(None),
                paid_from_account_id: ActiveValue::Set(None),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;

            let mut touched = vec![fatura.account_id];
            touched.extend(fatura.paid_from_account_id);
            sync_accounts(&db_tx, user_id, &touched).await?;
            Fatura::try_from(unpaid)
        })
    }

    /// Create the missing faturas for historical credit card entries.
    ///
    /// Months that already have a row but contain unlinked entries are
    /// re-synced without being counted. Running it twice creates nothing the
    /// second time.
    pub async fn backfill_faturas(&self, user_id: Option<&str>) -> ResultEngine<usize> {
        with_tx!(self, |db_tx| {
            let mut query = entries::Entity::find()
                .select_only()
                .column(entries::Column::AccountId)
                .column(entries::Column::DueDate)
                .inner_join(accounts::Entity)
                .filter(accounts::Column::Kind.eq(AccountKind::CreditCard.as_str()))
                .filter(entries::Column::FaturaId.is_null());
            if let Some(user_id) = user_id {
                query = query.filter(entries::Column::UserId.eq(user_id));
            }
            let rows: Vec<(Uuid, chrono::NaiveDate)> = query.into_tuple().all(&db_tx).await?;

            let months: BTreeSet<(Uuid, YearMonth)> = rows
                .into_iter()
                .map(|(account_id, due_date)| {
                    YearMonth::of(due_date).map(|year_month| (account_id, year_month))
                })
                .collect::<ResultEngine<_>>()?;

            let mut cards: HashMap<Uuid, accounts::Model> = HashMap::new();
            let mut created = 0;
            for (account_id, year_month) in months {
                if !cards.contains_key(&account_id) {
                    let Some(card) = accounts::Entity::find_by_id(account_id).one(&db_tx).await?
                    else {
                        continue;
                    };
                    cards.insert(account_id, card);
                }
                let Some(card) = cards.get(&account_id) else {
                    continue;
                };

                let existed = faturas::Entity::find()
                    .filter(faturas::Column::AccountId.eq(account_id))
                    .filter(faturas::Column::YearMonth.eq(year_month.to_string()))
                    .one(&db_tx)
                    .await?
                    .is_some();
                sync_fatura(&db_tx, card, year_month).await?;
                if !existed {
                    created += 1;
                }
            }

            tracing::info!(created, "faturas backfilled");
            Ok(created)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(kind: AccountKind) -> accounts::Model {
        accounts::Model {
            id: Uuid::new_v4(),
            user_id: "ana".to_string(),
            name: kind.as_str().to_string(),
            name_norm: kind.as_str().to_string(),
            kind: kind.as_str().to_string(),
            current_balance: 0,
            due_day: None,
            archived: false,
        }
    }

    #[test]
    fn payment_source_must_be_another_non_card_account() {
        let card = account(AccountKind::CreditCard);
        let other_card = account(AccountKind::CreditCard);
        let checking = account(AccountKind::Checking);

        assert!(check_payment_source(&card, &checking).is_ok());
        assert!(matches!(
            check_payment_source(&card, &card),
            Err(EngineError::InvalidState(_))
        ));
        assert!(matches!(
            check_payment_source(&card, &other_card),
            Err(EngineError::InvalidState(_))
        ));
    }
}
