//! Balance calculator and reconciler.
//!
//! `accounts.current_balance` is a cache. The ledger (received incomes, paid
//! entries and transfers) is the source of truth and
//! [`sync_account_balance`] is the only code path that writes the cache.

use sea_orm::{
    ActiveValue, ConnectionTrait, QueryFilter, QuerySelect, Select, TransactionTrait,
    prelude::*, sea_query::Expr,
};
use uuid::Uuid;

use crate::{MoneyCents, ResultEngine, accounts, entries, incomes, transfers, users};

use super::{Engine, with_tx};

pub(super) const SUM_AMOUNT: &str = "CAST(COALESCE(SUM(amount), 0) AS BIGINT)";

/// The four ledger sums behind an account balance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BalanceBreakdown {
    pub received_income: MoneyCents,
    pub paid_expenses: MoneyCents,
    pub transfers_in: MoneyCents,
    pub transfers_out: MoneyCents,
}

impl BalanceBreakdown {
    #[must_use]
    pub fn balance(&self) -> MoneyCents {
        self.received_income + self.transfers_in - self.paid_expenses - self.transfers_out
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub users: usize,
    pub accounts_updated: usize,
    pub failed_users: usize,
}

/// `SUM(amount)` of the rows selected by `query`, 0 when there are none.
pub(super) async fn sum_amount<E, C>(db: &C, query: Select<E>) -> ResultEngine<i64>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    let total: Option<i64> = query
        .select_only()
        .column_as(Expr::cust(SUM_AMOUNT), "total")
        .into_tuple()
        .one(db)
        .await?;
    Ok(total.unwrap_or(0))
}

pub(super) async fn compute_balance<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    account_id: Uuid,
) -> ResultEngine<BalanceBreakdown> {
    let received_income = sum_amount(
        db,
        incomes::Entity::find()
            .filter(incomes::Column::UserId.eq(user_id))
            .filter(incomes::Column::AccountId.eq(account_id))
            .filter(incomes::Column::ReceivedAt.is_not_null()),
    )
    .await?;

    let paid_expenses = sum_amount(
        db,
        entries::Entity::find()
            .filter(entries::Column::UserId.eq(user_id))
            .filter(entries::Column::AccountId.eq(account_id))
            .filter(entries::Column::PaidAt.is_not_null()),
    )
    .await?;

    let transfers_in = sum_amount(
        db,
        transfers::Entity::find()
            .filter(transfers::Column::UserId.eq(user_id))
            .filter(transfers::Column::ToAccountId.eq(account_id)),
    )
    .await?;

    let transfers_out = sum_amount(
        db,
        transfers::Entity::find()
            .filter(transfers::Column::UserId.eq(user_id))
            .filter(transfers::Column::FromAccountId.eq(account_id)),
    )
    .await?;

    Ok(BalanceBreakdown {
        received_income: MoneyCents::new(received_income),
        paid_expenses: MoneyCents::new(paid_expenses),
        transfers_in: MoneyCents::new(transfers_in),
        transfers_out: MoneyCents::new(transfers_out),
    })
}

/// Recompute one account and persist the balance when it drifted.
///
/// Returns `true` when the stored value changed.
pub(super) async fn sync_account_balance<C: ConnectionTrait>(
    db: &C,
    account: &accounts::Model,
) -> ResultEngine<bool> {
    let balance = compute_balance(db, &account.user_id, account.id)
        .await?
        .balance()
        .cents();
    if balance == account.current_balance {
        return Ok(false);
    }

    tracing::debug!(
        account = %account.id,
        from = account.current_balance,
        to = balance,
        "account balance updated"
    );
    accounts::ActiveModel {
        id: ActiveValue::Set(account.id),
        current_balance: ActiveValue::Set(balance),
        ..Default::default()
    }
    .update(db)
    .await?;
    Ok(true)
}

/// Re-sync every account id in `account_ids`, skipping duplicates.
pub(super) async fn sync_accounts<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    account_ids: &[Uuid],
) -> ResultEngine<usize> {
    let mut ids = account_ids.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let models = accounts::Entity::find()
        .filter(accounts::Column::UserId.eq(user_id))
        .filter(accounts::Column::Id.is_in(ids))
        .all(db)
        .await?;

    let mut updated = 0;
    for model in &models {
        if sync_account_balance(db, model).await? {
            updated += 1;
        }
    }
    Ok(updated)
}

impl Engine {
    /// Balance of an account computed from the ledger, ignoring the cache.
    pub async fn account_balance(
        &self,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<BalanceBreakdown> {
        self.require_account(&self.database, user_id, account_id)
            .await?;
        compute_balance(&self.database, user_id, account_id).await
    }

    pub async fn reconcile_account(&self, user_id: &str, account_id: Uuid) -> ResultEngine<bool> {
        with_tx!(self, |db_tx| {
            let account = self.require_account(&db_tx, user_id, account_id).await?;
            sync_account_balance(&db_tx, &account).await
        })
    }

    /// Reconcile every account of a user in one transaction.
    ///
    /// Returns the number of accounts whose cached balance changed.
    pub async fn reconcile_user(&self, user_id: &str) -> ResultEngine<usize> {
        with_tx!(self, |db_tx| {
            let models = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(user_id))
                .all(&db_tx)
                .await?;
            let mut updated = 0;
            for model in &models {
                if sync_account_balance(&db_tx, model).await? {
                    updated += 1;
                }
            }
            Ok(updated)
        })
    }

    /// Reconcile all users, one transaction each.
    ///
    /// A user that fails is rolled back, logged and counted; the others
    /// still run.
    pub async fn reconcile_all(&self) -> ResultEngine<ReconcileReport> {
        let users = users::Entity::find().all(&self.database).await?;
        let mut report = ReconcileReport::default();

        for user in users {
            report.users += 1;
            match self.reconcile_user(&user.username).await {
                Ok(updated) => report.accounts_updated += updated,
                Err(err) => {
                    tracing::error!(user = %user.username, "balance reconciliation failed: {err}");
                    report.failed_users += 1;
                }
            }
        }

        tracing::info!(
            users = report.users,
            accounts_updated = report.accounts_updated,
            failed_users = report.failed_users,
            "balances reconciled"
        );
        Ok(report)
    }
}
