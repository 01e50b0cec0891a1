use sea_orm::{ConnectionTrait, DatabaseConnection, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{
    AccountKind, CategoryKind, EngineError, ResultEngine, accounts as account_rows,
    categories as category_rows,
};

mod accounts;
mod balances;
mod budgets;
mod calendar;
mod categories;
mod cron;
mod faturas;
mod ledger;
mod notifications;
mod status;

pub use balances::{BalanceBreakdown, ReconcileReport};
pub use budgets::{BudgetLine, BudgetSummary, UnbudgetedLine};
pub use calendar::{CalendarItem, CalendarOccurrence, MAX_CALENDAR_DAYS};
pub use cron::{CronJob, CronReport, JobOutcome, JobResult};
pub use ledger::EntryUpdate;
pub use notifications::DeliveryReport;
pub use status::StatusUpdateReport;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Load an account owned by `user_id`.
    ///
    /// Accounts of other users are reported as missing.
    pub(super) async fn require_account<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<account_rows::Model> {
        account_rows::Entity::find_by_id(account_id)
            .filter(account_rows::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))
    }

    /// Like [`Engine::require_account`], rejecting archived accounts.
    pub(super) async fn require_active_account<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        account_id: Uuid,
    ) -> ResultEngine<account_rows::Model> {
        let account = self.require_account(db, user_id, account_id).await?;
        if account.archived {
            return Err(EngineError::InvalidState(format!(
                "account '{}' is archived",
                account.name
            )));
        }
        Ok(account)
    }

    pub(super) async fn require_category<C: ConnectionTrait>(
        &self,
        db: &C,
        user_id: &str,
        category_id: Uuid,
        kind: CategoryKind,
    ) -> ResultEngine<category_rows::Model> {
        let category = category_rows::Entity::find_by_id(category_id)
            .filter(category_rows::Column::UserId.eq(user_id))
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("category not exists".to_string()))?;
        if category.kind != kind.as_str() {
            return Err(EngineError::InvalidState(format!(
                "category '{}' is not an {} category",
                category.name,
                kind.as_str()
            )));
        }
        Ok(category)
    }
}

fn is_credit_card(account: &account_rows::Model) -> bool {
    account.kind == AccountKind::CreditCard.as_str()
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
