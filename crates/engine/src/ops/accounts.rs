use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Account, AccountCmd, AccountKind, EngineError, ResultEngine, accounts,
    util::{normalize_name_key, normalize_required_name},
};

use super::{Engine, with_tx};

fn validate_due_day(kind: AccountKind, due_day: Option<u32>) -> ResultEngine<Option<i32>> {
    match (kind, due_day) {
        (AccountKind::CreditCard, Some(day)) if (1..=31).contains(&day) => Ok(Some(day as i32)),
        (AccountKind::CreditCard, Some(day)) => Err(EngineError::InvalidDate(format!(
            "due day must be between 1 and 31, got {day}"
        ))),
        (AccountKind::CreditCard, None) => Ok(None),
        (_, Some(_)) => Err(EngineError::InvalidState(
            "only credit cards have a statement due day".to_string(),
        )),
        (_, None) => Ok(None),
    }
}

impl Engine {
    /// Create an account with a zero balance.
    ///
    /// Names are unique per user, ignoring case and accents.
    pub async fn new_account(&self, cmd: AccountCmd) -> ResultEngine<Account> {
        let name = normalize_required_name(&cmd.name, "account")?;
        let name_norm = normalize_name_key(&name);
        let due_day = validate_due_day(cmd.kind, cmd.due_day)?;

        with_tx!(self, |db_tx| {
            let exists = accounts::Entity::find()
                .filter(accounts::Column::UserId.eq(cmd.user_id.as_str()))
                .filter(accounts::Column::NameNorm.eq(name_norm.as_str()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name));
            }

            let model = accounts::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                user_id: ActiveValue::Set(cmd.user_id.clone()),
                name: ActiveValue::Set(name.clone()),
                name_norm: ActiveValue::Set(name_norm.clone()),
                kind: ActiveValue::Set(cmd.kind.as_str().to_string()),
                current_balance: ActiveValue::Set(0),
                due_day: ActiveValue::Set(due_day),
                archived: ActiveValue::Set(false),
            }
            .insert(&db_tx)
            .await?;

            Account::try_from(model)
        })
    }

    pub async fn account(&self, user_id: &str, account_id: Uuid) -> ResultEngine<Account> {
        let model = self
            .require_account(&self.database, user_id, account_id)
            .await?;
        Account::try_from(model)
    }

    /// Accounts of `user_id` ordered by name. Archived accounts are skipped
    /// unless `include_archived` is set.
    pub async fn list_accounts(
        &self,
        user_id: &str,
        include_archived: bool,
    ) -> ResultEngine<Vec<Account>> {
        let mut query = accounts::Entity::find().filter(accounts::Column::UserId.eq(user_id));
        if !include_archived {
            query = query.filter(accounts::Column::Archived.eq(false));
        }
        query
            .order_by_asc(accounts::Column::NameNorm)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Account::try_from)
            .collect()
    }

    /// Change the statement due day of a credit card.
    ///
    /// Existing faturas keep the due date they were created with.
    pub async fn set_account_due_day(
        &self,
        user_id: &str,
        account_id: Uuid,
        due_day: u32,
    ) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, user_id, account_id).await?;
            let kind = AccountKind::try_from(model.kind.as_str())?;
            let due_day = validate_due_day(kind, Some(due_day))?;

            let model = accounts::ActiveModel {
                id: ActiveValue::Set(model.id),
                due_day: ActiveValue::Set(due_day),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            Account::try_from(model)
        })
    }

    /// Archived accounts keep their history but accept no new movements.
    pub async fn set_account_archived(
        &self,
        user_id: &str,
        account_id: Uuid,
        archived: bool,
    ) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, user_id, account_id).await?;
            let model = accounts::ActiveModel {
                id: ActiveValue::Set(model.id),
                archived: ActiveValue::Set(archived),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            Account::try_from(model)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn due_day_only_for_credit_cards() {
        assert_eq!(
            validate_due_day(AccountKind::CreditCard, Some(31)).unwrap(),
            Some(31)
        );
        assert_eq!(validate_due_day(AccountKind::CreditCard, None).unwrap(), None);
        assert!(validate_due_day(AccountKind::CreditCard, Some(0)).is_err());
        assert!(validate_due_day(AccountKind::CreditCard, Some(32)).is_err());
        assert!(validate_due_day(AccountKind::Checking, Some(10)).is_err());
        assert_eq!(validate_due_day(AccountKind::Savings, None).unwrap(), None);
    }
}
