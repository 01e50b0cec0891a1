//! The module contains the `Account` type: a checking account, a savings
//! account or a credit card.
//!
//! `current_balance` is a cache of the ledger (see `ops::balances`) and is only
//! written by the reconciler.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{EngineError, MoneyCents};

/// Day of the month a credit card statement is due when the card does not say.
pub const DEFAULT_DUE_DAY: u32 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Checking,
    Savings,
    CreditCard,
}

impl AccountKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Checking => "checking",
            Self::Savings => "savings",
            Self::CreditCard => "credit_card",
        }
    }
}

impl TryFrom<&str> for AccountKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "checking" => Ok(Self::Checking),
            "savings" => Ok(Self::Savings),
            "credit_card" => Ok(Self::CreditCard),
            other => Err(EngineError::InvalidName(format!(
                "invalid account kind: {other}"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Account {
    pub id: Uuid,
    pub name: String,
    pub kind: AccountKind,
    pub current_balance: MoneyCents,
    /// Statement due day, credit cards only.
    pub due_day: Option<u32>,
    pub archived: bool,
}

impl Account {
    #[must_use]
    pub fn is_credit_card(&self) -> bool {
        self.kind == AccountKind::CreditCard
    }

    #[must_use]
    pub fn statement_due_day(&self) -> u32 {
        self.due_day.unwrap_or(DEFAULT_DUE_DAY)
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub name_norm: String,
    pub kind: String,
    pub current_balance: i64,
    pub due_day: Option<i32>,
    pub archived: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Account {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            name: model.name,
            kind: AccountKind::try_from(model.kind.as_str())?,
            current_balance: MoneyCents::new(model.current_balance),
            due_day: model.due_day.and_then(|day| u32::try_from(day).ok()),
            archived: model.archived,
        })
    }
}
