//! Command structs for engine write operations.
//!
//! These types group parameters for entries, incomes, transfers, fatura
//! payments and calendar items, keeping call sites readable and avoiding long
//! argument lists.

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::{AccountKind, CategoryKind};

#[derive(Clone, Debug)]
pub struct AccountCmd {
    pub user_id: String,
    pub name: String,
    pub kind: AccountKind,
    /// Statement due day (1..=31), credit cards only.
    pub due_day: Option<u32>,
}

#[derive(Clone, Debug)]
pub struct CategoryCmd {
    pub user_id: String,
    pub name: String,
    pub kind: CategoryKind,
    pub color: Option<String>,
    pub icon: Option<String>,
}

/// Create an expense entry.
#[derive(Clone, Debug)]
pub struct EntryCmd {
    pub user_id: String,
    pub account_id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub amount_minor: i64,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    pub ignored: bool,
}

impl EntryCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        account_id: Uuid,
        category_id: Uuid,
        amount_minor: i64,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            account_id,
            category_id,
            description: String::new(),
            amount_minor,
            due_date,
            paid_at: None,
            ignored: false,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn paid_at(mut self, paid_at: DateTime<Utc>) -> Self {
        self.paid_at = Some(paid_at);
        self
    }

    #[must_use]
    pub fn ignored(mut self, ignored: bool) -> Self {
        self.ignored = ignored;
        self
    }
}

/// Create an income.
#[derive(Clone, Debug)]
pub struct IncomeCmd {
    pub user_id: String,
    pub account_id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub amount_minor: i64,
    pub expected_date: NaiveDate,
    pub received_at: Option<DateTime<Utc>>,
}

impl IncomeCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        account_id: Uuid,
        category_id: Uuid,
        amount_minor: i64,
        expected_date: NaiveDate,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            account_id,
            category_id,
            description: String::new(),
            amount_minor,
            expected_date,
            received_at: None,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    #[must_use]
    pub fn received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.received_at = Some(received_at);
        self
    }
}

/// Move money between two accounts.
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub user_id: String,
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount_minor: i64,
    pub occurred_at: DateTime<Utc>,
    pub description: Option<String>,
}

/// Pay a fatura from a non credit card account.
#[derive(Clone, Debug)]
pub struct PayFaturaCmd {
    pub user_id: String,
    pub fatura_id: Uuid,
    pub from_account_id: Uuid,
    pub paid_at: DateTime<Utc>,
    /// Also record a transfer `from_account_id → card` for the fatura total.
    pub create_transfer: bool,
}

#[derive(Clone, Debug)]
pub struct EventCmd {
    pub user_id: String,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub recurrence_rule: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TaskCmd {
    pub user_id: String,
    pub title: String,
    pub start_at: Option<DateTime<Utc>>,
    pub due_at: Option<DateTime<Utc>>,
    pub recurrence_rule: Option<String>,
}
