//! Expense entries.
//!
//! An entry is pending until `paid_at` is set. The nullable column is exposed
//! as [`PaymentStatus`] so callers never have to interpret `None`.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use uuid::Uuid;

use crate::{EngineError, MoneyCents};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Paid { at: DateTime<Utc> },
}

impl PaymentStatus {
    #[must_use]
    pub fn from_paid_at(paid_at: Option<DateTime<Utc>>) -> Self {
        paid_at.map_or(Self::Pending, |at| Self::Paid { at })
    }

    #[must_use]
    pub fn paid_at(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Pending => None,
            Self::Paid { at } => Some(at),
        }
    }

    #[must_use]
    pub fn is_paid(self) -> bool {
        matches!(self, Self::Paid { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub id: Uuid,
    pub account_id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub amount: MoneyCents,
    pub due_date: NaiveDate,
    pub payment: PaymentStatus,
    /// Ignored entries are left out of budget aggregation.
    pub ignored: bool,
    /// Statement this entry belongs to (credit card entries only).
    pub fatura_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub account_id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub amount: i64,
    pub due_date: Date,
    pub paid_at: Option<DateTimeUtc>,
    pub ignored: bool,
    pub fatura_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::accounts::Entity",
        from = "Column::AccountId",
        to = "super::accounts::Column::Id",
        on_update = "NoAction",
        on_delete = "Cascade"
    )]
    Accounts,
}

impl Related<super::accounts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Accounts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Entry {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            account_id: model.account_id,
            category_id: model.category_id,
            description: model.description,
            amount: MoneyCents::positive(model.amount, "entry amount")?,
            due_date: model.due_date,
            payment: PaymentStatus::from_paid_at(model.paid_at),
            ignored: model.ignored,
            fatura_id: model.fatura_id,
        })
    }
}
