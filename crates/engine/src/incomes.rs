//! Income rows. Pending until `received_at` is set.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use uuid::Uuid;

use crate::{EngineError, MoneyCents};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiptStatus {
    Pending,
    Received { at: DateTime<Utc> },
}

impl ReceiptStatus {
    #[must_use]
    pub fn from_received_at(received_at: Option<DateTime<Utc>>) -> Self {
        received_at.map_or(Self::Pending, |at| Self::Received { at })
    }

    #[must_use]
    pub fn received_at(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Pending => None,
            Self::Received { at } => Some(at),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Income {
    pub id: Uuid,
    pub account_id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub amount: MoneyCents,
    pub expected_date: NaiveDate,
    pub receipt: ReceiptStatus,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "incomes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub account_id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    pub amount: i64,
    pub expected_date: Date,
    pub received_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Income {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            account_id: model.account_id,
            category_id: model.category_id,
            description: model.description,
            amount: MoneyCents::positive(model.amount, "income amount")?,
            expected_date: model.expected_date,
            receipt: ReceiptStatus::from_received_at(model.received_at),
        })
    }
}
