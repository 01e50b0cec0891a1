//! Monthly budget lines: one amount per category per month.

use sea_orm::entity::prelude::*;
use uuid::Uuid;

use crate::{EngineError, MoneyCents, YearMonth};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Budget {
    pub id: Uuid,
    pub category_id: Uuid,
    pub year_month: YearMonth,
    pub amount: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "budgets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub category_id: Uuid,
    pub year_month: String,
    pub amount: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Budget {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            category_id: model.category_id,
            year_month: model.year_month.parse()?,
            amount: MoneyCents::new(model.amount),
        })
    }
}
