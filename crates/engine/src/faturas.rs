//! Credit card statements ("faturas").
//!
//! One row per card per month, keyed on `(account_id, year_month)`. The total
//! is a snapshot re-summed from the card's entries whenever they change.

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::entity::prelude::*;
use uuid::Uuid;

use crate::{EngineError, MoneyCents, YearMonth};

/// Lifecycle of a statement: `Pending` → `Overdue` → `Paid` (terminal).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaturaStatus {
    Pending,
    Overdue,
    Paid {
        at: DateTime<Utc>,
        from_account_id: Option<Uuid>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaturaPayment {
    pub at: DateTime<Utc>,
    pub from_account_id: Option<Uuid>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fatura {
    pub id: Uuid,
    pub account_id: Uuid,
    pub year_month: YearMonth,
    pub total_amount: MoneyCents,
    pub due_date: NaiveDate,
    pub payment: Option<FaturaPayment>,
}

impl Fatura {
    /// Status as seen on `today`.
    #[must_use]
    pub fn status(&self, today: NaiveDate) -> FaturaStatus {
        match self.payment {
            Some(payment) => FaturaStatus::Paid {
                at: payment.at,
                from_account_id: payment.from_account_id,
            },
            None if self.due_date < today => FaturaStatus::Overdue,
            None => FaturaStatus::Pending,
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "faturas")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: String,
    pub account_id: Uuid,
    pub year_month: String,
    pub total_amount: i64,
    pub due_date: Date,
    pub paid_at: Option<DateTimeUtc>,
    pub paid_from_account_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for Fatura {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            account_id: model.account_id,
            year_month: model.year_month.parse()?,
            total_amount: MoneyCents::new(model.total_amount),
            due_date: model.due_date,
            payment: model.paid_at.map(|at| FaturaPayment {
                at,
                from_account_id: model.paid_from_account_id,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn fatura(payment: Option<FaturaPayment>) -> Fatura {
        Fatura {
            id: Uuid::new_v4(),
            account_id: Uuid::new_v4(),
            year_month: YearMonth::new(2026, 1).unwrap(),
            total_amount: MoneyCents::new(12_000),
            due_date: NaiveDate::from_ymd_opt(2026, 1, 10).unwrap(),
            payment,
        }
    }

    #[test]
    fn status_follows_due_date_until_paid() {
        let day = |d| NaiveDate::from_ymd_opt(2026, 1, d).unwrap();
        let unpaid = fatura(None);
        assert_eq!(unpaid.status(day(9)), FaturaStatus::Pending);
        assert_eq!(unpaid.status(day(10)), FaturaStatus::Pending);
        assert_eq!(unpaid.status(day(11)), FaturaStatus::Overdue);

        let at = Utc.with_ymd_and_hms(2026, 1, 20, 8, 0, 0).unwrap();
        let paid = fatura(Some(FaturaPayment {
            at,
            from_account_id: None,
        }));
        assert_eq!(
            paid.status(day(25)),
            FaturaStatus::Paid {
                at,
                from_account_id: None
            }
        );
    }
}
