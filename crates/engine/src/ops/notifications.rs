//! Push token registry and due-soon reminders.

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate, NaiveTime, TimeZone, Utc};
use sea_orm::{ActiveValue, ConnectionTrait, QueryFilter, QueryOrder, QuerySelect, prelude::*};
use uuid::Uuid;

use crate::{
    AccountKind, EngineError, MoneyCents, PushError, PushKind, PushPayload, PushSender,
    ResultEngine, TaskStatus, accounts, entries, faturas, push_tokens, tasks,
};

use super::Engine;

/// Unpaid faturas due within this many days trigger a reminder.
const FATURA_REMINDER_DAYS: u64 = 3;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
    /// Tokens deleted because the provider no longer knows them.
    pub pruned: usize,
}

impl DeliveryReport {
    fn merge(&mut self, other: DeliveryReport) {
        self.sent += other.sent;
        self.failed += other.failed;
        self.pruned += other.pruned;
    }
}

fn entry_payload(entry: &entries::Model, today: NaiveDate) -> PushPayload {
    let when = if entry.due_date == today {
        "today"
    } else {
        "tomorrow"
    };
    let title = if entry.description.is_empty() {
        "Bill due".to_string()
    } else {
        entry.description.clone()
    };
    PushPayload {
        title,
        body: format!("{} due {when}", MoneyCents::new(entry.amount)),
        url: "/entries".to_string(),
        tag: format!("entry-{}", entry.id),
        kind: PushKind::EntryDue,
    }
}

fn fatura_payload(fatura: &faturas::Model, card_name: &str) -> PushPayload {
    PushPayload {
        title: format!("Fatura {card_name} {}", fatura.year_month),
        body: format!(
            "{} due on {}",
            MoneyCents::new(fatura.total_amount),
            fatura.due_date.format("%Y-%m-%d")
        ),
        url: "/faturas".to_string(),
        tag: format!("fatura-{}", fatura.id),
        kind: PushKind::FaturaDue,
    }
}

fn task_payload(task: &tasks::Model) -> PushPayload {
    PushPayload {
        title: task.title.clone(),
        body: "Task due today".to_string(),
        url: "/tasks".to_string(),
        tag: format!("task-{}", task.id),
        kind: PushKind::TaskDue,
    }
}

/// Reminders for one user, one payload per item.
async fn due_payloads<C: ConnectionTrait>(
    db: &C,
    user_id: &str,
    today: NaiveDate,
) -> ResultEngine<Vec<PushPayload>> {
    let invalid = || EngineError::InvalidDate(format!("no reminder window after {today}"));
    let tomorrow = today.checked_add_days(Days::new(1)).ok_or_else(invalid)?;
    let fatura_limit = today
        .checked_add_days(Days::new(FATURA_REMINDER_DAYS))
        .ok_or_else(invalid)?;
    let day_start = Utc.from_utc_datetime(&today.and_time(NaiveTime::MIN));
    let day_end = Utc.from_utc_datetime(&tomorrow.and_time(NaiveTime::MIN));

    let mut payloads = Vec::new();

    // Card entries are reminded through their fatura.
    let due_entries = entries::Entity::find()
        .inner_join(accounts::Entity)
        .filter(entries::Column::UserId.eq(user_id))
        .filter(entries::Column::PaidAt.is_null())
        .filter(entries::Column::DueDate.between(today, tomorrow))
        .filter(accounts::Column::Kind.ne(AccountKind::CreditCard.as_str()))
        .order_by_asc(entries::Column::DueDate)
        .all(db)
        .await?;
    payloads.extend(due_entries.iter().map(|entry| entry_payload(entry, today)));

    let due_faturas = faturas::Entity::find()
        .filter(faturas::Column::UserId.eq(user_id))
        .filter(faturas::Column::PaidAt.is_null())
        .filter(faturas::Column::TotalAmount.gt(0))
        .filter(faturas::Column::DueDate.between(today, fatura_limit))
        .order_by_asc(faturas::Column::DueDate)
        .all(db)
        .await?;
    for fatura in &due_faturas {
        let card_name = accounts::Entity::find_by_id(fatura.account_id)
            .one(db)
            .await?
            .map(|card| card.name)
            .unwrap_or_default();
        payloads.push(fatura_payload(fatura, &card_name));
    }

    let due_tasks = tasks::Entity::find()
        .filter(tasks::Column::UserId.eq(user_id))
        .filter(tasks::Column::Status.eq(TaskStatus::Pending.as_str()))
        .filter(tasks::Column::DueAt.gte(day_start))
        .filter(tasks::Column::DueAt.lt(day_end))
        .order_by_asc(tasks::Column::DueAt)
        .all(db)
        .await?;
    payloads.extend(due_tasks.iter().map(task_payload));

    Ok(payloads)
}

impl Engine {
    /// Register a device token for `user_id`. A token already known is moved
    /// to this user.
    pub async fn register_push_token(
        &self,
        user_id: &str,
        token: &str,
        platform: Option<&str>,
    ) -> ResultEngine<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(EngineError::InvalidName(
                "push token must not be empty".to_string(),
            ));
        }
        let platform = platform
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToString::to_string);

        match push_tokens::Entity::find()
            .filter(push_tokens::Column::Token.eq(token))
            .one(&self.database)
            .await?
        {
            Some(existing) => {
                push_tokens::ActiveModel {
                    id: ActiveValue::Set(existing.id),
                    user_id: ActiveValue::Set(user_id.to_string()),
                    platform: ActiveValue::Set(platform),
                    ..Default::default()
                }
                .update(&self.database)
                .await?;
            }
            None => {
                push_tokens::ActiveModel {
                    id: ActiveValue::Set(Uuid::new_v4()),
                    user_id: ActiveValue::Set(user_id.to_string()),
                    token: ActiveValue::Set(token.to_string()),
                    platform: ActiveValue::Set(platform),
                    created_at: ActiveValue::Set(Utc::now()),
                }
                .insert(&self.database)
                .await?;
            }
        }
        Ok(())
    }

    /// Returns `false` when the token was not registered for the user.
    pub async fn remove_push_token(&self, user_id: &str, token: &str) -> ResultEngine<bool> {
        let result = push_tokens::Entity::delete_many()
            .filter(push_tokens::Column::UserId.eq(user_id))
            .filter(push_tokens::Column::Token.eq(token.trim()))
            .exec(&self.database)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Deliver `payload` to every device of the user.
    ///
    /// Tokens the provider rejects as invalid are deleted. Other failures are
    /// counted and the token is kept.
    pub async fn notify_user<S: PushSender>(
        &self,
        user_id: &str,
        payload: &PushPayload,
        sender: &S,
    ) -> ResultEngine<DeliveryReport> {
        let tokens = push_tokens::Entity::find()
            .filter(push_tokens::Column::UserId.eq(user_id))
            .all(&self.database)
            .await?;

        let mut report = DeliveryReport::default();
        for token in tokens {
            match sender.send(&token.token, payload).await {
                Ok(()) => report.sent += 1,
                Err(PushError::InvalidToken) => {
                    push_tokens::Entity::delete_by_id(token.id)
                        .exec(&self.database)
                        .await?;
                    report.pruned += 1;
                }
                Err(err @ PushError::Transient(_)) => {
                    tracing::warn!(user = %user_id, tag = %payload.tag, "{err}");
                    report.failed += 1;
                }
            }
        }
        Ok(report)
    }

    /// Send the reminders of `today` to every user with a registered device:
    /// bills due today or tomorrow, faturas due in the next three days and
    /// pending tasks due today.
    pub async fn send_due_reminders<S: PushSender>(
        &self,
        today: NaiveDate,
        sender: &S,
    ) -> ResultEngine<DeliveryReport> {
        let user_ids: BTreeSet<String> = push_tokens::Entity::find()
            .select_only()
            .column(push_tokens::Column::UserId)
            .distinct()
            .into_tuple::<String>()
            .all(&self.database)
            .await?
            .into_iter()
            .collect();

        let mut report = DeliveryReport::default();
        for user_id in &user_ids {
            let payloads = match due_payloads(&self.database, user_id, today).await {
                Ok(payloads) => payloads,
                Err(err) => {
                    tracing::error!(user = %user_id, "building reminders failed: {err}");
                    continue;
                }
            };
            for payload in &payloads {
                match self.notify_user(user_id, payload, sender).await {
                    Ok(delivery) => report.merge(delivery),
                    Err(err) => {
                        tracing::error!(
                            user = %user_id,
                            tag = %payload.tag,
                            "delivery failed: {err}"
                        );
                        report.failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            users = user_ids.len(),
            sent = report.sent,
            failed = report.failed,
            pruned = report.pruned,
            "reminders sent"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_reminder_says_when() {
        let today = NaiveDate::from_ymd_opt(2026, 2, 1).unwrap();
        let entry = entries::Model {
            id: Uuid::nil(),
            user_id: "ana".to_string(),
            account_id: Uuid::nil(),
            category_id: Uuid::nil(),
            description: "Internet".to_string(),
            amount: 9_990,
            due_date: today,
            paid_at: None,
            ignored: false,
            fatura_id: None,
            created_at: Utc::now(),
        };
        let payload = entry_payload(&entry, today);
        assert_eq!(payload.title, "Internet");
        assert_eq!(payload.body, "99.90 due today");
        assert_eq!(payload.kind, PushKind::EntryDue);

        let tomorrow = entry_payload(
            &entries::Model {
                due_date: today.succ_opt().unwrap(),
                description: String::new(),
                ..entry
            },
            today,
        );
        assert_eq!(tomorrow.title, "Bill due");
        assert!(tomorrow.body.ends_with("due tomorrow"));
    }
}
