//! Calendar events and tasks, and their projection into a date window.

use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Event, EventCmd, EventStatus, ResultEngine, Task, TaskCmd, TaskStatus, events,
    recurrence::{
        DateWindow, Occurrence, OccurrenceTiming, RecurrenceBase, RecurrenceRule, expand,
    },
    tasks,
    util::normalize_required_name,
};

use super::{Engine, with_tx};

/// Longest window, in days, a calendar projection accepts.
pub const MAX_CALENDAR_DAYS: i64 = 366;

/// Occurrences projected per stored item.
const MAX_ITEM_OCCURRENCES: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CalendarItem {
    Event {
        id: Uuid,
        title: String,
        status: EventStatus,
    },
    Task {
        id: Uuid,
        title: String,
        status: TaskStatus,
    },
}

/// One occurrence of a stored event or task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarOccurrence {
    pub item: CalendarItem,
    pub occurrence: Occurrence,
}

fn check_span(window: DateWindow) -> ResultEngine<()> {
    let days = (window.end() - window.start()).num_days();
    if days > MAX_CALENDAR_DAYS {
        return Err(EngineError::InvalidDate(format!(
            "calendar window spans {days} days, at most {MAX_CALENDAR_DAYS} allowed"
        )));
    }
    Ok(())
}

/// Validate an optional rule, returning it normalized to its canonical form.
fn parse_rule(rule: Option<&str>) -> ResultEngine<Option<RecurrenceRule>> {
    rule.map(str::trim)
        .filter(|rule| !rule.is_empty())
        .map(|rule| rule.parse::<RecurrenceRule>().map_err(EngineError::from))
        .transpose()
}

/// Occurrences of one stored item inside `window`.
///
/// Items without a rule are a single occurrence at their start. A stored rule
/// that no longer parses is logged and the item is skipped.
fn project(
    id: Uuid,
    rule: Option<&str>,
    window: DateWindow,
    base: RecurrenceBase,
) -> Vec<Occurrence> {
    match rule {
        None => {
            let start_at = base.start_at();
            if !window.contains(start_at) {
                return Vec::new();
            }
            let timing = match base {
                RecurrenceBase::Event { end_at, .. } => OccurrenceTiming::Ends(end_at),
                RecurrenceBase::Task { due_at, .. } => OccurrenceTiming::Due(due_at),
            };
            vec![Occurrence {
                index: 0,
                start_at,
                timing,
            }]
        }
        Some(rule) => match rule.parse::<RecurrenceRule>() {
            Ok(rule) => expand(&rule, window, base)
                .take(MAX_ITEM_OCCURRENCES)
                .collect(),
            Err(err) => {
                tracing::warn!(item = %id, "skipping unreadable recurrence rule: {err}");
                Vec::new()
            }
        },
    }
}

impl Engine {
    pub async fn new_event(&self, cmd: EventCmd) -> ResultEngine<Event> {
        let title = normalize_required_name(&cmd.title, "event")?;
        if cmd.end_at <= cmd.start_at {
            return Err(EngineError::InvalidDate(
                "event must end after it starts".to_string(),
            ));
        }
        let rule = parse_rule(cmd.recurrence_rule.as_deref())?;

        let model = events::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(cmd.user_id),
            title: ActiveValue::Set(title),
            start_at: ActiveValue::Set(cmd.start_at),
            end_at: ActiveValue::Set(cmd.end_at),
            status: ActiveValue::Set(EventStatus::Scheduled.as_str().to_string()),
            recurrence_rule: ActiveValue::Set(rule.map(|rule| rule.to_string())),
        }
        .insert(&self.database)
        .await?;
        Event::try_from(model)
    }

    /// Tasks need a start or a due time to recur from.
    pub async fn new_task(&self, cmd: TaskCmd) -> ResultEngine<Task> {
        let title = normalize_required_name(&cmd.title, "task")?;
        if let (Some(start_at), Some(due_at)) = (cmd.start_at, cmd.due_at) {
            if due_at < start_at {
                return Err(EngineError::InvalidDate(
                    "task cannot be due before it starts".to_string(),
                ));
            }
        }
        let rule = parse_rule(cmd.recurrence_rule.as_deref())?;
        if rule.is_some() && cmd.start_at.is_none() && cmd.due_at.is_none() {
            return Err(EngineError::InvalidDate(
                "a recurring task needs a start or due time".to_string(),
            ));
        }

        let model = tasks::ActiveModel {
            id: ActiveValue::Set(Uuid::new_v4()),
            user_id: ActiveValue::Set(cmd.user_id),
            title: ActiveValue::Set(title),
            start_at: ActiveValue::Set(cmd.start_at),
            due_at: ActiveValue::Set(cmd.due_at),
            status: ActiveValue::Set(TaskStatus::Pending.as_str().to_string()),
            recurrence_rule: ActiveValue::Set(rule.map(|rule| rule.to_string())),
        }
        .insert(&self.database)
        .await?;
        Task::try_from(model)
    }

    pub async fn set_event_status(
        &self,
        user_id: &str,
        event_id: Uuid,
        status: EventStatus,
    ) -> ResultEngine<Event> {
        with_tx!(self, |db_tx| {
            let model = events::Entity::find_by_id(event_id)
                .filter(events::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("event not exists".to_string()))?;
            let model = events::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(status.as_str().to_string()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            Event::try_from(model)
        })
    }

    pub async fn set_task_status(
        &self,
        user_id: &str,
        task_id: Uuid,
        status: TaskStatus,
    ) -> ResultEngine<Task> {
        with_tx!(self, |db_tx| {
            let model = tasks::Entity::find_by_id(task_id)
                .filter(tasks::Column::UserId.eq(user_id))
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("task not exists".to_string()))?;
            let model = tasks::ActiveModel {
                id: ActiveValue::Set(model.id),
                status: ActiveValue::Set(status.as_str().to_string()),
                ..Default::default()
            }
            .update(&db_tx)
            .await?;
            Task::try_from(model)
        })
    }

    /// Occurrences of the user's events starting inside `window`. Cancelled
    /// events are left out.
    pub async fn expand_events(
        &self,
        user_id: &str,
        window: DateWindow,
    ) -> ResultEngine<Vec<CalendarOccurrence>> {
        check_span(window)?;
        let models = events::Entity::find()
            .filter(events::Column::UserId.eq(user_id))
            .filter(events::Column::Status.ne(EventStatus::Cancelled.as_str()))
            .filter(events::Column::StartAt.lt(window.end()))
            .order_by_asc(events::Column::StartAt)
            .all(&self.database)
            .await?;

        let mut out = Vec::new();
        for model in models {
            let event = Event::try_from(model)?;
            let base = RecurrenceBase::Event {
                start_at: event.start_at,
                end_at: event.end_at,
            };
            for occurrence in project(event.id, event.recurrence_rule.as_deref(), window, base) {
                out.push(CalendarOccurrence {
                    item: CalendarItem::Event {
                        id: event.id,
                        title: event.title.clone(),
                        status: event.status,
                    },
                    occurrence,
                });
            }
        }
        out.sort_by_key(|item| item.occurrence.start_at);
        Ok(out)
    }

    /// Occurrences of the user's tasks inside `window`, anchored on the
    /// start time or, without one, on the due time.
    pub async fn expand_tasks(
        &self,
        user_id: &str,
        window: DateWindow,
    ) -> ResultEngine<Vec<CalendarOccurrence>> {
        check_span(window)?;
        let models = tasks::Entity::find()
            .filter(tasks::Column::UserId.eq(user_id))
            .filter(tasks::Column::Status.ne(TaskStatus::Cancelled.as_str()))
            .order_by_asc(tasks::Column::Title)
            .all(&self.database)
            .await?;

        let mut out = Vec::new();
        for model in models {
            let task = Task::try_from(model)?;
            let Some(anchor) = task.start_at.or(task.due_at) else {
                continue;
            };
            if anchor >= window.end() {
                continue;
            }
            let base = RecurrenceBase::Task {
                start_at: anchor,
                due_at: task.due_at,
            };
            for occurrence in project(task.id, task.recurrence_rule.as_deref(), window, base) {
                out.push(CalendarOccurrence {
                    item: CalendarItem::Task {
                        id: task.id,
                        title: task.title.clone(),
                        status: task.status,
                    },
                    occurrence,
                });
            }
        }
        out.sort_by_key(|item| item.occurrence.start_at);
        Ok(out)
    }

    /// Events and tasks of the window, ordered by start. Windows longer than
    /// [`MAX_CALENDAR_DAYS`] are rejected.
    pub async fn calendar(
        &self,
        user_id: &str,
        window: DateWindow,
    ) -> ResultEngine<Vec<CalendarOccurrence>> {
        let mut items = self.expand_events(user_id, window).await?;
        items.extend(self.expand_tasks(user_id, window).await?);
        items.sort_by_key(|item| item.occurrence.start_at);
        Ok(items)
    }
}
