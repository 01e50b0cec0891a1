//! Events, tasks, calendar window and stateless RRULE expansion.

use api_types::{
    Created,
    calendar::{
        CalendarEntryView, CalendarItemView, CalendarQuery, EventNew, EventStatus,
        EventStatusUpdate, ExpandRequest, ExpandResponse, OccurrenceView, TaskNew, TaskStatus,
        TaskStatusUpdate,
    },
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::Utc;
use engine::{
    CalendarItem, CalendarOccurrence, EngineError,
    recurrence::{DateWindow, Occurrence, RecurrenceBase, RecurrenceRule, expand},
};
use uuid::Uuid;

use crate::{ServerError, server::ServerState, user};

/// Upper bound of occurrences returned by a single expansion.
const MAX_OCCURRENCES: usize = 1000;

fn event_status_to_engine(status: EventStatus) -> engine::EventStatus {
    match status {
        EventStatus::Scheduled => engine::EventStatus::Scheduled,
        EventStatus::Completed => engine::EventStatus::Completed,
        EventStatus::Cancelled => engine::EventStatus::Cancelled,
    }
}

fn event_status_from_engine(status: engine::EventStatus) -> EventStatus {
    match status {
        engine::EventStatus::Scheduled => EventStatus::Scheduled,
        engine::EventStatus::Completed => EventStatus::Completed,
        engine::EventStatus::Cancelled => EventStatus::Cancelled,
    }
}

fn task_status_to_engine(status: TaskStatus) -> engine::TaskStatus {
    match status {
        TaskStatus::Pending => engine::TaskStatus::Pending,
        TaskStatus::InProgress => engine::TaskStatus::InProgress,
        TaskStatus::Completed => engine::TaskStatus::Completed,
        TaskStatus::Overdue => engine::TaskStatus::Overdue,
        TaskStatus::Cancelled => engine::TaskStatus::Cancelled,
    }
}

fn task_status_from_engine(status: engine::TaskStatus) -> TaskStatus {
    match status {
        engine::TaskStatus::Pending => TaskStatus::Pending,
        engine::TaskStatus::InProgress => TaskStatus::InProgress,
        engine::TaskStatus::Completed => TaskStatus::Completed,
        engine::TaskStatus::Overdue => TaskStatus::Overdue,
        engine::TaskStatus::Cancelled => TaskStatus::Cancelled,
    }
}

fn occurrence_view(occurrence: &Occurrence) -> OccurrenceView {
    OccurrenceView {
        index: occurrence.index,
        start_at: occurrence.start_at,
        end_at: occurrence.end_at(),
        due_at: occurrence.due_at(),
    }
}

fn calendar_entry_view(entry: CalendarOccurrence) -> CalendarEntryView {
    let item = match entry.item {
        CalendarItem::Event { id, title, status } => CalendarItemView::Event {
            id,
            title,
            status: event_status_from_engine(status),
        },
        CalendarItem::Task { id, title, status } => CalendarItemView::Task {
            id,
            title,
            status: task_status_from_engine(status),
        },
    };
    CalendarEntryView {
        item,
        occurrence: occurrence_view(&entry.occurrence),
    }
}

pub async fn event_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<EventNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let event = state
        .engine
        .new_event(engine::EventCmd {
            user_id: user.username,
            title: payload.title,
            start_at: payload.start_at.with_timezone(&Utc),
            end_at: payload.end_at.with_timezone(&Utc),
            recurrence_rule: payload.recurrence_rule,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(Created { id: event.id })))
}

pub async fn event_status(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(event_id): Path<Uuid>,
    Json(payload): Json<EventStatusUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .set_event_status(
            &user.username,
            event_id,
            event_status_to_engine(payload.status),
        )
        .await?;
    Ok(StatusCode::OK)
}

pub async fn task_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<TaskNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let task = state
        .engine
        .new_task(engine::TaskCmd {
            user_id: user.username,
            title: payload.title,
            start_at: payload.start_at.map(|at| at.with_timezone(&Utc)),
            due_at: payload.due_at.map(|at| at.with_timezone(&Utc)),
            recurrence_rule: payload.recurrence_rule,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(Created { id: task.id })))
}

pub async fn task_status(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Path(task_id): Path<Uuid>,
    Json(payload): Json<TaskStatusUpdate>,
) -> Result<StatusCode, ServerError> {
    state
        .engine
        .set_task_status(
            &user.username,
            task_id,
            task_status_to_engine(payload.status),
        )
        .await?;
    Ok(StatusCode::OK)
}

/// Occurrences of events and tasks in `[from, to)`, ordered by start.
pub async fn calendar(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<CalendarQuery>,
) -> Result<Json<Vec<CalendarEntryView>>, ServerError> {
    let window = DateWindow::from_dates(query.from, query.to).map_err(EngineError::from)?;
    let items = state.engine.calendar(&user.username, window).await?;
    Ok(Json(items.into_iter().map(calendar_entry_view).collect()))
}

pub async fn expand_rule(
    Extension(_): Extension<user::Model>,
    Json(payload): Json<ExpandRequest>,
) -> Result<Json<ExpandResponse>, ServerError> {
    let rule: RecurrenceRule = payload.rule.parse().map_err(EngineError::from)?;
    let window = DateWindow::new(
        payload.window_start.with_timezone(&Utc),
        payload.window_end.with_timezone(&Utc),
    )
    .map_err(EngineError::from)?;

    let start_at = payload.start_at.with_timezone(&Utc);
    let base = match payload.end_at {
        Some(end_at) => {
            let end_at = end_at.with_timezone(&Utc);
            if end_at <= start_at {
                return Err(EngineError::InvalidDate(
                    "end_at must follow start_at".to_string(),
                )
                .into());
            }
            RecurrenceBase::Event { start_at, end_at }
        }
        None => RecurrenceBase::Task {
            start_at,
            due_at: payload.due_at.map(|at| at.with_timezone(&Utc)),
        },
    };

    let occurrences = expand(&rule, window, base)
        .take(MAX_OCCURRENCES)
        .map(|occurrence| occurrence_view(&occurrence))
        .collect();
    Ok(Json(ExpandResponse {
        rule: rule.to_string(),
        occurrences,
    }))
}
