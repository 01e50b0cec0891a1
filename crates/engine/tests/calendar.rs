mod common;

use common::{at, day, engine_with_db};
use engine::{
    CalendarItem, EngineError, EventCmd, EventStatus, TaskCmd, TaskStatus,
    recurrence::{DateWindow, RecurrenceError},
};

fn event(title: &str, start: chrono::DateTime<chrono::Utc>, hours: i64) -> EventCmd {
    EventCmd {
        user_id: "alice".to_string(),
        title: title.to_string(),
        start_at: start,
        end_at: start + chrono::Duration::hours(hours),
        recurrence_rule: None,
    }
}

fn task(title: &str, due_at: Option<chrono::DateTime<chrono::Utc>>) -> TaskCmd {
    TaskCmd {
        user_id: "alice".to_string(),
        title: title.to_string(),
        start_at: None,
        due_at,
        recurrence_rule: None,
    }
}

#[tokio::test]
async fn status_updater_moves_elapsed_items_once() {
    let (engine, _db) = engine_with_db().await;
    let now = at(2026, 2, 1, 12, 0);

    let ended = engine
        .new_event(event("Dentist", at(2026, 2, 1, 8, 0), 1))
        .await
        .unwrap();
    let running = engine
        .new_event(event("Workshop", at(2026, 2, 1, 11, 0), 2))
        .await
        .unwrap();
    let cancelled = engine
        .new_event(event("Dinner", at(2026, 1, 30, 19, 0), 2))
        .await
        .unwrap();
    engine
        .set_event_status("alice", cancelled.id, EventStatus::Cancelled)
        .await
        .unwrap();

    let late = engine
        .new_task(task("Pay rent", Some(at(2026, 2, 1, 10, 30))))
        .await
        .unwrap();
    let done = engine
        .new_task(task("File taxes", Some(at(2026, 1, 20, 0, 0))))
        .await
        .unwrap();
    engine
        .set_task_status("alice", done.id, TaskStatus::Completed)
        .await
        .unwrap();
    engine
        .new_task(task("Renew passport", Some(at(2026, 3, 1, 0, 0))))
        .await
        .unwrap();
    engine.new_task(task("Someday", None)).await.unwrap();

    let report = engine.update_statuses(now).await.unwrap();
    assert_eq!(report.events_completed, 1);
    assert_eq!(report.tasks_overdue, 1);

    let window = DateWindow::from_dates(day(2026, 1, 1), day(2026, 3, 1)).unwrap();
    let events = engine.expand_events("alice", window).await.unwrap();
    let status_of = |id| {
        events.iter().find_map(|item| match &item.item {
            CalendarItem::Event { id: found, status, .. } if *found == id => Some(*status),
            _ => None,
        })
    };
    assert_eq!(status_of(ended.id), Some(EventStatus::Completed));
    assert_eq!(status_of(running.id), Some(EventStatus::Scheduled));
    assert_eq!(status_of(cancelled.id), None);

    let tasks = engine.expand_tasks("alice", window).await.unwrap();
    let late_status = tasks.iter().find_map(|item| match &item.item {
        CalendarItem::Task { id, status, .. } if *id == late.id => Some(*status),
        _ => None,
    });
    assert_eq!(late_status, Some(TaskStatus::Overdue));

    let again = engine.update_statuses(now).await.unwrap();
    assert_eq!(again.events_completed, 0);
    assert_eq!(again.tasks_overdue, 0);
}

#[tokio::test]
async fn monthly_series_expands_inside_the_window() {
    let (engine, _db) = engine_with_db().await;
    let stored = engine
        .new_event(EventCmd {
            recurrence_rule: Some("rrule:freq=monthly;count=3".to_string()),
            ..event("Book club", at(2025, 1, 15, 18, 0), 2)
        })
        .await
        .unwrap();
    assert_eq!(stored.recurrence_rule.as_deref(), Some("FREQ=MONTHLY;COUNT=3"));

    let window = DateWindow::from_dates(day(2025, 1, 1), day(2026, 1, 1)).unwrap();
    let occurrences = engine.expand_events("alice", window).await.unwrap();
    let starts: Vec<_> = occurrences
        .iter()
        .map(|item| item.occurrence.start_at)
        .collect();
    assert_eq!(
        starts,
        vec![
            at(2025, 1, 15, 18, 0),
            at(2025, 2, 15, 18, 0),
            at(2025, 3, 15, 18, 0),
        ]
    );
    assert_eq!(
        occurrences[2].occurrence.end_at(),
        Some(at(2025, 3, 15, 20, 0))
    );

    let narrow = DateWindow::from_dates(day(2025, 2, 1), day(2025, 3, 1)).unwrap();
    let occurrences = engine.expand_events("alice", narrow).await.unwrap();
    assert_eq!(occurrences.len(), 1);
    assert_eq!(occurrences[0].occurrence.index, 1);
}

#[tokio::test]
async fn recurring_tasks_keep_their_lead_time() {
    let (engine, _db) = engine_with_db().await;
    engine
        .new_task(TaskCmd {
            start_at: Some(at(2026, 5, 4, 9, 0)),
            due_at: Some(at(2026, 5, 4, 17, 0)),
            recurrence_rule: Some("FREQ=WEEKLY;INTERVAL=2".to_string()),
            ..task("Timesheet", None)
        })
        .await
        .unwrap();

    let window = DateWindow::from_dates(day(2026, 5, 1), day(2026, 6, 1)).unwrap();
    let occurrences = engine.expand_tasks("alice", window).await.unwrap();
    let dues: Vec<_> = occurrences
        .iter()
        .filter_map(|item| item.occurrence.due_at())
        .collect();
    // The June 1st occurrence starts at the window end and is left out.
    assert_eq!(dues, vec![at(2026, 5, 4, 17, 0), at(2026, 5, 18, 17, 0)]);
}

#[tokio::test]
async fn calendar_merges_events_and_tasks_by_start() {
    let (engine, _db) = engine_with_db().await;
    engine
        .new_event(event("Standup", at(2026, 3, 2, 10, 0), 1))
        .await
        .unwrap();
    engine
        .new_task(task("Send invoice", Some(at(2026, 3, 2, 9, 0))))
        .await
        .unwrap();
    engine
        .new_event(event("Retro", at(2026, 3, 2, 16, 0), 1))
        .await
        .unwrap();

    let window = DateWindow::from_dates(day(2026, 3, 2), day(2026, 3, 3)).unwrap();
    let titles: Vec<_> = engine
        .calendar("alice", window)
        .await
        .unwrap()
        .into_iter()
        .map(|item| match item.item {
            CalendarItem::Event { title, .. } | CalendarItem::Task { title, .. } => title,
        })
        .collect();
    assert_eq!(titles, vec!["Send invoice", "Standup", "Retro"]);
}

#[tokio::test]
async fn calendar_window_span_is_capped() {
    let (engine, _db) = engine_with_db().await;
    engine
        .new_event(EventCmd {
            recurrence_rule: Some("FREQ=DAILY".to_string()),
            ..event("Standup", at(2025, 1, 1, 10, 0), 1)
        })
        .await
        .unwrap();

    let leap_year = DateWindow::from_dates(day(2028, 1, 1), day(2029, 1, 1)).unwrap();
    assert_eq!(engine.calendar("alice", leap_year).await.unwrap().len(), 366);

    let decade = DateWindow::from_dates(day(2025, 1, 1), day(2035, 1, 1)).unwrap();
    for result in [
        engine.calendar("alice", decade).await,
        engine.expand_events("alice", decade).await,
        engine.expand_tasks("alice", decade).await,
    ] {
        assert!(matches!(result, Err(EngineError::InvalidDate(_))));
    }
}

#[tokio::test]
async fn invalid_items_are_rejected() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .new_event(EventCmd {
            recurrence_rule: Some("FREQ=HOURLY".to_string()),
            ..event("Ping", at(2026, 1, 1, 0, 0), 1)
        })
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Recurrence(RecurrenceError::InvalidFrequency("HOURLY".to_string()))
    );

    let err = engine
        .new_event(event("Backwards", at(2026, 1, 1, 10, 0), 0))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));

    let err = engine
        .new_task(TaskCmd {
            recurrence_rule: Some("FREQ=DAILY".to_string()),
            ..task("Floating", None)
        })
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidDate(_)));

    let err = engine.new_task(task("   ", None)).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidName(_)));
}
