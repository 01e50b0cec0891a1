use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Id of a freshly created resource.
#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
    pub id: Uuid,
}

/// Month selector used by list endpoints, e.g. `?month=2026-03`.
#[derive(Debug, Serialize, Deserialize)]
pub struct MonthQuery {
    /// `YYYY-MM`.
    pub month: String,
    pub account_id: Option<Uuid>,
}

pub mod account {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum AccountKind {
        Checking,
        Savings,
        CreditCard,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountNew {
        pub name: String,
        pub kind: AccountKind,
        /// Statement due day (1..=31), credit cards only.
        pub due_day: Option<u32>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountUpdate {
        pub due_day: Option<u32>,
        pub archived: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct AccountList {
        pub include_archived: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccountView {
        pub id: Uuid,
        pub name: String,
        pub kind: AccountKind,
        /// Cached balance, refreshed by every write and by the reconciler.
        pub current_balance_minor: i64,
        pub due_day: Option<u32>,
        pub archived: bool,
    }

    /// Balance recomputed from the ledger.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct BalanceView {
        pub account_id: Uuid,
        pub received_income_minor: i64,
        pub paid_expenses_minor: i64,
        pub transfers_in_minor: i64,
        pub transfers_out_minor: i64,
        pub balance_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Reconciled {
        pub accounts_updated: usize,
    }
}

pub mod category {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum CategoryKind {
        Expense,
        Income,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub kind: CategoryKind,
        pub color: Option<String>,
        pub icon: Option<String>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryList {
        pub kind: Option<CategoryKind>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub kind: CategoryKind,
        pub color: Option<String>,
        pub icon: Option<String>,
    }
}

pub mod entry {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntryNew {
        pub account_id: Uuid,
        pub category_id: Uuid,
        pub description: Option<String>,
        pub amount_minor: i64,
        pub due_date: NaiveDate,
        /// RFC3339 timestamp; absent for a pending entry.
        pub paid_at: Option<DateTime<FixedOffset>>,
        pub ignored: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct EntryUpdate {
        pub category_id: Option<Uuid>,
        pub description: Option<String>,
        pub amount_minor: Option<i64>,
        pub due_date: Option<NaiveDate>,
        pub ignored: Option<bool>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct EntryPay {
        /// Optional: if absent, server uses now().
        pub paid_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EntryView {
        pub id: Uuid,
        pub account_id: Uuid,
        pub category_id: Uuid,
        pub description: String,
        pub amount_minor: i64,
        pub due_date: NaiveDate,
        pub paid_at: Option<DateTime<Utc>>,
        pub ignored: bool,
        pub fatura_id: Option<Uuid>,
    }
}

pub mod income {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IncomeNew {
        pub account_id: Uuid,
        pub category_id: Uuid,
        pub description: Option<String>,
        pub amount_minor: i64,
        pub expected_date: NaiveDate,
        pub received_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct IncomeReceive {
        /// Optional: if absent, server uses now().
        pub received_at: Option<DateTime<FixedOffset>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct IncomeView {
        pub id: Uuid,
        pub account_id: Uuid,
        pub category_id: Uuid,
        pub description: String,
        pub amount_minor: i64,
        pub expected_date: NaiveDate,
        pub received_at: Option<DateTime<Utc>>,
    }
}

pub mod transfer {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TransferNew {
        pub from_account_id: Uuid,
        pub to_account_id: Uuid,
        pub amount_minor: i64,
        /// RFC3339 timestamp, including timezone offset (local user time).
        pub occurred_at: DateTime<FixedOffset>,
        pub description: Option<String>,
    }
}

pub mod budget {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetSet {
        pub category_id: Uuid,
        /// `YYYY-MM`.
        pub year_month: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetView {
        pub id: Uuid,
        pub category_id: Uuid,
        pub year_month: String,
        pub amount_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetCopy {
        pub from: String,
        pub to: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetCopied {
        pub created: usize,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetLineView {
        pub category_id: Uuid,
        pub category_name: String,
        pub budget_minor: i64,
        pub spent_minor: i64,
        /// Negative when over budget.
        pub remaining_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UnbudgetedView {
        pub category_id: Uuid,
        pub category_name: String,
        pub spent_minor: i64,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct BudgetSummaryView {
        pub year_month: String,
        pub lines: Vec<BudgetLineView>,
        pub unbudgeted: Vec<UnbudgetedView>,
        pub total_budget_minor: i64,
        pub total_spent_minor: i64,
    }
}

pub mod fatura {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum FaturaStatus {
        Pending,
        Overdue,
        Paid,
    }

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct FaturaList {
        pub account_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FaturaPay {
        pub from_account_id: Uuid,
        /// Optional: if absent, server uses now().
        pub paid_at: Option<DateTime<FixedOffset>>,
        /// Record a transfer to the card for the total (default: true).
        pub create_transfer: Option<bool>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FaturaView {
        pub id: Uuid,
        pub account_id: Uuid,
        pub year_month: String,
        pub total_amount_minor: i64,
        pub due_date: NaiveDate,
        pub status: FaturaStatus,
        pub paid_at: Option<DateTime<Utc>>,
        pub paid_from_account_id: Option<Uuid>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Backfilled {
        pub created: usize,
    }
}

pub mod calendar {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum EventStatus {
        Scheduled,
        Completed,
        Cancelled,
    }

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TaskStatus {
        Pending,
        InProgress,
        Completed,
        Overdue,
        Cancelled,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventNew {
        pub title: String,
        pub start_at: DateTime<FixedOffset>,
        pub end_at: DateTime<FixedOffset>,
        /// RFC 5545 RRULE, e.g. `FREQ=WEEKLY;INTERVAL=2`.
        pub recurrence_rule: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TaskNew {
        pub title: String,
        pub start_at: Option<DateTime<FixedOffset>>,
        pub due_at: Option<DateTime<FixedOffset>>,
        pub recurrence_rule: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct EventStatusUpdate {
        pub status: EventStatus,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct TaskStatusUpdate {
        pub status: TaskStatus,
    }

    /// Half-open day range `[from, to)`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CalendarQuery {
        pub from: NaiveDate,
        pub to: NaiveDate,
    }

    #[derive(Debug, Serialize, Deserialize)]
    #[serde(tag = "kind", rename_all = "snake_case")]
    pub enum CalendarItemView {
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

    #[derive(Debug, Serialize, Deserialize)]
    pub struct OccurrenceView {
        /// Position in the series, the stored occurrence being 0.
        pub index: u32,
        pub start_at: DateTime<Utc>,
        pub end_at: Option<DateTime<Utc>>,
        pub due_at: Option<DateTime<Utc>>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CalendarEntryView {
        pub item: CalendarItemView,
        pub occurrence: OccurrenceView,
    }

    /// Expand a rule without storing anything.
    ///
    /// With `end_at` the series is event-like and every occurrence keeps the
    /// duration; otherwise it is task-like and keeps the `due_at` lead time.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpandRequest {
        pub rule: String,
        pub start_at: DateTime<FixedOffset>,
        pub end_at: Option<DateTime<FixedOffset>>,
        pub due_at: Option<DateTime<FixedOffset>>,
        pub window_start: DateTime<FixedOffset>,
        pub window_end: DateTime<FixedOffset>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpandResponse {
        /// Canonical form of the rule.
        pub rule: String,
        pub occurrences: Vec<OccurrenceView>,
    }
}

pub mod push {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PushTokenNew {
        pub token: String,
        /// `ios`, `android`, `web`, free form.
        pub platform: Option<String>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct PushTokenRemove {
        pub token: String,
    }
}

pub mod cron {
    use super::*;

    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CronQuery {
        /// Comma separated job names; absent runs the endpoint defaults.
        pub job: Option<String>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(untagged)]
    pub enum JobResponse<T> {
        Done(T),
        Failed { error: String },
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct BalancesResult {
        pub users: usize,
        pub accounts_updated: usize,
        pub failed_users: usize,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct StatusesResult {
        pub events_completed: u64,
        pub tasks_overdue: u64,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct FaturasResult {
        pub created: usize,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct RemindersResult {
        pub sent: usize,
        pub failed: usize,
        pub pruned: usize,
    }

    /// Body of the cron endpoints. Only the jobs that ran are present.
    #[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CronResponse {
        pub success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub balances: Option<JobResponse<BalancesResult>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub statuses: Option<JobResponse<StatusesResult>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub faturas: Option<JobResponse<FaturasResult>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pub reminders: Option<JobResponse<RemindersResult>>,
    }
}
