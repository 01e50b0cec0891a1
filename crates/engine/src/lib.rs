//! Bookkeeping engine of Conta.
//!
//! [`Engine`] owns the database connection and exposes every operation:
//! ledger writes, balance reconciliation, budgets, faturas, calendar
//! expansion, status updates, reminders and the scheduled jobs that bundle
//! them. Money is always integer cents ([`MoneyCents`]).

pub use accounts::{Account, AccountKind, DEFAULT_DUE_DAY};
pub use budgets::Budget;
pub use categories::{Category, CategoryKind};
pub use commands::{
    AccountCmd, CategoryCmd, EntryCmd, EventCmd, IncomeCmd, PayFaturaCmd, TaskCmd, TransferCmd,
};
pub use entries::{Entry, PaymentStatus};
pub use error::EngineError;
pub use events::{Event, EventStatus};
pub use faturas::{Fatura, FaturaPayment, FaturaStatus};
pub use incomes::{Income, ReceiptStatus};
pub use money::MoneyCents;
pub use notify::{
    HttpPushSender, LogPushSender, PushError, PushGateway, PushKind, PushPayload, PushSender,
};
pub use ops::{
    BalanceBreakdown, BudgetLine, BudgetSummary, CalendarItem, CalendarOccurrence, CronJob,
    CronReport, DeliveryReport, Engine, EngineBuilder, EntryUpdate, JobOutcome, JobResult,
    MAX_CALENDAR_DAYS, ReconcileReport, StatusUpdateReport, UnbudgetedLine,
};
pub use tasks::{Task, TaskStatus};
pub use transfers::Transfer;
pub use year_month::YearMonth;

mod accounts;
mod budgets;
mod categories;
mod commands;
mod entries;
mod error;
mod events;
mod faturas;
mod incomes;
mod money;
mod notify;
mod ops;
mod push_tokens;
pub mod recurrence;
mod tasks;
mod transfers;
mod users;
mod util;
mod year_month;

type ResultEngine<T> = Result<T, EngineError>;
