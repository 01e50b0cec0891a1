use std::{error::Error, io::Write};

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    style::Print,
    terminal,
    terminal::ClearType,
};
use engine::{
    CronJob, CronReport, Engine, HttpPushSender, JobOutcome, JobResult, LogPushSender,
    PushGateway,
};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection, EntityTrait, Set};

mod users {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
    #[sea_orm(table_name = "users")]
    pub struct Model {
        #[sea_orm(primary_key, auto_increment = false)]
        pub username: String,
        pub password: String,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

#[derive(Parser, Debug)]
#[command(name = "conta_admin")]
#[command(about = "Admin utilities for Conta (users, reconciliation, scheduled jobs)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite:./conta.db?mode=rwc")]
    database_url: String,

    /// Log level of the engine while running jobs.
    #[arg(long, default_value = "info")]
    level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    /// Recompute cached account balances from the ledger.
    Reconcile(ReconcileArgs),
    /// Create the faturas missing for credit card entries.
    Backfill(BackfillArgs),
    /// Complete elapsed events and flag overdue tasks.
    Statuses,
    /// Run scheduled jobs once, like the cron endpoints do.
    Jobs(JobsArgs),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
}

#[derive(Args, Debug)]
struct ReconcileArgs {
    /// Only this user; every user when absent.
    #[arg(long)]
    user: Option<String>,
}

#[derive(Args, Debug)]
struct BackfillArgs {
    /// Only this user; every user when absent.
    #[arg(long)]
    user: Option<String>,
}

#[derive(Args, Debug)]
struct JobsArgs {
    /// Comma separated jobs: balances, statuses, faturas, reminders.
    #[arg(long, default_value = "balances,statuses,faturas,reminders")]
    job: String,

    /// Push gateway endpoint; reminders are only logged when absent.
    #[arg(long, env = "CONTA__PUSH__GATEWAY_URL")]
    push_gateway: Option<String>,
}

struct RawModeGuard;

impl RawModeGuard {
    fn enter() -> Result<Self, Box<dyn Error + Send + Sync>> {
        terminal::enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = terminal::disable_raw_mode();
    }
}

fn prompt_password(prompt: &str) -> Result<String, Box<dyn Error + Send + Sync>> {
    let _raw = RawModeGuard::enter()?;

    let mut out = std::io::stderr();
    execute!(
        out,
        cursor::MoveToColumn(0),
        terminal::Clear(ClearType::CurrentLine),
        Print(prompt)
    )?;
    out.flush()?;

    let mut buf = String::new();
    loop {
        let Event::Key(KeyEvent {
            code, modifiers, ..
        }) = event::read()?
        else {
            continue;
        };

        match code {
            KeyCode::Enter => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                break;
            }
            KeyCode::Backspace => {
                if buf.pop().is_some() {
                    execute!(out, cursor::MoveLeft(1), Print(" "), cursor::MoveLeft(1))?;
                    out.flush()?;
                }
            }
            KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => {
                execute!(out, Print("\r\n"))?;
                out.flush()?;
                return Err("interrupted".into());
            }
            KeyCode::Char(ch) if !modifiers.contains(KeyModifiers::CONTROL) => {
                buf.push(ch);
                execute!(out, Print("*"))?;
                out.flush()?;
            }
            _ => {}
        }
    }

    Ok(buf)
}

fn prompt_password_twice() -> Result<String, Box<dyn Error + Send + Sync>> {
    let mut out = std::io::stderr();
    for _ in 0..3 {
        let p1 = prompt_password("Password: ")?;
        if p1.is_empty() {
            execute!(
                out,
                cursor::MoveToColumn(0),
                terminal::Clear(ClearType::CurrentLine),
                Print("Password must not be empty.\r\n")
            )?;
            continue;
        }

        let p2 = prompt_password("Confirm password: ")?;
        if p1 == p2 {
            return Ok(p1);
        }

        execute!(
            out,
            cursor::MoveToColumn(0),
            terminal::Clear(ClearType::CurrentLine),
            Print("Passwords do not match. Try again.\r\n")
        )?;
    }

    Err("too many attempts".into())
}

async fn connect_db(
    database_url: &str,
) -> Result<DatabaseConnection, Box<dyn Error + Send + Sync>> {
    let db = Database::connect(database_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

fn print_report(report: &CronReport) {
    for (job, outcome) in &report.outcomes {
        match outcome {
            JobOutcome::Ok(JobResult::Balances(balances)) => println!(
                "{job}: {} users, {} accounts updated, {} users failed",
                balances.users, balances.accounts_updated, balances.failed_users
            ),
            JobOutcome::Ok(JobResult::Statuses(statuses)) => println!(
                "{job}: {} events completed, {} tasks overdue",
                statuses.events_completed, statuses.tasks_overdue
            ),
            JobOutcome::Ok(JobResult::Faturas { created }) => {
                println!("{job}: {created} faturas created")
            }
            JobOutcome::Ok(JobResult::Reminders(delivery)) => println!(
                "{job}: {} sent, {} failed, {} tokens pruned",
                delivery.sent, delivery.failed, delivery.pruned
            ),
            JobOutcome::Failed(err) => eprintln!("{job}: failed: {err}"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(format!("engine={}", cli.level))
        .with_writer(std::io::stderr)
        .init();

    let db = connect_db(&cli.database_url).await?;

    match cli.command {
        Command::User(User {
            command: UserCommand::Create(args),
        }) => {
            if users::Entity::find_by_id(args.username.clone())
                .one(&db)
                .await?
                .is_some()
            {
                eprintln!("user already exists: {}", args.username);
                std::process::exit(1);
            }

            let password = prompt_password_twice()?;
            let user = users::ActiveModel {
                username: Set(args.username.clone()),
                password: Set(password),
            };
            users::Entity::insert(user).exec(&db).await?;

            println!("created user: {}", args.username);
        }
        Command::Reconcile(args) => {
            let engine = Engine::builder().database(db.clone()).build().await?;
            match args.user {
                Some(user) => {
                    let updated = engine.reconcile_user(&user).await?;
                    println!("{user}: {updated} accounts updated");
                }
                None => {
                    let report = engine.reconcile_all().await?;
                    println!(
                        "{} users, {} accounts updated, {} users failed",
                        report.users, report.accounts_updated, report.failed_users
                    );
                }
            }
        }
        Command::Backfill(args) => {
            let engine = Engine::builder().database(db.clone()).build().await?;
            let created = engine.backfill_faturas(args.user.as_deref()).await?;
            println!("{created} faturas created");
        }
        Command::Statuses => {
            let engine = Engine::builder().database(db.clone()).build().await?;
            let report = engine.update_statuses(Utc::now()).await?;
            println!(
                "{} events completed, {} tasks overdue",
                report.events_completed, report.tasks_overdue
            );
        }
        Command::Jobs(args) => {
            let jobs = CronJob::parse_list(&args.job)?;
            if jobs.is_empty() {
                eprintln!("no job selected");
                std::process::exit(2);
            }
            let sender = match args.push_gateway {
                Some(url) => PushGateway::Http(HttpPushSender::new(url)),
                None => PushGateway::Log(LogPushSender),
            };

            let engine = Engine::builder().database(db.clone()).build().await?;
            let now = Utc::now();
            let report = engine
                .run_jobs(&jobs, now, now.date_naive(), &sender)
                .await;
            print_report(&report);
            if !report.success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
