use chrono_tz::Tz;
use engine::{HttpPushSender, LogPushSender, PushGateway};
use migration::{Migrator, MigratorTrait};
use server::ServerState;
use settings::Database;

mod settings;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let settings = settings::Settings::new()?;
    let mut tasks = tokio::task::JoinSet::new();

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "conta={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let timezone = parse_timezone(settings.app.timezone.as_deref())?;
    let push = match settings.push.gateway_url {
        Some(url) => {
            tracing::info!("delivering push notifications through {url}");
            PushGateway::Http(HttpPushSender::new(url))
        }
        None => PushGateway::Log(LogPushSender),
    };
    if settings.cron.secret.is_none() {
        tracing::warn!("cron secret not configured, /api/cron endpoints will refuse to run");
    }

    if let Some(server) = settings.server {
        let cron_secret = settings.cron.secret;
        tasks.spawn(async move {
            tracing::info!("Found server settings...");
            let db = match parse_database(&server.database).await {
                Ok(db) => db,
                Err(err) => {
                    tracing::error!("failed to initialize database: {err}");
                    return;
                }
            };

            let engine = match engine::Engine::builder()
                .database(db.clone())
                .build()
                .await
            {
                Ok(engine) => engine,
                Err(err) => {
                    tracing::error!("failed to build engine from database: {err}");
                    return;
                }
            };
            let state = ServerState::new(engine, db)
                .push(push)
                .cron_secret(cron_secret)
                .timezone(timezone);

            let bind = server.bind.unwrap_or_else(|| "127.0.0.1".to_string());
            let addr = format!("{}:{}", bind, server.port);
            let listener = match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => listener,
                Err(err) => {
                    tracing::error!("failed to bind server listener: {err}");
                    return;
                }
            };
            if let Err(err) = server::run_with_listener(state, listener).await {
                tracing::error!("server failed: {err}");
            }
        });
    } else {
        tracing::warn!("no server settings found, nothing to run");
    }

    while tasks.join_next().await.is_some() {
        tasks.shutdown().await;
    }

    Ok(())
}

fn parse_timezone(timezone: Option<&str>) -> Result<Tz, BoxError> {
    match timezone {
        Some(name) => name
            .parse::<Tz>()
            .map_err(|err| format!("invalid timezone {name}: {err}").into()),
        None => Ok(chrono_tz::UTC),
    }
}

async fn parse_database(config: &Database) -> Result<sea_orm::DatabaseConnection, BoxError> {
    let url = match config {
        Database::Memory => String::from("sqlite::memory:"),
        Database::Sqlite(path) => format!("sqlite:{}?mode=rwc", path),
    };

    let database = sea_orm::Database::connect(url).await?;
    Migrator::up(&database, None).await?;
    Ok(database)
}
