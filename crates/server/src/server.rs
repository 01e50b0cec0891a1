use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post, put},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{
    accounts, budgets, calendar, categories, cron, entries, faturas, push, transfers, user,
};
use engine::{Engine, LogPushSender, PushGateway};

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
    pub push: PushGateway,
    /// Bearer secret of the cron endpoints; `None` disables them.
    pub cron_secret: Option<String>,
    /// Zone that decides which calendar day "today" is.
    pub timezone: Tz,
}

impl ServerState {
    pub fn new(engine: Engine, db: DatabaseConnection) -> Self {
        Self {
            engine: Arc::new(engine),
            db,
            push: PushGateway::Log(LogPushSender),
            cron_secret: None,
            timezone: chrono_tz::UTC,
        }
    }

    pub fn push(mut self, push: PushGateway) -> Self {
        self.push = push;
        self
    }

    pub fn cron_secret(mut self, secret: Option<String>) -> Self {
        self.cron_secret = secret.filter(|secret| !secret.is_empty());
        self
    }

    pub fn timezone(mut self, timezone: Tz) -> Self {
        self.timezone = timezone;
        self
    }

    pub(crate) fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(StatusCode::UNAUTHORIZED);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|err| {
            tracing::error!("failed to look up user: {err}");
            StatusCode::UNAUTHORIZED
        })?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub fn router(state: ServerState) -> Router {
    let user_routes = Router::new()
        .route(
            "/accounts",
            post(accounts::account_new).get(accounts::list),
        )
        .route("/accounts/reconcile", post(accounts::reconcile_all))
        .route("/accounts/{id}", axum::routing::patch(accounts::update))
        .route("/accounts/{id}/balance", get(accounts::balance))
        .route("/accounts/{id}/reconcile", post(accounts::reconcile))
        .route(
            "/categories",
            post(categories::category_new).get(categories::list),
        )
        .route("/entries", post(entries::entry_new).get(entries::list))
        .route("/entries/export", get(entries::export_csv))
        .route(
            "/entries/{id}",
            axum::routing::patch(entries::update).delete(entries::remove),
        )
        .route("/entries/{id}/pay", post(entries::pay))
        .route("/entries/{id}/unpay", post(entries::unpay))
        .route("/incomes", post(entries::income_new).get(entries::incomes))
        .route("/incomes/{id}", delete(entries::income_remove))
        .route("/incomes/{id}/receive", post(entries::receive))
        .route("/transfers", post(transfers::transfer_new))
        .route("/transfers/{id}", delete(transfers::remove))
        .route("/budgets", put(budgets::set))
        .route("/budgets/copy", post(budgets::copy))
        .route("/budgets/{year_month}", get(budgets::summary))
        .route(
            "/budgets/{year_month}/{category_id}",
            delete(budgets::remove),
        )
        .route("/faturas", get(faturas::list))
        .route("/faturas/backfill", post(faturas::backfill))
        .route("/faturas/{id}/pay", post(faturas::pay))
        .route("/faturas/{id}/unpay", post(faturas::unpay))
        .route("/events", post(calendar::event_new))
        .route("/events/{id}/status", post(calendar::event_status))
        .route("/tasks", post(calendar::task_new))
        .route("/tasks/{id}/status", post(calendar::task_status))
        .route("/calendar", get(calendar::calendar))
        .route("/recurrence/expand", post(calendar::expand_rule))
        .route(
            "/push-tokens",
            post(push::register).delete(push::remove),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth));

    // Cron routes carry their own bearer secret instead of user credentials.
    let cron_routes = Router::new()
        .route("/api/cron/daily", get(cron::daily))
        .route("/api/cron/notifications", get(cron::notifications));

    user_routes.merge(cron_routes).with_state(state)
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}
