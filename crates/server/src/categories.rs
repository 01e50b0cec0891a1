//! Categories API endpoints.

use api_types::{
    Created,
    category::{CategoryKind, CategoryList, CategoryNew, CategoryView},
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::StatusCode,
};

use crate::{ServerError, server::ServerState, user};

fn kind_to_engine(kind: CategoryKind) -> engine::CategoryKind {
    match kind {
        CategoryKind::Expense => engine::CategoryKind::Expense,
        CategoryKind::Income => engine::CategoryKind::Income,
    }
}

fn kind_from_engine(kind: engine::CategoryKind) -> CategoryKind {
    match kind {
        engine::CategoryKind::Expense => CategoryKind::Expense,
        engine::CategoryKind::Income => CategoryKind::Income,
    }
}

pub async fn category_new(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Json(payload): Json<CategoryNew>,
) -> Result<(StatusCode, Json<Created>), ServerError> {
    let category = state
        .engine
        .new_category(engine::CategoryCmd {
            user_id: user.username,
            name: payload.name,
            kind: kind_to_engine(payload.kind),
            color: payload.color,
            icon: payload.icon,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(Created { id: category.id })))
}

pub async fn list(
    Extension(user): Extension<user::Model>,
    State(state): State<ServerState>,
    Query(query): Query<CategoryList>,
) -> Result<Json<Vec<CategoryView>>, ServerError> {
    let categories = state
        .engine
        .list_categories(&user.username, query.kind.map(kind_to_engine))
        .await?;

    Ok(Json(
        categories
            .into_iter()
            .map(|category| CategoryView {
                id: category.id,
                name: category.name,
                kind: kind_from_engine(category.kind),
                color: category.color,
                icon: category.icon,
            })
            .collect(),
    ))
}
