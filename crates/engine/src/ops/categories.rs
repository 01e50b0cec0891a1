use sea_orm::{ActiveValue, QueryFilter, QueryOrder, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    Category, CategoryCmd, CategoryKind, EngineError, ResultEngine, categories,
    util::{normalize_name_key, normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    /// Create a category. Names collide ignoring case and accents, so
    /// "Saúde" and "saude" cannot coexist for the same user.
    pub async fn new_category(&self, cmd: CategoryCmd) -> ResultEngine<Category> {
        let name = normalize_required_name(&cmd.name, "category")?;
        let name_norm = normalize_name_key(&name);

        with_tx!(self, |db_tx| {
            if let Some(existing) = categories::Entity::find()
                .filter(categories::Column::UserId.eq(cmd.user_id.as_str()))
                .filter(categories::Column::NameNorm.eq(name_norm.as_str()))
                .one(&db_tx)
                .await?
            {
                return Err(EngineError::ExistingKey(existing.name));
            }

            let model = categories::ActiveModel {
                id: ActiveValue::Set(Uuid::new_v4()),
                user_id: ActiveValue::Set(cmd.user_id.clone()),
                name: ActiveValue::Set(name.clone()),
                name_norm: ActiveValue::Set(name_norm.clone()),
                kind: ActiveValue::Set(cmd.kind.as_str().to_string()),
                color: ActiveValue::Set(normalize_optional_text(cmd.color.as_deref())),
                icon: ActiveValue::Set(normalize_optional_text(cmd.icon.as_deref())),
            }
            .insert(&db_tx)
            .await?;

            Category::try_from(model)
        })
    }

    pub async fn list_categories(
        &self,
        user_id: &str,
        kind: Option<CategoryKind>,
    ) -> ResultEngine<Vec<Category>> {
        let mut query =
            categories::Entity::find().filter(categories::Column::UserId.eq(user_id));
        if let Some(kind) = kind {
            query = query.filter(categories::Column::Kind.eq(kind.as_str()));
        }
        query
            .order_by_asc(categories::Column::NameNorm)
            .all(&self.database)
            .await?
            .into_iter()
            .map(Category::try_from)
            .collect()
    }
}
