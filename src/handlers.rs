pub mod alerts;
pub mod budgets;
pub mod categories;
pub mod entries;
pub mod goals;
pub mod health;
pub mod users;

use crate::auth::AuthUser;
use crate::error::ApiError;
use model::entities::category;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};
use tracing::debug;

/// The user a request acts for: the caller, or `usuario_id` when it names
/// the caller.
pub(crate) fn acting_user(auth: &AuthUser, usuario_id: Option<i32>) -> Result<i32, ApiError> {
    if let Some(id) = usuario_id {
        auth.ensure_same(id)?;
    }
    Ok(auth.id())
}

/// Category `category_id` if it belongs to `user_id`.
pub(crate) async fn owned_category<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    category_id: i32,
) -> Result<category::Model, ApiError> {
    category::Entity::find_by_id(category_id)
        .filter(category::Column::UserId.eq(user_id))
        .one(db)
        .await?
        .ok_or_else(|| {
            debug!("Category {} not found for user {}", category_id, user_id);
            ApiError::NotFound("Category")
        })
}
