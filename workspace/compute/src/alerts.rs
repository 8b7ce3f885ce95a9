use chrono::NaiveDate;
use model::entities::alert;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, instrument};

use crate::error::Result;

/// The user's alerts dated exactly `today`.
#[instrument(skip(db))]
pub async fn fired_on<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    today: NaiveDate,
) -> Result<Vec<alert::Model>> {
    let alerts = alert::Entity::find()
        .filter(alert::Column::UserId.eq(user_id))
        .filter(alert::Column::AlertDate.eq(today))
        .order_by_asc(alert::Column::Id)
        .all(db)
        .await?;
    debug!("{} alert(s) fired for user {} on {}", alerts.len(), user_id, today);
    Ok(alerts)
}

/// The user's alerts dated after `today`, soonest first.
#[instrument(skip(db))]
pub async fn upcoming<C: ConnectionTrait>(
    db: &C,
    user_id: i32,
    today: NaiveDate,
) -> Result<Vec<alert::Model>> {
    let alerts = alert::Entity::find()
        .filter(alert::Column::UserId.eq(user_id))
        .filter(alert::Column::AlertDate.gt(today))
        .order_by_asc(alert::Column::AlertDate)
        .order_by_asc(alert::Column::Id)
        .all(db)
        .await?;
    debug!("{} upcoming alert(s) for user {}", alerts.len(), user_id);
    Ok(alerts)
}
