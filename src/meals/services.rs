//! Meal writes that span several statements, each run as one transaction.

use tracing::debug;

use super::dto::MealItem;
use crate::db::{rows::int_field, DataAccessError, Gateway, Param, UnitOfWork};

const LAST_MEAL_SQL: &str =
    "SELECT meallogid FROM meal_log WHERE userid = ? ORDER BY meallogid DESC LIMIT 1";

async fn add_items(
    tx: &mut dyn UnitOfWork,
    meal_id: i64,
    items: &[MealItem],
) -> Result<(), DataAccessError> {
    for item in items {
        tx.call_procedure(
            "sp_add_meal_item",
            &[meal_id.into(), item.food_id.into(), item.quantity.into()],
        )
        .await?;
    }
    Ok(())
}

/// Creates the meal header and its items; returns the new meal id.
pub async fn create_meal_with_items(
    db: &dyn Gateway,
    user_id: i64,
    meal_type: Option<&str>,
    log_time: Option<&str>,
    items: &[MealItem],
) -> Result<i64, DataAccessError> {
    let mut tx = db.begin().await?;
    tx.call_procedure(
        "sp_create_meal",
        &[user_id.into(), Param::from(meal_type), Param::from(log_time)],
    )
    .await?;

    let last = tx.run_query(LAST_MEAL_SQL, &[user_id.into()]).await?;
    let meal_id = last
        .first()
        .and_then(|r| int_field(r, "meallogid"))
        .ok_or_else(|| DataAccessError::Shape("no meal log row after insert".into()))?;

    add_items(tx.as_mut(), meal_id, items).await?;
    tx.commit().await?;
    debug!(meal_id, items = items.len(), "meal created");
    Ok(meal_id)
}

/// Rewrites the meal header and replaces all of its items.
pub async fn update_meal_with_items(
    db: &dyn Gateway,
    meal_id: i64,
    meal_type: Option<&str>,
    log_time: Option<&str>,
    items: &[MealItem],
) -> Result<(), DataAccessError> {
    let mut tx = db.begin().await?;
    tx.call_procedure(
        "sp_update_meal",
        &[meal_id.into(), Param::from(meal_type), Param::from(log_time)],
    )
    .await?;
    tx.call_procedure("sp_clear_meal_items", &[meal_id.into()])
        .await?;
    add_items(tx.as_mut(), meal_id, items).await?;
    tx.commit().await?;
    debug!(meal_id, items = items.len(), "meal updated");
    Ok(())
}
