use crate::db::{
    split::{split, Split, MEAL_ITEMS},
    DataAccessError, Gateway, Row,
};

pub async fn list_by_user(db: &dyn Gateway, user_id: i64) -> Result<Vec<Row>, DataAccessError> {
    db.call_procedure("sp_list_meals", &[user_id.into()]).await
}

/// Meal header and its food items.
pub async fn detail(db: &dyn Gateway, meal_id: i64) -> Result<Split, DataAccessError> {
    let rows = db
        .call_procedure("sp_get_meal_detail", &[meal_id.into()])
        .await?;
    Ok(split(rows, MEAL_ITEMS))
}

pub async fn delete(db: &dyn Gateway, meal_id: i64) -> Result<(), DataAccessError> {
    db.call_procedure("sp_delete_meal", &[meal_id.into()])
        .await?;
    Ok(())
}

pub async fn recent_items(db: &dyn Gateway, user_id: i64, limit: i64) -> Result<Vec<Row>, DataAccessError> {
    db.call_procedure(
        "sp_list_recent_meal_items_by_user",
        &[user_id.into(), limit.into()],
    )
    .await
}

pub async fn daily_macros(db: &dyn Gateway, user_id: i64, day: &str) -> Result<Option<Row>, DataAccessError> {
    let rows = db
        .call_procedure("sp_user_daily_macros", &[user_id.into(), day.into()])
        .await?;
    Ok(rows.into_iter().next())
}
