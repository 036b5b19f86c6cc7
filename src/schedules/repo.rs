use crate::db::{rows::int_field, DataAccessError, Gateway, Param, Row};

pub async fn list_by_user(db: &dyn Gateway, user_id: i64) -> Result<Vec<Row>, DataAccessError> {
    db.call_procedure("sp_list_schedules_by_user", &[user_id.into()])
        .await
}

pub async fn create(db: &dyn Gateway, user_id: i64, name: Option<&str>) -> Result<(), DataAccessError> {
    db.call_procedure("sp_create_schedule", &[user_id.into(), Param::from(name)])
        .await?;
    Ok(())
}

pub async fn delete(db: &dyn Gateway, schedule_id: i64) -> Result<(), DataAccessError> {
    db.call_procedure("sp_delete_schedule", &[schedule_id.into()])
        .await?;
    Ok(())
}

/// Whether `schedule_id` is among the user's schedules.
pub async fn owns_schedule(
    db: &dyn Gateway,
    user_id: i64,
    schedule_id: i64,
) -> Result<bool, DataAccessError> {
    let rows = list_by_user(db, user_id).await?;
    Ok(rows
        .iter()
        .any(|r| int_field(r, "scheduleid") == Some(schedule_id)))
}
