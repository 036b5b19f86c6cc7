use crate::db::{DataAccessError, Gateway, Param, Row};

const NAME_SQL: &str = "SELECT firstname, lastname FROM user WHERE userid = ?";

pub async fn list(db: &dyn Gateway) -> Result<Vec<Row>, DataAccessError> {
    db.call_procedure("sp_list_users", &[]).await
}

/// First and last name of a user, if the user exists.
pub async fn name_fields(db: &dyn Gateway, user_id: i64) -> Result<Option<Row>, DataAccessError> {
    let rows = db.run_query(NAME_SQL, &[user_id.into()]).await?;
    Ok(rows.into_iter().next())
}

pub async fn update(
    db: &dyn Gateway,
    user_id: i64,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<(), DataAccessError> {
    db.call_procedure(
        "sp_update_user",
        &[user_id.into(), Param::from(first_name), Param::from(last_name)],
    )
    .await?;
    Ok(())
}

pub async fn delete(db: &dyn Gateway, user_id: i64) -> Result<(), DataAccessError> {
    db.call_procedure("sp_delete_user", &[user_id.into()]).await?;
    Ok(())
}
