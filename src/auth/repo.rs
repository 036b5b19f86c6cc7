use crate::auth::dto::UserRecord;
use crate::db::{rows::decode, DataAccessError, Gateway, Param};

/// Find a user by email.
pub async fn find_by_email(
    db: &dyn Gateway,
    email: &str,
) -> Result<Option<UserRecord>, DataAccessError> {
    let rows = db
        .call_procedure("sp_get_user_by_email", &[email.into()])
        .await?;
    rows.into_iter().next().map(decode).transpose()
}

/// Create a user; `password_hash` must already be hashed.
pub async fn create_user(
    db: &dyn Gateway,
    first_name: Option<&str>,
    last_name: Option<&str>,
    email: Option<&str>,
    password_hash: &str,
) -> Result<(), DataAccessError> {
    db.call_procedure(
        "sp_create_user",
        &[
            Param::from(first_name),
            Param::from(last_name),
            Param::from(email),
            Param::from(password_hash),
        ],
    )
    .await?;
    Ok(())
}
