use crate::db::{
    split::{split, Split, MED_LOGS},
    DataAccessError, Gateway, Param, Row,
};

pub async fn list_by_user(db: &dyn Gateway, user_id: i64) -> Result<Vec<Row>, DataAccessError> {
    db.call_procedure("sp_list_meds", &[user_id.into()]).await
}

/// Medication header and its intake log.
pub async fn logs(db: &dyn Gateway, medication_id: i64) -> Result<Split, DataAccessError> {
    let rows = db
        .call_procedure("sp_get_med_logs", &[medication_id.into()])
        .await?;
    Ok(split(rows, MED_LOGS))
}

pub async fn create(
    db: &dyn Gateway,
    user_id: i64,
    name: Option<&str>,
    dosage: Option<&str>,
    frequency: Option<&str>,
) -> Result<(), DataAccessError> {
    db.call_procedure(
        "sp_create_med",
        &[
            user_id.into(),
            Param::from(name),
            Param::from(dosage),
            Param::from(frequency),
        ],
    )
    .await?;
    Ok(())
}

pub async fn log_intake(
    db: &dyn Gateway,
    medication_id: i64,
    taken_at: &str,
    skipped: bool,
) -> Result<(), DataAccessError> {
    db.call_procedure(
        "sp_log_med",
        &[medication_id.into(), taken_at.into(), skipped.into()],
    )
    .await?;
    Ok(())
}
