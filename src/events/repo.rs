use crate::db::{
    rows::{int_field, text_field},
    DataAccessError, Gateway, Row,
};
use crate::web::format::format_duration;

const CATEGORIES_SQL: &str =
    "SELECT categoryid, categoryname FROM event_category ORDER BY categoryname";

#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub schedule_id: i64,
    pub category_id: Option<i64>,
    pub title: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub description: Option<String>,
}

pub async fn list_by_schedule(db: &dyn Gateway, schedule_id: i64) -> Result<Vec<Row>, DataAccessError> {
    db.call_procedure("sp_list_events_by_schedule", &[schedule_id.into()])
        .await
}

pub async fn categories(db: &dyn Gateway) -> Result<Vec<Row>, DataAccessError> {
    db.run_query(CATEGORIES_SQL, &[]).await
}

pub async fn create(db: &dyn Gateway, event: NewEvent) -> Result<(), DataAccessError> {
    db.call_procedure(
        "sp_create_event",
        &[
            event.schedule_id.into(),
            event.category_id.into(),
            event.title.into(),
            event.start_time.into(),
            event.end_time.into(),
            event.description.into(),
        ],
    )
    .await?;
    Ok(())
}

pub async fn delete(db: &dyn Gateway, event_id: i64) -> Result<(), DataAccessError> {
    db.call_procedure("sp_delete_event", &[event_id.into()])
        .await?;
    Ok(())
}

/// Whether the schedule's event list contains `event_id`.
pub async fn schedule_has_event(
    db: &dyn Gateway,
    schedule_id: i64,
    event_id: i64,
) -> Result<bool, DataAccessError> {
    let rows = list_by_schedule(db, schedule_id).await?;
    Ok(rows.iter().any(|r| int_field(r, "eventid") == Some(event_id)))
}

/// Adds a `duration` display value to every event row.
pub fn with_durations(rows: Vec<Row>) -> Vec<Row> {
    rows.into_iter()
        .map(|mut row| {
            let duration = match (text_field(&row, "starttime"), text_field(&row, "endtime")) {
                (Some(start), Some(end)) => format_duration(&start, &end),
                _ => "-".to_string(),
            };
            row.insert("duration".into(), duration.into());
            row
        })
        .collect()
}
