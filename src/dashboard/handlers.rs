use axum::{extract::State, routing::get, Router};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::{
    db::{
        split::{group_by_header, Group, MEAL_ITEMS},
        Gateway, Row,
    },
    meals::repo as meals,
    meds::repo as meds,
    schedules::repo as schedules,
    state::AppState,
    web::{format::today, FlashLevel, PageResult, RequestContext},
};

const RECENT_MEALS: i64 = 5;

/// Everything the home page shows for one user.
#[derive(Debug, Default, Serialize)]
pub struct Dashboard {
    pub schedules: Vec<Row>,
    pub meals: Vec<Row>,
    pub meds: Vec<Row>,
    #[serde(rename = "recentMeals")]
    pub recent_meals: Vec<Group>,
    #[serde(rename = "macrosToday")]
    pub macros_today: Option<Row>,
}

pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/", get(index))
}

/// Loads the dashboard. Widget failures degrade to empty values; the
/// returned messages are shown to the user.
pub async fn load(db: &dyn Gateway, user_id: i64) -> (Dashboard, Vec<String>) {
    let mut notices = Vec::new();
    let mut view = Dashboard::default();

    match schedules::list_by_user(db, user_id).await {
        Ok(rows) => view.schedules = rows,
        Err(e) => notices.push(e.to_string()),
    }
    match meals::list_by_user(db, user_id).await {
        Ok(rows) => view.meals = rows,
        Err(e) => notices.push(e.to_string()),
    }
    match meds::list_by_user(db, user_id).await {
        Ok(rows) => view.meds = rows,
        Err(e) => {
            if e.is_missing_procedure() {
                warn!(error = %e, "medication procedure missing");
            }
            notices.push(format!("Medications procedure missing or failed: {e}"));
        }
    }

    match meals::recent_items(db, user_id, RECENT_MEALS).await {
        Ok(rows) => view.recent_meals = group_by_header(rows, MEAL_ITEMS, "meallogid"),
        Err(e) => debug!(error = %e, "recent meals unavailable"),
    }
    match meals::daily_macros(db, user_id, &today()).await {
        Ok(row) => view.macros_today = row,
        Err(e) => debug!(error = %e, "daily macros unavailable"),
    }

    (view, notices)
}

#[instrument(skip(state, ctx))]
pub async fn index(State(state): State<AppState>, mut ctx: RequestContext) -> PageResult {
    let Some(user) = ctx.principal().cloned() else {
        return Ok(ctx.redirect("/welcome"));
    };

    let (view, notices) = load(state.db.as_ref(), user.user_id).await;
    for notice in notices {
        ctx.flash(FlashLevel::Error, notice);
    }
    let context = serde_json::to_value(&view).unwrap_or_default();
    Ok(ctx.render("index", context))
}
