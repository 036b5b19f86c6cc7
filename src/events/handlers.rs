use axum::{
    extract::{Path, State},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::repo::{self, NewEvent};
use crate::{
    db::Gateway,
    error::{AppError, UNAUTHORIZED},
    schedules::repo::owns_schedule,
    state::AppState,
    web::{optional_int, required_int, FlashLevel, PageResult, RequestContext},
};

#[derive(Debug, Deserialize)]
pub struct EventForm {
    #[serde(rename = "categoryID")]
    pub category_id: Option<String>,
    #[serde(rename = "eventTitle")]
    pub event_title: Option<String>,
    #[serde(rename = "startTime")]
    pub start_time: Option<String>,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteEventForm {
    #[serde(rename = "scheduleID")]
    pub schedule_id: Option<String>,
}

pub fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/events/:id", get(list_events))
        .route("/events/create/:id", get(create_page).post(create_event))
        .route("/events/:id/delete", post(delete_event))
}

async fn check_schedule(db: &dyn Gateway, user_id: i64, schedule_id: i64) -> Result<(), AppError> {
    if owns_schedule(db, user_id, schedule_id).await? {
        Ok(())
    } else {
        warn!(user_id, schedule_id, "schedule belongs to another user");
        Err(AppError::Unauthorized(UNAUTHORIZED))
    }
}

#[instrument(skip(state, ctx))]
pub async fn list_events(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(schedule_id): Path<i64>,
) -> PageResult {
    let user = ctx.require_login()?;
    let db = state.db.as_ref();
    if let Err(e) = check_schedule(db, user.user_id, schedule_id).await {
        return Err(ctx.refuse(e, ""));
    }

    let events = match repo::list_by_schedule(db, schedule_id).await {
        Ok(rows) => repo::with_durations(rows),
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Vec::new()
        }
    };
    Ok(ctx.render(
        "events/list",
        json!({ "events": events, "scheduleID": schedule_id }),
    ))
}

#[instrument(skip(state, ctx))]
pub async fn create_page(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(schedule_id): Path<i64>,
) -> PageResult {
    let user = ctx.require_login()?;
    let db = state.db.as_ref();
    if let Err(e) = check_schedule(db, user.user_id, schedule_id).await {
        return Err(ctx.refuse(e, ""));
    }
    let categories = load_categories(db, &mut ctx).await;
    Ok(ctx.render(
        "events/create",
        json!({ "scheduleID": schedule_id, "categories": categories }),
    ))
}

#[instrument(skip(state, ctx, form))]
pub async fn create_event(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(schedule_id): Path<i64>,
    Form(form): Form<EventForm>,
) -> PageResult {
    let user = ctx.require_login()?;
    let db = state.db.as_ref();
    if let Err(e) = check_schedule(db, user.user_id, schedule_id).await {
        return Err(ctx.refuse(e, ""));
    }
    let categories = load_categories(db, &mut ctx).await;

    let outcome = async {
        let event = NewEvent {
            schedule_id,
            category_id: optional_int(&form.category_id, "categoryID")?,
            title: form.event_title.clone(),
            start_time: form.start_time.clone(),
            end_time: form.end_time.clone(),
            description: form.description.clone(),
        };
        repo::create(db, event).await?;
        Ok::<_, AppError>(())
    }
    .await;

    match outcome {
        Ok(()) => {
            info!(user_id = user.user_id, schedule_id, "event created");
            ctx.flash(FlashLevel::Success, "Event created");
            Ok(ctx.redirect(&format!("/events/{schedule_id}")))
        }
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Ok(ctx.render(
                "events/create",
                json!({ "scheduleID": schedule_id, "categories": categories }),
            ))
        }
    }
}

#[instrument(skip(state, ctx, form))]
pub async fn delete_event(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(event_id): Path<i64>,
    Form(form): Form<DeleteEventForm>,
) -> PageResult {
    let user = ctx.require_login()?;
    let db = state.db.as_ref();

    let allowed = async {
        let schedule_id = required_int(&form.schedule_id, "scheduleID")?;
        check_schedule(db, user.user_id, schedule_id).await?;
        if !repo::schedule_has_event(db, schedule_id, event_id).await? {
            warn!(user_id = user.user_id, event_id, schedule_id, "event not in schedule");
            return Err(AppError::Unauthorized(UNAUTHORIZED));
        }
        Ok::<_, AppError>(())
    }
    .await;
    if let Err(e) = allowed {
        return Err(ctx.refuse(e, ""));
    }

    match repo::delete(db, event_id).await {
        Ok(()) => ctx.flash(FlashLevel::Success, "Event deleted"),
        Err(e) => ctx.flash(FlashLevel::Error, e.to_string()),
    }
    Ok(ctx.back())
}

async fn load_categories(db: &dyn Gateway, ctx: &mut RequestContext) -> Vec<crate::db::Row> {
    match repo::categories(db).await {
        Ok(rows) => rows,
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Vec::new()
        }
    }
}
