use axum::{
    extract::{Path, State},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};

use super::repo;
use crate::{
    error::UNAUTHORIZED,
    state::AppState,
    web::{non_empty, FlashLevel, PageResult, RequestContext},
};

#[derive(Debug, Deserialize)]
pub struct ScheduleForm {
    #[serde(rename = "scheduleName")]
    pub schedule_name: Option<String>,
}

pub fn schedule_routes() -> Router<AppState> {
    Router::new()
        .route("/schedules", get(list_schedules))
        .route("/schedules/create", get(create_page).post(create_schedule))
        .route("/schedules/:id/delete", post(delete_schedule))
}

#[instrument(skip(state, ctx))]
pub async fn list_schedules(State(state): State<AppState>, mut ctx: RequestContext) -> PageResult {
    let user = ctx.require_login()?;
    let schedules = match repo::list_by_user(state.db.as_ref(), user.user_id).await {
        Ok(rows) => rows,
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Vec::new()
        }
    };
    Ok(ctx.render("schedules/list", json!({ "schedules": schedules })))
}

#[instrument(skip(ctx))]
pub async fn create_page(ctx: RequestContext) -> PageResult {
    ctx.require_login()?;
    Ok(ctx.render("schedules/create", json!({})))
}

#[instrument(skip(state, ctx, form))]
pub async fn create_schedule(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Form(form): Form<ScheduleForm>,
) -> PageResult {
    let user = ctx.require_login()?;
    match repo::create(state.db.as_ref(), user.user_id, form.schedule_name.as_deref()).await {
        Ok(()) => {
            info!(user_id = user.user_id, "schedule created");
            ctx.flash(FlashLevel::Success, "Schedule created");
            Ok(ctx.redirect("/schedules"))
        }
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            let name = non_empty(&form.schedule_name);
            Ok(ctx.render("schedules/create", json!({ "scheduleName": name })))
        }
    }
}

#[instrument(skip(state, ctx))]
pub async fn delete_schedule(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(id): Path<i64>,
) -> PageResult {
    let user = ctx.require_login()?;
    let db = state.db.as_ref();

    match repo::owns_schedule(db, user.user_id, id).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = user.user_id, schedule_id = id, "delete of foreign schedule rejected");
            return Err(ctx.deny(UNAUTHORIZED));
        }
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            return Ok(ctx.redirect("/schedules"));
        }
    }

    match repo::delete(db, id).await {
        Ok(()) => ctx.flash(FlashLevel::Success, "Schedule deleted"),
        Err(e) => ctx.flash(FlashLevel::Error, e.to_string()),
    }
    Ok(ctx.redirect("/schedules"))
}
