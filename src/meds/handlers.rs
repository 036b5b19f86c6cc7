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
    db::{rows::int_field, split::Split, Gateway},
    error::{ensure_owner, AppError, UNAUTHORIZED, UNAUTHORIZED_OR_MISSING},
    state::AppState,
    web::{format::now_timestamp, non_empty, FlashLevel, PageResult, RequestContext},
};

#[derive(Debug, Deserialize)]
pub struct MedForm {
    #[serde(rename = "medName")]
    pub name: Option<String>,
    #[serde(rename = "Dosage")]
    pub dosage: Option<String>,
    #[serde(rename = "Frequency")]
    pub frequency: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct IntakeForm {
    #[serde(rename = "takenTime")]
    pub taken_time: Option<String>,
    #[serde(rename = "isSkipped")]
    pub is_skipped: Option<String>,
}

impl IntakeForm {
    /// Submitted time, or now when left blank.
    fn taken_at(&self) -> String {
        non_empty(&self.taken_time)
            .map(str::to_string)
            .unwrap_or_else(now_timestamp)
    }

    fn skipped(&self) -> bool {
        non_empty(&self.is_skipped).is_some()
    }
}

pub fn med_routes() -> Router<AppState> {
    Router::new()
        .route("/meds/:id", get(list_meds))
        .route("/meds/detail/:id", get(med_detail))
        .route("/meds/create/:id", get(create_page).post(create_med))
        .route("/meds/log/:id", post(log_med))
}

async fn owned_med(db: &dyn Gateway, user_id: i64, medication_id: i64) -> Result<Split, AppError> {
    let logs = repo::logs(db, medication_id).await?;
    let owner = logs.header.as_ref().and_then(|h| int_field(h, "userid"));
    ensure_owner(owner, user_id, UNAUTHORIZED_OR_MISSING)?;
    Ok(logs)
}

#[instrument(skip(state, ctx))]
pub async fn list_meds(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(user_id): Path<i64>,
) -> PageResult {
    let user = ctx.require_login()?;
    if user.user_id != user_id {
        warn!(user_id = user.user_id, target = user_id, "medication list of another user");
        return Err(ctx.deny(UNAUTHORIZED));
    }
    let meds = match repo::list_by_user(state.db.as_ref(), user_id).await {
        Ok(rows) => rows,
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Vec::new()
        }
    };
    Ok(ctx.render("meds/list", json!({ "meds": meds, "userID": user_id })))
}

#[instrument(skip(state, ctx))]
pub async fn med_detail(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(medication_id): Path<i64>,
) -> PageResult {
    let user = ctx.require_login()?;
    match owned_med(state.db.as_ref(), user.user_id, medication_id).await {
        Ok(Split { header, items }) => {
            Ok(ctx.render("meds/detail", json!({ "med": header, "logs": items })))
        }
        Err(e) => Err(ctx.refuse(e, "")),
    }
}

#[instrument(skip(ctx))]
pub async fn create_page(ctx: RequestContext, Path(user_id): Path<i64>) -> PageResult {
    let user = ctx.require_login()?;
    if user.user_id != user_id {
        return Err(ctx.deny(UNAUTHORIZED));
    }
    Ok(ctx.render("meds/create", json!({ "userID": user_id })))
}

#[instrument(skip(state, ctx, form))]
pub async fn create_med(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(user_id): Path<i64>,
    Form(form): Form<MedForm>,
) -> PageResult {
    let user = ctx.require_login()?;
    if user.user_id != user_id {
        return Err(ctx.deny(UNAUTHORIZED));
    }
    let result = repo::create(
        state.db.as_ref(),
        user_id,
        non_empty(&form.name),
        non_empty(&form.dosage),
        non_empty(&form.frequency),
    )
    .await;

    match result {
        Ok(()) => {
            info!(user_id, "medication saved");
            ctx.flash(FlashLevel::Success, "Medication saved");
            Ok(ctx.redirect(&format!("/meds/{user_id}")))
        }
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Ok(ctx.render(
                "meds/create",
                json!({
                    "userID": user_id,
                    "medName": non_empty(&form.name),
                    "Dosage": non_empty(&form.dosage),
                    "Frequency": non_empty(&form.frequency),
                }),
            ))
        }
    }
}

#[instrument(skip(state, ctx, form))]
pub async fn log_med(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(medication_id): Path<i64>,
    Form(form): Form<IntakeForm>,
) -> PageResult {
    let user = ctx.require_login()?;
    let db = state.db.as_ref();
    if let Err(e) = owned_med(db, user.user_id, medication_id).await {
        return Err(ctx.refuse(e, ""));
    }

    let taken_at = form.taken_at();
    match repo::log_intake(db, medication_id, &taken_at, form.skipped()).await {
        Ok(()) => ctx.flash(FlashLevel::Success, "Medication logged"),
        Err(e) => ctx.flash(FlashLevel::Error, e.to_string()),
    }
    Ok(ctx.back())
}
