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
    auth::{
        handlers::is_valid_email, password::hash_password, repo::create_user, session::Principal,
    },
    db::Gateway,
    error::{AppError, UNAUTHORIZED},
    state::AppState,
    web::{non_empty, FlashLevel, PageResult, RequestContext},
};

#[derive(Debug, Deserialize)]
pub struct NewUserForm {
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    #[serde(rename = "emailID")]
    pub email: Option<String>,
    #[serde(rename = "passwordHash")]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditUserForm {
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
}

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/create", get(create_page).post(create_user_account))
        .route("/users/:id/edit", get(edit_page).post(update_user))
        .route("/users/:id/delete", post(delete_user))
}

fn own_account(user: &Principal, user_id: i64) -> bool {
    if user.user_id == user_id {
        return true;
    }
    warn!(user_id = user.user_id, target = user_id, "access to another account rejected");
    false
}

#[instrument(skip(state, ctx))]
pub async fn list_users(State(state): State<AppState>, mut ctx: RequestContext) -> PageResult {
    ctx.require_login()?;
    let users = match repo::list(state.db.as_ref()).await {
        Ok(rows) => rows,
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Vec::new()
        }
    };
    Ok(ctx.render("users/list", json!({ "users": users })))
}

#[instrument(skip(ctx))]
pub async fn create_page(ctx: RequestContext) -> PageResult {
    ctx.require_login()?;
    Ok(ctx.render("users/create", json!({})))
}

#[instrument(skip(state, ctx, form))]
pub async fn create_user_account(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Form(form): Form<NewUserForm>,
) -> PageResult {
    ctx.require_login()?;
    match add_user(state.db.as_ref(), &form).await {
        Ok(()) => {
            info!("user created");
            ctx.flash(FlashLevel::Success, "User created");
            Ok(ctx.redirect("/users"))
        }
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Ok(ctx.render(
                "users/create",
                json!({
                    "firstName": non_empty(&form.first_name),
                    "lastName": non_empty(&form.last_name),
                    "emailID": non_empty(&form.email),
                }),
            ))
        }
    }
}

async fn add_user(db: &dyn Gateway, form: &NewUserForm) -> Result<(), AppError> {
    let email = non_empty(&form.email);
    if email.is_some_and(|e| !is_valid_email(e)) {
        return Err(AppError::Invalid("Invalid email".into()));
    }
    let password = form
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Invalid("Password is required".into()))?;
    let hash = hash_password(password)?;
    create_user(
        db,
        non_empty(&form.first_name),
        non_empty(&form.last_name),
        email,
        &hash,
    )
    .await?;
    Ok(())
}

#[instrument(skip(state, ctx))]
pub async fn edit_page(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(user_id): Path<i64>,
) -> PageResult {
    let user = ctx.require_login()?;
    if !own_account(&user, user_id) {
        return Err(ctx.deny(UNAUTHORIZED));
    }
    match repo::name_fields(state.db.as_ref(), user_id).await {
        Ok(Some(names)) => Ok(ctx.render(
            "users/edit",
            json!({ "userID": user_id, "user": names }),
        )),
        Ok(None) => {
            ctx.flash(FlashLevel::Error, "User not found");
            Ok(ctx.redirect("/users"))
        }
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Ok(ctx.redirect("/users"))
        }
    }
}

#[instrument(skip(state, ctx, form))]
pub async fn update_user(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(user_id): Path<i64>,
    Form(form): Form<EditUserForm>,
) -> PageResult {
    let user = ctx.require_login()?;
    if !own_account(&user, user_id) {
        return Err(ctx.deny(UNAUTHORIZED));
    }
    let first = non_empty(&form.first_name);
    let last = non_empty(&form.last_name);
    match repo::update(state.db.as_ref(), user_id, first, last).await {
        Ok(()) => {
            info!(user_id, "user updated");
            ctx.flash(FlashLevel::Success, "User updated");
            Ok(ctx.redirect("/users"))
        }
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Ok(ctx.render(
                "users/edit",
                json!({
                    "userID": user_id,
                    "user": { "firstname": first, "lastname": last },
                }),
            ))
        }
    }
}

#[instrument(skip(state, ctx))]
pub async fn delete_user(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Path(user_id): Path<i64>,
) -> PageResult {
    let user = ctx.require_login()?;
    if !own_account(&user, user_id) {
        return Err(ctx.deny(UNAUTHORIZED));
    }
    match repo::delete(state.db.as_ref(), user_id).await {
        Ok(()) => {
            info!(user_id, "account deleted");
            ctx.sign_out();
            ctx.flash(FlashLevel::Info, "Account deleted");
            Ok(ctx.redirect("/login"))
        }
        Err(e) => {
            ctx.flash(FlashLevel::Error, e.to_string());
            Ok(ctx.redirect("/users"))
        }
    }
}
