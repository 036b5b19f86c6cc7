use axum::{
    extract::State,
    routing::get,
    Form, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{LoginForm, RegisterForm},
        password::{hash_password, verify_password},
        repo,
        session::Principal,
    },
    db::Gateway,
    error::AppError,
    state::AppState,
    web::{non_empty, FlashLevel, PageResult, RequestContext},
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/welcome", get(welcome))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
        .route("/register", get(register_page).post(register))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(ctx))]
pub async fn welcome(ctx: RequestContext) -> PageResult {
    if ctx.is_logged_in() {
        return Ok(ctx.redirect("/"));
    }
    Ok(ctx.render("welcome", json!({})))
}

#[instrument(skip(ctx))]
pub async fn login_page(ctx: RequestContext) -> PageResult {
    Ok(ctx.render("auth/login", json!({})))
}

#[instrument(skip(state, ctx, form))]
pub async fn login(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Form(form): Form<LoginForm>,
) -> PageResult {
    let email = non_empty(&form.email).unwrap_or_default().to_string();
    let password = form.password.unwrap_or_default();

    match repo::find_by_email(state.db.as_ref(), &email).await {
        Ok(Some(user))
            if user
                .passwordhash
                .as_deref()
                .is_some_and(|hash| verify_password(&password, hash)) =>
        {
            let principal = Principal {
                user_id: user.userid,
                first_name: user.firstname.unwrap_or_default(),
            };
            if let Err(e) = ctx.sign_in(principal) {
                error!(error = %e, "session signing failed");
                ctx.flash(FlashLevel::Error, "Could not start a session");
                return Ok(ctx.render("auth/login", json!({ "email": email })));
            }
            info!(user_id = user.userid, "user logged in");
            ctx.flash(FlashLevel::Success, "Logged in");
            return Ok(ctx.redirect("/"));
        }
        Ok(Some(user)) => warn!(user_id = user.userid, "login invalid password"),
        Ok(None) => warn!(email = %email, "login unknown email"),
        Err(e) => error!(error = %e, "user lookup failed"),
    }

    ctx.flash(FlashLevel::Error, "Invalid credentials");
    Ok(ctx.render("auth/login", json!({ "email": email })))
}

#[instrument(skip(ctx))]
pub async fn logout(mut ctx: RequestContext) -> PageResult {
    if let Some(p) = ctx.principal() {
        info!(user_id = p.user_id, "user logged out");
    }
    ctx.sign_out();
    ctx.flash(FlashLevel::Info, "Logged out");
    Ok(ctx.redirect("/login"))
}

#[instrument(skip(ctx))]
pub async fn register_page(ctx: RequestContext) -> PageResult {
    Ok(ctx.render("auth/register", json!({})))
}

#[instrument(skip(state, ctx, form))]
pub async fn register(
    State(state): State<AppState>,
    mut ctx: RequestContext,
    Form(form): Form<RegisterForm>,
) -> PageResult {
    match register_user(state.db.as_ref(), &form).await {
        Ok(()) => {
            info!("user registered");
            ctx.flash(FlashLevel::Success, "Account created. Please log in.");
            Ok(ctx.redirect("/login"))
        }
        Err(e) => {
            warn!(error = %e, "registration failed");
            ctx.flash(FlashLevel::Error, e.to_string());
            Ok(ctx.render("auth/register", json!({})))
        }
    }
}

async fn register_user(db: &dyn Gateway, form: &RegisterForm) -> Result<(), AppError> {
    let email = non_empty(&form.email).ok_or_else(|| AppError::Invalid("Email is required".into()))?;
    if !is_valid_email(email) {
        return Err(AppError::Invalid("Invalid email".into()));
    }
    let password = form
        .password
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::Invalid("Password is required".into()))?;

    let hash = hash_password(password)?;
    repo::create_user(
        db,
        non_empty(&form.first_name),
        non_empty(&form.last_name),
        Some(email),
        &hash,
    )
    .await?;
    Ok(())
}
