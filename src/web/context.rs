use std::{convert::Infallible, sync::Arc};

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts, StatusCode, Uri},
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{json, Value};
use tracing::{debug, error};

use super::{
    flash::{FlashLevel, FlashMessage},
    format::today,
    render::Renderer,
};
use crate::{
    auth::session::{Principal, SessionKeys},
    error::AppError,
    state::AppState,
};

pub const SESSION_COOKIE: &str = "wefit_session";
pub const FLASH_COOKIE: &str = "wefit_flash";

pub type PageResult = Result<Response, Response>;

/// Per-request view of the session: the principal, pending flash messages
/// and the cookie jar the response is built from.
pub struct RequestContext {
    jar: CookieJar,
    keys: SessionKeys,
    renderer: Arc<dyn Renderer>,
    principal: Option<Principal>,
    flashes: Vec<FlashMessage>,
    referer: Option<String>,
}

#[async_trait]
impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let keys = SessionKeys::from_ref(state);

        let principal = jar.get(SESSION_COOKIE).and_then(|c| {
            keys.verify_session(c.value())
                .map_err(|e| debug!(error = %e, "ignoring invalid session cookie"))
                .ok()
        });
        let flashes = jar
            .get(FLASH_COOKIE)
            .and_then(|c| keys.verify_flashes(c.value()).ok())
            .unwrap_or_default();
        let referer = parts
            .headers
            .get(header::REFERER)
            .and_then(|v| v.to_str().ok())
            .and_then(local_path);

        Ok(Self {
            jar,
            keys,
            renderer: state.renderer.clone(),
            principal,
            flashes,
            referer,
        })
    }
}

impl RequestContext {
    pub fn principal(&self) -> Option<&Principal> {
        self.principal.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.principal.is_some()
    }

    /// The logged-in principal, or a redirect to the login page.
    pub fn require_login(&self) -> Result<Principal, Response> {
        match &self.principal {
            Some(p) => Ok(p.clone()),
            None => {
                let mut flashes = self.flashes.clone();
                flashes.push(FlashMessage::new(FlashLevel::Error, "Please log in"));
                Err(redirect_with(self.jar.clone(), &self.keys, &flashes, "/login"))
            }
        }
    }

    pub fn flash(&mut self, level: FlashLevel, message: impl Into<String>) {
        self.flashes.push(FlashMessage::new(level, message));
    }

    pub fn sign_in(&mut self, principal: Principal) -> anyhow::Result<()> {
        let token = self.keys.sign_session(&principal)?;
        self.jar = std::mem::take(&mut self.jar).add(cookie(SESSION_COOKIE, token));
        self.principal = Some(principal);
        Ok(())
    }

    /// Drops the principal and every pending flash message.
    pub fn sign_out(&mut self) {
        self.jar = std::mem::take(&mut self.jar).remove(removal(SESSION_COOKIE));
        self.principal = None;
        self.flashes.clear();
    }

    /// Renders `template` with `context` merged over the common page values,
    /// consuming the pending flash messages.
    pub fn render(self, template: &str, context: Value) -> Response {
        let mut page = json!({
            "uid": self.principal.as_ref().map(|p| p.user_id),
            "firstName": self.principal.as_ref().map(|p| p.first_name.clone()),
            "today": today(),
            "flashes": self.flashes,
        });
        if let (Some(page), Value::Object(extra)) = (page.as_object_mut(), context) {
            page.extend(extra);
        }

        match self.renderer.render(template, &page) {
            Ok(body) => {
                let jar = self.jar.remove(removal(FLASH_COOKIE));
                (jar, Html(body)).into_response()
            }
            Err(e) => {
                error!(error = %e, template, "render failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }

    pub fn redirect(self, to: &str) -> Response {
        redirect_with(self.jar, &self.keys, &self.flashes, to)
    }

    /// Redirects to the referring page of this application, or home.
    pub fn back(self) -> Response {
        let to = self.referer.clone().unwrap_or_else(|| "/".to_string());
        self.redirect(&to)
    }

    /// Authorization failure: error flash and a redirect home.
    pub fn deny(mut self, message: &str) -> Response {
        self.flash(FlashLevel::Error, message);
        self.redirect("/")
    }

    /// Turns a failed ownership or lookup step into a response. Authorization
    /// failures deny; anything else flashes `prefix` plus the error and goes home.
    pub fn refuse(mut self, err: AppError, prefix: &str) -> Response {
        match err {
            AppError::Unauthorized(msg) => self.deny(msg),
            other => {
                self.flash(FlashLevel::Error, format!("{prefix}{other}"));
                self.redirect("/")
            }
        }
    }
}

fn cookie(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn removal(name: &'static str) -> Cookie<'static> {
    Cookie::build(name).path("/").build()
}

fn redirect_with(jar: CookieJar, keys: &SessionKeys, flashes: &[FlashMessage], to: &str) -> Response {
    let jar = if flashes.is_empty() {
        jar.remove(removal(FLASH_COOKIE))
    } else {
        match keys.sign_flashes(flashes) {
            Ok(token) => jar.add(cookie(FLASH_COOKIE, token)),
            Err(e) => {
                error!(error = %e, "could not sign flash messages");
                jar
            }
        }
    };
    (jar, Redirect::to(to)).into_response()
}

/// Path and query of a referer pointing back into this application.
fn local_path(referer: &str) -> Option<String> {
    let uri: Uri = referer.parse().ok()?;
    let path = uri.path_and_query()?.as_str();
    if path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\") {
        Some(path.to_string())
    } else {
        None
    }
}
