//! Helpers for driving the router in tests.

use axum::{
    body::Body,
    extract::FromRef,
    http::{header, Method, Request},
    response::Response,
};
use tower::ServiceExt;

use crate::{
    app::build_app,
    auth::session::{Principal, SessionKeys},
    db::fake::ScriptedGateway,
    state::AppState,
    web::{
        context::{FLASH_COOKIE, SESSION_COOKIE},
        flash::FlashMessage,
    },
};

pub struct TestRequest {
    method: Method,
    uri: String,
    form: Option<String>,
    user: Option<i64>,
    referer: Option<String>,
    cookies: Vec<String>,
}

pub fn request(method: Method, uri: &str) -> TestRequest {
    TestRequest {
        method,
        uri: uri.to_string(),
        form: None,
        user: None,
        referer: None,
        cookies: Vec::new(),
    }
}

impl TestRequest {
    pub fn form(mut self, body: &str) -> Self {
        self.form = Some(body.to_string());
        self
    }

    pub fn logged_in(mut self, user_id: i64) -> Self {
        self.user = Some(user_id);
        self
    }

    pub fn referer(mut self, referer: &str) -> Self {
        self.referer = Some(referer.to_string());
        self
    }

    /// Sends a cookie as a browser would, e.g. a flash token from an earlier response.
    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push(format!("{name}={value}"));
        self
    }

    fn build(self, state: &AppState) -> Request<Body> {
        let mut builder = Request::builder().method(self.method).uri(self.uri);
        let mut cookies = self.cookies;
        if let Some(user_id) = self.user {
            let token = SessionKeys::from_ref(state)
                .sign_session(&Principal {
                    user_id,
                    first_name: "Tester".into(),
                })
                .unwrap();
            cookies.push(format!("{SESSION_COOKIE}={token}"));
        }
        if !cookies.is_empty() {
            builder = builder.header(header::COOKIE, cookies.join("; "));
        }
        if let Some(referer) = self.referer {
            builder = builder.header(header::REFERER, referer);
        }
        match self.form {
            Some(form) => builder
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }
}

pub async fn send(gateway: &ScriptedGateway, req: TestRequest) -> Response {
    let state = AppState::fake(gateway.clone());
    let app = build_app(state.clone());
    app.oneshot(req.build(&state)).await.unwrap()
}

pub fn location(res: &Response) -> &str {
    res.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// Non-empty value of the cookie `name` set by the response.
pub fn set_cookie_value(res: &Response, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    res.headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(|v| v.strip_prefix(prefix.as_str()))
        .map(|v| v.split(';').next().unwrap_or("").to_string())
        .find(|v| !v.is_empty())
}

/// Session token set by the response, if any.
pub fn session_cookie(res: &Response) -> Option<String> {
    set_cookie_value(res, SESSION_COOKIE)
}

/// Flash messages the response carries to the next page.
pub fn flashes(res: &Response) -> Vec<FlashMessage> {
    let keys = SessionKeys::from_ref(&AppState::fake(ScriptedGateway::new()));
    set_cookie_value(res, FLASH_COOKIE)
        .and_then(|token| keys.verify_flashes(&token).ok())
        .unwrap_or_default()
}

pub fn flash_text(res: &Response) -> Vec<String> {
    flashes(res).into_iter().map(|f| f.message).collect()
}

pub async fn body_text(res: Response) -> String {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
