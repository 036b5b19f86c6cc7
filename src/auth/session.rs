use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{config::SessionConfig, state::AppState, web::flash::FlashMessage};

const FLASH_TTL: Duration = Duration::from_secs(5 * 60);

/// What a signed cookie value is for.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Session,
    Flash,
}

/// The logged-in user of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: i64,
    pub first_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims<T> {
    exp: usize,
    iat: usize,
    iss: String,
    aud: String,
    kind: TokenKind,
    data: T,
}

#[derive(Clone)]
pub struct SessionKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub session_ttl: Duration,
}

impl FromRef<AppState> for SessionKeys {
    fn from_ref(state: &AppState) -> Self {
        let SessionConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
        } = state.config.session.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            session_ttl: Duration::from_secs((ttl_minutes.max(1) as u64) * 60),
        }
    }
}

impl SessionKeys {
    fn sign<T: Serialize>(&self, kind: TokenKind, ttl: Duration, data: T) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
            data,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(kind = ?kind, "token signed");
        Ok(token)
    }

    fn verify<T: DeserializeOwned>(&self, token: &str, kind: TokenKind) -> anyhow::Result<T> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let claims = decode::<Claims<T>>(token, &self.decoding, &validation)?.claims;
        if claims.kind != kind {
            anyhow::bail!("expected a {:?} token", kind);
        }
        Ok(claims.data)
    }

    pub fn sign_session(&self, principal: &Principal) -> anyhow::Result<String> {
        self.sign(TokenKind::Session, self.session_ttl, principal)
    }

    pub fn verify_session(&self, token: &str) -> anyhow::Result<Principal> {
        self.verify(token, TokenKind::Session)
    }

    pub fn sign_flashes(&self, flashes: &[FlashMessage]) -> anyhow::Result<String> {
        self.sign(TokenKind::Flash, FLASH_TTL, flashes)
    }

    pub fn verify_flashes(&self, token: &str) -> anyhow::Result<Vec<FlashMessage>> {
        self.verify(token, TokenKind::Flash)
    }
}
