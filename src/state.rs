use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{Gateway, MySqlGateway};
use crate::web::render::{HtmlRenderer, Renderer};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn Gateway>,
    pub config: Arc<AppConfig>,
    pub renderer: Arc<dyn Renderer>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let db = Arc::new(MySqlGateway::connect(&config.database).await?) as Arc<dyn Gateway>;
        Ok(Self::from_parts(db, config, Arc::new(HtmlRenderer)))
    }

    pub fn from_parts(
        db: Arc<dyn Gateway>,
        config: Arc<AppConfig>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        Self {
            db,
            config,
            renderer,
        }
    }

    #[cfg(test)]
    pub fn fake(gateway: crate::db::fake::ScriptedGateway) -> Self {
        let mut config = AppConfig::from_source(|_| None).expect("default config");
        config.session.secret = "test-secret".into();
        config.session.issuer = "test-issuer".into();
        config.session.audience = "test-aud".into();

        Self::from_parts(
            Arc::new(gateway),
            Arc::new(config),
            Arc::new(HtmlRenderer),
        )
    }
}
