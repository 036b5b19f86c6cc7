mod app;
mod auth;
mod config;
mod dashboard;
mod db;
mod error;
mod events;
mod foods;
mod meals;
mod meds;
mod schedules;
mod state;
#[cfg(test)]
mod testing;
mod users;
mod web;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "wefit=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;
    let db = app_state.db.clone();
    let (host, port) = (app_state.config.host.clone(), app_state.config.port);

    let result = app::serve(app::build_app(app_state), &host, port).await;
    db.close().await;
    result
}
