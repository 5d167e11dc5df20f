use quiz_bot::{bank::spawn_reload_task, build_state, config::BotConfig, routes::build_router, telegram};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = BotConfig::from_env();
    let state = build_state(&config).await?;

    if let Some(every) = config.bank_reload {
        spawn_reload_task(state.engine.bank().clone(), config.bank_source(), every);
        tracing::info!("question bank reload every {}s", every.as_secs());
    }

    if config.telegram_polling {
        match state.telegram.clone() {
            Some(client) => {
                tokio::spawn(telegram::run_polling(client, state.engine.clone()));
            }
            None => tracing::warn!("TELEGRAM_POLLING is set but TELEGRAM_TOKEN is missing, polling disabled"),
        }
    }

    let app = build_router(state);
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("quiz bot listening on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}
