pub mod bank;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod session;
pub mod shuffle;
pub mod state;
pub mod store;
pub mod telegram;

use config::BotConfig;

/// Loads the bank and wires the engine. A malformed bank is fatal.
pub async fn build_state(config: &BotConfig) -> anyhow::Result<state::AppState> {
    let bank = config.bank_source().load().await?;
    tracing::info!(
        questions = bank.len(),
        subjects = bank.subjects().partitions().len(),
        "question bank loaded from {}",
        config.questions_path.display()
    );
    state::AppState::new(config, bank)
}
