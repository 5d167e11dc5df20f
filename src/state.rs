use crate::bank::{BankHandle, QuestionBank};
use crate::config::BotConfig;
use crate::dispatch::{Dispatcher, LogDispatcher, TelegramDispatcher};
use crate::engine::QuizEngine;
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<QuizEngine>,
    pub telegram: Option<TelegramDispatcher>,
}

impl AppState {
    pub fn new(config: &BotConfig, bank: QuestionBank) -> anyhow::Result<Self> {
        let telegram = match config.telegram_token.as_deref() {
            Some(token) => Some(TelegramDispatcher::new(&config.telegram_api_url, token)?),
            None => None,
        };
        let dispatcher: Arc<dyn Dispatcher> = match &telegram {
            Some(client) => Arc::new(client.clone()),
            None => {
                info!("TELEGRAM_TOKEN is not set, dispatches are only logged");
                Arc::new(LogDispatcher)
            }
        };
        let engine = QuizEngine::new(BankHandle::new(bank), dispatcher, config.engine.clone());
        Ok(Self {
            engine: Arc::new(engine),
            telegram,
        })
    }

    pub fn with_dispatcher(config: &BotConfig, bank: QuestionBank, dispatcher: Arc<dyn Dispatcher>) -> Self {
        let engine = QuizEngine::new(BankHandle::new(bank), dispatcher, config.engine.clone());
        Self {
            engine: Arc::new(engine),
            telegram: None,
        }
    }
}
