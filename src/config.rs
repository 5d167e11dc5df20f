use crate::bank::BankSource;
use crate::engine::EngineSettings;
use crate::session::DEFAULT_NEGATIVE_MARK;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub questions_path: PathBuf,
    pub subjects_path: Option<PathBuf>,
    pub bank_reload: Option<Duration>,
    pub telegram_token: Option<String>,
    pub telegram_api_url: String,
    pub telegram_polling: bool,
    pub engine: EngineSettings,
    pub host: String,
    pub port: u16,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            questions_path: PathBuf::from("questions.json"),
            subjects_path: None,
            bank_reload: None,
            telegram_token: None,
            telegram_api_url: "https://api.telegram.org".to_string(),
            telegram_polling: false,
            engine: EngineSettings::default(),
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl BotConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; unset, blank or unparsable
    /// values keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let bank_reload = get("BANK_RELOAD_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs);
        let test_sizes = get("TEST_SIZES")
            .map(|v| {
                v.split(',')
                    .filter_map(|s| s.trim().parse::<usize>().ok())
                    .filter(|n| *n > 0)
                    .collect::<Vec<_>>()
            })
            .filter(|sizes| !sizes.is_empty())
            .unwrap_or(defaults.engine.test_sizes.clone());

        Self {
            questions_path: get("QUESTIONS_PATH").map(PathBuf::from).unwrap_or(defaults.questions_path),
            subjects_path: get("SUBJECTS_PATH").map(PathBuf::from),
            bank_reload,
            telegram_token: get("TELEGRAM_TOKEN"),
            telegram_api_url: get("TELEGRAM_API_URL").unwrap_or(defaults.telegram_api_url),
            telegram_polling: parsed(get("TELEGRAM_POLLING"), false),
            engine: EngineSettings {
                title: get("BOT_TITLE").unwrap_or(defaults.engine.title),
                negative_mark: get("NEGATIVE_MARK")
                    .and_then(|v| v.parse::<f64>().ok())
                    .filter(|m| m.is_finite() && *m >= 0.0)
                    .unwrap_or(DEFAULT_NEGATIVE_MARK),
                max_test_size: parsed(get("MAX_TEST_SIZE"), defaults.engine.max_test_size),
                test_sizes,
            },
            host: get("BACKEND_HOST").unwrap_or(defaults.host),
            port: parsed(get("BACKEND_PORT"), defaults.port),
        }
    }

    pub fn bank_source(&self) -> BankSource {
        BankSource {
            questions_path: self.questions_path.clone(),
            subjects_path: self.subjects_path.clone(),
        }
    }
}

fn parsed<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.parse().ok()).unwrap_or(default)
}
