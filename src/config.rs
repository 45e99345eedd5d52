use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub jwt_secret: String,
    /// Used when a stored quiz carries no passing score of its own.
    pub default_passing_score: u8,
    /// Time budget per question for quizzes without an explicit limit.
    pub seconds_per_question: u32,
    pub quiz_session_idle_minutes: i64,
    /// Open viewing sessions and cached watched sets expire after this.
    pub progress_idle_minutes: i64,
    pub log_json: bool,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let default_passing_score: u8 = get_env_parse_or("DEFAULT_PASSING_SCORE", 70)?;
        if !(1..=100).contains(&default_passing_score) {
            return Err(Error::Config(format!(
                "DEFAULT_PASSING_SCORE must be between 1 and 100, got {}",
                default_passing_score
            )));
        }

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            jwt_secret: get_env("JWT_SECRET")?,
            default_passing_score,
            seconds_per_question: get_env_parse_or("SECONDS_PER_QUESTION", 120)?,
            quiz_session_idle_minutes: get_env_parse_or("QUIZ_SESSION_IDLE_MINUTES", 120)?,
            progress_idle_minutes: get_env_parse_or("PROGRESS_IDLE_MINUTES", 30)?,
            log_json: env::var("LOG_FORMAT")
                .map(|v| v.eq_ignore_ascii_case("json"))
                .unwrap_or(false),
        })
    }

    /// Configuration for tests and local tooling that never touch the environment.
    pub fn for_tests(jwt_secret: &str) -> Self {
        Self {
            server_address: "127.0.0.1:0".to_string(),
            database_url: String::new(),
            jwt_secret: jwt_secret.to_string(),
            default_passing_score: 70,
            seconds_per_question: 120,
            quiz_session_idle_minutes: 120,
            progress_idle_minutes: 30,
            log_json: false,
        }
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_parse_or<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<&'static Config> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    get_config()
}

pub fn get_config() -> Result<&'static Config> {
    CONFIG
        .get()
        .ok_or_else(|| Error::Config("Configuration has not been initialized".to_string()))
}
