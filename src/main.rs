use std::process::ExitCode;
use std::time::Duration;

use authgate::config::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_LOGIN_PATH, DEFAULT_PING_PATH, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RETRY_MAX_DELAY_MS,
};
use authgate::gate::LOADING_PLACEHOLDER;
use authgate::session::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY_MS};
use authgate::{
    AuthGate, AuthorizedField, Backoff, ConfigError, GateConfig, GateView, HttpSessionProbe, ProbeTimeouts,
    RetryPolicy, RetryingSessionChecker,
};
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

#[derive(Parser, Debug)]
#[command(name = "authgate", about = "Check a session and print an identity field or the login redirect")]
struct Cli {
    /// Identity field to print once authorized.
    #[arg(default_value = "email")]
    field: String,

    #[arg(long, env = "AUTHGATE_BASE_URL")]
    base_url: String,

    #[arg(long, env = "AUTHGATE_PING_PATH", default_value = DEFAULT_PING_PATH)]
    ping_path: String,

    #[arg(long, env = "AUTHGATE_LOGIN_PATH", default_value = DEFAULT_LOGIN_PATH)]
    login_path: String,

    #[arg(long, env = "AUTHGATE_MAX_RETRIES", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    max_retries: u32,

    #[arg(long, env = "AUTHGATE_RETRY_DELAY_MS", default_value_t = DEFAULT_RETRY_DELAY_MS)]
    retry_delay_ms: u64,

    #[arg(long, env = "AUTHGATE_BACKOFF", value_enum, default_value_t = BackoffKind::Fixed)]
    backoff: BackoffKind,

    /// Cap for exponential backoff.
    #[arg(long, env = "AUTHGATE_RETRY_MAX_DELAY_MS", default_value_t = DEFAULT_RETRY_MAX_DELAY_MS)]
    retry_max_delay_ms: u64,

    /// Raw `Cookie` header value sent with every check.
    #[arg(long, env = "AUTHGATE_SESSION_COOKIE")]
    session_cookie: Option<String>,

    #[arg(long, env = "AUTHGATE_REQUEST_TIMEOUT_SECS", default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    request_timeout_secs: u64,

    #[arg(long, env = "AUTHGATE_CONNECT_TIMEOUT_SECS", default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout_secs: u64,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum BackoffKind {
    Fixed,
    Exponential,
}

impl Cli {
    fn config(&self) -> Result<GateConfig, ConfigError> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err(ConfigError::Missing("AUTHGATE_BASE_URL"));
        }

        let delay = Duration::from_millis(self.retry_delay_ms);
        let backoff = match self.backoff {
            BackoffKind::Fixed => Backoff::Fixed(delay),
            BackoffKind::Exponential => {
                Backoff::Exponential { base: delay, max: Duration::from_millis(self.retry_max_delay_ms) }
            }
        };

        let mut config = GateConfig::new(base_url).with_ping_path(&self.ping_path).with_login_path(&self.login_path);
        config.policy = RetryPolicy { max_attempts: self.max_retries, backoff };
        config.session_cookie = self.session_cookie.clone().filter(|v| !v.is_empty());
        config.timeouts =
            ProbeTimeouts { request_secs: self.request_timeout_secs, connect_secs: self.connect_timeout_secs };
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };
    let probe = match HttpSessionProbe::from_config(&config) {
        Ok(probe) => probe,
        Err(e) => {
            tracing::error!(error = %e, "failed to build session probe");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(url = %probe.url(), max_retries = config.policy.max_attempts, "checking session");
    let gate = AuthGate::new(RetryingSessionChecker::new(probe, config.policy))
        .with_login_path(&config.login_path)
        .with_navigator(|to: &str| tracing::info!(%to, "navigate"))
        .mount();

    eprintln!("{LOADING_PLACEHOLDER}");
    gate.settled().await;

    match gate.render(|ctx| AuthorizedField::new(&cli.field).render(ctx).map(str::to_owned)) {
        GateView::Authorized(value) => {
            println!("{}", value.unwrap_or_default());
            ExitCode::SUCCESS
        }
        GateView::Redirect { to } => {
            println!("redirect: {to}");
            ExitCode::from(2)
        }
        GateView::Loading => ExitCode::FAILURE,
    }
}
