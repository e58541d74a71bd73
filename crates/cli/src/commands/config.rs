use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use chowbot_core::config::{AppConfig, LoadOptions, DEFAULT_CONFIG_FILE};
use secrecy::ExposeSecret;
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    render(&config, config_file_path.as_deref(), config_file_doc.as_ref())
}

/// One line per setting, secrets redacted, each tagged with where its value came from.
pub fn render(config: &AppConfig, file_path: Option<&Path>, file_doc: Option<&Value>) -> String {
    let verification_token = match &config.slack.verification_token {
        Some(token) => redact_secret(token.expose_secret()),
        None => "<unset>".to_string(),
    };

    let fields = vec![
        field(
            "slack.app_token",
            redact_token(config.slack.app_token.expose_secret()),
            &["CHOWBOT_SLACK_APP_TOKEN", "SLACK_APP_TOKEN"],
        ),
        field(
            "slack.bot_token",
            redact_token(config.slack.bot_token.expose_secret()),
            &["CHOWBOT_SLACK_BOT_TOKEN", "SLACK_BOT_TOKEN"],
        ),
        field(
            "slack.api_base_url",
            config.slack.api_base_url.clone(),
            &["CHOWBOT_SLACK_API_BASE_URL"],
        ),
        field(
            "slack.verification_token",
            verification_token,
            &["CHOWBOT_SLACK_VERIFICATION_TOKEN"],
        ),
        field(
            "yelp.api_key",
            redact_secret(config.yelp.api_key.expose_secret()),
            &["CHOWBOT_YELP_API_KEY", "YELP_API_KEY"],
        ),
        field("yelp.base_url", config.yelp.base_url.clone(), &["CHOWBOT_YELP_BASE_URL"]),
        field(
            "yelp.timeout_secs",
            config.yelp.timeout_secs.to_string(),
            &["CHOWBOT_YELP_TIMEOUT_SECS"],
        ),
        field(
            "dialogue.case_sensitive",
            config.dialogue.case_sensitive.to_string(),
            &["CHOWBOT_DIALOGUE_CASE_SENSITIVE"],
        ),
        field(
            "dialogue.whole_word",
            config.dialogue.whole_word.to_string(),
            &["CHOWBOT_DIALOGUE_WHOLE_WORD"],
        ),
        field(
            "dialogue.search_timeout_secs",
            config.dialogue.search_timeout_secs.to_string(),
            &["CHOWBOT_DIALOGUE_SEARCH_TIMEOUT_SECS"],
        ),
        field(
            "dialogue.session_idle_timeout_secs",
            config.dialogue.session_idle_timeout_secs.to_string(),
            &["CHOWBOT_DIALOGUE_SESSION_IDLE_TIMEOUT_SECS"],
        ),
        field(
            "server.bind_address",
            config.server.bind_address.clone(),
            &["CHOWBOT_SERVER_BIND_ADDRESS"],
        ),
        field("server.port", config.server.port.to_string(), &["CHOWBOT_SERVER_PORT", "PORT"]),
        field(
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["CHOWBOT_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        field(
            "logging.level",
            config.logging.level.clone(),
            &["CHOWBOT_LOGGING_LEVEL", "CHOWBOT_LOG_LEVEL"],
        ),
        field(
            "logging.format",
            config.logging.format.as_str().to_string(),
            &["CHOWBOT_LOGGING_FORMAT", "CHOWBOT_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields {
        let source = field_source(field.key, field.env_keys, file_doc, file_path);
        lines.push(render_line(field.key, &field.value, source));
    }
    lines.join("\n")
}

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

fn field(key: &'static str, value: String, env_keys: &'static [&'static str]) -> Field {
    Field { key, value, env_keys }
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from("config/chowbot.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

/// Slack tokens keep their `xapp`/`xoxb` prefix so a swapped pair is still visible.
fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

fn redact_secret(secret: &str) -> String {
    if secret.trim().is_empty() {
        "<empty>".to_string()
    } else {
        "<redacted>".to_string()
    }
}
