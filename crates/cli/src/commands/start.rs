use chowbot_core::config::{AppConfig, LoadOptions};

use super::CommandResult;

const CONFIG_VALIDATION_EXIT: u8 = 2;

/// Preflight for `chowbot-server`: the config it would load must validate.
pub fn run() -> CommandResult {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => CommandResult::success(
            "start",
            format!(
                "preflight passed; chowbot-server will listen on {}:{} and connect via socket mode",
                config.server.bind_address, config.server.port
            ),
        ),
        Err(error) => CommandResult::failure(
            "start",
            "config_validation",
            error.to_string(),
            CONFIG_VALIDATION_EXIT,
        ),
    }
}
