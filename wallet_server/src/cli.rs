//! The server is configured entirely through environment variables. Any command-line argument prints the help text
//! and the current configuration instead of starting the server.
use std::env::{self, VarError};

/// Environment variables shown by `--help`. Secrets are not listed.
const DISPLAY_ENVS: [&str; 17] = [
    "RUST_LOG",
    "GW_HOST",
    "GW_PORT",
    "GW_DATABASE_URL",
    "GW_DB_MAX_CONNECTIONS",
    "GW_STORE_TIMEOUT_SECS",
    "GW_WEBHOOK_HMAC_CHECKS",
    "GW_PAYSTACK_WHITELIST",
    "GW_USE_X_FORWARDED_FOR",
    "GW_USE_FORWARDED",
    "GW_REFERRER_CREDIT",
    "GW_REFEREE_CREDIT",
    "GW_OTP_TTL_SECS",
    "GW_OTP_MAX_ATTEMPTS",
    "GW_OTP_MAX_REQUESTS",
    "GW_OTP_RATE_WINDOW_SECS",
    "GW_OTP_PURGE_INTERVAL_SECS",
];

/// Returns true if help was printed, in which case the caller should exit.
pub fn handle_command_line_args() -> bool {
    if env::args().len() <= 1 {
        return false;
    }
    println!("\n{}\n", include_str!("./cli-help.txt"));
    print_configuration();
    true
}

fn print_configuration() {
    println!("Configuration from the environment (secrets are not shown):");
    for name in DISPLAY_ENVS {
        let value = match env::var(name) {
            Ok(value) => value,
            Err(VarError::NotPresent) => "(not set)".to_string(),
            Err(VarError::NotUnicode(raw)) => format!("(not valid UTF-8: {})", raw.to_string_lossy()),
        };
        println!("  {name:<35} {value}");
    }
}
