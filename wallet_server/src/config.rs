use std::{env, fmt::Display, net::IpAddr, str::FromStr, time::Duration};

use gw_common::{parse_boolean_flag, Secret};
use log::*;
use wallet_engine::{
    db::db_url,
    db_types::Kobo,
    engine_api::{
        otp_objects::{DEFAULT_OTP_MAX_ATTEMPTS, DEFAULT_OTP_MAX_REQUESTS, DEFAULT_OTP_RATE_WINDOW, DEFAULT_OTP_TTL},
        referral_api::{DEFAULT_REFEREE_CREDIT, DEFAULT_REFERRER_CREDIT},
    },
    OtpConfig,
    ReferralConfig,
    DEFAULT_STORE_TIMEOUT,
};

const DEFAULT_GW_HOST: &str = "127.0.0.1";
const DEFAULT_GW_PORT: u16 = 8360;
const DEFAULT_MAX_CONNECTIONS: u32 = 25;
/// How often expired OTP challenges and rate windows are swept out of the store.
const DEFAULT_OTP_PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// The longest any single unit of work against the store may run before it is abandoned.
    pub store_timeout: Duration,
    pub webhook: WebhookConfig,
    pub referrals: ReferralConfig,
    pub otp: OtpConfig,
    pub otp_purge_interval: Duration,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
}

#[derive(Clone, Debug)]
pub struct WebhookConfig {
    /// The payment provider's secret key. Webhook bodies are signed with it.
    pub secret_key: Secret<String>,
    pub hmac_checks: bool,
    /// If supplied, requests against /webhook endpoints will be checked against a whitelist of provider IP addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self { secret_key: Secret::default(), hmac_checks: true, whitelist: None }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_GW_HOST.to_string(),
            port: DEFAULT_GW_PORT,
            database_url: String::default(),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            store_timeout: DEFAULT_STORE_TIMEOUT,
            webhook: WebhookConfig::default(),
            referrals: ReferralConfig::default(),
            otp: OtpConfig::default(),
            otp_purge_interval: DEFAULT_OTP_PURGE_INTERVAL,
            use_x_forwarded_for: false,
            use_forwarded: false,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("GW_HOST").ok().unwrap_or_else(|| DEFAULT_GW_HOST.into());
        let port = parse_env("GW_PORT", DEFAULT_GW_PORT);
        let database_url = db_url();
        let max_connections = parse_env("GW_DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS);
        let store_timeout = Duration::from_secs(parse_env("GW_STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT.as_secs()));
        let webhook = WebhookConfig::from_env_or_defaults();
        let referrals = ReferralConfig {
            referrer_credit: Kobo::from(parse_env("GW_REFERRER_CREDIT", DEFAULT_REFERRER_CREDIT)),
            referee_credit: Kobo::from(parse_env("GW_REFEREE_CREDIT", DEFAULT_REFEREE_CREDIT)),
        };
        let otp = OtpConfig {
            ttl: Duration::from_secs(parse_env("GW_OTP_TTL_SECS", DEFAULT_OTP_TTL.as_secs())),
            max_attempts: parse_env("GW_OTP_MAX_ATTEMPTS", DEFAULT_OTP_MAX_ATTEMPTS),
            max_requests: parse_env("GW_OTP_MAX_REQUESTS", DEFAULT_OTP_MAX_REQUESTS),
            rate_window: Duration::from_secs(parse_env(
                "GW_OTP_RATE_WINDOW_SECS",
                DEFAULT_OTP_RATE_WINDOW.as_secs(),
            )),
            ..OtpConfig::default()
        };
        let otp_purge_interval =
            Duration::from_secs(parse_env("GW_OTP_PURGE_INTERVAL_SECS", DEFAULT_OTP_PURGE_INTERVAL.as_secs()));
        let use_x_forwarded_for = parse_boolean_flag(env::var("GW_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("GW_USE_FORWARDED").ok(), false);
        Self {
            host,
            port,
            database_url,
            max_connections,
            store_timeout,
            webhook,
            referrals,
            otp,
            otp_purge_interval,
            use_x_forwarded_for,
            use_forwarded,
        }
    }
}

impl WebhookConfig {
    pub fn from_env_or_defaults() -> Self {
        let secret_key = env::var("GW_PAYSTACK_SECRET_KEY").ok().unwrap_or_else(|| {
            error!(
                "🪛️ GW_PAYSTACK_SECRET_KEY is not set. Please set it to your payment provider secret key, or webhook \
                 signatures cannot be verified."
            );
            String::default()
        });
        let secret_key = Secret::new(secret_key);
        let hmac_checks = parse_boolean_flag(env::var("GW_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Webhook HMAC checks are DISABLED. Anyone can credit wallets. Never run production like this.");
        }
        let whitelist = env::var("GW_PAYSTACK_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The webhook IP whitelist was configured, but is empty. The server will run, but won't \
                     authorise any incoming webhook requests."
                );
            },
            None => {
                info!("🪛️ No webhook IP whitelist is set. Only HMAC validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Webhook IP whitelist: {addrs}");
            },
        }
        Self { secret_key, hmac_checks, whitelist }
    }
}

fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Webhook IP whitelist is disabled. If this is not what you want, set GW_PAYSTACK_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse::<IpAddr>()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in GW_PAYSTACK_WHITELIST: {e}"))
                .ok()
        })
        .collect();
    Some(ip_addrs)
}

/// Reads `name` from the environment, falling back to `default` (with a warning) when the value does not parse.
fn parse_env<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(name) {
        Ok(s) => s.trim().parse::<T>().unwrap_or_else(|e| {
            error!("🪛️ {s} is not a valid value for {name}. {e} Using the default, {default}, instead.");
            default
        }),
        Err(_) => {
            debug!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
