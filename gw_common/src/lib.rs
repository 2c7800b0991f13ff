mod helpers;
mod kobo;
mod secret;

pub mod op;

pub use helpers::parse_boolean_flag;
pub use kobo::{Kobo, KoboConversionError, NAIRA_CURRENCY_CODE};
pub use secret::Secret;
