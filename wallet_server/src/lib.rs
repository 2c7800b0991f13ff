//! # Grocer wallet server
//! This crate hosts the HTTP surface of the grocer wallet engine. It is responsible for:
//! * Serving wallet balances and ledgers.
//! * Placing orders, which are paid for from the wallet.
//! * Receiving payment-provider webhooks, verifying their signatures and crediting wallets exactly once.
//! * Recording in-app card payments.
//! * Issuing and verifying phone OTPs.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: The wallet, order, payment and OTP routes. See [routes](routes/index.html).
//! * `/webhook/paystack`: Payment-provider webhook events. Always acknowledged once the signature checks out.
pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod middleware;
pub mod notifications;
pub mod otp_worker;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
