use std::sync::{Arc, Mutex};

use actix_http::Request;
use actix_web::{http::StatusCode, test, App};
use async_trait::async_trait;
use gw_common::Secret;
use log::debug;
use wallet_engine::{events::EventProducers, OtpDeliveryError, OtpSender, SqliteDatabase};

use crate::{config::ServerConfig, server::configure_services};

pub const TEST_SECRET_KEY: &str = "sk_test_5f1c0ffee0ddba11";

/// Keeps every code it is asked to send, so that tests can play the part of the phone.
#[derive(Clone, Default)]
pub struct CapturingOtpSender {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl CapturingOtpSender {
    pub fn last_code_for(&self, phone: &str) -> Option<String> {
        let sent = self.sent.lock().unwrap();
        sent.iter().rev().find(|(p, _)| p == phone).map(|(_, code)| code.clone())
    }
}

#[async_trait]
impl OtpSender for CapturingOtpSender {
    async fn send_otp(&self, phone: &str, code: &str, _message: &str) -> Result<(), OtpDeliveryError> {
        self.sent.lock().unwrap().push((phone.to_string(), code.to_string()));
        Ok(())
    }
}

pub fn test_config() -> ServerConfig {
    let mut config = ServerConfig::default();
    config.webhook.secret_key = Secret::new(TEST_SECRET_KEY.to_string());
    config
}

/// Builds a fresh app over `db` and sends it the request.
pub async fn send_request<S>(db: &SqliteDatabase, sender: S, config: &ServerConfig, req: Request) -> (StatusCode, String)
where S: OtpSender + Clone + 'static {
    let db = db.clone();
    let config = config.clone();
    let app = App::new().configure(move |cfg| configure_services(cfg, db, EventProducers::default(), sender, &config));
    let service = test::init_service(app).await;
    debug!("Making request");
    match test::try_call_service(&service, req).await {
        Ok(res) => {
            let status = res.status();
            let body = test::read_body(res).await;
            (status, String::from_utf8_lossy(&body).into_owned())
        },
        Err(e) => (e.as_response_error().status_code(), e.to_string()),
    }
}

pub async fn request(db: &SqliteDatabase, req: Request) -> (StatusCode, String) {
    send_request(db, CapturingOtpSender::default(), &test_config(), req).await
}

pub fn json(body: &str) -> serde_json::Value {
    serde_json::from_str(body).unwrap_or_else(|e| panic!("Response is not JSON ({e}): {body}"))
}
