use std::time::Duration;

use actix_web::{
    dev::{HttpServiceFactory, Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use futures::future::{ok, Either};
use log::*;
use wallet_engine::{
    events::EventProducers,
    LedgerStore,
    OrderFlowApi,
    OtpApi,
    OtpSender,
    PaymentApi,
    SandboxOtpSender,
    SqliteDatabase,
    WalletApi,
    WebhookApi,
};

use crate::{
    config::{ServerConfig, ServerOptions, WebhookConfig},
    errors::ServerError,
    helpers::get_remote_ip,
    middleware::{SignatureGuard, PAYSTACK_SIGNATURE_HEADER},
    notifications::create_notification_handlers,
    otp_worker::start_otp_purge_worker,
    routes::{
        health,
        BalanceRoute,
        CompletePaymentRoute,
        InitiatePaymentRoute,
        OrderByIdRoute,
        PaystackWebhookRoute,
        PlaceOrderRoute,
        RequestOtpRoute,
        TransactionsRoute,
        VerifyOtpRoute,
    },
};

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_connections, config.store_timeout)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(format!("Could not run migrations. {e}")))?;
    let handlers = create_notification_handlers();
    let producers = handlers.producers();
    handlers.start_handlers().await;
    let otp_api = OtpApi::new(db.clone(), SandboxOtpSender, config.otp.clone());
    let _purge_worker = start_otp_purge_worker(otp_api, config.otp_purge_interval);
    let srv = create_server_instance(config, db.clone(), producers)?;
    let result = srv.await.map_err(|e| ServerError::Unspecified(e.to_string()));
    info!("🗃️ Server stopped. Closing the ledger store.");
    db.close().await;
    result
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let db = db.clone();
        let producers = producers.clone();
        let config = config.clone();
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("gw::access_log"))
            .configure(move |cfg| configure_services(cfg, db, producers, SandboxOtpSender, &config))
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}

/// Registers the engine APIs and every route against the given store and OTP sender.
pub fn configure_services<B, S>(
    cfg: &mut web::ServiceConfig,
    db: B,
    producers: EventProducers,
    sender: S,
    config: &ServerConfig,
) where
    B: LedgerStore,
    S: OtpSender + Clone + 'static,
{
    let wallet_api = WalletApi::new(db.clone(), producers.clone());
    let orders_api = OrderFlowApi::with_referral_config(db.clone(), producers.clone(), config.referrals);
    let payment_api = PaymentApi::new(db.clone(), producers.clone());
    let webhook_api = WebhookApi::new(db.clone(), producers);
    let otp_api = OtpApi::new(db, sender, config.otp.clone());
    let json_config = web::JsonConfig::default()
        .error_handler(|err, _req| ServerError::InvalidRequestBody(err.to_string()).into());
    let api_scope = web::scope("/api")
        .service(BalanceRoute::<B>::new())
        .service(TransactionsRoute::<B>::new())
        .service(PlaceOrderRoute::<B>::new())
        .service(OrderByIdRoute::<B>::new())
        .service(InitiatePaymentRoute::<B>::new())
        .service(CompletePaymentRoute::<B>::new())
        .service(RequestOtpRoute::<B, S>::new())
        .service(VerifyOtpRoute::<B, S>::new());
    cfg.app_data(json_config)
        .app_data(web::Data::new(wallet_api))
        .app_data(web::Data::new(orders_api))
        .app_data(web::Data::new(payment_api))
        .app_data(web::Data::new(webhook_api))
        .app_data(web::Data::new(otp_api))
        .service(health)
        .service(api_scope)
        .service(webhook_scope::<B>(&config.webhook, ServerOptions::from_config(config)));
}

/// The `/webhook` scope. Requests must come from a whitelisted address (if a whitelist is configured) and carry a
/// valid body signature.
fn webhook_scope<B: LedgerStore>(webhook: &WebhookConfig, options: ServerOptions) -> impl HttpServiceFactory {
    let whitelist = webhook.whitelist.clone();
    web::scope("/webhook")
        .wrap(SignatureGuard::new(PAYSTACK_SIGNATURE_HEADER, webhook.secret_key.clone(), webhook.hmac_checks))
        .wrap_fn(move |req, srv| {
            let peer_ip = get_remote_ip(req.request(), options.use_x_forwarded_for, options.use_forwarded);
            let whitelisted = match (peer_ip, &whitelist) {
                (_, None) => true,
                (Some(ip), Some(whitelist)) => {
                    debug!("🪝️ Webhook call from {ip}");
                    whitelist.contains(&ip)
                },
                (None, Some(_)) => {
                    warn!("🪝️ No IP address found in webhook remote peer request, denying access.");
                    false
                },
            };
            if whitelisted {
                Either::Left(srv.call(req))
            } else {
                warn!("🪝️ Webhook call from {peer_ip:?} is not whitelisted. Denying access.");
                let err = ServerError::ForbiddenPeer("This address may not call webhooks.".to_string());
                Either::Right(ok(req.error_response(err)))
            }
        })
        .service(PaystackWebhookRoute::<B>::new())
}
