//! Request handler definitions
//!
//! Define each route and it handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Every handler awaits the engine, which in turn awaits the store. Nothing here may block the worker thread:
//! ```nocompile
//!     async fn my_handler() -> impl Responder {
//!         std::thread::sleep(Duration::from_secs(5)); // <-- Bad practice! Will cause the current worker to hang!
//!     }
//! ```
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use wallet_engine::{
    db_types::{NewOrder, OrderId},
    LedgerStore,
    OrderFlowApi,
    OtpApi,
    OtpSender,
    PaymentApi,
    PaymentCompletion,
    PaystackEvent,
    WalletApi,
    WebhookApi,
    WebhookOutcome,
};

use crate::{
    data_objects::{
        BalanceResponse,
        CompletePaymentRequest,
        CompletePaymentResponse,
        InitiatePaymentRequest,
        JsonResponse,
        OtpRequest,
        OtpVerification,
        WebhookAck,
    },
    errors::ServerError,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Wallet  ----------------------------------------------------
route!(balance => Get "/wallet/{user_id}/balance" impl LedgerStore);
pub async fn balance<B: LedgerStore>(
    path: web::Path<i64>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    trace!("💻️ GET balance for user #{user_id}");
    let balance = api.get_balance(user_id).await?;
    Ok(HttpResponse::Ok().json(BalanceResponse { user_id, balance }))
}

route!(transactions => Get "/wallet/{user_id}/transactions" impl LedgerStore);
/// The user's wallet ledger, newest entry first.
pub async fn transactions<B: LedgerStore>(
    path: web::Path<i64>,
    api: web::Data<WalletApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let user_id = path.into_inner();
    trace!("💻️ GET transactions for user #{user_id}");
    let transactions = api.transactions(user_id).await?;
    Ok(HttpResponse::Ok().json(transactions))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(place_order => Post "/orders" impl LedgerStore);
/// Places an order and pays for it from the wallet.
///
/// Line prices are the only amounts taken from the client; the total is always recomputed. A referral bonus check
/// is scheduled once the order has settled, and does not hold up the response.
pub async fn place_order<B: LedgerStore>(
    body: web::Json<NewOrder>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order = body.into_inner();
    debug!("💻️ New order from user #{} with {} lines", order.user_id, order.items.len());
    let order = api.place_order(order).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(order_by_id => Get "/orders/{order_id}" impl LedgerStore);
pub async fn order_by_id<B: LedgerStore>(
    path: web::Path<String>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let order_id = OrderId::from(path.into_inner());
    trace!("💻️ GET order {order_id}");
    let order = api.order(&order_id).await?;
    Ok(HttpResponse::Ok().json(order))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(initiate_payment => Post "/payments/initiate" impl LedgerStore);
pub async fn initiate_payment<B: LedgerStore>(
    body: web::Json<InitiatePaymentRequest>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let InitiatePaymentRequest { user_id, amount, reference } = body.into_inner();
    let intent = api.initiate(user_id, amount, reference).await?;
    Ok(HttpResponse::Ok().json(intent))
}

route!(complete_payment => Post "/payments/complete" impl LedgerStore);
/// Applies the result the checkout widget reported. Only a successful payment credits the wallet.
pub async fn complete_payment<B: LedgerStore>(
    body: web::Json<CompletePaymentRequest>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let CompletePaymentRequest { reference, outcome } = body.into_inner();
    let PaymentCompletion { intent, credit } = api.complete(&reference, outcome).await?;
    let response = CompletePaymentResponse {
        reference: intent.reference,
        status: intent.status,
        credited: credit.is_some(),
        credit,
    };
    Ok(HttpResponse::Ok().json(response))
}

//----------------------------------------------   Webhooks  ----------------------------------------------------
route!(paystack_webhook => Post "/paystack" impl LedgerStore);
/// Route handler for payment-provider webhook events.
///
/// The signature has already been checked by the HMAC middleware by the time we get here. From this point on the
/// provider always gets a 200 back, otherwise it will keep retrying. Anything that goes wrong is logged for follow-up.
pub async fn paystack_webhook<B: LedgerStore>(
    req: HttpRequest,
    body: web::Bytes,
    api: web::Data<WebhookApi<B>>,
) -> HttpResponse {
    trace!("🪝️ Received webhook request: {}", req.uri());
    match serde_json::from_slice::<PaystackEvent>(&body) {
        Err(e) => {
            error!("🪝️ Could not deserialize webhook payload. {e}. Payload: {}", String::from_utf8_lossy(&body));
        },
        Ok(event) => {
            let reference = event.data.reference.clone();
            match api.process_event(event).await {
                Ok(WebhookOutcome::Credited(result)) => {
                    info!("🪝️ Webhook {reference} credited user #{}", result.entry.user_id);
                },
                Ok(WebhookOutcome::AlreadyProcessed(reference)) => {
                    info!("🪝️ Webhook {reference} was already processed.");
                },
                Ok(WebhookOutcome::Ignored(event_type)) => {
                    debug!("🪝️ Ignored {event_type} webhook {reference}");
                },
                Err(e) => {
                    error!("🪝️ Could not process webhook {reference}. {e}");
                },
            }
        },
    }
    HttpResponse::Ok().json(WebhookAck::success())
}

//----------------------------------------------   OTP  ----------------------------------------------------
route!(request_otp => Post "/otp/request" impl LedgerStore, OtpSender);
pub async fn request_otp<B, S>(
    body: web::Json<OtpRequest>,
    api: web::Data<OtpApi<B, S>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore,
    S: OtpSender,
{
    let OtpRequest { phone } = body.into_inner();
    let issued = api.request_otp(&phone).await?;
    Ok(HttpResponse::Ok().json(issued))
}

route!(verify_otp => Post "/otp/verify" impl LedgerStore, OtpSender);
pub async fn verify_otp<B, S>(
    body: web::Json<OtpVerification>,
    api: web::Data<OtpApi<B, S>>,
) -> Result<HttpResponse, ServerError>
where
    B: LedgerStore,
    S: OtpSender,
{
    let OtpVerification { phone, code } = body.into_inner();
    api.verify_otp(&phone, &code).await?;
    Ok(HttpResponse::Ok().json(JsonResponse::success("Phone number verified.")))
}
