//! Webhook body signatures.
//!
//! The payment provider signs every webhook body with the merchant's secret key (HMAC-SHA512, hex encoded) and sends
//! the signature in the `x-paystack-signature` header. Wrapping the webhook scope in a [`SignatureGuard`] rejects any
//! request whose signature does not match its body before a route ever sees it. The body is buffered to compute the
//! digest and handed back to the request afterwards, so routes can still extract it.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorUnauthorized},
    web::Bytes,
    Error,
};
use futures::future::LocalBoxFuture;
use gw_common::Secret;
use log::{trace, warn};

use crate::helpers::calculate_hmac;

pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";

#[derive(Clone)]
struct SignatureSettings {
    header: String,
    secret: Secret<String>,
    enforced: bool,
}

/// Checks the provider signature on every request in the wrapped scope.
pub struct SignatureGuard {
    settings: SignatureSettings,
}

impl SignatureGuard {
    /// With `enforced` set to false, every request is let through unchecked. Only use that against a sandbox.
    pub fn new(header: &str, secret: Secret<String>, enforced: bool) -> Self {
        Self { settings: SignatureSettings { header: header.to_string(), secret, enforced } }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SignatureGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = SignatureGuardService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SignatureGuardService { settings: Rc::new(self.settings.clone()), inner: Rc::new(service) }))
    }
}

pub struct SignatureGuardService<S> {
    settings: Rc<SignatureSettings>,
    inner: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for SignatureGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(inner);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let inner = Rc::clone(&self.inner);
        let settings = Rc::clone(&self.settings);
        Box::pin(async move {
            if !settings.enforced {
                trace!("🔐️ Webhook signature checks are off. Letting {} through.", req.path());
                return inner.call(req).await;
            }
            let body = req.extract::<Bytes>().await.map_err(|e| {
                warn!("🔐️ Could not buffer webhook body: {e:?}");
                ErrorBadRequest("Could not read request body.")
            })?;
            let signature = req.headers().get(&settings.header).and_then(|v| v.to_str().ok()).map(str::to_string);
            match signature {
                None => {
                    warn!("🔐️ Webhook call to {} carries no {} header. Rejecting it.", req.path(), settings.header);
                    Err(ErrorUnauthorized("Missing webhook signature."))
                },
                Some(sig) if signature_matches(settings.secret.reveal(), &body, &sig) => {
                    trace!("🔐️ Webhook signature on {} verified ✅️", req.path());
                    req.set_payload(replay_body(body));
                    inner.call(req).await
                },
                Some(_) => {
                    warn!("🔐️ Webhook call to {} has a bad signature. Rejecting it.", req.path());
                    Err(ErrorUnauthorized("Invalid webhook signature."))
                },
            }
        })
    }
}

/// True if `signature` is the hex HMAC-SHA512 of `body` under `secret`. Case and surrounding whitespace are ignored.
pub fn signature_matches(secret: &str, body: &[u8], signature: &str) -> bool {
    calculate_hmac(secret, body).eq_ignore_ascii_case(signature.trim())
}

fn replay_body(body: Bytes) -> Payload {
    let (_, mut payload) = h1::Payload::create(true);
    payload.unread_data(body);
    Payload::from(payload)
}
