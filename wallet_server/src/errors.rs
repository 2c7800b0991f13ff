use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use log::error;
use serde_json::{json, Value};
use thiserror::Error;
use wallet_engine::{OtpError, WalletError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("UnspecifiedError. {0}")]
    Unspecified(String),
    #[error("{0}")]
    Wallet(#[from] WalletError),
    #[error("{0}")]
    Otp(#[from] OtpError),
    #[error("Request denied. {0}")]
    ForbiddenPeer(String),
}

impl ServerError {
    /// A stable, machine-readable code for the error, returned alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InitializeError(_) | Self::IOError(_) | Self::Unspecified(_) => "INTERNAL_ERROR",
            Self::InvalidRequestBody(_) => "INVALID_REQUEST",
            Self::ForbiddenPeer(_) => "FORBIDDEN",
            Self::Wallet(e) => match e {
                WalletError::DatabaseError(_) => "DATABASE_ERROR",
                WalletError::StoreTimeout(_) => "STORE_TIMEOUT",
                WalletError::UserNotFound(_) => "USER_NOT_FOUND",
                WalletError::OrderNotFound(_) => "ORDER_NOT_FOUND",
                WalletError::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
                WalletError::InvalidAmount(_) => "INVALID_AMOUNT",
                WalletError::InsufficientBalance { .. } => "INSUFFICIENT_BALANCE",
                WalletError::EmptyCart => "EMPTY_CART",
                WalletError::DuplicateReference(_) => "DUPLICATE_REFERENCE",
                WalletError::InvalidTransactionType(_) => "INVALID_TRANSACTION_TYPE",
            },
            Self::Otp(e) => match e {
                OtpError::DatabaseError(_) => "DATABASE_ERROR",
                OtpError::StoreTimeout(_) => "STORE_TIMEOUT",
                OtpError::OtpExpired => "OTP_EXPIRED",
                OtpError::InvalidOtp { .. } => "INVALID_OTP",
                OtpError::RateLimitExceeded { .. } => "RATE_LIMIT_EXCEEDED",
                OtpError::InvalidPhone(_) => "INVALID_PHONE",
            },
        }
    }

    fn context(&self) -> Option<Value> {
        match self {
            Self::Wallet(WalletError::InsufficientBalance { balance, requested }) => {
                Some(json!({ "balance": balance, "requested": requested }))
            },
            Self::Otp(OtpError::InvalidOtp { attempts_remaining }) => {
                Some(json!({ "attempts_remaining": attempts_remaining }))
            },
            Self::Otp(OtpError::RateLimitExceeded { limit, retry_after_secs }) => {
                Some(json!({ "limit": limit, "retry_after_secs": retry_after_secs }))
            },
            _ => None,
        }
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Unspecified(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ForbiddenPeer(_) => StatusCode::FORBIDDEN,
            Self::Wallet(e) => match e {
                WalletError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                WalletError::StoreTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
                WalletError::UserNotFound(_) => StatusCode::NOT_FOUND,
                WalletError::OrderNotFound(_) => StatusCode::NOT_FOUND,
                WalletError::PaymentNotFound(_) => StatusCode::NOT_FOUND,
                WalletError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
                WalletError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
                WalletError::EmptyCart => StatusCode::BAD_REQUEST,
                WalletError::DuplicateReference(_) => StatusCode::CONFLICT,
                WalletError::InvalidTransactionType(_) => StatusCode::BAD_REQUEST,
            },
            Self::Otp(e) => match e {
                OtpError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
                OtpError::StoreTimeout(_) => StatusCode::SERVICE_UNAVAILABLE,
                OtpError::OtpExpired => StatusCode::GONE,
                OtpError::InvalidOtp { .. } => StatusCode::UNAUTHORIZED,
                OtpError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
                OtpError::InvalidPhone(_) => StatusCode::BAD_REQUEST,
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("💻️ {self}");
        }
        let mut body = json!({ "error": self.to_string(), "code": self.code() });
        if let (Some(Value::Object(context)), Some(body)) = (self.context(), body.as_object_mut()) {
            body.extend(context);
        }
        HttpResponse::build(status).insert_header(ContentType::json()).body(body.to_string())
    }
}
