//! Data types shared by the store traits, the SQLite backend and the public API.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
pub use gw_common::Kobo;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

//--------------------------------------        User           ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// This user's own code, which they hand out to friends.
    pub referral_code: String,
    /// The referral code of the user that referred this one, if any.
    pub referred_by: Option<String>,
    /// The payment provider's customer code, used to match incoming webhook events.
    pub customer_code: Option<String>,
    pub balance: Kobo,
    pub referral_bonus_issued: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewUser {
    pub referred_by: Option<String>,
    pub customer_code: Option<String>,
}

impl NewUser {
    pub fn referred_by<S: Into<String>>(mut self, code: S) -> Self {
        self.referred_by = Some(code.into());
        self
    }

    pub fn with_customer_code<S: Into<String>>(mut self, code: S) -> Self {
        self.customer_code = Some(code.into());
        self
    }
}

//--------------------------------------   TransactionType     ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Funds taken from the wallet to pay for an order
    DebitOrder,
    /// Bank transfer into the user's dedicated account
    CreditTransfer,
    /// Card payment made through the checkout widget
    CreditCard,
    /// Referral bonus
    CreditReferral,
}

impl TransactionType {
    pub fn is_credit(&self) -> bool {
        !matches!(self, Self::DebitOrder)
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DebitOrder => write!(f, "DEBIT_ORDER"),
            Self::CreditTransfer => write!(f, "CREDIT_TRANSFER"),
            Self::CreditCard => write!(f, "CREDIT_CARD"),
            Self::CreditReferral => write!(f, "CREDIT_REFERRAL"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEBIT_ORDER" => Ok(Self::DebitOrder),
            "CREDIT_TRANSFER" => Ok(Self::CreditTransfer),
            "CREDIT_CARD" => Ok(Self::CreditCard),
            "CREDIT_REFERRAL" => Ok(Self::CreditReferral),
            s => Err(ConversionError(format!("Invalid transaction type: {s}"))),
        }
    }
}

//--------------------------------------  WalletTransaction    ---------------------------------------------------------
/// A single, immutable ledger entry. Debits carry a negative amount, credits a positive one.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: i64,
    pub user_id: i64,
    pub amount: Kobo,
    pub transaction_type: TransactionType,
    pub reference: Option<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitRequest {
    pub user_id: i64,
    pub amount: Kobo,
    pub reference: Option<String>,
    pub description: String,
}

impl DebitRequest {
    pub fn new<S: Into<String>>(user_id: i64, amount: Kobo, description: S) -> Self {
        Self { user_id, amount, reference: None, description: description.into() }
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRequest {
    pub user_id: i64,
    pub amount: Kobo,
    pub transaction_type: TransactionType,
    pub reference: Option<String>,
    pub description: String,
}

impl CreditRequest {
    pub fn new<S: Into<String>>(user_id: i64, amount: Kobo, transaction_type: TransactionType, description: S) -> Self {
        Self { user_id, amount, transaction_type, reference: None, description: description.into() }
    }

    pub fn with_reference<S: Into<String>>(mut self, reference: S) -> Self {
        self.reference = Some(reference.into());
        self
    }
}

/// The result of applying a debit or credit to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub user_id: i64,
    pub transaction_id: i64,
    pub new_balance: Kobo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditResult {
    pub entry: LedgerEntry,
    /// True if the reference had already been applied and this call changed nothing.
    pub replayed: bool,
}

impl CreditResult {
    pub fn applied(entry: LedgerEntry) -> Self {
        Self { entry, replayed: false }
    }

    pub fn replayed(entry: LedgerEntry) -> Self {
        Self { entry, replayed: true }
    }
}

//--------------------------------------    PaymentIntent      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    /// Handed to the checkout widget, no outcome reported yet
    #[default]
    Pending,
    /// The wallet has been credited
    Completed,
    Cancelled,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// A card payment the checkout widget was asked to collect. The reference is the only thing the widget reports back;
/// user and amount always come from here.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub reference: String,
    pub user_id: i64,
    pub amount: Kobo,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------   AppliedReference    ---------------------------------------------------------
/// Idempotency record for an external event that has been applied to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct AppliedReference {
    pub reference: String,
    pub user_id: i64,
    pub transaction_id: i64,
    pub balance_after: Kobo,
    pub created_at: DateTime<Utc>,
}

impl AppliedReference {
    pub fn to_entry(&self) -> LedgerEntry {
        LedgerEntry { user_id: self.user_id, transaction_id: self.transaction_id, new_balance: self.balance_after }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAudit {
    pub user_id: i64,
    pub stored_balance: Kobo,
    pub ledger_total: Kobo,
    pub transaction_count: i64,
}

impl BalanceAudit {
    pub fn is_consistent(&self) -> bool {
        self.stored_balance == self.ledger_total
    }
}

//--------------------------------------        OrderId        ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
#[serde(transparent)]
pub struct OrderId(pub String);

impl OrderId {
    /// Generates a fresh order id of the form `ord_<16 hex chars>`.
    pub fn random() -> Self {
        Self(format!("ord_{:016x}", rand::random::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The ledger reference used for the debit that pays for this order.
    pub fn debit_reference(&self) -> String {
        format!("ord_{}", self.0.trim_start_matches("ord_"))
    }
}

impl FromStr for OrderId {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ConversionError("Order id cannot be empty".into()));
        }
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// Only `Confirmed` is reached synchronously. Fulfilment states are managed elsewhere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatusType {
    #[default]
    Confirmed,
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Confirmed => write!(f, "CONFIRMED"),
        }
    }
}

//--------------------------------------         Order         ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: i64,
    pub total: Kobo,
    pub status: OrderStatusType,
    pub transaction_id: i64,
    pub delivery_estimate: String,
    pub note: Option<String>,
    pub address_id: Option<String>,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub items: Vec<OrderItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderItem {
    pub item_id: String,
    pub quantity: i64,
    pub unit_price: Kobo,
    pub line_total: Kobo,
}

/// A cart line as submitted by the client. Any totals the client sends along are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderItem {
    pub item_id: String,
    pub quantity: i64,
    pub unit_price: Kobo,
}

impl NewOrderItem {
    pub fn new<S: Into<String>>(item_id: S, quantity: i64, unit_price: Kobo) -> Self {
        Self { item_id: item_id.into(), quantity, unit_price }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: i64,
    pub items: Vec<NewOrderItem>,
    pub note: Option<String>,
    pub address_id: Option<String>,
}

impl NewOrder {
    pub fn new(user_id: i64, items: Vec<NewOrderItem>) -> Self {
        Self { user_id, items, note: None, address_id: None }
    }

    pub fn with_note<S: Into<String>>(mut self, note: S) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_address<S: Into<String>>(mut self, address_id: S) -> Self {
        self.address_id = Some(address_id.into());
        self
    }
}

/// A fully priced order, ready to be settled against the ledger in one atomic unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSettlement {
    pub order_id: OrderId,
    pub user_id: i64,
    pub items: Vec<OrderItem>,
    pub total: Kobo,
    pub delivery_estimate: String,
    pub note: Option<String>,
    pub address_id: Option<String>,
    pub description: String,
}

//--------------------------------------       Referrals       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferralBonus {
    pub referrer_id: i64,
    pub referee_id: i64,
    pub referrer_credit: Kobo,
    pub referee_credit: Kobo,
    pub referrer_reference: String,
    pub referee_reference: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferralSkipReason {
    NoReferrer,
    NotFirstOrder,
    ReferrerNotFound,
    AlreadyIssued,
}

impl Display for ReferralSkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoReferrer => write!(f, "user was not referred"),
            Self::NotFirstOrder => write!(f, "not the user's first order"),
            Self::ReferrerNotFound => write!(f, "referral code does not match any user"),
            Self::AlreadyIssued => write!(f, "bonus already issued"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferralOutcome {
    Issued { referrer: LedgerEntry, referee: LedgerEntry },
    Skipped(ReferralSkipReason),
}

//--------------------------------------          OTP          ---------------------------------------------------------
/// Timestamps are unix epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct OtpChallenge {
    pub phone: String,
    pub code_hash: String,
    pub failed_attempts: i64,
    pub created_at: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct RateWindow {
    pub request_count: i64,
    pub expires_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtpCheck {
    Verified,
    /// No live challenge exists for the phone.
    Missing,
    /// Too many failed attempts. The challenge has been removed.
    Locked,
    Mismatch { failed_attempts: i64 },
}
