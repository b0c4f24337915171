//! Hosted-checkout payment boundary
//!
//! Online orders are settled off-site: the gateway registers the
//! transaction and hands back a redirect URL, and the provider later
//! posts a signed notification with the outcome. Signatures are a
//! sha256 hex digest over `order_ref|amount|status|secret` with the
//! amount rendered at two decimal places.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared::error::{AppError, AppResult, ErrorCode};

use super::checkout::OrderDraft;

/// Redirect handoff for an online payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedirectToken {
    pub order_ref: String,
    pub redirect_url: String,
    pub expires_at: i64,
}

/// Signed callback from the payment provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub order_ref: String,
    pub amount: f64,
    /// Provider status string: "paid", "failed" or "cancelled"
    pub status: String,
    pub signature: String,
}

impl PaymentNotification {
    pub fn is_paid(&self) -> bool {
        self.status == "paid"
    }
}

/// Canonical signature over a notification's fields
pub fn notification_digest(order_ref: &str, amount: f64, status: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{order_ref}|{amount:.2}|{status}|{secret}").as_bytes());
    hex::encode(hasher.finalize())
}

/// Gateway seam. The production implementation talks to the hosted
/// checkout; tests substitute their own.
pub trait PaymentGateway: Send + Sync {
    /// Register a transaction and obtain the customer redirect
    fn register_transaction(&self, draft: &OrderDraft) -> AppResult<RedirectToken>;

    /// Verify a notification's signature against the shared secret
    fn verify_notification(&self, notification: &PaymentNotification) -> AppResult<()>;
}

/// Gateway for a provider-hosted payment page
pub struct HostedCheckoutGateway {
    base_url: String,
    secret: String,
    /// How long a redirect stays valid (milliseconds)
    redirect_ttl_millis: i64,
}

impl HostedCheckoutGateway {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            secret: secret.into(),
            redirect_ttl_millis: 15 * 60 * 1000,
        }
    }
}

impl PaymentGateway for HostedCheckoutGateway {
    fn register_transaction(&self, draft: &OrderDraft) -> AppResult<RedirectToken> {
        if draft.total <= 0.0 {
            return Err(AppError::new(ErrorCode::PaymentRegistrationFailed)
                .with_detail("total", draft.total));
        }
        // The redirect carries its own signature so the payment page can
        // verify the amount was not tampered with in transit
        let signature = notification_digest(&draft.order_ref, draft.total, "register", &self.secret);
        let redirect_url = format!(
            "{}/pay?ref={}&amount={:.2}&sig={}",
            self.base_url, draft.order_ref, draft.total, signature
        );
        Ok(RedirectToken {
            order_ref: draft.order_ref.clone(),
            redirect_url,
            expires_at: draft.created_at + self.redirect_ttl_millis,
        })
    }

    fn verify_notification(&self, notification: &PaymentNotification) -> AppResult<()> {
        let expected = notification_digest(
            &notification.order_ref,
            notification.amount,
            &notification.status,
            &self.secret,
        );
        if notification.signature != expected {
            tracing::warn!(
                "Rejected payment notification for {} with bad signature",
                notification.order_ref
            );
            return Err(AppError::new(ErrorCode::PaymentInvalidSignature));
        }
        Ok(())
    }
}

// ==================== Tests ====================
