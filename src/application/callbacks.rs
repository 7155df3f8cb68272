use super::payment_flow::{PaymentOrchestrator, PaymentOutcome, PaymentReceipt};
use crate::domain::application::TaskApplication;
use crate::domain::ports::Credentials;
use crate::error::PaymentError;
use tracing::error;

/// UI hooks for a payment attempt.
///
/// For one attempt at most one of `on_success`/`on_error` fires. A dismissed
/// checkout fires neither and calls `on_dismiss` so the caller can clear
/// its busy indicator.
pub trait PaymentCallbacks: Send + Sync {
    fn on_success(&self, receipt: &PaymentReceipt);
    fn on_error(&self, error: &PaymentError);
    fn on_dismiss(&self) {}
}

impl PaymentOrchestrator {
    /// Callback form of [`PaymentOrchestrator::pay_for_application`]. Errors
    /// never escape; they are delivered to `on_error`.
    pub async fn pay_for_application_with(
        &self,
        auth: &Credentials,
        application: &TaskApplication,
        callbacks: &dyn PaymentCallbacks,
    ) {
        match self.pay_for_application(auth, application).await {
            Ok(PaymentOutcome::Paid(receipt)) => callbacks.on_success(&receipt),
            Ok(PaymentOutcome::Dismissed) => callbacks.on_dismiss(),
            Err(e) => {
                error!(application_id = %application.id, error = %e, "Payment failed");
                callbacks.on_error(&e);
            }
        }
    }
}
