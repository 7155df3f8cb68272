use crate::config::ClientConfig;
use crate::domain::application::{ApplicationStatus, TaskApplication, is_transition_allowed};
use crate::domain::payment::{CheckoutRequest, PaymentHold, PaymentStatus};
use crate::domain::ports::{
    ApplicationApiBox, Credentials, GatewayOutcome, PaymentApiBox, PaymentGatewayBox,
};
use crate::error::{PaymentError, Result};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, PoisonError};
use tracing::{debug, info, warn};

/// Result of a captured payment, as handed to the UI.
///
/// Serializes to `{status, taskId, applicationId, statusUpdated}`. The hold
/// is kept for rendering the amount breakdown and is not serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentReceipt {
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    pub application_id: String,
    /// Whether the follow-up move to `ACCEPTED` went through. A `false`
    /// here never means the payment failed.
    pub status_updated: bool,
    #[serde(skip)]
    pub hold: PaymentHold,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Paid(PaymentReceipt),
    /// The user closed the gateway UI. Not an error.
    Dismissed,
}

/// Drives a task-application payment: hold, gateway checkout, capture, and
/// a best-effort status advance.
///
/// Only one attempt per application may be outstanding at a time; a second
/// call for the same application fails with `AlreadyInProgress` without
/// touching the backend.
pub struct PaymentOrchestrator {
    pub(crate) payments: PaymentApiBox,
    applications: ApplicationApiBox,
    gateway: PaymentGatewayBox,
    config: ClientConfig,
    in_flight: Mutex<HashSet<String>>,
}

struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    application_id: String,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.application_id);
    }
}

impl PaymentOrchestrator {
    /// Creates an orchestrator over the given ports with no attempts in flight.
    pub fn new(
        payments: PaymentApiBox,
        applications: ApplicationApiBox,
        gateway: PaymentGatewayBox,
        config: ClientConfig,
    ) -> Self {
        Self {
            payments,
            applications,
            gateway,
            config,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn begin(&self, application_id: &str) -> Result<InFlight<'_>> {
        let mut set = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(application_id.to_string()) {
            return Err(PaymentError::AlreadyInProgress {
                application_id: application_id.to_string(),
            });
        }
        Ok(InFlight {
            set: &self.in_flight,
            application_id: application_id.to_string(),
        })
    }

    /// Runs the whole payment for `application`.
    ///
    /// Hold, gateway and capture failures abort with an error. Once the
    /// capture is accepted the result is `Paid` no matter what happens to
    /// the status update.
    pub async fn pay_for_application(
        &self,
        auth: &Credentials,
        application: &TaskApplication,
    ) -> Result<PaymentOutcome> {
        if application.id.trim().is_empty() {
            return Err(PaymentError::Validation(
                "application id is required".to_string(),
            ));
        }
        let _in_flight = self.begin(&application.id)?;

        info!(application_id = %application.id, "Creating payment hold");
        let hold = self.payments.create_hold(auth, &application.id).await?;
        let payment_id = required(&hold.payment_id, "paymentId")?;
        let order_id = required(&hold.external_order_id, "externalOrderId")?;

        if !self.gateway.is_loaded() {
            return Err(PaymentError::GatewayUnavailable);
        }

        let checkout = self.checkout_request(&application.id, &order_id, &hold);
        debug!(payment_id = %payment_id, order_id = %order_id, "Opening gateway checkout");
        let reference = match self.gateway.checkout(checkout).await? {
            GatewayOutcome::Completed(reference) => reference,
            GatewayOutcome::Failed(err) => {
                warn!(
                    payment_id = %payment_id,
                    code = err.code.as_deref().unwrap_or("-"),
                    "Gateway reported payment failure"
                );
                return Err(PaymentError::GatewayFailure {
                    code: err.code,
                    description: err.description,
                });
            }
            GatewayOutcome::Dismissed => {
                info!(payment_id = %payment_id, "Checkout dismissed by user");
                return Ok(PaymentOutcome::Dismissed);
            }
        };

        // The user has paid. A capture that outlives the timeout is abandoned
        // and reported as `CaptureTimeout` for reconciliation, never retried.
        let capture = tokio::time::timeout(
            self.config.capture_timeout(),
            self.payments
                .capture_payment(auth, &payment_id, &reference.0),
        )
        .await
        .map_err(|_| PaymentError::CaptureTimeout {
            payment_id: payment_id.clone(),
        })??;

        let status = match capture.status {
            Some(status) if status.is_capture_accepted() => status,
            other => {
                return Err(PaymentError::CaptureVerification {
                    status: other.map(String::from),
                });
            }
        };
        info!(payment_id = %payment_id, status = %status, "Payment captured");

        let application_id = capture
            .application_id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| application.id.clone());
        let task_id = capture.task_id.filter(|id| !id.is_empty());
        let status_updated = self
            .advance_status(auth, application, task_id.as_deref(), &application_id)
            .await;

        Ok(PaymentOutcome::Paid(PaymentReceipt {
            status,
            task_id,
            application_id,
            status_updated,
            hold,
        }))
    }

    /// Moves the application to `ACCEPTED` after a capture. Every failure is
    /// logged and folded into the returned flag.
    async fn advance_status(
        &self,
        auth: &Credentials,
        application: &TaskApplication,
        task_id: Option<&str>,
        application_id: &str,
    ) -> bool {
        let Some(task_id) = task_id else {
            warn!(application_id, "Capture response has no taskId; skipping status update");
            return false;
        };

        let target = ApplicationStatus::Accepted;
        if !is_transition_allowed(&application.status, auth.role(), &target) {
            warn!(
                application_id,
                current = %application.status,
                role = %auth.role(),
                "Status transition to ACCEPTED not permitted; skipping status update"
            );
            return false;
        }

        match self
            .applications
            .update_application_status(auth, task_id, application_id, &target)
            .await
        {
            Ok(()) => {
                info!(task_id, application_id, "Application accepted");
                true
            }
            Err(e) => {
                warn!(
                    task_id,
                    application_id,
                    error = %e,
                    "Status update after capture failed; payment stands"
                );
                false
            }
        }
    }

    fn checkout_request(
        &self,
        application_id: &str,
        order_id: &str,
        hold: &PaymentHold,
    ) -> CheckoutRequest {
        let display_amount = hold.display_amount();
        let mut notes = BTreeMap::new();
        notes.insert("applicationId".to_string(), application_id.to_string());

        CheckoutRequest {
            key: self.config.gateway_key.clone(),
            order_id: order_id.to_string(),
            amount: hold.amount,
            currency: hold.currency.clone(),
            name: self.config.merchant_name.clone(),
            description: format!("Payment for application {application_id}"),
            notes,
            theme_color: self.config.theme_color.clone(),
            display_amount,
            breakdown: hold.amount_breakdown.clone(),
        }
    }
}

fn required(value: &Option<String>, field: &'static str) -> Result<String> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or(PaymentError::MissingHoldField { field })
}
