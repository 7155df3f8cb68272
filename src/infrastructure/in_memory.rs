use crate::domain::application::{ApplicationStatus, is_transition_allowed};
use crate::domain::money::MinorUnits;
use crate::domain::payment::{
    BankDetails, CaptureResponse, CheckoutRequest, Payment, PaymentHold, PaymentPage,
    PaymentQuery, PaymentStatus,
};
use crate::domain::ports::{
    ApplicationApi, Credentials, GatewayError, GatewayOutcome, GatewayPaymentRef, PaymentApi,
    PaymentGateway,
};
use crate::error::{BANK_DETAILS_NOT_FOUND, PaymentError, Result};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Every request the in-memory backend has served, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    CreateHold {
        application_id: String,
    },
    Capture {
        payment_id: String,
        gateway_payment_id: String,
    },
    UpdateStatus {
        task_id: String,
        application_id: String,
        status: ApplicationStatus,
    },
    Refund {
        payment_id: String,
    },
    Cancel {
        payment_id: String,
    },
    Withdraw {
        payment_id: String,
    },
    CreateBankDetails,
    FetchBankDetails,
    FetchPayments {
        query: PaymentQuery,
    },
}

#[derive(Debug, Clone)]
struct StoredApplication {
    task_id: String,
    status: ApplicationStatus,
}

#[derive(Debug, Clone)]
struct StoredPayment {
    application_id: String,
    status: PaymentStatus,
    amount: MinorUnits,
    currency: String,
}

#[derive(Default)]
struct BackendState {
    applications: HashMap<String, StoredApplication>,
    // Keyed by payment id; BTreeMap keeps listings in a stable order.
    payments: BTreeMap<String, StoredPayment>,
    bank_details: Vec<BankDetails>,
    calls: Vec<BackendCall>,
    next_id: u64,
    hold_override: Option<PaymentHold>,
    capture_override: Option<CaptureResponse>,
    capture_delay: Option<Duration>,
    status_update_failure: Option<String>,
}

/// A thread-safe, in-process stand-in for the REST backend.
///
/// Implements both the Backend Payment API and the Application API over
/// shared state, so clones observe each other's writes. Status updates go
/// through the same transition rules as the real backend, using the caller's
/// role. Responses can be overridden to script failure cases.
#[derive(Default, Clone)]
pub struct InMemoryBackend {
    state: Arc<RwLock<BackendState>>,
}

impl InMemoryBackend {
    pub const DEFAULT_AMOUNT: MinorUnits = MinorUnits(1000);
    pub const DEFAULT_CURRENCY: &'static str = "INR";

    /// Creates a new, empty backend with no applications or payments.
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_application(
        &self,
        task_id: &str,
        application_id: &str,
        status: ApplicationStatus,
    ) {
        let mut state = self.state.write().await;
        state.applications.insert(
            application_id.to_string(),
            StoredApplication {
                task_id: task_id.to_string(),
                status,
            },
        );
    }

    pub async fn add_bank_details(&self, details: BankDetails) {
        self.state.write().await.bank_details.push(details);
    }

    /// Answer every hold request with `hold` instead of a generated one.
    pub async fn respond_to_hold_with(&self, hold: PaymentHold) {
        self.state.write().await.hold_override = Some(hold);
    }

    /// Answer every capture request with `capture` instead of the stored state.
    pub async fn respond_to_capture_with(&self, capture: CaptureResponse) {
        self.state.write().await.capture_override = Some(capture);
    }

    /// Make every capture take `delay` before answering.
    pub async fn delay_captures(&self, delay: Duration) {
        self.state.write().await.capture_delay = Some(delay);
    }

    /// Make every status update fail with a 500 carrying `message`.
    pub async fn fail_status_updates(&self, message: &str) {
        self.state.write().await.status_update_failure = Some(message.to_string());
    }

    pub async fn calls(&self) -> Vec<BackendCall> {
        self.state.read().await.calls.clone()
    }

    pub async fn application_status(&self, application_id: &str) -> Option<ApplicationStatus> {
        let state = self.state.read().await;
        state
            .applications
            .get(application_id)
            .map(|a| a.status.clone())
    }

    pub async fn payment_status(&self, payment_id: &str) -> Option<PaymentStatus> {
        let state = self.state.read().await;
        state.payments.get(payment_id).map(|p| p.status.clone())
    }

    pub async fn bank_details(&self) -> Vec<BankDetails> {
        self.state.read().await.bank_details.clone()
    }

    fn not_found(what: &str, id: &str) -> PaymentError {
        PaymentError::api(404, format!("{what} not found: {id}"))
    }

    /// Moves a stored payment to `to` if it is currently in one of `from`.
    async fn move_payment(
        &self,
        call: BackendCall,
        payment_id: &str,
        from: &[PaymentStatus],
        to: PaymentStatus,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.calls.push(call);
        let payment = state
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| Self::not_found("Payment", payment_id))?;
        if !from.contains(&payment.status) {
            return Err(PaymentError::api(
                409,
                format!("Payment {payment_id} is {}", payment.status),
            ));
        }
        payment.status = to;
        Ok(())
    }
}

#[async_trait]
impl PaymentApi for InMemoryBackend {
    async fn create_hold(&self, _auth: &Credentials, application_id: &str) -> Result<PaymentHold> {
        let mut state = self.state.write().await;
        state.calls.push(BackendCall::CreateHold {
            application_id: application_id.to_string(),
        });
        if let Some(hold) = state.hold_override.clone() {
            return Ok(hold);
        }

        state.next_id += 1;
        let n = state.next_id;
        let payment_id = format!("payment_{n}");
        let amount = Self::DEFAULT_AMOUNT;
        let currency = Self::DEFAULT_CURRENCY.to_string();
        state.payments.insert(
            payment_id.clone(),
            StoredPayment {
                application_id: application_id.to_string(),
                status: PaymentStatus::Created,
                amount,
                currency: currency.clone(),
            },
        );

        Ok(PaymentHold {
            payment_id: Some(payment_id),
            external_order_id: Some(format!("order_{n}")),
            amount,
            display_amount: Some(amount.to_display(&currency)),
            currency,
            amount_breakdown: Vec::new(),
        })
    }

    async fn capture_payment(
        &self,
        _auth: &Credentials,
        payment_id: &str,
        gateway_payment_id: &str,
    ) -> Result<CaptureResponse> {
        let delay = self.state.read().await.capture_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().await;
        state.calls.push(BackendCall::Capture {
            payment_id: payment_id.to_string(),
            gateway_payment_id: gateway_payment_id.to_string(),
        });
        if let Some(capture) = state.capture_override.clone() {
            return Ok(capture);
        }

        let payment = state
            .payments
            .get_mut(payment_id)
            .ok_or_else(|| Self::not_found("Payment", payment_id))?;
        payment.status = PaymentStatus::Held;
        let application_id = payment.application_id.clone();
        let task_id = state
            .applications
            .get(&application_id)
            .map(|a| a.task_id.clone());

        Ok(CaptureResponse {
            status: Some(PaymentStatus::Held),
            task_id,
            application_id: Some(application_id),
        })
    }

    async fn refund_payment(&self, _auth: &Credentials, payment_id: &str) -> Result<()> {
        let call = BackendCall::Refund {
            payment_id: payment_id.to_string(),
        };
        self.move_payment(call, payment_id, &[PaymentStatus::Held], PaymentStatus::Refunded)
            .await
    }

    async fn cancel_payment(&self, _auth: &Credentials, payment_id: &str) -> Result<()> {
        let call = BackendCall::Cancel {
            payment_id: payment_id.to_string(),
        };
        self.move_payment(
            call,
            payment_id,
            &[PaymentStatus::Created, PaymentStatus::Held],
            PaymentStatus::Cancelled,
        )
        .await
    }

    async fn withdraw_funds(&self, _auth: &Credentials, payment_id: &str) -> Result<()> {
        let call = BackendCall::Withdraw {
            payment_id: payment_id.to_string(),
        };
        let has_bank_details = !self.state.read().await.bank_details.is_empty();
        if !has_bank_details {
            self.state.write().await.calls.push(call);
            return Err(PaymentError::api(400, BANK_DETAILS_NOT_FOUND));
        }
        self.move_payment(
            call,
            payment_id,
            &[PaymentStatus::Held, PaymentStatus::Released, PaymentStatus::Paid],
            PaymentStatus::Withdrawn,
        )
        .await
    }

    async fn create_bank_details(&self, _auth: &Credentials, details: &BankDetails) -> Result<()> {
        let mut state = self.state.write().await;
        state.calls.push(BackendCall::CreateBankDetails);
        state.bank_details.push(details.clone());
        Ok(())
    }

    async fn fetch_bank_details(&self, _auth: &Credentials) -> Result<Vec<BankDetails>> {
        let mut state = self.state.write().await;
        state.calls.push(BackendCall::FetchBankDetails);
        Ok(state.bank_details.clone())
    }

    async fn fetch_payments(
        &self,
        _auth: &Credentials,
        query: &PaymentQuery,
    ) -> Result<PaymentPage> {
        if query.size == 0 {
            return Err(PaymentError::api(400, "Page size must not be less than one"));
        }
        let mut state = self.state.write().await;
        state.calls.push(BackendCall::FetchPayments {
            query: query.clone(),
        });

        let search = query.search.as_deref().map(str::to_lowercase);
        let matching: Vec<Payment> = state
            .payments
            .iter()
            .filter(|(_, p)| query.statuses.is_empty() || query.statuses.contains(&p.status))
            .filter(|(id, p)| match &search {
                Some(s) => {
                    id.to_lowercase().contains(s.as_str())
                        || p.application_id.to_lowercase().contains(s.as_str())
                }
                None => true,
            })
            .map(|(id, p)| Payment {
                payment_id: id.clone(),
                application_reference_id: Some(p.application_id.clone()),
                display_amount: Some(p.amount.to_display(&p.currency)),
                status: Some(p.status.clone()),
                method: None,
                description: Some(format!("Payment for application {}", p.application_id)),
                created_at: None,
                extra: Default::default(),
            })
            .collect();

        let size = query.size as usize;
        let total_elements = matching.len() as u64;
        let total_pages = matching.len().div_ceil(size) as u32;
        let content = matching
            .into_iter()
            .skip(query.page as usize * size)
            .take(size)
            .collect();

        Ok(PaymentPage {
            content,
            total_pages,
            total_elements: Some(total_elements),
            extra: Default::default(),
        })
    }
}

#[async_trait]
impl ApplicationApi for InMemoryBackend {
    async fn update_application_status(
        &self,
        auth: &Credentials,
        task_id: &str,
        application_id: &str,
        status: &ApplicationStatus,
    ) -> Result<()> {
        let mut state = self.state.write().await;
        state.calls.push(BackendCall::UpdateStatus {
            task_id: task_id.to_string(),
            application_id: application_id.to_string(),
            status: status.clone(),
        });
        if let Some(message) = &state.status_update_failure {
            return Err(PaymentError::api(500, message.clone()));
        }

        let application = state
            .applications
            .get_mut(application_id)
            .filter(|a| a.task_id == task_id)
            .ok_or_else(|| Self::not_found("Application", application_id))?;
        if !is_transition_allowed(&application.status, auth.role(), status) {
            return Err(PaymentError::api(
                409,
                format!(
                    "Cannot move application from {} to {status} as {}",
                    application.status,
                    auth.role()
                ),
            ));
        }
        application.status = status.clone();
        Ok(())
    }
}

/// Gateway stand-in that answers every checkout with a fixed outcome and
/// remembers what it was asked to collect.
#[derive(Clone)]
pub struct ScriptedGateway {
    loaded: bool,
    outcome: GatewayOutcome,
    checkouts: Arc<RwLock<Vec<CheckoutRequest>>>,
}

impl ScriptedGateway {
    fn with_outcome(outcome: GatewayOutcome) -> Self {
        Self {
            loaded: true,
            outcome,
            checkouts: Arc::default(),
        }
    }

    /// A gateway that completes every checkout with `reference`.
    pub fn completing(reference: &str) -> Self {
        Self::with_outcome(GatewayOutcome::Completed(GatewayPaymentRef(
            reference.to_string(),
        )))
    }

    /// A gateway that reports every checkout as failed.
    pub fn failing(code: Option<&str>, description: &str) -> Self {
        Self::with_outcome(GatewayOutcome::Failed(GatewayError {
            code: code.map(str::to_string),
            description: description.to_string(),
        }))
    }

    /// A gateway whose user closes every checkout.
    pub fn dismissing() -> Self {
        Self::with_outcome(GatewayOutcome::Dismissed)
    }

    /// A gateway whose SDK never loaded.
    pub fn unloaded() -> Self {
        Self {
            loaded: false,
            ..Self::dismissing()
        }
    }

    /// Checkout requests seen so far, in order.
    pub async fn checkouts(&self) -> Vec<CheckoutRequest> {
        self.checkouts.read().await.clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    async fn checkout(&self, request: CheckoutRequest) -> Result<GatewayOutcome> {
        self.checkouts.write().await.push(request);
        Ok(self.outcome.clone())
    }
}
