use super::application::{ApplicationStatus, Role};
use super::payment::{
    BankDetails, CaptureResponse, CheckoutRequest, PaymentHold, PaymentPage, PaymentQuery,
};
use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Who is calling the backend: a bearer token plus the role it acts under.
///
/// Passed explicitly into every port call; nothing reads credentials from
/// ambient state.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    token: String,
    role: Role,
}

impl Credentials {
    /// Creates credentials for `token` acting as `role`.
    pub fn new(token: impl Into<String>, role: Role) -> Self {
        Self {
            token: token.into(),
            role,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn role(&self) -> &Role {
        &self.role
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}

/// Backend Payment API.
#[async_trait]
pub trait PaymentApi: Send + Sync {
    async fn create_hold(&self, auth: &Credentials, application_id: &str) -> Result<PaymentHold>;
    async fn capture_payment(
        &self,
        auth: &Credentials,
        payment_id: &str,
        gateway_payment_id: &str,
    ) -> Result<CaptureResponse>;
    async fn refund_payment(&self, auth: &Credentials, payment_id: &str) -> Result<()>;
    async fn cancel_payment(&self, auth: &Credentials, payment_id: &str) -> Result<()>;
    async fn withdraw_funds(&self, auth: &Credentials, payment_id: &str) -> Result<()>;
    async fn create_bank_details(&self, auth: &Credentials, details: &BankDetails) -> Result<()>;
    async fn fetch_bank_details(&self, auth: &Credentials) -> Result<Vec<BankDetails>>;
    async fn fetch_payments(&self, auth: &Credentials, query: &PaymentQuery)
    -> Result<PaymentPage>;
}

/// User/Application API; only the status update is needed here.
#[async_trait]
pub trait ApplicationApi: Send + Sync {
    async fn update_application_status(
        &self,
        auth: &Credentials,
        task_id: &str,
        application_id: &str,
        status: &ApplicationStatus,
    ) -> Result<()>;
}

/// Reference the gateway hands back once the user has paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayPaymentRef(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayError {
    pub code: Option<String>,
    pub description: String,
}

/// How the user left the gateway's collection UI. Exactly one of these is
/// produced per checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayOutcome {
    Completed(GatewayPaymentRef),
    Failed(GatewayError),
    Dismissed,
}

/// Client-side payment gateway SDK.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Whether the SDK is loaded and can open its UI.
    fn is_loaded(&self) -> bool;

    /// Opens the collection UI and waits, for as long as the user takes,
    /// until it reports back.
    async fn checkout(&self, request: CheckoutRequest) -> Result<GatewayOutcome>;
}

pub type PaymentApiBox = Box<dyn PaymentApi>;
pub type ApplicationApiBox = Box<dyn ApplicationApi>;
pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
