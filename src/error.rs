use thiserror::Error;

/// Message the backend returns when a withdrawal is attempted before any
/// bank account has been registered.
pub const BANK_DETAILS_NOT_FOUND: &str = "Bank details not found";

#[derive(Error, Debug)]
pub enum PaymentError {
    #[error("hold response is missing `{field}`")]
    MissingHoldField { field: &'static str },
    #[error("payment gateway client is not loaded")]
    GatewayUnavailable,
    #[error("payment failed: {description}")]
    GatewayFailure {
        code: Option<String>,
        description: String,
    },
    #[error("unexpected capture status: {}", status.as_deref().unwrap_or("<missing>"))]
    CaptureVerification { status: Option<String> },
    #[error("capture of payment {payment_id} timed out; the hold needs reconciliation")]
    CaptureTimeout { payment_id: String },
    #[error("a payment for application {application_id} is already in progress")]
    AlreadyInProgress { application_id: String },
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PaymentError>;

impl PaymentError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Text suitable for showing to the user: the backend's own message when
    /// one was returned, otherwise the error's display form.
    pub fn message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Withdrawals report a missing bank account only through the message
    /// text, so this is an exact string comparison.
    pub fn is_bank_details_missing(&self) -> bool {
        matches!(self, Self::Api { message, .. } if message == BANK_DETAILS_NOT_FOUND)
    }
}
