use super::money::{DisplayAmount, MinorUnits};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Server-side status of a payment.
///
/// The backend owns this lifecycle; the client only distinguishes an
/// accepted capture from everything else. Values outside the known set are
/// carried through as `Other` rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PaymentStatus {
    Held,
    Created,
    Processing,
    Released,
    Refunded,
    Cancelled,
    Failed,
    Paid,
    Withdrawn,
    Other(String),
}

impl PaymentStatus {
    /// Statuses offered as filters in the payments table.
    pub const FILTERABLE: [PaymentStatus; 8] = [
        Self::Held,
        Self::Released,
        Self::Refunded,
        Self::Created,
        Self::Cancelled,
        Self::Processing,
        Self::Failed,
        Self::Paid,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Self::Held => "HELD",
            Self::Created => "CREATED",
            Self::Processing => "PROCESSING",
            Self::Released => "RELEASED",
            Self::Refunded => "REFUNDED",
            Self::Cancelled => "CANCELLED",
            Self::Failed => "FAILED",
            Self::Paid => "PAID",
            Self::Withdrawn => "WITHDRAWN",
            Self::Other(raw) => raw,
        }
    }

    /// A capture is only considered successful when the hold comes back as
    /// `HELD` or `CREATED`.
    pub fn is_capture_accepted(&self) -> bool {
        matches!(self, Self::Held | Self::Created)
    }

    pub fn is_filterable(&self) -> bool {
        Self::FILTERABLE.contains(self)
    }
}

impl From<&str> for PaymentStatus {
    fn from(value: &str) -> Self {
        match value {
            "HELD" => Self::Held,
            "CREATED" => Self::Created,
            "PROCESSING" => Self::Processing,
            "RELEASED" => Self::Released,
            "REFUNDED" => Self::Refunded,
            "CANCELLED" => Self::Cancelled,
            "FAILED" => Self::Failed,
            "PAID" => Self::Paid,
            "WITHDRAWN" => Self::Withdrawn,
            other => Self::Other(other.to_string()),
        }
    }
}

impl From<String> for PaymentStatus {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<PaymentStatus> for String {
    fn from(status: PaymentStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of a hold's amount breakdown. Only used for display, so every
/// field is optional and entries of any other shape are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AmountBreakdown {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<DisplayAmount>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Hold returned by the backend when a payment is started.
///
/// `payment_id` and `external_order_id` are optional here because the
/// backend does not guarantee them; the payment flow rejects a hold missing
/// either one before the gateway is opened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentHold {
    #[serde(default)]
    pub payment_id: Option<String>,
    #[serde(default)]
    pub external_order_id: Option<String>,
    #[serde(default)]
    pub amount: MinorUnits,
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub display_amount: Option<DisplayAmount>,
    #[serde(default)]
    pub amount_breakdown: Vec<AmountBreakdown>,
}

impl PaymentHold {
    /// Human-readable amount, derived from the minor units when the backend
    /// did not send one.
    pub fn display_amount(&self) -> DisplayAmount {
        self.display_amount
            .unwrap_or_else(|| self.amount.to_display(&self.currency))
    }
}

/// Body of a hold request. The backend accepts either key, so both are sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldRequest {
    pub application_id: String,
    pub task_application_id: String,
}

impl HoldRequest {
    pub fn new(application_id: impl Into<String>) -> Self {
        let application_id = application_id.into();
        Self {
            task_application_id: application_id.clone(),
            application_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureRequest {
    pub payment_id: String,
    pub order_payment_id: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<String>,
}

/// Row of the payments table.
///
/// Listings are handed on exactly as received: absent fields stay absent,
/// fields this client does not model are kept in `extra`, and a missing or
/// null `status` does not fail the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_reference_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_amount: Option<DisplayAmount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PaymentStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPage {
    pub content: Vec<Payment>,
    pub total_pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_elements: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Filters for the payments listing. Pages are zero-based.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentQuery {
    pub page: u32,
    pub size: u32,
    pub statuses: Vec<PaymentStatus>,
    pub search: Option<String>,
}

impl Default for PaymentQuery {
    fn default() -> Self {
        Self {
            page: 0,
            size: 10,
            statuses: Vec::new(),
            search: None,
        }
    }
}

impl PaymentQuery {
    /// Query-string pairs in the order the backend documents them.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("page", self.page.to_string()), ("size", self.size.to_string())];
        if !self.statuses.is_empty() {
            let joined = self
                .statuses
                .iter()
                .map(PaymentStatus::as_str)
                .collect::<Vec<_>>()
                .join(",");
            pairs.push(("statuses", joined));
        }
        if let Some(search) = self.search.as_deref().map(str::trim)
            && !search.is_empty()
        {
            pairs.push(("search", search.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDetails {
    pub account_holder_name: String,
    pub account_number: String,
    pub ifsc_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
}

/// What the gateway client needs to open its collection UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutRequest {
    pub key: String,
    pub order_id: String,
    pub amount: MinorUnits,
    pub currency: String,
    pub name: String,
    pub description: String,
    pub notes: BTreeMap<String, String>,
    pub theme_color: String,
    pub display_amount: DisplayAmount,
    pub breakdown: Vec<AmountBreakdown>,
}
