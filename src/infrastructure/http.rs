//! # REST backend adapter
//!
//! `HttpBackend` speaks the backend's JSON-over-HTTP contract and implements
//! both the Backend Payment API and the Application API. Credentials travel
//! with each call as a bearer token.
//!
//! Only reads are retried. Holds, captures, refunds and withdrawals move
//! money, so a failed attempt is surfaced instead of being sent again.

use crate::config::ClientConfig;
use crate::domain::application::ApplicationStatus;
use crate::domain::payment::{
    BankDetails, CaptureRequest, CaptureResponse, HoldRequest, PaymentHold, PaymentPage,
    PaymentQuery,
};
use crate::domain::ports::{ApplicationApi, Credentials, PaymentApi};
use crate::error::{PaymentError, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use url::Url;

const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

#[derive(Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    max_retries: u32,
}

impl std::fmt::Debug for HttpBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBackend")
            .field("base_url", &self.base_url.as_str())
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl HttpBackend {
    /// Creates a client for the backend at `config.base_url`.
    ///
    /// Fails with `PaymentError::Config` if the configuration does not
    /// validate or the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut base_url = config.validate()?;
        // Relative joins drop the last path segment unless it ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(format!("taskpay/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PaymentError::Config(format!("failed to create HTTP client: {e}")))?;

        info!(
            base_url = %base_url,
            timeout_ms = config.timeout_ms,
            "Created backend client"
        );

        Ok(Self {
            client,
            base_url,
            max_retries: config.max_retries.max(1),
        })
    }

    fn url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| PaymentError::Config(format!("failed to construct URL: {e}")))
    }

    /// Turns a non-2xx response into `PaymentError::Api`, preferring the
    /// backend's `message` field, then the raw body, then the reason phrase.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.message)
            .or_else(|| (!text.trim().is_empty()).then(|| text.trim().to_string()))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });
        Err(PaymentError::api(status.as_u16(), message))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await?;
        Self::check(response).await
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.send(request).await?;
        Ok(response.json::<T>().await?)
    }

    /// GET with retries on network errors and 5xx responses.
    async fn get_json<T: DeserializeOwned>(
        &self,
        auth: &Credentials,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = self
                .client
                .get(url.clone())
                .bearer_auth(auth.token())
                .query(query);
            match self.send_json::<T>(request).await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && is_retryable(&e) => {
                    warn!(
                        url = %url,
                        error = %e,
                        attempt,
                        max_retries = self.max_retries,
                        "Read failed, will retry"
                    );
                    tokio::time::sleep(backoff_delay(attempt)).await;
                }
                Err(e) => {
                    error!(url = %url, error = %e, attempt, "Read failed");
                    return Err(e);
                }
            }
        }
    }
}

/// Delay before retry number `attempt`, doubling from `RETRY_BASE_DELAY`.
fn backoff_delay(attempt: u32) -> Duration {
    RETRY_BASE_DELAY.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

fn is_retryable(error: &PaymentError) -> bool {
    match error {
        PaymentError::Http(e) => e.is_timeout() || e.is_connect(),
        PaymentError::Api { status, .. } => {
            StatusCode::from_u16(*status).is_ok_and(|s| s.is_server_error())
        }
        _ => false,
    }
}

#[async_trait]
impl PaymentApi for HttpBackend {
    async fn create_hold(&self, auth: &Credentials, application_id: &str) -> Result<PaymentHold> {
        let url = self.url("v1/order/payments/hold")?;
        debug!(url = %url, application_id, "Requesting payment hold");
        let request = self
            .client
            .post(url)
            .bearer_auth(auth.token())
            .json(&HoldRequest::new(application_id));
        self.send_json(request).await
    }

    async fn capture_payment(
        &self,
        auth: &Credentials,
        payment_id: &str,
        gateway_payment_id: &str,
    ) -> Result<CaptureResponse> {
        let url = self.url("v1/order/payments/capture")?;
        debug!(url = %url, payment_id, "Capturing payment");
        let request = self
            .client
            .post(url)
            .bearer_auth(auth.token())
            .json(&CaptureRequest {
                payment_id: payment_id.to_string(),
                order_payment_id: gateway_payment_id.to_string(),
            });
        self.send_json(request).await
    }

    async fn refund_payment(&self, auth: &Credentials, payment_id: &str) -> Result<()> {
        let url = self.url("v1/order/payments/refund")?;
        let request = self
            .client
            .post(url)
            .bearer_auth(auth.token())
            .json(&serde_json::json!({ "paymentId": payment_id }));
        self.send(request).await?;
        Ok(())
    }

    async fn cancel_payment(&self, auth: &Credentials, payment_id: &str) -> Result<()> {
        let mut url = self.url("v1/order/payments/cancel/")?;
        url.path_segments_mut()
            .map_err(|_| PaymentError::Config("base URL cannot have a path".into()))?
            .pop_if_empty()
            .push(payment_id);
        let request = self.client.post(url).bearer_auth(auth.token());
        self.send(request).await?;
        Ok(())
    }

    async fn withdraw_funds(&self, auth: &Credentials, payment_id: &str) -> Result<()> {
        let url = self.url("v1/order/payments/withdraw")?;
        let request = self
            .client
            .post(url)
            .bearer_auth(auth.token())
            .json(&serde_json::json!({ "paymentId": payment_id }));
        self.send(request).await?;
        Ok(())
    }

    async fn create_bank_details(&self, auth: &Credentials, details: &BankDetails) -> Result<()> {
        let url = self.url("v1/payment-instrumentations")?;
        let request = self.client.post(url).bearer_auth(auth.token()).json(details);
        self.send(request).await?;
        Ok(())
    }

    async fn fetch_bank_details(&self, auth: &Credentials) -> Result<Vec<BankDetails>> {
        let url = self.url("v1/payment-instrumentations")?;
        self.get_json(auth, url, &[]).await
    }

    async fn fetch_payments(
        &self,
        auth: &Credentials,
        query: &PaymentQuery,
    ) -> Result<PaymentPage> {
        let url = self.url("v1/order/payments")?;
        self.get_json(auth, url, &query.to_pairs()).await
    }
}

#[async_trait]
impl ApplicationApi for HttpBackend {
    async fn update_application_status(
        &self,
        auth: &Credentials,
        task_id: &str,
        application_id: &str,
        status: &ApplicationStatus,
    ) -> Result<()> {
        let mut url = self.url("v1/tasks/")?;
        url.path_segments_mut()
            .map_err(|_| PaymentError::Config("base URL cannot have a path".into()))?
            .pop_if_empty()
            .extend([task_id, "applications", application_id, "status"]);
        debug!(url = %url, status = %status, "Updating application status");
        let request = self
            .client
            .patch(url)
            .bearer_auth(auth.token())
            .json(&serde_json::json!({ "status": status }));
        self.send(request).await?;
        Ok(())
    }
}
