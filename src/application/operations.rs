use super::payment_flow::PaymentOrchestrator;
use crate::domain::payment::{BankDetails, PaymentPage, PaymentQuery};
use crate::domain::ports::Credentials;
use crate::error::Result;
use tracing::{debug, info};

/// Single-request operations on the payment surface. Each one is a direct
/// call to the Backend Payment API with logging around it.
impl PaymentOrchestrator {
    pub async fn refund_payment(&self, auth: &Credentials, payment_id: &str) -> Result<()> {
        self.payments.refund_payment(auth, payment_id).await?;
        info!(payment_id, "Refund requested");
        Ok(())
    }

    pub async fn cancel_payment(&self, auth: &Credentials, payment_id: &str) -> Result<()> {
        self.payments.cancel_payment(auth, payment_id).await?;
        info!(payment_id, "Payment cancelled");
        Ok(())
    }

    pub async fn create_bank_details(
        &self,
        auth: &Credentials,
        details: &BankDetails,
    ) -> Result<()> {
        self.payments.create_bank_details(auth, details).await?;
        info!("Bank details saved");
        Ok(())
    }

    pub async fn fetch_bank_details(&self, auth: &Credentials) -> Result<Vec<BankDetails>> {
        self.payments.fetch_bank_details(auth).await
    }

    /// One page of payments, returned exactly as the backend sent it.
    pub async fn fetch_payments(
        &self,
        auth: &Credentials,
        query: &PaymentQuery,
    ) -> Result<PaymentPage> {
        let page = self.payments.fetch_payments(auth, query).await?;
        debug!(
            page = query.page,
            rows = page.content.len(),
            total_pages = page.total_pages,
            "Fetched payments"
        );
        Ok(page)
    }
}
