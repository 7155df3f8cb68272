use super::payment_flow::PaymentOrchestrator;
use crate::domain::payment::BankDetails;
use crate::domain::ports::Credentials;
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

/// Asks the user for bank details when a withdrawal cannot proceed without
/// them. `None` means the user backed out.
#[async_trait]
pub trait BankDetailsPrompt: Send + Sync {
    async fn request_bank_details(&self) -> Result<Option<BankDetails>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalOutcome {
    Withdrawn,
    /// Bank details were missing, got added, and the retry went through.
    WithdrawnAfterAddingBankDetails,
    /// Bank details were missing and the user declined to add them.
    Abandoned,
}

impl PaymentOrchestrator {
    /// Withdraws the funds of `payment_id`.
    ///
    /// If the backend answers "Bank details not found", the user is prompted,
    /// the details are saved and the same withdrawal is sent once more. Any
    /// other failure is returned unchanged.
    pub async fn withdraw_funds(
        &self,
        auth: &Credentials,
        payment_id: &str,
        prompt: &dyn BankDetailsPrompt,
    ) -> Result<WithdrawalOutcome> {
        match self.payments.withdraw_funds(auth, payment_id).await {
            Ok(()) => {
                info!(payment_id, "Withdrawal requested");
                Ok(WithdrawalOutcome::Withdrawn)
            }
            Err(e) if e.is_bank_details_missing() => {
                info!(payment_id, "No bank details on file; prompting");
                let Some(details) = prompt.request_bank_details().await? else {
                    info!(payment_id, "Withdrawal abandoned");
                    return Ok(WithdrawalOutcome::Abandoned);
                };
                self.payments.create_bank_details(auth, &details).await?;
                self.payments.withdraw_funds(auth, payment_id).await?;
                info!(payment_id, "Withdrawal requested after adding bank details");
                Ok(WithdrawalOutcome::WithdrawnAfterAddingBankDetails)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::domain::application::{ApplicationStatus, Role, TaskApplication};
    use crate::error::PaymentError;
    use crate::infrastructure::in_memory::{BackendCall, InMemoryBackend, ScriptedGateway};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedPrompt {
        details: Option<BankDetails>,
        asked: AtomicUsize,
    }

    impl FixedPrompt {
        fn new(details: Option<BankDetails>) -> Self {
            Self {
                details,
                asked: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BankDetailsPrompt for FixedPrompt {
        async fn request_bank_details(&self) -> Result<Option<BankDetails>> {
            self.asked.fetch_add(1, Ordering::SeqCst);
            Ok(self.details.clone())
        }
    }

    fn details() -> BankDetails {
        BankDetails {
            account_holder_name: "Asha Rao".into(),
            account_number: "000123456789".into(),
            ifsc_code: "HDFC0001234".into(),
            bank_name: None,
        }
    }

    async fn held_payment(backend: &InMemoryBackend) -> (PaymentOrchestrator, Credentials) {
        backend.add_application("t1", "app-1", ApplicationStatus::Applied).await;
        let orchestrator = PaymentOrchestrator::new(
            Box::new(backend.clone()),
            Box::new(backend.clone()),
            Box::new(ScriptedGateway::completing("pay_abc")),
            ClientConfig::default(),
        );
        let auth = Credentials::new("test-token", Role::Manager);
        let app = TaskApplication::new("app-1", ApplicationStatus::Applied);
        orchestrator.pay_for_application(&auth, &app).await.unwrap();
        (orchestrator, auth)
    }

    #[tokio::test]
    async fn test_withdraw_with_bank_details_on_file() {
        let backend = InMemoryBackend::new();
        backend.add_bank_details(details()).await;
        let (orchestrator, auth) = held_payment(&backend).await;
        let prompt = FixedPrompt::new(None);

        let outcome = orchestrator
            .withdraw_funds(&auth, "payment_1", &prompt)
            .await
            .unwrap();

        assert_eq!(outcome, WithdrawalOutcome::Withdrawn);
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_bank_details_prompts_and_retries_same_payment() {
        let backend = InMemoryBackend::new();
        let (orchestrator, auth) = held_payment(&backend).await;
        let prompt = FixedPrompt::new(Some(details()));

        let outcome = orchestrator
            .withdraw_funds(&auth, "payment_1", &prompt)
            .await
            .unwrap();

        assert_eq!(outcome, WithdrawalOutcome::WithdrawnAfterAddingBankDetails);
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 1);
        let withdrawals: Vec<_> = backend
            .calls()
            .await
            .into_iter()
            .filter_map(|c| match c {
                BackendCall::Withdraw { payment_id } => Some(payment_id),
                _ => None,
            })
            .collect();
        assert_eq!(withdrawals, vec!["payment_1", "payment_1"]);
    }

    #[tokio::test]
    async fn test_declined_prompt_abandons_withdrawal() {
        let backend = InMemoryBackend::new();
        let (orchestrator, auth) = held_payment(&backend).await;
        let prompt = FixedPrompt::new(None);

        let outcome = orchestrator
            .withdraw_funds(&auth, "payment_1", &prompt)
            .await
            .unwrap();

        assert_eq!(outcome, WithdrawalOutcome::Abandoned);
        assert!(backend.bank_details().await.is_empty());
    }

    #[tokio::test]
    async fn test_other_errors_do_not_prompt() {
        let backend = InMemoryBackend::new();
        backend.add_bank_details(details()).await;
        let (orchestrator, auth) = held_payment(&backend).await;
        let prompt = FixedPrompt::new(Some(details()));

        let err = orchestrator
            .withdraw_funds(&auth, "no-such-payment", &prompt)
            .await
            .unwrap_err();

        assert!(matches!(err, PaymentError::Api { status: 404, .. }));
        assert_eq!(prompt.asked.load(Ordering::SeqCst), 0);
    }
}
