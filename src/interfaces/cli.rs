use crate::application::payment_flow::{PaymentOrchestrator, PaymentOutcome};
use crate::application::withdrawal::WithdrawalOutcome;
use crate::config::ClientConfig;
use crate::domain::application::{
    ApplicationStatus, Role, TaskApplication, allowed_transitions, permitted_targets,
};
use crate::domain::payment::{BankDetails, CaptureResponse, PaymentQuery, PaymentStatus};
use crate::domain::ports::{Credentials, PaymentGatewayBox};
use crate::error::{PaymentError, Result};
use crate::infrastructure::http::HttpBackend;
use crate::infrastructure::in_memory::{InMemoryBackend, ScriptedGateway};
use crate::interfaces::csv::payment_writer::PaymentWriter;
use crate::interfaces::terminal::{Terminal, TerminalGateway};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::io::Write;
use tokio::io::BufReader;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Base URL of the REST backend
    #[arg(
        long,
        global = true,
        env = "TASKPAY_BASE_URL",
        default_value = "http://localhost:8080"
    )]
    pub base_url: String,

    /// Bearer token for the backend
    #[arg(
        long,
        global = true,
        env = "TASKPAY_TOKEN",
        default_value = "",
        hide_env_values = true
    )]
    pub token: String,

    /// Role the caller acts under (ADMIN, MANAGER, DEVELOPER)
    #[arg(long, global = true, env = "TASKPAY_ROLE")]
    pub role: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long, global = true, env = "TASKPAY_TIMEOUT_MS", default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// How long to wait for a capture before reporting it for reconciliation
    #[arg(
        long,
        global = true,
        env = "TASKPAY_CAPTURE_TIMEOUT_MS",
        default_value_t = 60_000
    )]
    pub capture_timeout_ms: u64,

    /// Publishable key passed to the gateway checkout
    #[arg(long, global = true, env = "TASKPAY_GATEWAY_KEY", default_value = "")]
    pub gateway_key: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the statuses an application can move to next
    Transitions {
        /// Current application status
        status: String,
    },
    /// Pay for an application through the backend and the terminal checkout
    Pay {
        application_id: String,
        /// Current status of the application
        #[arg(long, default_value = "APPLIED")]
        status: String,
    },
    /// Run the payment flow offline against an in-memory backend
    Simulate {
        application_id: String,
        /// Gateway payment reference to complete the checkout with
        #[arg(long, default_value = "pay_simulated")]
        gateway_ref: String,
        /// Make the gateway report a failure with this description
        #[arg(long, conflicts_with = "dismiss")]
        fail: Option<String>,
        /// Close the checkout without paying
        #[arg(long)]
        dismiss: bool,
        /// Status the backend reports for the capture
        #[arg(long)]
        capture_status: Option<String>,
        /// Make the status update after capture fail
        #[arg(long)]
        fail_status_update: bool,
    },
    /// Refund a held payment
    Refund { payment_id: String },
    /// Cancel a payment
    Cancel { payment_id: String },
    /// Withdraw a payment's funds, asking for bank details if none are on file
    Withdraw { payment_id: String },
    /// List payments
    Payments {
        /// Zero-based page index
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        size: u32,
        /// Only include these statuses (repeatable)
        #[arg(long = "status")]
        statuses: Vec<String>,
        #[arg(long)]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
        format: OutputFormat,
    },
    /// Show or add bank details used for withdrawals
    BankDetails {
        #[command(subcommand)]
        action: BankDetailsAction,
    },
}

#[derive(Subcommand)]
pub enum BankDetailsAction {
    Show,
    Add {
        #[arg(long)]
        account_holder: String,
        #[arg(long)]
        account_number: String,
        #[arg(long)]
        ifsc: String,
        #[arg(long)]
        bank_name: Option<String>,
    },
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Csv,
}

#[derive(Serialize)]
struct Dismissed {
    outcome: &'static str,
}

impl Cli {
    fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            timeout_ms: self.timeout_ms,
            capture_timeout_ms: self.capture_timeout_ms,
            gateway_key: self.gateway_key.clone(),
            ..Default::default()
        }
    }

    fn credentials(&self) -> Credentials {
        let role = self.role.as_deref().map(Role::from).unwrap_or(Role::Manager);
        Credentials::new(self.token.clone(), role)
    }

    fn terminal_gateway() -> PaymentGatewayBox {
        Box::new(TerminalGateway::new(
            BufReader::new(tokio::io::stdin()),
            tokio::io::stderr(),
        ))
    }

    fn http_orchestrator(&self, gateway: PaymentGatewayBox) -> Result<PaymentOrchestrator> {
        let config = self.config();
        let backend = HttpBackend::new(&config)?;
        Ok(PaymentOrchestrator::new(
            Box::new(backend.clone()),
            Box::new(backend),
            gateway,
            config,
        ))
    }
}

fn write_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_outcome(out: &mut impl Write, outcome: PaymentOutcome) -> Result<()> {
    match outcome {
        PaymentOutcome::Paid(receipt) => write_json(out, &receipt),
        PaymentOutcome::Dismissed => write_json(out, &Dismissed { outcome: "dismissed" }),
    }
}

/// Executes one CLI command, writing its result to `out`.
pub async fn run(cli: Cli, out: &mut impl Write) -> Result<()> {
    let auth = cli.credentials();

    match &cli.command {
        Command::Transitions { status } => {
            let current = ApplicationStatus::from(status.as_str());
            let targets = match cli.role.as_deref() {
                Some(role) => permitted_targets(&current, &Role::from(role)),
                None => allowed_transitions(&current).to_vec(),
            };
            for target in targets {
                writeln!(out, "{target}")?;
            }
        }
        Command::Pay {
            application_id,
            status,
        } => {
            let orchestrator = cli.http_orchestrator(Cli::terminal_gateway())?;
            let application = TaskApplication::new(
                application_id.clone(),
                ApplicationStatus::from(status.as_str()),
            );
            let outcome = orchestrator.pay_for_application(&auth, &application).await?;
            write_outcome(out, outcome)?;
        }
        Command::Simulate {
            application_id,
            gateway_ref,
            fail,
            dismiss,
            capture_status,
            fail_status_update,
        } => {
            let backend = InMemoryBackend::new();
            backend
                .add_application("task-1", application_id, ApplicationStatus::Applied)
                .await;
            if let Some(status) = capture_status {
                backend
                    .respond_to_capture_with(CaptureResponse {
                        status: Some(PaymentStatus::from(status.as_str())),
                        task_id: Some("task-1".to_string()),
                        application_id: Some(application_id.clone()),
                    })
                    .await;
            }
            if *fail_status_update {
                backend.fail_status_updates("status service unavailable").await;
            }
            let gateway = match (fail, dismiss) {
                (Some(reason), _) => ScriptedGateway::failing(None, reason),
                (None, true) => ScriptedGateway::dismissing(),
                (None, false) => ScriptedGateway::completing(gateway_ref),
            };
            let orchestrator = PaymentOrchestrator::new(
                Box::new(backend.clone()),
                Box::new(backend),
                Box::new(gateway),
                cli.config(),
            );
            let application =
                TaskApplication::new(application_id.clone(), ApplicationStatus::Applied);
            let outcome = orchestrator.pay_for_application(&auth, &application).await?;
            write_outcome(out, outcome)?;
        }
        Command::Refund { payment_id } => {
            let orchestrator = cli.http_orchestrator(Cli::terminal_gateway())?;
            orchestrator.refund_payment(&auth, payment_id).await?;
            writeln!(out, "refund requested for {payment_id}")?;
        }
        Command::Cancel { payment_id } => {
            let orchestrator = cli.http_orchestrator(Cli::terminal_gateway())?;
            orchestrator.cancel_payment(&auth, payment_id).await?;
            writeln!(out, "cancelled {payment_id}")?;
        }
        Command::Withdraw { payment_id } => {
            let orchestrator = cli.http_orchestrator(Cli::terminal_gateway())?;
            let prompt = Terminal::new(BufReader::new(tokio::io::stdin()), tokio::io::stderr());
            match orchestrator.withdraw_funds(&auth, payment_id, &prompt).await? {
                WithdrawalOutcome::Withdrawn
                | WithdrawalOutcome::WithdrawnAfterAddingBankDetails => {
                    writeln!(out, "withdrawal requested for {payment_id}")?;
                }
                WithdrawalOutcome::Abandoned => {
                    writeln!(out, "withdrawal abandoned: no bank details provided")?;
                }
            }
        }
        Command::Payments {
            page,
            size,
            statuses,
            search,
            format,
        } => {
            let statuses = statuses
                .iter()
                .map(|s| PaymentStatus::from(s.as_str()))
                .map(|s| {
                    if s.is_filterable() {
                        Ok(s)
                    } else {
                        Err(PaymentError::Validation(format!(
                            "cannot filter by status {s}"
                        )))
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            let query = PaymentQuery {
                page: *page,
                size: *size,
                statuses,
                search: search.clone(),
            };
            let orchestrator = cli.http_orchestrator(Cli::terminal_gateway())?;
            let payments = orchestrator.fetch_payments(&auth, &query).await?;
            match format {
                OutputFormat::Json => write_json(out, &payments)?,
                OutputFormat::Csv => PaymentWriter::new(out).write_payments(&payments.content)?,
            }
        }
        Command::BankDetails { action } => {
            let orchestrator = cli.http_orchestrator(Cli::terminal_gateway())?;
            match action {
                BankDetailsAction::Show => {
                    let details = orchestrator.fetch_bank_details(&auth).await?;
                    write_json(out, &details)?;
                }
                BankDetailsAction::Add {
                    account_holder,
                    account_number,
                    ifsc,
                    bank_name,
                } => {
                    let details = BankDetails {
                        account_holder_name: account_holder.clone(),
                        account_number: account_number.clone(),
                        ifsc_code: ifsc.clone(),
                        bank_name: bank_name.clone(),
                    };
                    orchestrator.create_bank_details(&auth, &details).await?;
                    writeln!(out, "bank details saved")?;
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("taskpay").chain(args.iter().copied())).unwrap()
    }

    #[tokio::test]
    async fn test_transitions_with_and_without_role() {
        let mut out = Vec::new();
        run(parse(&["transitions", "APPLIED"]), &mut out).await.unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "WITHDRAWN\nACCEPTED\nREJECTED\n");

        let mut out = Vec::new();
        run(parse(&["transitions", "APPLIED", "--role", "DEVELOPER"]), &mut out)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "WITHDRAWN\n");
    }

    #[tokio::test]
    async fn test_simulate_failed_status_update_still_succeeds() {
        let mut out = Vec::new();
        run(parse(&["simulate", "app-1", "--fail-status-update"]), &mut out)
            .await
            .unwrap();
        let receipt: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(receipt["status"], "HELD");
        assert_eq!(receipt["statusUpdated"], false);
    }

    #[tokio::test]
    async fn test_payments_rejects_unknown_filter() {
        let mut out = Vec::new();
        let err = run(parse(&["payments", "--status", "WITHDRAWN"]), &mut out)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[test]
    fn test_fail_and_dismiss_conflict() {
        let result =
            Cli::try_parse_from(["taskpay", "simulate", "app-1", "--fail", "x", "--dismiss"]);
        assert!(result.is_err());
    }
}
