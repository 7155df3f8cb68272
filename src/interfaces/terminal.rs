//! Line-oriented stand-ins for the browser-side pieces: the gateway's
//! checkout UI and the "add bank details" form.

use crate::application::withdrawal::BankDetailsPrompt;
use crate::domain::payment::{BankDetails, CheckoutRequest};
use crate::domain::ports::{GatewayError, GatewayOutcome, GatewayPaymentRef, PaymentGateway};
use crate::error::Result;
use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Shared reader/writer pair; both the gateway and the prompt may talk to
/// the same terminal.
pub struct Terminal<R, W> {
    io: Mutex<(R, W)>,
}

impl<R, W> Terminal<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a terminal that prompts on `writer` and reads from `reader`.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((reader, writer)),
        }
    }

    /// Prints `prompt` and returns the next trimmed line, or `None` at EOF.
    async fn ask(&self, prompt: &str) -> Result<Option<String>> {
        let mut io = self.io.lock().await;
        let (reader, writer) = &mut *io;
        writer.write_all(prompt.as_bytes()).await?;
        writer.flush().await?;
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

/// Reads the checkout result from the terminal:
/// a payment reference completes, `fail[: reason]` fails, and an empty
/// line, `dismiss` or EOF closes the checkout.
pub struct TerminalGateway<R, W> {
    terminal: Terminal<R, W>,
}

impl<R, W> TerminalGateway<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a gateway over its own terminal.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            terminal: Terminal::new(reader, writer),
        }
    }
}

pub fn parse_checkout_reply(reply: Option<&str>) -> GatewayOutcome {
    match reply.map(str::trim) {
        None | Some("") | Some("dismiss") => GatewayOutcome::Dismissed,
        Some(line) if line == "fail" || line.starts_with("fail:") => {
            let reason = line.trim_start_matches("fail").trim_start_matches(':').trim();
            GatewayOutcome::Failed(GatewayError {
                code: None,
                description: if reason.is_empty() {
                    "payment failed".to_string()
                } else {
                    reason.to_string()
                },
            })
        }
        Some(reference) => GatewayOutcome::Completed(GatewayPaymentRef(reference.to_string())),
    }
}

#[async_trait]
impl<R, W> PaymentGateway for TerminalGateway<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    fn is_loaded(&self) -> bool {
        true
    }

    async fn checkout(&self, request: CheckoutRequest) -> Result<GatewayOutcome> {
        let mut prompt = format!(
            "{}: {} {} (order {})\n",
            request.name, request.display_amount, request.currency, request.order_id
        );
        for item in &request.breakdown {
            let label = item.label.as_deref().unwrap_or("-");
            let amount = item.amount.map(|a| a.to_string()).unwrap_or_default();
            prompt.push_str(&format!("  {label:<24} {amount}\n"));
        }
        prompt.push_str("Payment reference (empty to dismiss, `fail: reason` to fail): ");

        let reply = self.terminal.ask(&prompt).await?;
        Ok(parse_checkout_reply(reply.as_deref()))
    }
}

#[async_trait]
impl<R, W> BankDetailsPrompt for Terminal<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn request_bank_details(&self) -> Result<Option<BankDetails>> {
        let holder = match self
            .ask("Bank details required. Account holder name (empty to cancel): ")
            .await?
        {
            Some(holder) if !holder.is_empty() => holder,
            _ => return Ok(None),
        };
        let Some(account_number) = self.ask("Account number: ").await? else {
            return Ok(None);
        };
        let Some(ifsc_code) = self.ask("IFSC code: ").await? else {
            return Ok(None);
        };
        let bank_name = self
            .ask("Bank name (optional): ")
            .await?
            .filter(|name| !name.is_empty());

        Ok(Some(BankDetails {
            account_holder_name: holder,
            account_number,
            ifsc_code,
            bank_name,
        }))
    }
}
