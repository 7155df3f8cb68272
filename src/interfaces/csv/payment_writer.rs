use crate::domain::payment::{Payment, PaymentStatus};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct PaymentRow<'a> {
    payment_id: &'a str,
    application: &'a str,
    amount: String,
    status: &'a str,
    method: &'a str,
    description: &'a str,
    created_at: &'a str,
}

impl<'a> From<&'a Payment> for PaymentRow<'a> {
    fn from(payment: &'a Payment) -> Self {
        Self {
            payment_id: &payment.payment_id,
            application: payment.application_reference_id.as_deref().unwrap_or(""),
            amount: payment
                .display_amount
                .map(|a| a.to_string())
                .unwrap_or_default(),
            status: payment.status.as_ref().map_or("", PaymentStatus::as_str),
            method: payment.method.as_deref().unwrap_or(""),
            description: payment.description.as_deref().unwrap_or(""),
            created_at: payment.created_at.as_deref().unwrap_or(""),
        }
    }
}

/// Writes a payments listing as CSV, one row per payment.
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PaymentWriter<W> {
    /// Creates a writer that emits the header before the first row.
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_payments<'a>(
        &mut self,
        payments: impl IntoIterator<Item = &'a Payment>,
    ) -> Result<()> {
        for payment in payments {
            self.writer.serialize(PaymentRow::from(payment))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
