//! Application layer: the payment flow and the operations around it.
//!
//! `PaymentOrchestrator` owns the backend and gateway ports and exposes the
//! multi-step `pay_for_application` flow alongside the single-request
//! operations of the payment surface.

pub mod callbacks;
pub mod operations;
pub mod payment_flow;
pub mod withdrawal;
