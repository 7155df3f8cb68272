#![allow(dead_code)]

use std::sync::Mutex;
use taskpay::application::callbacks::PaymentCallbacks;
use taskpay::application::payment_flow::{PaymentOrchestrator, PaymentReceipt};
use taskpay::config::ClientConfig;
use taskpay::domain::application::Role;
use taskpay::domain::ports::Credentials;
use taskpay::error::PaymentError;
use taskpay::infrastructure::in_memory::{InMemoryBackend, ScriptedGateway};

pub fn manager() -> Credentials {
    Credentials::new("test-token", Role::Manager)
}

pub fn orchestrator(backend: &InMemoryBackend, gateway: &ScriptedGateway) -> PaymentOrchestrator {
    PaymentOrchestrator::new(
        Box::new(backend.clone()),
        Box::new(backend.clone()),
        Box::new(gateway.clone()),
        ClientConfig::default(),
    )
}

#[derive(Debug, PartialEq)]
pub enum Event {
    Success(serde_json::Value),
    Error(String),
    Dismiss,
}

/// Records every callback invocation in order.
#[derive(Default)]
pub struct RecordingCallbacks {
    events: Mutex<Vec<Event>>,
}

impl RecordingCallbacks {
    pub fn events(&self) -> Vec<Event> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl PaymentCallbacks for RecordingCallbacks {
    fn on_success(&self, receipt: &PaymentReceipt) {
        let json = serde_json::to_value(receipt).unwrap();
        self.events.lock().unwrap().push(Event::Success(json));
    }

    fn on_error(&self, error: &PaymentError) {
        self.events.lock().unwrap().push(Event::Error(error.to_string()));
    }

    fn on_dismiss(&self) {
        self.events.lock().unwrap().push(Event::Dismiss);
    }
}
