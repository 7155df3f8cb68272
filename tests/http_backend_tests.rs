mod common;

use common::{Event, RecordingCallbacks, manager};
use serde_json::json;
use taskpay::application::payment_flow::{PaymentOrchestrator, PaymentOutcome};
use taskpay::config::ClientConfig;
use taskpay::domain::application::{ApplicationStatus, TaskApplication};
use taskpay::domain::payment::{PaymentQuery, PaymentStatus};
use taskpay::domain::ports::{ApplicationApi, PaymentApi};
use taskpay::error::PaymentError;
use taskpay::infrastructure::http::HttpBackend;
use taskpay::infrastructure::in_memory::ScriptedGateway;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> HttpBackend {
    HttpBackend::new(&ClientConfig {
        base_url: server.uri(),
        max_retries: 2,
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_create_hold_sends_application_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/order/payments/hold"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({
            "applicationId": "app-1",
            "taskApplicationId": "app-1"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paymentId": "p1",
            "externalOrderId": "o1",
            "amount": 1000,
            "currency": "INR",
            "displayAmount": 10,
            "amountBreakdown": [
                {"label": "Task fee", "amount": 9.5},
                {"label": "Platform fee", "amount": 0.5}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let hold = backend(&server).create_hold(&manager(), "app-1").await.unwrap();

    assert_eq!(hold.payment_id.as_deref(), Some("p1"));
    assert_eq!(hold.external_order_id.as_deref(), Some("o1"));
    assert_eq!(hold.amount.value(), 1000);
    assert_eq!(hold.amount_breakdown.len(), 2);
}

#[tokio::test]
async fn test_capture_sends_gateway_reference() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/order/payments/capture"))
        .and(body_json(json!({"paymentId": "p1", "orderPaymentId": "pay_abc"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "HELD",
            "taskId": "t1",
            "applicationId": "app-1"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let capture = backend(&server)
        .capture_payment(&manager(), "p1", "pay_abc")
        .await
        .unwrap();

    assert_eq!(capture.status, Some(PaymentStatus::Held));
    assert_eq!(capture.task_id.as_deref(), Some("t1"));
}

#[tokio::test]
async fn test_status_update_patches_nested_path() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/v1/tasks/t1/applications/app-1/status"))
        .and(body_json(json!({"status": "ACCEPTED"})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server)
        .update_application_status(&manager(), "t1", "app-1", &ApplicationStatus::Accepted)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_fetch_payments_joins_statuses_and_returns_page_untouched() {
    let server = MockServer::start().await;
    let page = json!({
        "content": [{
            "paymentId": "p1",
            "applicationReferenceId": "app-1",
            "displayAmount": 10,
            "status": "HELD",
            "method": "upi",
            "description": "Logo design",
            "createdAt": "2026-10-01T10:00:00Z"
        }, {
            "paymentId": "p2",
            "status": "PAID"
        }],
        "totalPages": 3,
        "totalElements": 22
    });
    Mock::given(method("GET"))
        .and(path("/v1/order/payments"))
        .and(query_param("page", "0"))
        .and(query_param("size", "10"))
        .and(query_param("statuses", "HELD,PAID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page))
        .expect(1)
        .mount(&server)
        .await;

    let query = PaymentQuery {
        page: 0,
        statuses: vec![PaymentStatus::Held, PaymentStatus::Paid],
        ..Default::default()
    };
    let result = backend(&server).fetch_payments(&manager(), &query).await.unwrap();

    assert_eq!(result.total_pages, 3);
    assert_eq!(result.total_elements, Some(22));
    assert_eq!(result.content.len(), 2);
    assert_eq!(result.content[0].payment_id, "p1");
    assert_eq!(result.content[0].method.as_deref(), Some("upi"));
    assert_eq!(result.content[1].status, Some(PaymentStatus::Paid));
}

#[tokio::test]
async fn test_reads_retry_on_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/payment-instrumentations"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/payment-instrumentations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "accountHolderName": "Asha Rao",
            "accountNumber": "000123456789",
            "ifscCode": "HDFC0001234"
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let details = backend(&server).fetch_bank_details(&manager()).await.unwrap();

    assert_eq!(details.len(), 1);
    assert_eq!(details[0].account_holder_name, "Asha Rao");
}

#[tokio::test]
async fn test_mutations_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/order/payments/refund"))
        .and(body_json(json!({"paymentId": "p1"})))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let err = backend(&server).refund_payment(&manager(), "p1").await.unwrap_err();

    assert!(matches!(err, PaymentError::Api { status: 502, .. }));
}

#[tokio::test]
async fn test_cancel_puts_payment_id_in_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/order/payments/cancel/p1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    backend(&server).cancel_payment(&manager(), "p1").await.unwrap();
}

#[tokio::test]
async fn test_withdraw_surfaces_bank_details_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/order/payments/withdraw"))
        .respond_with(
            ResponseTemplate::new(400).set_body_json(json!({"message": "Bank details not found"})),
        )
        .mount(&server)
        .await;

    let err = backend(&server).withdraw_funds(&manager(), "p1").await.unwrap_err();

    assert!(err.is_bank_details_missing());
    assert_eq!(err.message(), "Bank details not found");
}

#[tokio::test]
async fn test_error_message_falls_back_to_body_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/order/payments/withdraw"))
        .respond_with(ResponseTemplate::new(409).set_body_string("Payment already withdrawn"))
        .mount(&server)
        .await;

    let err = backend(&server).withdraw_funds(&manager(), "p1").await.unwrap_err();

    assert!(!err.is_bank_details_missing());
    assert_eq!(err.message(), "Payment already withdrawn");
}

#[tokio::test]
async fn test_full_flow_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/order/payments/hold"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paymentId": "p1",
            "externalOrderId": "o1",
            "amount": 1000,
            "currency": "INR",
            "displayAmount": 10
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/order/payments/capture"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "HELD",
            "taskId": "t1",
            "applicationId": "app-1"
        })))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/v1/tasks/t1/applications/app-1/status"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
        .expect(1)
        .mount(&server)
        .await;

    let http = backend(&server);
    let orchestrator = PaymentOrchestrator::new(
        Box::new(http.clone()),
        Box::new(http),
        Box::new(ScriptedGateway::completing("pay_abc")),
        ClientConfig::default(),
    );
    let callbacks = RecordingCallbacks::default();

    orchestrator
        .pay_for_application_with(
            &manager(),
            &TaskApplication::new("app-1", ApplicationStatus::Applied),
            &callbacks,
        )
        .await;

    assert_eq!(
        callbacks.events(),
        vec![Event::Success(json!({
            "status": "HELD",
            "taskId": "t1",
            "applicationId": "app-1",
            "statusUpdated": false
        }))]
    );
}

#[tokio::test]
async fn test_payments_page_reserializes_unchanged() {
    let server = MockServer::start().await;
    let page = json!({
        "content": [{
            "paymentId": "p1",
            "status": "HELD",
            "displayAmount": 10,
            "taskTitle": "Logo"
        }, {
            "paymentId": "p2",
            "displayAmount": 7.25,
            "status": "ESCALATED"
        }],
        "totalPages": 1,
        "totalElements": 2,
        "last": true
    });
    Mock::given(method("GET"))
        .and(path("/v1/order/payments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page.clone()))
        .mount(&server)
        .await;

    let result = backend(&server)
        .fetch_payments(&manager(), &PaymentQuery::default())
        .await
        .unwrap();

    assert_eq!(serde_json::to_value(&result).unwrap(), page);
}

#[tokio::test]
async fn test_hold_with_foreign_breakdown_still_opens_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/order/payments/hold"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "paymentId": "p1",
            "externalOrderId": "o1",
            "amount": 950,
            "currency": "INR",
            "amountBreakdown": [{"name": "Task fee", "value": "9.50"}]
        })))
        .mount(&server)
        .await;

    let http = backend(&server);
    let gateway = ScriptedGateway::dismissing();
    let orchestrator = PaymentOrchestrator::new(
        Box::new(http.clone()),
        Box::new(http),
        Box::new(gateway.clone()),
        ClientConfig::default(),
    );

    let outcome = orchestrator
        .pay_for_application(
            &manager(),
            &TaskApplication::new("app-1", ApplicationStatus::Applied),
        )
        .await
        .unwrap();

    assert_eq!(outcome, PaymentOutcome::Dismissed);
    let checkouts = gateway.checkouts().await;
    assert_eq!(checkouts.len(), 1);
    assert_eq!(checkouts[0].order_id, "o1");
    assert_eq!(checkouts[0].breakdown[0].extra["name"], "Task fee");
}
