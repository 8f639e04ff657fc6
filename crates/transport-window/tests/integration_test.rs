//! Integration tests for the cross-window transport

use passcards_transport::{CALL_EVENT, MessagePort, REPLY_EVENT};
use passcards_transport_window::{MemoryWindow, TargetOrigin, WindowMessagePort};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

const PAGE: &str = "https://page.example";
const EXTENSION: &str = "https://extension.example";

fn collect(port: &impl MessagePort, event: &str) -> mpsc::UnboundedReceiver<Value> {
    let (tx, rx) = mpsc::unbounded_channel();
    port.on(
        event,
        Arc::new(move |payload: Value| {
            let _ = tx.send(payload);
        }),
    );
    rx
}

#[tokio::test]
async fn test_wildcard_ports_exchange_messages() {
    let _ = tracing_subscriber::fmt::try_init();

    let (page, extension) = MemoryWindow::pair(PAGE, EXTENSION);
    let page = WindowMessagePort::new(page, "*");
    let extension = WindowMessagePort::new(extension, "*");
    assert_eq!(page.target_origin(), &TargetOrigin::Any);

    let mut inbound = collect(&extension, CALL_EVENT);

    page.emit(CALL_EVENT, json!({"id": 1, "method": "add", "args": [3, 4]}));

    let received = timeout(Duration::from_secs(1), inbound.recv())
        .await
        .expect("delivery timed out");
    assert_eq!(
        received,
        Some(json!({"id": 1, "method": "add", "args": [3, 4]}))
    );
}

#[tokio::test]
async fn test_every_listener_sees_every_message() {
    let _ = tracing_subscriber::fmt::try_init();

    let (page, extension) = MemoryWindow::pair(PAGE, EXTENSION);
    let page = WindowMessagePort::new(page, "*");
    let extension = WindowMessagePort::new(extension, "*");

    let mut calls = collect(&extension, CALL_EVENT);
    let mut replies = collect(&extension, REPLY_EVENT);

    page.emit(REPLY_EVENT, json!({"id": 9, "result": true}));

    let on_calls = timeout(Duration::from_secs(1), calls.recv()).await.unwrap();
    let on_replies = timeout(Duration::from_secs(1), replies.recv()).await.unwrap();
    assert_eq!(on_calls, Some(json!({"id": 9, "result": true})));
    assert_eq!(on_replies, on_calls);
}

#[tokio::test]
async fn test_exact_origin_filters_inbound_messages() {
    let _ = tracing_subscriber::fmt::try_init();

    let (page, extension) = MemoryWindow::pair(PAGE, EXTENSION);
    // The page accepts anything, the extension only trusts a different origin.
    let page = WindowMessagePort::new(page, "*");
    let extension = WindowMessagePort::new(extension, "https://other.example");

    let mut inbound = collect(&extension, CALL_EVENT);
    page.emit(CALL_EVENT, json!("ignored"));

    let received = timeout(Duration::from_millis(100), inbound.recv()).await;
    assert!(received.is_err(), "message from untrusted origin was delivered");
}

#[tokio::test]
async fn test_exact_origins_on_both_sides() {
    let _ = tracing_subscriber::fmt::try_init();

    let (page, extension) = MemoryWindow::pair(PAGE, EXTENSION);
    let page = WindowMessagePort::new(page, EXTENSION);
    let extension = WindowMessagePort::new(extension, PAGE);

    let mut at_page = collect(&page, REPLY_EVENT);
    let mut at_extension = collect(&extension, CALL_EVENT);

    page.emit(CALL_EVENT, json!("to extension"));
    extension.emit(REPLY_EVENT, json!("to page"));

    let first = timeout(Duration::from_secs(1), at_extension.recv()).await.unwrap();
    let second = timeout(Duration::from_secs(1), at_page.recv()).await.unwrap();
    assert_eq!(first, Some(json!("to extension")));
    assert_eq!(second, Some(json!("to page")));
}

#[tokio::test]
async fn test_dropping_port_removes_window_listeners() {
    let (page, extension) = MemoryWindow::pair(PAGE, EXTENSION);
    let window = extension.clone();

    let port = WindowMessagePort::new(extension, "*");
    let id = port.on(CALL_EVENT, Arc::new(|_: Value| {}));
    port.on(REPLY_EVENT, Arc::new(|_: Value| {}));
    assert_eq!(window.listener_count(), 2);

    assert!(port.remove_listener(id));
    assert_eq!(window.listener_count(), 1);

    drop(port);
    assert_eq!(window.listener_count(), 0);
    drop(page);
}
