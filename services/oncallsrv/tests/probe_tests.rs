//! Probe tests against throwaway local listeners

use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use oncallsrv::domain::{CheckStatus, NewService, Service, ServiceKind};
use oncallsrv::prober::{build_http_client, probe::run_probe};

/// Serve canned HTTP responses on an ephemeral port.
async fn http_stub(status_line: &'static str, body: &'static str) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut buf = [0u8; 1024];
            let _ = socket.read(&mut buf).await;
            let response = format!(
                "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    addr
}

fn http_service(addr: SocketAddr, expected_status: i64, expected_body: &str) -> Service {
    Service::from_new(NewService {
        name: "stub".to_string(),
        url: format!("http://{}/", addr),
        kind: Some(ServiceKind::Http),
        method: None,
        interval_seconds: Some(60),
        timeout_seconds: Some(2),
        expected_status: Some(expected_status),
        expected_body: Some(expected_body.to_string()),
        headers: None,
    })
}

#[tokio::test]
async fn test_http_probe_up_on_expected_status() {
    let addr = http_stub("200 OK", "all good").await;
    let client = build_http_client().unwrap();

    let check = run_probe(&client, &http_service(addr, 200, "")).await;

    assert_eq!(check.status, CheckStatus::Up);
    assert_eq!(check.status_code, Some(200));
    assert!(check.error_message.is_none());
    assert!(check.response_time_ms >= 0);
}

#[tokio::test]
async fn test_http_probe_down_on_status_mismatch() {
    // 299 is still a success-class code; only the exact expected
    // status counts as up
    let addr = http_stub("299 Whatever", "ok").await;
    let client = build_http_client().unwrap();

    let check = run_probe(&client, &http_service(addr, 200, "")).await;

    assert_eq!(check.status, CheckStatus::Down);
    assert_eq!(check.status_code, Some(299));
    assert!(check
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("Expected status 200"));
}

#[tokio::test]
async fn test_http_probe_body_matching() {
    let addr = http_stub("200 OK", "service ready").await;
    let client = build_http_client().unwrap();

    let up = run_probe(&client, &http_service(addr, 200, "ready")).await;
    assert_eq!(up.status, CheckStatus::Up);

    let down = run_probe(&client, &http_service(addr, 200, "absent token")).await;
    assert_eq!(down.status, CheckStatus::Down);
    assert!(down
        .error_message
        .as_deref()
        .unwrap_or_default()
        .contains("body"));
}

#[tokio::test]
async fn test_http_probe_down_on_connection_refused() {
    // Bind then drop to get a port nothing listens on
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = build_http_client().unwrap();
    let check = run_probe(&client, &http_service(addr, 200, "")).await;

    assert_eq!(check.status, CheckStatus::Down);
    assert!(check.error_message.is_some());
}

#[tokio::test]
async fn test_tcp_probe_connects() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                return;
            };
            drop(socket);
        }
    });

    let service = Service::from_new(NewService {
        name: "tcp stub".to_string(),
        url: format!("tcp://{}", addr),
        kind: Some(ServiceKind::Tcp),
        method: None,
        interval_seconds: Some(60),
        timeout_seconds: Some(2),
        expected_status: None,
        expected_body: None,
        headers: None,
    });

    let client = build_http_client().unwrap();
    let check = run_probe(&client, &service).await;
    assert_eq!(check.status, CheckStatus::Up);
}

#[tokio::test]
async fn test_tcp_probe_down_and_error_cases() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = build_http_client().unwrap();

    let mut service = Service::from_new(NewService {
        name: "tcp stub".to_string(),
        url: format!("tcp://{}", addr),
        kind: Some(ServiceKind::Tcp),
        method: None,
        interval_seconds: Some(60),
        timeout_seconds: Some(2),
        expected_status: None,
        expected_body: None,
        headers: None,
    });

    let down = run_probe(&client, &service).await;
    assert_eq!(down.status, CheckStatus::Down);

    // A url without a port cannot be probed at all
    service.url = "tcp://no-port-here".to_string();
    let error = run_probe(&client, &service).await;
    assert_eq!(error.status, CheckStatus::Error);
}
