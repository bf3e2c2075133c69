//! Probe execution for each service type
//!
//! http/https go through the shared reqwest client; tcp is a
//! connect-and-close; ping shells out to the system binary so no raw
//! sockets are needed.

use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};
use uuid::Uuid;
use x509_parser::parse_x509_certificate;

use crate::domain::{CheckStatus, Service, ServiceCheck, ServiceKind};

/// TLS leaf-certificate metadata captured during an https probe
#[derive(Debug, Clone)]
struct SslInfo {
    expiry: DateTime<Utc>,
    issuer: String,
    days_left: i64,
}

/// Run one probe and produce the check row (not yet persisted).
pub async fn run_probe(http: &reqwest::Client, service: &Service) -> ServiceCheck {
    let mut check = ServiceCheck {
        id: Uuid::new_v4().to_string(),
        service_id: service.id.clone(),
        status: CheckStatus::Error,
        response_time_ms: 0,
        status_code: None,
        error_message: None,
        checked_at: Utc::now(),
        ssl_expiry: None,
        ssl_issuer: None,
        ssl_days_left: None,
    };

    match service.kind {
        ServiceKind::Http | ServiceKind::Https => http_probe(http, service, &mut check).await,
        ServiceKind::Tcp => tcp_probe(service, &mut check).await,
        ServiceKind::Ping => ping_probe(service, &mut check).await,
    }

    check
}

async fn http_probe(http: &reqwest::Client, service: &Service, check: &mut ServiceCheck) {
    let method = reqwest::Method::from_bytes(service.method.as_bytes())
        .unwrap_or(reqwest::Method::GET);

    let mut request = http
        .request(method, &service.url)
        .timeout(Duration::from_secs(service.timeout_seconds.max(1) as u64));
    for (key, value) in &service.headers {
        request = request.header(key, value);
    }

    let start = Instant::now();
    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            check.response_time_ms = start.elapsed().as_millis() as i64;
            check.status = if e.is_timeout() {
                CheckStatus::Timeout
            } else {
                CheckStatus::Down
            };
            check.error_message = Some(e.to_string());
            return;
        }
    };

    check.response_time_ms = start.elapsed().as_millis() as i64;
    let status_code = response.status().as_u16() as i64;
    check.status_code = Some(status_code);

    if service.kind == ServiceKind::Https {
        if let Some(ssl) = peer_certificate_info(&response, check.checked_at) {
            check.ssl_expiry = Some(ssl.expiry);
            check.ssl_issuer = Some(ssl.issuer);
            check.ssl_days_left = Some(ssl.days_left);
        }
    }

    if status_code != service.expected_status {
        check.status = CheckStatus::Down;
        check.error_message = Some(format!(
            "Expected status {}, got {}",
            service.expected_status, status_code
        ));
        return;
    }

    if !service.expected_body.is_empty() {
        let body = response.text().await.unwrap_or_default();
        if !body.contains(&service.expected_body) {
            check.status = CheckStatus::Down;
            check.error_message = Some("Expected body content not found".to_string());
            return;
        }
    }

    check.status = CheckStatus::Up;
}

/// Pull NotAfter, issuer CN and days-left out of the leaf certificate
/// reqwest captured during the handshake.
fn peer_certificate_info(response: &reqwest::Response, now: DateTime<Utc>) -> Option<SslInfo> {
    let tls_info = response.extensions().get::<reqwest::tls::TlsInfo>()?;
    let der = tls_info.peer_certificate()?;
    let (_, cert) = parse_x509_certificate(der).ok()?;

    let expiry = DateTime::<Utc>::from_timestamp(cert.validity().not_after.timestamp(), 0)?;
    let issuer = cert
        .issuer()
        .iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or_default()
        .to_string();
    let days_left = (expiry - now).num_days();

    Some(SslInfo {
        expiry,
        issuer,
        days_left,
    })
}

async fn tcp_probe(service: &Service, check: &mut ServiceCheck) {
    let address = match connect_address(&service.url) {
        Some(address) => address,
        None => {
            check.status = CheckStatus::Error;
            check.error_message = Some(format!("No host:port in url: {}", service.url));
            return;
        }
    };

    let timeout = Duration::from_secs(service.timeout_seconds.max(1) as u64);
    let start = Instant::now();

    match tokio::time::timeout(timeout, tokio::net::TcpStream::connect(&address)).await {
        Ok(Ok(_stream)) => {
            // Connect succeeded; the stream is dropped straight away.
            check.response_time_ms = start.elapsed().as_millis() as i64;
            check.status = CheckStatus::Up;
        }
        Ok(Err(e)) => {
            check.response_time_ms = start.elapsed().as_millis() as i64;
            check.status = CheckStatus::Down;
            check.error_message = Some(e.to_string());
        }
        Err(_) => {
            check.response_time_ms = start.elapsed().as_millis() as i64;
            check.status = CheckStatus::Timeout;
            check.error_message = Some(format!("Connect timed out after {:?}", timeout));
        }
    }
}

async fn ping_probe(service: &Service, check: &mut ServiceCheck) {
    let host = match probe_host(&service.url) {
        Some(host) => host,
        None => {
            check.status = CheckStatus::Error;
            check.error_message = Some(format!("No host in url: {}", service.url));
            return;
        }
    };

    let timeout_secs = service.timeout_seconds.max(1);
    let timeout = Duration::from_secs(timeout_secs as u64);
    let start = Instant::now();

    let output = tokio::process::Command::new("ping")
        .arg("-c")
        .arg("1")
        .arg("-W")
        .arg(timeout_secs.to_string())
        .arg(&host)
        .output();

    // -W already bounds the probe itself; the outer guard only reaps
    // a wedged subprocess, so it gets ample slack beyond the timeout.
    let reap_deadline = timeout * 2 + Duration::from_secs(2);
    match tokio::time::timeout(reap_deadline, output).await {
        Ok(Ok(output)) => {
            check.response_time_ms = start.elapsed().as_millis() as i64;
            if output.status.success() {
                check.status = CheckStatus::Up;
            } else {
                check.status = CheckStatus::Down;
                check.error_message = Some("No ICMP echo reply".to_string());
            }
        }
        Ok(Err(e)) => {
            check.status = CheckStatus::Error;
            check.error_message = Some(format!("Failed to run ping: {}", e));
        }
        Err(_) => {
            check.response_time_ms = start.elapsed().as_millis() as i64;
            check.status = CheckStatus::Timeout;
            check.error_message = Some("ping did not exit in time".to_string());
        }
    }
}

/// `host:port` for the tcp probe; the scheme and any path are dropped.
/// None when the url carries no port.
fn connect_address(url: &str) -> Option<String> {
    let authority = strip_scheme_and_path(url);
    let (_, port) = authority.rsplit_once(':')?;
    if port.is_empty() || port.parse::<u16>().is_err() {
        return None;
    }
    Some(authority.to_string())
}

/// Bare hostname for the ping probe.
fn probe_host(url: &str) -> Option<String> {
    let authority = strip_scheme_and_path(url);
    let host = match authority.rsplit_once(':') {
        Some((host, port)) if port.parse::<u16>().is_ok() => host,
        _ => authority,
    };
    (!host.is_empty()).then(|| host.to_string())
}

fn strip_scheme_and_path(url: &str) -> &str {
    let without_scheme = match url.find("://") {
        Some(index) => &url[index + 3..],
        None => url,
    };
    match without_scheme.find('/') {
        Some(index) => &without_scheme[..index],
        None => without_scheme,
    }
}
