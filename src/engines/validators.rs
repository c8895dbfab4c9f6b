// Copyright (c) 2025 netzscout developers
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::EngineError;
use std::net::IpAddr;
use tokio::net::lookup_host;
use url::Url;

/// Validate that a URL is safe to fetch (SSRF protection).
///
/// Resolves the host and rejects targets on private, loopback, link-local or
/// multicast addresses. This check is fail-closed and runs before every
/// fetch, independent of the robots.txt outcome.
pub async fn validate_url(url_str: &str) -> Result<(), EngineError> {
    // Escape hatch for tests against a local mock server.
    if std::env::var("NETZSCOUT_DISABLE_SSRF_PROTECTION").unwrap_or_default() == "true" {
        return Ok(());
    }

    let url = Url::parse(url_str)?;
    let host = url
        .host_str()
        .ok_or_else(|| EngineError::Other("missing host".to_string()))?;

    if host.eq_ignore_ascii_case("localhost") {
        return Err(EngineError::Ssrf("localhost is not allowed".to_string()));
    }

    let port = url.port_or_known_default().unwrap_or(80);
    let addr_str = format!("{}:{}", host, port);

    let addrs = lookup_host(addr_str)
        .await
        .map_err(|e| EngineError::Other(format!("DNS lookup failed: {}", e)))?;

    for addr in addrs {
        if is_private_ip(addr.ip()) {
            return Err(EngineError::Ssrf(format!(
                "private address is not allowed: {}",
                addr.ip()
            )));
        }
    }

    Ok(())
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            // 10.0.0.0/8
            if octets[0] == 10 {
                return true;
            }
            // 172.16.0.0/12
            if octets[0] == 172 && (16..=31).contains(&octets[1]) {
                return true;
            }
            // 192.168.0.0/16
            if octets[0] == 192 && octets[1] == 168 {
                return true;
            }
            // 127.0.0.0/8
            if ipv4.is_loopback() {
                return true;
            }
            // 169.254.0.0/16
            if ipv4.is_link_local() {
                return true;
            }
            // 224.0.0.0/4
            if (224..=239).contains(&octets[0]) {
                return true;
            }
            false
        }
        IpAddr::V6(ipv6) => {
            if ipv6.is_loopback() {
                return true;
            }
            // Unique local (fc00::/7)
            if (ipv6.segments()[0] & 0xfe00) == 0xfc00 {
                return true;
            }
            // Link-local (fe80::/10)
            if (ipv6.segments()[0] & 0xffc0) == 0xfe80 {
                return true;
            }
            // Multicast (ff00::/8)
            if (ipv6.segments()[0] & 0xff00) == 0xff00 {
                return true;
            }
            false
        }
    }
}
