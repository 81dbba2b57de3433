// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::engines::traits::EngineError;
use std::net::IpAddr;
use tokio::net::lookup_host;
use url::Url;

/// 验证 URL 是否可以抓取
///
/// 只允许 http/https，并检查解析后的 IP 是否为私有地址或环回地址（防止 SSRF）
pub async fn validate_url(url_str: &str) -> Result<(), EngineError> {
    let url = parse_target(url_str)?;
    let host = url
        .host_str()
        .ok_or_else(|| EngineError::Blocked(format!("missing host in {}", url_str)))?;

    if host == "localhost" {
        return Err(EngineError::Blocked("localhost is not allowed".to_string()));
    }

    // lookup_host needs host:port
    let port = url.port_or_known_default().unwrap_or(80);
    let addrs = lookup_host(format!("{}:{}", host, port))
        .await
        .map_err(|e| EngineError::Other(format!("DNS lookup failed for {}: {}", host, e)))?;

    for addr in addrs {
        if is_private_ip(addr.ip()) {
            return Err(EngineError::Blocked(format!(
                "private IP access is not allowed: {}",
                addr.ip()
            )));
        }
    }

    Ok(())
}

/// 解析目标URL并检查协议
pub fn parse_target(url_str: &str) -> Result<Url, EngineError> {
    let url = Url::parse(url_str)
        .map_err(|e| EngineError::Other(format!("Invalid url {}: {}", url_str, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(EngineError::Blocked(format!("unsupported scheme: {}", other))),
    }
}

fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            let octets = ipv4.octets();
            // 10.0.0.0/8
            octets[0] == 10
                // 172.16.0.0/12
                || (octets[0] == 172 && (16..=31).contains(&octets[1]))
                // 192.168.0.0/16
                || (octets[0] == 192 && octets[1] == 168)
                || ipv4.is_loopback()
                || ipv4.is_link_local()
                || ipv4.is_multicast()
                || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ip(IpAddr::V4(mapped));
            }
            let head = ipv6.segments()[0];
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // Unique Local Address (fc00::/7)
                || (head & 0xfe00) == 0xfc00
                // Link-local (fe80::/10)
                || (head & 0xffc0) == 0xfe80
                // Multicast (ff00::/8)
                || (head & 0xff00) == 0xff00
        }
    }
}
