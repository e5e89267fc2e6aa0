//! Client IP resolution behind proxies and CDNs.

use std::net::IpAddr;

use axum::http::HeaderMap;

/// Headers consulted in precedence order. `X-Forwarded-For` may carry a
/// comma-separated chain; entries are scanned left to right.
const IP_HEADERS: [&str; 4] = ["cf-connecting-ip", "x-real-ip", "x-forwarded-for", "client-ip"];

/// First public, parseable address from the proxy headers, falling back to
/// the direct peer address.
pub fn resolve_client_ip(headers: &HeaderMap, peer: IpAddr) -> IpAddr {
    for name in IP_HEADERS {
        let Some(value) = headers.get(name).and_then(|v| v.to_str().ok()) else {
            continue;
        };
        for candidate in value.split(',') {
            if let Ok(ip) = candidate.trim().parse::<IpAddr>() {
                if is_public(ip) {
                    return ip;
                }
            }
        }
    }
    peer
}

/// Rejects private, loopback, link-local and otherwise reserved ranges, so
/// a spoofable header cannot claim an internal address.
fn is_public(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            !(v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_documentation()
                // Carrier-grade NAT, 100.64.0.0/10
                || (v4.octets()[0] == 100 && (v4.octets()[1] & 0xc0) == 64))
        }
        IpAddr::V6(v6) => {
            let segments = v6.segments();
            !(v6.is_loopback()
                || v6.is_unspecified()
                // Unique local, fc00::/7
                || (segments[0] & 0xfe00) == 0xfc00
                // Link local, fe80::/10
                || (segments[0] & 0xffc0) == 0xfe80)
        }
    }
}
