//! Rate-limit identifier for a request.

use std::net::IpAddr;

use axum::http::HeaderMap;

/// Identifier shared by every client whose address cannot be determined.
pub const ANONYMOUS_CLIENT: &str = "anonymous";

/// Real client IP behind Cloudflare and Fly.io.
///
/// Checks `CF-Connecting-IP`, the first hop of `X-Forwarded-For`,
/// `X-Real-IP`, then `Fly-Client-IP`. Values that do not parse as an IP
/// address are ignored.
#[must_use]
pub fn client_ip(headers: &HeaderMap) -> Option<IpAddr> {
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let parse = |value: &str| value.trim().parse::<IpAddr>().ok();

    header("cf-connecting-ip")
        .and_then(parse)
        .or_else(|| {
            header("x-forwarded-for")
                .and_then(|s| s.split(',').next())
                .and_then(parse)
        })
        .or_else(|| header("x-real-ip").and_then(parse))
        .or_else(|| header("fly-client-ip").and_then(parse))
}

/// Key for the per-client rate limiter.
#[must_use]
pub fn client_identifier(headers: &HeaderMap) -> String {
    client_ip(headers).map_or_else(|| ANONYMOUS_CLIENT.to_string(), |ip| ip.to_string())
}
