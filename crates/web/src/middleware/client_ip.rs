//! Client IP resolution behind Cloudflare and Fly.io.

use std::convert::Infallible;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::{Extensions, HeaderMap, request::Parts};

/// Resolve the client IP from proxy headers, then the socket peer address.
///
/// Order: `CF-Connecting-IP`, first `X-Forwarded-For` entry, `X-Real-IP`,
/// `Fly-Client-IP`, connection info.
#[must_use]
pub fn resolve_client_ip(headers: &HeaderMap, extensions: &Extensions) -> Option<IpAddr> {
    let header_ip = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.trim().parse::<IpAddr>().ok())
    };

    header_ip("cf-connecting-ip")
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
        .or_else(|| header_ip("x-real-ip"))
        .or_else(|| header_ip("fly-client-ip"))
        .or_else(|| {
            extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
}

/// The visitor's IP, forwarded to the backend as `X-Forwarded-For`.
///
/// Falls back to loopback when nothing identifies the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            resolve_client_ip(&parts.headers, &parts.extensions)
                .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder().uri("/");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    fn resolve(parts: &Parts) -> Option<IpAddr> {
        resolve_client_ip(&parts.headers, &parts.extensions)
    }

    #[test]
    fn test_cloudflare_header_wins() {
        let parts = parts(&[
            ("x-forwarded-for", "198.51.100.1"),
            ("cf-connecting-ip", "203.0.113.7"),
        ]);
        assert_eq!(resolve(&parts), Some("203.0.113.7".parse().unwrap()));
    }

    #[test]
    fn test_forwarded_for_uses_first_entry() {
        let parts = parts(&[("x-forwarded-for", "198.51.100.1, 10.0.0.1")]);
        assert_eq!(resolve(&parts), Some("198.51.100.1".parse().unwrap()));
    }

    #[test]
    fn test_real_ip_then_fly() {
        let both = parts(&[("x-real-ip", "192.0.2.4"), ("fly-client-ip", "192.0.2.5")]);
        assert_eq!(resolve(&both), Some("192.0.2.4".parse().unwrap()));

        let fly = parts(&[("fly-client-ip", "192.0.2.5")]);
        assert_eq!(resolve(&fly), Some("192.0.2.5".parse().unwrap()));
    }

    #[test]
    fn test_connect_info_fallback() {
        let mut parts = parts(&[]);
        assert_eq!(resolve(&parts), None);

        parts
            .extensions
            .insert(ConnectInfo(SocketAddr::from(([10, 1, 2, 3], 40000))));
        assert_eq!(resolve(&parts), Some("10.1.2.3".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_extractor_defaults_to_loopback() {
        let mut parts = parts(&[]);
        let ClientIp(ip) = ClientIp::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
    }
}
