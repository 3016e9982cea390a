use axum::{
    extract::{connect_info::ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

/// Client IP from `X-Forwarded-For`, then `X-Real-IP`, then the socket, then loopback.
pub fn extract_ip_from_headers(headers: &HeaderMap, fallback: Option<IpAddr>) -> IpAddr {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|hv| hv.to_str().ok())
        .and_then(|h| h.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    let real = || {
        headers
            .get("x-real-ip")
            .and_then(|hv| hv.to_str().ok())
            .and_then(|h| h.trim().parse::<IpAddr>().ok())
    };
    forwarded.or_else(real).or(fallback).unwrap_or(IpAddr::from([127, 0, 0, 1]))
}

/// Like `ConnectInfo`, but yields `None` instead of rejecting when the router
/// was not served with connect info (tests, `oneshot`).
#[derive(Clone, Copy, Debug, Default)]
pub struct MaybeRemoteAddr(pub Option<SocketAddr>);

impl<S> FromRequestParts<S> for MaybeRemoteAddr
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(MaybeRemoteAddr(parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0)))
    }
}

impl MaybeRemoteAddr {
    pub fn client_ip(&self, headers: &HeaderMap) -> IpAddr {
        extract_ip_from_headers(headers, self.0.map(|a| a.ip()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_wins() {
        let mut h = HeaderMap::new();
        h.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        h.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(extract_ip_from_headers(&h, None), IpAddr::from([203, 0, 113, 7]));
    }

    #[test]
    fn falls_back_in_order() {
        let mut h = HeaderMap::new();
        h.insert("x-forwarded-for", HeaderValue::from_static("garbage"));
        h.insert("x-real-ip", HeaderValue::from_static("198.51.100.2"));
        assert_eq!(extract_ip_from_headers(&h, None), IpAddr::from([198, 51, 100, 2]));

        let empty = HeaderMap::new();
        let sock = IpAddr::from([192, 168, 1, 5]);
        assert_eq!(extract_ip_from_headers(&empty, Some(sock)), sock);
        assert_eq!(extract_ip_from_headers(&empty, None), IpAddr::from([127, 0, 0, 1]));
    }
}
