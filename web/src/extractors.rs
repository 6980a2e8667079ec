//! Custom Axum extractors.
//!
//! - [`ClientIp`]: client address for view hits
//! - [`AppJson`], [`AppQuery`], [`AppPath`]: the stock extractors with
//!   rejections rendered as [`AppError`] bodies

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{connect_info::ConnectInfo, FromRequest, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Client IP address.
///
/// # Priority
///
/// 1. `X-Forwarded-For` (first IP in the list)
/// 2. `X-Real-IP`
/// 3. Socket peer address, when the server runs with connect info
/// 4. `127.0.0.1`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientIp(pub IpAddr);

#[async_trait]
impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ip = extract_client_ip(&parts.headers, parts.extensions.get());

        Ok(Self(ip))
    }
}

/// Extract client IP from headers or connection info.
fn extract_client_ip(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> IpAddr {
    let forwarded = headers
        .get("X-Forwarded-For")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|first| first.trim().parse::<IpAddr>().ok());
    if let Some(ip) = forwarded {
        return ip;
    }

    let real_ip = headers
        .get("X-Real-IP")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<IpAddr>().ok());
    if let Some(ip) = real_ip {
        return ip;
    }

    connect_info.map_or(IpAddr::V4(Ipv4Addr::LOCALHOST), |ConnectInfo(addr)| addr.ip())
}

/// JSON body extractor whose rejection is an [`AppError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// Query string extractor whose rejection is an [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);

/// Path extractor whose rejection is an [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct AppPath<T>(pub T);
