//! Shop-domain signals carried by an inbound request.
//!
//! Each source is a pure function from [`RequestSignals`] to a raw value.
//! [`SIGNAL_CHAIN`] fixes their precedence and [`first_signal`] folds it:
//! the first source whose value normalizes into a [`ShopDomain`] wins, and a
//! malformed value counts as absent.

use crate::domain::shop::{SHOPIFY_DOMAIN_SUFFIX, ShopDomain};
use http::{HeaderMap, Uri, header};
use std::fmt;
use tracing::debug;
use url::{Url, form_urlencoded};

pub const SHOP_QUERY_PARAM: &str = "shop";
pub const SHOP_COOKIE_NAME: &str = "shopDomain";

/// Provider headers carrying the shop domain, in lookup order.
pub const SHOP_DOMAIN_HEADERS: [&str; 3] = [
    "x-shopify-shop-domain",
    "x-shop-domain",
    "shopify-shop-domain",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalSource {
    QueryParam,
    Header,
    Referer,
    Origin,
    Cookie,
    Fallback,
}

impl SignalSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalSource::QueryParam => "query_param",
            SignalSource::Header => "header",
            SignalSource::Referer => "referer",
            SignalSource::Origin => "origin",
            SignalSource::Cookie => "cookie",
            SignalSource::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Borrowed view of the request parts the resolver looks at.
#[derive(Debug, Clone, Copy)]
pub struct RequestSignals<'a> {
    uri: &'a Uri,
    headers: &'a HeaderMap,
}

impl<'a> RequestSignals<'a> {
    pub fn new(uri: &'a Uri, headers: &'a HeaderMap) -> Self {
        Self { uri, headers }
    }

    pub fn from_parts(parts: &'a http::request::Parts) -> Self {
        Self::new(&parts.uri, &parts.headers)
    }

    fn header(&self, name: &str) -> Option<&'a str> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

pub type SignalExtractor = fn(&RequestSignals<'_>) -> Option<String>;

/// Precedence order, first match wins. The fallback is not part of the chain;
/// the resolver applies it according to its policy.
pub const SIGNAL_CHAIN: &[(SignalSource, SignalExtractor)] = &[
    (SignalSource::QueryParam, from_query_param),
    (SignalSource::Header, from_shop_headers),
    (SignalSource::Referer, from_referer),
    (SignalSource::Origin, from_origin),
    (SignalSource::Cookie, from_cookie),
];

/// Walk [`SIGNAL_CHAIN`] and return the first value that normalizes.
pub fn first_signal(signals: &RequestSignals<'_>) -> Option<(SignalSource, ShopDomain)> {
    SIGNAL_CHAIN.iter().find_map(|(source, extract)| {
        let raw = extract(signals)?;
        match ShopDomain::parse(&raw) {
            Ok(domain) => Some((*source, domain)),
            Err(e) => {
                debug!(source = %source, raw = %raw, error = %e, "Ignoring malformed shop signal");
                None
            }
        }
    })
}

fn shop_param(query: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == SHOP_QUERY_PARAM)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.trim().is_empty())
}

pub fn from_query_param(signals: &RequestSignals<'_>) -> Option<String> {
    signals.uri.query().and_then(shop_param)
}

pub fn from_shop_headers(signals: &RequestSignals<'_>) -> Option<String> {
    SHOP_DOMAIN_HEADERS
        .iter()
        .find_map(|name| signals.header(name))
        .map(str::to_string)
}

pub fn from_referer(signals: &RequestSignals<'_>) -> Option<String> {
    let referer = Url::parse(signals.header(header::REFERER.as_str())?).ok()?;
    referer.query().and_then(shop_param)
}

/// `https://<label>.myshopify.com[:port]` -> `<label>.myshopify.com`.
pub fn from_origin(signals: &RequestSignals<'_>) -> Option<String> {
    let origin = Url::parse(signals.header(header::ORIGIN.as_str())?).ok()?;
    if !matches!(origin.scheme(), "http" | "https") {
        return None;
    }
    let label = origin.host_str()?.strip_suffix(SHOPIFY_DOMAIN_SUFFIX)?;
    if label.is_empty() || label.contains('.') {
        return None;
    }
    Some(format!("{label}{SHOPIFY_DOMAIN_SUFFIX}"))
}

pub fn from_cookie(signals: &RequestSignals<'_>) -> Option<String> {
    signals
        .headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| name.trim() == SHOP_COOKIE_NAME)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
