use std::convert::Infallible;

use axum::{
    extract::{FromRequestParts, Query},
    http::{Uri, request::Parts},
};
use utoipa::IntoParams;

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;

/// Raw `page`/`limit` query values. Kept as strings so that junk input falls
/// back to the defaults instead of rejecting the request.
#[derive(Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// Page number, default 1
    pub page: Option<String>,
    /// Items per page, default 10
    pub limit: Option<String>,
}

impl ListQuery {
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: Some(page.to_string()),
            limit: Some(limit.to_string()),
        }
    }

    /// Reads the first `page` and `limit` values of the query string. Repeated
    /// keys and undecodable strings never fail the request.
    pub fn from_uri(uri: &Uri) -> Self {
        let pairs = Query::<Vec<(String, String)>>::try_from_uri(uri)
            .map(|Query(pairs)| pairs)
            .unwrap_or_default();

        let first = |key: &str| {
            pairs
                .iter()
                .find(|(name, _)| name == key)
                .map(|(_, value)| value.clone())
        };
        Self {
            page: first("page"),
            limit: first("limit"),
        }
    }

    /// Returns `(page, limit, skip)`.
    pub fn normalize(&self) -> (i64, i64, u64) {
        let page = positive_or(self.page.as_deref(), DEFAULT_PAGE);
        let limit = positive_or(self.limit.as_deref(), DEFAULT_LIMIT);
        let skip = (page - 1).saturating_mul(limit);
        (page, limit, skip as u64)
    }
}

impl<S> FromRequestParts<S> for ListQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_uri(&parts.uri))
    }
}

fn positive_or(raw: Option<&str>, default: i64) -> i64 {
    raw.and_then(leading_integer)
        .filter(|value| *value > 0)
        .unwrap_or(default)
}

/// Integer prefix of `raw`, so `"3abc"` reads as 3 and `"2.5"` as 2.
fn leading_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let (negative, rest) = match raw.as_bytes().first() {
        Some(b'-') => (true, &raw[1..]),
        Some(b'+') => (false, &raw[1..]),
        _ => (false, raw),
    };
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    let value = rest[..end].parse::<i64>().ok()?;
    Some(if negative { -value } else { value })
}
