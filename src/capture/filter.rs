//! Exchange filtering for the list endpoint.

use serde::Deserialize;

use crate::capture::exchange::Exchange;

/// Optional predicates combined with AND. An absent field matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    /// Case-insensitive substring of the recorded URL.
    pub url: Option<String>,
    /// Case-insensitive exact method.
    pub method: Option<String>,
    /// Exact status code. Values outside the HTTP range simply match nothing.
    pub status_code: Option<i64>,
}

impl Filter {
    pub fn matches(&self, exchange: &Exchange) -> bool {
        if let Some(url) = &self.url {
            if !exchange.url.to_lowercase().contains(&url.to_lowercase()) {
                return false;
            }
        }

        if let Some(method) = &self.method {
            if !exchange.method.eq_ignore_ascii_case(method) {
                return false;
            }
        }

        if let Some(status) = self.status_code {
            if i64::from(exchange.status_code) != status {
                return false;
            }
        }

        true
    }
}

/// Raw query parameters as received on `/api/logs`.
///
/// Parsing is lenient: empty values count as absent and a `status_code` that
/// is not an integer is ignored rather than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilterParams {
    pub url: Option<String>,
    pub method: Option<String>,
    pub status_code: Option<String>,
}

impl From<FilterParams> for Filter {
    fn from(params: FilterParams) -> Self {
        let non_empty = |v: Option<String>| v.filter(|s| !s.is_empty());

        Self {
            url: non_empty(params.url),
            method: non_empty(params.method),
            status_code: params
                .status_code
                .and_then(|s| s.trim().parse::<i64>().ok()),
        }
    }
}
