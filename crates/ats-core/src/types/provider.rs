//! Raw provider payloads and the credential threaded through fetch calls.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One daily item as a provider returned it.
///
/// Numeric fields are kept in their textual form: providers use thousands
/// separators, direction signs and percent suffixes. Normalisation happens
/// in the merger.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RawDailyItem {
    /// Trading date, `YYYYMMDD` or `YYYY-MM-DD`
    pub date: String,
    pub open: Option<String>,
    pub high: Option<String>,
    pub low: Option<String>,
    pub close: Option<String>,
    pub volume: Option<String>,
    pub turnover: Option<String>,
    pub change_rate: Option<String>,
    pub individual_net: Option<String>,
    pub institution_net: Option<String>,
    pub foreign_net: Option<String>,
}

impl RawDailyItem {
    /// Create an item with only a date and close, mostly for tests and imports.
    pub fn with_close(date: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            close: Some(close.into()),
            ..Default::default()
        }
    }
}

/// One provider page of items with its continuation state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    /// Items on this page
    pub items: Vec<T>,
    /// Provider signalled that more pages follow
    pub has_more: bool,
    /// Continuation key for the next page
    pub next_key: Option<String>,
}

/// One page of the daily series.
pub type DailyPage = Page<RawDailyItem>;

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            has_more: false,
            next_key: None,
        }
    }
}

impl<T> Page<T> {
    /// The key to request the next page with, if another page exists.
    pub fn continuation(&self) -> Option<&str> {
        if self.has_more {
            self.next_key.as_deref().filter(|k| !k.is_empty())
        } else {
            None
        }
    }
}

/// Investor net-buy quantities for one instrument and date.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InvestorFlowItem {
    /// Trading date, `YYYYMMDD`
    pub date: String,
    pub change_rate: Option<String>,
    pub individual_net: Option<String>,
    pub institution_net: Option<String>,
    pub foreign_net: Option<String>,
}

/// Opaque access token issued by an external token service.
///
/// It is read-only for the duration of a batch and never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a token. Blank tokens are rejected.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    /// The raw token for request headers.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(****)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_continuation() {
        let page = DailyPage {
            items: vec![],
            has_more: true,
            next_key: Some("20240102".into()),
        };
        assert_eq!(page.continuation(), Some("20240102"));

        let last = DailyPage {
            has_more: false,
            next_key: Some("ignored".into()),
            ..Default::default()
        };
        assert_eq!(last.continuation(), None);

        let blank = DailyPage {
            has_more: true,
            next_key: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(blank.continuation(), None);
    }

    #[test]
    fn test_credential_is_masked() {
        let credential = Credential::new("secret-token").unwrap();
        assert_eq!(format!("{:?}", credential), "Credential(****)");
        assert_eq!(credential.expose(), "secret-token");
        assert!(Credential::new("   ").is_none());
    }
}
