//! Pagination parameters, cursors and result pages.

use crate::query::filter::{non_blank, QueryParams, RecordFilter};
use crate::record::model::ValidationRecord;
use crate::LicenseLogError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Serialize;

/// Page size when none is requested.
pub const DEFAULT_LIMIT: u32 = 100;

/// Largest page a caller may request.
pub const MAX_LIMIT: u32 = 1000;

/// Matches beyond this are reported as "at least `COUNT_CAP`".
pub const COUNT_CAP: u64 = 10_000;

const CURSOR_PREFIX: &str = "id:";

/// Where a page begins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStart {
    /// Skip this many matching rows.
    Offset(u64),
    /// Continue strictly after the record with this id.
    After(i64),
}

/// Validated pagination request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Maximum records to return.
    pub limit: u32,
    /// Page start.
    pub start: PageStart,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            start: PageStart::Offset(0),
        }
    }
}

impl Pagination {
    /// Build a pagination request, enforcing `1..=MAX_LIMIT`.
    pub fn new(limit: u32, start: PageStart) -> Result<Self, LicenseLogError> {
        if limit == 0 || limit > MAX_LIMIT {
            return Err(LicenseLogError::validation(format!(
                "limit must be between 1 and {} (got {})",
                MAX_LIMIT, limit
            )));
        }
        Ok(Self { limit, start })
    }

    /// First `limit` records.
    pub fn first(limit: u32) -> Result<Self, LicenseLogError> {
        Self::new(limit, PageStart::Offset(0))
    }

    /// Same start, one extra row, used to detect whether more pages exist.
    pub(crate) fn with_lookahead(&self) -> Self {
        Self {
            limit: self.limit + 1,
            start: self.start,
        }
    }
}

/// Encode a continuation token for the record with `id`.
pub fn encode_cursor(id: i64) -> String {
    URL_SAFE_NO_PAD.encode(format!("{}{}", CURSOR_PREFIX, id))
}

/// Decode a continuation token produced by [`encode_cursor`].
pub fn decode_cursor(token: &str) -> Result<i64, LicenseLogError> {
    let invalid = || LicenseLogError::validation("cursor is not a valid continuation token");
    let bytes = URL_SAFE_NO_PAD.decode(token.trim()).map_err(|_| invalid())?;
    let text = String::from_utf8(bytes).map_err(|_| invalid())?;
    text.strip_prefix(CURSOR_PREFIX)
        .and_then(|id| id.parse::<i64>().ok())
        .ok_or_else(invalid)
}

/// A validated search request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    /// Which records.
    pub filter: RecordFilter,
    /// Which page of them.
    pub page: Pagination,
}

impl QueryParams {
    /// Build and validate a full search request.
    pub fn search_query(&self) -> Result<SearchQuery, LicenseLogError> {
        let filter = self.filter()?;

        let limit = match non_blank(&self.limit) {
            None => DEFAULT_LIMIT,
            Some(raw) => raw.parse::<u32>().map_err(|_| {
                LicenseLogError::validation(format!("limit must be a positive integer (got {:?})", raw))
            })?,
        };

        let offset = non_blank(&self.offset)
            .map(|raw| {
                raw.parse::<u64>().map_err(|_| {
                    LicenseLogError::validation(format!(
                        "offset must be a non-negative integer (got {:?})",
                        raw
                    ))
                })
            })
            .transpose()?;

        let start = match (non_blank(&self.cursor), offset) {
            (Some(_), Some(o)) if o > 0 => {
                return Err(LicenseLogError::validation(
                    "offset and cursor cannot be combined",
                ))
            }
            (Some(token), _) => PageStart::After(decode_cursor(token)?),
            (None, offset) => PageStart::Offset(offset.unwrap_or(0)),
        };

        Ok(SearchQuery {
            filter,
            page: Pagination::new(limit, start)?,
        })
    }
}

/// One page of search results.
#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    /// Matching records, newest first.
    pub records: Vec<ValidationRecord>,

    /// Number of records matching the filter, ignoring pagination.
    pub total: u64,

    /// True when `total` stopped counting at [`COUNT_CAP`].
    pub total_capped: bool,

    /// Page size that was applied.
    pub limit: u32,

    /// Token for the next page, absent on the last page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,

    /// Offset of the next page when paginating by offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        let mut p = QueryParams::default();
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "limit" => p.limit = v,
                "offset" => p.offset = v,
                "cursor" => p.cursor = v,
                "license_key" => p.license_key = v,
                _ => unreachable!(),
            }
        }
        p
    }

    #[test]
    fn test_cursor_roundtrip() {
        let token = encode_cursor(42);
        assert_eq!(decode_cursor(&token).unwrap(), 42);
    }

    #[test]
    fn test_cursor_garbage() {
        assert!(matches!(
            decode_cursor("!!!"),
            Err(LicenseLogError::Validation(_))
        ));
        let not_ours = URL_SAFE_NO_PAD.encode("offset:3");
        assert!(decode_cursor(&not_ours).is_err());
    }

    #[test]
    fn test_defaults() {
        let query = params(&[]).search_query().unwrap();
        assert_eq!(query.page, Pagination::default());
        assert_eq!(query.filter, RecordFilter::default());
    }

    #[test]
    fn test_limit_bounds() {
        assert!(params(&[("limit", "1000")]).search_query().is_ok());
        assert!(matches!(
            params(&[("limit", "1001")]).search_query(),
            Err(LicenseLogError::Validation(_))
        ));
        assert!(matches!(
            params(&[("limit", "0")]).search_query(),
            Err(LicenseLogError::Validation(_))
        ));
        assert!(matches!(
            params(&[("limit", "-5")]).search_query(),
            Err(LicenseLogError::Validation(_))
        ));
    }

    #[test]
    fn test_offset_parsed() {
        let query = params(&[("offset", "20"), ("limit", "10")]).search_query().unwrap();
        assert_eq!(query.page.start, PageStart::Offset(20));
        assert_eq!(query.page.limit, 10);
    }

    #[test]
    fn test_cursor_parsed() {
        let token = encode_cursor(99);
        let query = params(&[("cursor", token.as_str())]).search_query().unwrap();
        assert_eq!(query.page.start, PageStart::After(99));
    }

    #[test]
    fn test_cursor_and_offset_conflict() {
        let token = encode_cursor(99);
        let result = params(&[("cursor", token.as_str()), ("offset", "5")]).search_query();
        assert!(matches!(result, Err(LicenseLogError::Validation(_))));
    }

    #[test]
    fn test_lookahead_adds_one() {
        let page = Pagination::first(10).unwrap();
        assert_eq!(page.with_lookahead().limit, 11);
    }
}
