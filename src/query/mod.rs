//! Query engine: filtered, paginated search over stored records.

pub mod filter;
pub mod page;

use crate::store::RecordStore;
use crate::LicenseLogError;
use page::{encode_cursor, PageStart, SearchPage, SearchQuery, COUNT_CAP};

/// Run a validated search against the store.
///
/// Fetches one row beyond the page to decide whether a next page exists,
/// then counts matches up to [`COUNT_CAP`].
pub fn search(store: &dyn RecordStore, query: &SearchQuery) -> Result<SearchPage, LicenseLogError> {
    query.filter.validate()?;

    let mut records = store.query(&query.filter, &query.page.with_lookahead())?;
    let has_more = records.len() > query.page.limit as usize;
    records.truncate(query.page.limit as usize);

    let count = store.count(&query.filter, COUNT_CAP)?;

    let next_cursor = if has_more {
        records.last().map(|r| encode_cursor(r.id))
    } else {
        None
    };
    let next_offset = match query.page.start {
        PageStart::Offset(offset) if has_more => Some(offset + records.len() as u64),
        _ => None,
    };

    Ok(SearchPage {
        records,
        total: count.count,
        total_capped: count.capped,
        limit: query.page.limit,
        next_cursor,
        next_offset,
    })
}
