/*!
Paginated table scanning.

Wraps the store's page-at-a-time scan in a lazy row stream that follows
continuation tokens until a page carries none. The stream is finite and
forward-only; it is not restartable mid-traversal, so a consumer that hits
an error must start a fresh scan rather than resume.
*/

use futures::stream::{self, Stream, TryStreamExt};

use crate::error::{Result, SweepError};
use crate::predicate::FilterPredicate;
use crate::store::{ScanToken, StoreClient};
use crate::value::Row;

enum PageCursor {
    Start,
    Next(ScanToken),
    Done,
}

/// Scan `table`, yielding every row (optionally those matching `predicate`)
/// in the store's natural, unspecified order.
///
/// Page fetches happen lazily as the stream is polled. Any page fetch
/// failure ends the stream with `ScanFailed`; rows already yielded are not
/// rolled back, so destructive consumers must stop at the first error
/// rather than assume the remaining rows were unmatched.
pub fn scan<'a, C>(
    store: &'a C,
    table: &'a str,
    predicate: Option<&'a FilterPredicate>,
) -> impl Stream<Item = Result<Row>> + 'a
where
    C: StoreClient + ?Sized,
{
    let pages = stream::try_unfold(PageCursor::Start, move |cursor| async move {
        let token = match cursor {
            PageCursor::Start => None,
            PageCursor::Next(token) => Some(token),
            PageCursor::Done => return Ok(None),
        };

        let page = store
            .scan_page(table, predicate, token.as_ref())
            .await
            .map_err(|cause| SweepError::scan_failed(table, cause))?;

        let cursor = match page.next {
            Some(token) => PageCursor::Next(token),
            None => PageCursor::Done,
        };
        Ok(Some((page.rows, cursor)))
    });

    pages
        .map_ok(|rows| stream::iter(rows.into_iter().map(Ok)))
        .try_flatten()
}

/// Drive a scan to exhaustion and collect every row.
pub async fn scan_to_vec<C>(
    store: &C,
    table: &str,
    predicate: Option<&FilterPredicate>,
) -> Result<Vec<Row>>
where
    C: StoreClient + ?Sized,
{
    scan(store, table, predicate).try_collect().await
}
