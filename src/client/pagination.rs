//! Offset pagination over the repository listing endpoints.
//!
//! Pages are fetched one after another; each request depends on how many
//! documents the previous page returned, so there is no fan-out.

use crate::client::backends::BackendResult;
use crate::client::Oid;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::future::Future;

/// One page of a listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Offset this page was requested at
    pub start: u64,
    /// Total number of matches the backend reported
    pub num_found: u64,
    /// Identifiers on this page, in backend order
    pub ids: Vec<Oid>,
}

impl Page {
    /// Offset of the following page, or `None` if this was the last one.
    ///
    /// An empty page always ends the listing, even if `num_found` claims more,
    /// and so does an offset that would overflow.
    #[must_use]
    pub fn next_start(&self) -> Option<u64> {
        let fetched = self.ids.len() as u64;
        let next = self.start.checked_add(fetched)?;
        (fetched > 0 && next < self.num_found).then_some(next)
    }
}

/// Lazily fetch pages starting at `start` until the listing is exhausted.
///
/// `fetch` is called with each page offset. An error is yielded once and
/// ends the stream. The stream cannot be restarted; call `paginate` again.
pub fn paginate<'a, F, Fut>(start: u64, fetch: F) -> BoxStream<'a, BackendResult<Page>>
where
    F: FnMut(u64) -> Fut + Send + 'a,
    Fut: Future<Output = BackendResult<Page>> + Send + 'a,
{
    stream::try_unfold((Some(start), fetch), |(next, mut fetch)| async move {
        let Some(offset) = next else {
            return Ok(None);
        };
        let page = fetch(offset).await?;
        let following = page.next_start();
        Ok(Some((page, (following, fetch))))
    })
    .boxed()
}

/// Drain a page stream into one ordered list of identifiers
pub async fn collect_ids(pages: BoxStream<'_, BackendResult<Page>>) -> BackendResult<Vec<Oid>> {
    pages
        .try_fold(Vec::new(), |mut ids, page| async move {
            ids.extend(page.ids);
            Ok(ids)
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::backends::BackendError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn oids(range: std::ops::Range<u64>) -> Vec<Oid> {
        range.map(|i| Oid::new(&format!("oid-{i}")).unwrap()).collect()
    }

    fn page(start: u64, num_found: u64, page_size: u64) -> Page {
        let end = (start + page_size).min(num_found);
        Page {
            start,
            num_found,
            ids: oids(start..end.max(start)),
        }
    }

    #[test]
    fn test_next_start() {
        assert_eq!(page(0, 25, 10).next_start(), Some(10));
        assert_eq!(page(20, 25, 10).next_start(), None);
        assert_eq!(page(0, 10, 10).next_start(), None);
        let empty = Page {
            start: 0,
            num_found: 5,
            ids: Vec::new(),
        };
        assert_eq!(empty.next_start(), None);
    }

    #[test]
    fn test_next_start_at_end_of_range() {
        let last = Page {
            start: u64::MAX - 1,
            num_found: u64::MAX,
            ids: oids(0..3),
        };
        assert_eq!(last.next_start(), None);
    }

    #[tokio::test]
    async fn test_offset_overflow_ends_stream() {
        let mut pages = paginate(u64::MAX - 1, |start| async move {
            Ok(Page {
                start,
                num_found: u64::MAX,
                ids: oids(0..3),
            })
        });

        assert!(pages.next().await.unwrap().is_ok());
        assert!(pages.next().await.is_none());
    }

    #[tokio::test]
    async fn test_collects_all_pages_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pages = paginate(0, move |start| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move { Ok(page(start, 25, 10)) }
        });

        let ids = collect_ids(pages).await.unwrap();
        assert_eq!(ids, oids(0..25));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_starts_at_offset() {
        let ids = collect_ids(paginate(15, |start| async move { Ok(page(start, 25, 10)) }))
            .await
            .unwrap();
        assert_eq!(ids, oids(15..25));
    }

    #[tokio::test]
    async fn test_empty_listing() {
        let ids = collect_ids(paginate(0, |start| async move { Ok(page(start, 0, 10)) }))
            .await
            .unwrap();
        assert!(ids.is_empty());
    }

    #[tokio::test]
    async fn test_error_ends_stream() {
        let mut pages = paginate(0, |start| async move {
            if start == 0 {
                Ok(page(0, 30, 10))
            } else {
                Err(BackendError::Status {
                    code: 500,
                    message: String::new(),
                })
            }
        });

        assert!(pages.next().await.unwrap().is_ok());
        assert!(pages.next().await.unwrap().is_err());
        assert!(pages.next().await.is_none());
    }
}
