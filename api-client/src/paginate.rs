//! Lazy, cursor driven pagination.
//!
//! APIs page their results either by page number or by an opaque cursor. Both
//! are handled the same way here: a fetch function turns a cursor into a
//! [Page], and the page names the cursor for the page after it. [paginate]
//! turns that into a stream of pages which ends when a page has no successor,
//! or stops after the first error.

use std::future::Future;

use futures::stream::{self, BoxStream};
use futures::StreamExt as _;

/// One page of results, and the cursor which locates the page after it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T, C> {
    /// Items on this page
    pub items: Vec<T>,

    /// The cursor for the next page, `None` on the last page.
    pub next: Option<C>,
}

impl<T, C> Page<T, C> {
    /// A page which is known to be the last one.
    pub fn last(items: Vec<T>) -> Self {
        Self { items, next: None }
    }

    /// A page with `next` as its successor. An empty page is always treated as the last.
    pub fn new(items: Vec<T>, next: C) -> Self {
        if items.is_empty() {
            Self::last(items)
        } else {
            Self {
                items,
                next: Some(next),
            }
        }
    }
}

/// A stream of pages, each page being the items one request returned.
pub type Paginated<'a, T, E> = BoxStream<'a, Result<Vec<T>, E>>;

/// Build a finite stream of pages starting from `first`.
///
/// Nothing is requested until the stream is polled. Calling `paginate` again
/// with the same starting cursor restarts from the beginning.
pub fn paginate<'a, C, T, E, F, Fut>(first: C, mut fetch: F) -> Paginated<'a, T, E>
where
    C: Send + 'a,
    T: Send + 'a,
    E: Send + 'a,
    F: FnMut(C) -> Fut + Send + 'a,
    Fut: Future<Output = Result<Page<T, C>, E>> + Send + 'a,
{
    stream::try_unfold(Some(first), move |cursor| {
        let request = cursor.map(&mut fetch);
        async move {
            let Some(request) = request else {
                return Ok(None);
            };
            let page = request.await?;
            Ok(Some((page.items, page.next)))
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use futures::{StreamExt as _, TryStreamExt as _};

    use super::*;

    #[tokio::test]
    async fn numbered_pages_stop_after_empty_page() {
        let requests = Arc::new(AtomicUsize::new(0));
        let counter = requests.clone();

        let pages: Vec<Vec<u32>> = paginate(1u32, move |page| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                let items = if page <= 3 { vec![page * 10, page * 10 + 1] } else { vec![] };
                Ok::<_, std::convert::Infallible>(Page::new(items, page + 1))
            }
        })
        .try_collect()
        .await
        .unwrap();

        assert_eq!(pages.len(), 4);
        assert!(pages[3].is_empty());
        assert_eq!(pages.concat(), vec![10, 11, 20, 21, 30, 31]);
        assert_eq!(requests.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn cursor_pages_stop_without_successor() {
        let pages: Vec<Vec<&str>> = paginate(None::<String>, |after| async move {
            Ok::<_, String>(match after.as_deref() {
                None => Page::new(vec!["a", "b"], Some("c1".to_owned())),
                Some("c1") => Page::last(vec!["c"]),
                Some(other) => return Err(format!("unexpected cursor {other}")),
            })
        })
        .try_collect()
        .await
        .unwrap();

        assert_eq!(pages, vec![vec!["a", "b"], vec!["c"]]);
    }

    #[tokio::test]
    async fn first_error_ends_the_stream() {
        let mut pages = paginate(0u32, |page| async move {
            if page == 1 {
                Err("boom")
            } else {
                Ok(Page::new(vec![page], page + 1))
            }
        });

        assert_eq!(pages.next().await, Some(Ok(vec![0])));
        assert_eq!(pages.next().await, Some(Err("boom")));
        assert_eq!(pages.next().await, None);
    }
}
