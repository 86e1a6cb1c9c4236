//! Pagination
//!
//! Provider listings are exposed as a lazy page sequence: the consumer pulls
//! pages one at a time until the provider stops handing out continuation
//! tokens, a page fails, or the consumer stops asking.

use anyhow::Result;
use std::future::Future;

/// One page of a paged listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Continuation token; `None` on the final page
    pub next_token: Option<String>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, next_token: Option<String>) -> Self {
        Self {
            items,
            next_token: normalize_token(next_token),
        }
    }

    /// Single page with no continuation
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_token: None,
        }
    }

    pub fn is_last(&self) -> bool {
        self.next_token.is_none()
    }
}

/// Some APIs (the tagging API among them) signal the final page with an empty
/// token instead of omitting it
pub fn normalize_token(token: Option<String>) -> Option<String> {
    token.filter(|t| !t.is_empty())
}

/// Pull-based page sequence over a `fetch(next_token)` function.
///
/// Finite and non-restartable: once the last page was returned or a fetch
/// failed, `next_page` yields `None` forever.
pub struct Paginator<F> {
    fetch: F,
    next_token: Option<String>,
    exhausted: bool,
    pages_fetched: usize,
}

impl<F, Fut, T> Paginator<F>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    pub fn new(fetch: F) -> Self {
        Self {
            fetch,
            next_token: None,
            exhausted: false,
            pages_fetched: 0,
        }
    }

    /// Fetch the next page, or `None` once the sequence is exhausted
    pub async fn next_page(&mut self) -> Option<Result<Page<T>>> {
        if self.exhausted {
            return None;
        }

        match (self.fetch)(self.next_token.take()).await {
            Ok(page) => {
                self.pages_fetched += 1;
                self.next_token = page.next_token.clone();
                if page.is_last() {
                    self.exhausted = true;
                }
                Some(Ok(page))
            }
            Err(err) => {
                self.exhausted = true;
                Some(Err(err))
            }
        }
    }

    /// Drain every remaining page into a single list
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut all_items = Vec::new();
        while let Some(page) = self.next_page().await {
            all_items.extend(page?.items);
        }
        Ok(all_items)
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}
