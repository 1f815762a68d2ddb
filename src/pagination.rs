//! Cursor pagination over any paginated method
//!
//! Three consumption shapes over one drive loop:
//! - [`WebClient::paginate`]: a lazy, non-restartable page stream (one fetch
//!   per consumption step);
//! - [`WebClient::paginate_until`]: drive to completion, stopping early on a
//!   caller predicate;
//! - [`WebClient::paginate_fold`]: drive to completion while folding every
//!   visited page into an accumulator.
//!
//! Each fetch after the first merges the previous page's
//! `response_metadata.next_cursor` into the options; iteration ends when a page
//! carries no usable cursor. Pages are strictly sequential: the next fetch does
//! not start until the current page has been consumed.

use std::pin::Pin;

use futures_util::{stream, Stream, StreamExt};
use tracing::debug;

use crate::client::WebClient;
use crate::error::{Error, Result};
use crate::options::CallOptions;
use crate::response::CallResult;

/// A pinned, boxed stream of pages
pub type PageStream = Pin<Box<dyn Stream<Item = Result<CallResult>> + Send>>;

struct PageState {
    cursor: Option<String>,
    fetched: usize,
    done: bool,
}

impl WebClient {
    /// Lazily iterate the pages of a cursor-paginated method.
    ///
    /// The stream is non-restartable and ends without a sentinel once a page
    /// lacks a next cursor. An empty page that still carries a cursor
    /// continues. A per-run safety cap (see
    /// [`WebClientBuilder::max_pagination_pages`](crate::WebClientBuilder::max_pagination_pages))
    /// turns a repeated-cursor server bug into [`Error::PaginationLimit`]
    /// instead of an unbounded loop. Per-page failures surface as the stream's
    /// next item and terminate it.
    pub fn paginate(&self, method: &str, options: CallOptions) -> PageStream {
        let client = self.clone();
        let method = method.to_string();
        let cap = client.max_pagination_pages();

        let stream = stream::unfold(
            PageState {
                cursor: None,
                fetched: 0,
                done: false,
            },
            move |state| {
                let client = client.clone();
                let method = method.clone();
                let options = options.clone();
                async move {
                    if state.done {
                        return None;
                    }

                    if state.fetched >= cap {
                        return Some((
                            Err(Error::PaginationLimit {
                                pages: state.fetched,
                            }),
                            PageState { done: true, ..state },
                        ));
                    }

                    let page_options = match &state.cursor {
                        Some(cursor) => options.with_cursor(cursor),
                        None => options,
                    };

                    match client.api_call(&method, page_options).await {
                        Ok(page) => {
                            let next = page.next_cursor().map(String::from);
                            debug!(
                                method,
                                page = state.fetched + 1,
                                has_next = next.is_some(),
                                "fetched page"
                            );
                            let done = next.is_none();
                            Some((
                                Ok(page),
                                PageState {
                                    cursor: next,
                                    fetched: state.fetched + 1,
                                    done,
                                },
                            ))
                        }
                        Err(e) => Some((Err(e), PageState { done: true, ..state })),
                    }
                }
            },
        );

        Box::pin(stream)
    }

    /// Drive a pagination run until `should_stop` returns true for a page or
    /// the cursor chain ends.
    pub async fn paginate_until<S>(
        &self,
        method: &str,
        options: CallOptions,
        should_stop: S,
    ) -> Result<()>
    where
        S: FnMut(&CallResult) -> bool,
    {
        self.paginate_fold(method, options, should_stop, |_, _, _| ())
            .await
            .map(|_| ())
    }

    /// Drive a pagination run, folding every visited page into an accumulator.
    ///
    /// `reduce(acc, page, index)` runs for each page in order, `index` starting
    /// at 0, with `acc == None` for the first page. A page for which
    /// `should_stop` returns true is still folded before iteration ends.
    /// Resolves to `None` only when zero pages were visited. A per-page error
    /// discards any partial accumulation.
    pub async fn paginate_fold<A, S, R>(
        &self,
        method: &str,
        options: CallOptions,
        mut should_stop: S,
        mut reduce: R,
    ) -> Result<Option<A>>
    where
        S: FnMut(&CallResult) -> bool,
        R: FnMut(Option<A>, &CallResult, usize) -> A,
    {
        let mut pages = self.paginate(method, options);
        let mut acc = None;
        let mut index = 0usize;

        while let Some(page) = pages.next().await {
            let page = page?;
            acc = Some(reduce(acc.take(), &page, index));
            index += 1;
            if should_stop(&page) {
                debug!(method, pages = index, "pagination stopped by caller");
                break;
            }
        }

        Ok(acc)
    }
}
