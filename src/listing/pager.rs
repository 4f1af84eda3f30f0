//! Incremental "load more" over a [`ContentQuery`].

use std::sync::Arc;

use tokio::sync::Mutex;

use super::query::{fetch_page, ContentQuery};
use crate::db::models::ContentItem;
use crate::error::AppResult;
use crate::store::{ContentRepo, Cursor};

#[derive(Debug, Clone, PartialEq)]
pub enum PageLoad {
    /// A page was fetched and appended.
    Loaded(Vec<ContentItem>),
    /// Nothing left to load, or a load is already in flight. No request issued.
    Skipped,
    /// The response belonged to a generation superseded by `refresh()`.
    Stale,
}

struct PagerState {
    marker: Option<Cursor>,
    has_more: bool,
    generation: u64,
    in_flight: Option<u64>,
    items: Vec<ContentItem>,
}

pub struct ListingPager<S: ContentRepo + ?Sized> {
    store: Arc<S>,
    query: ContentQuery,
    state: Mutex<PagerState>,
}

impl<S: ContentRepo + ?Sized> ListingPager<S> {
    /// The query's own cursor is ignored; the pager starts from the top.
    pub fn new(store: Arc<S>, query: ContentQuery) -> Self {
        Self {
            store,
            query: query.starting_after(None),
            state: Mutex::new(PagerState {
                marker: None,
                has_more: true,
                generation: 0,
                in_flight: None,
                items: Vec::new(),
            }),
        }
    }

    pub async fn load_more(&self) -> AppResult<PageLoad> {
        let (generation, query) = {
            let mut state = self.state.lock().await;
            if !state.has_more || state.in_flight.is_some() {
                return Ok(PageLoad::Skipped);
            }
            state.in_flight = Some(state.generation);
            (
                state.generation,
                self.query.clone().starting_after(state.marker.clone()),
            )
        };

        let result = fetch_page(self.store.as_ref(), &query).await;

        let mut state = self.state.lock().await;
        if state.generation != generation {
            tracing::debug!(generation, current = state.generation, "dropping stale page");
            return Ok(PageLoad::Stale);
        }
        state.in_flight = None;

        let page = result?;
        state.marker = page.next_cursor;
        state.has_more = page.has_more;
        state.items.extend(page.items.iter().cloned());
        Ok(PageLoad::Loaded(page.items))
    }

    /// Reset to the first page and fetch it. Any load still in flight will
    /// have its response discarded.
    pub async fn refresh(&self) -> AppResult<PageLoad> {
        {
            let mut state = self.state.lock().await;
            state.generation += 1;
            state.marker = None;
            state.has_more = true;
            state.in_flight = None;
            state.items.clear();
        }
        self.load_more().await
    }

    pub async fn has_more(&self) -> bool {
        self.state.lock().await.has_more
    }

    pub async fn items(&self) -> Vec<ContentItem> {
        self.state.lock().await.items.clone()
    }
}
