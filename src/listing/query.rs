//! # Content query builder
//!
//! Translates listing options into one [`StoreQuery`] and runs it. Only
//! published items are ever eligible. Free-text search is applied to the
//! page after it comes back from the store, so a page may hold fewer than
//! `page_size` matches while more data is still available.
//!
//! The continuation cursor always marks the last *fetched* document, before
//! the search filter runs. Following cursors therefore walks the same raw
//! sequence with or without a search term, and the searched stream is exactly
//! the filtered raw stream: nothing skipped, nothing repeated.

use futures::stream::{self, Stream, TryStreamExt};

use crate::db::models::{ContentItem, ContentStatus};
use crate::error::{AppError, AppResult};
use crate::store::{ContentRepo, Cursor, Filter, Sort, SortField, SortOrder, StoreQuery};

/// Category names the client uses for "no category filter".
const ALL_CATEGORIES: [&str; 2] = ["all", "tümü"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

impl CategoryFilter {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let lowered = trimmed.to_lowercase();
        if trimmed.is_empty() || ALL_CATEGORIES.contains(&lowered.as_str()) {
            CategoryFilter::All
        } else {
            CategoryFilter::Named(trimmed.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContentQuery {
    pub category: CategoryFilter,
    pub owner_id: Option<String>,
    pub is_premium: Option<bool>,
    pub is_short: Option<bool>,
    pub search: Option<String>,
    pub sort: Sort,
    pub page_size: usize,
    pub cursor: Option<Cursor>,
}

impl ContentQuery {
    pub fn new(page_size: usize) -> Self {
        Self {
            category: CategoryFilter::All,
            owner_id: None,
            is_premium: None,
            is_short: None,
            search: None,
            sort: Sort::default(),
            page_size,
            cursor: None,
        }
    }

    pub fn category(mut self, category: CategoryFilter) -> Self {
        self.category = category;
        self
    }

    pub fn owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn premium(mut self, flag: bool) -> Self {
        self.is_premium = Some(flag);
        self
    }

    pub fn short(mut self, flag: bool) -> Self {
        self.is_short = Some(flag);
        self
    }

    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn sort_by(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort = Sort { field, order };
        self
    }

    pub fn starting_after(mut self, cursor: Option<Cursor>) -> Self {
        self.cursor = cursor;
        self
    }

    /// Lowercased, trimmed search term; blank terms disable search.
    pub fn search_needle(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase)
    }

    /// Compose the store request. Fails before touching the store when the
    /// options cannot describe a valid read.
    pub fn plan(&self) -> AppResult<StoreQuery> {
        if self.page_size == 0 {
            return Err(AppError::BadRequest("pageSize must be greater than 0".into()));
        }
        if let Some(cursor) = &self.cursor {
            if cursor.field != self.sort.field {
                return Err(AppError::BadRequest(
                    "Continuation cursor belongs to a different sort field".into(),
                ));
            }
        }

        let mut filters = vec![Filter::Status(ContentStatus::Published)];
        if let CategoryFilter::Named(name) = &self.category {
            filters.push(Filter::Category(name.clone()));
        }
        if let Some(owner) = &self.owner_id {
            filters.push(Filter::Owner(owner.clone()));
        }
        if let Some(flag) = self.is_premium {
            filters.push(Filter::Premium(flag));
        }
        if let Some(flag) = self.is_short {
            filters.push(Filter::Short(flag));
        }

        Ok(StoreQuery {
            filters,
            sort: self.sort,
            limit: self.page_size,
            start_after: self.cursor.clone(),
        })
    }
}

/// One fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentPage {
    /// Items after the search post-filter.
    pub items: Vec<ContentItem>,
    /// Present whenever `has_more` is; marks the last fetched document.
    pub next_cursor: Option<Cursor>,
    /// Heuristic: the store returned a full page.
    pub has_more: bool,
    /// Number of documents the store returned before search filtering.
    pub fetched: usize,
}

pub async fn fetch_page<S>(store: &S, query: &ContentQuery) -> AppResult<ContentPage>
where
    S: ContentRepo + ?Sized,
{
    let plan = query.plan()?;
    let raw = store.query_content(&plan).await?;

    let fetched = raw.len();
    let has_more = fetched == query.page_size;
    let next_cursor = if has_more {
        raw.last().map(|item| Cursor::after(query.sort.field, item))
    } else {
        None
    };

    let items = match query.search_needle() {
        Some(needle) => raw
            .into_iter()
            .filter(|item| item.matches_text(&needle))
            .collect(),
        None => raw,
    };

    Ok(ContentPage {
        items,
        next_cursor,
        has_more,
        fetched,
    })
}

/// Lazy sequence of pages, starting at `query.cursor` and following
/// continuation cursors until a short page.
pub fn pages<'a, S>(
    store: &'a S,
    query: ContentQuery,
) -> impl Stream<Item = AppResult<ContentPage>> + 'a
where
    S: ContentRepo + ?Sized + 'a,
{
    stream::try_unfold(Some(query), move |next| async move {
        let Some(query) = next else {
            return Ok(None);
        };
        let page = fetch_page(store, &query).await?;
        let following = page
            .next_cursor
            .clone()
            .map(|cursor| query.starting_after(Some(cursor)));
        Ok(Some((page, following)))
    })
}

/// Lazy sequence of matching items across pages.
pub fn items<'a, S>(
    store: &'a S,
    query: ContentQuery,
) -> impl Stream<Item = AppResult<ContentItem>> + 'a
where
    S: ContentRepo + ?Sized + 'a,
{
    pages(store, query)
        .map_ok(|page| stream::iter(page.items.into_iter().map(Ok::<_, AppError>)))
        .try_flatten()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_category_aliases_disable_the_filter() {
        assert_eq!(CategoryFilter::parse("all"), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse("Tümü"), CategoryFilter::All);
        assert_eq!(CategoryFilter::parse("  "), CategoryFilter::All);
        assert_eq!(
            CategoryFilter::parse("Müzik"),
            CategoryFilter::Named("Müzik".into())
        );
    }

    #[test]
    fn plan_always_restricts_to_published() {
        let plan = ContentQuery::new(10).plan().unwrap();
        assert_eq!(plan.filters, vec![Filter::Status(ContentStatus::Published)]);
        assert_eq!(plan.limit, 10);
        assert_eq!(plan.sort, Sort::default());
    }

    #[test]
    fn plan_composes_every_filter() {
        let plan = ContentQuery::new(5)
            .category(CategoryFilter::Named("Spor".into()))
            .owner("u1")
            .premium(true)
            .short(false)
            .sort_by(SortField::Views, SortOrder::Asc)
            .plan()
            .unwrap();
        assert_eq!(
            plan.filters,
            vec![
                Filter::Status(ContentStatus::Published),
                Filter::Category("Spor".into()),
                Filter::Owner("u1".into()),
                Filter::Premium(true),
                Filter::Short(false),
            ]
        );
        assert_eq!(plan.sort.field, SortField::Views);
        assert_eq!(plan.sort.order, SortOrder::Asc);
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(matches!(
            ContentQuery::new(0).plan(),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn cursor_must_match_sort_field() {
        let cursor = Cursor {
            field: SortField::Likes,
            value: 3,
            id: "x".into(),
        };
        let query = ContentQuery::new(5).starting_after(Some(cursor));
        assert!(matches!(query.plan(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn blank_search_is_ignored() {
        assert_eq!(ContentQuery::new(1).search("   ").search_needle(), None);
        assert_eq!(
            ContentQuery::new(1).search(" Gitar ").search_needle(),
            Some("gitar".to_string())
        );
    }
}
