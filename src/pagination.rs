use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

use crate::catalog::{ItemKey, Keyed, MediaItem, MediaKind, Page};
use crate::tmdb::{
    CatalogApi, CatalogResult, DiscoverSort, MovieList, QueryParams, SearchScope, ShowList,
    TimeWindow,
};

/// Distance from the bottom of the document, in pixels, at which the next page
/// is requested.
pub const DEFAULT_SCROLL_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedStatus {
    Idle,
    Fetching,
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Skip {
    InFlight,
    Exhausted,
    NotNearBottom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LoadOutcome {
    Loaded { page: u32, added: usize },
    Skipped { reason: Skip },
    /// The response belonged to a query that has since been replaced.
    Stale,
    Failed { message: String },
}

/// Permission to fetch one page, bound to the query generation it was issued in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTicket {
    generation: u64,
    page: u32,
}

impl PageTicket {
    pub fn page(&self) -> u32 {
        self.page
    }
}

/// Page bookkeeping for one query context: Idle -> Fetching -> Idle | Exhausted.
#[derive(Debug, Clone)]
pub struct Paginator<T> {
    generation: u64,
    page: u32,
    total_pages: Option<u32>,
    items: Vec<T>,
    seen: HashSet<ItemKey>,
    status: FeedStatus,
    last_error: Option<String>,
}

impl<T: Keyed> Default for Paginator<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Keyed> Paginator<T> {
    pub fn new() -> Self {
        Self {
            generation: 0,
            page: 0,
            total_pages: None,
            items: Vec::new(),
            seen: HashSet::new(),
            status: FeedStatus::Idle,
            last_error: None,
        }
    }

    pub fn begin(&mut self) -> Result<PageTicket, Skip> {
        match self.status {
            FeedStatus::Fetching => return Err(Skip::InFlight),
            FeedStatus::Exhausted => return Err(Skip::Exhausted),
            FeedStatus::Idle => {}
        }
        let next = self.page + 1;
        if self.total_pages.is_some_and(|total| next > total) {
            self.status = FeedStatus::Exhausted;
            return Err(Skip::Exhausted);
        }
        self.status = FeedStatus::Fetching;
        Ok(PageTicket {
            generation: self.generation,
            page: next,
        })
    }

    pub fn finish(&mut self, ticket: PageTicket, result: Result<Page<T>, String>) -> LoadOutcome {
        if ticket.generation != self.generation {
            debug!(page = ticket.page, "Discarding response for a replaced query");
            return LoadOutcome::Stale;
        }
        let page = match result {
            Ok(page) => page,
            Err(message) => {
                self.status = FeedStatus::Idle;
                self.last_error = Some(message.clone());
                return LoadOutcome::Failed { message };
            }
        };

        self.page = ticket.page;
        let total = page.total_pages.max(ticket.page);
        self.total_pages = Some(total);
        self.last_error = None;

        let mut added = 0;
        for item in page.results {
            if self.seen.insert(item.key()) {
                self.items.push(item);
                added += 1;
            }
        }
        self.status = if self.page >= total {
            FeedStatus::Exhausted
        } else {
            FeedStatus::Idle
        };
        LoadOutcome::Loaded {
            page: ticket.page,
            added,
        }
    }

    /// Drops all accumulated state; any outstanding ticket becomes stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.page = 0;
        self.total_pages = None;
        self.items.clear();
        self.seen.clear();
        self.status = FeedStatus::Idle;
        self.last_error = None;
    }

    /// Last page appended, reported as 1 before the first load.
    pub fn current_page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn pages_loaded(&self) -> u32 {
        self.page
    }

    pub fn total_pages(&self) -> Option<u32> {
        self.total_pages
    }

    pub fn status(&self) -> FeedStatus {
        self.status
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn has_more(&self) -> bool {
        self.status != FeedStatus::Exhausted
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollPosition {
    pub viewport_height: f64,
    pub scroll_top: f64,
    pub document_height: f64,
}

impl ScrollPosition {
    pub fn near_bottom(&self, threshold: f64) -> bool {
        self.viewport_height + self.scroll_top + threshold >= self.document_height
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum FeedSource {
    Movies { list: MovieList },
    Shows { list: ShowList },
    Genre {
        kind: MediaKind,
        genre_id: u64,
        sort: DiscoverSort,
    },
    Search { scope: SearchScope, query: String },
    Trending { scope: SearchScope, window: TimeWindow },
    Similar { kind: MediaKind, id: u64 },
}

/// Identity of a paginated result set. Any change to it restarts pagination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedQuery {
    pub source: FeedSource,
    pub params: QueryParams,
}

impl FeedQuery {
    pub fn new(source: FeedSource) -> Self {
        Self {
            source,
            params: QueryParams::new(),
        }
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }

    pub async fn fetch(&self, api: &dyn CatalogApi, page: u32) -> CatalogResult<Page<MediaItem>> {
        match &self.source {
            FeedSource::Movies { list } => api.movie_list(*list, page, &self.params).await,
            FeedSource::Shows { list } => api.show_list(*list, page, &self.params).await,
            FeedSource::Genre {
                kind,
                genre_id,
                sort,
            } => {
                api.discover(*kind, *genre_id, *sort, page, &self.params)
                    .await
            }
            FeedSource::Search { scope, query } => api.search(*scope, query, page).await,
            FeedSource::Trending { scope, window } => api.trending(*scope, *window, page).await,
            FeedSource::Similar { kind, id } => api.similar(*kind, *id, page).await,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedSnapshot {
    pub query: FeedQuery,
    pub items: Vec<MediaItem>,
    pub page: u32,
    pub total_pages: Option<u32>,
    pub status: FeedStatus,
    pub error: Option<String>,
}

struct FeedInner {
    query: FeedQuery,
    pager: Paginator<MediaItem>,
}

/// Infinite-scroll controller. At most one page request is outstanding; the
/// state lock is never held across an await.
pub struct PagedFeed {
    api: Arc<dyn CatalogApi>,
    inner: Mutex<FeedInner>,
}

impl PagedFeed {
    pub fn new(api: Arc<dyn CatalogApi>, query: FeedQuery) -> Self {
        Self {
            api,
            inner: Mutex::new(FeedInner {
                query,
                pager: Paginator::new(),
            }),
        }
    }

    pub fn query(&self) -> FeedQuery {
        self.lock().query.clone()
    }

    /// Returns true when the identity changed and the feed was reset.
    pub fn set_query(&self, query: FeedQuery) -> bool {
        let mut inner = self.lock();
        if inner.query == query {
            return false;
        }
        debug!(?query, "Feed query changed, resetting");
        inner.query = query;
        inner.pager.reset();
        true
    }

    pub fn reset(&self) {
        self.lock().pager.reset();
    }

    pub async fn load_more(&self) -> LoadOutcome {
        let (ticket, query) = {
            let mut inner = self.lock();
            match inner.pager.begin() {
                Ok(ticket) => (ticket, inner.query.clone()),
                Err(reason) => return LoadOutcome::Skipped { reason },
            }
        };
        debug!(page = ticket.page(), "Fetching feed page");
        let result = query
            .fetch(self.api.as_ref(), ticket.page())
            .await
            .map_err(|e| {
                warn!(page = ticket.page(), "Feed page failed: {}", e);
                e.to_string()
            });
        self.lock().pager.finish(ticket, result)
    }

    pub async fn on_scroll(&self, position: ScrollPosition) -> LoadOutcome {
        if !position.near_bottom(DEFAULT_SCROLL_THRESHOLD) {
            return LoadOutcome::Skipped {
                reason: Skip::NotNearBottom,
            };
        }
        self.load_more().await
    }

    pub fn status(&self) -> FeedStatus {
        self.lock().pager.status()
    }

    pub fn len(&self) -> usize {
        self.lock().pager.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        let inner = self.lock();
        FeedSnapshot {
            query: inner.query.clone(),
            items: inner.pager.items().to_vec(),
            page: inner.pager.current_page(),
            total_pages: inner.pager.total_pages(),
            status: inner.pager.status(),
            error: inner.pager.last_error().map(str::to_string),
        }
    }

    fn lock(&self) -> MutexGuard<'_, FeedInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}
