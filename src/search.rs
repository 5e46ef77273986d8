use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::catalog::{MediaItem, Page};
use crate::pagination::{
    FeedQuery, FeedSnapshot, FeedSource, LoadOutcome, PagedFeed, ScrollPosition, Skip,
};
use crate::route::Route;
use crate::tmdb::{CatalogApi, CatalogResult, SearchScope, TimeWindow};

pub const DEBOUNCE: Duration = Duration::from_millis(300);
pub const MIN_QUERY_CHARS: usize = 2;
pub const MAX_SUGGESTIONS: usize = 8;
pub const TRENDING_LIMIT: usize = 20;

/// A scheduled delayed task. Dropping the handle does not cancel it.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Holds at most one pending timer; scheduling a new one cancels the previous.
/// Must be used from within a tokio runtime.
#[derive(Debug, Default)]
pub struct Debouncer {
    pending: Option<TimerHandle>,
}

impl Debouncer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule<F>(&mut self, delay: Duration, task: F) -> &TimerHandle
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        self.pending.insert(TimerHandle { task })
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.cancel();
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// First results of a multi-search, trimmed for the suggestion dropdown.
pub fn suggestions(page: Page<MediaItem>) -> Vec<MediaItem> {
    page.results.into_iter().take(MAX_SUGGESTIONS).collect()
}

/// Whether a raw input is long enough to query for suggestions.
pub fn is_searchable(text: &str) -> bool {
    text.trim().chars().count() >= MIN_QUERY_CHARS
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SuggestionState {
    pub query: String,
    pub results: Vec<MediaItem>,
    pub searching: bool,
    pub visible: bool,
    pub error: Option<String>,
}

#[derive(Debug, Default)]
struct LiveInner {
    generation: u64,
    view: SuggestionState,
}

/// Search-as-you-type suggestions with a restartable debounce window.
pub struct LiveSearch {
    api: Arc<dyn CatalogApi>,
    inner: Arc<Mutex<LiveInner>>,
    debouncer: Debouncer,
    delay: Duration,
}

impl LiveSearch {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self::with_delay(api, DEBOUNCE)
    }

    pub fn with_delay(api: Arc<dyn CatalogApi>, delay: Duration) -> Self {
        Self {
            api,
            inner: Arc::new(Mutex::new(LiveInner::default())),
            debouncer: Debouncer::new(),
            delay,
        }
    }

    pub fn on_input(&mut self, text: &str) {
        self.debouncer.cancel();
        let generation = {
            let mut inner = lock(&self.inner);
            inner.generation += 1;
            inner.view.query = text.to_string();
            inner.view.searching = false;
            if !is_searchable(text) {
                inner.view.results.clear();
                inner.view.visible = false;
                inner.view.error = None;
                return;
            }
            inner.generation
        };

        let api = self.api.clone();
        let shared = self.inner.clone();
        let query = text.trim().to_string();
        self.debouncer.schedule(self.delay, async move {
            {
                let mut inner = lock(&shared);
                if inner.generation != generation {
                    return;
                }
                inner.view.searching = true;
            }
            let result = api.search(SearchScope::All, &query, 1).await;

            let mut inner = lock(&shared);
            if inner.generation != generation {
                debug!(query = %query, "Dropping suggestions for superseded input");
                return;
            }
            inner.view.searching = false;
            inner.view.visible = true;
            match result {
                Ok(page) => {
                    inner.view.results = suggestions(page);
                    inner.view.error = None;
                }
                Err(e) => {
                    warn!(query = %query, "Suggestion search failed: {}", e);
                    inner.view.results.clear();
                    inner.view.error = Some(e.to_string());
                }
            }
        });
    }

    pub fn state(&self) -> SuggestionState {
        lock(&self.inner).view.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.debouncer.is_pending()
    }

    /// Re-opens the dropdown if there is something to show.
    pub fn focus(&self) {
        let mut inner = lock(&self.inner);
        inner.view.visible = !inner.view.results.is_empty();
    }

    pub fn dismiss(&self) {
        lock(&self.inner).view.visible = false;
    }

    /// Picking a suggestion clears the box.
    pub fn select(&mut self) {
        self.on_input("");
    }

    pub fn view_all_route(&self) -> Option<Route> {
        let query = lock(&self.inner).view.query.trim().to_string();
        if query.is_empty() {
            None
        } else {
            Some(Route::Search { query: Some(query) })
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// The full search view: an explicitly committed query paged per tab.
///
/// Switching tabs restarts the newly active tab from page 1. Other tabs keep
/// whatever they had accumulated until the committed query changes, which
/// drops every tab.
pub struct SearchPage {
    api: Arc<dyn CatalogApi>,
    committed: String,
    tab: SearchScope,
    feeds: HashMap<SearchScope, PagedFeed>,
}

impl SearchPage {
    pub fn new(api: Arc<dyn CatalogApi>) -> Self {
        Self {
            api,
            committed: String::new(),
            tab: SearchScope::All,
            feeds: HashMap::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.committed
    }

    pub fn tab(&self) -> SearchScope {
        self.tab
    }

    /// Commits a query and loads its first page. An empty query clears the view.
    pub async fn submit(&mut self, query: &str) -> Option<LoadOutcome> {
        let query = query.trim();
        if query != self.committed {
            self.feeds.clear();
            self.committed = query.to_string();
        }
        if self.committed.is_empty() {
            return None;
        }
        let feed = self.activate();
        feed.reset();
        Some(feed.load_more().await)
    }

    pub async fn select_tab(&mut self, tab: SearchScope) -> Option<LoadOutcome> {
        self.tab = tab;
        if self.committed.is_empty() {
            return None;
        }
        let feed = self.activate();
        feed.reset();
        Some(feed.load_more().await)
    }

    pub async fn load_more(&self) -> LoadOutcome {
        match self.feeds.get(&self.tab) {
            Some(feed) => feed.load_more().await,
            None => LoadOutcome::Skipped {
                reason: Skip::Exhausted,
            },
        }
    }

    pub async fn on_scroll(&self, position: ScrollPosition) -> LoadOutcome {
        match self.feeds.get(&self.tab) {
            Some(feed) => feed.on_scroll(position).await,
            None => LoadOutcome::Skipped {
                reason: Skip::Exhausted,
            },
        }
    }

    pub fn results(&self) -> Option<FeedSnapshot> {
        self.feeds.get(&self.tab).map(PagedFeed::snapshot)
    }

    /// Tabs currently holding results in memory.
    pub fn cached_tabs(&self) -> Vec<SearchScope> {
        let mut tabs: Vec<SearchScope> = self
            .feeds
            .iter()
            .filter(|(_, feed)| !feed.is_empty())
            .map(|(scope, _)| *scope)
            .collect();
        tabs.sort_by_key(|s| s.as_str());
        tabs
    }

    /// Titles shown before any query is committed.
    pub async fn trending(&self) -> CatalogResult<Vec<MediaItem>> {
        let page = self
            .api
            .trending(SearchScope::All, TimeWindow::Week, 1)
            .await?;
        Ok(page.results.into_iter().take(TRENDING_LIMIT).collect())
    }

    fn activate(&mut self) -> &PagedFeed {
        let query = FeedQuery::new(FeedSource::Search {
            scope: self.tab,
            query: self.committed.clone(),
        });
        let api = self.api.clone();
        let feed = self
            .feeds
            .entry(self.tab)
            .or_insert_with(|| PagedFeed::new(api, query.clone()));
        feed.set_query(query);
        feed
    }
}
