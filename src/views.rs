use serde::Serialize;
use tracing::warn;

use crate::catalog::{
    trailers, CastMember, Genre, MediaItem, MediaKind, Page, SeasonDetail, Video,
};
use crate::pagination::FeedQuery;
use crate::playback::{EmbedFrame, EpisodeRef, MediaIds, PlaybackSession, ProviderKind};
use crate::search::{is_searchable, suggestions, TRENDING_LIMIT};
use crate::tmdb::{
    CatalogApi, CatalogError, CatalogResult, DiscoverSort, MovieList, QueryParams, SearchScope,
    ShowList, TimeWindow,
};

pub const HOME_ROW_LEN: usize = 20;
pub const CAST_LIMIT: usize = 12;
pub const SIMILAR_LIMIT: usize = 10;

/// What a screen shows once its data has settled. Failures never escape a view
/// as errors; they become one of the non-ready states.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "data", rename_all = "snake_case")]
pub enum ViewState<T> {
    Ready(T),
    NotFound { message: String },
    Error { message: String, retryable: bool },
}

impl<T> ViewState<T> {
    pub fn from_result(result: CatalogResult<T>) -> Self {
        match result {
            Ok(value) => ViewState::Ready(value),
            Err(e) => e.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        ViewState::NotFound {
            message: message.into(),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ViewState<U> {
        match self {
            ViewState::Ready(value) => ViewState::Ready(f(value)),
            ViewState::NotFound { message } => ViewState::NotFound { message },
            ViewState::Error { message, retryable } => ViewState::Error { message, retryable },
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ViewState::Ready(_))
    }

    pub fn ready(self) -> Option<T> {
        match self {
            ViewState::Ready(value) => Some(value),
            _ => None,
        }
    }
}

impl<T> From<CatalogError> for ViewState<T> {
    fn from(e: CatalogError) -> Self {
        match e {
            CatalogError::NotFound { resource } => ViewState::NotFound {
                message: format!("{resource} was not found"),
            },
            CatalogError::Status { status, .. } => ViewState::Error {
                message: format!("Failed to load content (provider returned {status})"),
                retryable: status == 429 || status >= 500,
            },
            CatalogError::Transport(e) => ViewState::Error {
                message: format!("Failed to load content: {e}"),
                retryable: true,
            },
            CatalogError::Decode { resource, .. } => ViewState::Error {
                message: format!("Failed to read {resource}"),
                retryable: false,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeView {
    pub trending: Vec<MediaItem>,
    pub popular: Vec<MediaItem>,
    pub top_rated: Vec<MediaItem>,
    pub upcoming: Vec<MediaItem>,
    pub popular_shows: Vec<MediaItem>,
}

pub async fn home(api: &dyn CatalogApi, params: &QueryParams) -> ViewState<HomeView> {
    let result = tokio::try_join!(
        api.trending(SearchScope::All, TimeWindow::Week, 1),
        api.movie_list(MovieList::Popular, 1, params),
        api.movie_list(MovieList::TopRated, 1, params),
        api.movie_list(MovieList::Upcoming, 1, params),
        api.show_list(ShowList::Popular, 1, params),
    );
    ViewState::from_result(result.map(
        |(trending, popular, top_rated, upcoming, popular_shows)| HomeView {
            trending: row(trending),
            popular: row(popular),
            top_rated: row(top_rated),
            upcoming: row(upcoming),
            popular_shows: row(popular_shows),
        },
    ))
}

fn row(page: Page<MediaItem>) -> Vec<MediaItem> {
    page.results.into_iter().take(HOME_ROW_LEN).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailView {
    pub item: MediaItem,
    pub cast: Vec<CastMember>,
    pub trailers: Vec<Video>,
    pub trailer_url: Option<String>,
    pub similar: Vec<MediaItem>,
    pub in_watchlist: bool,
}

/// Title page. Only the record itself is required; cast, trailers and similar
/// titles degrade to empty lists when their requests fail.
pub async fn detail(
    api: &dyn CatalogApi,
    kind: MediaKind,
    id: u64,
    params: &QueryParams,
) -> ViewState<DetailView> {
    let item = match api.details(kind, id, params).await {
        Ok(item) => item,
        Err(e) => return e.into(),
    };

    let (cast, videos, similar) = tokio::join!(
        api.credits(kind, id),
        api.videos(kind, id),
        api.similar(kind, id, 1),
    );
    let mut cast = or_empty(cast, "credits", id);
    cast.truncate(CAST_LIMIT);
    let trailers = trailers(&or_empty(videos, "videos", id));
    let trailer_url = trailers.iter().find_map(Video::embed_url);
    let similar = match similar {
        Ok(page) => page
            .results
            .into_iter()
            .filter(|s| s.id != id)
            .take(SIMILAR_LIMIT)
            .collect(),
        Err(e) => {
            warn!(id, "Similar titles unavailable: {}", e);
            Vec::new()
        }
    };

    ViewState::Ready(DetailView {
        item,
        cast,
        trailers,
        trailer_url,
        similar,
        in_watchlist: false,
    })
}

fn or_empty<T>(result: CatalogResult<Vec<T>>, what: &str, id: u64) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(id, "{} unavailable: {}", what, e);
        Vec::new()
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchRequest {
    pub provider: Option<usize>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderOption {
    pub index: usize,
    pub name: &'static str,
    pub kind: ProviderKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WatchView {
    pub item: MediaItem,
    pub imdb_id: Option<String>,
    pub providers: Vec<ProviderOption>,
    pub selected: usize,
    pub episode: Option<EpisodeRef>,
    pub season: Option<SeasonDetail>,
    pub frame: Option<EmbedFrame>,
    /// Why no frame could be built for the requested provider, if it couldn't.
    pub frame_error: Option<String>,
}

pub async fn watch(
    api: &dyn CatalogApi,
    kind: MediaKind,
    id: u64,
    request: &WatchRequest,
) -> ViewState<WatchView> {
    let item = match api.details(kind, id, &QueryParams::new()).await {
        Ok(item) => item,
        Err(e) => return e.into(),
    };
    let imdb_id = match api.external_ids(kind, id).await {
        Ok(ids) => ids.imdb_id,
        Err(e) => {
            warn!(id, "External ids unavailable, IMDb-keyed sources hidden: {}", e);
            None
        }
    };

    let mut session = PlaybackSession::new(MediaIds::new(id, imdb_id.clone()), kind);
    let mut frame_error = None;
    if let Some(index) = request.provider {
        if let Err(e) = session.select_provider(index) {
            frame_error = Some(e.to_string());
        }
    }
    let season = match kind {
        MediaKind::Movie => None,
        MediaKind::Tv => {
            let current = session.episode().unwrap_or_default();
            session.select_episode(
                request.season.unwrap_or(current.season),
                request.episode.unwrap_or(current.episode),
            );
            let number = session.episode().unwrap_or_default().season;
            match api.season(id, number).await {
                Ok(detail) => Some(detail),
                Err(e) => {
                    warn!(id, season = number, "Season listing unavailable: {}", e);
                    None
                }
            }
        }
    };

    let frame = if frame_error.is_none() {
        match session.frame() {
            Ok(frame) => Some(frame),
            Err(e) => {
                frame_error = Some(e.to_string());
                None
            }
        }
    } else {
        None
    };

    let providers = session
        .available_providers()
        .into_iter()
        .map(|(index, p)| ProviderOption {
            index,
            name: p.name,
            kind: p.kind,
        })
        .collect();

    ViewState::Ready(WatchView {
        item,
        imdb_id,
        providers,
        selected: session.provider_index(),
        episode: session.episode(),
        season,
        frame,
        frame_error,
    })
}

/// One page of a category or other feed.
pub async fn listing(
    api: &dyn CatalogApi,
    query: &FeedQuery,
    page: u32,
) -> ViewState<Page<MediaItem>> {
    ViewState::from_result(query.fetch(api, page.max(1)).await)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenreIndex {
    pub movie: Vec<Genre>,
    pub tv: Vec<Genre>,
}

pub async fn genre_index(api: &dyn CatalogApi) -> ViewState<GenreIndex> {
    let result = tokio::try_join!(api.genres(MediaKind::Movie), api.genres(MediaKind::Tv));
    ViewState::from_result(result.map(|(movie, tv)| GenreIndex { movie, tv }))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenrePageView {
    pub genre: Genre,
    pub kind: MediaKind,
    pub sort: DiscoverSort,
    pub results: Page<MediaItem>,
}

pub async fn genre_page(
    api: &dyn CatalogApi,
    genre_id: u64,
    kind: Option<MediaKind>,
    sort: DiscoverSort,
    page: u32,
    params: &QueryParams,
) -> ViewState<GenrePageView> {
    let kind = kind.unwrap_or(MediaKind::Movie);
    let genres = match api.genres(kind).await {
        Ok(genres) => genres,
        Err(e) => return e.into(),
    };
    let Some(genre) = genres.into_iter().find(|g| g.id == genre_id) else {
        return ViewState::not_found(format!("Genre {genre_id} does not exist for {kind}"));
    };
    match api.discover(kind, genre_id, sort, page.max(1), params).await {
        Ok(results) => ViewState::Ready(GenrePageView {
            genre,
            kind,
            sort,
            results,
        }),
        Err(e) => e.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchView {
    pub query: Option<String>,
    pub scope: SearchScope,
    pub results: Option<Page<MediaItem>>,
    /// Shown in place of results while no query is committed.
    pub trending: Vec<MediaItem>,
}

pub async fn search_results(
    api: &dyn CatalogApi,
    query: &str,
    scope: SearchScope,
    page: u32,
) -> ViewState<SearchView> {
    let query = query.trim();
    if query.is_empty() {
        return ViewState::from_result(
            api.trending(SearchScope::All, TimeWindow::Week, 1)
                .await
                .map(|page| SearchView {
                    query: None,
                    scope,
                    results: None,
                    trending: page.results.into_iter().take(TRENDING_LIMIT).collect(),
                }),
        );
    }
    ViewState::from_result(api.search(scope, query, page.max(1)).await.map(|results| {
        SearchView {
            query: Some(query.to_string()),
            scope,
            results: Some(results),
            trending: Vec::new(),
        }
    }))
}

/// Dropdown suggestions for a partial query. Short input answers empty without
/// touching the provider.
pub async fn suggest(api: &dyn CatalogApi, text: &str) -> ViewState<Vec<MediaItem>> {
    if !is_searchable(text) {
        return ViewState::Ready(Vec::new());
    }
    ViewState::from_result(
        api.search(SearchScope::All, text.trim(), 1)
            .await
            .map(suggestions),
    )
}
