use crate::catalog::{MediaItem, MediaKind};
use crate::config::Config;
use crate::pagination::{FeedQuery, FeedSource};
use crate::preferences::{Preferences, Theme};
use crate::route::Route;
use crate::storage::{FileStore, KeyValueStore};
use crate::tmdb::{
    CatalogApi, DiscoverSort, MovieList, QueryParams, SearchScope, ShowList, TmdbClient,
};
use crate::views::{self, ViewState, WatchRequest};
use crate::watchlist::WatchlistStore;
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogApi>,
    pub watchlist: Arc<WatchlistStore>,
    pub preferences: Arc<Preferences>,
}

impl AppState {
    pub fn new(catalog: Arc<dyn CatalogApi>, store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            catalog,
            watchlist: Arc::new(WatchlistStore::new(store.clone())),
            preferences: Arc::new(Preferences::new(store)),
        }
    }
}

pub async fn run_server(config: Config) -> Result<()> {
    let catalog: Arc<dyn CatalogApi> = Arc::new(TmdbClient::from_config(&config)?);
    info!("Using catalog provider at {}", config.tmdb_base_url);
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::open(&config.data_dir)?);
    info!("Persisting local state under {}", config.data_dir.display());

    let app = build_router(AppState::new(catalog, store));

    info!("Listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/route", get(resolve_route))
        .route("/api/home", get(home))
        .route("/api/movie/:id", get(movie_detail))
        .route("/api/tv/:id", get(show_detail))
        .route("/api/watch/:kind/:id", get(watch))
        .route("/api/movies", get(movies))
        .route("/api/tv", get(shows))
        .route("/api/search", get(search))
        .route("/api/suggest", get(suggest))
        .route("/api/genres", get(genres))
        .route("/api/genre/:id", get(genre))
        .route(
            "/api/watchlist",
            get(list_watchlist)
                .post(add_to_watchlist)
                .delete(clear_watchlist),
        )
        .route(
            "/api/watchlist/:kind/:id",
            axum::routing::delete(remove_from_watchlist),
        )
        .route(
            "/api/preferences",
            get(get_preferences).put(update_preferences),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

impl<T: Serialize> IntoResponse for ViewState<T> {
    fn into_response(self) -> Response {
        let status = match &self {
            ViewState::Ready(_) => StatusCode::OK,
            ViewState::NotFound { .. } => StatusCode::NOT_FOUND,
            ViewState::Error { .. } => StatusCode::BAD_GATEWAY,
        };
        (status, Json(self)).into_response()
    }
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

#[derive(Debug, Deserialize)]
struct RouteQuery {
    #[serde(default)]
    path: String,
}

async fn resolve_route(Query(q): Query<RouteQuery>) -> Json<Route> {
    Json(Route::parse(&q.path))
}

async fn home(State(state): State<AppState>) -> Response {
    let params = state.preferences.language().discover_params();
    views::home(state.catalog.as_ref(), &params)
        .await
        .into_response()
}

async fn movie_detail(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    detail(&state, MediaKind::Movie, id).await
}

async fn show_detail(State(state): State<AppState>, Path(id): Path<u64>) -> Response {
    detail(&state, MediaKind::Tv, id).await
}

async fn detail(state: &AppState, kind: MediaKind, id: u64) -> Response {
    let params = QueryParams::new();
    views::detail(state.catalog.as_ref(), kind, id, &params)
        .await
        .map(|mut view| {
            view.in_watchlist = state.watchlist.contains(id, kind);
            view
        })
        .into_response()
}

#[derive(Debug, Default, Deserialize)]
struct WatchQuery {
    server: Option<usize>,
    season: Option<u32>,
    episode: Option<u32>,
}

async fn watch(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, u64)>,
    Query(q): Query<WatchQuery>,
) -> Response {
    let Ok(kind) = kind.parse::<MediaKind>() else {
        return ViewState::<()>::not_found(format!("Unknown media kind '{kind}'")).into_response();
    };
    let request = WatchRequest {
        provider: q.server,
        season: q.season,
        episode: q.episode,
    };
    views::watch(state.catalog.as_ref(), kind, id, &request)
        .await
        .into_response()
}

#[derive(Debug, Deserialize)]
struct ListQuery<L> {
    list: Option<L>,
    page: Option<u32>,
}

async fn movies(State(state): State<AppState>, Query(q): Query<ListQuery<MovieList>>) -> Response {
    let source = FeedSource::Movies {
        list: q.list.unwrap_or(MovieList::Popular),
    };
    listing(&state, source, q.page).await
}

async fn shows(State(state): State<AppState>, Query(q): Query<ListQuery<ShowList>>) -> Response {
    let source = FeedSource::Shows {
        list: q.list.unwrap_or(ShowList::Popular),
    };
    listing(&state, source, q.page).await
}

async fn listing(state: &AppState, source: FeedSource, page: Option<u32>) -> Response {
    let params = state.preferences.language().discover_params();
    let query = FeedQuery::new(source).with_params(params);
    views::listing(state.catalog.as_ref(), &query, page.unwrap_or(1))
        .await
        .into_response()
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    q: String,
    #[serde(default)]
    tab: SearchScope,
    page: Option<u32>,
}

async fn search(State(state): State<AppState>, Query(q): Query<SearchQuery>) -> Response {
    views::search_results(state.catalog.as_ref(), &q.q, q.tab, q.page.unwrap_or(1))
        .await
        .into_response()
}

#[derive(Debug, Deserialize)]
struct SuggestQuery {
    #[serde(default)]
    q: String,
}

async fn suggest(State(state): State<AppState>, Query(q): Query<SuggestQuery>) -> Response {
    views::suggest(state.catalog.as_ref(), &q.q)
        .await
        .into_response()
}

async fn genres(State(state): State<AppState>) -> Response {
    views::genre_index(state.catalog.as_ref())
        .await
        .into_response()
}

#[derive(Debug, Deserialize)]
struct GenreQuery {
    kind: Option<MediaKind>,
    #[serde(default)]
    sort: DiscoverSort,
    page: Option<u32>,
}

async fn genre(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Query(q): Query<GenreQuery>,
) -> Response {
    let params = state.preferences.language().discover_params();
    views::genre_page(
        state.catalog.as_ref(),
        id,
        q.kind,
        q.sort,
        q.page.unwrap_or(1),
        &params,
    )
    .await
    .into_response()
}

async fn list_watchlist(State(state): State<AppState>) -> Response {
    Json(state.watchlist.list()).into_response()
}

async fn add_to_watchlist(State(state): State<AppState>, Json(item): Json<MediaItem>) -> Response {
    match state.watchlist.add(&item) {
        Ok(added) => {
            if added {
                info!(id = item.id, kind = %item.kind(), "Added '{}' to watchlist", item.title);
            }
            let status = if added {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            let body = json!({ "added": added, "count": state.watchlist.len() });
            (status, Json(body)).into_response()
        }
        Err(e) => {
            error!("Failed to save watchlist: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save watchlist")
        }
    }
}

async fn remove_from_watchlist(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, u64)>,
) -> Response {
    let Ok(kind) = kind.parse::<MediaKind>() else {
        return error_response(StatusCode::BAD_REQUEST, format!("Unknown media kind '{kind}'"));
    };
    match state.watchlist.remove(id, kind) {
        Ok(removed) => Json(json!({ "removed": removed, "count": state.watchlist.len() }))
            .into_response(),
        Err(e) => {
            error!("Failed to save watchlist: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save watchlist")
        }
    }
}

async fn clear_watchlist(State(state): State<AppState>) -> Response {
    match state.watchlist.clear() {
        Ok(()) => {
            info!("Watchlist cleared");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => {
            error!("Failed to clear watchlist: {:#}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to clear watchlist")
        }
    }
}

async fn get_preferences(State(state): State<AppState>) -> Response {
    Json(state.preferences.snapshot()).into_response()
}

#[derive(Debug, Deserialize)]
struct PreferenceUpdate {
    language: Option<String>,
    theme: Option<Theme>,
}

async fn update_preferences(
    State(state): State<AppState>,
    Json(update): Json<PreferenceUpdate>,
) -> Response {
    if let Some(code) = update.language.as_deref() {
        if let Err(e) = state.preferences.set_language(code) {
            warn!("Rejected language update: {:#}", e);
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    }
    if let Some(theme) = update.theme {
        if let Err(e) = state.preferences.set_theme(theme) {
            error!("Failed to save theme: {:#}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Failed to save theme");
        }
    }
    Json(state.preferences.snapshot()).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
