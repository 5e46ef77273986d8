use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::catalog::{
    CastMember, ExternalIds, Genre, MediaDetails, MediaItem, MediaKind, Page, SeasonDetail,
    SeasonSummary, Video,
};
use crate::config::Config;

pub const TMDB_BASE: &str = "https://api.themoviedb.org/3";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{resource} not found")]
    NotFound { resource: String },

    #[error("catalog provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("could not decode {resource}: {source}")]
    Decode {
        resource: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CatalogError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, CatalogError::NotFound { .. })
    }
}

pub type CatalogResult<T> = std::result::Result<T, CatalogError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovieList {
    Popular,
    TopRated,
    Upcoming,
    NowPlaying,
}

impl MovieList {
    fn resource(&self) -> &'static str {
        match self {
            MovieList::Popular => "movie/popular",
            MovieList::TopRated => "movie/top_rated",
            MovieList::Upcoming => "movie/upcoming",
            MovieList::NowPlaying => "movie/now_playing",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShowList {
    Popular,
    TopRated,
    AiringToday,
    OnTheAir,
}

impl ShowList {
    fn resource(&self) -> &'static str {
        match self {
            ShowList::Popular => "tv/popular",
            ShowList::TopRated => "tv/top_rated",
            ShowList::AiringToday => "tv/airing_today",
            ShowList::OnTheAir => "tv/on_the_air",
        }
    }
}

/// Which kinds a search or trending query covers. Doubles as the search page tab.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchScope {
    #[default]
    All,
    Movie,
    Tv,
}

impl SearchScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchScope::All => "all",
            SearchScope::Movie => "movie",
            SearchScope::Tv => "tv",
        }
    }

    fn search_resource(&self) -> &'static str {
        match self {
            SearchScope::All => "search/multi",
            SearchScope::Movie => "search/movie",
            SearchScope::Tv => "search/tv",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoverSort {
    #[default]
    Popularity,
    Rating,
    Newest,
}

impl DiscoverSort {
    fn sort_key(&self, kind: MediaKind) -> &'static str {
        match (self, kind) {
            (DiscoverSort::Popularity, _) => "popularity.desc",
            (DiscoverSort::Rating, _) => "vote_average.desc",
            (DiscoverSort::Newest, MediaKind::Movie) => "primary_release_date.desc",
            (DiscoverSort::Newest, MediaKind::Tv) => "first_air_date.desc",
        }
    }
}

/// Extra query parameters appended after `api_key` and `page`. Entries with an
/// empty value are dropped when the URL is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams(Vec<(String, String)>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.push((key.into(), value.into()));
    }

    pub fn extend(&mut self, other: &QueryParams) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn movie_list(
        &self,
        list: MovieList,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>>;
    async fn show_list(
        &self,
        list: ShowList,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>>;
    async fn details(
        &self,
        kind: MediaKind,
        id: u64,
        params: &QueryParams,
    ) -> CatalogResult<MediaItem>;
    async fn credits(&self, kind: MediaKind, id: u64) -> CatalogResult<Vec<CastMember>>;
    async fn videos(&self, kind: MediaKind, id: u64) -> CatalogResult<Vec<Video>>;
    async fn similar(&self, kind: MediaKind, id: u64, page: u32)
        -> CatalogResult<Page<MediaItem>>;
    async fn external_ids(&self, kind: MediaKind, id: u64) -> CatalogResult<ExternalIds>;
    async fn season(&self, show_id: u64, season_number: u32) -> CatalogResult<SeasonDetail>;
    async fn discover(
        &self,
        kind: MediaKind,
        genre_id: u64,
        sort: DiscoverSort,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>>;
    async fn genres(&self, kind: MediaKind) -> CatalogResult<Vec<Genre>>;
    async fn search(
        &self,
        scope: SearchScope,
        query: &str,
        page: u32,
    ) -> CatalogResult<Page<MediaItem>>;
    async fn trending(
        &self,
        scope: SearchScope,
        window: TimeWindow,
        page: u32,
    ) -> CatalogResult<Page<MediaItem>>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> anyhow::Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            anyhow::bail!("TMDB API key cannot be empty");
        }
        let user_agent = format!("cinestream/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()
            .context("Failed to build TMDB HTTP client")?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        Self::new(config.tmdb_api_key.clone(), config.tmdb_base_url.clone())
    }

    fn url(&self, resource: &str, page: Option<u32>, params: &QueryParams) -> String {
        build_url(&self.base_url, resource, &self.api_key, page, params)
    }

    async fn get_json<T: DeserializeOwned>(&self, resource: &str, url: &str) -> CatalogResult<T> {
        debug!(resource, "Catalog request");
        let res = self.client.get(url).send().await?;
        let status = res.status();
        let text = res.text().await?;
        if status == StatusCode::NOT_FOUND {
            warn!(resource, "Catalog provider returned 404");
            return Err(CatalogError::NotFound {
                resource: resource.to_string(),
            });
        }
        if !status.is_success() {
            warn!(resource, status = status.as_u16(), "Catalog provider error");
            return Err(CatalogError::Status {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(|source| CatalogError::Decode {
            resource: resource.to_string(),
            source,
        })
    }

    async fn movie_page(
        &self,
        resource: &str,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>> {
        let url = self.url(resource, Some(page), params);
        let raw: Page<RawMovie> = self.get_json(resource, &url).await?;
        Ok(raw.map(movie_item))
    }

    async fn show_page(
        &self,
        resource: &str,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>> {
        let url = self.url(resource, Some(page), params);
        let raw: Page<RawShow> = self.get_json(resource, &url).await?;
        Ok(raw.map(show_item))
    }

    async fn mixed_page(
        &self,
        resource: &str,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>> {
        let url = self.url(resource, Some(page), params);
        let raw: Page<RawMulti> = self.get_json(resource, &url).await?;
        Ok(mixed_items(raw))
    }

    async fn kind_page(
        &self,
        kind: MediaKind,
        resource: &str,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>> {
        match kind {
            MediaKind::Movie => self.movie_page(resource, page, params).await,
            MediaKind::Tv => self.show_page(resource, page, params).await,
        }
    }
}

#[async_trait]
impl CatalogApi for TmdbClient {
    async fn movie_list(
        &self,
        list: MovieList,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>> {
        self.movie_page(list.resource(), page, params).await
    }

    async fn show_list(
        &self,
        list: ShowList,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>> {
        self.show_page(list.resource(), page, params).await
    }

    async fn details(
        &self,
        kind: MediaKind,
        id: u64,
        params: &QueryParams,
    ) -> CatalogResult<MediaItem> {
        let resource = format!("{kind}/{id}");
        let url = self.url(&resource, None, params);
        match kind {
            MediaKind::Movie => {
                let raw: RawMovie = self.get_json(&resource, &url).await?;
                Ok(movie_item(raw))
            }
            MediaKind::Tv => {
                let raw: RawShow = self.get_json(&resource, &url).await?;
                Ok(show_item(raw))
            }
        }
    }

    async fn credits(&self, kind: MediaKind, id: u64) -> CatalogResult<Vec<CastMember>> {
        #[derive(Deserialize)]
        struct Credits {
            #[serde(default)]
            cast: Vec<CastMember>,
        }

        let resource = format!("{kind}/{id}/credits");
        let url = self.url(&resource, None, &QueryParams::new());
        let mut credits: Credits = self.get_json(&resource, &url).await?;
        credits.cast.sort_by_key(|c| c.order);
        Ok(credits.cast)
    }

    async fn videos(&self, kind: MediaKind, id: u64) -> CatalogResult<Vec<Video>> {
        #[derive(Deserialize)]
        struct Videos {
            #[serde(default)]
            results: Vec<Video>,
        }

        let resource = format!("{kind}/{id}/videos");
        let url = self.url(&resource, None, &QueryParams::new());
        let videos: Videos = self.get_json(&resource, &url).await?;
        Ok(videos.results)
    }

    async fn similar(
        &self,
        kind: MediaKind,
        id: u64,
        page: u32,
    ) -> CatalogResult<Page<MediaItem>> {
        let resource = format!("{kind}/{id}/similar");
        self.kind_page(kind, &resource, page, &QueryParams::new())
            .await
    }

    async fn external_ids(&self, kind: MediaKind, id: u64) -> CatalogResult<ExternalIds> {
        let resource = format!("{kind}/{id}/external_ids");
        let url = self.url(&resource, None, &QueryParams::new());
        let mut ids: ExternalIds = self.get_json(&resource, &url).await?;
        ids.imdb_id = ids.imdb_id.filter(|id| !id.trim().is_empty());
        Ok(ids)
    }

    async fn season(&self, show_id: u64, season_number: u32) -> CatalogResult<SeasonDetail> {
        let resource = format!("tv/{show_id}/season/{season_number}");
        let url = self.url(&resource, None, &QueryParams::new());
        self.get_json(&resource, &url).await
    }

    async fn discover(
        &self,
        kind: MediaKind,
        genre_id: u64,
        sort: DiscoverSort,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>> {
        let resource = format!("discover/{kind}");
        let mut all = QueryParams::new()
            .with("with_genres", genre_id.to_string())
            .with("sort_by", sort.sort_key(kind));
        all.extend(params);
        self.kind_page(kind, &resource, page, &all).await
    }

    async fn genres(&self, kind: MediaKind) -> CatalogResult<Vec<Genre>> {
        #[derive(Deserialize)]
        struct GenreList {
            #[serde(default)]
            genres: Vec<Genre>,
        }

        let resource = format!("genre/{kind}/list");
        let url = self.url(&resource, None, &QueryParams::new());
        let list: GenreList = self.get_json(&resource, &url).await?;
        Ok(list.genres)
    }

    async fn search(
        &self,
        scope: SearchScope,
        query: &str,
        page: u32,
    ) -> CatalogResult<Page<MediaItem>> {
        let params = QueryParams::new().with("query", query);
        let resource = scope.search_resource();
        match scope {
            SearchScope::All => self.mixed_page(resource, page, &params).await,
            SearchScope::Movie => self.movie_page(resource, page, &params).await,
            SearchScope::Tv => self.show_page(resource, page, &params).await,
        }
    }

    async fn trending(
        &self,
        scope: SearchScope,
        window: TimeWindow,
        page: u32,
    ) -> CatalogResult<Page<MediaItem>> {
        let resource = format!("trending/{}/{}", scope.as_str(), window.as_str());
        let params = QueryParams::new();
        match scope {
            SearchScope::All => self.mixed_page(&resource, page, &params).await,
            SearchScope::Movie => self.movie_page(&resource, page, &params).await,
            SearchScope::Tv => self.show_page(&resource, page, &params).await,
        }
    }
}

pub(crate) fn build_url(
    base: &str,
    resource: &str,
    api_key: &str,
    page: Option<u32>,
    params: &QueryParams,
) -> String {
    let mut url = format!("{base}/{resource}?api_key={}", urlencoding::encode(api_key));
    if let Some(page) = page {
        url.push_str(&format!("&page={page}"));
    }
    for (key, value) in params.iter() {
        if value.is_empty() {
            continue;
        }
        url.push_str(&format!("&{key}={}", urlencoding::encode(value)));
    }
    url
}

#[derive(Debug, Deserialize)]
struct RawMovie {
    id: u64,
    #[serde(default)]
    title: String,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    vote_average: Option<f64>,
    #[serde(default)]
    genre_ids: Vec<u64>,
    #[serde(default)]
    genres: Vec<Genre>,
    runtime: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawShow {
    id: u64,
    #[serde(default)]
    name: String,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    first_air_date: Option<String>,
    vote_average: Option<f64>,
    #[serde(default)]
    genre_ids: Vec<u64>,
    #[serde(default)]
    genres: Vec<Genre>,
    #[serde(default)]
    seasons: Vec<SeasonSummary>,
    number_of_seasons: Option<u32>,
    number_of_episodes: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "media_type", rename_all = "lowercase")]
enum RawMulti {
    Movie(RawMovie),
    Tv(RawShow),
    #[serde(other)]
    Other,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn genre_ids(ids: Vec<u64>, genres: &[Genre]) -> Vec<u64> {
    if ids.is_empty() {
        genres.iter().map(|g| g.id).collect()
    } else {
        ids
    }
}

fn movie_item(raw: RawMovie) -> MediaItem {
    MediaItem {
        id: raw.id,
        title: raw.title,
        overview: raw.overview.unwrap_or_default(),
        poster_path: non_empty(raw.poster_path),
        backdrop_path: non_empty(raw.backdrop_path),
        date: non_empty(raw.release_date),
        vote_average: raw.vote_average.unwrap_or_default(),
        genre_ids: genre_ids(raw.genre_ids, &raw.genres),
        genres: raw.genres,
        details: MediaDetails::Movie {
            runtime: raw.runtime.filter(|r| *r > 0),
        },
    }
}

fn show_item(raw: RawShow) -> MediaItem {
    MediaItem {
        id: raw.id,
        title: raw.name,
        overview: raw.overview.unwrap_or_default(),
        poster_path: non_empty(raw.poster_path),
        backdrop_path: non_empty(raw.backdrop_path),
        date: non_empty(raw.first_air_date),
        vote_average: raw.vote_average.unwrap_or_default(),
        genre_ids: genre_ids(raw.genre_ids, &raw.genres),
        genres: raw.genres,
        details: MediaDetails::Tv {
            seasons: raw.seasons,
            number_of_seasons: raw.number_of_seasons,
            number_of_episodes: raw.number_of_episodes,
        },
    }
}

/// Multi-kind pages also carry people; only movies and shows are kept.
fn mixed_items(raw: Page<RawMulti>) -> Page<MediaItem> {
    let results = raw
        .results
        .into_iter()
        .filter_map(|r| match r {
            RawMulti::Movie(m) => Some(movie_item(m)),
            RawMulti::Tv(s) => Some(show_item(s)),
            RawMulti::Other => None,
        })
        .collect();
    Page {
        page: raw.page,
        results,
        total_pages: raw.total_pages,
        total_results: raw.total_results,
    }
}
