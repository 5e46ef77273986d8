#![allow(dead_code)]

use cinestream::catalog::{
    CastMember, Episode, ExternalIds, Genre, MediaItem, MediaKind, Page, SeasonDetail, Video,
};
use cinestream::tmdb::{
    CatalogApi, CatalogError, CatalogResult, DiscoverSort, MovieList, QueryParams, SearchScope,
    ShowList, TimeWindow,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub const BROKEN_ID: u64 = 999;

pub fn movie(id: u64, title: &str) -> MediaItem {
    serde_json::from_value(json!({
        "media_type": "movie",
        "id": id,
        "title": title,
        "overview": "",
        "date": "2020-01-01",
        "vote_average": 7.1,
        "genre_ids": [28],
        "runtime": 120
    }))
    .expect("movie fixture")
}

pub fn show(id: u64, title: &str) -> MediaItem {
    serde_json::from_value(json!({
        "media_type": "tv",
        "id": id,
        "title": title,
        "date": "2011-04-17",
        "vote_average": 8.4,
        "seasons": [{ "season_number": 1, "episode_count": 10 }],
        "number_of_seasons": 1
    }))
    .expect("show fixture")
}

/// In-memory catalog. Every list page holds 20 titles whose ids encode the page.
pub struct FakeCatalog {
    pub records: HashMap<(MediaKind, u64), MediaItem>,
    pub total_pages: u32,
    /// Cooperative yields before each list response, so concurrent callers interleave.
    pub yields: usize,
    pub calls: Mutex<Vec<String>>,
    failures: AtomicUsize,
}

impl FakeCatalog {
    pub fn new() -> Self {
        let mut records = HashMap::new();
        for item in [
            movie(10, "Ten"),
            movie(550, "Fight Club"),
            show(10, "Ten: The Series"),
            show(1399, "Thrones"),
        ] {
            records.insert((item.kind(), item.id), item);
        }
        Self {
            records,
            total_pages: 500,
            yields: 0,
            calls: Mutex::new(Vec::new()),
            failures: AtomicUsize::new(0),
        }
    }

    pub fn with_yields(mut self, yields: usize) -> Self {
        self.yields = yields;
        self
    }

    pub fn with_total_pages(mut self, total: u32) -> Self {
        self.total_pages = total;
        self
    }

    /// The next `n` list requests fail with a provider error.
    pub fn fail_next(&self, n: usize) {
        self.failures.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn list_page(&self, base: u64, kind: MediaKind, page: u32) -> CatalogResult<Page<MediaItem>> {
        for _ in 0..self.yields {
            tokio::task::yield_now().await;
        }
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(CatalogError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        let results = (0..20)
            .map(|i| {
                let id = base + u64::from(page) * 100 + i;
                match kind {
                    MediaKind::Movie => movie(id, &format!("Movie {id}")),
                    MediaKind::Tv => show(id, &format!("Show {id}")),
                }
            })
            .collect();
        Ok(Page {
            page,
            results,
            total_pages: self.total_pages,
            total_results: self.total_pages * 20,
        })
    }

    fn lookup(&self, kind: MediaKind, id: u64) -> CatalogResult<MediaItem> {
        if id == BROKEN_ID {
            return Err(CatalogError::Status {
                status: 500,
                body: "boom".into(),
            });
        }
        self.records
            .get(&(kind, id))
            .cloned()
            .ok_or_else(|| CatalogError::NotFound {
                resource: format!("{kind}/{id}"),
            })
    }
}

fn describe(params: &QueryParams) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

#[async_trait::async_trait]
impl CatalogApi for FakeCatalog {
    async fn movie_list(
        &self,
        list: MovieList,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>> {
        self.record(format!("movie_list {list:?} {page} {}", describe(params)));
        self.list_page(0, MediaKind::Movie, page).await
    }

    async fn show_list(
        &self,
        list: ShowList,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>> {
        self.record(format!("show_list {list:?} {page} {}", describe(params)));
        self.list_page(0, MediaKind::Tv, page).await
    }

    async fn details(
        &self,
        kind: MediaKind,
        id: u64,
        _params: &QueryParams,
    ) -> CatalogResult<MediaItem> {
        self.record(format!("details {kind} {id}"));
        self.lookup(kind, id)
    }

    async fn credits(&self, kind: MediaKind, id: u64) -> CatalogResult<Vec<CastMember>> {
        self.record(format!("credits {kind} {id}"));
        Ok((0..20)
            .map(|i| CastMember {
                id: i,
                name: format!("Actor {i}"),
                character: String::new(),
                profile_path: None,
                order: i as u32,
            })
            .collect())
    }

    async fn videos(&self, kind: MediaKind, id: u64) -> CatalogResult<Vec<Video>> {
        self.record(format!("videos {kind} {id}"));
        Ok(vec![
            Video {
                key: "teaser1".into(),
                name: "Teaser".into(),
                video_type: "Teaser".into(),
                site: "YouTube".into(),
            },
            Video {
                key: "trailer1".into(),
                name: "Official Trailer".into(),
                video_type: "Trailer".into(),
                site: "YouTube".into(),
            },
        ])
    }

    async fn similar(
        &self,
        kind: MediaKind,
        id: u64,
        page: u32,
    ) -> CatalogResult<Page<MediaItem>> {
        self.record(format!("similar {kind} {id} {page}"));
        let mut results = vec![self.lookup(kind, id)?];
        results.extend((1..=15).map(|i| movie(id + i, "Similar")));
        Ok(Page {
            page,
            results,
            total_pages: 1,
            total_results: 16,
        })
    }

    async fn external_ids(&self, kind: MediaKind, id: u64) -> CatalogResult<ExternalIds> {
        self.record(format!("external_ids {kind} {id}"));
        let imdb_id = (kind == MediaKind::Movie && id == 550).then(|| "tt0137523".to_string());
        Ok(ExternalIds { imdb_id })
    }

    async fn season(&self, show_id: u64, season_number: u32) -> CatalogResult<SeasonDetail> {
        self.record(format!("season {show_id} {season_number}"));
        Ok(SeasonDetail {
            season_number,
            name: format!("Season {season_number}"),
            overview: String::new(),
            episodes: (1..=3)
                .map(|n| Episode {
                    episode_number: n,
                    name: format!("Episode {n}"),
                    overview: String::new(),
                    runtime: Some(50),
                    still_path: None,
                    vote_average: 0.0,
                })
                .collect(),
        })
    }

    async fn discover(
        &self,
        kind: MediaKind,
        genre_id: u64,
        sort: DiscoverSort,
        page: u32,
        params: &QueryParams,
    ) -> CatalogResult<Page<MediaItem>> {
        self.record(format!(
            "discover {kind} {genre_id} {sort:?} {page} {}",
            describe(params)
        ));
        self.list_page(genre_id * 100_000, kind, page).await
    }

    async fn genres(&self, kind: MediaKind) -> CatalogResult<Vec<Genre>> {
        self.record(format!("genres {kind}"));
        let genres = match kind {
            MediaKind::Movie => vec![(28, "Action"), (18, "Drama")],
            MediaKind::Tv => vec![(10765, "Sci-Fi & Fantasy"), (18, "Drama")],
        };
        Ok(genres
            .into_iter()
            .map(|(id, name)| Genre {
                id,
                name: name.to_string(),
            })
            .collect())
    }

    async fn search(
        &self,
        scope: SearchScope,
        query: &str,
        page: u32,
    ) -> CatalogResult<Page<MediaItem>> {
        self.record(format!("search {} {query} {page}", scope.as_str()));
        if query == "nothing" {
            return Ok(Page {
                page,
                results: Vec::new(),
                total_pages: 0,
                total_results: 0,
            });
        }
        let kind = match scope {
            SearchScope::Tv => MediaKind::Tv,
            _ => MediaKind::Movie,
        };
        let mut result = self.list_page(50_000, kind, page).await?;
        result.results.truncate(12);
        result.total_pages = 3;
        Ok(result)
    }

    async fn trending(
        &self,
        scope: SearchScope,
        window: TimeWindow,
        page: u32,
    ) -> CatalogResult<Page<MediaItem>> {
        self.record(format!("trending {} {window:?} {page}", scope.as_str()));
        let mut result = self.list_page(90_000, MediaKind::Movie, page).await?;
        result.results.extend((0..5).map(|i| show(95_000 + i, "Trending show")));
        Ok(result)
    }
}
