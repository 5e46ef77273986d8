use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";
const YOUTUBE_EMBED_BASE: &str = "https://www.youtube.com/embed";
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Tv,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Tv => "tv",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "movie" => Ok(MediaKind::Movie),
            "tv" => Ok(MediaKind::Tv),
            _ => Err(anyhow::anyhow!("media kind must be 'movie' or 'tv'")),
        }
    }
}

/// Identity of a catalog record. Ids are only unique within one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemKey {
    pub kind: MediaKind,
    pub id: u64,
}

impl ItemKey {
    pub fn new(kind: MediaKind, id: u64) -> Self {
        Self { kind, id }
    }
}

/// Anything that can be de-duplicated in an accumulated result list.
pub trait Keyed {
    fn key(&self) -> ItemKey;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonSummary {
    pub season_number: u32,
    #[serde(default)]
    pub episode_count: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub air_date: Option<String>,
}

/// Kind-specific payload of a [`MediaItem`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "media_type", rename_all = "lowercase")]
pub enum MediaDetails {
    Movie {
        #[serde(default)]
        runtime: Option<u32>,
    },
    Tv {
        #[serde(default)]
        seasons: Vec<SeasonSummary>,
        #[serde(default)]
        number_of_seasons: Option<u32>,
        #[serde(default)]
        number_of_episodes: Option<u32>,
    },
}

/// A movie or show record as supplied by the catalog provider. Never mutated
/// after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub backdrop_path: Option<String>,
    /// Release date for movies, first air date for shows.
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
    #[serde(default)]
    pub genre_ids: Vec<u64>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(flatten)]
    pub details: MediaDetails,
}

impl MediaItem {
    pub fn kind(&self) -> MediaKind {
        match self.details {
            MediaDetails::Movie { .. } => MediaKind::Movie,
            MediaDetails::Tv { .. } => MediaKind::Tv,
        }
    }

    pub fn year(&self) -> Option<i32> {
        self.date.as_deref().and_then(extract_year)
    }

    pub fn seasons(&self) -> &[SeasonSummary] {
        match &self.details {
            MediaDetails::Tv { seasons, .. } => seasons,
            MediaDetails::Movie { .. } => &[],
        }
    }

    pub fn runtime(&self) -> Option<u32> {
        match self.details {
            MediaDetails::Movie { runtime } => runtime,
            MediaDetails::Tv { .. } => None,
        }
    }

    pub fn poster_url(&self, size: PosterSize) -> String {
        poster_url(self.poster_path.as_deref(), size)
    }

    pub fn backdrop_url(&self, size: BackdropSize) -> String {
        backdrop_url(self.backdrop_path.as_deref(), size)
    }
}

impl Keyed for MediaItem {
    fn key(&self) -> ItemKey {
        ItemKey::new(self.kind(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub episode_number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub still_path: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonDetail {
    pub season_number: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub overview: String,
    #[serde(default)]
    pub episodes: Vec<Episode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CastMember {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub character: String,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub video_type: String,
    #[serde(default)]
    pub site: String,
}

impl Video {
    pub fn is_trailer(&self) -> bool {
        self.video_type == "Trailer"
    }

    /// Embeddable player URL; only YouTube-hosted videos have one.
    pub fn embed_url(&self) -> Option<String> {
        if self.site.eq_ignore_ascii_case("YouTube") {
            Some(format!("{YOUTUBE_EMBED_BASE}/{}", self.key))
        } else {
            None
        }
    }
}

/// Keeps only `Trailer` entries, preserving provider order.
pub fn trailers(videos: &[Video]) -> Vec<Video> {
    videos.iter().filter(|v| v.is_trailer()).cloned().collect()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalIds {
    #[serde(default)]
    pub imdb_id: Option<String>,
}

/// Envelope shared by every list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub page: u32,
    pub results: Vec<T>,
    pub total_pages: u32,
    pub total_results: u32,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            page: self.page,
            results: self.results.into_iter().map(f).collect(),
            total_pages: self.total_pages,
            total_results: self.total_results,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PosterSize {
    W154,
    W185,
    W342,
    W500,
    W780,
    Original,
}

impl PosterSize {
    fn as_str(&self) -> &'static str {
        match self {
            PosterSize::W154 => "w154",
            PosterSize::W185 => "w185",
            PosterSize::W342 => "w342",
            PosterSize::W500 => "w500",
            PosterSize::W780 => "w780",
            PosterSize::Original => "original",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackdropSize {
    W300,
    W780,
    W1280,
    Original,
}

impl BackdropSize {
    fn as_str(&self) -> &'static str {
        match self {
            BackdropSize::W300 => "w300",
            BackdropSize::W780 => "w780",
            BackdropSize::W1280 => "w1280",
            BackdropSize::Original => "original",
        }
    }
}

pub fn poster_url(path: Option<&str>, size: PosterSize) -> String {
    image_url(path, size.as_str())
}

pub fn backdrop_url(path: Option<&str>, size: BackdropSize) -> String {
    image_url(path, size.as_str())
}

fn image_url(path: Option<&str>, size: &str) -> String {
    match path.filter(|p| !p.is_empty()) {
        Some(p) => format!("{IMAGE_BASE}/{size}{p}"),
        None => PLACEHOLDER_IMAGE.to_string(),
    }
}

fn extract_year(date: &str) -> Option<i32> {
    date.split('-').next().and_then(|y| y.parse().ok())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Rating,
    Newest,
}

/// Stable sort, highest first. Undated items sink to the end for `Newest`.
pub fn sort_items(items: &mut [MediaItem], order: SortOrder) {
    match order {
        SortOrder::Rating => items.sort_by(|a, b| {
            b.vote_average
                .partial_cmp(&a.vote_average)
                .unwrap_or(Ordering::Equal)
        }),
        SortOrder::Newest => items.sort_by(|a, b| b.date_key().cmp(&a.date_key())),
    }
}

impl MediaItem {
    fn date_key(&self) -> Option<&str> {
        self.date.as_deref().filter(|d| !d.is_empty())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{movie, show};
    use super::*;
    use serde_json::json;

    #[test]
    fn movie_and_show_with_same_id_have_distinct_keys() {
        assert_ne!(movie(10, "A").key(), show(10, "B").key());
        assert_eq!(movie(10, "A").key(), ItemKey::new(MediaKind::Movie, 10));
    }

    #[test]
    fn year_comes_from_date_prefix() {
        let mut m = movie(1, "A");
        assert_eq!(m.year(), Some(2024));
        m.date = None;
        assert_eq!(m.year(), None);
        m.date = Some("garbage".to_string());
        assert_eq!(m.year(), None);
    }

    #[test]
    fn serializes_with_media_type_tag() {
        let value = serde_json::to_value(show(3, "Show")).expect("serialize");
        assert_eq!(value["media_type"], json!("tv"));
        assert_eq!(value["seasons"][0]["episode_count"], json!(8));
        let back: MediaItem = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back.kind(), MediaKind::Tv);
        assert_eq!(back.seasons().len(), 1);
    }

    #[test]
    fn only_trailers_are_surfaced() {
        let videos = vec![
            Video {
                key: "a".into(),
                name: "Teaser".into(),
                video_type: "Teaser".into(),
                site: "YouTube".into(),
            },
            Video {
                key: "b".into(),
                name: "Official Trailer".into(),
                video_type: "Trailer".into(),
                site: "YouTube".into(),
            },
        ];
        let kept = trailers(&videos);
        assert_eq!(kept.len(), 1);
        assert_eq!(
            kept[0].embed_url().as_deref(),
            Some("https://www.youtube.com/embed/b")
        );
    }

    #[test]
    fn missing_image_path_uses_placeholder() {
        assert_eq!(poster_url(None, PosterSize::W500), PLACEHOLDER_IMAGE);
        assert_eq!(
            poster_url(Some("/x.jpg"), PosterSize::W154),
            "https://image.tmdb.org/t/p/w154/x.jpg"
        );
        assert_eq!(
            backdrop_url(Some("/y.jpg"), BackdropSize::W1280),
            "https://image.tmdb.org/t/p/w1280/y.jpg"
        );
    }

    #[test]
    fn sorts_by_rating_and_date() {
        let mut a = movie(1, "A");
        a.vote_average = 5.0;
        a.date = Some("2020-01-01".into());
        let mut b = movie(2, "B");
        b.vote_average = 9.0;
        b.date = None;
        let mut c = movie(3, "C");
        c.vote_average = 7.0;
        c.date = Some("2023-01-01".into());

        let mut items = vec![a.clone(), b.clone(), c.clone()];
        sort_items(&mut items, SortOrder::Rating);
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![2, 3, 1]);

        sort_items(&mut items, SortOrder::Newest);
        assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![3, 1, 2]);
    }
}
