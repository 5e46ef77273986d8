use serde::Serialize;

use crate::catalog::MediaKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StaticPage {
    Settings,
    Faqs,
    More,
}

impl StaticPage {
    pub fn title(&self) -> &'static str {
        match self {
            StaticPage::Settings => "Settings",
            StaticPage::Faqs => "FAQs",
            StaticPage::More => "More",
        }
    }

    fn slug(&self) -> &'static str {
        match self {
            StaticPage::Settings => "settings",
            StaticPage::Faqs => "faqs",
            StaticPage::More => "more",
        }
    }
}

/// Client-side locations of the catalog front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum Route {
    Home,
    MovieDetail { id: u64 },
    ShowDetail { id: u64 },
    Watch { kind: MediaKind, id: u64 },
    Movies,
    Shows,
    Search { query: Option<String> },
    Genres,
    Genre { id: u64, kind: Option<MediaKind> },
    Placeholder { page: StaticPage },
    NotFound,
}

impl Route {
    pub fn parse(path_and_query: &str) -> Route {
        let (path, query) = match path_and_query.split_once('?') {
            Some((p, q)) => (p, q),
            None => (path_and_query, ""),
        };
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Route::Home,
            ["movie", id] => id
                .parse()
                .map(|id| Route::MovieDetail { id })
                .unwrap_or(Route::NotFound),
            ["tv", id] => id
                .parse()
                .map(|id| Route::ShowDetail { id })
                .unwrap_or(Route::NotFound),
            ["watch", kind, id] => match (kind.parse::<MediaKind>(), id.parse::<u64>()) {
                (Ok(kind), Ok(id)) => Route::Watch { kind, id },
                _ => Route::NotFound,
            },
            ["movies"] => Route::Movies,
            ["tv"] => Route::Shows,
            ["search"] => Route::Search {
                query: query_param(query, "q").filter(|q| !q.trim().is_empty()),
            },
            ["genres"] => Route::Genres,
            ["genre", id] => match id.parse() {
                Ok(id) => Route::Genre {
                    id,
                    kind: query_param(query, "kind").and_then(|k| k.parse().ok()),
                },
                Err(_) => Route::NotFound,
            },
            ["settings"] => Route::Placeholder {
                page: StaticPage::Settings,
            },
            ["faqs"] => Route::Placeholder {
                page: StaticPage::Faqs,
            },
            ["more"] => Route::Placeholder {
                page: StaticPage::More,
            },
            _ => Route::NotFound,
        }
    }

    pub fn href(&self) -> String {
        match self {
            Route::Home => "/".to_string(),
            Route::MovieDetail { id } => format!("/movie/{id}"),
            Route::ShowDetail { id } => format!("/tv/{id}"),
            Route::Watch { kind, id } => format!("/watch/{kind}/{id}"),
            Route::Movies => "/movies".to_string(),
            Route::Shows => "/tv".to_string(),
            Route::Search { query: None } => "/search".to_string(),
            Route::Search { query: Some(q) } => format!("/search?q={}", urlencoding::encode(q)),
            Route::Genres => "/genres".to_string(),
            Route::Genre { id, kind: None } => format!("/genre/{id}"),
            Route::Genre {
                id,
                kind: Some(kind),
            } => format!("/genre/{id}?kind={kind}"),
            Route::Placeholder { page } => format!("/{}", page.slug()),
            Route::NotFound => "/404".to_string(),
        }
    }

    pub fn detail(kind: MediaKind, id: u64) -> Route {
        match kind {
            MediaKind::Movie => Route::MovieDetail { id },
            MediaKind::Tv => Route::ShowDetail { id },
        }
    }
}

fn query_param(query: &str, name: &str) -> Option<String> {
    query
        .split('&')
        .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| {
            let spaced = value.replace('+', " ");
            match urlencoding::decode(&spaced) {
                Ok(decoded) => decoded.into_owned(),
                Err(_) => spaced,
            }
        })
}
