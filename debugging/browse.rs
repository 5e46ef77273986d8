//! Page through catalog feeds, run a search, or list playback sources from the terminal.
//! Usage:
//!   cargo run --bin browse -- movies <popular|top_rated|upcoming|now_playing> [pages] [--sort rating|newest]
//!   cargo run --bin browse -- tv <popular|top_rated|airing_today|on_the_air> [pages] [--sort rating|newest]
//!   cargo run --bin browse -- search <query> [all|movie|tv] [pages]
//!   cargo run --bin browse -- watch <movie|tv> <tmdb_id> [season episode]
//! Requires TMDB_API_KEY in the environment (.env supported).

use anyhow::{Context, Result};
use cinestream::catalog::{sort_items, MediaItem, MediaKind, SortOrder};
use cinestream::config::Config;
use cinestream::pagination::{FeedQuery, FeedSource, LoadOutcome, PagedFeed};
use cinestream::playback::{resolve, MediaIds, PlaybackSession};
use cinestream::search::SearchPage;
use cinestream::tmdb::{CatalogApi, MovieList, SearchScope, ShowList, TmdbClient};
use dotenvy::dotenv;
use serde_json::json;
use std::env;
use std::sync::Arc;

fn usage() -> ! {
    eprintln!("Usage: cargo run --bin browse -- movies <list> [pages] [--sort rating|newest]");
    eprintln!("       cargo run --bin browse -- tv <list> [pages] [--sort rating|newest]");
    eprintln!("       cargo run --bin browse -- search <query> [all|movie|tv] [pages]");
    eprintln!("       cargo run --bin browse -- watch <movie|tv> <tmdb_id> [season episode]");
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let mut args: Vec<String> = env::args().skip(1).collect();
    let sort = take_sort(&mut args)?;
    if args.len() < 2 {
        usage();
    }

    let config = Config::from_env()?;
    let api: Arc<dyn CatalogApi> = Arc::new(TmdbClient::from_config(&config)?);

    match args[0].as_str() {
        "movies" => {
            let list = parse_slug::<MovieList>(&args[1])?;
            let pages = parse_pages(args.get(2))?;
            let feed = PagedFeed::new(api, FeedQuery::new(FeedSource::Movies { list }));
            page_feed(&feed, pages, sort).await
        }
        "tv" => {
            let list = parse_slug::<ShowList>(&args[1])?;
            let pages = parse_pages(args.get(2))?;
            let feed = PagedFeed::new(api, FeedQuery::new(FeedSource::Shows { list }));
            page_feed(&feed, pages, sort).await
        }
        "search" => {
            let scope = match args.get(2) {
                Some(s) => parse_slug::<SearchScope>(s)?,
                None => SearchScope::All,
            };
            let pages = parse_pages(args.get(3))?;
            search(api, &args[1], scope, pages).await
        }
        "watch" => {
            let kind: MediaKind = args[1].parse()?;
            let id: u64 = args
                .get(2)
                .ok_or_else(|| anyhow::anyhow!("missing tmdb id"))?
                .parse()
                .context("tmdb_id must be an integer")?;
            let season = args.get(3).map(|s| s.parse::<u32>()).transpose()?;
            let episode = args.get(4).map(|s| s.parse::<u32>()).transpose()?;
            watch(api.as_ref(), kind, id, season, episode).await
        }
        _ => usage(),
    }
}

fn take_sort(args: &mut Vec<String>) -> Result<Option<SortOrder>> {
    let Some(pos) = args.iter().position(|a| a == "--sort") else {
        return Ok(None);
    };
    let value = args
        .get(pos + 1)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("--sort needs a value"))?;
    args.drain(pos..=pos + 1);
    match value.as_str() {
        "rating" => Ok(Some(SortOrder::Rating)),
        "newest" => Ok(Some(SortOrder::Newest)),
        other => anyhow::bail!("unknown sort '{}'", other),
    }
}

fn parse_slug<T: serde::de::DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_value(json!(raw)).with_context(|| format!("unrecognised value '{raw}'"))
}

fn parse_pages(raw: Option<&String>) -> Result<u32> {
    match raw {
        Some(p) => p.parse().context("pages must be an integer"),
        None => Ok(1),
    }
}

async fn page_feed(feed: &PagedFeed, pages: u32, sort: Option<SortOrder>) -> Result<()> {
    for _ in 0..pages {
        match feed.load_more().await {
            LoadOutcome::Loaded { page, added } => eprintln!("page {page}: +{added}"),
            LoadOutcome::Failed { message } => anyhow::bail!("page failed: {}", message),
            other => {
                eprintln!("stopped: {other:?}");
                break;
            }
        }
    }
    let snapshot = feed.snapshot();
    let mut items = snapshot.items;
    if let Some(order) = sort {
        sort_items(&mut items, order);
    }
    print_items(&items);
    eprintln!(
        "{} titles, page {} of {:?}, {:?}",
        items.len(),
        snapshot.page,
        snapshot.total_pages,
        snapshot.status
    );
    Ok(())
}

async fn search(api: Arc<dyn CatalogApi>, query: &str, scope: SearchScope, pages: u32) -> Result<()> {
    let mut page = SearchPage::new(api);
    page.select_tab(scope).await;
    if let Some(LoadOutcome::Failed { message }) = page.submit(query).await {
        anyhow::bail!("search failed: {}", message);
    }
    for _ in 1..pages {
        if !matches!(page.load_more().await, LoadOutcome::Loaded { .. }) {
            break;
        }
    }
    if let Some(results) = page.results() {
        print_items(&results.items);
        eprintln!("{} results for '{}' ({})", results.items.len(), query, scope.as_str());
    }
    Ok(())
}

async fn watch(
    api: &dyn CatalogApi,
    kind: MediaKind,
    id: u64,
    season: Option<u32>,
    episode: Option<u32>,
) -> Result<()> {
    let ids = MediaIds::new(id, api.external_ids(kind, id).await?.imdb_id);
    let mut session = PlaybackSession::new(ids.clone(), kind);
    if let (Some(s), Some(e)) = (season, episode) {
        session.select_episode(s, e);
    }
    let sources: Vec<_> = session
        .available_providers()
        .into_iter()
        .map(|(index, provider)| match resolve(provider, &ids, kind, session.episode()) {
            Ok(url) => json!({ "index": index, "name": provider.name, "url": url }),
            Err(e) => json!({ "index": index, "name": provider.name, "error": e.to_string() }),
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&sources)?);
    Ok(())
}

fn print_items(items: &[MediaItem]) {
    for item in items {
        let year = item
            .year()
            .map(|y| y.to_string())
            .unwrap_or_else(|| "----".to_string());
        println!(
            "{:>8} {:<5} {} {:>4.1}  {}",
            item.id,
            item.kind().as_str(),
            year,
            item.vote_average,
            item.title
        );
    }
}
