mod common;

use cinestream::catalog::{ItemKey, Keyed, MediaKind};
use cinestream::pagination::{
    FeedQuery, FeedSource, FeedStatus, LoadOutcome, PagedFeed, ScrollPosition, Skip,
};
use cinestream::search::{LiveSearch, SearchPage, MAX_SUGGESTIONS};
use cinestream::tmdb::{MovieList, SearchScope, ShowList};
use common::FakeCatalog;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn popular_movies() -> FeedQuery {
    FeedQuery::new(FeedSource::Movies {
        list: MovieList::Popular,
    })
}

#[tokio::test]
async fn rapid_triggers_issue_a_single_extra_request() {
    let api = Arc::new(FakeCatalog::new().with_yields(2));
    let feed = PagedFeed::new(api.clone(), popular_movies());

    assert_eq!(
        feed.load_more().await,
        LoadOutcome::Loaded { page: 1, added: 20 }
    );
    assert_eq!(feed.snapshot().total_pages, Some(500));

    let (first, second) = tokio::join!(feed.load_more(), feed.load_more());
    let outcomes = [first, second];
    assert!(outcomes.contains(&LoadOutcome::Loaded { page: 2, added: 20 }));
    assert!(outcomes.contains(&LoadOutcome::Skipped {
        reason: Skip::InFlight
    }));

    let calls = api.calls_matching("movie_list");
    assert_eq!(calls.len(), 2);
    assert!(calls[1].starts_with("movie_list Popular 2"));

    let snapshot = feed.snapshot();
    assert_eq!(snapshot.items.len(), 40);
    let keys: HashSet<ItemKey> = snapshot.items.iter().map(Keyed::key).collect();
    assert_eq!(keys.len(), 40);
    assert_eq!(
        snapshot.items.iter().filter(|m| m.id == 200).count(),
        1
    );
}

#[tokio::test]
async fn pages_are_never_refetched_and_results_grow_until_exhausted() {
    let api = Arc::new(FakeCatalog::new().with_total_pages(3));
    let feed = PagedFeed::new(
        api.clone(),
        FeedQuery::new(FeedSource::Shows {
            list: ShowList::OnTheAir,
        }),
    );

    let mut lengths = Vec::new();
    loop {
        match feed.load_more().await {
            LoadOutcome::Loaded { .. } => lengths.push(feed.len()),
            LoadOutcome::Skipped { reason } => {
                assert_eq!(reason, Skip::Exhausted);
                break;
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert_eq!(lengths, vec![20, 40, 60]);
    assert_eq!(feed.status(), FeedStatus::Exhausted);

    let pages: Vec<String> = api.calls_matching("show_list");
    assert_eq!(pages.len(), 3);
    let unique: HashSet<&String> = pages.iter().collect();
    assert_eq!(unique.len(), 3);
}

#[tokio::test]
async fn late_response_for_replaced_query_is_discarded() {
    let api = Arc::new(FakeCatalog::new().with_yields(3));
    let feed = PagedFeed::new(api.clone(), popular_movies());
    let top_rated = FeedQuery::new(FeedSource::Movies {
        list: MovieList::TopRated,
    });

    let (stale, fresh) = tokio::join!(feed.load_more(), async {
        tokio::task::yield_now().await;
        assert!(feed.set_query(top_rated.clone()));
        feed.load_more().await
    });

    assert_eq!(stale, LoadOutcome::Stale);
    assert_eq!(fresh, LoadOutcome::Loaded { page: 1, added: 20 });
    let snapshot = feed.snapshot();
    assert_eq!(snapshot.query, top_rated);
    assert_eq!(snapshot.items.len(), 20);
    assert_eq!(snapshot.status, FeedStatus::Idle);
}

#[tokio::test]
async fn failed_page_keeps_results_and_can_be_retried() {
    let api = Arc::new(FakeCatalog::new());
    let feed = PagedFeed::new(api.clone(), popular_movies());
    feed.load_more().await;

    api.fail_next(1);
    let outcome = feed.load_more().await;
    assert!(matches!(outcome, LoadOutcome::Failed { .. }));
    let snapshot = feed.snapshot();
    assert_eq!(snapshot.status, FeedStatus::Idle);
    assert_eq!(snapshot.items.len(), 20);
    assert!(snapshot.error.is_some());

    assert_eq!(
        feed.load_more().await,
        LoadOutcome::Loaded { page: 2, added: 20 }
    );
    assert!(feed.snapshot().error.is_none());
    let retries = api.calls_matching("movie_list Popular 2");
    assert_eq!(retries.len(), 2);
}

#[tokio::test]
async fn scroll_far_from_bottom_does_not_fetch() {
    let api = Arc::new(FakeCatalog::new());
    let feed = PagedFeed::new(api.clone(), popular_movies());
    let far = ScrollPosition {
        viewport_height: 900.0,
        scroll_top: 0.0,
        document_height: 4000.0,
    };
    assert_eq!(
        feed.on_scroll(far).await,
        LoadOutcome::Skipped {
            reason: Skip::NotNearBottom
        }
    );
    assert!(api.calls().is_empty());

    let near = ScrollPosition {
        scroll_top: 3050.0,
        ..far
    };
    assert!(matches!(
        feed.on_scroll(near).await,
        LoadOutcome::Loaded { page: 1, .. }
    ));
}

#[tokio::test(start_paused = true)]
async fn single_character_never_queries() {
    let api = Arc::new(FakeCatalog::new());
    let mut live = LiveSearch::new(api.clone());
    live.on_input("b");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(api.calls_matching("search").is_empty());
    assert!(!live.state().visible);
}

#[tokio::test(start_paused = true)]
async fn rapid_keystrokes_collapse_to_one_search() {
    let api = Arc::new(FakeCatalog::new());
    let mut live = LiveSearch::new(api.clone());
    for text in ["br", "bre", "brea", "break"] {
        live.on_input(text);
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(live.is_pending());
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(api.calls_matching("search"), vec!["search all break 1"]);
    let state = live.state();
    assert!(state.visible);
    assert!(!state.searching);
    assert_eq!(state.results.len(), MAX_SUGGESTIONS);
    assert_eq!(
        live.view_all_route().map(|r| r.href()),
        Some("/search?q=break".to_string())
    );

    live.on_input("");
    let state = live.state();
    assert!(state.results.is_empty());
    assert!(!state.visible);
}

#[tokio::test(start_paused = true)]
async fn shrinking_below_minimum_cancels_pending_search() {
    let api = Arc::new(FakeCatalog::new());
    let mut live = LiveSearch::new(api.clone());
    live.on_input("ab");
    tokio::time::sleep(Duration::from_millis(100)).await;
    live.on_input("a");
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(api.calls_matching("search").is_empty());
}

#[tokio::test]
async fn search_tabs_restart_active_scope_and_keep_others() {
    let api = Arc::new(FakeCatalog::new());
    let mut page = SearchPage::new(api.clone());

    assert!(matches!(
        page.submit("dune").await,
        Some(LoadOutcome::Loaded { page: 1, .. })
    ));
    assert!(matches!(
        page.load_more().await,
        LoadOutcome::Loaded { page: 2, .. }
    ));
    assert_eq!(page.results().map(|r| r.items.len()), Some(24));

    page.select_tab(SearchScope::Tv).await;
    let tv = page.results().expect("tv results");
    assert_eq!(tv.page, 1);
    assert!(tv.items.iter().all(|i| i.kind() == MediaKind::Tv));
    assert_eq!(page.cached_tabs(), vec![SearchScope::All, SearchScope::Tv]);

    // back to "all": restarts from page 1
    page.select_tab(SearchScope::All).await;
    assert_eq!(page.results().map(|r| r.page), Some(1));
    assert_eq!(page.results().map(|r| r.items.len()), Some(12));

    // a new committed query drops every tab
    page.submit("arrival").await;
    assert_eq!(page.cached_tabs(), vec![SearchScope::All]);
    assert_eq!(
        api.calls_matching("search all arrival"),
        vec!["search all arrival 1"]
    );
}

#[tokio::test]
async fn empty_submission_clears_search_and_trending_is_capped() {
    let api = Arc::new(FakeCatalog::new());
    let mut page = SearchPage::new(api.clone());
    page.submit("dune").await;
    assert_eq!(page.submit("   ").await, None);
    assert!(page.results().is_none());
    assert_eq!(page.query(), "");

    let trending = page.trending().await.expect("trending");
    assert_eq!(trending.len(), 20);
}
