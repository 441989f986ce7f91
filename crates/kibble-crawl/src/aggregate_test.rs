use super::*;
use crate::store::InMemoryEventStore;

fn lifecycle() -> (CrawlLifecycle, Arc<InMemoryEventStore>) {
    let store = Arc::new(InMemoryEventStore::new());
    (CrawlLifecycle::new(store.clone()), store)
}

fn listing(url: &str) -> ListingUrl {
    ListingUrl {
        url: url.to_owned(),
        retailer_slug: "test-shop".to_owned(),
        category: Some("Dog Food".to_owned()),
        metadata: Metadata::new(),
    }
}

fn stats(duration_ms: u64) -> CrawlStats {
    CrawlStats {
        duration_ms: Some(duration_ms),
        ..CrawlStats::default()
    }
}

#[test]
fn happy_path_appends_in_order() {
    let (lifecycle, store) = lifecycle();
    let id = lifecycle
        .start("https://shop.test/c/dog", "test-shop", Metadata::new())
        .unwrap();
    lifecycle.record_listing(id, listing("https://shop.test/p/1")).unwrap();
    lifecycle.record_listing(id, listing("https://shop.test/p/2")).unwrap();
    lifecycle.complete(id, 2, stats(1200)).unwrap();

    let stream = store.load(id).unwrap();
    let kinds: Vec<&str> = stream.iter().map(|e| e.event.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            "crawl_started",
            "listing_discovered",
            "listing_discovered",
            "crawl_completed"
        ]
    );
    let sequences: Vec<u64> = stream.iter().map(|e| e.sequence).collect();
    assert_eq!(sequences, vec![1, 2, 3, 4]);

    let state = lifecycle.state(id).unwrap();
    assert_eq!(state.status, CrawlStatus::Completed);
    assert_eq!(state.listings_discovered, 2);
    assert_eq!(state.retailer.as_deref(), Some("test-shop"));
    assert_eq!(state.version, 4);
}

#[test]
fn failed_crawl_rejects_listings_and_completion() {
    let (lifecycle, store) = lifecycle();
    let id = lifecycle
        .start("https://shop.test/c/dog", "test-shop", Metadata::new())
        .unwrap();
    lifecycle.mark_failed(id, "blocked", Metadata::new()).unwrap();

    let err = lifecycle
        .record_listing(id, listing("https://shop.test/p/1"))
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidState { status: CrawlStatus::Failed, .. }
    ));
    let err = lifecycle.complete(id, 0, CrawlStats::default()).unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidState { .. }));
    assert_eq!(store.load(id).unwrap().len(), 2);
}

#[test]
fn repeated_terminal_commands_keep_first_payload() {
    let (lifecycle, store) = lifecycle();
    let id = lifecycle
        .start("https://shop.test/c/dog", "test-shop", Metadata::new())
        .unwrap();
    assert!(lifecycle.complete(id, 5, stats(100)).unwrap().is_some());
    assert!(lifecycle.complete(id, 9, stats(900)).unwrap().is_none());
    assert!(lifecycle
        .mark_failed(id, "late failure", Metadata::new())
        .unwrap()
        .is_none());

    let state = lifecycle.state(id).unwrap();
    assert_eq!(state.status, CrawlStatus::Completed);
    assert!(matches!(
        state.outcome,
        Some(CrawlEvent::CrawlCompleted { discovered_count: 5, .. })
    ));
    assert_eq!(store.load(id).unwrap().len(), 2);

    let err = lifecycle
        .record_listing(id, listing("https://shop.test/p/1"))
        .unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::InvalidState { status: CrawlStatus::Completed, .. }
    ));
}

#[test]
fn repeated_failure_is_a_no_op() {
    let (lifecycle, _) = lifecycle();
    let id = lifecycle
        .start("https://shop.test/c/dog", "test-shop", Metadata::new())
        .unwrap();
    lifecycle.mark_failed(id, "first", Metadata::new()).unwrap();
    assert!(lifecycle
        .mark_failed(id, "second", Metadata::new())
        .unwrap()
        .is_none());
    let state = lifecycle.state(id).unwrap();
    assert!(matches!(
        state.outcome,
        Some(CrawlEvent::CrawlFailed { ref reason, .. }) if reason == "first"
    ));
}

#[test]
fn listing_from_another_retailer_is_rejected() {
    let (lifecycle, store) = lifecycle();
    let id = lifecycle
        .start("https://shop.test/c/dog", "test-shop", Metadata::new())
        .unwrap();
    let stray = ListingUrl {
        retailer_slug: "other-shop".to_owned(),
        ..listing("https://other.test/p/9")
    };
    let err = lifecycle.record_listing(id, stray).unwrap_err();
    assert!(matches!(
        err,
        LifecycleError::RetailerMismatch { ref expected, ref found, .. }
            if expected == "test-shop" && found == "other-shop"
    ));
    assert_eq!(store.load(id).unwrap().len(), 1);
    assert_eq!(lifecycle.state(id).unwrap().status, CrawlStatus::Started);
}

#[test]
fn commands_on_unknown_crawl_fail() {
    let (lifecycle, _) = lifecycle();
    let err = lifecycle
        .complete(Uuid::new_v4(), 0, CrawlStats::default())
        .unwrap_err();
    assert!(matches!(err, LifecycleError::UnknownCrawl(_)));
}

#[test]
fn fold_is_pure_over_events() {
    let crawl_id = Uuid::new_v4();
    let events = [
        CrawlEvent::CrawlStarted {
            crawl_id,
            url: "https://shop.test/c/cat".to_owned(),
            retailer: "test-shop".to_owned(),
            metadata: Metadata::new(),
        },
        CrawlEvent::CrawlFailed {
            crawl_id,
            reason: "timeout".to_owned(),
            context: Metadata::new(),
        },
        // Anything after a terminal event changes nothing but the version.
        CrawlEvent::ListingDiscovered {
            crawl_id,
            url: "https://shop.test/p/9".to_owned(),
            retailer: "test-shop".to_owned(),
            category: None,
            metadata: Metadata::new(),
        },
    ];
    let a = fold(&events);
    let b = fold(&events);
    assert_eq!(a, b);
    assert_eq!(a.status, CrawlStatus::Failed);
    assert_eq!(a.listings_discovered, 0);
    assert_eq!(a.version, 3);
    assert_eq!(fold(std::iter::empty()).status, CrawlStatus::New);
}

#[test]
fn decide_rejects_second_start() {
    let crawl_id = Uuid::new_v4();
    let state = fold(&[CrawlEvent::CrawlStarted {
        crawl_id,
        url: "u".to_owned(),
        retailer: "r".to_owned(),
        metadata: Metadata::new(),
    }]);
    let err = decide(
        &state,
        crawl_id,
        CrawlCommand::Start {
            crawl_id,
            url: "u".to_owned(),
            retailer: "r".to_owned(),
            metadata: Metadata::new(),
        },
    )
    .unwrap_err();
    assert!(matches!(err, LifecycleError::InvalidState { command: "start", .. }));
}
