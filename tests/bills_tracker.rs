// tests/bills_tracker.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use parliament_tracker::tracker::feed::{parse_feed, FeedDocument, FeedUpdate};
use parliament_tracker::{
    BillUpdateListener, BillsStorage, BillsTracker, Condition, Endpoints, Feed,
    MemoryBillsStorage, PublicationUpdate,
};

const ALLBILLS_XML: &str = include_str!("fixtures/allbills.rss");

#[derive(Default)]
struct Spy {
    count: AtomicUsize,
}

#[async_trait]
impl BillUpdateListener for Spy {
    async fn on_update(&self, _feed: &Feed, _update: &FeedUpdate) -> anyhow::Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Counts persistence calls so the per-matching-listener write behavior is
/// observable through the otherwise set-like memory storage.
#[derive(Default)]
struct CountingStorage {
    inner: MemoryBillsStorage,
    feed_adds: AtomicUsize,
}

#[async_trait]
impl BillsStorage for CountingStorage {
    async fn add_feed_update(&self, bill_id: u32, update: &FeedUpdate) -> anyhow::Result<()> {
        self.feed_adds.fetch_add(1, Ordering::SeqCst);
        self.inner.add_feed_update(bill_id, update).await
    }

    async fn has_update_stored(&self, bill_id: u32, update: &FeedUpdate) -> anyhow::Result<bool> {
        self.inner.has_update_stored(bill_id, update).await
    }

    async fn add_publication_update(
        &self,
        bill_id: u32,
        update: &PublicationUpdate,
    ) -> anyhow::Result<()> {
        self.inner.add_publication_update(bill_id, update).await
    }

    async fn has_publication_update(
        &self,
        bill_id: u32,
        update: &PublicationUpdate,
    ) -> anyhow::Result<bool> {
        self.inner.has_publication_update(bill_id, update).await
    }
}

fn tracker_with(storage: Arc<dyn BillsStorage>) -> BillsTracker {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
    BillsTracker::new(reqwest::Client::new(), Endpoints::default(), storage)
}

fn doc_with(build: DateTime<Utc>, items: Vec<FeedUpdate>) -> FeedDocument {
    FeedDocument {
        last_build: Some(build),
        items,
    }
}

fn update_at(bill_id: u32, updated: DateTime<Utc>) -> FeedUpdate {
    FeedUpdate {
        guid: format!("https://bills.parliament.uk/bills/{bill_id}"),
        bill_id,
        stage: Some("Committee stage".into()),
        categories: vec!["commons".into()],
        title: format!("Bill {bill_id}"),
        description: String::new(),
        updated,
    }
}

#[tokio::test]
async fn unchanged_build_date_dispatches_nothing() {
    let storage = Arc::new(MemoryBillsStorage::new());
    let mut tracker = tracker_with(storage.clone());
    let spy = Arc::new(Spy::default());
    tracker.register(spy.clone(), vec![Condition::All]);

    let doc = parse_feed(ALLBILLS_XML).unwrap();
    tracker.ingest_document(doc.clone()).await.unwrap();
    assert_eq!(spy.count.load(Ordering::SeqCst), 3);

    // Same build date: the whole cycle is skipped.
    tracker.ingest_document(doc).await.unwrap();
    assert_eq!(spy.count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn repeated_update_is_dispatched_and_persisted_once() {
    let storage = Arc::new(MemoryBillsStorage::new());
    let mut tracker = tracker_with(storage.clone());
    let spy = Arc::new(Spy::default());
    tracker.register(spy.clone(), vec![Condition::All]);

    let t = Utc.with_ymd_and_hms(2024, 2, 20, 16, 0, 0).unwrap();
    let b1 = Utc.with_ymd_and_hms(2024, 2, 20, 17, 0, 0).unwrap();
    let b2 = Utc.with_ymd_and_hms(2024, 2, 20, 18, 0, 0).unwrap();

    tracker
        .ingest_document(doc_with(b1, vec![update_at(3141, t)]))
        .await
        .unwrap();
    // A later channel build carrying the same entry again.
    tracker
        .ingest_document(doc_with(b2, vec![update_at(3141, t)]))
        .await
        .unwrap();

    assert_eq!(spy.count.load(Ordering::SeqCst), 1);
    assert_eq!(storage.feed_update_count(), 1);
}

#[tokio::test]
async fn storage_dedup_survives_a_fresh_tracker() {
    let storage = Arc::new(MemoryBillsStorage::new());
    let t = Utc.with_ymd_and_hms(2024, 2, 20, 16, 0, 0).unwrap();
    let b1 = Utc.with_ymd_and_hms(2024, 2, 20, 17, 0, 0).unwrap();

    let mut first = tracker_with(storage.clone());
    let spy1 = Arc::new(Spy::default());
    first.register(spy1.clone(), vec![Condition::All]);
    first
        .ingest_document(doc_with(b1, vec![update_at(3141, t)]))
        .await
        .unwrap();
    assert_eq!(spy1.count.load(Ordering::SeqCst), 1);

    // A fresh tracker (no per-feed watermark) still won't re-deliver: the
    // storage remembers.
    let mut second = tracker_with(storage.clone());
    let spy2 = Arc::new(Spy::default());
    second.register(spy2.clone(), vec![Condition::All]);
    second
        .ingest_document(doc_with(b1, vec![update_at(3141, t)]))
        .await
        .unwrap();
    assert_eq!(spy2.count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn listeners_only_fire_for_matching_conditions() {
    let storage = Arc::new(MemoryBillsStorage::new());
    let mut tracker = tracker_with(storage);

    let commons_spy = Arc::new(Spy::default());
    let assent_spy = Arc::new(Spy::default());
    let publications_spy = Arc::new(Spy::default());
    tracker.register(commons_spy.clone(), vec![Condition::Commons]);
    tracker.register(assent_spy.clone(), vec![Condition::RoyalAssent]);
    tracker.register(publications_spy.clone(), vec![Condition::Publications]);

    let doc = parse_feed(ALLBILLS_XML).unwrap();
    tracker.ingest_document(doc).await.unwrap();

    // One commons item, one royal-assent stage, no publication categories.
    assert_eq!(commons_spy.count.load(Ordering::SeqCst), 1);
    assert_eq!(assent_spy.count.load(Ordering::SeqCst), 1);
    assert_eq!(publications_spy.count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn persistence_is_written_per_matching_listener() {
    let storage = Arc::new(CountingStorage::default());
    let mut tracker = tracker_with(storage.clone());
    tracker.register(Arc::new(Spy::default()), vec![Condition::All]);
    tracker.register(Arc::new(Spy::default()), vec![Condition::Commons]);
    tracker.register(Arc::new(Spy::default()), vec![Condition::RoyalAssent]);

    let t = Utc.with_ymd_and_hms(2024, 2, 20, 16, 0, 0).unwrap();
    let b1 = Utc.with_ymd_and_hms(2024, 2, 20, 17, 0, 0).unwrap();
    tracker
        .ingest_document(doc_with(b1, vec![update_at(3141, t)]))
        .await
        .unwrap();

    // All + Commons match, RoyalAssent doesn't (stage is "Committee stage"):
    // one write per matching listener.
    assert_eq!(storage.feed_adds.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn watermarks_never_move_backwards() {
    let storage = Arc::new(MemoryBillsStorage::new());
    let mut tracker = tracker_with(storage);
    let spy = Arc::new(Spy::default());
    tracker.register(spy.clone(), vec![Condition::All]);

    let t1 = Utc.with_ymd_and_hms(2024, 2, 20, 16, 0, 0).unwrap();
    let t2 = Utc.with_ymd_and_hms(2024, 2, 20, 18, 30, 0).unwrap();
    let b1 = Utc.with_ymd_and_hms(2024, 2, 20, 17, 0, 0).unwrap();
    let b2 = Utc.with_ymd_and_hms(2024, 2, 20, 19, 0, 0).unwrap();

    tracker
        .ingest_document(doc_with(b1, vec![update_at(3141, t1)]))
        .await
        .unwrap();
    assert_eq!(tracker.last_update(), Some(b1));
    assert_eq!(tracker.feed(3141).unwrap().last_update(), Some(t1));

    tracker
        .ingest_document(doc_with(b2, vec![update_at(3141, t2)]))
        .await
        .unwrap();
    assert_eq!(tracker.last_update(), Some(b2));
    assert_eq!(tracker.feed(3141).unwrap().last_update(), Some(t2));

    // A stale channel build is skipped outright; nothing rewinds.
    tracker
        .ingest_document(doc_with(b1, vec![update_at(3141, t1)]))
        .await
        .unwrap();
    assert_eq!(tracker.last_update(), Some(b2));
    assert_eq!(tracker.feed(3141).unwrap().last_update(), Some(t2));
    assert_eq!(spy.count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn listener_failure_aborts_the_cycle() {
    struct Failing;
    #[async_trait]
    impl BillUpdateListener for Failing {
        async fn on_update(&self, _f: &Feed, _u: &FeedUpdate) -> anyhow::Result<()> {
            anyhow::bail!("handler exploded")
        }
    }

    let storage = Arc::new(MemoryBillsStorage::new());
    let mut tracker = tracker_with(storage);
    tracker.register(Arc::new(Failing), vec![Condition::All]);

    let t = Utc.with_ymd_and_hms(2024, 2, 20, 16, 0, 0).unwrap();
    let b = Utc.with_ymd_and_hms(2024, 2, 20, 17, 0, 0).unwrap();
    let err = tracker
        .ingest_document(doc_with(b, vec![update_at(3141, t)]))
        .await
        .unwrap_err();
    assert!(matches!(err, parliament_tracker::Error::Listener(_)));

    // The per-feed watermark was not committed; the entry is retried on the
    // next successful cycle.
    assert!(tracker.feed(3141).unwrap().last_update().is_none());
}
