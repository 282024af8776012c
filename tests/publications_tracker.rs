// tests/publications_tracker.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parliament_tracker::tracker::feed::{
    parse_publication_feed, PublicationFeedDocument, PublicationUpdate,
};
use parliament_tracker::{MemoryBillsStorage, PublicationListener, PublicationsTracker};

const PUBLICATIONS_XML: &str = include_str!("fixtures/bill_publications.rss");
const BILL_ID: u32 = 3141;

#[derive(Default)]
struct Spy {
    count: AtomicUsize,
}

#[async_trait]
impl PublicationListener for Spy {
    async fn on_publication(
        &self,
        _bill_id: u32,
        _update: &PublicationUpdate,
    ) -> anyhow::Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn tracker_with(
    storage: Arc<MemoryBillsStorage>,
    fetch_limit: usize,
) -> (PublicationsTracker, Arc<Spy>) {
    let mut tracker = PublicationsTracker::new(reqwest::Client::new(), storage, fetch_limit);
    let spy = Arc::new(Spy::default());
    tracker.register(spy.clone());
    (tracker, spy)
}

fn fixture() -> PublicationFeedDocument {
    parse_publication_feed(PUBLICATIONS_XML).unwrap()
}

#[tokio::test]
async fn bootstrap_respects_the_fetch_limit() {
    let storage = Arc::new(MemoryBillsStorage::new());
    let (mut tracker, spy) = tracker_with(storage.clone(), 2);

    tracker
        .ingest_publication_feed(BILL_ID, fixture(), 2)
        .await
        .unwrap();

    // Three entries in the feed, limit two.
    assert_eq!(spy.count.load(Ordering::SeqCst), 2);
    assert_eq!(storage.publication_update_count(), 2);
    assert_eq!(
        tracker.watermark(BILL_ID),
        Some(Utc.with_ymd_and_hms(2024, 2, 21, 9, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn unchanged_build_date_exits_early() {
    let storage = Arc::new(MemoryBillsStorage::new());
    let (mut tracker, spy) = tracker_with(storage, 20);

    tracker
        .ingest_publication_feed(BILL_ID, fixture(), 20)
        .await
        .unwrap();
    assert_eq!(spy.count.load(Ordering::SeqCst), 3);

    tracker
        .ingest_publication_feed(BILL_ID, fixture(), 20)
        .await
        .unwrap();
    assert_eq!(spy.count.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn incremental_poll_stops_at_the_watermark() {
    let storage = Arc::new(MemoryBillsStorage::new());
    let (mut tracker, spy) = tracker_with(storage, 20);

    tracker
        .ingest_publication_feed(BILL_ID, fixture(), 20)
        .await
        .unwrap();
    assert_eq!(spy.count.load(Ordering::SeqCst), 3);

    // A later channel build with one genuinely new entry on top.
    let mut doc = fixture();
    doc.last_build = Some(Utc.with_ymd_and_hms(2024, 2, 22, 9, 0, 0).unwrap());
    doc.items.insert(
        0,
        PublicationUpdate {
            guid: "https://bills.parliament.uk/publications/9004".into(),
            category: Some("Amendment Paper".into()),
            title: "Notices of Amendments as at 22 February 2024".into(),
            description: String::new(),
            published: Utc.with_ymd_and_hms(2024, 2, 22, 8, 30, 0).unwrap(),
        },
    );

    tracker
        .ingest_publication_feed(BILL_ID, doc, 20)
        .await
        .unwrap();
    // Only the new entry; the scan stops at the first entry older than the
    // previous watermark.
    assert_eq!(spy.count.load(Ordering::SeqCst), 4);
}

#[tokio::test]
async fn stored_publications_are_not_redelivered() {
    let storage = Arc::new(MemoryBillsStorage::new());
    use parliament_tracker::BillsStorage;
    for update in &fixture().items {
        storage
            .add_publication_update(BILL_ID, update)
            .await
            .unwrap();
    }

    let (mut tracker, spy) = tracker_with(storage, 20);
    tracker
        .ingest_publication_feed(BILL_ID, fixture(), 20)
        .await
        .unwrap();
    assert_eq!(spy.count.load(Ordering::SeqCst), 0);
}
