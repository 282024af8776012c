// tests/divisions_tracker.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parliament_tracker::{
    Bill, Config, Division, DivisionListener, DivisionsTracker, House, LordsDivision,
    MemoryDivisionStorage, Parliament,
};

#[derive(Default)]
struct Spy {
    count: AtomicUsize,
    with_bill: AtomicUsize,
}

#[async_trait]
impl DivisionListener for Spy {
    async fn on_division(&self, _division: &Division, bill: Option<&Bill>) -> anyhow::Result<()> {
        self.count.fetch_add(1, Ordering::SeqCst);
        if bill.is_some() {
            self.with_bill.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

fn lords_division(id: u32, title: &str) -> LordsDivision {
    serde_json::from_value(serde_json::json!({
        "divisionId": id,
        "date": "2024-02-21T16:00:00",
        "number": 2,
        "notes": null,
        "title": title,
        "isWhipped": true,
        "isGovernmentContent": false,
        "tellerContentCount": 150,
        "tellerNotContentCount": 170,
        "sponsoringMemberId": null,
        "contentTellers": [],
        "notContentTellers": [],
        "contents": [],
        "notContents": []
    }))
    .unwrap()
}

fn tracker_with(
    storage: Arc<MemoryDivisionStorage>,
) -> (DivisionsTracker, Arc<Spy>, Arc<Spy>) {
    let parliament = Arc::new(Parliament::new(Config::default()));
    let mut tracker = DivisionsTracker::new(parliament, storage, 10);
    let lords_spy = Arc::new(Spy::default());
    let commons_spy = Arc::new(Spy::default());
    tracker.register(lords_spy.clone(), House::Lords);
    tracker.register(commons_spy.clone(), House::Commons);
    (tracker, lords_spy, commons_spy)
}

// Titles without the word "Bill" never attempt association, so these paths
// stay entirely off the network.

#[tokio::test]
async fn unassociated_division_is_stored_and_dispatched_to_its_house() {
    let storage = Arc::new(MemoryDivisionStorage::new());
    let (tracker, lords_spy, commons_spy) = tracker_with(storage);

    let division = Division::Lords(lords_division(987, "Humble Address: Motion to Agree"));
    tracker.process_division(division).await.unwrap();

    assert_eq!(lords_spy.count.load(Ordering::SeqCst), 1);
    assert_eq!(lords_spy.with_bill.load(Ordering::SeqCst), 0);
    assert_eq!(commons_spy.count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn stored_division_is_skipped() {
    let storage = Arc::new(MemoryDivisionStorage::new());
    let (tracker, lords_spy, _) = tracker_with(storage);

    let division = Division::Lords(lords_division(987, "Humble Address: Motion to Agree"));
    tracker.process_division(division.clone()).await.unwrap();
    tracker.process_division(division).await.unwrap();

    // Exactly one delivery; the second sighting hits the storage dedup.
    assert_eq!(lords_spy.count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn bill_divisions_are_queryable_from_storage() {
    use parliament_tracker::DivisionStorage;

    let storage = MemoryDivisionStorage::new();
    let division = Division::Lords(lords_division(987, "Example Act 2020 Bill — Amendment 12"));
    storage.add_bill_division(3141, &division).await.unwrap();

    assert!(storage.bill_division_stored(3141, &division).await.unwrap());
    assert!(!storage.division_stored(&division).await.unwrap());
    assert_eq!(storage.get_bill_divisions(3141).await.unwrap(), vec![987]);
    assert!(storage.get_bill_divisions(1).await.unwrap().is_empty());
}
