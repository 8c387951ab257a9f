//! Free-running participants driven by the scheduler on a real clock.

use std::sync::Arc;
use std::time::Duration;

use agora::{
    LifecycleState, LocalNetwork, MemoryStore, Participant, ParticipantConfig, Scheduler,
    SystemTimeProvider, ThreadRng,
};

type LiveParticipant = Participant<LocalNetwork, SystemTimeProvider, ThreadRng, MemoryStore>;

async fn spawn_group(
    network: &LocalNetwork,
    count: usize,
    tick: Duration,
    delay: Duration,
) -> Scheduler<LocalNetwork, SystemTimeProvider, ThreadRng, MemoryStore> {
    let store = MemoryStore::new();
    let mut scheduler = Scheduler::new(tick, delay);
    for _ in 0..count {
        let participant: Arc<LiveParticipant> = Arc::new(Participant::new(
            ParticipantConfig::new(),
            network.clone(),
            SystemTimeProvider::new(),
            ThreadRng::new(),
            store.clone(),
        ));
        participant.initialise().await.unwrap();
        scheduler.spawn(participant);
    }
    scheduler
}

fn totals(participants: &[Arc<LiveParticipant>]) -> (u64, usize) {
    participants.iter().fold((0, 0), |(money, items), p| {
        let summary = p.summary();
        (money + summary.money, items + summary.items)
    })
}

#[tokio::test]
async fn test_market_conserves_money_and_items() {
    let network = LocalNetwork::new();
    let mut scheduler =
        spawn_group(&network, 4, Duration::from_millis(15), Duration::from_millis(0)).await;
    let (money_before, items_before) = totals(scheduler.participants());
    assert_eq!(items_before, 12);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let reports = scheduler.shutdown_all().await;

    assert_eq!(reports.len(), 4);
    for participant in scheduler.participants() {
        assert_eq!(participant.lifecycle(), LifecycleState::Dead);
        assert_eq!(participant.summary().owned_auctions, 0);
    }
    assert_eq!(totals(scheduler.participants()), (money_before, items_before));
    assert_eq!(network.endpoint_count(), 0);
    assert!(network.request_count() > 0);
}

#[tokio::test]
async fn test_cancel_before_start_delay() {
    let network = LocalNetwork::new();
    let mut scheduler =
        spawn_group(&network, 2, Duration::from_millis(10), Duration::from_secs(60)).await;

    let reports = scheduler.shutdown_all().await;

    assert!(reports.iter().all(|r| !r.already_terminated));
    for participant in scheduler.participants() {
        assert_eq!(participant.lifecycle(), LifecycleState::Dead);
    }
    assert_eq!(network.endpoint_count(), 0);
}
