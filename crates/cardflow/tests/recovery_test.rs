//! Restart survivability: commit intents and tombstones live in SQLite, so a
//! reopened pipeline picks up exactly where the previous process stopped.

use cardflow::{CardDraft, CardState, Cardflow, PipelineConfig};
use chrono::{Duration as ChronoDuration, Utc};
use tempfile::tempdir;

fn after_grace() -> chrono::DateTime<Utc> {
    Utc::now() + ChronoDuration::hours(2)
}

#[test]
fn test_pending_commit_survives_restart() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig::default();

    let key = {
        let flow = Cardflow::open(dir.path(), config.clone()).unwrap();
        let id = flow
            .stage_create("u1", "s1", CardDraft::new("front", "back"))
            .unwrap();
        // Intent persisted, process dies before the delay elapses
        flow.event_consumer().drain_available();
        id.key()
    };

    let flow = Cardflow::open(dir.path(), config).unwrap();
    assert_eq!(
        flow.commit_scheduler().process_due(after_grace()).unwrap(),
        1
    );

    let cards = flow.list_in_set("s1").unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].id.key(), key);
    assert_eq!(cards[0].state, CardState::Committed);
}

#[test]
fn test_tombstone_survives_restart() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig::default();

    let key = {
        let flow = Cardflow::open(dir.path(), config.clone()).unwrap();
        let id = flow
            .stage_create("u1", "s1", CardDraft::new("front", "back"))
            .unwrap();
        let mut consumer = flow.event_consumer();
        consumer.drain_available();
        flow.stage_delete("u1", "s1", &id).unwrap();
        consumer.drain_available();
        id.key()
    };

    let flow = Cardflow::open(dir.path(), config).unwrap();
    let queue = flow.store().commit_queue();
    assert!(queue.is_tombstoned(&key).unwrap());

    assert_eq!(
        flow.commit_scheduler().process_due(after_grace()).unwrap(),
        0
    );
    assert!(flow.list_in_set("s1").is_err());
}

#[test]
fn test_committed_cards_survive_restart() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig::default();

    {
        let flow = Cardflow::open(dir.path(), config.clone()).unwrap();
        flow.stage_create("u1", "s1", CardDraft::new("front", "back"))
            .unwrap();
        flow.event_consumer().drain_available();
        flow.commit_scheduler().process_due(after_grace()).unwrap();
    }

    let flow = Cardflow::open(dir.path(), config).unwrap();
    let cards = flow.list_in_set("s1").unwrap();
    assert_eq!(cards.len(), 1);
    assert_eq!(cards[0].state, CardState::Committed);
    // Nothing left to replay
    assert_eq!(
        flow.commit_scheduler().process_due(after_grace()).unwrap(),
        0
    );
}
