use fleetdesk_cloud::{LocalStore, MemoryLocalStore};
use fleetdesk_notify::alert::{play_soft, ALERT_COUNT_KEY};
use fleetdesk_notify::*;
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Default)]
struct CountingSink {
    plays: AtomicUsize,
}

impl AlertSink for CountingSink {
    fn play(&self) -> Result<(), PlaybackBlocked> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct BlockedSink;

impl AlertSink for BlockedSink {
    fn play(&self) -> Result<(), PlaybackBlocked> {
        Err(PlaybackBlocked("autoplay disabled".to_string()))
    }
}

#[test]
fn cue_plays_only_when_unread_rises() {
    let sink = CountingSink::default();
    let mut tracker = AlertTracker::new();

    for unread in [3, 3, 1, 4] {
        if tracker.observe(unread) {
            play_soft(&sink);
        }
    }

    assert_eq!(sink.plays.load(Ordering::SeqCst), 2);
    assert_eq!(tracker.last_alerted(), 4);
}

#[test]
fn threshold_follows_count_down() {
    let mut tracker = AlertTracker::new();
    assert!(tracker.observe(3));
    assert!(!tracker.observe(1));
    assert_eq!(tracker.last_alerted(), 1);
    assert!(tracker.observe(2));
}

#[test]
fn threshold_survives_reload() {
    let store = MemoryLocalStore::new();
    let mut tracker = AlertTracker::load(&store);
    assert!(tracker.observe(5));
    tracker.persist(&store).unwrap();

    let mut reloaded = AlertTracker::load(&store);
    assert_eq!(reloaded.last_alerted(), 5);
    assert!(!reloaded.observe(5));
}

#[test]
fn unparseable_threshold_counts_as_zero() {
    let store = MemoryLocalStore::new();
    store.set(ALERT_COUNT_KEY, "lots").unwrap();
    assert_eq!(AlertTracker::load(&store).last_alerted(), 0);
}

#[test]
fn blocked_playback_is_soft() {
    assert!(!play_soft(&BlockedSink));
    assert!(play_soft(&SilentSink));
}
