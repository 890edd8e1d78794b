use fleetdesk_cloud::{ChangeBus, DataChange, RefreshTopic};

#[tokio::test]
async fn every_subscriber_receives_changes() {
    let bus = ChangeBus::new();
    let mut a = bus.subscribe();
    let mut b = bus.subscribe();
    assert_eq!(bus.subscriber_count(), 2);

    bus.publish(DataChange::RefreshRequested(RefreshTopic::Attendance));

    assert_eq!(
        a.recv().await.unwrap(),
        DataChange::RefreshRequested(RefreshTopic::Attendance)
    );
    assert_eq!(
        b.recv().await.unwrap(),
        DataChange::RefreshRequested(RefreshTopic::Attendance)
    );
}

#[test]
fn publish_without_subscribers_is_fine() {
    let bus = ChangeBus::default();
    bus.publish(DataChange::LocalWrite { key: "staff_data".into() });
    assert_eq!(bus.subscriber_count(), 0);
}

#[tokio::test]
async fn clones_share_the_channel() {
    let bus = ChangeBus::new();
    let mut rx = bus.subscribe();
    bus.clone().publish(DataChange::Pushed { keys: vec!["k".into()] });
    assert_eq!(rx.recv().await.unwrap(), DataChange::Pushed { keys: vec!["k".into()] });
}
