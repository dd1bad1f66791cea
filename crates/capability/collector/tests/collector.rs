use fronius_collector::{Collector, CollectorOptions};
use fronius_push::{PushClient, PushState};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

fn options(push: Arc<PushClient>) -> CollectorOptions {
    CollectorOptions {
        site_name: "test-site".to_string(),
        poll_interval: Duration::from_millis(50),
        push,
        initial_scan: false,
    }
}

#[tokio::test]
async fn subscriber_gets_replay_then_live_metrics() {
    let push = Arc::new(PushClient::from_values(None, None, None));
    let collector = Collector::start(options(push)).expect("start");

    let mut subscription = collector.subscribe().await;
    let first = timeout(Duration::from_secs(1), subscription.recv())
        .await
        .expect("timely")
        .expect("event");
    assert_eq!(first.topic(), "siteUpdate");

    let mut saw_hires = false;
    let mut saw_minutely_history = false;
    let mut saw_live_metrics = false;
    for _ in 0..20 {
        let event = timeout(Duration::from_secs(2), subscription.recv())
            .await
            .expect("timely")
            .expect("event");
        match event.topic() {
            "hiresHistory" => saw_hires = true,
            "minutelyHistory" => saw_minutely_history = true,
            "siteMetrics" => {
                saw_live_metrics = true;
                break;
            }
            _ => {}
        }
    }
    assert!(saw_hires);
    assert!(saw_minutely_history);
    assert!(saw_live_metrics);

    collector.shutdown();
    // 关闭后队列排空并终止
    loop {
        match timeout(Duration::from_secs(2), subscription.recv())
            .await
            .expect("timely")
        {
            Some(_) => continue,
            None => break,
        }
    }
}

#[tokio::test]
async fn cold_start_status_snapshot_is_empty() {
    let push = Arc::new(PushClient::from_values(None, None, None));
    let collector = Collector::start(options(push)).expect("start");

    let status = collector.status_snapshot().await;
    assert_eq!(status.device_count, 0);
    assert!(status.last_scan.is_none());
    assert!(!status.is_scanning);
    assert!(status.devices.is_empty());
    assert!(status.site.solar.power_w.is_none());
    assert!(status.site.load.energy_wh.is_none());
    assert!(!status.site.has_fault);

    assert_eq!(collector.push_status().state, PushState::Absent);
    collector.shutdown();
}

#[tokio::test]
async fn empty_site_never_emits_minutely_events() {
    let push = Arc::new(PushClient::from_values(None, None, None));
    let collector = Collector::start(options(push)).expect("start");

    let mut subscription = collector.subscribe().await;
    let deadline = tokio::time::Instant::now() + Duration::from_millis(400);
    while tokio::time::Instant::now() < deadline {
        match timeout(Duration::from_millis(100), subscription.recv()).await {
            Ok(Some(event)) => assert_ne!(event.topic(), "froniusMinutely"),
            Ok(None) => break,
            Err(_) => {}
        }
    }
    collector.shutdown();
}
