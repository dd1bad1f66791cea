use fronius_telemetry::{new_request_ids, record_event_dropped, record_poll_started};

#[test]
fn request_ids_non_empty() {
    let ids = new_request_ids();
    assert!(!ids.request_id.is_empty());
    assert!(!ids.trace_id.is_empty());
    assert_ne!(ids.request_id, ids.trace_id);
}

#[test]
fn counters_accumulate() {
    let before = fronius_telemetry::metrics().snapshot();
    record_poll_started();
    record_event_dropped();
    let after = fronius_telemetry::metrics().snapshot();
    assert!(after.polls_started >= before.polls_started + 1);
    assert!(after.events_dropped >= before.events_dropped + 1);
}
