pub(crate) const METRIC_TERMINATION_EVENTS: &str = "lifecycle_termination_events_total";
pub(crate) const METRIC_SHUTDOWN_COMPLETED: &str = "lifecycle_shutdown_completed_total";
pub(crate) const METRIC_SUBSYSTEM_STOP_DURATION: &str = "lifecycle_subsystem_stop_duration_seconds";

pub(crate) fn emit_termination_event(service_name: &str, kind: &str, escalated: bool) {
    metrics::counter!(
        METRIC_TERMINATION_EVENTS,
        "service_name" => service_name.to_string(),
        "kind" => kind.to_string(),
        "escalated" => escalated.to_string()
    )
    .increment(1);
}

pub(crate) fn emit_shutdown_completed(service_name: &str, outcome: &str) {
    metrics::counter!(
        METRIC_SHUTDOWN_COMPLETED,
        "service_name" => service_name.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

pub(crate) fn emit_subsystem_stop_duration(service_name: &str, result: &str, duration_secs: f64) {
    metrics::histogram!(
        METRIC_SUBSYSTEM_STOP_DURATION,
        "service_name" => service_name.to_string(),
        "result" => result.to_string()
    )
    .record(duration_secs);
}
