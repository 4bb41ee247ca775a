use chrono::Utc;
use serde_json::{json, Value};

use ops_monitor_core::alarms::{alarm_names, alarm_specs};
use ops_monitor_core::contract::{
    classify_event, IgnoreReason, ReconcileAction, ReconcileResponse,
};
use ops_monitor_core::policy::{MonitorPolicy, MONITORING_TAG_KEY, MONITORING_TAG_VALUE};

use crate::adapters::alarm_store::AlarmStore;
use crate::adapters::inventory::InstanceInventory;
use crate::adapters::tags::TagStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileError {
    pub message: String,
}

/// Reconciles one lifecycle notification against the alarm control plane.
///
/// Create and delete are issued blindly from the incoming event rather than
/// read-before-write: `put_alarm` upserts by name and `delete_alarms`
/// tolerates unknown names, so redelivery after a partial failure is safe.
/// Concurrent out-of-order delivery of a "running" and a later "stopped"
/// event for the same instance can leave the bundle in either state; the
/// next legitimate transition re-converges it.
///
/// Malformed input recovers locally to an "ignored" status. A collaborator
/// failure is fatal for the invocation and left to the trigger
/// infrastructure to redeliver.
pub fn handle_lifecycle_event(
    event: Value,
    policy: &MonitorPolicy,
    notify_target: &str,
    inventory: &dyn InstanceInventory,
    tags: &dyn TagStore,
    alarms: &dyn AlarmStore,
) -> Result<ReconcileResponse, ReconcileError> {
    match classify_event(&event) {
        ReconcileAction::ScanFleet => {
            log_reconcile_info("fleet_scan_started", json!({}));
            let instance_ids = inventory
                .list_running_instances()
                .map_err(|message| collaborator_failure("list_running_instances", message))?;

            // The scan path backfills unconditionally; tag gating only
            // applies to event-driven creation.
            for instance_id in &instance_ids {
                create_alarm_bundle(policy, instance_id, notify_target, alarms)?;
            }

            log_reconcile_info(
                "fleet_scan_completed",
                json!({ "instances_alarmed": instance_ids.len() }),
            );
            Ok(ReconcileResponse::scanned_existing())
        }
        ReconcileAction::EnsureAlarms { instance_id } => {
            if policy.require_monitoring_tag && !monitoring_enabled(&instance_id, tags)? {
                log_reconcile_info(
                    "instance_skipped",
                    json!({
                        "instance_id": instance_id,
                        "reason": "missing Monitoring=Enabled tag",
                    }),
                );
                return Ok(ReconcileResponse::skipped_untagged(&instance_id));
            }

            create_alarm_bundle(policy, &instance_id, notify_target, alarms)?;
            Ok(ReconcileResponse::created(&instance_id))
        }
        ReconcileAction::RemoveAlarms { instance_id } => {
            remove_alarm_bundle(policy, &instance_id, alarms)?;
            Ok(ReconcileResponse::removed(&instance_id))
        }
        ReconcileAction::Ignore(IgnoreReason::MissingFields) => {
            log_reconcile_info("event_ignored", json!({ "reason": "missing fields" }));
            Ok(ReconcileResponse::ignored())
        }
        ReconcileAction::Ignore(IgnoreReason::UnhandledState(state)) => {
            log_reconcile_info("event_ignored", json!({ "state": state }));
            Ok(ReconcileResponse::state_ignored(&state))
        }
    }
}

fn monitoring_enabled(instance_id: &str, tags: &dyn TagStore) -> Result<bool, ReconcileError> {
    let instance_tags = tags
        .monitoring_tags(instance_id)
        .map_err(|message| collaborator_failure("monitoring_tags", message))?;

    Ok(instance_tags
        .iter()
        .any(|tag| tag.key == MONITORING_TAG_KEY && tag.value == MONITORING_TAG_VALUE))
}

fn create_alarm_bundle(
    policy: &MonitorPolicy,
    instance_id: &str,
    notify_target: &str,
    alarms: &dyn AlarmStore,
) -> Result<(), ReconcileError> {
    let specs = alarm_specs(policy, instance_id, notify_target);
    for spec in &specs {
        alarms
            .put_alarm(spec)
            .map_err(|message| collaborator_failure("put_alarm", message))?;
    }

    log_reconcile_info(
        "alarms_created",
        json!({
            "instance_id": instance_id,
            "alarm_names": specs.iter().map(|spec| spec.alarm_name.clone()).collect::<Vec<_>>(),
        }),
    );
    Ok(())
}

fn remove_alarm_bundle(
    policy: &MonitorPolicy,
    instance_id: &str,
    alarms: &dyn AlarmStore,
) -> Result<(), ReconcileError> {
    let derived = alarm_names(instance_id);
    let names = if policy.resolve_names_before_delete {
        let mut resolved = Vec::new();
        for prefix in &derived {
            resolved.extend(
                alarms
                    .alarm_names_with_prefix(prefix)
                    .map_err(|message| collaborator_failure("alarm_names_with_prefix", message))?,
            );
        }
        resolved
    } else {
        derived
    };

    if !names.is_empty() {
        alarms
            .delete_alarms(&names)
            .map_err(|message| collaborator_failure("delete_alarms", message))?;
    }

    log_reconcile_info(
        "alarms_removed",
        json!({ "instance_id": instance_id, "alarm_names": names }),
    );
    Ok(())
}

fn collaborator_failure(operation: &str, message: String) -> ReconcileError {
    log_reconcile_error(
        "collaborator_call_failed",
        json!({ "operation": operation, "error": message.clone() }),
    );
    ReconcileError { message }
}

fn log_reconcile_info(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "alarm_reconciler",
            "event": event,
            "timestamp": Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

fn log_reconcile_error(event: &str, details: Value) {
    eprintln!(
        "{}",
        json!({
            "component": "alarm_reconciler",
            "level": "error",
            "event": event,
            "timestamp": Utc::now().to_rfc3339(),
            "details": details,
        })
    );
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use ops_monitor_core::alarms::AlarmSpec;
    use ops_monitor_core::contract::ResourceTag;

    use super::*;

    struct RecordingAlarmStore {
        puts: Mutex<Vec<AlarmSpec>>,
        deletes: Mutex<Vec<Vec<String>>>,
        existing_names: Vec<String>,
    }

    impl RecordingAlarmStore {
        fn new() -> Self {
            Self {
                puts: Mutex::new(Vec::new()),
                deletes: Mutex::new(Vec::new()),
                existing_names: Vec::new(),
            }
        }

        fn with_existing_names(names: &[&str]) -> Self {
            Self {
                existing_names: names.iter().map(|name| name.to_string()).collect(),
                ..Self::new()
            }
        }

        fn put_names(&self) -> Vec<String> {
            self.puts
                .lock()
                .expect("poisoned mutex")
                .iter()
                .map(|spec| spec.alarm_name.clone())
                .collect()
        }

        fn put_count(&self) -> usize {
            self.puts.lock().expect("poisoned mutex").len()
        }

        fn deletes(&self) -> Vec<Vec<String>> {
            self.deletes.lock().expect("poisoned mutex").clone()
        }
    }

    impl AlarmStore for RecordingAlarmStore {
        fn put_alarm(&self, spec: &AlarmSpec) -> Result<(), String> {
            self.puts
                .lock()
                .expect("poisoned mutex")
                .push(spec.clone());
            Ok(())
        }

        fn delete_alarms(&self, names: &[String]) -> Result<(), String> {
            self.deletes
                .lock()
                .expect("poisoned mutex")
                .push(names.to_vec());
            Ok(())
        }

        fn alarm_names_with_prefix(&self, prefix: &str) -> Result<Vec<String>, String> {
            Ok(self
                .existing_names
                .iter()
                .filter(|name| name.starts_with(prefix))
                .cloned()
                .collect())
        }
    }

    struct FailingAlarmStore;

    impl AlarmStore for FailingAlarmStore {
        fn put_alarm(&self, _spec: &AlarmSpec) -> Result<(), String> {
            Err("simulated alarm control plane outage".to_string())
        }

        fn delete_alarms(&self, _names: &[String]) -> Result<(), String> {
            Err("simulated alarm control plane outage".to_string())
        }

        fn alarm_names_with_prefix(&self, _prefix: &str) -> Result<Vec<String>, String> {
            Err("simulated alarm control plane outage".to_string())
        }
    }

    struct StaticInventory {
        instance_ids: Vec<String>,
        calls: Mutex<usize>,
    }

    impl StaticInventory {
        fn new(instance_ids: &[&str]) -> Self {
            Self {
                instance_ids: instance_ids.iter().map(|id| id.to_string()).collect(),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().expect("poisoned mutex")
        }
    }

    impl InstanceInventory for StaticInventory {
        fn list_running_instances(&self) -> Result<Vec<String>, String> {
            *self.calls.lock().expect("poisoned mutex") += 1;
            Ok(self.instance_ids.clone())
        }
    }

    struct StaticTagStore {
        tagged_instance_ids: Vec<String>,
        calls: Mutex<usize>,
    }

    impl StaticTagStore {
        fn new(tagged_instance_ids: &[&str]) -> Self {
            Self {
                tagged_instance_ids: tagged_instance_ids
                    .iter()
                    .map(|id| id.to_string())
                    .collect(),
                calls: Mutex::new(0),
            }
        }

        fn call_count(&self) -> usize {
            *self.calls.lock().expect("poisoned mutex")
        }
    }

    impl TagStore for StaticTagStore {
        fn monitoring_tags(&self, instance_id: &str) -> Result<Vec<ResourceTag>, String> {
            *self.calls.lock().expect("poisoned mutex") += 1;
            if self.tagged_instance_ids.iter().any(|id| id == instance_id) {
                Ok(vec![ResourceTag {
                    key: MONITORING_TAG_KEY.to_string(),
                    value: MONITORING_TAG_VALUE.to_string(),
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn state_event(instance_id: &str, state: &str) -> Value {
        json!({
            "detail-type": "EC2 Instance State-change Notification",
            "detail": { "instance-id": instance_id, "state": state },
        })
    }

    const TOPIC: &str = "arn:aws:sns:eu-central-1:123456789012:ops-alerts";

    #[test]
    fn running_then_stopped_deletes_exactly_the_created_names() {
        let alarms = RecordingAlarmStore::new();
        let inventory = StaticInventory::new(&[]);
        let tags = StaticTagStore::new(&[]);
        let policy = MonitorPolicy::default();

        handle_lifecycle_event(
            state_event("i-0abc", "running"),
            &policy,
            TOPIC,
            &inventory,
            &tags,
            &alarms,
        )
        .expect("create should succeed");
        handle_lifecycle_event(
            state_event("i-0abc", "stopped"),
            &policy,
            TOPIC,
            &inventory,
            &tags,
            &alarms,
        )
        .expect("delete should succeed");

        let deletes = alarms.deletes();
        assert_eq!(deletes.len(), 1);
        assert_eq!(deletes[0], alarms.put_names());
    }

    #[test]
    fn running_event_creates_the_bundle_and_reports_it() {
        let alarms = RecordingAlarmStore::new();
        let response = handle_lifecycle_event(
            state_event("i-0abc", "running"),
            &MonitorPolicy::default(),
            TOPIC,
            &StaticInventory::new(&[]),
            &StaticTagStore::new(&[]),
            &alarms,
        )
        .expect("create should succeed");

        assert_eq!(response.status, "alarms created for i-0abc");
        assert_eq!(
            alarms.put_names(),
            vec!["HighCPU-i-0abc", "HighMemory-i-0abc", "HighDisk-i-0abc"]
        );
    }

    #[test]
    fn terminated_event_issues_one_blind_delete_for_the_derived_names() {
        // No alarms exist; the delete contract tolerates unknown names.
        let alarms = RecordingAlarmStore::new();
        let response = handle_lifecycle_event(
            state_event("i-0abc", "terminated"),
            &MonitorPolicy::default(),
            TOPIC,
            &StaticInventory::new(&[]),
            &StaticTagStore::new(&[]),
            &alarms,
        )
        .expect("delete should succeed");

        assert_eq!(response.status, "alarms removed for i-0abc");
        assert_eq!(
            alarms.deletes(),
            vec![vec![
                "HighCPU-i-0abc".to_string(),
                "HighMemory-i-0abc".to_string(),
                "HighDisk-i-0abc".to_string(),
            ]]
        );
    }

    #[test]
    fn gated_policy_skips_untagged_instances_without_side_effects() {
        let alarms = RecordingAlarmStore::new();
        let response = handle_lifecycle_event(
            state_event("i-0abc", "running"),
            &MonitorPolicy::tag_gated(),
            TOPIC,
            &StaticInventory::new(&[]),
            &StaticTagStore::new(&[]),
            &alarms,
        )
        .expect("skip should succeed");

        assert_eq!(response.status, "skipped i-0abc, no Monitoring=Enabled tag");
        assert_eq!(alarms.put_count(), 0);
        assert!(alarms.deletes().is_empty());
    }

    #[test]
    fn gated_policy_creates_for_tagged_instances() {
        let alarms = RecordingAlarmStore::new();
        let tags = StaticTagStore::new(&["i-0abc"]);
        let response = handle_lifecycle_event(
            state_event("i-0abc", "running"),
            &MonitorPolicy::tag_gated(),
            TOPIC,
            &StaticInventory::new(&[]),
            &tags,
            &alarms,
        )
        .expect("create should succeed");

        assert_eq!(response.status, "alarms created for i-0abc");
        assert_eq!(tags.call_count(), 1);
        assert_eq!(alarms.put_count(), 3);
    }

    #[test]
    fn ungated_policy_never_consults_the_tag_store() {
        let tags = StaticTagStore::new(&[]);
        handle_lifecycle_event(
            state_event("i-0abc", "running"),
            &MonitorPolicy::default(),
            TOPIC,
            &StaticInventory::new(&[]),
            &tags,
            &RecordingAlarmStore::new(),
        )
        .expect("create should succeed");

        assert_eq!(tags.call_count(), 0);
    }

    #[test]
    fn empty_event_scans_once_and_alarms_every_running_instance() {
        let alarms = RecordingAlarmStore::new();
        let inventory = StaticInventory::new(&["i-1", "i-2"]);
        let response = handle_lifecycle_event(
            json!({}),
            &MonitorPolicy::default(),
            TOPIC,
            &inventory,
            &StaticTagStore::new(&[]),
            &alarms,
        )
        .expect("scan should succeed");

        assert_eq!(response.status, "scanned_existing");
        assert_eq!(inventory.call_count(), 1);
        assert_eq!(alarms.put_count(), 6);
    }

    #[test]
    fn fleet_scan_does_not_gate_on_tags_even_under_a_gated_policy() {
        let alarms = RecordingAlarmStore::new();
        let tags = StaticTagStore::new(&[]);
        handle_lifecycle_event(
            json!({}),
            &MonitorPolicy::tag_gated(),
            TOPIC,
            &StaticInventory::new(&["i-1"]),
            &tags,
            &alarms,
        )
        .expect("scan should succeed");

        assert_eq!(tags.call_count(), 0);
        assert_eq!(alarms.put_count(), 3);
    }

    #[test]
    fn event_missing_fields_makes_no_collaborator_calls() {
        let alarms = RecordingAlarmStore::new();
        let inventory = StaticInventory::new(&["i-1"]);
        let tags = StaticTagStore::new(&[]);
        let response = handle_lifecycle_event(
            json!({ "detail": { "state": "running" } }),
            &MonitorPolicy::default(),
            TOPIC,
            &inventory,
            &tags,
            &alarms,
        )
        .expect("ignore should succeed");

        assert_eq!(response.status, "ignored");
        assert_eq!(inventory.call_count(), 0);
        assert_eq!(tags.call_count(), 0);
        assert_eq!(alarms.put_count(), 0);
        assert!(alarms.deletes().is_empty());
    }

    #[test]
    fn unhandled_state_is_acknowledged_without_side_effects() {
        let alarms = RecordingAlarmStore::new();
        let response = handle_lifecycle_event(
            state_event("i-0abc", "pending"),
            &MonitorPolicy::default(),
            TOPIC,
            &StaticInventory::new(&[]),
            &StaticTagStore::new(&[]),
            &alarms,
        )
        .expect("ignore should succeed");

        assert_eq!(response.status, "state pending ignored");
        assert_eq!(alarms.put_count(), 0);
        assert!(alarms.deletes().is_empty());
    }

    #[test]
    fn resolving_policy_deletes_only_names_the_control_plane_reports() {
        let alarms = RecordingAlarmStore::with_existing_names(&["HighCPU-i-0abc"]);
        handle_lifecycle_event(
            state_event("i-0abc", "stopped"),
            &MonitorPolicy::tag_gated(),
            TOPIC,
            &StaticInventory::new(&[]),
            &StaticTagStore::new(&[]),
            &alarms,
        )
        .expect("delete should succeed");

        assert_eq!(alarms.deletes(), vec![vec!["HighCPU-i-0abc".to_string()]]);
    }

    #[test]
    fn resolving_policy_skips_the_delete_call_when_nothing_exists() {
        let alarms = RecordingAlarmStore::new();
        let response = handle_lifecycle_event(
            state_event("i-0abc", "stopped"),
            &MonitorPolicy::tag_gated(),
            TOPIC,
            &StaticInventory::new(&[]),
            &StaticTagStore::new(&[]),
            &alarms,
        )
        .expect("delete should succeed");

        assert_eq!(response.status, "alarms removed for i-0abc");
        assert!(alarms.deletes().is_empty());
    }

    #[test]
    fn collaborator_failure_is_fatal_for_the_invocation() {
        let error = handle_lifecycle_event(
            state_event("i-0abc", "running"),
            &MonitorPolicy::default(),
            TOPIC,
            &StaticInventory::new(&[]),
            &StaticTagStore::new(&[]),
            &FailingAlarmStore,
        )
        .expect_err("control plane outage should fail the invocation");

        assert_eq!(error.message, "simulated alarm control plane outage");
    }
}
