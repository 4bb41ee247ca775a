use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One reconciliation decision, derived purely from the event shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Backfill the alarm bundle for every currently running instance.
    ScanFleet,
    /// Create the alarm bundle for one instance that entered `running`.
    EnsureAlarms { instance_id: String },
    /// Remove the alarm bundle for one stopped or terminated instance.
    RemoveAlarms { instance_id: String },
    /// No side effects for this event.
    Ignore(IgnoreReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The event carries a detail section but no instance id or state.
    MissingFields,
    /// A state this reconciler places no alarms for (pending, rebooting, ...).
    UnhandledState(String),
}

/// Classifies a lifecycle notification.
///
/// An empty payload (manual invocation, no discriminator and no detail)
/// requests a fleet scan. Anything else is treated as a single-instance
/// state-change notification and must carry `detail.instance-id` and
/// `detail.state` to have an effect.
pub fn classify_event(event: &Value) -> ReconcileAction {
    let detail_type = event.get("detail-type").and_then(Value::as_str);
    let detail = event.get("detail");

    if detail_type.is_none() && detail.is_none() {
        return ReconcileAction::ScanFleet;
    }

    let instance_id = detail
        .and_then(|detail| detail.get("instance-id"))
        .and_then(Value::as_str);
    let state = detail
        .and_then(|detail| detail.get("state"))
        .and_then(Value::as_str);

    let (Some(instance_id), Some(state)) = (instance_id, state) else {
        return ReconcileAction::Ignore(IgnoreReason::MissingFields);
    };

    match state {
        "running" => ReconcileAction::EnsureAlarms {
            instance_id: instance_id.to_string(),
        },
        "stopped" | "terminated" => ReconcileAction::RemoveAlarms {
            instance_id: instance_id.to_string(),
        },
        other => ReconcileAction::Ignore(IgnoreReason::UnhandledState(other.to_string())),
    }
}

/// The status descriptor returned to the invoking infrastructure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconcileResponse {
    pub status: String,
}

impl ReconcileResponse {
    pub fn scanned_existing() -> Self {
        Self {
            status: "scanned_existing".to_string(),
        }
    }

    pub fn ignored() -> Self {
        Self {
            status: "ignored".to_string(),
        }
    }

    pub fn created(instance_id: &str) -> Self {
        Self {
            status: format!("alarms created for {instance_id}"),
        }
    }

    pub fn skipped_untagged(instance_id: &str) -> Self {
        Self {
            status: format!("skipped {instance_id}, no Monitoring=Enabled tag"),
        }
    }

    pub fn removed(instance_id: &str) -> Self {
        Self {
            status: format!("alarms removed for {instance_id}"),
        }
    }

    pub fn state_ignored(state: &str) -> Self {
        Self {
            status: format!("state {state} ignored"),
        }
    }
}

/// One key/value tag on a compute instance, as reported by the tag store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceTag {
    pub key: String,
    pub value: String,
}
