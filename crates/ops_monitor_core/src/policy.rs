use serde::{Deserialize, Serialize};

pub const MONITORING_TAG_KEY: &str = "Monitoring";
pub const MONITORING_TAG_VALUE: &str = "Enabled";

/// Extra metric dimensions for the disk alarm when the agent reports a
/// specific mount instead of an instance-wide aggregate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiskMount {
    pub path: String,
    pub fstype: String,
}

/// Tunable reconciliation behavior.
///
/// Two presets cover the supported deployments: the ungated default and
/// the `Monitoring=Enabled` opt-in fleet (`tag_gated`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonitorPolicy {
    /// Create alarms only for instances tagged `Monitoring=Enabled`.
    /// Applies to the event-driven path; a fleet scan never gates.
    pub require_monitoring_tag: bool,
    pub threshold_percent: f64,
    pub period_seconds: i32,
    pub evaluation_periods: i32,
    pub disk_mount: Option<DiskMount>,
    /// Resolve existing alarm names via the control plane before deleting
    /// instead of deleting the derived names blindly.
    pub resolve_names_before_delete: bool,
}

impl Default for MonitorPolicy {
    fn default() -> Self {
        Self {
            require_monitoring_tag: false,
            threshold_percent: 80.0,
            period_seconds: 300,
            evaluation_periods: 1,
            disk_mount: None,
            resolve_names_before_delete: false,
        }
    }
}

impl MonitorPolicy {
    /// Preset for fleets that opt instances in with `Monitoring=Enabled`:
    /// tighter cadence, mount-scoped disk alarms, describe-before-delete.
    pub fn tag_gated() -> Self {
        Self {
            require_monitoring_tag: true,
            threshold_percent: 80.0,
            period_seconds: 60,
            evaluation_periods: 2,
            disk_mount: Some(DiskMount {
                path: "/".to_string(),
                fstype: "xfs".to_string(),
            }),
            resolve_names_before_delete: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_is_ungated_with_five_minute_periods() {
        let policy = MonitorPolicy::default();

        assert!(!policy.require_monitoring_tag);
        assert_eq!(policy.period_seconds, 300);
        assert_eq!(policy.evaluation_periods, 1);
        assert!(policy.disk_mount.is_none());
        assert!(!policy.resolve_names_before_delete);
    }

    #[test]
    fn tag_gated_preset_tightens_cadence_and_scopes_disk() {
        let policy = MonitorPolicy::tag_gated();

        assert!(policy.require_monitoring_tag);
        assert_eq!(policy.period_seconds, 60);
        assert_eq!(policy.evaluation_periods, 2);
        assert_eq!(
            policy.disk_mount,
            Some(DiskMount {
                path: "/".to_string(),
                fstype: "xfs".to_string()
            })
        );
        assert!(policy.resolve_names_before_delete);
    }
}
