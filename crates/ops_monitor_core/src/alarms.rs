use serde::{Deserialize, Serialize};

use crate::policy::MonitorPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Cpu,
    Memory,
    Disk,
}

impl MetricKind {
    pub const ALL: [MetricKind; 3] = [Self::Cpu, Self::Memory, Self::Disk];

    fn name_prefix(self) -> &'static str {
        match self {
            Self::Cpu => "HighCPU",
            Self::Memory => "HighMemory",
            Self::Disk => "HighDisk",
        }
    }

    fn metric_name(self) -> &'static str {
        match self {
            Self::Cpu => "CPUUtilization",
            Self::Memory => "mem_used_percent",
            Self::Disk => "disk_used_percent",
        }
    }

    fn namespace(self) -> &'static str {
        match self {
            // Hypervisor-level metric; memory and disk need the agent.
            Self::Cpu => "AWS/EC2",
            Self::Memory | Self::Disk => "CWAgent",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricDimension {
    pub name: String,
    pub value: String,
}

/// Everything the alarm control plane needs for one `put` call.
///
/// `alarm_name` doubles as the identity for later deletion: a `put` with an
/// existing name upserts, so creation stays idempotent without a
/// read-before-write check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlarmSpec {
    pub alarm_name: String,
    pub metric_name: String,
    pub namespace: String,
    pub comparison_operator: String,
    pub evaluation_periods: i32,
    pub period_seconds: i32,
    pub statistic: String,
    pub threshold: f64,
    pub unit: Option<String>,
    pub dimensions: Vec<MetricDimension>,
    pub notify_target: String,
    pub actions_enabled: bool,
}

/// Derives the alarm name for one metric on one instance.
///
/// Names are never stored; deletion re-derives them, so this must stay a
/// pure function of its inputs.
pub fn alarm_name(kind: MetricKind, instance_id: &str) -> String {
    format!("{}-{instance_id}", kind.name_prefix())
}

/// The full name set create produces and delete must cover.
pub fn alarm_names(instance_id: &str) -> Vec<String> {
    MetricKind::ALL
        .iter()
        .map(|kind| alarm_name(*kind, instance_id))
        .collect()
}

/// Builds the fixed three-alarm bundle for one instance.
pub fn alarm_specs(
    policy: &MonitorPolicy,
    instance_id: &str,
    notify_target: &str,
) -> Vec<AlarmSpec> {
    MetricKind::ALL
        .iter()
        .map(|kind| alarm_spec(*kind, policy, instance_id, notify_target))
        .collect()
}

fn alarm_spec(
    kind: MetricKind,
    policy: &MonitorPolicy,
    instance_id: &str,
    notify_target: &str,
) -> AlarmSpec {
    let mut dimensions = vec![MetricDimension {
        name: "InstanceId".to_string(),
        value: instance_id.to_string(),
    }];
    if kind == MetricKind::Disk {
        if let Some(mount) = &policy.disk_mount {
            dimensions.push(MetricDimension {
                name: "path".to_string(),
                value: mount.path.clone(),
            });
            dimensions.push(MetricDimension {
                name: "fstype".to_string(),
                value: mount.fstype.clone(),
            });
        }
    }

    AlarmSpec {
        alarm_name: alarm_name(kind, instance_id),
        metric_name: kind.metric_name().to_string(),
        namespace: kind.namespace().to_string(),
        comparison_operator: "GreaterThanThreshold".to_string(),
        evaluation_periods: policy.evaluation_periods,
        period_seconds: policy.period_seconds,
        statistic: "Average".to_string(),
        threshold: policy.threshold_percent,
        unit: (kind == MetricKind::Cpu).then(|| "Percent".to_string()),
        dimensions,
        notify_target: notify_target.to_string(),
        actions_enabled: true,
    }
}
