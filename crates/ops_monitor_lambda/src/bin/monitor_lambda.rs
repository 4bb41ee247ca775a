use aws_sdk_cloudwatch::types::{ComparisonOperator, Dimension, StandardUnit, Statistic};
use aws_sdk_ec2::types::Filter;
use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;

use ops_monitor_core::alarms::AlarmSpec;
use ops_monitor_core::contract::{ReconcileResponse, ResourceTag};
use ops_monitor_core::policy::{MonitorPolicy, MONITORING_TAG_KEY};
use ops_monitor_lambda::adapters::alarm_store::AlarmStore;
use ops_monitor_lambda::adapters::inventory::InstanceInventory;
use ops_monitor_lambda::adapters::tags::TagStore;
use ops_monitor_lambda::handlers::reconcile::handle_lifecycle_event;

struct Ec2InstanceInventory {
    ec2_client: aws_sdk_ec2::Client,
}

impl InstanceInventory for Ec2InstanceInventory {
    fn list_running_instances(&self) -> Result<Vec<String>, String> {
        let client = self.ec2_client.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut instance_ids = Vec::new();
                let mut next_token: Option<String> = None;

                loop {
                    let response = client
                        .describe_instances()
                        .filters(
                            Filter::builder()
                                .name("instance-state-name")
                                .values("running")
                                .build(),
                        )
                        .set_next_token(next_token)
                        .send()
                        .await
                        .map_err(|error| format!("failed to list running instances: {error}"))?;

                    for reservation in response.reservations() {
                        for instance in reservation.instances() {
                            if let Some(instance_id) = instance.instance_id() {
                                instance_ids.push(instance_id.to_string());
                            }
                        }
                    }

                    next_token = response.next_token().map(str::to_string);
                    if next_token.is_none() {
                        break;
                    }
                }

                Ok(instance_ids)
            })
        })
    }
}

struct Ec2TagStore {
    ec2_client: aws_sdk_ec2::Client,
}

impl TagStore for Ec2TagStore {
    fn monitoring_tags(&self, instance_id: &str) -> Result<Vec<ResourceTag>, String> {
        let client = self.ec2_client.clone();
        let resource_id = instance_id.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .describe_tags()
                    .filters(
                        Filter::builder()
                            .name("resource-id")
                            .values(resource_id)
                            .build(),
                    )
                    .filters(Filter::builder().name("key").values(MONITORING_TAG_KEY).build())
                    .send()
                    .await
                    .map_err(|error| format!("failed to describe instance tags: {error}"))?;

                Ok(response
                    .tags()
                    .iter()
                    .filter_map(|tag| match (tag.key(), tag.value()) {
                        (Some(key), Some(value)) => Some(ResourceTag {
                            key: key.to_string(),
                            value: value.to_string(),
                        }),
                        _ => None,
                    })
                    .collect())
            })
        })
    }
}

struct CloudWatchAlarmStore {
    cloudwatch_client: aws_sdk_cloudwatch::Client,
}

impl AlarmStore for CloudWatchAlarmStore {
    fn put_alarm(&self, spec: &AlarmSpec) -> Result<(), String> {
        let client = self.cloudwatch_client.clone();
        let spec = spec.clone();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let mut request = client
                    .put_metric_alarm()
                    .alarm_name(&spec.alarm_name)
                    .comparison_operator(ComparisonOperator::from(
                        spec.comparison_operator.as_str(),
                    ))
                    .evaluation_periods(spec.evaluation_periods)
                    .metric_name(&spec.metric_name)
                    .namespace(&spec.namespace)
                    .period(spec.period_seconds)
                    .statistic(Statistic::from(spec.statistic.as_str()))
                    .threshold(spec.threshold)
                    .actions_enabled(spec.actions_enabled)
                    .alarm_actions(&spec.notify_target);

                for dimension in &spec.dimensions {
                    let dimension = Dimension::builder()
                        .name(&dimension.name)
                        .value(&dimension.value)
                        .build()
                        .map_err(|error| format!("invalid alarm dimension: {error}"))?;
                    request = request.dimensions(dimension);
                }
                if let Some(unit) = &spec.unit {
                    request = request.unit(StandardUnit::from(unit.as_str()));
                }

                request
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| {
                        format!("failed to put alarm {}: {error}", spec.alarm_name)
                    })
            })
        })
    }

    fn delete_alarms(&self, names: &[String]) -> Result<(), String> {
        let client = self.cloudwatch_client.clone();
        let alarm_names = names.to_vec();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                client
                    .delete_alarms()
                    .set_alarm_names(Some(alarm_names))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|error| format!("failed to delete alarms: {error}"))
            })
        })
    }

    fn alarm_names_with_prefix(&self, prefix: &str) -> Result<Vec<String>, String> {
        let client = self.cloudwatch_client.clone();
        let name_prefix = prefix.to_string();

        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async move {
                let response = client
                    .describe_alarms()
                    .alarm_name_prefix(name_prefix)
                    .send()
                    .await
                    .map_err(|error| format!("failed to describe alarms: {error}"))?;

                Ok(response
                    .metric_alarms()
                    .iter()
                    .filter_map(|alarm| alarm.alarm_name().map(str::to_string))
                    .collect())
            })
        })
    }
}

fn policy_for_flag(tag_gate_flag: Option<&str>) -> MonitorPolicy {
    let gated = tag_gate_flag
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);

    if gated {
        MonitorPolicy::tag_gated()
    } else {
        MonitorPolicy::default()
    }
}

async fn handle_request(event: LambdaEvent<Value>) -> Result<ReconcileResponse, Error> {
    let notify_target = std::env::var("SNS_TOPIC_ARN")
        .map_err(|_| Error::from("SNS_TOPIC_ARN must be configured"))?;
    let tag_gate_flag = std::env::var("MONITOR_TAG_GATE").ok();
    let policy = policy_for_flag(tag_gate_flag.as_deref());

    let aws_config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
    let ec2_client = aws_sdk_ec2::Client::new(&aws_config);
    let inventory = Ec2InstanceInventory {
        ec2_client: ec2_client.clone(),
    };
    let tags = Ec2TagStore { ec2_client };
    let alarms = CloudWatchAlarmStore {
        cloudwatch_client: aws_sdk_cloudwatch::Client::new(&aws_config),
    };

    handle_lifecycle_event(
        event.payload,
        &policy,
        &notify_target,
        &inventory,
        &tags,
        &alarms,
    )
    .map_err(|error| Error::from(error.message))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_runtime::run(service_fn(handle_request)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_gate_flag_selects_the_gated_preset() {
        assert_eq!(policy_for_flag(Some("true")), MonitorPolicy::tag_gated());
        assert_eq!(policy_for_flag(Some("1")), MonitorPolicy::tag_gated());
        assert_eq!(policy_for_flag(Some("YES")), MonitorPolicy::tag_gated());
    }

    #[test]
    fn missing_or_disabled_flag_selects_the_default_preset() {
        assert_eq!(policy_for_flag(None), MonitorPolicy::default());
        assert_eq!(policy_for_flag(Some("false")), MonitorPolicy::default());
        assert_eq!(policy_for_flag(Some("0")), MonitorPolicy::default());
    }
}
