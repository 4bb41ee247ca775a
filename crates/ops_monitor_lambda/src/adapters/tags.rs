use ops_monitor_core::contract::ResourceTag;

pub trait TagStore {
    /// Tags on one instance, filtered server-side to the monitoring key.
    fn monitoring_tags(&self, instance_id: &str) -> Result<Vec<ResourceTag>, String>;
}
