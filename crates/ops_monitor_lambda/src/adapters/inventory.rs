pub trait InstanceInventory {
    /// Instance ids currently in the `running` state, filtered server-side.
    fn list_running_instances(&self) -> Result<Vec<String>, String>;
}
