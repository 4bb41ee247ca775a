use ops_monitor_core::alarms::AlarmSpec;

pub trait AlarmStore {
    /// Upserts one alarm; a second `put` with the same name overwrites.
    fn put_alarm(&self, spec: &AlarmSpec) -> Result<(), String>;

    /// Must tolerate names that do not correspond to existing alarms.
    fn delete_alarms(&self, names: &[String]) -> Result<(), String>;

    fn alarm_names_with_prefix(&self, prefix: &str) -> Result<Vec<String>, String>;
}
