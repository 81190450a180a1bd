//! BDD step definitions for slot watcher

pub mod alert_steps;
pub mod polling_steps;
pub mod relay_steps;
