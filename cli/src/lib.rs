//! Network side of the PMU digest tools: replaying samples to the switch as telemetry
//! frames (`sender`) and logging the digests it sends back (`listener`).

pub mod listener;
pub mod sender;
