#![doc = include_str!("../README.md")]

pub mod clock;
pub mod error;
pub mod poller;
pub mod probe;

pub use clock::{Clock, TokioClock};
pub use error::ReadinessError;
pub use poller::ReadinessPoller;
pub use probe::{HealthProbe, NetworkProbe, PROBE_TIMEOUT};
