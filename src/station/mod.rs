pub mod channel;
pub mod decode;
pub mod error;
pub mod poller;
pub mod protocol;

#[cfg(test)]
mod simulator;

pub use poller::{poll_serial, StationPoller};
pub use protocol::{ProtocolTiming, RetryPolicy, DEFAULT_ATTEMPTS};
