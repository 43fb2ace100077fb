//! Biphase-mark rendering, sample sinks, and the real-time frame pump

mod biphase;
mod device;
mod pump;
mod sink;

pub use biphase::BiphaseEncoder;
pub use device::{output_devices, CpalSink, OutputDeviceInfo};
pub use pump::FramePump;
pub use sink::{SampleSink, SinkConfig, SinkResult};
