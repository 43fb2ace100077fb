//! Abstract contract over an audio output device

use std::fmt;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::error::{LtcgenError, Result};

/// Negotiated output configuration reported by a sample sink
#[derive(Debug, Clone, Copy)]
pub struct SinkConfig {
    pub sample_rate: u32,
    /// Latency between sample submission and acoustic output; the pump
    /// timestamps frames this far ahead of real time to compensate
    pub output_delay: Duration,
}

impl fmt::Display for SinkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rate: {} Hz, output delay: {:?}",
            self.sample_rate, self.output_delay
        )
    }
}

/// Terminal value delivered on a sink's `done()` channel: `Ok` after a clean
/// drain, `Err` when a mid-stream write failed.
pub type SinkResult = std::result::Result<(), LtcgenError>;

/// An audio playback endpoint consuming mono PCM samples.
///
/// Samples are signed integers at full scale; the sink is responsible for
/// any conversion to the device's own sample format. Back-pressure is the
/// sink's responsibility: the producer endpoint is bounded and producers
/// block when the device falls behind.
pub trait SampleSink: Send {
    /// Negotiated sample rate and estimated output delay
    fn config(&self) -> SinkConfig;

    /// Begin draining samples to the device, returning the bounded producer
    /// endpoint. Dropping the endpoint lets the sink drain and stop.
    fn stream(&mut self, capacity: usize) -> Result<Sender<i32>>;

    /// Yields one terminal value when the sink stops, after which no more
    /// samples are written. A disconnected channel also means a clean stop.
    fn done(&self) -> Receiver<SinkResult>;
}
