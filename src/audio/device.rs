//! cpal-backed sample sink for the system audio output

use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, FromSample, SampleFormat, SampleRate, SizedSample, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use tracing::{debug, info, warn};

use crate::audio::sink::{SampleSink, SinkConfig, SinkResult};
use crate::error::{LtcgenError, Result};

/// Device buffer requested per callback, in frames. The delay estimate
/// assumes the backend double-buffers this.
const DEVICE_BUFFER_FRAMES: u32 = 2048;

// cpal streams are not Send on every backend; the stream is created, played
// and dropped on the thread that owns the sink.
struct SendStream(#[allow(dead_code)] cpal::Stream);
unsafe impl Send for SendStream {}

/// Basic facts about one output device, for `ltcgen list`
#[derive(Debug, Clone)]
pub struct OutputDeviceInfo {
    pub name: String,
    pub is_default: bool,
}

/// Enumerate output devices on the default audio host
pub fn output_devices() -> Result<Vec<OutputDeviceInfo>> {
    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());

    let mut devices = Vec::new();
    for device in host
        .output_devices()
        .map_err(|e| LtcgenError::SinkOpen(e.to_string()))?
    {
        if let Ok(name) = device.name() {
            let is_default = default_name.as_deref() == Some(name.as_str());
            devices.push(OutputDeviceInfo { name, is_default });
        }
    }
    Ok(devices)
}

/// Audio output sink driving the default (or a named) cpal output device.
///
/// Samples are pulled by the device callback from a bounded queue filled by
/// the encoder thread; an empty queue plays silence, and a disconnected
/// queue drains and then reports completion through `done()`.
pub struct CpalSink {
    config: SinkConfig,
    device: cpal::Device,
    stream_config: StreamConfig,
    sample_format: SampleFormat,
    stream: Option<SendStream>,
    done_tx: Sender<SinkResult>,
    done_rx: Receiver<SinkResult>,
}

impl CpalSink {
    /// Open an output device, negotiating the device's default format.
    ///
    /// `sample_rate_override` of 0 keeps the device's advertised rate.
    pub fn open(device_name: Option<&str>, sample_rate_override: u32) -> Result<Self> {
        let host = cpal::default_host();
        let device = match device_name {
            Some(name) => host
                .output_devices()
                .map_err(|e| LtcgenError::SinkOpen(e.to_string()))?
                .find(|d| d.name().map(|n| n.contains(name)).unwrap_or(false))
                .ok_or_else(|| LtcgenError::DeviceNotFound(name.to_string()))?,
            None => host.default_output_device().ok_or(LtcgenError::NoOutputDevice)?,
        };

        let default = device
            .default_output_config()
            .map_err(|e| LtcgenError::SinkOpen(e.to_string()))?;

        let sample_rate = if sample_rate_override != 0 {
            info!("overriding device sample rate: {} Hz", sample_rate_override);
            sample_rate_override
        } else {
            default.sample_rate().0
        };

        let stream_config = StreamConfig {
            channels: default.channels(),
            sample_rate: SampleRate(sample_rate),
            buffer_size: BufferSize::Fixed(DEVICE_BUFFER_FRAMES),
        };

        let output_delay = Duration::from_secs_f64(
            f64::from(2 * DEVICE_BUFFER_FRAMES) / f64::from(sample_rate),
        );

        info!(
            "opened output device: {} ({} ch, {:?})",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            stream_config.channels,
            default.sample_format(),
        );

        let (done_tx, done_rx) = bounded(1);
        Ok(Self {
            config: SinkConfig { sample_rate, output_delay },
            device,
            stream_config,
            sample_format: default.sample_format(),
            stream: None,
            done_tx,
            done_rx,
        })
    }

    fn build_stream<T>(&self, config: &StreamConfig, samples: Receiver<i32>) -> Result<cpal::Stream>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = config.channels as usize;
        let done_tx = self.done_tx.clone();
        let err_tx = self.done_tx.clone();
        let mut drained = false;

        self.device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    for frame in data.chunks_mut(channels) {
                        let value = match samples.try_recv() {
                            Ok(s) => s as f32 / i32::MAX as f32,
                            // silence on underrun; the pump paces production
                            Err(TryRecvError::Empty) => 0.0,
                            Err(TryRecvError::Disconnected) => {
                                if !drained {
                                    drained = true;
                                    let _ = done_tx.try_send(Ok(()));
                                }
                                0.0
                            }
                        };
                        let converted = T::from_sample(value);
                        for out in frame.iter_mut() {
                            *out = converted;
                        }
                    }
                },
                move |err| {
                    warn!("output stream error: {}", err);
                    let _ = err_tx.try_send(Err(LtcgenError::SinkWrite(err.to_string())));
                },
                None,
            )
            .map_err(|e| LtcgenError::SinkOpen(e.to_string()))
    }

    fn build_for_format(&self, config: &StreamConfig, samples: Receiver<i32>) -> Result<cpal::Stream> {
        match self.sample_format {
            SampleFormat::I16 => self.build_stream::<i16>(config, samples),
            SampleFormat::I32 => self.build_stream::<i32>(config, samples),
            _ => self.build_stream::<f32>(config, samples),
        }
    }
}

impl SampleSink for CpalSink {
    fn config(&self) -> SinkConfig {
        self.config
    }

    fn stream(&mut self, capacity: usize) -> Result<Sender<i32>> {
        let (tx, rx) = bounded(capacity);

        let stream = match self.build_for_format(&self.stream_config, rx.clone()) {
            Ok(stream) => stream,
            Err(e) => {
                // some backends reject a fixed buffer size
                debug!("fixed device buffer rejected ({}), retrying with default", e);
                let mut fallback = self.stream_config.clone();
                fallback.buffer_size = BufferSize::Default;
                self.build_for_format(&fallback, rx)?
            }
        };

        stream
            .play()
            .map_err(|e| LtcgenError::SinkOpen(e.to_string()))?;
        self.stream = Some(SendStream(stream));
        debug!("output stream started, queue capacity {} samples", capacity);
        Ok(tx)
    }

    fn done(&self) -> Receiver<SinkResult> {
        self.done_rx.clone()
    }
}

impl Drop for CpalSink {
    fn drop(&mut self) {
        if self.stream.take().is_some() {
            debug!("output stream closed");
        }
    }
}
