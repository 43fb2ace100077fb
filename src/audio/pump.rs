//! Real-time frame pump: emits one LTC frame per frame period

use std::thread;
use std::time::Duration;

use chrono::{Local, TimeDelta};
use crossbeam_channel::{after, bounded, never, tick, Receiver, Sender};
use tracing::{debug, error, info, warn};

use crate::audio::biphase::BiphaseEncoder;
use crate::audio::sink::SampleSink;
use crate::config::GeneratorConfig;
use crate::error::Result;
use crate::ltc::LtcFrame;
use crate::stats::Status;

/// Margin added past the target frame boundary when phase-aligning, so the
/// ticker starts just after the boundary rather than racing it
const SYNC_MARGIN: Duration = Duration::from_micros(250);

/// Cadence of the periodic status line
const STATUS_PERIOD: Duration = Duration::from_secs(10);

/// Peak amplitude of generated samples; the sink scales down as needed
const AMPLITUDE: i32 = i32::MAX;

/// Frames buffered between the pump and the biphase encoder
const FRAME_QUEUE: usize = 2;

/// Sample-queue depth between the encoder and the sink, in frames
const SINK_QUEUE_FRAMES: usize = 3;

/// Periodic driver producing one frame per frame period, phase-aligned to
/// the sink's output delay.
///
/// Scheduling is cooperative with the wall clock, not the audio clock, so
/// slow and fast ticks both occur; duplicate frame indices are skipped and
/// gaps are counted rather than repaired.
pub struct FramePump {
    frame: LtcFrame,
    status: Status,
}

impl FramePump {
    pub fn new(config: &GeneratorConfig) -> Self {
        let mut frame = LtcFrame::new(config.fps, config.dropframe);
        frame.external_clock_sync = true;
        let rate_window = (frame.effective_fps() * 60.0 * config.rate_window_minutes).ceil() as usize;
        Self {
            frame,
            status: Status::new(rate_window),
        }
    }

    /// Run until the shutdown signal fires or the sink reports termination.
    /// Returns the sink's error if it failed mid-stream.
    pub fn run(mut self, sink: &mut dyn SampleSink, shutdown: Receiver<()>) -> Result<()> {
        let sink_config = sink.config();
        let output_delay = TimeDelta::nanoseconds(sink_config.output_delay.as_nanos() as i64);
        let frame_duration = self.frame.frame_duration();
        let frame_delta = TimeDelta::nanoseconds(frame_duration.as_nanos() as i64);

        info!(
            "configured for {:.3} fps, dropframe: {}",
            self.frame.effective_fps(),
            self.frame.drop_frame
        );
        info!(
            "output delay estimated at {:?}, will attempt to compensate",
            sink_config.output_delay
        );

        let encoder = BiphaseEncoder::new(sink_config.sample_rate, self.frame.effective_fps(), AMPLITUDE);
        let sample_tx = sink.stream(SINK_QUEUE_FRAMES * encoder.samples_per_frame())?;
        let done = sink.done();

        let (frame_tx, frame_rx) = bounded::<[u8; 10]>(FRAME_QUEUE);
        let encoder_handle = thread::spawn(move || encoder_thread(frame_rx, sample_tx, encoder));

        // Phase-align the first emitted frame: wait for an upcoming frame
        // boundary, shifted early by the output delay.
        self.frame.time = Local::now();
        info!("sync time {}", self.frame.timecode());
        let sync_time = self.frame.frame_begin_time() + frame_delta * 2 - output_delay
            + TimeDelta::nanoseconds(SYNC_MARGIN.as_nanos() as i64);
        info!("waiting for next frame to start at {}", sync_time.format("%H:%M:%S%.9f"));
        let wait = (sync_time - Local::now()).to_std().unwrap_or_default();
        crossbeam_channel::select! {
            recv(after(wait)) -> _ => {}
            recv(shutdown) -> _ => {
                drop(frame_tx);
                let _ = encoder_handle.join();
                return Ok(());
            }
        }

        let mut ticker = tick(frame_duration);
        let status_tick = tick(STATUS_PERIOD);
        let mut shutdown = shutdown;

        // Seed with the index of the frame currently playing out, one frame
        // before the first one emitted below.
        self.frame.time = Local::now() + output_delay;
        let mut prev_index = self.frame.frame_index();
        self.frame.time = Local::now() + frame_delta + output_delay;
        info!(
            "sending LTC frame every {:?}, first frame should be {}",
            frame_duration,
            self.frame.timecode()
        );

        let mut frame_tx = Some(frame_tx);
        loop {
            crossbeam_channel::select! {
                recv(ticker) -> _ => {
                    self.frame.time = Local::now() + output_delay;
                    let offset = ((Local::now() + output_delay) - self.frame.frame_begin_time())
                        .to_std()
                        .unwrap_or_default();

                    let this_index = self.frame.frame_index();
                    if prev_index != 0 && this_index != prev_index + 1 {
                        warn!("frame error detected: current intra frame offset: {:?}", offset);
                        if this_index == prev_index {
                            warn!("would have output duplicate frame at {}, skipping", self.frame.timecode());
                            self.status.duplicate();
                            continue;
                        }
                        warn!(
                            "skipped {} frames at {}",
                            this_index - (prev_index + 1),
                            self.frame.timecode()
                        );
                        // negative on a backward clock jump; counted as-is
                        self.status.dropped(this_index - (prev_index + 1));
                    }

                    if let Some(tx) = &frame_tx {
                        // blocking send: the queue bound is the back-pressure,
                        // stalls surface as index skips on later ticks
                        if tx.send(self.frame.encode()).is_err() {
                            debug!("frame queue closed, awaiting sink termination");
                            frame_tx = None;
                        }
                    }
                    self.status.sent(offset);
                    prev_index = this_index;
                }
                recv(status_tick) -> _ => {
                    info!("{}", self.status);
                    debug!("average output rate: {:.3} fps", self.status.fps());
                }
                recv(shutdown) -> _ => {
                    info!("shutdown requested, draining");
                    ticker = never();
                    shutdown = never();
                    frame_tx = None;
                }
                recv(done) -> msg => {
                    info!("{}", self.status);
                    drop(frame_tx);
                    return match msg {
                        Ok(Err(e)) => {
                            // the encoder may be wedged on a dead device
                            // queue; leave it behind, the process is exiting
                            error!("error streaming data: {}", e);
                            Err(e)
                        }
                        // a clean drain (or a vanished sink) means the
                        // encoder has already run dry
                        Ok(Ok(())) | Err(_) => {
                            let _ = encoder_handle.join();
                            Ok(())
                        }
                    };
                }
            }
        }
    }
}

/// Consumes raw frame bytes and produces PCM samples into the sink queue.
/// Closure of either side is a clean stop.
fn encoder_thread(frames: Receiver<[u8; 10]>, samples: Sender<i32>, encoder: BiphaseEncoder) {
    for frame in frames {
        for sample in encoder.render(&frame) {
            if samples.send(sample).is_err() {
                debug!("sample queue closed, stopping encoder");
                return;
            }
        }
    }
    debug!("frame queue drained, closing sample stream");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sink::{SinkConfig, SinkResult};
    use crate::error::Result as LtcResult;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Sink that counts every sample it receives and reports a clean drain.
    struct CountingSink {
        config: SinkConfig,
        received: Arc<AtomicUsize>,
        done_tx: Sender<SinkResult>,
        done_rx: Receiver<SinkResult>,
    }

    impl CountingSink {
        fn new(sample_rate: u32) -> Self {
            let (done_tx, done_rx) = bounded(1);
            Self {
                config: SinkConfig {
                    sample_rate,
                    output_delay: Duration::from_millis(50),
                },
                received: Arc::new(AtomicUsize::new(0)),
                done_tx,
                done_rx,
            }
        }
    }

    impl SampleSink for CountingSink {
        fn config(&self) -> SinkConfig {
            self.config
        }

        fn stream(&mut self, capacity: usize) -> LtcResult<Sender<i32>> {
            let (tx, rx) = bounded::<i32>(capacity);
            let received = self.received.clone();
            let done_tx = self.done_tx.clone();
            thread::spawn(move || {
                for _sample in rx {
                    received.fetch_add(1, Ordering::Relaxed);
                }
                let _ = done_tx.try_send(Ok(()));
            });
            Ok(tx)
        }

        fn done(&self) -> Receiver<SinkResult> {
            self.done_rx.clone()
        }
    }

    #[test]
    fn pump_emits_whole_frames_until_shutdown() {
        let config = GeneratorConfig::default();
        let pump = FramePump::new(&config);
        let mut sink = CountingSink::new(48_000);
        let received = sink.received.clone();
        let samples_per_frame =
            (48_000.0 / LtcFrame::new(config.fps, config.dropframe).effective_fps()) as usize;

        let (shutdown_tx, shutdown_rx) = bounded(1);
        let handle = thread::spawn(move || pump.run(&mut sink, shutdown_rx));

        // phase alignment waits at most two frame periods; half a second
        // leaves room for several frames on a loaded machine
        thread::sleep(Duration::from_millis(500));
        shutdown_tx.send(()).unwrap();

        let result = handle.join().unwrap();
        assert!(result.is_ok());

        let total = received.load(Ordering::Relaxed);
        assert!(total > 0, "no samples reached the sink");
        assert_eq!(total % samples_per_frame, 0, "partial frame reached the sink");
    }
}
