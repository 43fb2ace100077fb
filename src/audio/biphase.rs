//! Biphase-mark (differential Manchester) rendering of encoded LTC frames

/// Renders 80-bit LTC frames into signed PCM samples at a fixed sample rate.
///
/// Biphase-mark has a polarity transition at the start of every bit period
/// and a second mid-bit transition for one bits, making the signal
/// self-clocking and polarity-insensitive.
#[derive(Debug, Clone)]
pub struct BiphaseEncoder {
    amplitude: i32,
    samples_per_frame: usize,
    samples_per_bit: usize,
    clock_err: usize,
}

impl BiphaseEncoder {
    pub fn new(sample_rate: u32, effective_fps: f64, amplitude: i32) -> Self {
        let rate = f64::from(sample_rate);
        Self {
            amplitude,
            samples_per_frame: (rate / effective_fps) as usize,
            samples_per_bit: (rate / (effective_fps * 80.0)) as usize,
            // tenths of a sample left over per bit, spread across the frame
            clock_err: ((rate * 10.0 / (effective_fps * 80.0)).round() as usize) % 10,
        }
    }

    /// Number of samples produced for every frame; constant for the life of
    /// the encoder so the stream tracks the audio clock without drift.
    pub fn samples_per_frame(&self) -> usize {
        self.samples_per_frame
    }

    /// Render one encoded frame. The signal starts at -amplitude and
    /// transitions on the first bit, so the first sample is positive and,
    /// with even frame parity, the last sample is negative.
    pub fn render(&self, frame: &[u8; 10]) -> Vec<i32> {
        let total = self.samples_per_frame;
        let mut samples = vec![0i32; total];
        let mut level = -self.amplitude;
        let mut written = 0usize;

        for bit in 0..80usize {
            let mut c1 = self.samples_per_bit / 2;
            // an odd sample count gives the extra sample to the second half
            let mut c2 = self.samples_per_bit - c1;
            if bit % 10 < self.clock_err {
                c1 += 1;
            }

            // truncate rather than overrun the frame buffer
            let remaining = total - written;
            if c1 + c2 > remaining {
                c1 = c1.min(remaining);
                c2 = remaining - c1;
            }

            let one = (frame[bit / 8] >> (7 - bit % 8)) & 0x1 != 0;

            level = -level;
            samples[written..written + c1].fill(level);
            written += c1;

            if one {
                level = -level;
            }
            samples[written..written + c2].fill(level);
            written += c2;
        }

        // any unfilled trailing samples hold the last written level
        samples[written..].fill(level);
        samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ltc::LtcFrame;
    use chrono::{Local, TimeDelta, TimeZone};

    fn reference_frames() -> Vec<LtcFrame> {
        let at = |h, m, s, fps, drop| {
            let mut frame = LtcFrame::new(fps, drop);
            frame.time = Local.with_ymd_and_hms(2018, 12, 1, h, m, s).unwrap();
            frame
        };

        let mut frames = vec![
            at(23, 0, 0, 24.0, false),
            at(23, 0, 0, 25.0, false),
            at(23, 14, 21, 30.0, false),
            at(23, 14, 0, 29.97, true),
        ];
        let mut with_user = at(23, 40, 21, 29.97, true);
        with_user.external_clock_sync = true;
        with_user.user_bytes = Some([0xA5, 0xC3, 0x91, 0x72]);
        frames.push(with_user);

        let mut one_frame_in = at(23, 0, 0, 24.0, false);
        one_frame_in.time = one_frame_in.time + TimeDelta::milliseconds(42);
        frames.push(one_frame_in);

        frames
    }

    /// Counts level changes, starting from a state no sample can hold so the
    /// transition into bit 0 is included.
    fn transitions(samples: &[i32]) -> usize {
        let mut count = 0;
        let mut state = i32::MIN;
        for &s in samples {
            if s != state {
                count += 1;
                state = s;
            }
        }
        count
    }

    #[test]
    fn sample_count_matches_audio_clock() {
        for frame in reference_frames() {
            for rate in [44_100u32, 48_000, 96_000] {
                let encoder = BiphaseEncoder::new(rate, frame.effective_fps(), i32::MAX);
                let samples = encoder.render(&frame.encode());
                assert_eq!(
                    samples.len(),
                    (f64::from(rate) / frame.effective_fps()) as usize,
                    "at {} fps / {rate} Hz",
                    frame.effective_fps()
                );
                assert_eq!(samples.len(), encoder.samples_per_frame());
            }
        }
    }

    #[test]
    fn endpoint_polarity() {
        for frame in reference_frames() {
            let encoder = BiphaseEncoder::new(48_000, frame.effective_fps(), i32::MAX);
            let samples = encoder.render(&frame.encode());
            assert!(samples[0] > 0, "first sample should be positive");
            assert!(*samples.last().unwrap() < 0, "last sample should be negative");
        }
    }

    #[test]
    fn one_transition_per_bit_plus_one_per_one_bit() {
        for frame in reference_frames() {
            let encoded = frame.encode();
            let ones: usize = encoded.iter().map(|b| b.count_ones() as usize).sum();

            let encoder = BiphaseEncoder::new(44_100, frame.effective_fps(), i32::MAX);
            let samples = encoder.render(&encoded);
            assert_eq!(transitions(&samples), 80 + ones, "at {}", frame.timecode());
        }
    }

    #[test]
    fn amplitude_is_symmetric() {
        let frame = reference_frames().remove(1);
        let encoder = BiphaseEncoder::new(48_000, frame.effective_fps(), 1000);
        let samples = encoder.render(&frame.encode());
        assert!(samples.iter().all(|&s| s == 1000 || s == -1000));
    }
}
