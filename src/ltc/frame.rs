//! LTC frame model: timecode derivation, frame indexing, and 80-bit encoding

use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, Timelike};

use crate::ltc::timecode::{to_bcd, TimeCode};
use crate::ltc::SYNC_WORD;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Frames counted in a full 10-minute drop-frame window (18000 − 18)
const FRAMES_PER_DROP_WINDOW: i64 = 17982;

/// Frames in minute 0 of the window; minutes 1..9 drop frames 00 and 01
const FRAMES_FIRST_MINUTE: i64 = 1800;
const FRAMES_PER_DROP_MINUTE: i64 = 1798;

/// One LTC frame to be emitted.
///
/// The pump reuses a single value, assigning a new `time` before every
/// encode; all other quantities are derived from it.
#[derive(Debug, Clone)]
pub struct LtcFrame {
    /// Wall-clock instant this frame represents
    pub time: DateTime<Local>,
    /// Nominal frame rate; stays 29.97 in the drop-frame case
    pub frames_per_second: f64,
    pub drop_frame: bool,
    /// Encoded into bit 11; conventionally left on for LTC output
    pub color_frame: bool,
    /// Encoded into the external clock sync flag
    pub external_clock_sync: bool,
    /// Optional 4-byte payload carried in the user-bit nibbles
    pub user_bytes: Option<[u8; 4]>,
}

impl LtcFrame {
    pub fn new(frames_per_second: f64, drop_frame: bool) -> Self {
        Self {
            time: Local::now(),
            frames_per_second,
            drop_frame,
            color_frame: true,
            external_clock_sync: false,
            user_bytes: None,
        }
    }

    /// The exact frame rate used for all timing: 30 × 17982/18000 = 29.97
    /// when drop-frame, the nominal rate otherwise.
    pub fn effective_fps(&self) -> f64 {
        if self.drop_frame {
            30.0 * (18000.0 - 18.0) / 18000.0
        } else {
            self.frames_per_second
        }
    }

    fn frame_duration_nanos(&self) -> i64 {
        1_000_000_000_000 / (self.effective_fps() * 1000.0).round() as i64
    }

    pub fn frame_duration(&self) -> Duration {
        Duration::from_nanos(self.frame_duration_nanos() as u64)
    }

    /// The clock period used for biphase encoding
    pub fn bit_period(&self) -> Duration {
        self.frame_duration() / 80
    }

    /// Frame index within the current 10-minute drop-frame window
    fn window_frame_index(&self) -> i64 {
        let nanos = ((self.time.minute() % 10) as i64 * 60 + self.time.second() as i64)
            * NANOS_PER_SEC
            + self.time.nanosecond() as i64;
        nanos / self.frame_duration_nanos()
    }

    /// The timecode displayed for `time`.
    ///
    /// Drop-frame follows SMPTE 12M: frame numbers 00 and 01 are skipped at
    /// the start of every minute not divisible by 10, which keeps the
    /// displayed timecode within one frame of real time at 29.97 fps. The
    /// reconstruction below works in whole frames inside the 10-minute
    /// window so it stays in integer arithmetic.
    pub fn timecode(&self) -> TimeCode {
        if !self.drop_frame {
            return TimeCode {
                hour: self.time.hour() as u8,
                minute: self.time.minute() as u8,
                second: self.time.second() as u8,
                frame: (self.time.nanosecond() as f64 / 1e9 * self.effective_fps()) as u8,
                drop_frame: false,
            };
        }

        let f10 = self.window_frame_index();

        let minute = if f10 < FRAMES_FIRST_MINUTE {
            0
        } else {
            1 + (f10 - FRAMES_FIRST_MINUTE) / FRAMES_PER_DROP_MINUTE
        };
        let second = (f10 + 2 * minute - FRAMES_FIRST_MINUTE * minute) / 30;
        let frame = if minute == 0 {
            f10 - second * 30
        } else if second == 0 {
            // the first valid frame after a dropped minute boundary is 02
            2 + (f10 - FRAMES_FIRST_MINUTE - (minute - 1) * FRAMES_PER_DROP_MINUTE)
        } else {
            f10 + 2 * minute - minute * FRAMES_FIRST_MINUTE - second * 30
        };

        TimeCode {
            hour: self.time.hour() as u8,
            minute: (self.time.minute() / 10 * 10) as u8 + minute as u8,
            second: second as u8,
            frame: frame as u8,
            drop_frame: true,
        }
    }

    /// Count of whole frames elapsed since local midnight; the pump uses
    /// consecutive indices to detect duplicates and skips.
    pub fn frame_index(&self) -> i64 {
        if self.drop_frame {
            let windows = self.time.hour() as i64 * 6 + self.time.minute() as i64 / 10;
            windows * FRAMES_PER_DROP_WINDOW + self.window_frame_index()
        } else {
            let seconds = self.time.hour() as i64 * 3600
                + self.time.minute() as i64 * 60
                + self.time.second() as i64;
            (seconds as f64 * self.effective_fps()) as i64 + self.timecode().frame as i64
        }
    }

    /// The wall instant at which the current frame conceptually begins
    /// (local midnight + frame_index × frame_duration).
    pub fn frame_begin_time(&self) -> DateTime<Local> {
        let since_midnight = (self.time.hour() as i64 * 3600
            + self.time.minute() as i64 * 60
            + self.time.second() as i64)
            * NANOS_PER_SEC
            + self.time.nanosecond() as i64;
        let begin = self.frame_index() * self.frame_duration_nanos();
        self.time - TimeDelta::nanoseconds(since_midnight - begin)
    }

    /// Pack this frame into the 80-bit SMPTE LTC layout.
    ///
    /// Digit fields are written bit-reversed into their nibbles so bit 0 of
    /// each field is transmitted first; the sync word occupies the final two
    /// bytes, and one parity bit is set afterwards so the total count of one
    /// bits is even. Encoding is total over any valid frame.
    pub fn encode(&self) -> [u8; 10] {
        let tc = self.timecode();

        let (h_tens, h_ones) = to_bcd(tc.hour);
        let (m_tens, m_ones) = to_bcd(tc.minute);
        let (s_tens, s_ones) = to_bcd(tc.second);
        let (f_tens, f_ones) = to_bcd(tc.frame);

        let mut frame = [0u8; 10];

        // user-bits-present flag: bit 27 at 25 fps, bit 43 otherwise
        let mut b27 = 0u8;
        let mut b43 = 0u8;
        if let Some(user) = self.user_bytes {
            if self.frames_per_second == 25.0 {
                b27 = 1;
            } else {
                b43 = 1;
            }
            frame[0] |= user[0] & 0xF;
            frame[1] |= user[0] >> 4;
            frame[2] |= user[1] & 0xF;
            frame[3] |= user[1] >> 4;
            frame[4] |= user[2] & 0xF;
            frame[5] |= user[2] >> 4;
            frame[6] |= user[3] & 0xF;
            frame[7] |= user[3] >> 4;
        }

        frame[8] |= (SYNC_WORD >> 8) as u8;
        frame[9] |= (SYNC_WORD & 0xFF) as u8;

        frame[0] |= (f_ones & 0xF).reverse_bits();
        frame[1] |= (f_tens & 0x3).reverse_bits()
            | u8::from(self.drop_frame) << 5
            | u8::from(self.color_frame) << 4;
        frame[2] |= (s_ones & 0xF).reverse_bits();
        frame[3] |= (s_tens & 0x7).reverse_bits() | b27 << 4;
        frame[4] |= (m_ones & 0xF).reverse_bits();
        frame[5] |= (m_tens & 0x7).reverse_bits() | b43 << 4;
        frame[6] |= (h_ones & 0xF).reverse_bits();
        frame[7] |= (h_tens & 0x3).reverse_bits() | u8::from(self.external_clock_sync) << 5;

        let ones: u32 = frame.iter().map(|b| b.count_ones()).sum();
        if ones % 2 != 0 {
            if self.frames_per_second == 25.0 {
                frame[7] |= 0x10;
            } else {
                frame[3] |= 0x10;
            }
        }

        frame
    }
}
