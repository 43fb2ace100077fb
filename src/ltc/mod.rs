//! SMPTE linear timecode frame model

mod frame;
mod timecode;

pub use frame::LtcFrame;
pub use timecode::TimeCode;

/// Sync pattern occupying bits 64 through 79 of every frame. Its run of 12
/// consecutive one bits cannot occur anywhere else in a frame, and the 00
/// prefix / 01 suffix let a reader tell forward from reverse playback.
pub const SYNC_WORD: u16 = 0x3FFD;
