//! VP8 RTP payload format: fragmentation, reassembly and wire helpers.
//!
//! Each encoded VP8 frame is split into one or more fragments. Every
//! fragment is prefixed with a 1-byte [`PayloadDescriptor`] and travels with
//! two pieces of transport metadata that are not part of the descriptor:
//!
//! - **Timestamp** (32-bit): 90 kHz media clock derived from the processing
//!   clock, identical on every fragment of a frame.
//! - **Marker bit**: set on the last fragment of a frame.
//!
//! ## Modules
//!
//! | Module | Role |
//! |--------|------|
//! | [`descriptor`] | 1-byte payload descriptor |
//! | [`packet`] | fragment + transport metadata |
//! | [`fragmenter`] | frame -> fragments |
//! | [`reassembler`] | fragments -> frames, one frame in flight |
//! | [`bitstream`] | keyframe header fields (size, scaling mode) |
//! | [`rtp`] | RFC 3550 fixed header read/write |

pub mod bitstream;
pub mod descriptor;
pub mod fragmenter;
pub mod packet;
pub mod reassembler;
pub mod rtp;

pub use descriptor::PayloadDescriptor;
pub use fragmenter::{Fragmenter, PartitionInfo};
pub use packet::Packet;
pub use reassembler::{AssembledFrame, Reassembler, ReassemblyStats};

/// RTP clock rate for video (RFC 3551 §5).
pub const CLOCK_RATE: u32 = 90_000;

/// Media timestamp for a processing-clock time in milliseconds.
///
/// 90 ticks per millisecond, truncated to 32 bits as on the wire.
pub fn rtp_timestamp(now_ms: u64) -> u32 {
    now_ms.wrapping_mul(u64::from(CLOCK_RATE / 1000)) as u32
}
