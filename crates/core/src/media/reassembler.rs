use bytes::{Bytes, BytesMut};

use super::descriptor::PayloadDescriptor;
use super::packet::Packet;

/// A complete frame rebuilt from fragments sharing one timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledFrame {
    pub data: Bytes,
    pub timestamp: u32,
    /// Taken from the N bit of the fragment that started the frame.
    pub is_keyframe: bool,
}

/// Counters for what the reassembler delivered and threw away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblyStats {
    pub frames_emitted: u64,
    /// Partial frames dropped because a fragment of another frame arrived.
    pub frames_discarded: u64,
    /// Fragments dropped because no frame start had been seen.
    pub packets_discarded: u64,
}

#[derive(Debug)]
struct PartialFrame {
    timestamp: u32,
    is_keyframe: bool,
    chunks: Vec<Bytes>,
    len: usize,
}

impl PartialFrame {
    fn start(descriptor: PayloadDescriptor, payload: Bytes, timestamp: u32) -> Self {
        Self {
            timestamp,
            is_keyframe: descriptor.is_keyframe(),
            len: payload.len(),
            chunks: vec![payload],
        }
    }

    fn append(&mut self, payload: Bytes) {
        self.len += payload.len();
        self.chunks.push(payload);
    }

    fn finish(mut self) -> AssembledFrame {
        let data = if self.chunks.len() == 1 {
            self.chunks.pop().unwrap_or_default()
        } else {
            let mut buf = BytesMut::with_capacity(self.len);
            for chunk in &self.chunks {
                buf.extend_from_slice(chunk);
            }
            buf.freeze()
        };
        AssembledFrame {
            data,
            timestamp: self.timestamp,
            is_keyframe: self.is_keyframe,
        }
    }
}

/// Rebuilds VP8 frames from an in-order stream of descriptor-tagged fragments.
///
/// At most one frame is under reconstruction at a time. Fragments of
/// interleaved frames are not supported: a fragment whose timestamp differs
/// from the pending frame ends that frame, which is discarded without being
/// emitted. Recovery from loss is left to the next keyframe.
///
/// ```text
/// Idle          S=1 M=0             -> start buffer          -> Accumulating
/// Idle          S=1 M=1             -> emit fragment         -> Idle
/// Idle          S=0                 -> drop fragment         -> Idle
/// Accumulating  same ts, M=0        -> append                -> Accumulating
/// Accumulating  same ts, M=1        -> append, emit          -> Idle
/// Accumulating  other ts            -> discard buffer, then handle as Idle
/// ```
#[derive(Debug, Default)]
pub struct Reassembler {
    pending: Option<PartialFrame>,
    stats: ReassemblyStats,
}

impl Reassembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment. Returns a frame when this fragment completes one.
    pub fn push(&mut self, packet: Packet) -> Option<AssembledFrame> {
        let Packet {
            descriptor,
            payload,
            timestamp,
            marker,
        } = packet;

        match self.pending.take() {
            Some(mut partial) if partial.timestamp == timestamp => {
                partial.append(payload);
                if marker {
                    Some(self.emit(partial))
                } else {
                    self.pending = Some(partial);
                    None
                }
            }
            Some(stale) => {
                tracing::debug!(
                    pending_ts = stale.timestamp,
                    ts = timestamp,
                    fragments = stale.chunks.len(),
                    "incomplete frame discarded"
                );
                self.stats.frames_discarded += 1;
                self.start_or_drop(descriptor, payload, timestamp, marker)
            }
            None => self.start_or_drop(descriptor, payload, timestamp, marker),
        }
    }

    /// Drop any partial frame without emitting it.
    pub fn reset(&mut self) {
        if self.pending.take().is_some() {
            self.stats.frames_discarded += 1;
        }
    }

    /// Timestamp of the frame under reconstruction, if any.
    pub fn pending_timestamp(&self) -> Option<u32> {
        self.pending.as_ref().map(|p| p.timestamp)
    }

    pub fn stats(&self) -> ReassemblyStats {
        self.stats
    }

    fn start_or_drop(
        &mut self,
        descriptor: PayloadDescriptor,
        payload: Bytes,
        timestamp: u32,
        marker: bool,
    ) -> Option<AssembledFrame> {
        if !descriptor.start {
            tracing::trace!(ts = timestamp, marker, "fragment without frame start dropped");
            self.stats.packets_discarded += 1;
            return None;
        }

        let partial = PartialFrame::start(descriptor, payload, timestamp);
        if marker {
            Some(self.emit(partial))
        } else {
            self.pending = Some(partial);
            None
        }
    }

    fn emit(&mut self, partial: PartialFrame) -> AssembledFrame {
        self.stats.frames_emitted += 1;
        let frame = partial.finish();
        tracing::trace!(
            ts = frame.timestamp,
            bytes = frame.data.len(),
            keyframe = frame.is_keyframe,
            "frame reassembled"
        );
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkt(start: bool, marker: bool, ts: u32, payload: &'static [u8]) -> Packet {
        Packet::new(
            PayloadDescriptor::new(true, start, 0),
            Bytes::from_static(payload),
            ts,
            marker,
        )
    }

    #[test]
    fn single_fragment_frame() {
        let mut r = Reassembler::new();
        let frame = r.push(pkt(true, true, 100, b"AB")).unwrap();
        assert_eq!(&frame.data[..], b"AB");
        assert_eq!(frame.timestamp, 100);
        assert!(r.pending_timestamp().is_none());
    }

    #[test]
    fn two_fragments_same_timestamp() {
        let mut r = Reassembler::new();
        assert!(r.push(pkt(true, false, 100, b"AB")).is_none());
        assert_eq!(r.pending_timestamp(), Some(100));
        let frame = r.push(pkt(false, true, 100, b"CD")).unwrap();
        assert_eq!(&frame.data[..], b"ABCD");
        assert_eq!(r.stats().frames_emitted, 1);
        assert!(r.pending_timestamp().is_none());
    }

    #[test]
    fn lost_tail_then_complete_frame() {
        let mut r = Reassembler::new();
        assert!(r.push(pkt(true, false, 100, b"AB")).is_none());
        let frame = r.push(pkt(true, true, 200, b"XY")).unwrap();
        assert_eq!(&frame.data[..], b"XY");
        assert_eq!(frame.timestamp, 200);
        assert_eq!(r.stats().frames_discarded, 1);
    }

    #[test]
    fn idle_without_start_drops() {
        let mut r = Reassembler::new();
        assert!(r.push(pkt(false, false, 100, b"AB")).is_none());
        assert!(r.push(pkt(false, true, 100, b"CD")).is_none());
        assert!(r.pending_timestamp().is_none());
        assert_eq!(r.stats().packets_discarded, 2);
    }

    #[test]
    fn mismatch_with_start_begins_new_frame() {
        let mut r = Reassembler::new();
        r.push(pkt(true, false, 100, b"AB"));
        assert!(r.push(pkt(true, false, 200, b"XY")).is_none());
        assert_eq!(r.pending_timestamp(), Some(200));
        let frame = r.push(pkt(false, true, 200, b"Z")).unwrap();
        assert_eq!(&frame.data[..], b"XYZ");
    }

    #[test]
    fn mismatch_without_start_goes_idle() {
        let mut r = Reassembler::new();
        r.push(pkt(true, false, 100, b"AB"));
        assert!(r.push(pkt(false, false, 200, b"XY")).is_none());
        assert!(r.pending_timestamp().is_none());
        let stats = r.stats();
        assert_eq!(stats.frames_discarded, 1);
        assert_eq!(stats.packets_discarded, 1);
    }

    #[test]
    fn mismatch_marker_without_start_is_unrecoverable() {
        let mut r = Reassembler::new();
        r.push(pkt(true, false, 100, b"AB"));
        assert!(r.push(pkt(false, true, 200, b"XY")).is_none());
        assert!(r.pending_timestamp().is_none());
        // The next frame still comes through.
        let frame = r.push(pkt(true, true, 300, b"OK")).unwrap();
        assert_eq!(&frame.data[..], b"OK");
    }

    #[test]
    fn keyframe_flag_from_starting_fragment() {
        let mut r = Reassembler::new();
        let first = Packet::new(
            PayloadDescriptor::new(false, true, 0),
            Bytes::from_static(b"A"),
            5,
            false,
        );
        r.push(first);
        let frame = r.push(pkt(false, true, 5, b"B")).unwrap();
        assert!(!frame.is_keyframe);
    }

    #[test]
    fn reset_discards_pending() {
        let mut r = Reassembler::new();
        r.push(pkt(true, false, 100, b"AB"));
        r.reset();
        assert!(r.pending_timestamp().is_none());
        assert!(r.push(pkt(false, true, 100, b"CD")).is_none());
        assert_eq!(r.stats().frames_discarded, 1);
    }

    #[test]
    fn frame_emitted_once() {
        let mut r = Reassembler::new();
        r.push(pkt(true, false, 100, b"AB"));
        assert!(r.push(pkt(false, true, 100, b"CD")).is_some());
        assert!(r.push(pkt(false, true, 100, b"EF")).is_none());
        assert_eq!(r.stats().frames_emitted, 1);
    }
}
