/// Extended control bits present (always 0 on output).
pub const X_MASK: u8 = 0x80;
/// Reserved bit (always 0 on output).
pub const RSV_MASK: u8 = 0x40;
/// Non-reference frame.
pub const N_MASK: u8 = 0x20;
/// Start of a partition.
pub const S_MASK: u8 = 0x10;
/// Partition index.
pub const PART_ID_MASK: u8 = 0x0F;

/// One-byte VP8 payload descriptor prefixed to every transport fragment.
///
/// ```text
///  0 1 2 3 4 5 6 7
/// +-+-+-+-+-+-+-+-+
/// |X|R|N|S|PartID |
/// +-+-+-+-+-+-+-+-+
/// ```
///
/// - **X**, **R**: reserved, written as 0 and ignored on input.
/// - **N**: set when the frame is not a keyframe.
/// - **S**: set on the fragment that starts the frame (or partition).
/// - **PartID**: partition index, masked to 4 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PayloadDescriptor {
    pub non_reference: bool,
    pub start: bool,
    pub partition_id: u8,
}

impl PayloadDescriptor {
    pub fn new(is_keyframe: bool, start: bool, partition_id: u8) -> Self {
        Self {
            non_reference: !is_keyframe,
            start,
            partition_id: partition_id & PART_ID_MASK,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        !self.non_reference
    }

    pub fn to_byte(self) -> u8 {
        let mut byte = self.partition_id & PART_ID_MASK;
        if self.non_reference {
            byte |= N_MASK;
        }
        if self.start {
            byte |= S_MASK;
        }
        byte
    }

    /// Decode a descriptor byte. X and R are not interpreted.
    pub fn from_byte(byte: u8) -> Self {
        Self {
            non_reference: byte & N_MASK != 0,
            start: byte & S_MASK != 0,
            partition_id: byte & PART_ID_MASK,
        }
    }
}

impl From<u8> for PayloadDescriptor {
    fn from(byte: u8) -> Self {
        Self::from_byte(byte)
    }
}

impl From<PayloadDescriptor> for u8 {
    fn from(desc: PayloadDescriptor) -> Self {
        desc.to_byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyframe_start_partition_zero() {
        let desc = PayloadDescriptor::new(true, true, 0);
        assert_eq!(desc.to_byte(), 0x10);
    }

    #[test]
    fn non_reference_continuation() {
        let desc = PayloadDescriptor::new(false, false, 3);
        assert_eq!(desc.to_byte(), 0x23);
    }

    #[test]
    fn partition_id_is_masked() {
        let desc = PayloadDescriptor::new(true, false, 0x1F);
        assert_eq!(desc.partition_id, 0x0F);
        assert_eq!(desc.to_byte() & PART_ID_MASK, 0x0F);
    }

    #[test]
    fn reserved_bits_never_written() {
        for pid in 0..=255u8 {
            for key in [false, true] {
                for start in [false, true] {
                    let byte = PayloadDescriptor::new(key, start, pid).to_byte();
                    assert_eq!(byte & (X_MASK | RSV_MASK), 0);
                }
            }
        }
    }

    #[test]
    fn reserved_bits_ignored_on_input() {
        let desc = PayloadDescriptor::from_byte(0xF5);
        assert!(desc.non_reference);
        assert!(desc.start);
        assert_eq!(desc.partition_id, 5);
    }
}
