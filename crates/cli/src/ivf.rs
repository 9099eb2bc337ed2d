//! Minimal IVF container reader.
//!
//! ```text
//! file header (32 bytes, little endian)
//!   0  "DKIF"      4  version (0)   6  header length (32)
//!   8  fourcc      12 width, height 16 timebase denominator
//!   20 timebase numerator           24 frame count
//! frame header (12 bytes)
//!   0  frame size (u32)             4  presentation timestamp (u64)
//! ```

use std::io::{ErrorKind, Read};

use bytes::Bytes;
use vp8rtp::{Dimensions, ParseErrorKind, Result, Vp8Error};

const SIGNATURE: &[u8; 4] = b"DKIF";
const FILE_HEADER_LEN: usize = 32;
const FRAME_HEADER_LEN: usize = 12;

/// Frames larger than this are treated as corruption.
const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

fn invalid(what: &'static str) -> Vp8Error {
    Vp8Error::Parse {
        kind: ParseErrorKind::InvalidContainer(what),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IvfHeader {
    pub fourcc: [u8; 4],
    pub size: Dimensions,
    pub timebase_num: u32,
    pub timebase_den: u32,
    pub frame_count: u32,
}

impl IvfHeader {
    /// Convert a frame timestamp to milliseconds.
    pub fn pts_to_ms(&self, pts: u64) -> u64 {
        if self.timebase_den == 0 {
            return 0;
        }
        (u128::from(pts) * 1000 * u128::from(self.timebase_num) / u128::from(self.timebase_den))
            as u64
    }
}

#[derive(Debug, Clone)]
pub struct IvfFrame {
    pub pts: u64,
    pub data: Bytes,
}

pub struct IvfReader<R> {
    inner: R,
    header: IvfHeader,
}

impl<R: Read> IvfReader<R> {
    pub fn new(mut inner: R) -> Result<Self> {
        let mut buf = [0u8; FILE_HEADER_LEN];
        inner.read_exact(&mut buf).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => invalid("file header truncated"),
            _ => e.into(),
        })?;
        if &buf[0..4] != SIGNATURE {
            return Err(invalid("missing DKIF signature"));
        }
        let header_len = u16::from_le_bytes([buf[6], buf[7]]) as usize;
        if header_len < FILE_HEADER_LEN {
            return Err(invalid("header length too small"));
        }
        let u16_at = |i: usize| u16::from_le_bytes([buf[i], buf[i + 1]]);
        let u32_at = |i: usize| u32::from_le_bytes([buf[i], buf[i + 1], buf[i + 2], buf[i + 3]]);
        let header = IvfHeader {
            fourcc: [buf[8], buf[9], buf[10], buf[11]],
            size: Dimensions::new(u32::from(u16_at(12)), u32::from(u16_at(14))),
            timebase_den: u32_at(16),
            timebase_num: u32_at(20),
            frame_count: u32_at(24),
        };

        // Skip any header extension.
        let extra = header_len - FILE_HEADER_LEN;
        if extra > 0 {
            let copied = std::io::copy(&mut (&mut inner).take(extra as u64), &mut std::io::sink())?;
            if copied as usize != extra {
                return Err(invalid("file header truncated"));
            }
        }

        tracing::debug!(
            fourcc = %String::from_utf8_lossy(&header.fourcc),
            size = %header.size,
            frames = header.frame_count,
            "IVF header read"
        );
        Ok(Self { inner, header })
    }

    pub fn header(&self) -> &IvfHeader {
        &self.header
    }

    /// Read the next frame, or `None` at a clean end of file.
    pub fn next_frame(&mut self) -> Result<Option<IvfFrame>> {
        let mut hdr = [0u8; FRAME_HEADER_LEN];
        let mut filled = 0;
        while filled < FRAME_HEADER_LEN {
            match self.inner.read(&mut hdr[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(invalid("frame header truncated")),
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }

        let len = u32::from_le_bytes([hdr[0], hdr[1], hdr[2], hdr[3]]) as usize;
        if len > MAX_FRAME_LEN {
            return Err(invalid("frame size out of range"));
        }
        let pts = u64::from_le_bytes([
            hdr[4], hdr[5], hdr[6], hdr[7], hdr[8], hdr[9], hdr[10], hdr[11],
        ]);

        let mut data = vec![0u8; len];
        self.inner.read_exact(&mut data).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => invalid("frame data truncated"),
            _ => e.into(),
        })?;
        Ok(Some(IvfFrame {
            pts,
            data: Bytes::from(data),
        }))
    }
}

impl<R: Read> Iterator for IvfReader<R> {
    type Item = Result<IvfFrame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame().transpose()
    }
}
