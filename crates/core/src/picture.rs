//! Picture geometry and planar YUV buffers exchanged with the codec engine
//! and scaler collaborators.

use std::fmt;

/// CIF width, the default picture width.
pub const CIF_WIDTH: u32 = 352;
/// CIF height, the default picture height.
pub const CIF_HEIGHT: u32 = 288;

/// Width and height of a picture in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub const CIF: Dimensions = Dimensions::new(CIF_WIDTH, CIF_HEIGHT);

    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::CIF
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// An I420 (YUV 4:2:0 planar) picture.
///
/// Planes are stored back to back in `data`: Y (`width * height`), then U
/// and V (`ceil(width / 2) * ceil(height / 2)` each).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YuvPicture {
    pub size: Dimensions,
    pub data: Vec<u8>,
}

impl YuvPicture {
    /// Allocate a zeroed picture of the given size.
    pub fn alloc(size: Dimensions) -> Self {
        Self {
            size,
            data: vec![0; Self::buffer_len(size)],
        }
    }

    /// Number of bytes an I420 picture of this size occupies.
    pub fn buffer_len(size: Dimensions) -> usize {
        let luma = size.width as usize * size.height as usize;
        let chroma = size.width.div_ceil(2) as usize * size.height.div_ceil(2) as usize;
        luma + 2 * chroma
    }

    /// Split into `(y, u, v)` plane slices.
    pub fn planes(&self) -> (&[u8], &[u8], &[u8]) {
        let (luma, chroma) = self.plane_lengths();
        let (y, rest) = self.data.split_at(luma);
        let (u, v) = rest.split_at(chroma.min(rest.len()));
        (y, u, v)
    }

    /// Mutable variant of [`planes`](Self::planes).
    pub fn planes_mut(&mut self) -> (&mut [u8], &mut [u8], &mut [u8]) {
        let (luma, chroma) = self.plane_lengths();
        let (y, rest) = self.data.split_at_mut(luma);
        let at = chroma.min(rest.len());
        let (u, v) = rest.split_at_mut(at);
        (y, u, v)
    }

    fn plane_lengths(&self) -> (usize, usize) {
        let luma = self.size.width as usize * self.size.height as usize;
        let chroma =
            self.size.width.div_ceil(2) as usize * self.size.height.div_ceil(2) as usize;
        (luma.min(self.data.len()), chroma)
    }
}
