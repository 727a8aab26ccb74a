// THEORY:
// The `PixelBuffer` is the fundamental data object of the preprocessing layer:
// a "dumb" owned RGBA frame with just enough accessors for the stages built on
// top of it. Every pipeline stage consumes one buffer and produces a new,
// independently-owned buffer — ownership transfer instead of shared in-place
// mutation — so each stage can be unit-tested against a fixed input snapshot.
//
// After the grayscale stage every pixel satisfies R=G=B and A=255, and all
// later stages read only the red channel as the grayscale proxy.

pub type Byte = u8;
pub type Gray = u8;

const CHANNELS: usize = 4;

/// An owned, row-major RGBA8 frame.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<Byte>,
}

impl PixelBuffer {
    /// Wraps a raw RGBA byte buffer. Returns `None` when the dimensions are
    /// zero or the byte length does not match `width × height × 4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<Byte>) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }
        if data.len() != width as usize * height as usize * CHANNELS {
            return None;
        }
        Some(Self {
            width,
            height,
            data,
        })
    }

    /// A zero-filled (black, transparent) buffer of the given dimensions.
    pub fn blank(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![0; width as usize * height as usize * CHANNELS],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[Byte] {
        &self.data
    }

    pub fn into_data(self) -> Vec<Byte> {
        self.data
    }

    #[inline]
    fn byte_index(&self, x: u32, y: u32) -> usize {
        ((y * self.width + x) as usize) * CHANNELS
    }

    /// The red/green/blue/alpha bytes at `(x, y)`. Callers must stay in bounds.
    #[inline]
    pub fn rgba(&self, x: u32, y: u32) -> (Byte, Byte, Byte, Byte) {
        let i = self.byte_index(x, y);
        (self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3])
    }

    /// The grayscale value at `(x, y)`, read from the red channel. Only
    /// meaningful once the grayscale stage has run.
    #[inline]
    pub fn gray(&self, x: u32, y: u32) -> Gray {
        self.data[self.byte_index(x, y)]
    }

    /// Writes `value` to R, G and B and forces alpha opaque.
    #[inline]
    pub fn set_gray(&mut self, x: u32, y: u32, value: Gray) {
        let i = self.byte_index(x, y);
        self.data[i] = value;
        self.data[i + 1] = value;
        self.data[i + 2] = value;
        self.data[i + 3] = 255;
    }

    /// Whether the pixel counts as part of the trace during centroid and
    /// density computation.
    #[inline]
    pub fn is_foreground(&self, x: u32, y: u32, cutoff: Gray) -> bool {
        self.gray(x, y) >= cutoff
    }
}
