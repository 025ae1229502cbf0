//! Sample widths and their arithmetic
//!
//! One [`Sample`] implementation per supported width. Arithmetic follows
//! the width: unsigned 8-bit and signed 32-bit wrap on overflow, signed
//! 16-bit saturates.

/// Sample width the dispatch engine is specialised for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleWidth {
    /// Unsigned 8-bit
    W8,
    /// Signed 16-bit
    W16,
    /// Signed 32-bit
    W32,
}

impl SampleWidth {
    pub fn from_bytes(bytes: u8) -> Option<Self> {
        match bytes {
            1 => Some(SampleWidth::W8),
            2 => Some(SampleWidth::W16),
            4 => Some(SampleWidth::W32),
            _ => None,
        }
    }

    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            8 => Some(SampleWidth::W8),
            16 => Some(SampleWidth::W16),
            32 => Some(SampleWidth::W32),
            _ => None,
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            SampleWidth::W8 => 1,
            SampleWidth::W16 => 2,
            SampleWidth::W32 => 4,
        }
    }

    pub fn bits(self) -> u8 {
        self.bytes() as u8 * 8
    }
}

/// A sample type the dispatch loops are monomorphised over.
///
/// Multi-byte samples are stored little-endian.
pub trait Sample: Copy + Send + Sync + 'static {
    /// Stored size in bytes
    const BYTES: usize;

    /// Read from the first `BYTES` bytes of `bytes`
    fn read(bytes: &[u8]) -> Self;

    /// Write into the first `BYTES` bytes of `out`
    fn write(self, out: &mut [u8]);

    /// Convert a channel map literal to this width
    fn from_constant(value: i32) -> Self;

    fn mix_add(self, other: Self) -> Self;

    fn mix_sub(self, other: Self) -> Self;

    fn add_constant(self, value: i32) -> Self;

    fn sub_constant(self, value: i32) -> Self;
}

impl Sample for u8 {
    const BYTES: usize = 1;

    #[inline]
    fn read(bytes: &[u8]) -> Self {
        bytes[0]
    }

    #[inline]
    fn write(self, out: &mut [u8]) {
        out[0] = self;
    }

    #[inline]
    fn from_constant(value: i32) -> Self {
        value as u8
    }

    #[inline]
    fn mix_add(self, other: Self) -> Self {
        self.wrapping_add(other)
    }

    #[inline]
    fn mix_sub(self, other: Self) -> Self {
        self.wrapping_sub(other)
    }

    #[inline]
    fn add_constant(self, value: i32) -> Self {
        self.wrapping_add(value as u8)
    }

    #[inline]
    fn sub_constant(self, value: i32) -> Self {
        self.wrapping_sub(value as u8)
    }
}

impl Sample for i16 {
    const BYTES: usize = 2;

    #[inline]
    fn read(bytes: &[u8]) -> Self {
        i16::from_le_bytes([bytes[0], bytes[1]])
    }

    #[inline]
    fn write(self, out: &mut [u8]) {
        out[..2].copy_from_slice(&self.to_le_bytes());
    }

    #[inline]
    fn from_constant(value: i32) -> Self {
        clamp_i16(value as i64)
    }

    #[inline]
    fn mix_add(self, other: Self) -> Self {
        self.saturating_add(other)
    }

    #[inline]
    fn mix_sub(self, other: Self) -> Self {
        self.saturating_sub(other)
    }

    #[inline]
    fn add_constant(self, value: i32) -> Self {
        clamp_i16(self as i64 + value as i64)
    }

    #[inline]
    fn sub_constant(self, value: i32) -> Self {
        clamp_i16(self as i64 - value as i64)
    }
}

impl Sample for i32 {
    const BYTES: usize = 4;

    #[inline]
    fn read(bytes: &[u8]) -> Self {
        i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }

    #[inline]
    fn write(self, out: &mut [u8]) {
        out[..4].copy_from_slice(&self.to_le_bytes());
    }

    #[inline]
    fn from_constant(value: i32) -> Self {
        value
    }

    #[inline]
    fn mix_add(self, other: Self) -> Self {
        self.wrapping_add(other)
    }

    #[inline]
    fn mix_sub(self, other: Self) -> Self {
        self.wrapping_sub(other)
    }

    #[inline]
    fn add_constant(self, value: i32) -> Self {
        self.wrapping_add(value)
    }

    #[inline]
    fn sub_constant(self, value: i32) -> Self {
        self.wrapping_sub(value)
    }
}

#[inline]
fn clamp_i16(value: i64) -> i16 {
    value.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}
