//! Fixed-size values that can be copied out of (and into) remote memory.

use crate::address::RemoteAddress;

/// A value with a fixed little-endian byte representation.
///
/// Implemented for the primitive integers, floats, `bool`, [`RemoteAddress`]
/// and arrays of any of those. Reads that fail produce [`Plain::zeroed`].
pub trait Plain: Copy {
    const SIZE: usize;

    /// Decode from exactly `SIZE` bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    fn write_le(&self, out: &mut Vec<u8>);

    fn zeroed() -> Self;

    fn to_le_vec(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SIZE);
        self.write_le(&mut out);
        out
    }
}

macro_rules! impl_plain {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Plain for $ty {
                const SIZE: usize = std::mem::size_of::<$ty>();

                fn from_le_slice(bytes: &[u8]) -> Self {
                    let mut raw = [0u8; std::mem::size_of::<$ty>()];
                    raw.copy_from_slice(&bytes[..Self::SIZE]);
                    <$ty>::from_le_bytes(raw)
                }

                fn write_le(&self, out: &mut Vec<u8>) {
                    out.extend_from_slice(&self.to_le_bytes());
                }

                fn zeroed() -> Self {
                    0 as $ty
                }
            }
        )*
    };
}

impl_plain!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64);

impl Plain for bool {
    const SIZE: usize = 1;

    fn from_le_slice(bytes: &[u8]) -> Self {
        bytes[0] != 0
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        out.push(u8::from(*self));
    }

    fn zeroed() -> Self {
        false
    }
}

impl Plain for RemoteAddress {
    const SIZE: usize = 8;

    fn from_le_slice(bytes: &[u8]) -> Self {
        RemoteAddress::new(u64::from_le_slice(bytes))
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        self.get().write_le(out);
    }

    fn zeroed() -> Self {
        RemoteAddress::NULL
    }
}

impl<T: Plain, const N: usize> Plain for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn from_le_slice(bytes: &[u8]) -> Self {
        std::array::from_fn(|i| T::from_le_slice(&bytes[i * T::SIZE..(i + 1) * T::SIZE]))
    }

    fn write_le(&self, out: &mut Vec<u8>) {
        for item in self {
            item.write_le(out);
        }
    }

    fn zeroed() -> Self {
        [T::zeroed(); N]
    }
}
