//! Remote address newtype and the coarse address window of a target.
//!
//! A [`RemoteAddress`] is a plain number in another process's address space.
//! It is never turned into a local pointer; every access goes through
//! [`ReadMemory`](crate::process::ReadMemory).

use std::fmt;

use serde::Serialize;

use crate::image;
use crate::layout::range::ADDRESS_RANGE_MARGIN;
use crate::process::ReadMemory;

/// Address inside the target process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct RemoteAddress(u64);

impl RemoteAddress {
    pub const NULL: RemoteAddress = RemoteAddress(0);

    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_null(self) -> bool {
        self.0 == 0
    }

    /// Apply a signed displacement, wrapping like the CPU does.
    pub const fn offset(self, delta: i64) -> Self {
        Self(self.0.wrapping_add_signed(delta))
    }

    /// `None` for a null address, so pointer chains compose with `?`.
    pub fn non_null(self) -> Option<Self> {
        (!self.is_null()).then_some(self)
    }
}

impl From<u64> for RemoteAddress {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<RemoteAddress> for u64 {
    fn from(value: RemoteAddress) -> Self {
        value.0
    }
}

impl std::ops::Add<u64> for RemoteAddress {
    type Output = RemoteAddress;

    fn add(self, rhs: u64) -> Self::Output {
        RemoteAddress(self.0.wrapping_add(rhs))
    }
}

impl std::ops::Sub<RemoteAddress> for RemoteAddress {
    type Output = u64;

    fn sub(self, rhs: RemoteAddress) -> Self::Output {
        self.0.wrapping_sub(rhs.0)
    }
}

impl fmt::Display for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

impl fmt::LowerHex for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::LowerHex::fmt(&self.0, f)
    }
}

impl fmt::UpperHex for RemoteAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::UpperHex::fmt(&self.0, f)
    }
}

/// Coarse `[min, max)` window spanning the target's known modules.
///
/// Only used to reject pointer-looking values that cannot belong to the
/// process. It is not a safety boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AddressRange {
    pub min: u64,
    pub max: u64,
}

impl AddressRange {
    /// A range that contains nothing; widening it adopts the first module.
    pub const EMPTY: AddressRange = AddressRange {
        min: u64::MAX,
        max: 0,
    };

    pub const fn new(min: u64, max: u64) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.min >= self.max
    }

    /// Strict containment, matching how free-list candidates are filtered.
    pub fn contains(&self, address: RemoteAddress) -> bool {
        address.get() > self.min && address.get() < self.max
    }

    /// Grow the window to cover `[base - margin, base + size + margin)`.
    pub fn widen(&mut self, base: RemoteAddress, size: u64, margin: u64) {
        let low = base.get().saturating_sub(margin);
        let high = base.get().saturating_add(size).saturating_add(margin);
        self.min = self.min.min(low);
        self.max = self.max.max(high);
    }

    /// Window over every given module base, sized from its ELF bookkeeping.
    pub fn from_modules<R, I>(reader: &R, bases: I) -> Self
    where
        R: ReadMemory,
        I: IntoIterator<Item = RemoteAddress>,
    {
        let mut range = Self::EMPTY;
        for base in bases {
            let size = image::module_size(reader, base);
            range.widen(base, size, ADDRESS_RANGE_MARGIN);
        }
        range
    }
}

impl Default for AddressRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl fmt::Display for AddressRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "[empty]")
        } else {
            write!(f, "[0x{:x}, 0x{:x})", self.min, self.max)
        }
    }
}
