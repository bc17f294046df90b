//! Utilities to manipulate generic memory

/// Generic address for the purpose of this module's methods.
/// Anything that can be offset by a usize and yield another
/// address works as an address.
pub trait Address: Copy + core::ops::Add<usize, Output = Self> {}
impl<A> Address for A where A: Copy + core::ops::Add<usize, Output = A> {}

/// Abstract region that can contain addresses
pub trait Region<A: Address> {
    fn contains(&self, address: A) -> bool;

    /// Whether the `length` bytes starting at `address` all fall inside the region.
    fn contains_range(&self, address: A, length: usize) -> bool {
        length == 0 || (self.contains(address) && self.contains(address + (length - 1)))
    }
}

/// Rounds `value` down to a multiple of `alignment` (a power of two).
pub const fn align_down(value: usize, alignment: usize) -> usize { value & !(alignment - 1) }

/// Rounds `value` up to a multiple of `alignment` (a power of two).
pub const fn align_up(value: usize, alignment: usize) -> usize {
    align_down(value + alignment - 1, alignment)
}

#[cfg(not(target_arch = "arm"))]
#[doc(hidden)]
pub mod doubles {
    use super::*;
    pub type FakeAddress = usize;

    #[derive(Debug, PartialEq)]
    pub struct FakeRegion {
        pub start: FakeAddress,
        pub size: usize,
    }

    impl Region<FakeAddress> for FakeRegion {
        fn contains(&self, address: FakeAddress) -> bool {
            (self.start <= address) && ((self.start + self.size) > address)
        }
    }
}
