use std::{cmp, ops};

/// Fixed-size set of flags packed into an unsigned int.
pub trait Bitmask:
    Sized
    + 'static
    + Copy
    + Default
    + cmp::PartialEq
    + ops::Shl<usize, Output = Self>
    + ops::Shr<usize, Output = Self>
    + ops::BitOr<Self, Output = Self>
    + ops::BitOrAssign<Self>
    + ops::Not<Output = Self>
    + ops::BitAnd<Self, Output = Self>
    + ops::BitAndAssign<Self>
{
    /// Number of bits contained in this type
    const BITS: usize;

    /// Reference to the number one
    const ONE: Self;

    /// return true if the i'th bit is set
    #[inline]
    fn get(&self, i: usize) -> bool {
        debug_assert!(i < Self::BITS);
        (*self >> i) & Self::ONE == Self::ONE
    }

    /// set the i'th bit to true
    #[inline]
    fn set(&mut self, i: usize) {
        debug_assert!(i < Self::BITS);
        *self |= Self::ONE << i;
    }

    /// set the i'th bit to false
    #[inline]
    fn unset(&mut self, i: usize) {
        debug_assert!(i < Self::BITS);
        *self &= !(Self::ONE << i);
    }

    /// number of bits set
    fn count(&self) -> usize {
        (0..Self::BITS).filter(|&i| self.get(i)).count()
    }

    /// true if no bits are set
    #[inline]
    fn is_clear(&self) -> bool {
        *self == Self::default()
    }
}

impl Bitmask for u16 {
    const BITS: usize = u16::BITS as usize;
    const ONE: Self = 1;
}
