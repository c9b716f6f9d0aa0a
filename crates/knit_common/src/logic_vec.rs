//! Packed vectors of 4-state logic values, used to read back wired values.

use crate::logic::Logic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The bits carried by a signal range, least significant first.
///
/// Two bits per value, 32 values to a word; the encoding is the
/// discriminant of [`Logic`].
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LogicVec {
    width: u32,
    words: Vec<u64>,
}

const PER_WORD: u32 = 32;

impl LogicVec {
    /// `width` zero bits.
    pub fn new(width: u32) -> Self {
        Self::filled(width, Logic::Zero)
    }

    /// `width` copies of `value`.
    pub fn filled(width: u32, value: Logic) -> Self {
        let mut word = 0u64;
        for i in 0..PER_WORD {
            word |= (value as u64) << (2 * i);
        }
        Self {
            width,
            words: vec![word; width.div_ceil(PER_WORD) as usize],
        }
    }

    /// `width` undriven bits.
    pub fn all_z(width: u32) -> Self {
        Self::filled(width, Logic::Z)
    }

    /// Number of bits.
    pub fn width(&self) -> u32 {
        self.width
    }

    fn slot(&self, index: u32) -> (usize, u32) {
        assert!(
            index < self.width,
            "bit {index} past the end of a {}-bit value",
            self.width
        );
        ((index / PER_WORD) as usize, (index % PER_WORD) * 2)
    }

    /// The value of bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn get(&self, index: u32) -> Logic {
        let (word, shift) = self.slot(index);
        match (self.words[word] >> shift) & 0b11 {
            0 => Logic::Zero,
            1 => Logic::One,
            2 => Logic::X,
            _ => Logic::Z,
        }
    }

    /// Overwrites bit `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.width()`.
    pub fn set(&mut self, index: u32, value: Logic) {
        let (word, shift) = self.slot(index);
        let w = &mut self.words[word];
        *w = (*w & !(0b11 << shift)) | ((value as u64) << shift);
    }

    /// Iterates over the bits, least significant first.
    pub fn iter(&self) -> impl Iterator<Item = Logic> + '_ {
        (0..self.width).map(|i| self.get(i))
    }

    /// The low `width` bits of `value`; bits past 64 are zero.
    pub fn from_u64(value: u64, width: u32) -> Self {
        let mut v = Self::new(width);
        (0..width.min(64))
            .filter(|i| (value >> i) & 1 == 1)
            .for_each(|i| v.set(i, Logic::One));
        v
    }

    /// The value as an integer, if it fits and every bit is `0` or `1`.
    pub fn to_u64(&self) -> Option<u64> {
        if self.width > 64 {
            return None;
        }
        self.iter().enumerate().try_fold(0u64, |acc, (i, bit)| match bit {
            Logic::Zero => Some(acc),
            Logic::One => Some(acc | 1 << i),
            Logic::X | Logic::Z => None,
        })
    }

    /// Parses `"10XZ"`-style text, most significant bit first.
    pub fn from_binary_str(s: &str) -> Option<Self> {
        let mut v = Self::new(s.chars().count() as u32);
        for (i, c) in s.chars().rev().enumerate() {
            v.set(i as u32, Logic::from_char(c)?);
        }
        Some(v)
    }

    /// Bits `lo..lo + width`.
    ///
    /// # Panics
    ///
    /// Panics if the window runs past the end.
    pub fn slice(&self, lo: u32, width: u32) -> LogicVec {
        let mut out = LogicVec::new(width);
        for i in 0..width {
            out.set(i, self.get(lo + i));
        }
        out
    }

    /// Merges `other` into the bits from `lo` as one more driver.
    pub fn resolve_at(&mut self, lo: u32, other: &LogicVec) {
        for (i, bit) in other.iter().enumerate() {
            let at = lo + i as u32;
            self.set(at, self.get(at).resolve(bit));
        }
    }
}

impl fmt::Display for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        (0..self.width)
            .rev()
            .try_for_each(|i| write!(f, "{}", self.get(i)))
    }
}

impl fmt::Debug for LogicVec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}'b{self}", self.width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_get_roundtrip() {
        let mut v = LogicVec::new(4);
        v.set(1, Logic::One);
        v.set(2, Logic::X);
        v.set(3, Logic::Z);
        assert_eq!(v.get(0), Logic::Zero);
        assert_eq!(v.get(1), Logic::One);
        assert_eq!(v.get(2), Logic::X);
        assert_eq!(v.get(3), Logic::Z);
    }

    #[test]
    fn binary_str_msb_first() {
        let v = LogicVec::from_binary_str("10XZ").unwrap();
        assert_eq!(v.get(3), Logic::One);
        assert_eq!(v.get(0), Logic::Z);
        assert_eq!(format!("{v}"), "10XZ");
        assert!(LogicVec::from_binary_str("10A1").is_none());
    }

    #[test]
    fn slice_extracts_window() {
        let v = LogicVec::from_u64(0b1011_0110, 8);
        assert_eq!(v.slice(4, 4).to_u64(), Some(0b1011));
        assert_eq!(v.slice(1, 3).to_u64(), Some(0b011));
    }

    #[test]
    fn resolve_at_merges_drivers() {
        let mut v = LogicVec::all_z(4);
        v.resolve_at(0, &LogicVec::from_u64(0b01, 2));
        assert_eq!(format!("{v}"), "ZZ01");
        v.resolve_at(1, &LogicVec::from_u64(0b11, 2));
        assert_eq!(format!("{v}"), "Z1X1");
    }

    #[test]
    fn to_u64_rejects_unknown() {
        assert_eq!(LogicVec::all_z(3).to_u64(), None);
        assert_eq!(LogicVec::from_u64(5, 3).to_u64(), Some(5));
    }

    #[test]
    fn large_width_spanning_words() {
        let mut v = LogicVec::all_z(100);
        v.set(0, Logic::One);
        v.set(99, Logic::Zero);
        assert_eq!(v.get(0), Logic::One);
        assert_eq!(v.get(50), Logic::Z);
        assert_eq!(v.get(99), Logic::Zero);
    }

    #[test]
    fn serde_roundtrip() {
        let v = LogicVec::from_binary_str("10XZ1010").unwrap();
        let json = serde_json::to_string(&v).unwrap();
        let back: LogicVec = serde_json::from_str(&json).unwrap();
        assert_eq!(v, back);
    }
}
