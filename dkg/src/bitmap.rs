//! Set of members identified by their 1-based rank.

use commonware_utils::BitVec;
use std::fmt::Debug;

/// Set of members of a group of fixed size, addressed by 1-based rank.
#[derive(Clone, PartialEq, Eq)]
pub struct Bitmap {
    bits: BitVec,
}

impl Bitmap {
    /// Create an empty bitmap for a group of `size` members.
    pub fn new(size: usize) -> Self {
        Self {
            bits: BitVec::zeroes(size),
        }
    }

    /// Create a bitmap with the given ranks set.
    ///
    /// Returns `None` if any rank is outside `1..=size`.
    pub fn from_ranks(size: usize, ranks: &[u32]) -> Option<Self> {
        let mut bitmap = Self::new(size);
        for rank in ranks {
            if !bitmap.insert(*rank) {
                return None;
            }
        }
        Some(bitmap)
    }

    /// Create a bitmap from one flag byte per member (any non-zero byte is set).
    pub fn from_flags(flags: &[u8]) -> Self {
        let mut bits = BitVec::zeroes(flags.len());
        for (i, flag) in flags.iter().enumerate() {
            if *flag != 0 {
                bits.set(i);
            }
        }
        Self { bits }
    }

    /// Encode as one flag byte (`0` or `1`) per member.
    pub fn to_flags(&self) -> Vec<u8> {
        (0..self.bits.len())
            .map(|i| u8::from(self.bits.get(i).unwrap_or(false)))
            .collect()
    }

    /// Number of members the bitmap covers.
    pub fn size(&self) -> usize {
        self.bits.len()
    }

    /// Set `rank`. Returns false if the rank is out of range.
    pub fn insert(&mut self, rank: u32) -> bool {
        let Some(index) = Self::index(self.size(), rank) else {
            return false;
        };
        self.bits.set(index);
        true
    }

    /// Returns true if `rank` is set.
    pub fn contains(&self, rank: u32) -> bool {
        Self::index(self.size(), rank)
            .and_then(|index| self.bits.get(index))
            .unwrap_or(false)
    }

    /// Number of set ranks.
    pub fn count(&self) -> usize {
        self.bits.count_ones()
    }

    /// Set ranks in ascending order.
    pub fn ranks(&self) -> Vec<u32> {
        (1..=self.size() as u32)
            .filter(|rank| self.contains(*rank))
            .collect()
    }

    /// Union of two bitmaps of the same size.
    ///
    /// Returns `None` if the sizes differ.
    pub fn union(&self, other: &Bitmap) -> Option<Bitmap> {
        if self.size() != other.size() {
            return None;
        }
        let mut result = self.clone();
        for rank in other.ranks() {
            result.insert(rank);
        }
        Some(result)
    }

    fn index(size: usize, rank: u32) -> Option<usize> {
        let rank = rank as usize;
        if rank == 0 || rank > size {
            return None;
        }
        Some(rank - 1)
    }
}

impl Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags: String = self
            .to_flags()
            .iter()
            .map(|flag| if *flag == 1 { '1' } else { '0' })
            .collect();
        write!(f, "Bitmap({flags})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranks() {
        let mut bitmap = Bitmap::new(5);
        assert!(bitmap.insert(3));
        assert!(bitmap.insert(5));
        assert!(!bitmap.insert(0));
        assert!(!bitmap.insert(6));
        assert!(bitmap.contains(3));
        assert!(!bitmap.contains(1));
        assert!(!bitmap.contains(0));
        assert_eq!(bitmap.count(), 2);
        assert_eq!(bitmap.ranks(), vec![3, 5]);
        assert_eq!(format!("{bitmap:?}"), "Bitmap(00101)");
    }

    #[test]
    fn test_flags() {
        let bitmap = Bitmap::from_flags(&[0, 0, 1, 0, 1]);
        assert_eq!(bitmap, Bitmap::from_ranks(5, &[3, 5]).unwrap());
        assert_eq!(bitmap.to_flags(), vec![0, 0, 1, 0, 1]);
        assert_eq!(Bitmap::from_flags(&[0, 7]).ranks(), vec![2]);
    }

    #[test]
    fn test_from_ranks_out_of_range() {
        assert!(Bitmap::from_ranks(3, &[4]).is_none());
        assert!(Bitmap::from_ranks(3, &[0]).is_none());
    }

    #[test]
    fn test_union() {
        let a = Bitmap::from_ranks(4, &[1]).unwrap();
        let b = Bitmap::from_ranks(4, &[1, 4]).unwrap();
        assert_eq!(a.union(&b).unwrap().ranks(), vec![1, 4]);
        assert!(a.union(&Bitmap::new(3)).is_none());
    }
}
