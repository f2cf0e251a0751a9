//! Growable bit set used for filters, deletions and document-id sets.
//!
//! A [`BitVector`] wraps a [`BitVec`] and keeps a running count of the set
//! bits. Every position at or beyond [`BitVector::size`] reads as the
//! extension value, which is `false` normally and `true` once the vector has
//! been negated with [`BitVector::not`].

use std::hash::{Hash, Hasher};
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Not};

use bit_vec::BitVec;

const BLOCK_BITS: usize = u32::BITS as usize;

/// An ordered set of non-negative integers backed by bit storage.
#[derive(Debug, Clone, Default)]
pub struct BitVector {
    /// Stored bits. Its length is one past the highest bit ever written.
    bits: BitVec,
    /// Number of set bits below `size`.
    count: usize,
    /// Scan cursor: the next position `next()`/`next_unset()` examines.
    scan_pos: usize,
    /// When true every bit beyond `size` is considered set.
    extends_as_ones: bool,
}

impl BitVector {
    /// Create an empty bit vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty bit vector with room for `capacity` bits.
    pub fn with_capacity(capacity: usize) -> Self {
        BitVector {
            bits: BitVec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// One past the highest bit that has been written.
    pub fn size(&self) -> usize {
        self.bits.len()
    }

    /// Number of set bits below [`size`](Self::size).
    pub fn count(&self) -> usize {
        self.count
    }

    /// Whether positions beyond the stored size read as set.
    pub fn extends_as_ones(&self) -> bool {
        self.extends_as_ones
    }

    /// Extend the logical size to `new_size`, filling with the extension value.
    fn grow(&mut self, new_size: usize) {
        let size = self.size();
        if new_size <= size {
            return;
        }
        self.bits.grow(new_size - size, self.extends_as_ones);
        if self.extends_as_ones {
            self.count += new_size - size;
        }
    }

    /// Set bit `bit`.
    pub fn set(&mut self, bit: usize) {
        self.grow(bit + 1);
        if self.bits.get(bit) == Some(false) {
            self.bits.set(bit, true);
            self.count += 1;
        }
    }

    /// Clear bit `bit`.
    pub fn unset(&mut self, bit: usize) {
        if bit >= self.size() {
            if !self.extends_as_ones {
                return;
            }
            self.grow(bit + 1);
        }
        if self.bits.get(bit) == Some(true) {
            self.bits.set(bit, false);
            self.count -= 1;
        }
    }

    /// Get the state of bit `bit`.
    pub fn get(&self, bit: usize) -> bool {
        self.bits.get(bit).unwrap_or(self.extends_as_ones)
    }

    /// Remove every bit and leave the vector in normal (non-negated) mode.
    pub fn clear(&mut self) {
        self.bits.truncate(0);
        self.count = 0;
        self.scan_pos = 0;
        self.extends_as_ones = false;
    }

    /// Copy of the stored bits extended to `size` with the extension value.
    fn widened(&self, size: usize) -> BitVec {
        let mut bits = self.bits.clone();
        bits.grow(size - bits.len(), self.extends_as_ones);
        bits
    }

    fn combine(
        &self,
        other: &BitVector,
        extension: impl Fn(bool, bool) -> bool,
        apply: impl FnOnce(&mut BitVec, &BitVec) -> bool,
    ) -> BitVector {
        let size = self.size().max(other.size());
        let mut bits = self.widened(size);
        apply(&mut bits, &other.widened(size));
        BitVector {
            count: bits.count_ones() as usize,
            bits,
            scan_pos: 0,
            extends_as_ones: extension(self.extends_as_ones, other.extends_as_ones),
        }
    }

    /// Intersection of two vectors.
    pub fn and(&self, other: &BitVector) -> BitVector {
        self.combine(other, |a, b| a & b, BitVec::and)
    }

    /// In-place intersection.
    pub fn and_assign(&mut self, other: &BitVector) {
        *self = self.and(other);
    }

    /// Union of two vectors.
    pub fn or(&self, other: &BitVector) -> BitVector {
        self.combine(other, |a, b| a | b, BitVec::or)
    }

    /// In-place union.
    pub fn or_assign(&mut self, other: &BitVector) {
        *self = self.or(other);
    }

    /// Symmetric difference of two vectors.
    pub fn xor(&self, other: &BitVector) -> BitVector {
        self.combine(other, |a, b| a ^ b, BitVec::xor)
    }

    /// In-place symmetric difference.
    pub fn xor_assign(&mut self, other: &BitVector) {
        *self = self.xor(other);
    }

    /// Complement of this vector.
    #[allow(clippy::should_implement_trait)]
    pub fn not(&self) -> BitVector {
        let mut result = self.clone();
        result.not_assign();
        result
    }

    /// In-place complement: flips every stored bit and toggles `extends_as_ones`.
    pub fn not_assign(&mut self) {
        self.bits.negate();
        self.extends_as_ones = !self.extends_as_ones;
        self.count = self.size() - self.count;
        self.scan_pos = 0;
    }

    /// First set bit at or after `from` and below `size`. Does not move the scan cursor.
    pub fn next_set_bit(&self, from: usize) -> Option<usize> {
        self.find_from(from, false)
    }

    /// First unset bit at or after `from` and below `size`. Does not move the scan cursor.
    pub fn next_unset_bit(&self, from: usize) -> Option<usize> {
        self.find_from(from, true)
    }

    /// First member at or after `from`, counting the extension when negated.
    pub fn next_member(&self, from: usize) -> Option<usize> {
        match self.next_set_bit(from) {
            Some(bit) => Some(bit),
            None if self.extends_as_ones => Some(from.max(self.size())),
            None => None,
        }
    }

    fn find_from(&self, from: usize, unset: bool) -> Option<usize> {
        let size = self.size();
        if from >= size {
            return None;
        }
        let blocks = self.bits.storage();
        let load = |i: usize| if unset { !blocks[i] } else { blocks[i] };
        let mut index = from / BLOCK_BITS;
        let mut block = load(index) & (u32::MAX << (from % BLOCK_BITS));
        loop {
            if block != 0 {
                let bit = index * BLOCK_BITS + block.trailing_zeros() as usize;
                return (bit < size).then_some(bit);
            }
            index += 1;
            if index * BLOCK_BITS >= size {
                return None;
            }
            block = load(index);
        }
    }

    /// Reset the scan cursor to the start of the vector.
    pub fn reset_scan(&mut self) {
        self.scan_pos = 0;
    }

    /// Advance the scan cursor to the next set bit.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Option<usize> {
        self.next_from(self.scan_pos)
    }

    /// Advance the scan cursor to the next unset bit.
    pub fn next_unset(&mut self) -> Option<usize> {
        self.next_unset_from(self.scan_pos)
    }

    /// Move the scan cursor to the first set bit at or after `from`.
    pub fn next_from(&mut self, from: usize) -> Option<usize> {
        let found = self.next_set_bit(from);
        self.scan_pos = found.map_or(self.size(), |bit| bit + 1);
        found
    }

    /// Move the scan cursor to the first unset bit at or after `from`.
    pub fn next_unset_from(&mut self, from: usize) -> Option<usize> {
        let found = self.next_unset_bit(from);
        self.scan_pos = found.map_or(self.size(), |bit| bit + 1);
        found
    }

    /// Visit every member from the start. A negated vector visits its unset bits.
    pub fn each<F: FnMut(usize)>(&mut self, mut visit: F) {
        self.reset_scan();
        if self.extends_as_ones {
            while let Some(bit) = self.next_unset() {
                visit(bit);
            }
        } else {
            while let Some(bit) = self.next() {
                visit(bit);
            }
        }
    }

    /// Iterate the set bits below `size` in ascending order.
    pub fn iter(&self) -> SetBits<'_> {
        SetBits { bv: self, pos: 0 }
    }

    /// Collect the set bits below `size`.
    pub fn to_vec(&self) -> Vec<usize> {
        self.iter().collect()
    }
}

/// Iterator over the set bits of a [`BitVector`].
#[derive(Debug)]
pub struct SetBits<'a> {
    bv: &'a BitVector,
    pos: usize,
}

impl Iterator for SetBits<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let bit = self.bv.next_set_bit(self.pos)?;
        self.pos = bit + 1;
        Some(bit)
    }
}

impl PartialEq for BitVector {
    fn eq(&self, other: &Self) -> bool {
        if self.extends_as_ones != other.extends_as_ones {
            return false;
        }
        let size = self.size().max(other.size());
        (0..size).all(|bit| self.get(bit) == other.get(bit))
    }
}

impl Eq for BitVector {}

impl Hash for BitVector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.extends_as_ones.hash(state);
        for (bit, value) in self.bits.iter().enumerate() {
            if value != self.extends_as_ones {
                bit.hash(state);
            }
        }
    }
}

impl FromIterator<usize> for BitVector {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut bv = BitVector::new();
        for bit in iter {
            bv.set(bit);
        }
        bv
    }
}

impl BitAnd for &BitVector {
    type Output = BitVector;

    fn bitand(self, rhs: &BitVector) -> BitVector {
        self.and(rhs)
    }
}

impl BitOr for &BitVector {
    type Output = BitVector;

    fn bitor(self, rhs: &BitVector) -> BitVector {
        self.or(rhs)
    }
}

impl BitXor for &BitVector {
    type Output = BitVector;

    fn bitxor(self, rhs: &BitVector) -> BitVector {
        self.xor(rhs)
    }
}

impl Not for &BitVector {
    type Output = BitVector;

    fn not(self) -> BitVector {
        BitVector::not(self)
    }
}

impl BitAndAssign<&BitVector> for BitVector {
    fn bitand_assign(&mut self, rhs: &BitVector) {
        self.and_assign(rhs);
    }
}

impl BitOrAssign<&BitVector> for BitVector {
    fn bitor_assign(&mut self, rhs: &BitVector) {
        self.or_assign(rhs);
    }
}

impl BitXorAssign<&BitVector> for BitVector {
    fn bitxor_assign(&mut self, rhs: &BitVector) {
        self.xor_assign(rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::hash_map::DefaultHasher;

    fn hash_of(bv: &BitVector) -> u64 {
        let mut hasher = DefaultHasher::new();
        bv.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn test_set_get_unset() {
        let mut bv = BitVector::new();
        assert_eq!(bv.count(), 0);
        assert!(!bv.get(10));

        bv.set(10);
        assert!(bv.get(10));
        assert_eq!(bv.count(), 1);
        assert_eq!(bv.size(), 11);

        bv.set(10);
        assert_eq!(bv.count(), 1);

        bv.set(200);
        assert!(bv.get(200));
        assert!(!bv.get(199));
        assert_eq!(bv.count(), 2);

        bv.unset(10);
        assert!(!bv.get(10));
        assert_eq!(bv.count(), 1);

        bv.unset(5000);
        assert_eq!(bv.size(), 201);
        assert_eq!(bv.count(), 1);
    }

    #[test]
    fn test_count_tracks_many_bits() {
        let mut bv = BitVector::new();
        for i in (0..1000).step_by(3) {
            bv.set(i);
        }
        assert_eq!(bv.count(), 334);
        for i in (0..1000).step_by(6) {
            bv.unset(i);
        }
        assert_eq!(bv.count(), 334 - 167);
        assert_eq!(bv.count(), bv.iter().count());
    }

    #[test]
    fn test_clear() {
        let mut bv: BitVector = [1, 5, 70].into_iter().collect();
        bv.not_assign();
        bv.clear();
        assert_eq!(bv.count(), 0);
        assert_eq!(bv.size(), 0);
        assert!(!bv.extends_as_ones());
        assert!(!bv.get(5));
    }

    #[test]
    fn test_not() {
        let mut bv: BitVector = [1, 3, 5].into_iter().collect();
        assert_eq!(bv.size(), 6);

        let negated = bv.not();
        assert!(negated.extends_as_ones());
        assert_eq!(negated.count(), 3);
        assert!(negated.get(0));
        assert!(!negated.get(1));
        assert!(negated.get(2));
        assert!(negated.get(1000));

        bv.not_assign();
        assert_eq!(bv, negated);
        bv.not_assign();
        assert_eq!(bv.to_vec(), vec![1, 3, 5]);
        assert_eq!(bv.count(), 3);
    }

    #[test]
    fn test_negated_growth_counts_extension() {
        let mut bv: BitVector = [2].into_iter().collect();
        bv.not_assign();
        assert_eq!(bv.count(), 2);

        bv.unset(9);
        assert_eq!(bv.size(), 10);
        assert!(!bv.get(9));
        assert!(bv.get(8));
        assert_eq!(bv.count(), 8);
    }

    #[test]
    fn test_and_or_xor() {
        let a: BitVector = [1, 2, 3, 100].into_iter().collect();
        let b: BitVector = [2, 3, 4].into_iter().collect();

        assert_eq!((&a & &b).to_vec(), vec![2, 3]);
        assert_eq!((&a | &b).to_vec(), vec![1, 2, 3, 4, 100]);
        assert_eq!((&a ^ &b).to_vec(), vec![1, 4, 100]);
        assert_eq!(a.and(&b).count(), 2);
        assert_eq!(a.or(&b).count(), 5);
        assert_eq!(a.xor(&b).count(), 3);

        let mut c = a.clone();
        c &= &b;
        assert_eq!(c.to_vec(), vec![2, 3]);
        let mut c = a.clone();
        c |= &b;
        assert_eq!(c.count(), 5);
        let mut c = a.clone();
        c ^= &b;
        assert_eq!(c.count(), 3);
    }

    #[test]
    fn test_and_with_negated() {
        let a: BitVector = [1, 2, 3, 70].into_iter().collect();
        let deleted: BitVector = [2, 70].into_iter().collect();
        let live = a.and(&deleted.not());
        assert_eq!(live.to_vec(), vec![1, 3]);
        assert!(!live.extends_as_ones());
    }

    #[test]
    fn test_combine_widens_shorter_side() {
        let short: BitVector = [1].into_iter().collect();
        let mut long: BitVector = [1, 40, 90].into_iter().collect();
        long.not_assign();

        let or = short.or(&long);
        assert!(or.extends_as_ones());
        assert_eq!(or.size(), 91);
        assert_eq!(or.count(), 89);
        assert!(!or.get(40));
        assert!(or.get(1));

        let and = long.and(&short.not());
        assert_eq!(and.count(), 88);
        assert!(!and.get(1));
        assert!(and.get(500));
    }

    #[test]
    fn test_next_member_includes_extension() {
        let bv: BitVector = [0, 2].into_iter().collect();
        assert_eq!(bv.next_member(1), Some(2));
        assert_eq!(bv.next_member(3), None);

        let negated = bv.not();
        assert_eq!(negated.next_member(0), Some(1));
        assert_eq!(negated.next_member(2), Some(3));
        assert_eq!(negated.next_member(10), Some(10));
    }

    #[test]
    fn test_eq_and_hash() {
        let mut a = BitVector::new();
        a.set(3);
        a.set(130);
        a.unset(130);
        let b: BitVector = [3].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(hash_of(&a), hash_of(&b));

        let c: BitVector = [4].into_iter().collect();
        assert_ne!(a, c);
        assert_ne!(b, b.not());
    }

    #[test]
    fn test_scan() {
        let mut bv: BitVector = [0, 63, 64, 500].into_iter().collect();
        assert_eq!(bv.next(), Some(0));
        assert_eq!(bv.next(), Some(63));
        assert_eq!(bv.next(), Some(64));
        assert_eq!(bv.next(), Some(500));
        assert_eq!(bv.next(), None);

        bv.reset_scan();
        assert_eq!(bv.next_unset(), Some(1));
        assert_eq!(bv.next_unset(), Some(2));
        assert_eq!(bv.next_from(65), Some(500));
        assert_eq!(bv.next_unset_from(63), Some(65));
        assert_eq!(bv.next_from(501), None);
        assert_eq!(bv.next_set_bit(1), Some(63));
    }

    #[test]
    fn test_each_switches_on_negation() {
        let mut bv: BitVector = [1, 4].into_iter().collect();
        let mut seen = Vec::new();
        bv.each(|bit| seen.push(bit));
        assert_eq!(seen, vec![1, 4]);

        bv.not_assign();
        let mut seen = Vec::new();
        bv.each(|bit| seen.push(bit));
        assert_eq!(seen, vec![1, 4]);
    }
}
