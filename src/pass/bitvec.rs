//! Fixed-length bit-vectors used as flow values.

use crate::errors::AnalysisError;
use std::fmt::Debug;

const BITS: usize = 64;

/// A set of indices drawn from a fixed universe `0..len`.
///
/// The length is fixed at construction; every combining operation
/// requires both operands to have the same length and reports
/// `DomainMismatch` otherwise. Bits at positions `>= len` in the last
/// word are kept clear, so word-wise equality is set equality.
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BitVector {
    words: Vec<u64>,
    len: usize,
}

impl BitVector {
    /// The empty set over `0..len`.
    pub fn new(len: usize) -> BitVector {
        BitVector {
            words: vec![0; (len + BITS - 1) / BITS],
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check_index(&self, index: usize) -> Result<(), AnalysisError> {
        if index < self.len {
            Ok(())
        } else {
            Err(AnalysisError::IndexOutOfBounds {
                index,
                len: self.len,
            })
        }
    }

    fn check_len(&self, other: &BitVector) -> Result<(), AnalysisError> {
        if self.len == other.len {
            Ok(())
        } else {
            Err(AnalysisError::DomainMismatch {
                left: self.len,
                right: other.len,
            })
        }
    }

    pub fn get(&self, index: usize) -> Result<bool, AnalysisError> {
        self.check_index(index)?;
        Ok(self.words[index / BITS] & (1 << (index % BITS)) != 0)
    }

    pub fn set(&mut self, index: usize, value: bool) -> Result<(), AnalysisError> {
        self.check_index(index)?;
        let mask = 1u64 << (index % BITS);
        if value {
            self.words[index / BITS] |= mask;
        } else {
            self.words[index / BITS] &= !mask;
        }
        Ok(())
    }

    pub fn insert(&mut self, index: usize) -> Result<(), AnalysisError> {
        self.set(index, true)
    }

    pub fn remove(&mut self, index: usize) -> Result<(), AnalysisError> {
        self.set(index, false)
    }

    /// Membership test that treats out-of-range indices as absent.
    pub fn contains(&self, index: usize) -> bool {
        self.get(index).unwrap_or(false)
    }

    /// `self |= other`. Returns whether `self` changed.
    pub fn union_with(&mut self, other: &BitVector) -> Result<bool, AnalysisError> {
        self.check_len(other)?;
        let mut changed = false;
        for (word, &other) in self.words.iter_mut().zip(other.words.iter()) {
            let new = *word | other;
            changed |= new != *word;
            *word = new;
        }
        Ok(changed)
    }

    /// `self &= other`. Returns whether `self` changed.
    pub fn intersect_with(&mut self, other: &BitVector) -> Result<bool, AnalysisError> {
        self.check_len(other)?;
        let mut changed = false;
        for (word, &other) in self.words.iter_mut().zip(other.words.iter()) {
            let new = *word & other;
            changed |= new != *word;
            *word = new;
        }
        Ok(changed)
    }

    pub fn is_subset_of(&self, other: &BitVector) -> Result<bool, AnalysisError> {
        self.check_len(other)?;
        Ok(self
            .words
            .iter()
            .zip(other.words.iter())
            .all(|(&a, &b)| a & !b == 0))
    }

    pub fn clear(&mut self) {
        for word in &mut self.words {
            *word = 0;
        }
    }

    /// Number of set bits.
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Set indices, ascending.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(i, &word)| {
            let mut word = word;
            std::iter::from_fn(move || {
                if word == 0 {
                    None
                } else {
                    let bit = word.trailing_zeros() as usize;
                    word &= word - 1;
                    Some(i * BITS + bit)
                }
            })
        })
    }
}

impl Debug for BitVector {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, index) in self.iter_ones().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", index)?;
        }
        write!(f, "}}/{}", self.len)
    }
}
