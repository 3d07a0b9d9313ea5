//! Permutation-related utilities

use crate::{Error, Result};
use rand::{distributions::Distribution, seq::SliceRandom, Rng};
use std::{convert::TryFrom, ops::Deref};

/// A permutation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation(Vec<usize>);

impl Permutation {
    /// Creates a new identity permutation
    pub fn identity(n: usize) -> Self {
        Self((0..n).collect())
    }

    /// Creates a permutation equivalent to undoing this permutation
    pub fn inverse(&self) -> Self {
        let mut v = vec![0; self.len()];
        for i in 0..self.len() {
            v[self[i]] = i;
        }
        Self(v)
    }

    /// Gathers a slice through this permutation
    ///
    /// The result places `slice[self[i]]` at position `i`; applying the
    /// inverse permutation instead scatters, placing `slice[i]` at position
    /// `self[i]`.
    pub fn permute<T: Clone>(&self, slice: &[T]) -> Vec<T> {
        assert_eq!(self.len(), slice.len());
        self.0.iter().map(|&p| slice[p].clone()).collect()
    }
}

impl Deref for Permutation {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

impl TryFrom<Vec<usize>> for Permutation {
    type Error = Error;

    fn try_from(v: Vec<usize>) -> Result<Self> {
        let mut o = v.clone();
        o.sort();
        if o.into_iter().ne(0..v.len()) {
            return Err(Error::Format("not a permutation"));
        }
        Ok(Self(v))
    }
}

/// A distribution that produces shuffle permutations of the given size
pub struct Shuffles(pub usize);

impl Distribution<Permutation> for Shuffles {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Permutation {
        let mut v: Vec<_> = (0..self.0).collect();
        v.shuffle(rng);
        Permutation(v)
    }
}

#[cfg(test)]
mod tests {
    use super::{Permutation, Shuffles};
    use rand::{thread_rng, Rng};
    use std::convert::TryFrom;

    #[test]
    fn identity_gathers_to_itself() {
        let v = vec![5, 6, 7];
        assert_eq!(Permutation::identity(3).permute(&v), v);
    }

    #[test]
    fn gather_reads_through_the_index_vector() {
        let p = Permutation::try_from(vec![2, 0, 1]).unwrap();
        assert_eq!(p.permute(&['a', 'b', 'c']), vec!['c', 'a', 'b']);
    }

    #[test]
    fn inverse_scatters_back() {
        let mut rng = thread_rng();
        let p = rng.sample(&Shuffles(20));
        let v: Vec<_> = (0..20).collect();
        let gathered = p.permute(&v);
        assert_eq!(p.inverse().permute(&gathered), v);
    }

    #[test]
    fn from_vector_accepts_only_valid_permutations() {
        assert!(Permutation::try_from(vec![1, 2, 0]).is_ok());
        assert!(Permutation::try_from(vec![1, 1, 0]).is_err());
        assert!(Permutation::try_from(vec![1, 2, 3]).is_err());
    }

    #[test]
    fn random_shuffles_are_permutations() {
        let mut p: Vec<_> = thread_rng().sample(&Shuffles(50)).to_vec();
        p.sort();
        assert!(p.into_iter().eq(0..50));
    }
}
