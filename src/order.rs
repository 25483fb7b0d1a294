//! Partially ordered versions (times) and the antichains (frontiers) used to
//! summarize a lower bound on the set of versions that may still be observed.
//!
//! All versions within a single scope of a dataflow share the same dimension
//! (number of coordinates). One-dimensional versions are totally ordered;
//! multidimensional versions are ordered by the product partial order.

use smallvec::SmallVec;
use std::cmp::Ordering;

/// A partially (or totally) ordered version, represented as a tuple of
/// non-negative integers.
///
/// Two versions can only be compared, joined, or met if they share the same
/// dimension; mixing dimensions is a programmer error (see `# Panics`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Version {
    inner: SmallVec<[usize; 2]>,
}

impl Version {
    /// Creates a version from an explicit coordinate tuple.
    pub fn new<I: IntoIterator<Item = usize>>(coords: I) -> Self {
        Version { inner: coords.into_iter().collect() }
    }

    /// The coordinates of this version, in order from outermost to innermost.
    pub fn coords(&self) -> &[usize] {
        &self.inner
    }

    /// The number of coordinates (the dimension of the scope this version lives in).
    pub fn dimension(&self) -> usize {
        self.inner.len()
    }

    fn assert_same_dimension(&self, other: &Version) {
        assert!(
            self.dimension() == other.dimension(),
            "dimension mismatch: {:?} has {} coordinates, {:?} has {}",
            self,
            self.dimension(),
            other,
            other.dimension()
        );
    }

    /// `self <= other` under the product partial order.
    ///
    /// # Panics
    /// Panics if `self` and `other` have different dimension.
    pub fn less_equal(&self, other: &Version) -> bool {
        self.assert_same_dimension(other);
        self.inner.iter().zip(other.inner.iter()).all(|(a, b)| a <= b)
    }

    /// `self <= other && self != other`.
    pub fn less_than(&self, other: &Version) -> bool {
        self.less_equal(other) && self.inner != other.inner
    }

    /// Componentwise maximum.
    pub fn join(&self, other: &Version) -> Version {
        self.assert_same_dimension(other);
        Version::new(self.inner.iter().zip(other.inner.iter()).map(|(a, b)| *a.max(b)))
    }

    /// Componentwise minimum.
    pub fn meet(&self, other: &Version) -> Version {
        self.assert_same_dimension(other);
        Version::new(self.inner.iter().zip(other.inner.iter()).map(|(a, b)| *a.min(b)))
    }

    /// Returns the coarsest version `v' >= self` that is indistinguishable
    /// from `self` with respect to `frontier`: for every `u` at or above every
    /// element of `frontier`, `self <= u` iff `v' <= u`.
    ///
    /// Returns `self` unchanged when `frontier` is empty.
    pub fn advance_by(&self, frontier: &Antichain) -> Version {
        let mut elements = frontier.elements().iter();
        let Some(first) = elements.next() else {
            return self.clone();
        };
        let mut result = self.join(first);
        for elem in elements {
            result = result.meet(&self.join(elem));
        }
        result
    }

    /// Enters a nested scope: appends a trailing `0` coordinate.
    pub fn extend(&self) -> Version {
        let mut inner = self.inner.clone();
        inner.push(0);
        Version { inner }
    }

    /// Leaves a scope: drops the trailing coordinate.
    ///
    /// # Panics
    /// Panics if this version has no coordinates.
    pub fn truncate(&self) -> Version {
        let mut inner = self.inner.clone();
        inner.pop().expect("cannot truncate a zero-dimensional version");
        Version { inner }
    }

    /// Advances the innermost (last) coordinate by `step`.
    ///
    /// # Panics
    /// Panics if `step` is zero or this version has no coordinates.
    pub fn apply_step(&self, step: usize) -> Version {
        assert!(step > 0, "apply_step requires a positive step");
        let mut inner = self.inner.clone();
        let last = inner.last_mut().expect("cannot apply_step to a zero-dimensional version");
        *last += step;
        Version { inner }
    }
}

impl From<usize> for Version {
    fn from(value: usize) -> Self {
        Version::new([value])
    }
}

impl<const N: usize> From<[usize; N]> for Version {
    fn from(value: [usize; N]) -> Self {
        Version::new(value)
    }
}

impl PartialOrd for Version {
    /// A total order over versions of the same dimension, used only to sort
    /// closed versions into a linear extension of the partial order (see the
    /// `Reduce` operator); this is *not* the product partial order itself.
    fn partial_cmp(&self, other: &Version) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Version) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}

/// A minimal set of pairwise-incomparable versions: the lower boundary of the
/// set of versions that may still be open.
///
/// `Antichain` represents the upper set `{v : exists f in self, f <= v}`.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct Antichain {
    inner: SmallVec<[Version; 2]>,
}

/// Set equality, not sequence equality: `insert`'s order of insertion (and a
/// `HashSet`'s nondeterministic iteration order feeding [`Antichain::new`])
/// must never affect whether two antichains compare equal.
impl PartialEq for Antichain {
    fn eq(&self, other: &Antichain) -> bool {
        if self.inner.len() != other.inner.len() {
            return false;
        }
        let mut mine: Vec<&Version> = self.inner.iter().collect();
        let mut theirs: Vec<&Version> = other.inner.iter().collect();
        mine.sort();
        theirs.sort();
        mine == theirs
    }
}

impl Eq for Antichain {}

impl Antichain {
    /// Builds an antichain from a collection of versions, keeping only the
    /// minimal elements.
    pub fn new<I: IntoIterator<Item = Version>>(elements: I) -> Self {
        let mut out = Antichain { inner: SmallVec::new() };
        for element in elements {
            out.insert(element);
        }
        out
    }

    /// The empty antichain (represents the empty upper set).
    pub fn empty() -> Self {
        Antichain { inner: SmallVec::new() }
    }

    /// The minimal elements currently retained.
    pub fn elements(&self) -> &[Version] {
        &self.inner
    }

    /// Inserts `element`, discarding it if some existing element already
    /// dominates it from below, and otherwise removing every existing
    /// element that `element` itself dominates.
    pub fn insert(&mut self, element: Version) {
        if self.inner.iter().any(|e| e.less_equal(&element)) {
            return;
        }
        self.inner.retain(|e| !element.less_equal(e));
        self.inner.push(element);
    }

    /// The antichain whose upper set is the union of `self`'s and `other`'s.
    pub fn meet(&self, other: &Antichain) -> Antichain {
        let mut out = Antichain::new(self.inner.iter().cloned());
        for element in &other.inner {
            out.insert(element.clone());
        }
        out
    }

    /// True iff every element of `other` dominates some element of `self`
    /// (equivalently, `self`'s upper set contains `other`'s).
    pub fn less_equal(&self, other: &Antichain) -> bool {
        other.inner.iter().all(|o| self.inner.iter().any(|s| s.less_equal(o)))
    }

    /// `self.less_equal(other) && self != other`, where `!=` is set
    /// inequality: reordering the same elements never makes this true.
    pub fn less_than(&self, other: &Antichain) -> bool {
        self.less_equal(other) && self != other
    }

    /// True iff some element of this antichain is `<= version`.
    pub fn less_equal_version(&self, version: &Version) -> bool {
        self.inner.iter().any(|e| e.less_equal(version))
    }

    /// Enters a nested scope: extends every element.
    pub fn extend(&self) -> Antichain {
        Antichain::new(self.inner.iter().map(Version::extend))
    }

    /// Leaves a scope: truncates every element.
    pub fn truncate(&self) -> Antichain {
        Antichain::new(self.inner.iter().map(Version::truncate))
    }

    /// Advances the innermost coordinate of every element by `step`.
    pub fn apply_step(&self, step: usize) -> Antichain {
        Antichain::new(self.inner.iter().map(|e| e.apply_step(step)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(coords: &[usize]) -> Version {
        Version::new(coords.iter().copied())
    }

    #[test]
    fn version_product_order() {
        let v00 = v(&[0, 0]);
        let v10 = v(&[1, 0]);
        let v01 = v(&[0, 1]);
        let v11 = v(&[1, 1]);

        assert!(v00.less_than(&v10));
        assert!(v00.less_than(&v01));
        assert!(v00.less_than(&v11));
        assert!(!v10.less_than(&v10));
        assert!(v10.less_equal(&v10));
        assert!(!v10.less_equal(&v01));
        assert!(!v01.less_equal(&v10));
        assert!(v01.less_equal(&v11));
    }

    #[test]
    fn join_and_meet() {
        let a = v(&[1, 4]);
        let b = v(&[3, 2]);
        assert_eq!(a.join(&b), v(&[3, 4]));
        assert_eq!(a.meet(&b), v(&[1, 2]));
    }

    #[test]
    #[should_panic(expected = "dimension mismatch")]
    fn dimension_mismatch_panics() {
        let a = v(&[0]);
        let b = v(&[0, 0]);
        let _ = a.less_equal(&b);
    }

    #[test]
    fn extend_truncate_apply_step_roundtrip() {
        let a = v(&[3, 1]);
        let extended = a.extend();
        assert_eq!(extended, v(&[3, 1, 0]));
        assert_eq!(extended.apply_step(5), v(&[3, 1, 5]));
        assert_eq!(extended.truncate(), a);
    }

    #[test]
    fn antichain_minimality() {
        let a0 = Antichain::new([v(&[0, 0])]);
        let a1 = Antichain::new([v(&[1, 0])]);
        assert!(a0.less_equal(&a1));
        assert_ne!(a0, a1);
        assert!(a0.less_than(&a1));

        // [2,0] is dominated by [1,1]? no: product order says [2,0] and [1,1]
        // are incomparable, so inserting both keeps both; but {[2,0]} < {[2,0],[1,1]}... check the other direction.
        let both = Antichain::new([v(&[2, 0]), v(&[1, 1])]);
        let single = Antichain::new([v(&[2, 0])]);
        assert!(both.less_than(&single));
    }

    #[test]
    fn advance_by_empty_frontier_is_identity() {
        let a = v(&[3, 2]);
        assert_eq!(a.advance_by(&Antichain::empty()), a);
    }

    #[test]
    fn advance_by_preserves_upper_set_membership() {
        // For every u >= every element of frontier, v <= u iff advance_by(v, frontier) <= u.
        let frontier = Antichain::new([v(&[1, 1])]);
        let version = v(&[0, 2]);
        let advanced = version.advance_by(&frontier);

        for u in [v(&[1, 2]), v(&[2, 2]), v(&[1, 3]), v(&[5, 5])] {
            assert_eq!(version.less_equal(&u), advanced.less_equal(&u), "u = {:?}", u);
        }
    }
}
