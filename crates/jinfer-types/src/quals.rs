//! Type-qualifier sets and the pluggable qualifier lattice.
//!
//! A qualifier is an extra, orthogonal refinement carried on a type (the
//! original motivation being pluggable annotation hierarchies). The solver
//! never interprets qualifiers itself; it collects qualifier bounds and
//! asks the installed [`QualifierHierarchy`] to compare and combine them.
//!
//! A failed qualifier comparison is the *soft* inference failure: the
//! underlying type instantiation is still usable, only the qualifier
//! overlay is not.

use bitflags::bitflags;

bitflags! {
    /// A set of qualifiers, one bit per qualifier of the installed
    /// hierarchy. Bit meaning is owned entirely by the
    /// [`QualifierHierarchy`] in use.
    #[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
    pub struct QualSet: u32 {}
}

impl QualSet {
    /// The set containing only the qualifier at `bit`.
    pub fn single(bit: u32) -> Self {
        Self::from_bits_retain(1 << bit)
    }
}

/// A qualifier lattice.
///
/// One lattice per inference session. Implementations decide what each bit
/// of a [`QualSet`] means and how sets order and combine.
pub trait QualifierHierarchy {
    /// Whether `sub` is below (or equal to) `sup` in the lattice.
    fn is_subqualifier(&self, sub: QualSet, sup: QualSet) -> bool;

    /// Least upper bound of `a` and `b`.
    fn lub(&self, a: QualSet, b: QualSet) -> QualSet;

    /// Greatest lower bound of `a` and `b`.
    fn glb(&self, a: QualSet, b: QualSet) -> QualSet;

    /// Top of the lattice.
    fn top(&self) -> QualSet;

    /// Bottom of the lattice.
    fn bottom(&self) -> QualSet;
}

/// The trivial one-point lattice: no qualifiers, every comparison holds.
///
/// Installed by default so qualifier machinery is inert until a host
/// checker supplies a real hierarchy.
pub struct NoQualifiers;

impl QualifierHierarchy for NoQualifiers {
    fn is_subqualifier(&self, _sub: QualSet, _sup: QualSet) -> bool {
        true
    }

    fn lub(&self, a: QualSet, b: QualSet) -> QualSet {
        a | b
    }

    fn glb(&self, a: QualSet, b: QualSet) -> QualSet {
        a & b
    }

    fn top(&self) -> QualSet {
        QualSet::empty()
    }

    fn bottom(&self) -> QualSet {
        QualSet::empty()
    }
}
