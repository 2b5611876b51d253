//! Inference variables and their accumulated bounds.
//!
//! A [`Variable`] is an identity plus a [`VariableBounds`]: the equality,
//! upper, and lower bounds recorded so far, the qualifier bounds, the
//! throws-bound flag, and the queue of constraints implied by
//! complementary pairs of bounds that incorporation has not yet reduced.
//!
//! Bounds only ever grow; the single exception is [`VariableBounds::restore`]
//! rolling back to an explicit [`VariableBounds::save`] snapshot, which
//! resolution uses to retry a variable set under a different strategy.

use crate::constraint::{Constraint, ConstraintSet, QualKind, TypingKind};
use jinfer_types::{
    ClassStore, InferVar, ParamId, QualSet, TypeId, TypeInterner, queries, relations,
    replace_infer_vars,
};
use indexmap::IndexSet;
use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;

type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;

/// Kind of bound recorded against a variable.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BoundKind {
    /// `other <: this`
    Lower,
    /// `this <: other`
    Upper,
    /// `this = other`
    Equal,
}

impl BoundKind {
    const fn idx(self) -> usize {
        match self {
            BoundKind::Lower => 0,
            BoundKind::Upper => 1,
            BoundKind::Equal => 2,
        }
    }
}

/// How a variable came to exist.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VarKind {
    /// Minted for a type parameter of an invoked method or constructor.
    Invocation,
    /// Minted by wildcard capture conversion.
    Capture,
}

/// An inference variable together with its bound state.
pub struct Variable {
    pub id: InferVar,
    /// The type parameter this variable stands for.
    pub param: ParamId,
    pub kind: VarKind,
    pub bounds: VariableBounds,
}

impl Variable {
    pub(crate) fn new(id: InferVar, param: ParamId, kind: VarKind) -> Self {
        Self {
            id,
            param,
            kind,
            bounds: VariableBounds::new(id),
        }
    }
}

/// Qualifier-bound forwarding instruction produced while recording a bound.
type QualForward = (InferVar, BoundKind, QualSet);

#[derive(Clone)]
struct SavedBounds {
    bounds: [FxIndexSet<TypeId>; 3],
    qual_bounds: [FxIndexSet<QualSet>; 3],
}

/// Bound storage for one variable.
pub struct VariableBounds {
    owner: InferVar,
    bounds: [FxIndexSet<TypeId>; 3],
    qual_bounds: [FxIndexSet<QualSet>; 3],
    instantiation: Option<TypeId>,
    has_throws_bound: bool,
    /// Constraints implied by complementary pairs of bounds, awaiting
    /// reduction by the next incorporation round.
    pub(crate) constraints: ConstraintSet,
    saved: Option<Box<SavedBounds>>,
}

impl VariableBounds {
    fn new(owner: InferVar) -> Self {
        Self {
            owner,
            bounds: Default::default(),
            qual_bounds: Default::default(),
            instantiation: None,
            has_throws_bound: false,
            constraints: ConstraintSet::new(),
            saved: None,
        }
    }

    /// Snapshots the current bound state.
    pub fn save(&mut self) {
        self.saved = Some(Box::new(SavedBounds {
            bounds: self.bounds.clone(),
            qual_bounds: self.qual_bounds.clone(),
        }));
    }

    /// Rolls back to the last [`save`](Self::save). The instantiation is
    /// recomputed from the restored equality bounds.
    pub fn restore(&mut self, interner: &TypeInterner, store: &ClassStore) {
        let Some(saved) = self.saved.as_deref() else {
            debug_assert!(false, "restore without save on {}", self.owner);
            return;
        };
        self.bounds = saved.bounds.clone();
        self.qual_bounds = saved.qual_bounds.clone();
        self.instantiation = None;
        for &t in &self.bounds[BoundKind::Equal.idx()] {
            if queries::is_proper(interner, t) {
                self.instantiation = Some(jinfer_types::boxed(interner, store, t));
            }
        }
    }

    pub fn has_throws_bound(&self) -> bool {
        self.has_throws_bound
    }

    pub fn set_has_throws_bound(&mut self, value: bool) {
        self.has_throws_bound = value;
    }

    pub fn instantiation(&self) -> Option<TypeId> {
        self.instantiation
    }

    pub fn has_instantiation(&self) -> bool {
        self.instantiation.is_some()
    }

    /// The recorded bounds of `kind`, in insertion order.
    pub fn bounds_of(&self, kind: BoundKind) -> impl Iterator<Item = TypeId> + '_ {
        self.bounds[kind.idx()].iter().copied()
    }

    /// The recorded qualifier bounds of `kind`.
    pub fn qual_bounds_of(&self, kind: BoundKind) -> impl Iterator<Item = QualSet> + '_ {
        self.qual_bounds[kind.idx()].iter().copied()
    }

    /// Total number of recorded type bounds, across all kinds.
    pub fn bound_count(&self) -> usize {
        self.bounds.iter().map(|set| set.len()).sum()
    }

    /// Records `other` as a bound of `kind`. Returns whether the bound is
    /// new, plus qualifier-bound forwards for variables mentioned in the
    /// bound (applied by the context, which can reach the other
    /// variables).
    pub(crate) fn add_bound(
        &mut self,
        kind: BoundKind,
        other: TypeId,
        interner: &TypeInterner,
        store: &ClassStore,
    ) -> (bool, SmallVec<[QualForward; 2]>) {
        if queries::as_use_of_variable(interner, other) == Some(self.owner) {
            return (false, SmallVec::new());
        }
        if kind == BoundKind::Equal && queries::is_proper(interner, other) {
            self.instantiation = Some(jinfer_types::boxed(interner, store, other));
        }
        if !self.bounds[kind.idx()].insert(other) {
            return (false, SmallVec::new());
        }
        let forwards = self.add_constraints_from_complementary_bounds(kind, other, interner, store);
        let other_quals = queries::quals_of(interner, other);
        self.add_constraints_from_complementary_qual_bounds(kind, other_quals);
        (true, forwards)
    }

    /// Complementary-bound incorporation: pairing the new bound with every
    /// existing bound implies further constraints.
    fn add_constraints_from_complementary_bounds(
        &mut self,
        kind: BoundKind,
        bound: TypeId,
        interner: &TypeInterner,
        store: &ClassStore,
    ) -> SmallVec<[QualForward; 2]> {
        let equal: Vec<TypeId> = self.bounds[BoundKind::Equal.idx()].iter().copied().collect();
        let lower: Vec<TypeId> = self.bounds[BoundKind::Lower.idx()].iter().copied().collect();
        let upper: Vec<TypeId> = self.bounds[BoundKind::Upper.idx()].iter().copied().collect();

        match kind {
            BoundKind::Equal => {
                for t in equal.iter().copied().filter(|&t| t != bound) {
                    self.constraints.add(Constraint::typing(bound, t, TypingKind::Equality));
                }
                for t in lower.iter().copied().filter(|&t| t != bound) {
                    self.constraints.add(Constraint::typing(t, bound, TypingKind::Subtype));
                }
                for t in upper.iter().copied().filter(|&t| t != bound) {
                    self.constraints.add(Constraint::typing(bound, t, TypingKind::Subtype));
                }
            }
            BoundKind::Lower => {
                for t in equal.iter().copied().filter(|&t| t != bound) {
                    self.constraints.add(Constraint::typing(bound, t, TypingKind::Subtype));
                }
                for t in upper.iter().copied().filter(|&t| t != bound) {
                    self.constraints.add(Constraint::typing(bound, t, TypingKind::Subtype));
                }
            }
            BoundKind::Upper => {
                for t in equal.iter().copied().filter(|&t| t != bound) {
                    self.constraints.add(Constraint::typing(t, bound, TypingKind::Subtype));
                }
                for t in lower.iter().copied().filter(|&t| t != bound) {
                    self.constraints.add(Constraint::typing(t, bound, TypingKind::Subtype));
                }
            }
        }

        if kind == BoundKind::Upper
            && (queries::is_inference_type(interner, bound) || queries::is_proper(interner, bound))
        {
            // A pair of upper and lower bounds with parameterized
            // supertypes of the same generic declaration implies
            // per-argument equality between the two parameterizations.
            for t in lower.iter().copied() {
                if queries::is_proper(interner, t) || queries::is_inference_type(interner, t) {
                    self.add_constraints_from_parameterized(bound, t, interner, store);
                }
            }
        }

        // A bound that is itself a variable use shares this variable's
        // qualifier bounds with the other variable.
        let mut forwards = SmallVec::new();
        if let Some(other_var) = queries::as_use_of_variable(interner, bound) {
            let equal_q = self.fold_quals(BoundKind::Equal);
            let lower_q = self.fold_quals(BoundKind::Lower);
            let upper_q = self.fold_quals(BoundKind::Upper);
            match kind {
                BoundKind::Equal => {
                    if let Some(q) = equal_q {
                        forwards.push((other_var, BoundKind::Equal, q));
                    }
                    if let Some(q) = lower_q {
                        forwards.push((other_var, BoundKind::Lower, q));
                    }
                    if let Some(q) = upper_q {
                        forwards.push((other_var, BoundKind::Upper, q));
                    }
                }
                BoundKind::Lower => {
                    if let Some(q) = equal_q {
                        forwards.push((other_var, BoundKind::Upper, q));
                    }
                    if let Some(q) = lower_q {
                        forwards.push((other_var, BoundKind::Lower, q));
                    }
                }
                BoundKind::Upper => {
                    if let Some(q) = equal_q {
                        forwards.push((other_var, BoundKind::Lower, q));
                    }
                    if let Some(q) = upper_q {
                        forwards.push((other_var, BoundKind::Upper, q));
                    }
                }
            }
        }
        forwards
    }

    fn fold_quals(&self, kind: BoundKind) -> Option<QualSet> {
        let mut acc: Option<QualSet> = None;
        for &q in &self.qual_bounds[kind.idx()] {
            acc = Some(acc.map_or(q, |a| a | q));
        }
        acc
    }

    fn add_constraints_from_parameterized(
        &mut self,
        s: TypeId,
        t: TypeId,
        interner: &TypeInterner,
        store: &ClassStore,
    ) {
        let Some((s_sup, t_sup)) = relations::parameterized_supers(interner, store, s, t) else {
            return;
        };
        let (Some(s_args), Some(t_args)) = (
            queries::type_arguments(interner, s_sup),
            queries::type_arguments(interner, t_sup),
        ) else {
            return;
        };
        if s_args.len() != t_args.len() {
            return;
        }
        for (&si, &ti) in s_args.iter().zip(t_args.iter()) {
            if !queries::is_wildcard(interner, si) && !queries::is_wildcard(interner, ti) {
                self.constraints.add(Constraint::typing(si, ti, TypingKind::Equality));
            }
        }
    }

    /// Records a qualifier bound and returns raw forwards for variables
    /// mentioned in this variable's type bounds.
    pub(crate) fn add_qualifier_bound(
        &mut self,
        kind: BoundKind,
        quals: QualSet,
        interner: &TypeInterner,
    ) -> SmallVec<[QualForward; 2]> {
        self.add_constraints_from_complementary_qual_bounds(kind, quals);

        let mut forwards = SmallVec::new();
        for &t in &self.bounds[BoundKind::Equal.idx()] {
            if let Some(v) = queries::as_use_of_variable(interner, t) {
                forwards.push((v, kind, quals));
            }
        }
        if matches!(kind, BoundKind::Equal | BoundKind::Upper) {
            for &t in &self.bounds[BoundKind::Lower.idx()] {
                if let Some(v) = queries::as_use_of_variable(interner, t) {
                    forwards.push((v, BoundKind::Upper, quals));
                }
            }
        }
        if matches!(kind, BoundKind::Equal | BoundKind::Lower) {
            for &t in &self.bounds[BoundKind::Upper.idx()] {
                if let Some(v) = queries::as_use_of_variable(interner, t) {
                    forwards.push((v, BoundKind::Lower, quals));
                }
            }
        }

        self.qual_bounds[kind.idx()].insert(quals);
        forwards
    }

    pub(crate) fn insert_qual_bound_raw(&mut self, kind: BoundKind, quals: QualSet) {
        self.qual_bounds[kind.idx()].insert(quals);
    }

    fn add_constraints_from_complementary_qual_bounds(&mut self, kind: BoundKind, quals: QualSet) {
        if quals.is_empty() {
            return;
        }
        let equal: Vec<QualSet> = self.qual_bounds[BoundKind::Equal.idx()].iter().copied().collect();
        let lower: Vec<QualSet> = self.qual_bounds[BoundKind::Lower.idx()].iter().copied().collect();
        let upper: Vec<QualSet> = self.qual_bounds[BoundKind::Upper.idx()].iter().copied().collect();
        match kind {
            BoundKind::Equal => {
                for q in equal.iter().copied().filter(|&q| q != quals) {
                    self.constraints.add(Constraint::qualifier(quals, q, QualKind::Equality));
                }
                for q in lower {
                    self.constraints.add(Constraint::qualifier(q, quals, QualKind::Subtype));
                }
                for q in upper {
                    self.constraints.add(Constraint::qualifier(quals, q, QualKind::Subtype));
                }
            }
            BoundKind::Lower => {
                for q in equal {
                    self.constraints.add(Constraint::qualifier(quals, q, QualKind::Subtype));
                }
                for q in upper {
                    self.constraints.add(Constraint::qualifier(quals, q, QualKind::Subtype));
                }
            }
            BoundKind::Upper => {
                for q in equal {
                    self.constraints.add(Constraint::qualifier(q, quals, QualKind::Subtype));
                }
                for q in lower {
                    self.constraints.add(Constraint::qualifier(q, quals, QualKind::Subtype));
                }
            }
        }
    }

    // =========================================================================
    // Resolution queries
    // =========================================================================

    /// Whether every recorded bound is a proper type.
    pub fn only_proper_bounds(&self, interner: &TypeInterner) -> bool {
        self.bounds
            .iter()
            .flatten()
            .all(|&t| queries::is_proper(interner, t))
    }

    /// Lower bounds that are proper types.
    pub fn proper_lower_bounds(&self, interner: &TypeInterner) -> Vec<TypeId> {
        self.bounds[BoundKind::Lower.idx()]
            .iter()
            .copied()
            .filter(|&t| queries::is_proper(interner, t))
            .collect()
    }

    /// Upper bounds that are proper types.
    pub fn proper_upper_bounds(&self, interner: &TypeInterner) -> Vec<TypeId> {
        self.bounds[BoundKind::Upper.idx()]
            .iter()
            .copied()
            .filter(|&t| queries::is_proper(interner, t))
            .collect()
    }

    /// Upper bounds that are not bare variable uses.
    pub fn upper_bounds_non_var(&self, interner: &TypeInterner) -> Vec<TypeId> {
        self.bounds[BoundKind::Upper.idx()]
            .iter()
            .copied()
            .filter(|&t| queries::as_use_of_variable(interner, t).is_none())
            .collect()
    }

    /// Every variable mentioned in any bound of this variable.
    pub fn vars_mentioned_in_bounds(&self, interner: &TypeInterner) -> SmallVec<[InferVar; 4]> {
        let mut out = SmallVec::new();
        for &t in self.bounds.iter().flatten() {
            for v in jinfer_types::collect_infer_vars(interner, t) {
                if !out.contains(&v) {
                    out.push(v);
                }
            }
        }
        out
    }

    /// Substitutes resolved variables into all bounds and pending
    /// constraints. Returns whether any bound changed.
    pub(crate) fn apply_instantiations(
        &mut self,
        interner: &TypeInterner,
        store: &ClassStore,
        resolved: &FxHashMap<InferVar, TypeId>,
    ) -> bool {
        let lookup = |v: InferVar| resolved.get(&v).copied();
        let mut changed = false;
        for set in &mut self.bounds {
            let mut rebuilt = FxIndexSet::default();
            for &bound in set.iter() {
                let new = replace_infer_vars(interner, bound, &lookup);
                if new != bound && !set.contains(&new) {
                    changed = true;
                }
                rebuilt.insert(new);
            }
            *set = rebuilt;
        }
        self.constraints.apply_instantiations(interner, resolved);

        if changed && self.instantiation.is_none() {
            for &t in &self.bounds[BoundKind::Equal.idx()] {
                if queries::is_proper(interner, t) {
                    self.instantiation = Some(jinfer_types::boxed(interner, store, t));
                }
            }
        }
        changed
    }

    /// Whether any bound mentions a primitive wrapper class.
    pub fn has_primitive_wrapper_bound(&self, interner: &TypeInterner, store: &ClassStore) -> bool {
        self.bounds.iter().flatten().any(|&t| {
            queries::is_proper(interner, t)
                && queries::declared_def(interner, t)
                    .is_some_and(|def| store.is_boxed_class(def))
        })
    }

    /// Whether any lower or equality bound is a wildcard-parameterized
    /// type (excluding bare variable uses).
    pub fn has_wildcard_parameterized_lower_or_equal_bound(&self, interner: &TypeInterner) -> bool {
        [BoundKind::Equal, BoundKind::Lower].iter().any(|&kind| {
            self.bounds[kind.idx()].iter().any(|&t| {
                queries::as_use_of_variable(interner, t).is_none()
                    && queries::is_wildcard_parameterized(interner, t)
            })
        })
    }

    /// Whether two proper parameterized lower bounds project onto two
    /// different parameterizations of the same generic declaration.
    pub fn has_lower_bound_different_param(
        &self,
        interner: &TypeInterner,
        store: &ClassStore,
    ) -> bool {
        let parameterized: Vec<TypeId> = self.bounds[BoundKind::Lower.idx()]
            .iter()
            .copied()
            .filter(|&t| queries::is_proper(interner, t) && queries::is_parameterized(interner, t))
            .collect();
        for (i, &s1) in parameterized.iter().enumerate() {
            for &s2 in &parameterized[i + 1..] {
                let Some((sup1, sup2)) = relations::parameterized_supers(interner, store, s1, s2)
                else {
                    continue;
                };
                if queries::type_arguments(interner, sup1) != queries::type_arguments(interner, sup2)
                {
                    return true;
                }
            }
        }
        false
    }

    /// Whether an equality or lower bound projects onto `target`'s
    /// declaration only as a raw type.
    pub fn has_raw_type_lower_or_equal_bound(
        &self,
        interner: &TypeInterner,
        store: &ClassStore,
        target: TypeId,
    ) -> bool {
        let Some(def) = queries::declared_def(interner, target) else {
            return false;
        };
        [BoundKind::Lower, BoundKind::Equal].iter().any(|&kind| {
            self.bounds[kind.idx()].iter().any(|&t| {
                queries::as_use_of_variable(interner, t).is_none()
                    && relations::as_super(interner, store, t, def)
                        .is_some_and(|sup| queries::is_raw(interner, sup))
            })
        })
    }

    /// The constraints implied by incorporating a capture bound tuple
    /// `(this, Ai, Bi)` where `Ai` is a wildcard, against the bounds this
    /// capture variable has already accumulated from the assignment
    /// context. `None` reports that the capture is impossible.
    pub(crate) fn wildcard_constraints(
        &self,
        interner: &TypeInterner,
        ai: TypeId,
        bi: TypeId,
    ) -> Option<ConstraintSet> {
        let mut set = ConstraintSet::new();

        // Only bounds against proper or inference types matter here; bare
        // variable uses are handled through dependency ordering.
        let relevant = |t: &TypeId| {
            queries::is_proper(interner, *t) || queries::is_inference_type(interner, *t)
        };
        let upper_non_var: Vec<TypeId> = self.bounds[BoundKind::Upper.idx()]
            .iter()
            .copied()
            .filter(relevant)
            .collect();
        let lower_non_var: Vec<TypeId> = self.bounds[BoundKind::Lower.idx()]
            .iter()
            .copied()
            .filter(relevant)
            .collect();

        for &t in &self.bounds[BoundKind::Equal.idx()] {
            if relevant(&t) {
                // var = R is incompatible with var being a capture of a
                // wildcard.
                return None;
            }
        }

        if queries::is_unbound_wildcard(interner, ai) {
            if !lower_non_var.is_empty() {
                return None;
            }
        } else if queries::is_upper_bounded_wildcard(interner, ai) {
            if !lower_non_var.is_empty() {
                return None;
            }
            let t = queries::wildcard_upper_bound(interner, ai).unwrap_or(TypeId::OBJECT);
            if queries::is_object(interner, bi) {
                for &r in &upper_non_var {
                    set.add(Constraint::typing(t, r, TypingKind::Subtype));
                }
            } else if queries::is_object(interner, t) {
                for &r in &upper_non_var {
                    set.add(Constraint::typing(bi, r, TypingKind::Subtype));
                }
            }
        } else {
            // Lower-bounded wildcard.
            for &r in &upper_non_var {
                set.add(Constraint::typing(bi, r, TypingKind::Subtype));
            }
            if let Some(t) = queries::wildcard_lower_bound(interner, ai) {
                for &r in &lower_non_var {
                    set.add(Constraint::typing(r, t, TypingKind::Subtype));
                }
            }
        }
        Some(set)
    }
}

#[cfg(test)]
#[path = "../tests/variable_tests.rs"]
mod variable_tests;
