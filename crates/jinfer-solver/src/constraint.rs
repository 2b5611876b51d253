//! Constraint formulas and their reduction into bounds.
//!
//! A [`Constraint`] is an unreduced typing assertion between two types (or
//! two qualifier sets). Reduction either settles it (true, false,
//! true-via-unchecked-conversion), records bounds on the inference
//! variables it mentions, or replaces it with simpler constraints:
//!
//! - `⟨S → T⟩` compatibility in a loose invocation context
//! - `⟨S <: T⟩` subtyping
//! - `⟨S <= T⟩` type-argument containment
//! - `⟨S = T⟩` type (or type-argument) equality
//!
//! The shapes of the rules follow JLS 18.2.2–18.2.4.

use crate::bound_set::BoundSet;
use crate::context::InferenceContext;
use crate::variable::BoundKind;
use indexmap::IndexSet;
use jinfer_types::{InferVar, QualSet, TypeId, TypeInterner, queries, relations, replace_infer_vars};
use rustc_hash::{FxBuildHasher, FxHashMap};
use smallvec::SmallVec;
use tracing::trace;

/// Kind of typing constraint.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypingKind {
    /// `⟨S → T⟩`: S is compatible in a loose invocation context with T.
    Compatible,
    /// `⟨S <: T⟩`.
    Subtype,
    /// `⟨S <= T⟩`: the type argument S is contained by the type argument T.
    Contained,
    /// `⟨S = T⟩`.
    Equality,
}

/// Kind of qualifier constraint.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum QualKind {
    Subtype,
    Equality,
}

/// An unreduced constraint.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Constraint {
    Typing {
        left: TypeId,
        right: TypeId,
        kind: TypingKind,
    },
    Qualifier {
        left: QualSet,
        right: QualSet,
        kind: QualKind,
    },
}

impl Constraint {
    pub fn typing(left: TypeId, right: TypeId, kind: TypingKind) -> Self {
        Constraint::Typing { left, right, kind }
    }

    pub fn qualifier(left: QualSet, right: QualSet, kind: QualKind) -> Self {
        Constraint::Qualifier { left, right, kind }
    }

    /// Inference variables mentioned by this constraint.
    pub fn infer_vars(&self, interner: &TypeInterner) -> SmallVec<[InferVar; 4]> {
        match *self {
            Constraint::Typing { left, right, .. } => {
                let mut vars = jinfer_types::collect_infer_vars(interner, left);
                for v in jinfer_types::collect_infer_vars(interner, right) {
                    if !vars.contains(&v) {
                        vars.push(v);
                    }
                }
                vars
            }
            Constraint::Qualifier { .. } => SmallVec::new(),
        }
    }
}

/// Outcome of reducing one constraint.
pub enum ReductionResult {
    /// Settled; any implied bounds were recorded on the variables.
    True,
    /// Contradiction in the underlying types.
    False(String),
    /// Contradiction only in the qualifier overlay.
    QualifierFalse(String),
    /// Settled, but only through unchecked conversion.
    Unchecked,
    /// Replaced by simpler constraints.
    Constraints(ConstraintSet),
}

/// An insertion-ordered, deduplicating set of pending constraints.
#[derive(Clone, Debug, Default)]
pub struct ConstraintSet {
    items: IndexSet<Constraint, FxBuildHasher>,
}

impl ConstraintSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(constraint: Constraint) -> Self {
        let mut set = Self::new();
        set.add(constraint);
        set
    }

    pub fn add(&mut self, constraint: Constraint) {
        self.items.insert(constraint);
    }

    pub fn extend(&mut self, other: ConstraintSet) {
        for c in other.items {
            self.items.insert(c);
        }
    }

    pub fn pop(&mut self) -> Option<Constraint> {
        self.items.shift_remove_index(0)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Constraint> {
        self.items.iter()
    }

    /// Substitutes resolved variables into every constraint.
    pub(crate) fn apply_instantiations(
        &mut self,
        interner: &TypeInterner,
        resolved: &FxHashMap<InferVar, TypeId>,
    ) {
        let lookup = |v: InferVar| resolved.get(&v).copied();
        let rebuilt: IndexSet<Constraint, FxBuildHasher> = self
            .items
            .iter()
            .map(|c| match *c {
                Constraint::Typing { left, right, kind } => Constraint::Typing {
                    left: replace_infer_vars(interner, left, &lookup),
                    right: replace_infer_vars(interner, right, &lookup),
                    kind,
                },
                q @ Constraint::Qualifier { .. } => q,
            })
            .collect();
        self.items = rebuilt;
    }

    /// Reduces every constraint (and every constraint those reductions
    /// spawn) into a bound set. Bounds land on the variables themselves;
    /// the returned set carries the mentioned variables, failure flags,
    /// and messages.
    pub fn reduce(mut self, ctx: &mut InferenceContext) -> BoundSet {
        let mut out = BoundSet::new();
        while let Some(c) = self.pop() {
            for v in c.infer_vars(ctx.types) {
                out.add_variable(v);
            }
            match c.reduce(ctx) {
                ReductionResult::True => {}
                ReductionResult::Unchecked => out.set_unchecked_conversion(),
                ReductionResult::False(msg) => {
                    trace!(message = %msg, "constraint reduced to false");
                    out.add_false(msg);
                }
                ReductionResult::QualifierFalse(msg) => out.mark_qualifier_failed(msg),
                ReductionResult::Constraints(more) => self.extend(more),
            }
        }
        out
    }
}

impl IntoIterator for ConstraintSet {
    type Item = Constraint;
    type IntoIter = indexmap::set::IntoIter<Constraint>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl Constraint {
    /// Reduces this constraint one step.
    pub(crate) fn reduce(self, ctx: &mut InferenceContext) -> ReductionResult {
        match self {
            Constraint::Typing { left, right, kind } => match kind {
                TypingKind::Compatible => reduce_compatible(ctx, left, right),
                TypingKind::Subtype => reduce_subtype(ctx, left, right),
                TypingKind::Contained => reduce_contained(ctx, left, right),
                TypingKind::Equality => reduce_equality(ctx, left, right),
            },
            Constraint::Qualifier { left, right, kind } => reduce_qualifier(ctx, left, right, kind),
        }
    }
}

fn failure(ctx: &InferenceContext, left: TypeId, relation: &str, right: TypeId) -> String {
    let fmt = ctx.formatter();
    format!("{} {relation} {}", fmt.format(left), fmt.format(right))
}

/// `⟨S → T⟩`, JLS 18.2.2.
fn reduce_compatible(ctx: &mut InferenceContext, s: TypeId, t: TypeId) -> ReductionResult {
    let (it, st) = (ctx.types, ctx.classes);
    let s_proper = queries::is_proper(it, s);
    let t_proper = queries::is_proper(it, t);

    if s_proper && t_proper {
        if relations::is_assignable(it, st, s, t) {
            return ReductionResult::True;
        }
        if relations::is_subtype_unchecked(it, st, s, t) {
            return ReductionResult::Unchecked;
        }
        return ReductionResult::False(failure(ctx, s, "is not compatible with", t));
    }
    if s_proper && queries::is_primitive(it, s) {
        return ReductionResult::Constraints(ConstraintSet::single(Constraint::typing(
            ctx.boxed(s),
            t,
            TypingKind::Compatible,
        )));
    }
    if t_proper && queries::is_primitive(it, t) {
        return ReductionResult::Constraints(ConstraintSet::single(Constraint::typing(
            s,
            ctx.boxed(t),
            TypingKind::Equality,
        )));
    }
    if queries::is_parameterized(it, t) && queries::as_use_of_variable(it, s).is_none() {
        // A raw supertype of S admits T only through unchecked conversion.
        if let Some(def) = queries::declared_def(it, t) {
            if let Some(s_sup) = relations::as_super(it, st, s, def) {
                if queries::is_raw(it, s_sup) && !queries::is_raw(it, t) {
                    return ReductionResult::Unchecked;
                }
            }
        }
    }
    if let (Some(sc), Some(tc)) = (queries::component_type(it, s), queries::component_type(it, t)) {
        if queries::is_parameterized(it, tc) {
            if let Some(tc_def) = queries::declared_def(it, tc) {
                if let Some(sc_sup) = relations::as_super(it, st, sc, tc_def) {
                    if queries::is_raw(it, sc_sup) {
                        return ReductionResult::Unchecked;
                    }
                }
            }
        }
    }
    ReductionResult::Constraints(ConstraintSet::single(Constraint::typing(
        s,
        t,
        TypingKind::Subtype,
    )))
}

/// `⟨S <: T⟩`, JLS 18.2.3.
fn reduce_subtype(ctx: &mut InferenceContext, s: TypeId, t: TypeId) -> ReductionResult {
    let (it, st) = (ctx.types, ctx.classes);

    if queries::is_proper(it, s) && queries::is_proper(it, t) {
        if relations::is_subtype(it, st, s, t) {
            return ReductionResult::True;
        }
        if relations::is_subtype_unchecked(it, st, s, t) {
            return ReductionResult::Unchecked;
        }
        return ReductionResult::False(failure(ctx, s, "is not a subtype of", t));
    }
    if queries::is_null(it, s) {
        // The null type is below every reference type; its qualifiers seed
        // a qualifier lower bound on a variable right-hand side.
        if let Some(t_var) = queries::as_use_of_variable(it, t) {
            let quals = queries::quals_of(it, s);
            ctx.add_qualifier_bound(t_var, BoundKind::Lower, quals);
        }
        return ReductionResult::True;
    }
    if queries::is_null(it, t) {
        return ReductionResult::False(failure(ctx, s, "is not a subtype of", t));
    }

    let s_var = queries::as_use_of_variable(it, s);
    let t_var = queries::as_use_of_variable(it, t);
    if s_var.is_some() || t_var.is_some() {
        if let Some(sv) = s_var {
            // A capture fresh variable on the right contributes its lower
            // bound instead of itself.
            if queries::is_lower_bounded_fresh_var(it, t) {
                if let Some(lower) = queries::type_var_lower_bound(it, t) {
                    ctx.add_bound(sv, BoundKind::Upper, lower);
                }
            } else {
                ctx.add_bound(sv, BoundKind::Upper, t);
            }
        }
        if let Some(tv) = t_var {
            if matches!(it.lookup(s), Some(jinfer_types::TypeData::FreshVar { .. })) {
                if let Some(upper) = queries::type_var_upper_bound(it, st, s) {
                    ctx.add_bound(tv, BoundKind::Lower, upper);
                }
            }
            ctx.add_bound(tv, BoundKind::Lower, s);
        }
        return ReductionResult::True;
    }

    match it.lookup(t) {
        Some(jinfer_types::TypeData::Declared { def, raw, .. }) => {
            if queries::is_parameterized(it, t) && !raw {
                // Decompose through S's projection onto T's declaration;
                // capture first so wildcards do not leak into the
                // per-argument constraints.
                let Some(s_sup) = relations::as_super(it, st, s, def) else {
                    return ReductionResult::False(failure(ctx, s, "is not a subtype of", t));
                };
                let s_sup = jinfer_types::capture(it, st, s_sup);
                if queries::is_raw(it, s_sup) {
                    return ReductionResult::Unchecked;
                }
                let (Some(s_args), Some(t_args)) = (
                    queries::type_arguments(it, s_sup),
                    queries::type_arguments(it, t),
                ) else {
                    return ReductionResult::False(failure(ctx, s, "is not a subtype of", t));
                };
                if s_args.len() != t_args.len() {
                    return ReductionResult::False(failure(ctx, s, "is not a subtype of", t));
                }
                let mut set = ConstraintSet::new();
                for (&b, &a) in s_args.iter().zip(t_args.iter()) {
                    set.add(Constraint::typing(b, a, TypingKind::Contained));
                }
                ReductionResult::Constraints(set)
            } else {
                // Non-parameterized class: true when T is among the
                // supertypes of S.
                if relations::as_super(it, st, s, def).is_some() {
                    ReductionResult::True
                } else {
                    ReductionResult::False(failure(ctx, s, "is not a subtype of", t))
                }
            }
        }
        Some(jinfer_types::TypeData::Array { component: tc, .. }) => {
            let Some(ms_array) = queries::most_specific_array_type(it, st, s) else {
                return ReductionResult::False(failure(ctx, s, "is not a subtype of", t));
            };
            if queries::is_primitive_array(it, ms_array) && queries::is_primitive(it, tc) {
                return ReductionResult::True;
            }
            match queries::component_type(it, ms_array) {
                Some(sc) => ReductionResult::Constraints(ConstraintSet::single(
                    Constraint::typing(sc, tc, TypingKind::Subtype),
                )),
                None => ReductionResult::False(failure(ctx, s, "is not a subtype of", t)),
            }
        }
        Some(jinfer_types::TypeData::Wildcard { .. })
        | Some(jinfer_types::TypeData::TypeVar { .. })
        | Some(jinfer_types::TypeData::FreshVar { .. }) => {
            if queries::intersection_bounds(it, s).is_some() {
                return ReductionResult::True;
            }
            if queries::is_lower_bounded_fresh_var(it, t) {
                if let Some(lower) = queries::type_var_lower_bound(it, t) {
                    return ReductionResult::Constraints(ConstraintSet::single(
                        Constraint::typing(s, lower, TypingKind::Subtype),
                    ));
                }
            }
            if queries::is_lower_bounded_wildcard(it, t) {
                if let Some(lower) = queries::wildcard_lower_bound(it, t) {
                    return ReductionResult::Constraints(ConstraintSet::single(
                        Constraint::typing(s, lower, TypingKind::Subtype),
                    ));
                }
            }
            ReductionResult::False(failure(ctx, s, "is not a subtype of", t))
        }
        Some(jinfer_types::TypeData::Intersection(list)) => {
            let mut set = ConstraintSet::new();
            for &bound in it.list(list).iter() {
                set.add(Constraint::typing(s, bound, TypingKind::Subtype));
            }
            ReductionResult::Constraints(set)
        }
        _ => ReductionResult::False(failure(ctx, s, "is not a subtype of", t)),
    }
}

/// `⟨S <= T⟩`, JLS 18.2.3.
fn reduce_contained(ctx: &mut InferenceContext, s: TypeId, t: TypeId) -> ReductionResult {
    let it = ctx.types;

    if !queries::is_wildcard(it, t) {
        if queries::is_wildcard(it, s) {
            return ReductionResult::False(failure(ctx, s, "is not contained by", t));
        }
        return ReductionResult::Constraints(ConstraintSet::single(Constraint::typing(
            s,
            t,
            TypingKind::Equality,
        )));
    }
    if queries::is_unbound_wildcard(it, t) {
        return ReductionResult::True;
    }
    if queries::is_upper_bounded_wildcard(it, t) {
        let bound = queries::wildcard_upper_bound(it, t).unwrap_or(TypeId::OBJECT);
        if queries::is_wildcard(it, s) {
            if queries::is_lower_bounded_wildcard(it, s) {
                let s_lower = queries::wildcard_lower_bound(it, s).unwrap_or(TypeId::OBJECT);
                return ReductionResult::Constraints(ConstraintSet::single(Constraint::typing(
                    s_lower,
                    bound,
                    TypingKind::Equality,
                )));
            }
            let s_upper = queries::wildcard_upper_bound(it, s).unwrap_or(TypeId::OBJECT);
            return ReductionResult::Constraints(ConstraintSet::single(Constraint::typing(
                s_upper,
                bound,
                TypingKind::Subtype,
            )));
        }
        return ReductionResult::Constraints(ConstraintSet::single(Constraint::typing(
            s,
            bound,
            TypingKind::Subtype,
        )));
    }
    // T is a lower-bounded wildcard `? super T'`.
    let t_lower = queries::wildcard_lower_bound(it, t).unwrap_or(TypeId::OBJECT);
    if !queries::is_wildcard(it, s) {
        return ReductionResult::Constraints(ConstraintSet::single(Constraint::typing(
            t_lower,
            s,
            TypingKind::Subtype,
        )));
    }
    if queries::is_lower_bounded_wildcard(it, s) {
        let s_lower = queries::wildcard_lower_bound(it, s).unwrap_or(TypeId::OBJECT);
        return ReductionResult::Constraints(ConstraintSet::single(Constraint::typing(
            t_lower,
            s_lower,
            TypingKind::Subtype,
        )));
    }
    ReductionResult::False(failure(ctx, s, "is not contained by", t))
}

/// `⟨S = T⟩`, JLS 18.2.4.
fn reduce_equality(ctx: &mut InferenceContext, s: TypeId, t: TypeId) -> ReductionResult {
    let it = ctx.types;

    if s == t {
        return ReductionResult::True;
    }
    if queries::is_null(it, s)
        || queries::is_primitive(it, s)
        || queries::is_null(it, t)
        || queries::is_primitive(it, t)
    {
        return ReductionResult::False(failure(ctx, s, "is not the same type as", t));
    }

    let s_var = queries::as_use_of_variable(it, s);
    let t_var = queries::as_use_of_variable(it, t);
    if s_var.is_some() || t_var.is_some() {
        if let Some(sv) = s_var {
            ctx.add_bound(sv, BoundKind::Equal, t);
        }
        if let Some(tv) = t_var {
            ctx.add_bound(tv, BoundKind::Equal, s);
        }
        return ReductionResult::True;
    }

    // Types that differ only in their primary qualifiers reduce to a
    // qualifier constraint: a mismatch there is the soft failure mode.
    let s_stripped = jinfer_types::with_qualifiers(it, s, QualSet::empty());
    let t_stripped = jinfer_types::with_qualifiers(it, t, QualSet::empty());
    if s_stripped == t_stripped {
        return ReductionResult::Constraints(ConstraintSet::single(Constraint::qualifier(
            queries::quals_of(it, s),
            queries::quals_of(it, t),
            QualKind::Equality,
        )));
    }

    let s_def = queries::declared_def(it, s);
    let t_def = queries::declared_def(it, t);
    if let (Some(sd), Some(td)) = (s_def, t_def) {
        if sd == td {
            let (Some(s_args), Some(t_args)) = (
                queries::type_arguments(it, s),
                queries::type_arguments(it, t),
            ) else {
                return ReductionResult::False(failure(ctx, s, "is not the same type as", t));
            };
            if s_args.len() == t_args.len() {
                let mut set = ConstraintSet::new();
                for (&ta, &sa) in t_args.iter().zip(s_args.iter()) {
                    if ta != sa {
                        set.add(Constraint::typing(ta, sa, TypingKind::Equality));
                    }
                }
                return ReductionResult::Constraints(set);
            }
        }
        return ReductionResult::False(failure(ctx, s, "is not the same type as", t));
    }

    if let (Some(sc), Some(tc)) = (queries::component_type(it, s), queries::component_type(it, t)) {
        return ReductionResult::Constraints(ConstraintSet::single(Constraint::typing(
            sc,
            tc,
            TypingKind::Equality,
        )));
    }

    if queries::is_wildcard(it, s) && queries::is_wildcard(it, t) {
        if queries::is_unbound_wildcard(it, s) && queries::is_unbound_wildcard(it, t) {
            return ReductionResult::True;
        }
        if !queries::is_lower_bounded_wildcard(it, s) && !queries::is_lower_bounded_wildcard(it, t)
        {
            let su = queries::wildcard_upper_bound(it, s).unwrap_or(TypeId::OBJECT);
            let tu = queries::wildcard_upper_bound(it, t).unwrap_or(TypeId::OBJECT);
            return ReductionResult::Constraints(ConstraintSet::single(Constraint::typing(
                su,
                tu,
                TypingKind::Equality,
            )));
        }
        if queries::is_lower_bounded_wildcard(it, s) && queries::is_lower_bounded_wildcard(it, t) {
            let sl = queries::wildcard_lower_bound(it, s).unwrap_or(TypeId::OBJECT);
            let tl = queries::wildcard_lower_bound(it, t).unwrap_or(TypeId::OBJECT);
            return ReductionResult::Constraints(ConstraintSet::single(Constraint::typing(
                tl,
                sl,
                TypingKind::Equality,
            )));
        }
    }
    ReductionResult::False(failure(ctx, s, "is not the same type as", t))
}

/// Qualifier constraints: checked against the installed lattice. Failure
/// is the soft, qualifier-only inference failure.
fn reduce_qualifier(
    ctx: &InferenceContext,
    left: QualSet,
    right: QualSet,
    kind: QualKind,
) -> ReductionResult {
    let ok = match kind {
        QualKind::Subtype => ctx.quals.is_subqualifier(left, right),
        QualKind::Equality => {
            ctx.quals.is_subqualifier(left, right) && ctx.quals.is_subqualifier(right, left)
        }
    };
    if ok {
        ReductionResult::True
    } else {
        ReductionResult::QualifierFalse(format!(
            "qualifier {left:?} is not compatible with {right:?}"
        ))
    }
}

#[cfg(test)]
#[path = "../tests/constraint_tests.rs"]
mod constraint_tests;
