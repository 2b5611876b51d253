//! Wildcard capture bounds.
//!
//! A [`CaptureBound`] records `G<a1..an> = capture(G<A1..An>)`: fresh
//! capture variables substituted for a parameterized type's arguments,
//! together with the substituted declared bound of each type parameter.
//! Incorporating the bound derives everything the capture implies: plain
//! equalities for non-wildcard arguments, compatibility of the
//! synthesized left-hand type with the assignment context, and the
//! wildcard-derived bounds on each capture variable.

use crate::bound_set::BoundSet;
use crate::constraint::{Constraint, ConstraintSet, TypingKind};
use crate::context::{InferenceContext, SolverError};
use crate::variable::{BoundKind, VarKind};
use jinfer_types::{InferVar, Substitution, TypeId, queries, substitute};
use smallvec::SmallVec;
use tracing::debug;

/// One captured type argument: the capture variable standing for it, the
/// argument as written, and the declared bound of the corresponding type
/// parameter with the capture substitution applied.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureTuple {
    pub var: InferVar,
    pub arg: TypeId,
    pub bound: TypeId,
}

/// `G<a1..an> = capture(G<A1..An>)`.
#[derive(Clone, Debug, PartialEq)]
pub struct CaptureBound {
    /// The captured right-hand type `G<A1..An>`.
    captured: TypeId,
    /// The synthesized left-hand type `G<a1..an>`.
    left: TypeId,
    tuples: Vec<CaptureTuple>,
}

impl CaptureBound {
    /// Mints one fresh capture variable per type parameter of the
    /// captured type's declaration and builds the substituted tuples.
    pub fn new(ctx: &mut InferenceContext, captured: TypeId) -> Self {
        let Some(def) = queries::declared_def(ctx.types, captured) else {
            debug_assert!(false, "capture of a non-declared type");
            return Self {
                captured,
                left: captured,
                tuples: Vec::new(),
            };
        };
        let decl = ctx.classes.class(def);
        let args = queries::type_arguments(ctx.types, captured).unwrap_or_default();
        debug_assert_eq!(decl.type_params.len(), args.len());

        let mut subst = Substitution::new();
        let mut vars = Vec::with_capacity(args.len());
        for &param in &decl.type_params {
            let var = ctx.fresh_variable(param, VarKind::Capture);
            subst.insert(param, ctx.types.use_of(var));
            vars.push(var);
        }

        let mut tuples = Vec::with_capacity(args.len());
        let mut left_args = Vec::with_capacity(args.len());
        for ((&param, &arg), &var) in decl.type_params.iter().zip(args.iter()).zip(vars.iter()) {
            let declared = ctx.classes.param(param).bound;
            tuples.push(CaptureTuple {
                var,
                arg,
                bound: substitute(ctx.types, declared, &subst),
            });
            left_args.push(ctx.types.use_of(var));
        }
        let left = ctx.types.declared(def, &left_args);
        debug!(captured = captured.0, left = left.0, vars = tuples.len(), "built capture bound");
        Self {
            captured,
            left,
            tuples,
        }
    }

    /// The captured right-hand type.
    pub fn captured(&self) -> TypeId {
        self.captured
    }

    /// The synthesized left-hand type `G<a1..an>`.
    pub fn left(&self) -> TypeId {
        self.left
    }

    pub fn tuples(&self) -> &[CaptureTuple] {
        &self.tuples
    }

    /// The left-hand capture variables.
    pub fn capture_vars(&self) -> SmallVec<[InferVar; 4]> {
        self.tuples.iter().map(|t| t.var).collect()
    }

    /// Every variable mentioned anywhere in this bound.
    pub(crate) fn mentioned_vars(
        &self,
        interner: &jinfer_types::TypeInterner,
    ) -> SmallVec<[InferVar; 8]> {
        let mut out: SmallVec<[InferVar; 8]> = SmallVec::new();
        let mut push = |v: InferVar| {
            if !out.contains(&v) {
                out.push(v);
            }
        };
        for t in &self.tuples {
            push(t.var);
        }
        for t in &self.tuples {
            for v in jinfer_types::collect_infer_vars(interner, t.arg) {
                push(v);
            }
            for v in jinfer_types::collect_infer_vars(interner, t.bound) {
                push(v);
            }
        }
        for v in jinfer_types::collect_infer_vars(interner, self.captured) {
            push(v);
        }
        out
    }

    /// Derives the bounds this capture implies, in context order:
    ///
    /// 1. each non-wildcard argument pins its capture variable by
    ///    equality;
    /// 2. the synthesized `G<a1..an>` must be compatible with `target`,
    ///    reduced and incorporated *first* so assignment-context
    ///    information reaches the capture variables before the wildcard
    ///    bounds are computed;
    /// 3. each wildcard argument contributes its direct bounds and the
    ///    constraints derived against the bounds accumulated in step 2 —
    ///    an impossible derivation marks the set false but the remaining
    ///    tuples still contribute (partial information helps
    ///    diagnostics);
    /// 4. everything is reduced, this bound records itself, and the
    ///    results merge.
    pub fn incorporate(
        &self,
        ctx: &mut InferenceContext,
        target: Option<TypeId>,
    ) -> Result<BoundSet, SolverError> {
        let mut bounds = BoundSet::new();
        for var in self.capture_vars() {
            bounds.add_variable(var);
        }

        for tuple in &self.tuples {
            if !queries::is_wildcard(ctx.types, tuple.arg) {
                ctx.add_bound(tuple.var, BoundKind::Equal, tuple.arg);
            }
        }

        if let Some(target) = target {
            let compat = ConstraintSet::single(Constraint::typing(
                self.left,
                target,
                TypingKind::Compatible,
            ));
            let reduced = compat.reduce(ctx);
            bounds.incorporate_to_fixed_point(ctx, reduced)?;
        }

        let mut wildcard_constraints = ConstraintSet::new();
        for tuple in &self.tuples {
            if !queries::is_wildcard(ctx.types, tuple.arg) {
                continue;
            }
            match ctx
                .var(tuple.var)
                .bounds
                .wildcard_constraints(ctx.types, tuple.arg, tuple.bound)
            {
                Some(derived) => wildcard_constraints.extend(derived),
                None => {
                    let fmt = ctx.formatter();
                    bounds.add_false(format!(
                        "cannot capture {} as {}",
                        fmt.format(tuple.arg),
                        fmt.format(self.captured),
                    ));
                }
            }
            self.add_direct_wildcard_bounds(ctx, tuple);
        }

        let reduced = wildcard_constraints.reduce(ctx);
        bounds.add_capture(self.clone());
        bounds.incorporate_to_fixed_point(ctx, reduced)?;
        Ok(bounds)
    }

    /// The bounds a wildcard argument puts on its capture variable
    /// directly: `?` gives `ai <: Biθ`; `? extends U` gives `ai <: U` and
    /// `ai <: Biθ`; `? super L` gives `L <: ai` and `ai <: Biθ`.
    fn add_direct_wildcard_bounds(&self, ctx: &mut InferenceContext, tuple: &CaptureTuple) {
        ctx.add_bound(tuple.var, BoundKind::Upper, tuple.bound);
        if queries::is_upper_bounded_wildcard(ctx.types, tuple.arg) {
            if let Some(upper) = queries::wildcard_upper_bound(ctx.types, tuple.arg) {
                ctx.add_bound(tuple.var, BoundKind::Upper, upper);
            }
        } else if let Some(lower) = queries::wildcard_lower_bound(ctx.types, tuple.arg) {
            ctx.add_bound(tuple.var, BoundKind::Lower, lower);
        }
    }
}

#[cfg(test)]
#[path = "../tests/capture_tests.rs"]
mod capture_tests;
