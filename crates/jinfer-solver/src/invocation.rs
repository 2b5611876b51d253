//! Invocation type inference: the library front door.
//!
//! Given a generic method or constructor signature, the argument types at
//! a call site, and (optionally) the assignment-context target type, this
//! module runs the whole pipeline: theta construction, initial bounds,
//! argument compatibility constraints, target-type constraints (with
//! wildcard capture of the return type where required), and resolution.
//!
//! Outcomes follow the engine's error taxonomy: instantiations, a
//! qualifier-only failure that still carries the instantiations, or an
//! ordinary inference failure with diagnostics. Engine defects surface as
//! `Err(SolverError)` and are never folded into the result.

use crate::bound_set::BoundSet;
use crate::capture::CaptureBound;
use crate::constraint::{Constraint, ConstraintSet, TypingKind};
use crate::context::{InferenceContext, SolverError};
use crate::resolution;
use crate::variable::VarKind;
use indexmap::IndexMap;
use jinfer_types::{InferVar, ParamId, Substitution, TypeId, erasure, queries, substitute};
use rustc_hash::FxBuildHasher;
use tracing::debug;

/// A type-level method or constructor signature. All types may mention
/// the declaration's type parameters as `TypeVar` uses.
#[derive(Clone, Debug)]
pub struct MethodSig {
    /// The method's own type parameters, in declaration order.
    pub type_params: Vec<ParamId>,
    /// Formal parameter types.
    pub params: Vec<TypeId>,
    /// Return type.
    pub return_type: TypeId,
    /// Thrown types.
    pub throws: Vec<TypeId>,
}

/// The per-invocation map from type parameters to fresh inference
/// variables.
pub struct Theta {
    entries: IndexMap<ParamId, InferVar, FxBuildHasher>,
}

impl Theta {
    /// Mints one fresh variable per type parameter.
    pub fn for_params(ctx: &mut InferenceContext, params: &[ParamId]) -> Self {
        let mut entries = IndexMap::default();
        for &param in params {
            let var = ctx.fresh_variable(param, VarKind::Invocation);
            entries.insert(param, var);
        }
        Self { entries }
    }

    /// The substitution replacing each parameter with a use of its
    /// variable.
    pub fn substitution(&self, interner: &jinfer_types::TypeInterner) -> Substitution {
        let mut subst = Substitution::new();
        for (&param, &var) in &self.entries {
            subst.insert(param, interner.use_of(var));
        }
        subst
    }

    pub fn var(&self, param: ParamId) -> Option<InferVar> {
        self.entries.get(&param).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ParamId, InferVar)> + '_ {
        self.entries.iter().map(|(&p, &v)| (p, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of invocation inference.
#[derive(Clone, Debug, PartialEq)]
pub enum InferenceResult {
    /// Every type parameter has an instantiation.
    Instantiated {
        arguments: IndexMap<ParamId, TypeId, FxBuildHasher>,
        /// Whether applicability needed unchecked conversion; the caller
        /// is expected to erase the return and thrown types in that case.
        unchecked_conversion: bool,
    },
    /// The underlying types were inferred, but the qualifier overlay
    /// could not be satisfied. Usable with a warning.
    QualifierFailed {
        arguments: IndexMap<ParamId, TypeId, FxBuildHasher>,
        message: String,
    },
    /// The call site's argument types are incompatible with the
    /// declaration: the expected outcome for ill-typed calls.
    Failed { message: String },
}

/// Runs invocation type inference for one call site.
pub fn infer_invocation(
    ctx: &mut InferenceContext,
    sig: &MethodSig,
    args: &[TypeId],
    target: Option<TypeId>,
) -> Result<InferenceResult, SolverError> {
    if args.len() != sig.params.len() {
        return Ok(InferenceResult::Failed {
            message: format!(
                "expected {} arguments but found {}",
                sig.params.len(),
                args.len()
            ),
        });
    }

    let theta = Theta::for_params(ctx, &sig.type_params);
    let subst = theta.substitution(ctx.types);
    let mut bounds = BoundSet::initial_bounds(ctx, &theta);

    // A type parameter in the throws clause resolves preferentially to
    // RuntimeException.
    for &thrown in &sig.throws {
        let thrown = substitute(ctx.types, thrown, &subst);
        if let Some(var) = queries::as_use_of_variable(ctx.types, thrown) {
            ctx.set_throws_bound(var);
        }
    }

    // Applicability constraints: each argument compatible with its
    // formal.
    let mut constraints = ConstraintSet::new();
    for (&arg, &formal) in args.iter().zip(sig.params.iter()) {
        let formal = substitute(ctx.types, formal, &subst);
        constraints.add(Constraint::typing(arg, formal, TypingKind::Compatible));
    }
    let reduced = constraints.reduce(ctx);
    bounds.incorporate_to_fixed_point(ctx, reduced)?;

    if let Some(target) = target {
        if !bounds.contains_false() {
            let return_type = substitute(ctx.types, sig.return_type, &subst);
            incorporate_target(ctx, &mut bounds, return_type, target)?;
        }
    }

    if !bounds.contains_false() {
        bounds.resolve(ctx)?;
    }

    if bounds.contains_false() {
        return Ok(InferenceResult::Failed {
            message: bounds.error_message(),
        });
    }

    let mut arguments: IndexMap<ParamId, TypeId, FxBuildHasher> = IndexMap::default();
    for (param, var) in theta.iter() {
        match ctx.instantiation(var) {
            Some(ty) => {
                arguments.insert(param, ty);
            }
            None => {
                return Ok(InferenceResult::Failed {
                    message: format!("no instantiation found for {var}"),
                });
            }
        }
    }
    debug!(inferred = arguments.len(), "invocation inference finished");

    if bounds.qualifier_failed() {
        return Ok(InferenceResult::QualifierFailed {
            arguments,
            message: bounds.error_message(),
        });
    }
    Ok(InferenceResult::Instantiated {
        arguments,
        unchecked_conversion: bounds.is_unchecked_conversion(),
    })
}

/// Constrains the (substituted) return type against the assignment
/// context.
fn incorporate_target(
    ctx: &mut InferenceContext,
    bounds: &mut BoundSet,
    return_type: TypeId,
    target: TypeId,
) -> Result<(), SolverError> {
    let it = ctx.types;

    if bounds.is_unchecked_conversion() {
        // Applicability needed unchecked conversion: only the erasure of
        // the return type is compatible with the target.
        let erased = erasure(it, ctx.classes, return_type);
        let reduced = ConstraintSet::single(Constraint::typing(
            erased,
            target,
            TypingKind::Compatible,
        ))
        .reduce(ctx);
        return bounds.incorporate_to_fixed_point(ctx, reduced);
    }

    if queries::is_wildcard_parameterized(it, return_type) {
        // R is G<..> with a wildcard argument: capture it with fresh
        // inference variables and constrain the capture against the
        // target.
        let capture = CaptureBound::new(ctx, return_type);
        let capture_bounds = capture.incorporate(ctx, Some(target))?;
        return bounds.incorporate_to_fixed_point(ctx, capture_bounds);
    }

    if let Some(alpha) = queries::as_use_of_variable(it, return_type) {
        // R is itself an inference variable. Under the conditions of JLS
        // 18.5.2.1 the variable must be resolved eagerly and its
        // instantiation constrained against the target.
        let vb = &ctx.var(alpha).bounds;
        let eager = if queries::is_primitive(it, target) {
            vb.has_primitive_wrapper_bound(it, ctx.classes)
        } else if !queries::is_wildcard_parameterized(it, target) {
            vb.has_wildcard_parameterized_lower_or_equal_bound(it)
                || vb.has_lower_bound_different_param(it, ctx.classes)
        } else if queries::is_parameterized(it, target) {
            vb.has_raw_type_lower_or_equal_bound(it, ctx.classes, target)
        } else {
            false
        };
        if eager {
            resolution::resolve_one(ctx, alpha, bounds)?;
            if bounds.contains_false() {
                return Ok(());
            }
            if let Some(inst) = ctx.instantiation(alpha) {
                let u = jinfer_types::capture(it, ctx.classes, inst);
                let reduced =
                    ConstraintSet::single(Constraint::typing(u, target, TypingKind::Compatible))
                        .reduce(ctx);
                return bounds.incorporate_to_fixed_point(ctx, reduced);
            }
        }
    }

    let reduced = ConstraintSet::single(Constraint::typing(
        return_type,
        target,
        TypingKind::Compatible,
    ))
    .reduce(ctx);
    bounds.incorporate_to_fixed_point(ctx, reduced)
}

#[cfg(test)]
#[path = "../tests/invocation_tests.rs"]
mod invocation_tests;
