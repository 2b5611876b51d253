//! Resolution: choosing an instantiation for each variable.
//!
//! Resolution repeatedly picks the smallest set of unresolved variables
//! that is closed under dependencies and instantiates it. Two strategies:
//!
//! - **without capture**: variables with proper lower bounds take the
//!   least upper bound of those; the rest take the greatest lower bound
//!   of their proper upper bounds (`RuntimeException` when a throws
//!   bound allows it). Attempted first, under a checkpoint.
//! - **with capture**: used for capture variables and as the fallback
//!   when the first strategy contradicts itself — the affected capture
//!   bounds are dropped and each variable is pinned to a fresh type
//!   variable built from its bounds.
//!
//! Every instantiation feeds back through `incorporate_to_fixed_point`.

use crate::bound_set::BoundSet;
use crate::context::{FxIndexSet, InferenceContext, SolverError};
use crate::dependencies::Dependencies;
use crate::variable::BoundKind;
use jinfer_types::{InferVar, TypeId, glb, lub, queries, relations, with_qualifiers};
use tracing::{debug, trace};

/// Resolves every variable in `as_vars` (and everything they depend on).
pub fn resolve_all(
    ctx: &mut InferenceContext,
    mut as_vars: FxIndexSet<InferVar>,
    bound_set: &mut BoundSet,
) -> Result<(), SolverError> {
    let resolved = bound_set.instantiated_variables(ctx);
    as_vars.retain(|v| !resolved.contains(v));
    if as_vars.is_empty() {
        return Ok(());
    }

    let deps = bound_set.dependencies(ctx);
    let mut unresolved: FxIndexSet<InferVar> = as_vars.clone();
    for &var in &as_vars {
        for dep in deps.get(var) {
            unresolved.insert(dep);
        }
    }
    unresolved.retain(|v| !resolved.contains(v));
    if unresolved.is_empty() {
        return Ok(());
    }
    resolve_queue(ctx, &deps, unresolved, bound_set)
}

/// Resolves the single variable `var` (and its dependencies).
pub fn resolve_one(
    ctx: &mut InferenceContext,
    var: InferVar,
    bound_set: &mut BoundSet,
) -> Result<(), SolverError> {
    if ctx.var(var).bounds.has_instantiation() {
        return Ok(());
    }
    let deps = bound_set.dependencies(ctx);
    let mut unresolved = FxIndexSet::default();
    unresolved.insert(var);
    let set = smallest_dependency_set(ctx, &deps, &bound_set.instantiated_variables(ctx), &unresolved);
    resolve_smallest_set(ctx, &deps, set, bound_set)
}

fn resolve_queue(
    ctx: &mut InferenceContext,
    deps: &Dependencies,
    mut unresolved: FxIndexSet<InferVar>,
    bound_set: &mut BoundSet,
) -> Result<(), SolverError> {
    let mut resolved = bound_set.instantiated_variables(ctx);
    while !unresolved.is_empty() {
        if bound_set.contains_false() {
            return Ok(());
        }
        let smallest = smallest_dependency_set(ctx, deps, &resolved, &unresolved);
        resolve_smallest_set(ctx, deps, smallest, bound_set)?;

        let now_resolved = bound_set.instantiated_variables(ctx);
        if now_resolved.len() == resolved.len() && !bound_set.contains_false() {
            // No strategy made progress; report instead of spinning.
            bound_set.add_false("type argument resolution made no progress".to_string());
            return Ok(());
        }
        resolved = now_resolved;
        unresolved.retain(|v| !resolved.contains(v));
    }
    Ok(())
}

/// The smallest per-variable dependency set not yet resolved.
fn smallest_dependency_set(
    _ctx: &InferenceContext,
    deps: &Dependencies,
    resolved: &[InferVar],
    unresolved: &FxIndexSet<InferVar>,
) -> FxIndexSet<InferVar> {
    let mut smallest: Option<FxIndexSet<InferVar>> = None;
    for &alpha in unresolved {
        let mut set = deps.get(alpha);
        set.retain(|v| !resolved.contains(v));
        let better = smallest.as_ref().is_none_or(|s| set.len() < s.len());
        if better {
            smallest = Some(set);
        }
        if smallest.as_ref().is_some_and(|s| s.len() == 1) {
            // A variable always depends on itself, so one is minimal.
            break;
        }
    }
    smallest.unwrap_or_default()
}

fn resolve_smallest_set(
    ctx: &mut InferenceContext,
    _deps: &Dependencies,
    as_vars: FxIndexSet<InferVar>,
    bound_set: &mut BoundSet,
) -> Result<(), SolverError> {
    if as_vars.is_empty() {
        return Ok(());
    }
    debug!(vars = as_vars.len(), "resolving dependency set");
    if bound_set.contains_capture(&as_vars) {
        resolve_without_capture(ctx, &as_vars, bound_set)?;
        if bound_set.contains_false() {
            return Ok(());
        }
        let mut rest = as_vars;
        let resolved = bound_set.instantiated_variables(ctx);
        rest.retain(|v| !resolved.contains(v));
        resolve_with_capture(ctx, &rest, bound_set)
    } else {
        // Checkpoint, try plain resolution, fall back to capture-style
        // resolution if the attempt contradicts itself.
        let before = bound_set.clone();
        bound_set.save_bounds(ctx);
        resolve_without_capture(ctx, &as_vars, bound_set)?;
        if !bound_set.contains_false() {
            return Ok(());
        }
        trace!("plain resolution failed, retrying with capture");
        *bound_set = before;
        bound_set.restore(ctx);
        resolve_with_capture(ctx, &as_vars, bound_set)
    }
}

/// Applies known instantiations to `vars` until that stops producing new
/// instantiations, then drops the instantiated ones.
fn apply_and_remove_instantiations(ctx: &mut InferenceContext, vars: &mut Vec<InferVar>) {
    loop {
        let mut changed = false;
        for &v in vars.iter() {
            if ctx.var(v).bounds.has_instantiation() {
                continue;
            }
            ctx.apply_instantiations_var(v);
            if ctx.var(v).bounds.has_instantiation() {
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
    vars.retain(|&v| !ctx.var(v).bounds.has_instantiation());
}

fn resolve_without_capture(
    ctx: &mut InferenceContext,
    as_vars: &FxIndexSet<InferVar>,
    bound_set: &mut BoundSet,
) -> Result<(), SolverError> {
    let mut vars: Vec<InferVar> = as_vars
        .iter()
        .copied()
        .filter(|&v| !ctx.is_capture(v))
        .collect();
    apply_and_remove_instantiations(ctx, &mut vars);

    // Proper lower bounds first; each instantiation may give another
    // variable a proper lower bound, so iterate.
    loop {
        let mut changed = false;
        for &ai in &vars.clone() {
            let lower = ctx.var(ai).bounds.proper_lower_bounds(ctx.types);
            if !lower.is_empty() {
                resolve_with_lower_bounds(ctx, ai, &lower, bound_set);
                changed = true;
            }
        }
        apply_and_remove_instantiations(ctx, &mut vars);
        if !changed {
            break;
        }
    }

    // The rest through proper upper bounds; Object is always there, so
    // this instantiates everything that is left.
    for &ai in &vars.clone() {
        let upper = ctx.var(ai).bounds.proper_upper_bounds(ctx.types);
        if !upper.is_empty() {
            resolve_with_upper_bounds(ctx, ai, &upper, bound_set);
        }
    }
    apply_and_remove_instantiations(ctx, &mut vars);

    let mut resolved_bounds = BoundSet::new();
    if !vars.is_empty() {
        let names: Vec<String> = vars.iter().map(|v| v.to_string()).collect();
        resolved_bounds.add_false(format!(
            "no instantiation found for {}",
            names.join(", ")
        ));
    }
    bound_set.incorporate_to_fixed_point(ctx, resolved_bounds)
}

/// Pins `ai` to the least upper bound of its proper lower bounds, with
/// the qualifier lower bounds folded in.
fn resolve_with_lower_bounds(
    ctx: &mut InferenceContext,
    ai: InferVar,
    lower: &[TypeId],
    bound_set: &mut BoundSet,
) {
    let Some(mut lub_ty) = lub(ctx.types, ctx.classes, lower) else {
        return;
    };
    let qual_lower: Vec<_> = ctx.var(ai).bounds.qual_bounds_of(BoundKind::Lower).collect();
    if !qual_lower.is_empty() {
        let mut acc = queries::quals_of(ctx.types, lub_ty);
        for q in qual_lower {
            acc = ctx.quals.lub(acc, q);
        }
        lub_ty = with_qualifiers(ctx.types, lub_ty, acc);
    }
    trace!(var = ai.0, ty = lub_ty.0, "instantiating from lower bounds");
    ctx.add_bound(ai, BoundKind::Equal, lub_ty);
    bound_set.add_variable(ai);
}

/// Pins `ai` to the greatest lower bound of its proper upper bounds; a
/// variable with a throws bound whose uppers admit `RuntimeException`
/// takes that instead.
fn resolve_with_upper_bounds(
    ctx: &mut InferenceContext,
    ai: InferVar,
    upper: &[TypeId],
    bound_set: &mut BoundSet,
) {
    let throws = ctx.var(ai).bounds.has_throws_bound();
    if throws {
        if let Some(rtx_def) = ctx.classes.runtime_exception() {
            let rtx = ctx.types.declared(rtx_def, &[]);
            if upper
                .iter()
                .any(|&li| relations::is_subtype(ctx.types, ctx.classes, rtx, li))
            {
                trace!(var = ai.0, "instantiating throws-bounded variable to RuntimeException");
                ctx.add_bound(ai, BoundKind::Equal, rtx);
                bound_set.add_variable(ai);
                return;
            }
        }
    }
    match glb(ctx.types, ctx.classes, upper) {
        Some(ti) => {
            trace!(var = ai.0, ty = ti.0, "instantiating from upper bounds");
            ctx.add_bound(ai, BoundKind::Equal, ti);
            bound_set.add_variable(ai);
        }
        None => {
            let fmt = ctx.formatter();
            let rendered: Vec<String> = upper.iter().map(|&t| fmt.format(t)).collect();
            bound_set.add_false(format!(
                "incompatible upper bounds for {ai}: {}",
                rendered.join(", ")
            ));
        }
    }
}

/// Capture-style resolution: drop the capture bounds over `as_vars` and
/// pin each variable to a fresh type variable built from the lub of its
/// proper lower bounds and the glb of its non-variable upper bounds
/// (qualifier lub/glb folded in).
fn resolve_with_capture(
    ctx: &mut InferenceContext,
    as_vars: &FxIndexSet<InferVar>,
    bound_set: &mut BoundSet,
) -> Result<(), SolverError> {
    if bound_set.contains_false() {
        return Ok(());
    }
    bound_set.remove_captures(as_vars);

    struct FreshInfo {
        var: InferVar,
        lower: Option<TypeId>,
        upper: TypeId,
        quals: jinfer_types::QualSet,
    }

    let mut infos: Vec<FreshInfo> = Vec::new();
    for &ai in as_vars {
        ctx.apply_instantiations_var(ai);
        if ctx.var(ai).bounds.has_instantiation() {
            // Equal to a variable resolved earlier in this pass.
            continue;
        }

        let lower_bounds = ctx.var(ai).bounds.proper_lower_bounds(ctx.types);
        let lower = lub(ctx.types, ctx.classes, &lower_bounds);

        let upper_bounds = ctx.var(ai).bounds.upper_bounds_non_var(ctx.types);
        let upper = if upper_bounds.is_empty() {
            TypeId::OBJECT
        } else {
            match glb(ctx.types, ctx.classes, &upper_bounds) {
                Some(u) => u,
                None => {
                    let fmt = ctx.formatter();
                    let rendered: Vec<String> =
                        upper_bounds.iter().map(|&t| fmt.format(t)).collect();
                    bound_set.add_false(format!(
                        "incompatible upper bounds for {ai}: {}",
                        rendered.join(", ")
                    ));
                    return Ok(());
                }
            }
        };

        let mut quals: Option<jinfer_types::QualSet> = None;
        for q in ctx.var(ai).bounds.qual_bounds_of(BoundKind::Upper) {
            quals = Some(match quals {
                None => q,
                Some(acc) => ctx.quals.glb(acc, q),
            });
        }

        infos.push(FreshInfo {
            var: ai,
            lower,
            upper,
            quals: quals.unwrap_or_default(),
        });
    }

    // A fresh type variable must have proper bounds; any variable use
    // still inside a bound (mutually dependent captures) is flattened to
    // its instantiation when known and Object otherwise.
    let resolved = ctx.instantiations();
    let types = ctx.types;
    let strip = |ty: TypeId| {
        jinfer_types::replace_infer_vars(types, ty, &|v| {
            Some(resolved.get(&v).copied().unwrap_or(TypeId::OBJECT))
        })
    };
    for info in infos {
        let upper = strip(info.upper);
        let lower = info.lower.map(strip);
        let fresh = ctx.types.fresh_var(upper, lower, info.quals);
        debug!(var = info.var.0, fresh = fresh.0, "instantiating to fresh type variable");
        ctx.add_bound(info.var, BoundKind::Equal, fresh);
        bound_set.add_variable(info.var);
    }

    bound_set.incorporate_to_fixed_point(ctx, BoundSet::new())
}

#[cfg(test)]
#[path = "../tests/resolution_tests.rs"]
mod resolution_tests;
