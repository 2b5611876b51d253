//! The bound set: the aggregate constraint-closure engine.
//!
//! A `BoundSet` tracks which variables an inference problem is solving,
//! the capture bounds relating them, and the failure state. The variables'
//! bound *contents* live in the [`InferenceContext`] arena; a bound set is
//! a view, so merged and copied bound sets observe each other's progress.
//!
//! Invariants:
//!
//! - `merge` is idempotent
//! - once `contains_false` is set it is permanent, and incorporation
//!   stops deriving new bounds (false is absorbing)
//! - variable bounds only grow during incorporation; only
//!   `save_bounds`/`restore` roll them back

use crate::capture::CaptureBound;
use crate::context::{FxIndexSet, InferenceContext, SolverError};
use crate::dependencies::Dependencies;
use crate::invocation::Theta;
use crate::resolution;
use crate::variable::BoundKind;
use indexmap::IndexMap;
use jinfer_types::{InferVar, TypeId, queries, substitute};
use rustc_hash::FxBuildHasher;
use tracing::{debug, trace};

/// A growing set of bounds over a fixed collection of inference
/// variables.
#[derive(Clone, Default)]
pub struct BoundSet {
    vars: FxIndexSet<InferVar>,
    captures: Vec<CaptureBound>,
    contains_false: bool,
    qualifier_failed: bool,
    unchecked_conversion: bool,
    messages: indexmap::IndexSet<String, FxBuildHasher>,
}

impl BoundSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a bound set from the initial bounds implied by each
    /// variable's type-parameter declaration: every type delimited by `&`
    /// in the declared bound becomes an upper bound (with the theta
    /// substitution applied), and a variable left without any proper
    /// upper bound gets `Object`. No contradiction check happens here.
    pub fn initial_bounds(ctx: &mut InferenceContext, theta: &Theta) -> Self {
        let mut set = Self::new();
        let subst = theta.substitution(ctx.types);
        for (param, var) in theta.iter() {
            set.vars.insert(var);
            let declared = ctx.classes.param(param).bound;
            let bound = substitute(ctx.types, declared, &subst);
            match queries::intersection_bounds(ctx.types, bound) {
                Some(members) => {
                    for &m in members.iter() {
                        ctx.add_bound(var, BoundKind::Upper, m);
                    }
                }
                None => {
                    ctx.add_bound(var, BoundKind::Upper, bound);
                }
            }
            if ctx.var(var).bounds.proper_upper_bounds(ctx.types).is_empty() {
                ctx.add_bound(var, BoundKind::Upper, TypeId::OBJECT);
            }
        }
        set
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn variables(&self) -> &FxIndexSet<InferVar> {
        &self.vars
    }

    pub fn add_variable(&mut self, var: InferVar) {
        self.vars.insert(var);
    }

    pub fn contains_false(&self) -> bool {
        self.contains_false
    }

    /// Whether only the qualifier overlay failed.
    pub fn qualifier_failed(&self) -> bool {
        self.qualifier_failed
    }

    pub fn is_unchecked_conversion(&self) -> bool {
        self.unchecked_conversion
    }

    pub fn set_unchecked_conversion(&mut self) {
        self.unchecked_conversion = true;
    }

    /// Records unsatisfiability with a diagnostic. Never panics, never
    /// throws: ordinary inference failure is a normal outcome.
    pub fn add_false(&mut self, message: String) {
        self.contains_false = true;
        self.messages.insert(message);
    }

    pub fn mark_qualifier_failed(&mut self, message: String) {
        self.qualifier_failed = true;
        self.messages.insert(message);
    }

    /// Accumulated diagnostics, one per line.
    pub fn error_message(&self) -> String {
        self.messages.iter().cloned().collect::<Vec<_>>().join("\n")
    }

    /// Registers a capture bound; its left-hand capture variables join
    /// the tracked variable set.
    pub fn add_capture(&mut self, capture: CaptureBound) {
        for var in capture.capture_vars() {
            self.vars.insert(var);
        }
        if !self.captures.contains(&capture) {
            self.captures.push(capture);
        }
    }

    pub fn captures(&self) -> &[CaptureBound] {
        &self.captures
    }

    /// Whether any tracked capture bound has a left-hand variable in
    /// `vars`.
    pub fn contains_capture(&self, vars: &FxIndexSet<InferVar>) -> bool {
        self.captures
            .iter()
            .any(|c| c.capture_vars().iter().any(|v| vars.contains(v)))
    }

    /// Drops capture bounds whose left-hand variables intersect `vars`.
    pub(crate) fn remove_captures(&mut self, vars: &FxIndexSet<InferVar>) {
        self.captures
            .retain(|c| !c.capture_vars().iter().any(|v| vars.contains(v)));
    }

    // =========================================================================
    // Merge / incorporation
    // =========================================================================

    /// Unions `other` into this set. Idempotent; returns whether anything
    /// changed.
    pub fn merge(&mut self, other: &BoundSet) -> bool {
        let mut changed = false;
        for &v in &other.vars {
            changed |= self.vars.insert(v);
        }
        for c in &other.captures {
            if !self.captures.contains(c) {
                self.captures.push(c.clone());
                changed = true;
            }
        }
        if other.contains_false && !self.contains_false {
            self.contains_false = true;
            changed = true;
        }
        if other.qualifier_failed && !self.qualifier_failed {
            self.qualifier_failed = true;
            changed = true;
        }
        if other.unchecked_conversion && !self.unchecked_conversion {
            self.unchecked_conversion = true;
            changed = true;
        }
        for msg in &other.messages {
            changed |= self.messages.insert(msg.clone());
        }
        changed
    }

    /// Merges `new_bounds` in and saturates until no new information can
    /// be derived: substitute every known instantiation into every
    /// tracked variable's bounds, drain the pending complementary
    /// constraints, repeat.
    ///
    /// An unsatisfiable set stays unsatisfiable; the call short-circuits
    /// without touching any variable's bounds. Exceeding the round cap is
    /// an engine defect, not a type error.
    pub fn incorporate_to_fixed_point(
        &mut self,
        ctx: &mut InferenceContext,
        new_bounds: BoundSet,
    ) -> Result<(), SolverError> {
        if self.contains_false || new_bounds.contains_false {
            // Merging keeps the diagnostics; no bound derivation happens
            // once the set is unsatisfiable.
            self.merge(&new_bounds);
            self.contains_false = true;
            return Ok(());
        }
        self.merge(&new_bounds);

        let max_rounds = ctx.max_incorporation_rounds;
        for round in 0..max_rounds {
            let mut changed = ctx.apply_instantiations(&self.vars);

            let pending = ctx.take_all_pending(&self.vars);
            if !pending.is_empty() {
                trace!(round, pending = pending.len(), "reducing pending constraints");
                changed = true;
                let reduced = pending.reduce(ctx);
                let went_false = reduced.contains_false();
                self.merge(&reduced);
                if went_false {
                    debug!(round, "bound set became unsatisfiable");
                    return Ok(());
                }
            }

            if !changed {
                trace!(round, "incorporation reached fixed point");
                return Ok(());
            }
        }
        Err(SolverError::IncorporationOverflow { rounds: max_rounds })
    }

    // =========================================================================
    // Checkpointing
    // =========================================================================

    /// Snapshots every tracked variable's bound state.
    pub fn save_bounds(&self, ctx: &mut InferenceContext) {
        ctx.save_bounds(&self.vars);
    }

    /// Rolls every tracked variable back to the snapshot taken by
    /// [`save_bounds`](Self::save_bounds).
    pub fn restore(&self, ctx: &mut InferenceContext) {
        ctx.restore_bounds(&self.vars);
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// The dependency graph over the tracked variables, rebuilt from the
    /// current bounds.
    pub fn dependencies(&self, ctx: &InferenceContext) -> Dependencies {
        Dependencies::build(ctx, self)
    }

    /// Resolves every tracked variable, in dependency order, and returns
    /// the ones now holding an instantiation.
    pub fn resolve(&mut self, ctx: &mut InferenceContext) -> Result<Vec<InferVar>, SolverError> {
        let all: FxIndexSet<InferVar> = self.vars.clone();
        resolution::resolve_all(ctx, all, self)?;
        Ok(self.instantiated_variables(ctx))
    }

    /// Tracked variables that have an instantiation.
    pub fn instantiated_variables(&self, ctx: &InferenceContext) -> Vec<InferVar> {
        self.vars
            .iter()
            .copied()
            .filter(|&v| ctx.var(v).bounds.has_instantiation())
            .collect()
    }

    /// Tracked variable → instantiation map.
    pub fn instantiations(&self, ctx: &InferenceContext) -> IndexMap<InferVar, TypeId, FxBuildHasher> {
        self.vars
            .iter()
            .copied()
            .filter_map(|v| ctx.instantiation(v).map(|t| (v, t)))
            .collect()
    }
}

#[cfg(test)]
#[path = "../tests/bound_set_tests.rs"]
mod bound_set_tests;
