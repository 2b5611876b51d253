//! Inference session state.
//!
//! An [`InferenceContext`] owns every [`Variable`] minted during one
//! inference problem. Bound sets are *views* over this arena: they hold
//! variable ids, never variable state, so merging and copying bound sets
//! shares variables by construction and resolving a variable in one branch
//! is visible to every bound set that references it.

use crate::constraint::{Constraint, ConstraintSet};
use crate::variable::{BoundKind, VarKind, Variable};
use indexmap::IndexSet;
use jinfer_types::{
    ClassStore, InferVar, ParamId, QualSet, QualifierHierarchy, TypeFormatter, TypeId,
    TypeInterner, boxed, queries,
};
use rustc_hash::{FxBuildHasher, FxHashMap};
use tracing::trace;

pub(crate) type FxIndexSet<T> = IndexSet<T, FxBuildHasher>;

/// Incorporation round cap.
///
/// Bound reduction can emit new constraints (resolving a capture bound's
/// wildcard component does), so the fixed-point loop has no a-priori
/// bound. The cap converts a cyclic or malformed constraint graph into a
/// detectable engine error instead of an infinite loop. Well-formed
/// inputs converge in a handful of rounds; the cap is far above anything
/// a legitimate call site produces.
pub const MAX_INCORPORATION_ROUNDS: u32 = 256;

/// An engine defect, as distinct from ordinary inference failure.
///
/// Ordinary unsatisfiability is recorded on the
/// [`crate::bound_set::BoundSet`] (`contains_false` + messages) and is a
/// normal outcome. A `SolverError` means the solver itself misbehaved and
/// must never be swallowed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SolverError {
    /// `incorporate_to_fixed_point` failed to converge within the round
    /// cap.
    IncorporationOverflow {
        /// The cap that was exceeded.
        rounds: u32,
    },
}

impl std::fmt::Display for SolverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverError::IncorporationOverflow { rounds } => {
                write!(f, "bound incorporation did not converge within {rounds} rounds")
            }
        }
    }
}

impl std::error::Error for SolverError {}

/// Owns the variables of one inference problem.
pub struct InferenceContext<'a> {
    /// Type interner.
    pub types: &'a TypeInterner,

    /// Declaration registry.
    pub classes: &'a ClassStore,

    /// Qualifier lattice; inert [`jinfer_types::NoQualifiers`] by default.
    pub quals: &'a dyn QualifierHierarchy,

    /// Round cap for `incorporate_to_fixed_point`. Overridable so the
    /// overflow trip-wire is testable separately from real failures.
    pub max_incorporation_rounds: u32,

    vars: Vec<Variable>,
}

impl<'a> InferenceContext<'a> {
    pub fn new(types: &'a TypeInterner, classes: &'a ClassStore) -> Self {
        Self::with_qualifiers(types, classes, &jinfer_types::NoQualifiers)
    }

    pub fn with_qualifiers(
        types: &'a TypeInterner,
        classes: &'a ClassStore,
        quals: &'a dyn QualifierHierarchy,
    ) -> Self {
        Self {
            types,
            classes,
            quals,
            max_incorporation_rounds: MAX_INCORPORATION_ROUNDS,
            vars: Vec::new(),
        }
    }

    /// Mints a fresh inference variable for `param`.
    pub fn fresh_variable(&mut self, param: ParamId, kind: VarKind) -> InferVar {
        let id = InferVar(self.vars.len() as u32);
        self.vars.push(Variable::new(id, param, kind));
        trace!(var = id.0, kind = ?kind, "minted inference variable");
        id
    }

    pub fn var(&self, var: InferVar) -> &Variable {
        &self.vars[var.0 as usize]
    }

    pub(crate) fn var_mut(&mut self, var: InferVar) -> &mut Variable {
        &mut self.vars[var.0 as usize]
    }

    /// Whether `var` was minted by capture conversion.
    pub fn is_capture(&self, var: InferVar) -> bool {
        self.var(var).kind == VarKind::Capture
    }

    /// The instantiation of `var`, once resolution has picked one.
    pub fn instantiation(&self, var: InferVar) -> Option<TypeId> {
        self.var(var).bounds.instantiation()
    }

    pub fn formatter(&self) -> TypeFormatter<'a> {
        TypeFormatter::new(self.types, self.classes)
    }

    /// Adds `ty` as a bound of `kind` on `var`, generating the implied
    /// complementary constraints. Returns whether a new bound was
    /// recorded.
    pub fn add_bound(&mut self, var: InferVar, kind: BoundKind, ty: TypeId) -> bool {
        if queries::as_use_of_variable(self.types, ty) == Some(var) {
            return false;
        }
        let (types, classes) = (self.types, self.classes);
        let v = &mut self.vars[var.0 as usize];
        let (added, forwards) = v.bounds.add_bound(kind, ty, types, classes);
        if added {
            trace!(var = var.0, kind = ?kind, ty = ty.0, "added bound");
        }
        for (other, fkind, quals) in forwards {
            self.add_qualifier_bound(other, fkind, quals);
        }
        added
    }

    /// Adds `quals` as a qualifier bound of `kind` on `var`.
    pub fn add_qualifier_bound(&mut self, var: InferVar, kind: BoundKind, quals: QualSet) {
        if quals.is_empty() {
            return;
        }
        let types = self.types;
        let v = &mut self.vars[var.0 as usize];
        let forwards = v.bounds.add_qualifier_bound(kind, quals, types);
        // Forwarded qualifier bounds are raw insertions on the variables
        // mentioned in this variable's bounds; they do not re-trigger
        // constraint generation (which would not terminate on mutually
        // referential bounds).
        for (other, fkind, fquals) in forwards {
            self.vars[other.0 as usize]
                .bounds
                .insert_qual_bound_raw(fkind, fquals);
        }
    }

    /// Marks `var` as appearing in the invoked method's throws clause.
    pub fn set_throws_bound(&mut self, var: InferVar) {
        self.var_mut(var).bounds.set_has_throws_bound(true);
    }

    /// The current variable → instantiation map across the whole arena.
    pub fn instantiations(&self) -> FxHashMap<InferVar, TypeId> {
        let mut map = FxHashMap::default();
        for v in &self.vars {
            if let Some(inst) = v.bounds.instantiation() {
                map.insert(v.id, inst);
            }
        }
        map
    }

    /// Substitutes every known instantiation into the bounds and pending
    /// constraints of each variable in `vars`. Returns whether anything
    /// changed.
    pub(crate) fn apply_instantiations(&mut self, vars: &FxIndexSet<InferVar>) -> bool {
        let resolved = self.instantiations();
        if resolved.is_empty() {
            return false;
        }
        let (types, classes) = (self.types, self.classes);
        let mut changed = false;
        for &var in vars {
            let v = &mut self.vars[var.0 as usize];
            changed |= v.bounds.apply_instantiations(types, classes, &resolved);
        }
        changed
    }

    /// Same, for a single variable.
    pub(crate) fn apply_instantiations_var(&mut self, var: InferVar) -> bool {
        let resolved = self.instantiations();
        if resolved.is_empty() {
            return false;
        }
        let (types, classes) = (self.types, self.classes);
        self.vars[var.0 as usize]
            .bounds
            .apply_instantiations(types, classes, &resolved)
    }

    /// Drains every pending constraint of every variable in `vars`.
    pub(crate) fn take_all_pending(&mut self, vars: &FxIndexSet<InferVar>) -> ConstraintSet {
        let mut out = ConstraintSet::new();
        for &var in vars {
            out.extend(std::mem::take(&mut self.vars[var.0 as usize].bounds.constraints));
        }
        out
    }

    /// Queues `constraint` on `var` directly. Test-only back door into the
    /// pending queues.
    #[doc(hidden)]
    pub fn push_pending(&mut self, var: InferVar, constraint: Constraint) {
        self.var_mut(var).bounds.constraints.add(constraint);
    }

    pub(crate) fn save_bounds(&mut self, vars: &FxIndexSet<InferVar>) {
        for &var in vars {
            self.vars[var.0 as usize].bounds.save();
        }
    }

    pub(crate) fn restore_bounds(&mut self, vars: &FxIndexSet<InferVar>) {
        let (types, classes) = (self.types, self.classes);
        for &var in vars {
            self.vars[var.0 as usize].bounds.restore(types, classes);
        }
    }

    /// Boxed form of `ty` (primitives to their wrapper classes).
    pub(crate) fn boxed(&self, ty: TypeId) -> TypeId {
        boxed(self.types, self.classes, ty)
    }
}
