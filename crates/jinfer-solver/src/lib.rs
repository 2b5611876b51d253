//! Bound-set constraint solver for generics-style type-argument
//! inference.
//!
//! Given a set of inference variables and typing constraints between
//! types that may mention them, the solver determines a consistent
//! instantiation for every variable, or determines that none exists. The
//! pipeline:
//!
//! - **Constraints** reduce into per-variable **bounds**
//!   (`=` / `<:` / `:>`)
//! - A **`BoundSet`** incorporates bounds to a fixed point, deriving the
//!   consequences of complementary bound pairs and detecting
//!   contradiction
//! - **Wildcard capture** introduces capture variables with bounds tied
//!   to the captured arguments
//! - A **dependency graph** orders **resolution**, which pins each
//!   variable to a concrete instantiation
//!
//! Failure is three-tiered: ordinary unsatisfiability is flag state on
//! the bound set; a failed qualifier overlay is a softer flag that keeps
//! the underlying instantiations usable; a non-converging incorporation
//! loop is an engine defect reported as [`SolverError`].

pub mod bound_set;
pub mod capture;
pub mod constraint;
pub mod context;
pub mod dependencies;
pub mod invocation;
pub mod resolution;
pub mod variable;

pub use bound_set::BoundSet;
pub use capture::{CaptureBound, CaptureTuple};
pub use constraint::{Constraint, ConstraintSet, QualKind, ReductionResult, TypingKind};
pub use context::{InferenceContext, MAX_INCORPORATION_ROUNDS, SolverError};
pub use dependencies::Dependencies;
pub use invocation::{InferenceResult, MethodSig, Theta, infer_invocation};
pub use variable::{BoundKind, VarKind, Variable, VariableBounds};
