//! Interned type model for the jinfer type-argument inference engine.
//!
//! This crate provides the "types" half of inference: a structural,
//! interned representation of type-like syntax that may mention inference
//! variables, plus every query and transform the bound-set solver needs:
//!
//! - **Interning**: O(1) type equality via `TypeId` comparison
//! - **Declarations**: a `ClassStore` registry of generic classes,
//!   interfaces, and type parameters
//! - **Relations**: proper-type subtyping, containment, `as_super`
//!   projection
//! - **Transforms**: substitution, instantiation application, erasure,
//!   lub/glb, capture conversion
//! - **Qualifiers**: a pluggable lattice layered orthogonally on types

pub mod format;
pub mod intern;
pub mod operations;
pub mod quals;
pub mod queries;
pub mod relations;
pub mod store;
pub mod types;

pub use format::TypeFormatter;
pub use intern::TypeInterner;
pub use operations::{
    Substitution, boxed, capture, collect_infer_vars, erasure, glb, lub, replace_infer_vars,
    substitute, with_qualifiers,
};
pub use quals::{NoQualifiers, QualSet, QualifierHierarchy};
pub use queries::AbstractKind;
pub use relations::{
    as_super, contains, is_assignable, is_subtype, is_subtype_unchecked, parameterized_supers,
};
pub use store::{ClassDecl, ClassStore, DefId, ParamId, TypeParamDecl};
pub use types::{InferVar, PrimitiveKind, TypeData, TypeId, TypeListId};
