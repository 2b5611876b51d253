//! Structural classification queries over interned types.
//!
//! Free functions over the interner, mirroring the structural predicates
//! the solver's reduction rules dispatch on. None of these recurse into
//! the class hierarchy; hierarchy-aware queries live in
//! [`crate::relations`].

use crate::intern::TypeInterner;
use crate::operations::collect_infer_vars;
use crate::quals::QualSet;
use crate::store::{ClassStore, DefId};
use crate::types::{InferVar, TypeData, TypeId};
use std::sync::Arc;

/// The three classifications inference cares about.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AbstractKind {
    /// Mentions no inference variable.
    Proper,
    /// A bare use of an inference variable.
    UseOfVariable,
    /// Mentions an inference variable somewhere inside.
    InferenceType,
}

/// Classifies `ty`.
pub fn abstract_kind(interner: &TypeInterner, ty: TypeId) -> AbstractKind {
    match interner.lookup(ty) {
        Some(TypeData::UseOfVariable(_)) => AbstractKind::UseOfVariable,
        _ => {
            if collect_infer_vars(interner, ty).is_empty() {
                AbstractKind::Proper
            } else {
                AbstractKind::InferenceType
            }
        }
    }
}

/// Whether `ty` mentions no inference variable.
pub fn is_proper(interner: &TypeInterner, ty: TypeId) -> bool {
    abstract_kind(interner, ty) == AbstractKind::Proper
}

/// The inference variable `ty` is a use of, if it is one.
pub fn as_use_of_variable(interner: &TypeInterner, ty: TypeId) -> Option<InferVar> {
    match interner.lookup(ty) {
        Some(TypeData::UseOfVariable(v)) => Some(v),
        _ => None,
    }
}

/// Whether `ty` mentions an inference variable but is not a bare use.
pub fn is_inference_type(interner: &TypeInterner, ty: TypeId) -> bool {
    abstract_kind(interner, ty) == AbstractKind::InferenceType
}

/// Whether `ty` is the null type.
pub fn is_null(interner: &TypeInterner, ty: TypeId) -> bool {
    matches!(interner.lookup(ty), Some(TypeData::Null { .. }))
}

/// Whether `ty` is a primitive type.
pub fn is_primitive(interner: &TypeInterner, ty: TypeId) -> bool {
    matches!(interner.lookup(ty), Some(TypeData::Primitive(_)))
}

/// Whether `ty` is `Object` (any qualification).
pub fn is_object(interner: &TypeInterner, ty: TypeId) -> bool {
    matches!(
        interner.lookup(ty),
        Some(TypeData::Declared { def: DefId::OBJECT, raw: false, .. })
    )
}

/// Whether `ty` is a wildcard.
pub fn is_wildcard(interner: &TypeInterner, ty: TypeId) -> bool {
    matches!(interner.lookup(ty), Some(TypeData::Wildcard { .. }))
}

/// Whether `ty` is the unbounded wildcard `?`.
pub fn is_unbound_wildcard(interner: &TypeInterner, ty: TypeId) -> bool {
    matches!(
        interner.lookup(ty),
        Some(TypeData::Wildcard { lower: None, upper: None })
    )
}

/// Whether `ty` is `? extends U`.
pub fn is_upper_bounded_wildcard(interner: &TypeInterner, ty: TypeId) -> bool {
    matches!(
        interner.lookup(ty),
        Some(TypeData::Wildcard { lower: None, upper: Some(_) })
    )
}

/// Whether `ty` is `? super L`.
pub fn is_lower_bounded_wildcard(interner: &TypeInterner, ty: TypeId) -> bool {
    matches!(
        interner.lookup(ty),
        Some(TypeData::Wildcard { lower: Some(_), .. })
    )
}

/// The upper bound of a wildcard; `Object` for `?` and `? super L`.
/// `None` when `ty` is not a wildcard.
pub fn wildcard_upper_bound(interner: &TypeInterner, ty: TypeId) -> Option<TypeId> {
    match interner.lookup(ty) {
        Some(TypeData::Wildcard { upper, .. }) => Some(upper.unwrap_or(TypeId::OBJECT)),
        _ => None,
    }
}

/// The lower bound of a wildcard, if it has one.
pub fn wildcard_lower_bound(interner: &TypeInterner, ty: TypeId) -> Option<TypeId> {
    match interner.lookup(ty) {
        Some(TypeData::Wildcard { lower, .. }) => lower,
        _ => None,
    }
}

/// Whether `ty` is a declared type with at least one wildcard argument.
pub fn is_wildcard_parameterized(interner: &TypeInterner, ty: TypeId) -> bool {
    match interner.lookup(ty) {
        Some(TypeData::Declared { args, .. }) => interner
            .list(args)
            .iter()
            .any(|&a| is_wildcard(interner, a)),
        _ => false,
    }
}

/// Whether `ty` is a parameterized (or raw) class or interface type.
pub fn is_parameterized(interner: &TypeInterner, ty: TypeId) -> bool {
    match interner.lookup(ty) {
        Some(TypeData::Declared { args, raw, .. }) => raw || !interner.list(args).is_empty(),
        _ => false,
    }
}

/// Whether `ty` is a raw type.
pub fn is_raw(interner: &TypeInterner, ty: TypeId) -> bool {
    matches!(interner.lookup(ty), Some(TypeData::Declared { raw: true, .. }))
}

/// The declaration behind a declared type.
pub fn declared_def(interner: &TypeInterner, ty: TypeId) -> Option<DefId> {
    match interner.lookup(ty) {
        Some(TypeData::Declared { def, .. }) => Some(def),
        _ => None,
    }
}

/// Type arguments of a declared type. Raw types report an empty list;
/// non-declared types report `None`.
pub fn type_arguments(interner: &TypeInterner, ty: TypeId) -> Option<Arc<[TypeId]>> {
    match interner.lookup(ty) {
        Some(TypeData::Declared { args, .. }) => Some(interner.list(args)),
        _ => None,
    }
}

/// The array component type, if `ty` is an array.
pub fn component_type(interner: &TypeInterner, ty: TypeId) -> Option<TypeId> {
    match interner.lookup(ty) {
        Some(TypeData::Array { component, .. }) => Some(component),
        _ => None,
    }
}

/// Whether `ty` is an array with a primitive component.
pub fn is_primitive_array(interner: &TypeInterner, ty: TypeId) -> bool {
    match interner.lookup(ty) {
        Some(TypeData::Array { component, .. }) => is_primitive(interner, component),
        _ => false,
    }
}

/// Members of an intersection type; `None` otherwise.
pub fn intersection_bounds(interner: &TypeInterner, ty: TypeId) -> Option<Arc<[TypeId]>> {
    match interner.lookup(ty) {
        Some(TypeData::Intersection(list)) => Some(interner.list(list)),
        _ => None,
    }
}

/// Whether `ty` is a capture-conversion fresh variable with a lower bound.
pub fn is_lower_bounded_fresh_var(interner: &TypeInterner, ty: TypeId) -> bool {
    matches!(
        interner.lookup(ty),
        Some(TypeData::FreshVar { lower: Some(_), .. })
    )
}

/// The upper bound of a type-variable-like type (`TypeVar` via its
/// declaration, `FreshVar` directly).
pub fn type_var_upper_bound(
    interner: &TypeInterner,
    store: &ClassStore,
    ty: TypeId,
) -> Option<TypeId> {
    match interner.lookup(ty) {
        Some(TypeData::TypeVar { param, .. }) => Some(store.param(param).bound),
        Some(TypeData::FreshVar { upper, .. }) => Some(upper),
        _ => None,
    }
}

/// The lower bound of a capture fresh variable.
pub fn type_var_lower_bound(interner: &TypeInterner, ty: TypeId) -> Option<TypeId> {
    match interner.lookup(ty) {
        Some(TypeData::FreshVar { lower, .. }) => lower,
        _ => None,
    }
}

/// Primary qualifiers carried on `ty`. Wildcards, variable uses and
/// intersections carry none of their own.
pub fn quals_of(interner: &TypeInterner, ty: TypeId) -> QualSet {
    match interner.lookup(ty) {
        Some(TypeData::Null { quals })
        | Some(TypeData::Declared { quals, .. })
        | Some(TypeData::Array { quals, .. })
        | Some(TypeData::TypeVar { quals, .. })
        | Some(TypeData::FreshVar { quals, .. }) => quals,
        _ => QualSet::empty(),
    }
}

/// The most specific array supertype of `ty`, or `None`.
///
/// Arrays are their own most specific array type; type-variable-like types
/// delegate to their upper bound; intersections to their first array
/// member.
pub fn most_specific_array_type(
    interner: &TypeInterner,
    store: &ClassStore,
    ty: TypeId,
) -> Option<TypeId> {
    match interner.lookup(ty)? {
        TypeData::Array { .. } => Some(ty),
        TypeData::TypeVar { param, .. } => {
            most_specific_array_type(interner, store, store.param(param).bound)
        }
        TypeData::FreshVar { upper, .. } => most_specific_array_type(interner, store, upper),
        TypeData::Wildcard { upper, .. } => {
            most_specific_array_type(interner, store, upper.unwrap_or(TypeId::OBJECT))
        }
        TypeData::Intersection(list) => interner
            .list(list)
            .iter()
            .find_map(|&m| most_specific_array_type(interner, store, m)),
        _ => None,
    }
}

#[cfg(test)]
#[path = "../tests/queries_tests.rs"]
mod queries_tests;
