//! Type transforms: substitution, instantiation application, erasure,
//! boxing, lub/glb, and capture conversion of proper types.

use crate::intern::TypeInterner;
use crate::quals::QualSet;
use crate::queries;
use crate::relations::is_subtype;
use crate::store::{ClassStore, ParamId};
use crate::types::{InferVar, TypeData, TypeId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::trace;

/// A `ParamId -> TypeId` substitution.
#[derive(Clone, Debug, Default)]
pub struct Substitution {
    map: FxHashMap<ParamId, TypeId>,
}

impl Substitution {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, param: ParamId, ty: TypeId) {
        self.map.insert(param, ty);
    }

    pub fn get(&self, param: ParamId) -> Option<TypeId> {
        self.map.get(&param).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Applies `subst` to every `TypeVar` use inside `ty`.
pub fn substitute(interner: &TypeInterner, ty: TypeId, subst: &Substitution) -> TypeId {
    if subst.is_empty() {
        return ty;
    }
    match interner.lookup(ty) {
        Some(TypeData::TypeVar { param, .. }) => subst.get(param).unwrap_or(ty),
        Some(TypeData::Declared { def, args, quals, raw }) => {
            if raw {
                return ty;
            }
            let old = interner.list(args);
            let new: Vec<TypeId> = old.iter().map(|&a| substitute(interner, a, subst)).collect();
            if new[..] == old[..] {
                ty
            } else {
                interner.declared_qualified(def, &new, quals)
            }
        }
        Some(TypeData::Array { component, quals }) => {
            let new = substitute(interner, component, subst);
            if new == component {
                ty
            } else {
                interner.array_qualified(new, quals)
            }
        }
        Some(TypeData::Wildcard { lower, upper }) => {
            let new_lower = lower.map(|l| substitute(interner, l, subst));
            let new_upper = upper.map(|u| substitute(interner, u, subst));
            if new_lower == lower && new_upper == upper {
                ty
            } else {
                match (new_lower, new_upper) {
                    (Some(l), _) => interner.wildcard_super(l),
                    (None, Some(u)) => interner.wildcard_extends(u),
                    (None, None) => interner.wildcard(),
                }
            }
        }
        Some(TypeData::Intersection(list)) => {
            let old = interner.list(list);
            let new: Vec<TypeId> = old.iter().map(|&m| substitute(interner, m, subst)).collect();
            if new[..] == old[..] {
                ty
            } else {
                interner.intersection(new)
            }
        }
        _ => ty,
    }
}

/// Replaces every inference-variable use inside `ty` for which `lookup`
/// produces a type.
pub fn replace_infer_vars(
    interner: &TypeInterner,
    ty: TypeId,
    lookup: &impl Fn(InferVar) -> Option<TypeId>,
) -> TypeId {
    match interner.lookup(ty) {
        Some(TypeData::UseOfVariable(v)) => lookup(v).unwrap_or(ty),
        Some(TypeData::Declared { def, args, quals, raw }) => {
            if raw {
                return ty;
            }
            let old = interner.list(args);
            let new: Vec<TypeId> = old
                .iter()
                .map(|&a| replace_infer_vars(interner, a, lookup))
                .collect();
            if new[..] == old[..] {
                ty
            } else {
                interner.declared_qualified(def, &new, quals)
            }
        }
        Some(TypeData::Array { component, quals }) => {
            let new = replace_infer_vars(interner, component, lookup);
            if new == component {
                ty
            } else {
                interner.array_qualified(new, quals)
            }
        }
        Some(TypeData::Wildcard { lower, upper }) => {
            let new_lower = lower.map(|l| replace_infer_vars(interner, l, lookup));
            let new_upper = upper.map(|u| replace_infer_vars(interner, u, lookup));
            if new_lower == lower && new_upper == upper {
                ty
            } else {
                match (new_lower, new_upper) {
                    (Some(l), _) => interner.wildcard_super(l),
                    (None, Some(u)) => interner.wildcard_extends(u),
                    (None, None) => interner.wildcard(),
                }
            }
        }
        Some(TypeData::Intersection(list)) => {
            let old = interner.list(list);
            let new: Vec<TypeId> = old
                .iter()
                .map(|&m| replace_infer_vars(interner, m, lookup))
                .collect();
            if new[..] == old[..] {
                ty
            } else {
                interner.intersection(new)
            }
        }
        _ => ty,
    }
}

/// All inference variables mentioned in `ty`, deduplicated, in first-seen
/// order.
pub fn collect_infer_vars(interner: &TypeInterner, ty: TypeId) -> SmallVec<[InferVar; 4]> {
    let mut out = SmallVec::new();
    collect_into(interner, ty, &mut out);
    out
}

fn collect_into(interner: &TypeInterner, ty: TypeId, out: &mut SmallVec<[InferVar; 4]>) {
    match interner.lookup(ty) {
        Some(TypeData::UseOfVariable(v)) => {
            if !out.contains(&v) {
                out.push(v);
            }
        }
        Some(TypeData::Declared { args, .. }) => {
            for &a in interner.list(args).iter() {
                collect_into(interner, a, out);
            }
        }
        Some(TypeData::Array { component, .. }) => collect_into(interner, component, out),
        Some(TypeData::Wildcard { lower, upper }) => {
            if let Some(l) = lower {
                collect_into(interner, l, out);
            }
            if let Some(u) = upper {
                collect_into(interner, u, out);
            }
        }
        Some(TypeData::FreshVar { upper, lower, .. }) => {
            collect_into(interner, upper, out);
            if let Some(l) = lower {
                collect_into(interner, l, out);
            }
        }
        Some(TypeData::Intersection(list)) => {
            for &m in interner.list(list).iter() {
                collect_into(interner, m, out);
            }
        }
        _ => {}
    }
}

/// The erasure of `ty`: raw declared types, erased array components,
/// type variables erased to their bound, wildcards to their upper bound,
/// intersections to their first member.
pub fn erasure(interner: &TypeInterner, store: &ClassStore, ty: TypeId) -> TypeId {
    match interner.lookup(ty) {
        Some(TypeData::Declared { def, args, raw, .. }) => {
            if raw || interner.list(args).is_empty() {
                ty
            } else if store.class(def).type_params.is_empty() {
                ty
            } else {
                interner.declared_raw(def)
            }
        }
        Some(TypeData::Array { component, .. }) => {
            let erased = erasure(interner, store, component);
            if erased == component {
                ty
            } else {
                interner.array(erased)
            }
        }
        Some(TypeData::TypeVar { param, .. }) => {
            erasure(interner, store, store.param(param).bound)
        }
        Some(TypeData::FreshVar { upper, .. }) => erasure(interner, store, upper),
        Some(TypeData::Wildcard { upper, .. }) => {
            erasure(interner, store, upper.unwrap_or(TypeId::OBJECT))
        }
        Some(TypeData::Intersection(list)) => interner
            .list(list)
            .first()
            .map(|&m| erasure(interner, store, m))
            .unwrap_or(TypeId::OBJECT),
        _ => ty,
    }
}

/// Replaces the primary qualifiers on `ty`. Types that carry no primary
/// qualifiers (wildcards, variable uses, intersections, primitives) are
/// returned unchanged.
pub fn with_qualifiers(interner: &TypeInterner, ty: TypeId, quals: QualSet) -> TypeId {
    match interner.lookup(ty) {
        Some(TypeData::Null { .. }) => interner.null_qualified(quals),
        Some(TypeData::Declared { def, args, raw, .. }) => {
            if raw {
                ty
            } else {
                let args = interner.list(args);
                interner.declared_qualified(def, &args, quals)
            }
        }
        Some(TypeData::Array { component, .. }) => interner.array_qualified(component, quals),
        _ => ty,
    }
}

/// The boxed form of `ty`: primitives become their registered wrapper
/// class, everything else is unchanged.
pub fn boxed(interner: &TypeInterner, store: &ClassStore, ty: TypeId) -> TypeId {
    match interner.lookup(ty) {
        Some(TypeData::Primitive(kind)) => match store.boxed_def(kind) {
            Some(def) => interner.declared(def, &[]),
            None => ty,
        },
        _ => ty,
    }
}

/// Least upper bound of a set of proper types.
///
/// Null is absorbed; the unique maximal element wins; otherwise `Object`.
/// (The full minimal-erased-candidate-set construction is the host type
/// factory's concern, not the solver's.)
pub fn lub(interner: &TypeInterner, store: &ClassStore, types: &[TypeId]) -> Option<TypeId> {
    let mut candidates: Vec<TypeId> = Vec::new();
    for &t in types {
        if queries::is_null(interner, t) {
            continue;
        }
        if !candidates.contains(&t) {
            candidates.push(t);
        }
    }
    match candidates.len() {
        0 => {
            if types.is_empty() {
                None
            } else {
                // lub of only-null is null
                Some(TypeId::NULL)
            }
        }
        1 => Some(candidates[0]),
        _ => {
            for &top in &candidates {
                if candidates
                    .iter()
                    .all(|&other| other == top || is_subtype(interner, store, other, top))
                {
                    return Some(top);
                }
            }
            Some(TypeId::OBJECT)
        }
    }
}

/// Greatest lower bound of a set of types.
///
/// The unique minimal element wins; otherwise an intersection with
/// redundant (super-) members pruned. Two unrelated non-interface classes
/// have no common subtype: the glb does not exist and `None` is returned.
/// Mixing primitives with reference types also fails.
pub fn glb(interner: &TypeInterner, store: &ClassStore, types: &[TypeId]) -> Option<TypeId> {
    let mut members: Vec<TypeId> = Vec::new();
    for &t in types {
        if !members.contains(&t) {
            members.push(t);
        }
    }
    match members.len() {
        0 => None,
        1 => Some(members[0]),
        _ => {
            for &bottom in &members {
                if members
                    .iter()
                    .all(|&other| other == bottom || is_subtype(interner, store, bottom, other))
                {
                    return Some(bottom);
                }
            }
            // No single minimum. An intersection is only well formed when
            // at most one member is a class; a second unrelated class is a
            // contradiction.
            let mut class_member: Option<TypeId> = None;
            for &m in &members {
                if queries::is_primitive(interner, m) {
                    return None;
                }
                let is_class = queries::declared_def(interner, m)
                    .map(|def| !store.class(def).is_interface)
                    .unwrap_or(false);
                if is_class {
                    match class_member {
                        None => class_member = Some(m),
                        Some(prev) => {
                            if !is_subtype(interner, store, prev, m)
                                && !is_subtype(interner, store, m, prev)
                            {
                                return None;
                            }
                        }
                    }
                }
            }
            // Prune members that are supertypes of another member.
            let pruned: Vec<TypeId> = members
                .iter()
                .copied()
                .filter(|&m| {
                    !members
                        .iter()
                        .any(|&other| other != m && is_subtype(interner, store, other, m))
                })
                .collect();
            Some(interner.intersection(pruned))
        }
    }
}

/// Capture conversion of a proper type.
///
/// For a wildcard-parameterized `G<A1..An>`, each wildcard argument is
/// replaced by a fresh type variable bounded by the glb of the wildcard's
/// upper bound and the substituted declared bound (lower bound taken from
/// `? super` wildcards). Non-wildcard-parameterized types are returned
/// unchanged.
pub fn capture(interner: &TypeInterner, store: &ClassStore, ty: TypeId) -> TypeId {
    if !queries::is_wildcard_parameterized(interner, ty) {
        return ty;
    }
    let Some(TypeData::Declared { def, args, quals, raw: false }) = interner.lookup(ty) else {
        return ty;
    };
    let decl = store.class(def);
    let args = interner.list(args);
    if decl.type_params.len() != args.len() {
        return ty;
    }

    // First pass: a substitution mapping each parameter to its captured
    // argument, using the wildcard's upper bound for wildcard positions so
    // declared bounds mentioning sibling parameters stay closed.
    let mut subst = Substitution::new();
    for (&param, &arg) in decl.type_params.iter().zip(args.iter()) {
        let stand_in = queries::wildcard_upper_bound(interner, arg).unwrap_or(arg);
        subst.insert(param, stand_in);
    }

    let mut captured_args = Vec::with_capacity(args.len());
    for (&param, &arg) in decl.type_params.iter().zip(args.iter()) {
        if !queries::is_wildcard(interner, arg) {
            captured_args.push(arg);
            continue;
        }
        let declared_bound = substitute(interner, store.param(param).bound, &subst);
        let upper = match queries::wildcard_upper_bound(interner, arg) {
            Some(u) if u != TypeId::OBJECT => {
                glb(interner, store, &[u, declared_bound]).unwrap_or(u)
            }
            _ => declared_bound,
        };
        let lower = queries::wildcard_lower_bound(interner, arg);
        captured_args.push(interner.fresh_var(upper, lower, QualSet::empty()));
    }
    trace!(ty = ty.0, "capture conversion replaced wildcard arguments");
    interner.declared_qualified(def, &captured_args, quals)
}

#[cfg(test)]
#[path = "../tests/operations_tests.rs"]
mod operations_tests;
