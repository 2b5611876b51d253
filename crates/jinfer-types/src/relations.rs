//! Proper-type relations: subtyping, containment, supertype projection.
//!
//! These walk the class hierarchy recorded in the [`ClassStore`]. They are
//! meaningful on proper types; on types mentioning inference variables the
//! solver reduces constraints instead of calling in here.

use crate::intern::TypeInterner;
use crate::operations::{Substitution, boxed, erasure, substitute};
use crate::queries;
use crate::store::{ClassStore, DefId};
use crate::types::{TypeData, TypeId};

/// Projects `ty` onto the declaration `target`: the parameterization of
/// `target` among the supertypes of `ty`, or `None` when `target` is not a
/// supertype.
pub fn as_super(
    interner: &TypeInterner,
    store: &ClassStore,
    ty: TypeId,
    target: DefId,
) -> Option<TypeId> {
    match interner.lookup(ty)? {
        TypeData::Declared { def, args, raw, .. } => {
            if def == target {
                return Some(ty);
            }
            let decl = store.class(def);
            let mut subst = Substitution::new();
            if !raw {
                for (&p, &a) in decl.type_params.iter().zip(interner.list(args).iter()) {
                    subst.insert(p, a);
                }
            }
            for sup in decl
                .superclass
                .iter()
                .chain(decl.interfaces.iter())
                .copied()
            {
                let sup = if raw {
                    erasure(interner, store, sup)
                } else {
                    substitute(interner, sup, &subst)
                };
                if let Some(found) = as_super(interner, store, sup, target) {
                    return Some(found);
                }
            }
            (target == DefId::OBJECT).then_some(TypeId::OBJECT)
        }
        TypeData::TypeVar { param, .. } => {
            as_super(interner, store, store.param(param).bound, target)
        }
        TypeData::FreshVar { upper, .. } => as_super(interner, store, upper, target),
        TypeData::Wildcard { upper, .. } => {
            as_super(interner, store, upper.unwrap_or(TypeId::OBJECT), target)
        }
        TypeData::Intersection(list) => interner
            .list(list)
            .iter()
            .find_map(|&m| as_super(interner, store, m, target)),
        TypeData::Array { .. } | TypeData::Null { .. } => {
            (target == DefId::OBJECT).then_some(TypeId::OBJECT)
        }
        TypeData::Primitive(_) | TypeData::UseOfVariable(_) => None,
    }
}

/// Whether `s` is a subtype of `t`.
pub fn is_subtype(interner: &TypeInterner, store: &ClassStore, s: TypeId, t: TypeId) -> bool {
    if s == t {
        return true;
    }
    let (Some(sd), Some(td)) = (interner.lookup(s), interner.lookup(t)) else {
        return false;
    };

    // Null is below every reference type.
    if matches!(sd, TypeData::Null { .. }) {
        return !matches!(td, TypeData::Primitive(_) | TypeData::Null { .. });
    }
    // Everything but primitives is below Object.
    if queries::is_object(interner, t) {
        return !matches!(sd, TypeData::Primitive(_));
    }

    match (sd, td) {
        (TypeData::Primitive(a), TypeData::Primitive(b)) => a == b,
        (TypeData::Primitive(_), _) | (_, TypeData::Primitive(_)) => false,

        (TypeData::Intersection(list), _) => interner
            .list(list)
            .iter()
            .any(|&m| is_subtype(interner, store, m, t)),
        (_, TypeData::Intersection(list)) => interner
            .list(list)
            .iter()
            .all(|&m| is_subtype(interner, store, s, m)),

        // A fresh capture variable is below anything its upper bound is
        // below; anything below its lower bound is below it.
        (TypeData::FreshVar { upper, .. }, _) => is_subtype(interner, store, upper, t),
        (_, TypeData::FreshVar { lower: Some(l), .. }) => is_subtype(interner, store, s, l),
        (_, TypeData::FreshVar { .. }) => false,

        (TypeData::TypeVar { param, .. }, _) => {
            is_subtype(interner, store, store.param(param).bound, t)
        }
        (_, TypeData::TypeVar { .. }) => false,

        (TypeData::Wildcard { upper, .. }, _) => {
            is_subtype(interner, store, upper.unwrap_or(TypeId::OBJECT), t)
        }
        (_, TypeData::Wildcard { .. }) => false,

        (
            TypeData::Array { component: sc, .. },
            TypeData::Array { component: tc, .. },
        ) => {
            if queries::is_primitive(interner, sc) || queries::is_primitive(interner, tc) {
                sc == tc
            } else {
                is_subtype(interner, store, sc, tc)
            }
        }
        (TypeData::Array { .. }, _) | (_, TypeData::Array { .. }) => false,

        (TypeData::Declared { .. }, TypeData::Declared { def: t_def, args: t_args, raw: t_raw, .. }) => {
            let Some(s_sup) = as_super(interner, store, s, t_def) else {
                return false;
            };
            if t_raw {
                return true;
            }
            if queries::is_raw(interner, s_sup) {
                // A raw projection reaches a parameterized T only through
                // unchecked conversion, which is not subtyping.
                return false;
            }
            let s_args = queries::type_arguments(interner, s_sup).unwrap_or_default();
            let t_args = interner.list(t_args);
            if s_args.len() != t_args.len() {
                return false;
            }
            s_args
                .iter()
                .zip(t_args.iter())
                .all(|(&sa, &ta)| contains(interner, store, sa, ta))
        }

        _ => false,
    }
}

/// Type-argument containment: whether the argument `s` is contained by the
/// argument `t` (`s <= t`).
pub fn contains(interner: &TypeInterner, store: &ClassStore, s: TypeId, t: TypeId) -> bool {
    if s == t {
        return true;
    }
    match interner.lookup(t) {
        Some(TypeData::Wildcard { lower: None, upper: None }) => true,
        Some(TypeData::Wildcard { lower: None, upper: Some(u) }) => {
            match interner.lookup(s) {
                Some(TypeData::Wildcard { lower: None, upper }) => {
                    is_subtype(interner, store, upper.unwrap_or(TypeId::OBJECT), u)
                }
                Some(TypeData::Wildcard { lower: Some(_), .. }) => u == TypeId::OBJECT,
                _ => is_subtype(interner, store, s, u),
            }
        }
        Some(TypeData::Wildcard { lower: Some(l), .. }) => match interner.lookup(s) {
            Some(TypeData::Wildcard { lower: Some(sl), .. }) => {
                is_subtype(interner, store, l, sl)
            }
            Some(TypeData::Wildcard { .. }) => false,
            _ => is_subtype(interner, store, l, s),
        },
        // Invariant position: exact match only (identity already checked).
        _ => false,
    }
}

/// Finds a generic class or interface `G` such that both `s` and `t` have
/// a parameterized supertype of the form `G<...>`, returning the two
/// parameterizations.
pub fn parameterized_supers(
    interner: &TypeInterner,
    store: &ClassStore,
    s: TypeId,
    t: TypeId,
) -> Option<(TypeId, TypeId)> {
    let mut s_supers = Vec::new();
    collect_declared_supers(interner, store, s, &mut s_supers);
    for &s_sup in &s_supers {
        let Some(def) = queries::declared_def(interner, s_sup) else {
            continue;
        };
        if store.class(def).type_params.is_empty() {
            continue;
        }
        if let Some(t_sup) = as_super(interner, store, t, def) {
            return Some((s_sup, t_sup));
        }
    }
    None
}

fn collect_declared_supers(
    interner: &TypeInterner,
    store: &ClassStore,
    ty: TypeId,
    out: &mut Vec<TypeId>,
) {
    match interner.lookup(ty) {
        Some(TypeData::Declared { def, args, raw, .. }) => {
            if out.contains(&ty) {
                return;
            }
            out.push(ty);
            let decl = store.class(def);
            let mut subst = Substitution::new();
            if !raw {
                for (&p, &a) in decl.type_params.iter().zip(interner.list(args).iter()) {
                    subst.insert(p, a);
                }
            }
            for sup in decl
                .superclass
                .iter()
                .chain(decl.interfaces.iter())
                .copied()
            {
                let sup = if raw {
                    erasure(interner, store, sup)
                } else {
                    substitute(interner, sup, &subst)
                };
                collect_declared_supers(interner, store, sup, out);
            }
        }
        Some(TypeData::TypeVar { param, .. }) => {
            collect_declared_supers(interner, store, store.param(param).bound, out)
        }
        Some(TypeData::FreshVar { upper, .. }) => {
            collect_declared_supers(interner, store, upper, out)
        }
        Some(TypeData::Intersection(list)) => {
            for &m in interner.list(list).iter() {
                collect_declared_supers(interner, store, m, out);
            }
        }
        _ => {}
    }
}

/// Loose-invocation compatibility of proper types: subtyping plus boxing
/// and unboxing.
pub fn is_assignable(interner: &TypeInterner, store: &ClassStore, s: TypeId, t: TypeId) -> bool {
    if is_subtype(interner, store, s, t) {
        return true;
    }
    if queries::is_primitive(interner, s) {
        let b = boxed(interner, store, s);
        if b != s && is_subtype(interner, store, b, t) {
            return true;
        }
    }
    if queries::is_primitive(interner, t) {
        let b = boxed(interner, store, t);
        if b != t && is_subtype(interner, store, s, b) {
            return true;
        }
    }
    false
}

/// Whether `s` is a subtype of `t` allowing unchecked conversion: the raw
/// erasure of `t` is a supertype of `s` even though `t`'s parameterization
/// is not.
pub fn is_subtype_unchecked(
    interner: &TypeInterner,
    store: &ClassStore,
    s: TypeId,
    t: TypeId,
) -> bool {
    if is_subtype(interner, store, s, t) {
        return true;
    }
    match interner.lookup(t) {
        Some(TypeData::Declared { def, raw, .. }) => match as_super(interner, store, s, def) {
            // Unchecked conversion exists only across a raw boundary: a raw
            // projection of S flowing into a parameterized T, or any S
            // flowing into a raw T.
            Some(s_sup) => raw || queries::is_raw(interner, s_sup),
            None => false,
        },
        Some(TypeData::Array { component: tc, .. }) => match interner.lookup(s) {
            Some(TypeData::Array { component: sc, .. }) => {
                is_subtype_unchecked(interner, store, sc, tc)
            }
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
#[path = "../tests/relations_tests.rs"]
mod relations_tests;
