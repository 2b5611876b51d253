//! Type interning.
//!
//! All `TypeData` construction is quarantined to this module: the rest of
//! the crate (and the solver) goes through the named constructors below, so
//! normalization invariants hold for every id in circulation:
//!
//! - structurally equal types share one `TypeId`
//! - `intersection` flattens, deduplicates, drops `Object` and unwraps
//!   singletons (semantic pruning of redundant members happens in
//!   [`crate::operations::glb`], which can consult the subtype relation)
//!
//! The interner is append-only and lock-free (dashmap + atomic counters),
//! so it can be shared by reference everywhere.

use crate::quals::QualSet;
use crate::store::{DefId, ParamId};
use crate::types::{InferVar, PrimitiveKind, TypeData, TypeId, TypeListId};
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Structural type interner.
pub struct TypeInterner {
    types: DashMap<TypeData, TypeId, FxBuildHasher>,
    types_by_id: DashMap<TypeId, TypeData, FxBuildHasher>,
    lists: DashMap<Arc<[TypeId]>, TypeListId, FxBuildHasher>,
    lists_by_id: DashMap<TypeListId, Arc<[TypeId]>, FxBuildHasher>,
    next_type: AtomicU32,
    next_list: AtomicU32,
    next_fresh: AtomicU32,
}

impl TypeInterner {
    /// Creates an interner with the intrinsics pre-registered:
    /// [`TypeId::NULL`] and [`TypeId::OBJECT`].
    pub fn new() -> Self {
        let interner = Self {
            types: DashMap::default(),
            types_by_id: DashMap::default(),
            lists: DashMap::default(),
            lists_by_id: DashMap::default(),
            next_type: AtomicU32::new(0),
            next_list: AtomicU32::new(0),
            next_fresh: AtomicU32::new(0),
        };
        let empty = interner.intern_list(&[]);
        debug_assert_eq!(empty, TypeListId::EMPTY);
        let null = interner.intern(TypeData::Null {
            quals: QualSet::empty(),
        });
        debug_assert_eq!(null, TypeId::NULL);
        let object = interner.intern(TypeData::Declared {
            def: DefId::OBJECT,
            args: TypeListId::EMPTY,
            quals: QualSet::empty(),
            raw: false,
        });
        debug_assert_eq!(object, TypeId::OBJECT);
        interner
    }

    fn intern(&self, data: TypeData) -> TypeId {
        match self.types.entry(data) {
            dashmap::mapref::entry::Entry::Occupied(e) => *e.get(),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                let id = TypeId(self.next_type.fetch_add(1, Ordering::Relaxed));
                self.types_by_id.insert(id, data);
                e.insert(id);
                id
            }
        }
    }

    /// The structure behind `id`, or `None` for an id this interner never
    /// produced.
    pub fn lookup(&self, id: TypeId) -> Option<TypeData> {
        self.types_by_id.get(&id).map(|d| *d)
    }

    /// Interns a list of type ids.
    pub fn intern_list(&self, items: &[TypeId]) -> TypeListId {
        if let Some(existing) = self.lists.get(items) {
            return *existing;
        }
        let arc: Arc<[TypeId]> = items.into();
        match self.lists.entry(arc.clone()) {
            dashmap::mapref::entry::Entry::Occupied(e) => *e.get(),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                let id = TypeListId(self.next_list.fetch_add(1, Ordering::Relaxed));
                self.lists_by_id.insert(id, arc);
                e.insert(id);
                id
            }
        }
    }

    /// The elements of an interned list.
    pub fn list(&self, id: TypeListId) -> Arc<[TypeId]> {
        self.lists_by_id
            .get(&id)
            .map(|l| l.value().clone())
            .unwrap_or_else(|| Arc::from([] as [TypeId; 0]))
    }

    // =========================================================================
    // Constructors
    // =========================================================================

    /// The null type carrying `quals`.
    pub fn null_qualified(&self, quals: QualSet) -> TypeId {
        if quals.is_empty() {
            return TypeId::NULL;
        }
        self.intern(TypeData::Null { quals })
    }

    /// A primitive type.
    pub fn primitive(&self, kind: PrimitiveKind) -> TypeId {
        self.intern(TypeData::Primitive(kind))
    }

    /// A class or interface type with the given arguments.
    pub fn declared(&self, def: DefId, args: &[TypeId]) -> TypeId {
        self.declared_qualified(def, args, QualSet::empty())
    }

    /// A qualified class or interface type.
    pub fn declared_qualified(&self, def: DefId, args: &[TypeId], quals: QualSet) -> TypeId {
        self.intern(TypeData::Declared {
            def,
            args: self.intern_list(args),
            quals,
            raw: false,
        })
    }

    /// A raw use of a generic declaration.
    pub fn declared_raw(&self, def: DefId) -> TypeId {
        self.intern(TypeData::Declared {
            def,
            args: TypeListId::EMPTY,
            quals: QualSet::empty(),
            raw: true,
        })
    }

    /// An array of `component`.
    pub fn array(&self, component: TypeId) -> TypeId {
        self.array_qualified(component, QualSet::empty())
    }

    /// A qualified array of `component`.
    pub fn array_qualified(&self, component: TypeId, quals: QualSet) -> TypeId {
        self.intern(TypeData::Array { component, quals })
    }

    /// The unbounded wildcard `?`.
    pub fn wildcard(&self) -> TypeId {
        self.intern(TypeData::Wildcard {
            lower: None,
            upper: None,
        })
    }

    /// The wildcard `? extends upper`.
    pub fn wildcard_extends(&self, upper: TypeId) -> TypeId {
        self.intern(TypeData::Wildcard {
            lower: None,
            upper: Some(upper),
        })
    }

    /// The wildcard `? super lower`.
    pub fn wildcard_super(&self, lower: TypeId) -> TypeId {
        self.intern(TypeData::Wildcard {
            lower: Some(lower),
            upper: None,
        })
    }

    /// A use of a declared type parameter.
    pub fn type_var(&self, param: ParamId) -> TypeId {
        self.intern(TypeData::TypeVar {
            param,
            quals: QualSet::empty(),
        })
    }

    /// A use of an inference variable.
    pub fn use_of(&self, var: InferVar) -> TypeId {
        self.intern(TypeData::UseOfVariable(var))
    }

    /// Mints a fresh capture type variable with the given bounds. Each call
    /// produces a distinct type.
    pub fn fresh_var(&self, upper: TypeId, lower: Option<TypeId>, quals: QualSet) -> TypeId {
        let id = self.next_fresh.fetch_add(1, Ordering::Relaxed);
        self.intern(TypeData::FreshVar {
            id,
            upper,
            lower,
            quals,
        })
    }

    /// An intersection of `members`, normalized: nested intersections are
    /// flattened, duplicates and `Object` dropped, a singleton unwrapped.
    /// The empty intersection is `Object`.
    pub fn intersection(&self, members: Vec<TypeId>) -> TypeId {
        let mut flat = Vec::with_capacity(members.len());
        for m in members {
            match self.lookup(m) {
                Some(TypeData::Intersection(list)) => {
                    for inner in self.list(list).iter() {
                        if *inner != TypeId::OBJECT && !flat.contains(inner) {
                            flat.push(*inner);
                        }
                    }
                }
                _ => {
                    if m != TypeId::OBJECT && !flat.contains(&m) {
                        flat.push(m);
                    }
                }
            }
        }
        match flat.len() {
            0 => TypeId::OBJECT,
            1 => flat[0],
            _ => self.intern(TypeData::Intersection(self.intern_list(&flat))),
        }
    }
}

#[cfg(test)]
#[path = "../tests/intern_tests.rs"]
mod intern_tests;
