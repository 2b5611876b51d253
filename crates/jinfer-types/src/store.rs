//! Declaration identifiers and storage.
//!
//! The solver never looks at syntax; everything it needs to know about a
//! class or interface declaration lives here:
//!
//! - **`DefId`**: a stable identifier for a class/interface declaration
//! - **`ParamId`**: a stable identifier for a type-parameter declaration
//!   (of a class or of a generic method)
//! - **`ClassStore`**: the registry both identifiers point into
//!
//! `DefId` allocation is sequential; a store is built once per test or per
//! host-driver session and shared immutably afterwards.

use crate::types::{PrimitiveKind, TypeId};
use dashmap::DashMap;
use rustc_hash::FxBuildHasher;
use std::sync::atomic::{AtomicU32, Ordering};

/// Identifier for a class or interface declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DefId(pub u32);

impl DefId {
    /// Sentinel value for an invalid `DefId`.
    pub const INVALID: Self = Self(0);

    /// `java.lang.Object`; pre-registered by [`ClassStore::new`].
    pub const OBJECT: Self = Self(1);

    /// Check if this `DefId` is valid.
    pub const fn is_valid(self) -> bool {
        self.0 >= Self::OBJECT.0
    }
}

/// Identifier for a type-parameter declaration.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ParamId(pub u32);

/// A type-parameter declaration: its name and its declared upper bound.
///
/// The bound may mention other type parameters of the same declaration as
/// [`crate::types::TypeData::TypeVar`] uses; `TypeId::OBJECT` when the
/// declaration carries no explicit bound.
#[derive(Clone, Debug)]
pub struct TypeParamDecl {
    /// Name as written in the declaration, for diagnostics only.
    pub name: String,

    /// Declared upper bound, possibly an intersection.
    pub bound: TypeId,
}

/// A class or interface declaration.
#[derive(Clone, Debug)]
pub struct ClassDecl {
    /// Simple name, for diagnostics only.
    pub name: String,

    /// Whether this declares an interface. Affects greatest-lower-bound
    /// feasibility: two unrelated classes have no common subtype, two
    /// interfaces do.
    pub is_interface: bool,

    /// Type parameters, in declaration order.
    pub type_params: Vec<ParamId>,

    /// Direct superclass, mentioning `type_params` as `TypeVar` uses.
    /// `None` for `Object` and for interfaces.
    pub superclass: Option<TypeId>,

    /// Directly implemented (or extended, for interfaces) interfaces.
    pub interfaces: Vec<TypeId>,
}

/// Registry of class and type-parameter declarations.
///
/// Backed by concurrent maps so a store can be shared by reference across
/// the interner, the relations queries, and the solver without locking
/// discipline at the call sites.
pub struct ClassStore {
    classes: DashMap<DefId, ClassDecl, FxBuildHasher>,
    params: DashMap<ParamId, TypeParamDecl, FxBuildHasher>,
    boxing: DashMap<PrimitiveKind, DefId, FxBuildHasher>,
    next_class: AtomicU32,
    next_param: AtomicU32,
    runtime_exception: AtomicU32,
}

impl ClassStore {
    /// Creates a store with `java.lang.Object` pre-registered as
    /// [`DefId::OBJECT`].
    pub fn new() -> Self {
        let store = Self {
            classes: DashMap::default(),
            params: DashMap::default(),
            boxing: DashMap::default(),
            next_class: AtomicU32::new(DefId::OBJECT.0),
            next_param: AtomicU32::new(1),
            runtime_exception: AtomicU32::new(DefId::INVALID.0),
        };
        store.register_class(ClassDecl {
            name: "Object".to_string(),
            is_interface: false,
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
        });
        store
    }

    /// Registers a class or interface declaration and returns its id.
    pub fn register_class(&self, decl: ClassDecl) -> DefId {
        let id = DefId(self.next_class.fetch_add(1, Ordering::Relaxed));
        self.classes.insert(id, decl);
        id
    }

    /// Registers a type parameter with an explicit bound.
    pub fn register_type_param(&self, name: &str, bound: TypeId) -> ParamId {
        let id = ParamId(self.next_param.fetch_add(1, Ordering::Relaxed));
        self.params.insert(
            id,
            TypeParamDecl {
                name: name.to_string(),
                bound,
            },
        );
        id
    }

    /// Replaces the bound of `param`. Needed when a bound mentions the
    /// parameter itself (or a later parameter of the same declaration),
    /// whose `ParamId` does not exist until after registration.
    pub fn set_param_bound(&self, param: ParamId, bound: TypeId) {
        if let Some(mut decl) = self.params.get_mut(&param) {
            decl.bound = bound;
        }
    }

    /// Looks up a class declaration.
    ///
    /// Panics in debug builds on an unregistered id; release builds treat
    /// it as an empty `Object`-like declaration.
    pub fn class(&self, def: DefId) -> ClassDecl {
        debug_assert!(self.classes.contains_key(&def), "unregistered DefId {def:?}");
        self.classes.get(&def).map(|d| d.value().clone()).unwrap_or(ClassDecl {
            name: String::new(),
            is_interface: false,
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
        })
    }

    /// Looks up a type-parameter declaration.
    pub fn param(&self, param: ParamId) -> TypeParamDecl {
        debug_assert!(self.params.contains_key(&param), "unregistered ParamId {param:?}");
        self.params.get(&param).map(|p| p.value().clone()).unwrap_or(TypeParamDecl {
            name: String::new(),
            bound: TypeId::OBJECT,
        })
    }

    /// Declares `def` to be the boxed class of `kind` (e.g. `Integer` for
    /// `int`). Unregistered primitives simply do not box.
    pub fn register_boxing(&self, kind: PrimitiveKind, def: DefId) {
        self.boxing.insert(kind, def);
    }

    /// The boxed class of `kind`, if one was registered.
    pub fn boxed_def(&self, kind: PrimitiveKind) -> Option<DefId> {
        self.boxing.get(&kind).map(|d| *d)
    }

    /// Whether `def` was registered as the boxed class of some primitive.
    pub fn is_boxed_class(&self, def: DefId) -> bool {
        self.boxing.iter().any(|entry| *entry.value() == def)
    }

    /// Marks `def` as `java.lang.RuntimeException`, enabling the
    /// throws-bound resolution rule.
    pub fn mark_runtime_exception(&self, def: DefId) {
        self.runtime_exception.store(def.0, Ordering::Relaxed);
    }

    /// The declaration marked as `RuntimeException`, if any.
    pub fn runtime_exception(&self) -> Option<DefId> {
        let raw = self.runtime_exception.load(Ordering::Relaxed);
        let def = DefId(raw);
        def.is_valid().then_some(def)
    }
}

#[cfg(test)]
#[path = "../tests/store_tests.rs"]
mod store_tests;
