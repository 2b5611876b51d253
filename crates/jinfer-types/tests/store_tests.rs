use super::*;
use crate::types::{PrimitiveKind, TypeId};

#[test]
fn object_is_preregistered() {
    let store = ClassStore::new();
    assert!(DefId::OBJECT.is_valid());
    assert!(!DefId::INVALID.is_valid());
    assert_eq!(store.class(DefId::OBJECT).name, "Object");
    assert!(store.class(DefId::OBJECT).superclass.is_none());
}

#[test]
fn register_and_look_up_class() {
    let store = ClassStore::new();
    let number = store.register_class(ClassDecl {
        name: "Number".to_string(),
        is_interface: false,
        type_params: Vec::new(),
        superclass: Some(TypeId::OBJECT),
        interfaces: Vec::new(),
    });
    assert!(number.is_valid());
    assert_ne!(number, DefId::OBJECT);
    let decl = store.class(number);
    assert_eq!(decl.name, "Number");
    assert_eq!(decl.superclass, Some(TypeId::OBJECT));
    assert!(!decl.is_interface);
}

#[test]
fn type_param_bounds_default_and_update() {
    let store = ClassStore::new();
    let e = store.register_type_param("E", TypeId::OBJECT);
    assert_eq!(store.param(e).name, "E");
    assert_eq!(store.param(e).bound, TypeId::OBJECT);

    // A bound mentioning the parameter itself is installed after
    // registration.
    let other = TypeId(42);
    store.set_param_bound(e, other);
    assert_eq!(store.param(e).bound, other);
}

#[test]
fn boxing_registry() {
    let store = ClassStore::new();
    assert_eq!(store.boxed_def(PrimitiveKind::Int), None);

    let integer = store.register_class(ClassDecl {
        name: "Integer".to_string(),
        is_interface: false,
        type_params: Vec::new(),
        superclass: Some(TypeId::OBJECT),
        interfaces: Vec::new(),
    });
    store.register_boxing(PrimitiveKind::Int, integer);
    assert_eq!(store.boxed_def(PrimitiveKind::Int), Some(integer));
    assert!(store.is_boxed_class(integer));
    assert!(!store.is_boxed_class(DefId::OBJECT));
}

#[test]
fn runtime_exception_marker() {
    let store = ClassStore::new();
    assert_eq!(store.runtime_exception(), None);
    let rtx = store.register_class(ClassDecl {
        name: "RuntimeException".to_string(),
        is_interface: false,
        type_params: Vec::new(),
        superclass: Some(TypeId::OBJECT),
        interfaces: Vec::new(),
    });
    store.mark_runtime_exception(rtx);
    assert_eq!(store.runtime_exception(), Some(rtx));
}
