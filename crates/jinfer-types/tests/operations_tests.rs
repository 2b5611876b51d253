use super::*;
use crate::intern::TypeInterner;
use crate::queries;
use crate::store::{ClassDecl, ClassStore, DefId, ParamId};
use crate::types::{InferVar, TypeData, TypeId};

struct Fixture {
    types: TypeInterner,
    store: ClassStore,
    string: DefId,
    number: DefId,
    integer: DefId,
    list: DefId,
    list_param: ParamId,
}

fn fixture() -> Fixture {
    let types = TypeInterner::new();
    let store = ClassStore::new();
    let string = store.register_class(ClassDecl {
        name: "String".to_string(),
        is_interface: false,
        type_params: Vec::new(),
        superclass: Some(TypeId::OBJECT),
        interfaces: Vec::new(),
    });
    let number = store.register_class(ClassDecl {
        name: "Number".to_string(),
        is_interface: false,
        type_params: Vec::new(),
        superclass: Some(TypeId::OBJECT),
        interfaces: Vec::new(),
    });
    let number_ty = types.declared(number, &[]);
    let integer = store.register_class(ClassDecl {
        name: "Integer".to_string(),
        is_interface: false,
        type_params: Vec::new(),
        superclass: Some(number_ty),
        interfaces: Vec::new(),
    });
    let e = store.register_type_param("E", TypeId::OBJECT);
    let list = store.register_class(ClassDecl {
        name: "List".to_string(),
        is_interface: true,
        type_params: vec![e],
        superclass: None,
        interfaces: Vec::new(),
    });
    Fixture {
        types,
        store,
        string,
        number,
        integer,
        list,
        list_param: e,
    }
}

#[test]
fn substitution_replaces_type_vars() {
    let f = fixture();
    let string = f.types.declared(f.string, &[]);
    let tv = f.types.type_var(f.list_param);
    let list_of_e = f.types.declared(f.list, &[tv]);

    let mut subst = Substitution::new();
    assert!(subst.is_empty());
    subst.insert(f.list_param, string);

    assert_eq!(substitute(&f.types, tv, &subst), string);
    assert_eq!(
        substitute(&f.types, list_of_e, &subst),
        f.types.declared(f.list, &[string])
    );
    // No substitution entry leaves the type alone.
    let other = f.store.register_type_param("X", TypeId::OBJECT);
    assert_eq!(subst.get(other), None);
    assert_eq!(
        substitute(&f.types, f.types.type_var(other), &subst),
        f.types.type_var(other)
    );
}

#[test]
fn substitution_reaches_wildcard_bounds() {
    let f = fixture();
    let string = f.types.declared(f.string, &[]);
    let tv = f.types.type_var(f.list_param);
    let list_ext_e = f.types.declared(f.list, &[f.types.wildcard_extends(tv)]);

    let mut subst = Substitution::new();
    subst.insert(f.list_param, string);
    assert_eq!(
        substitute(&f.types, list_ext_e, &subst),
        f.types.declared(f.list, &[f.types.wildcard_extends(string)])
    );
}

#[test]
fn replace_infer_vars_applies_instantiations() {
    let f = fixture();
    let string = f.types.declared(f.string, &[]);
    let a0 = f.types.use_of(InferVar(0));
    let a1 = f.types.use_of(InferVar(1));
    let list_a0 = f.types.declared(f.list, &[a0]);

    let lookup = |v: InferVar| (v == InferVar(0)).then_some(string);
    assert_eq!(
        replace_infer_vars(&f.types, list_a0, &lookup),
        f.types.declared(f.list, &[string])
    );
    // Unresolved variables stay.
    assert_eq!(replace_infer_vars(&f.types, a1, &lookup), a1);
}

#[test]
fn collect_infer_vars_dedups_in_order() {
    let f = fixture();
    let a0 = f.types.use_of(InferVar(0));
    let a1 = f.types.use_of(InferVar(1));
    let nested = f
        .types
        .declared(f.list, &[f.types.declared(f.list, &[a1])]);
    let arr = f.types.array(a0);
    let inter = f.types.intersection(vec![arr, nested, a0]);

    let vars = collect_infer_vars(&f.types, inter);
    assert_eq!(&vars[..], &[InferVar(0), InferVar(1)]);
    assert!(collect_infer_vars(&f.types, TypeId::OBJECT).is_empty());
}

#[test]
fn erasure_drops_parameterizations() {
    let f = fixture();
    let string = f.types.declared(f.string, &[]);
    let list_string = f.types.declared(f.list, &[string]);

    let erased = erasure(&f.types, &f.store, list_string);
    assert!(queries::is_raw(&f.types, erased));
    assert_eq!(erasure(&f.types, &f.store, string), string);
    assert_eq!(
        erasure(&f.types, &f.store, f.types.array(list_string)),
        f.types.array(erased)
    );
}

#[test]
fn lub_prefers_the_unique_maximum() {
    let f = fixture();
    let number = f.types.declared(f.number, &[]);
    let integer = f.types.declared(f.integer, &[]);
    let string = f.types.declared(f.string, &[]);

    assert_eq!(lub(&f.types, &f.store, &[]), None);
    assert_eq!(lub(&f.types, &f.store, &[integer]), Some(integer));
    assert_eq!(lub(&f.types, &f.store, &[integer, number]), Some(number));
    assert_eq!(lub(&f.types, &f.store, &[number, integer]), Some(number));
    // Unrelated types fall back to Object.
    assert_eq!(lub(&f.types, &f.store, &[string, number]), Some(TypeId::OBJECT));
    // Null is absorbed.
    assert_eq!(lub(&f.types, &f.store, &[TypeId::NULL, integer]), Some(integer));
    assert_eq!(lub(&f.types, &f.store, &[TypeId::NULL]), Some(TypeId::NULL));
}

#[test]
fn glb_detects_impossible_class_combinations() {
    let f = fixture();
    let number = f.types.declared(f.number, &[]);
    let integer = f.types.declared(f.integer, &[]);
    let string = f.types.declared(f.string, &[]);
    let list_string = f.types.declared(f.list, &[string]);

    assert_eq!(glb(&f.types, &f.store, &[integer, number]), Some(integer));
    assert_eq!(glb(&f.types, &f.store, &[number, TypeId::OBJECT]), Some(number));
    // Two unrelated classes have no common subtype.
    assert_eq!(glb(&f.types, &f.store, &[string, number]), None);
    // A class and an interface intersect.
    let combined = glb(&f.types, &f.store, &[number, list_string]).expect("intersectable");
    assert_eq!(
        combined,
        f.types.intersection(vec![number, list_string])
    );
}

#[test]
fn capture_replaces_wildcards_with_fresh_vars() {
    let f = fixture();
    let number = f.types.declared(f.number, &[]);
    let list_ext_number = f
        .types
        .declared(f.list, &[f.types.wildcard_extends(number)]);

    let captured = capture(&f.types, &f.store, list_ext_number);
    assert_ne!(captured, list_ext_number);
    let args = queries::type_arguments(&f.types, captured).expect("declared");
    assert_eq!(args.len(), 1);
    match f.types.lookup(args[0]) {
        Some(TypeData::FreshVar { upper, lower, .. }) => {
            assert_eq!(upper, number);
            assert_eq!(lower, None);
        }
        other => panic!("expected a fresh capture variable, got {other:?}"),
    }

    // Non-wildcard arguments are untouched.
    let list_number = f.types.declared(f.list, &[number]);
    assert_eq!(capture(&f.types, &f.store, list_number), list_number);
}

#[test]
fn with_qualifiers_swaps_primary_quals() {
    let f = fixture();
    let string = f.types.declared(f.string, &[]);
    let q = crate::quals::QualSet::single(2);

    let qualified = with_qualifiers(&f.types, string, q);
    assert_ne!(qualified, string);
    assert_eq!(queries::quals_of(&f.types, qualified), q);
    // Stripping back down round-trips.
    assert_eq!(
        with_qualifiers(&f.types, qualified, crate::quals::QualSet::empty()),
        string
    );
}
