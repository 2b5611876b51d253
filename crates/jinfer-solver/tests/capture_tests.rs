use super::*;
use crate::context::InferenceContext;
use jinfer_types::{ClassDecl, ClassStore, DefId, TypeId, TypeInterner, queries};

struct World {
    types: TypeInterner,
    store: ClassStore,
    string: DefId,
    number: DefId,
    integer: DefId,
    list: DefId,
}

fn world() -> World {
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
    World {
        types,
        store,
        string,
        number,
        integer,
        list,
    }
}

#[test]
fn construction_mints_one_capture_variable_per_parameter() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let string = w.types.declared(w.string, &[]);
    let list_string = w.types.declared(w.list, &[string]);

    let capture = CaptureBound::new(&mut ctx, list_string);
    assert_eq!(capture.captured(), list_string);
    assert_eq!(capture.tuples().len(), 1);
    let var = capture.capture_vars()[0];
    assert!(ctx.is_capture(var));
    assert_eq!(
        capture.left(),
        w.types.declared(w.list, &[w.types.use_of(var)])
    );
}

#[test]
fn non_wildcard_arguments_pin_their_capture_variables() {
    // capture(G<A>) with A concrete: the capture variable carries exactly
    // the equality bound a = A.
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let string = w.types.declared(w.string, &[]);
    let list_string = w.types.declared(w.list, &[string]);

    let capture = CaptureBound::new(&mut ctx, list_string);
    let var = capture.capture_vars()[0];
    let bounds = capture.incorporate(&mut ctx, None).expect("no engine defect");
    assert!(!bounds.contains_false());

    let equal: Vec<TypeId> = ctx.var(var).bounds.bounds_of(BoundKind::Equal).collect();
    assert_eq!(equal, vec![string]);
    assert_eq!(ctx.instantiation(var), Some(string));
}

#[test]
fn extends_wildcard_contributes_its_upper_bound() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let number = w.types.declared(w.number, &[]);
    let list_ext_number = w
        .types
        .declared(w.list, &[w.types.wildcard_extends(number)]);

    let capture = CaptureBound::new(&mut ctx, list_ext_number);
    let var = capture.capture_vars()[0];
    let bounds = capture.incorporate(&mut ctx, None).expect("no engine defect");
    assert!(!bounds.contains_false());

    let uppers: Vec<TypeId> = ctx.var(var).bounds.bounds_of(BoundKind::Upper).collect();
    assert!(uppers.contains(&number), "wildcard upper bound recorded");
    // The capture bound registered itself for dependency ordering.
    assert_eq!(bounds.captures().len(), 1);
}

#[test]
fn super_wildcard_contributes_its_lower_bound() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let integer = w.types.declared(w.integer, &[]);
    let list_sup_integer = w
        .types
        .declared(w.list, &[w.types.wildcard_super(integer)]);

    let capture = CaptureBound::new(&mut ctx, list_sup_integer);
    let var = capture.capture_vars()[0];
    let bounds = capture.incorporate(&mut ctx, None).expect("no engine defect");
    assert!(!bounds.contains_false());

    let lowers: Vec<TypeId> = ctx.var(var).bounds.bounds_of(BoundKind::Lower).collect();
    assert!(lowers.contains(&integer));
}

#[test]
fn capture_against_invariant_target_is_contradictory() {
    // capture(List<? extends Number>) assigned to List<Integer>: the
    // context pins the capture variable by equality, which a wildcard
    // capture cannot satisfy. The wildcard's upper bound is still
    // recorded for diagnostics.
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let number = w.types.declared(w.number, &[]);
    let integer = w.types.declared(w.integer, &[]);
    let list_ext_number = w
        .types
        .declared(w.list, &[w.types.wildcard_extends(number)]);
    let list_integer = w.types.declared(w.list, &[integer]);

    let capture = CaptureBound::new(&mut ctx, list_ext_number);
    let var = capture.capture_vars()[0];
    let bounds = capture
        .incorporate(&mut ctx, Some(list_integer))
        .expect("no engine defect");

    assert!(bounds.contains_false());
    let equal: Vec<TypeId> = ctx.var(var).bounds.bounds_of(BoundKind::Equal).collect();
    assert!(equal.contains(&integer), "context equality still recorded");
    let uppers: Vec<TypeId> = ctx.var(var).bounds.bounds_of(BoundKind::Upper).collect();
    assert!(uppers.contains(&number), "wildcard upper bound still recorded");
}

#[test]
fn capture_against_compatible_wildcard_target_succeeds() {
    // capture(List<? extends Integer>) assigned to List<? extends Number>
    // leaves the capture variable bounded above by Integer and Number.
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let number = w.types.declared(w.number, &[]);
    let integer = w.types.declared(w.integer, &[]);
    let list_ext_integer = w
        .types
        .declared(w.list, &[w.types.wildcard_extends(integer)]);
    let list_ext_number = w
        .types
        .declared(w.list, &[w.types.wildcard_extends(number)]);

    let capture = CaptureBound::new(&mut ctx, list_ext_integer);
    let var = capture.capture_vars()[0];
    let bounds = capture
        .incorporate(&mut ctx, Some(list_ext_number))
        .expect("no engine defect");

    assert!(!bounds.contains_false(), "{}", bounds.error_message());
    let uppers: Vec<TypeId> = ctx.var(var).bounds.bounds_of(BoundKind::Upper).collect();
    assert!(uppers.contains(&integer));
    assert!(uppers.contains(&number));
    assert!(queries::is_wildcard_parameterized(&w.types, capture.captured()));
}
