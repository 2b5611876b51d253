use super::*;
use crate::bound_set::BoundSet;
use crate::capture::CaptureBound;
use crate::context::InferenceContext;
use crate::variable::{BoundKind, VarKind};
use jinfer_types::{ClassDecl, ClassStore, DefId, InferVar, TypeId, TypeInterner};

struct World {
    types: TypeInterner,
    store: ClassStore,
    list: DefId,
}

fn world() -> World {
    let types = TypeInterner::new();
    let store = ClassStore::new();
    let e = store.register_type_param("E", TypeId::OBJECT);
    let list = store.register_class(ClassDecl {
        name: "List".to_string(),
        is_interface: true,
        type_params: vec![e],
        superclass: None,
        interfaces: Vec::new(),
    });
    World { types, store, list }
}

fn new_var(ctx: &mut InferenceContext) -> InferVar {
    let param = ctx.classes.register_type_param("T", TypeId::OBJECT);
    ctx.fresh_variable(param, VarKind::Invocation)
}

#[test]
fn every_variable_depends_on_itself() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let a = new_var(&mut ctx);

    let mut set = BoundSet::new();
    set.add_variable(a);
    let deps = set.dependencies(&ctx);
    assert!(deps.get(a).contains(&a));
}

#[test]
fn bounds_mentioning_a_variable_create_a_dependency() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let a = new_var(&mut ctx);
    let b = new_var(&mut ctx);
    let list_b = w.types.declared(w.list, &[w.types.use_of(b)]);

    ctx.add_bound(a, BoundKind::Equal, list_b);
    let mut set = BoundSet::new();
    set.add_variable(a);
    set.add_variable(b);
    let deps = set.dependencies(&ctx);

    assert!(deps.get(a).contains(&b), "a's bounds mention b");
    assert!(!deps.get(b).contains(&a));
}

#[test]
fn dependencies_close_transitively() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let a = new_var(&mut ctx);
    let b = new_var(&mut ctx);
    let c = new_var(&mut ctx);

    ctx.add_bound(a, BoundKind::Upper, w.types.use_of(b));
    ctx.add_bound(b, BoundKind::Upper, w.types.use_of(c));

    let mut set = BoundSet::new();
    set.add_variable(a);
    set.add_variable(b);
    set.add_variable(c);
    let deps = set.dependencies(&ctx);

    assert!(deps.get(a).contains(&b));
    assert!(deps.get(b).contains(&c));
    assert!(deps.get(a).contains(&c), "transitive closure");
}

#[test]
fn capture_left_variables_come_first() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let outer = new_var(&mut ctx);

    // capture(List<? extends aOuter>) forces outer to wait for the
    // capture variable.
    let wildcard = w.types.wildcard_extends(w.types.use_of(outer));
    let captured_source = w.types.declared(w.list, &[wildcard]);
    let capture = CaptureBound::new(&mut ctx, captured_source);
    let cap_var = capture.capture_vars()[0];

    let mut set = BoundSet::new();
    set.add_variable(outer);
    set.add_capture(capture);
    let deps = set.dependencies(&ctx);

    assert!(
        deps.get(outer).contains(&cap_var),
        "variables mentioned in a capture bound depend on its capture variables"
    );
}
