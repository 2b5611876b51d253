use super::*;
use crate::constraint::{Constraint, ConstraintSet, TypingKind};
use crate::context::{InferenceContext, SolverError};
use crate::variable::{BoundKind, VarKind};
use jinfer_types::{ClassDecl, ClassStore, DefId, InferVar, TypeId, TypeInterner};

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

fn new_var(ctx: &mut InferenceContext) -> InferVar {
    let param = ctx.classes.register_type_param("T", TypeId::OBJECT);
    ctx.fresh_variable(param, VarKind::Invocation)
}

fn total_bounds(ctx: &InferenceContext, vars: &[InferVar]) -> usize {
    vars.iter().map(|&v| ctx.var(v).bounds.bound_count()).sum()
}

#[test]
fn merge_is_idempotent() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let a = new_var(&mut ctx);
    let b = new_var(&mut ctx);

    let mut other = BoundSet::new();
    other.add_variable(a);
    other.add_variable(b);
    other.set_unchecked_conversion();
    other.add_false("intentional failure".to_string());

    let mut set = BoundSet::new();
    assert!(set.merge(&other));
    let vars_after_first: Vec<InferVar> = set.variables().iter().copied().collect();
    let msg_after_first = set.error_message();

    // A second merge of the same set changes nothing observable.
    assert!(!set.merge(&other));
    assert_eq!(
        set.variables().iter().copied().collect::<Vec<_>>(),
        vars_after_first
    );
    assert_eq!(set.error_message(), msg_after_first);
    assert!(set.contains_false());
    assert!(set.is_unchecked_conversion());
}

#[test]
fn incorporation_reaches_fixed_point_on_empty_input() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let a = new_var(&mut ctx);

    let mut set = BoundSet::new();
    set.add_variable(a);
    set.incorporate_to_fixed_point(&mut ctx, BoundSet::new())
        .expect("trivial incorporation converges");
    assert!(!set.contains_false());
}

#[test]
fn bounds_grow_monotonically_under_incorporation() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let a = new_var(&mut ctx);
    let b = new_var(&mut ctx);
    let string = w.types.declared(w.string, &[]);
    let list_a = w.types.declared(w.list, &[w.types.use_of(a)]);

    let mut set = BoundSet::new();
    let reduced = ConstraintSet::single(Constraint::typing(
        w.types.use_of(a),
        string,
        TypingKind::Subtype,
    ))
    .reduce(&mut ctx);
    set.incorporate_to_fixed_point(&mut ctx, reduced).expect("converges");
    let count_first = total_bounds(&ctx, &[a, b]);

    let reduced = ConstraintSet::single(Constraint::typing(
        w.types.use_of(b),
        list_a,
        TypingKind::Equality,
    ))
    .reduce(&mut ctx);
    set.incorporate_to_fixed_point(&mut ctx, reduced).expect("converges");
    let count_second = total_bounds(&ctx, &[a, b]);
    assert!(count_second >= count_first, "bounds never shrink");

    // Another empty round still shrinks nothing.
    set.incorporate_to_fixed_point(&mut ctx, BoundSet::new()).expect("converges");
    assert_eq!(total_bounds(&ctx, &[a, b]), count_second);
}

#[test]
fn false_is_absorbing() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let a = new_var(&mut ctx);
    let string = w.types.declared(w.string, &[]);

    let mut set = BoundSet::new();
    set.add_variable(a);
    set.add_false("already failed".to_string());

    // Incorporating new information neither clears the flag nor touches
    // any variable's bounds.
    let before = ctx.var(a).bounds.bound_count();
    let mut incoming = BoundSet::new();
    incoming.add_variable(a);
    ctx.push_pending(
        a,
        Constraint::typing(w.types.use_of(a), string, TypingKind::Subtype),
    );
    set.incorporate_to_fixed_point(&mut ctx, incoming).expect("short-circuits");
    assert!(set.contains_false());
    assert_eq!(ctx.var(a).bounds.bound_count(), before);
}

#[test]
fn subtype_and_equality_chain_resolves() {
    // T1 <: String and T2 = List<T1> must give T1 := String and
    // T2 := List<String>.
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let t1 = new_var(&mut ctx);
    let t2 = new_var(&mut ctx);
    let string = w.types.declared(w.string, &[]);
    let list_t1 = w.types.declared(w.list, &[w.types.use_of(t1)]);

    let mut constraints = ConstraintSet::new();
    constraints.add(Constraint::typing(
        w.types.use_of(t1),
        string,
        TypingKind::Subtype,
    ));
    constraints.add(Constraint::typing(
        w.types.use_of(t2),
        list_t1,
        TypingKind::Equality,
    ));
    let reduced = constraints.reduce(&mut ctx);

    let mut set = BoundSet::new();
    set.incorporate_to_fixed_point(&mut ctx, reduced).expect("converges");
    assert!(!set.contains_false());

    let resolved = set.resolve(&mut ctx).expect("resolution converges");
    assert_eq!(resolved.len(), 2);
    assert_eq!(ctx.instantiation(t1), Some(string));
    assert_eq!(
        ctx.instantiation(t2),
        Some(w.types.declared(w.list, &[string]))
    );
}

#[test]
fn incompatible_upper_bounds_are_unsatisfiable() {
    // T <: Integer and T <: String have no common subtype.
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let t = new_var(&mut ctx);
    let string = w.types.declared(w.string, &[]);
    let integer = w.types.declared(w.integer, &[]);

    let mut constraints = ConstraintSet::new();
    constraints.add(Constraint::typing(
        w.types.use_of(t),
        integer,
        TypingKind::Subtype,
    ));
    constraints.add(Constraint::typing(
        w.types.use_of(t),
        string,
        TypingKind::Subtype,
    ));
    let reduced = constraints.reduce(&mut ctx);

    let mut set = BoundSet::new();
    set.incorporate_to_fixed_point(&mut ctx, reduced).expect("converges");
    set.resolve(&mut ctx).expect("no engine defect");
    assert!(set.contains_false());
    assert!(!set.error_message().is_empty());
}

#[test]
fn incorporation_overflow_is_an_engine_error() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let a = new_var(&mut ctx);
    let string = w.types.declared(w.string, &[]);

    // One round of real work cannot converge under a one-round cap: the
    // quiet confirmation round never runs.
    ctx.max_incorporation_rounds = 1;
    let mut set = BoundSet::new();
    set.add_variable(a);
    ctx.push_pending(
        a,
        Constraint::typing(w.types.use_of(a), string, TypingKind::Subtype),
    );
    let err = set
        .incorporate_to_fixed_point(&mut ctx, BoundSet::new())
        .expect_err("cap of one round must trip");
    assert_eq!(err, SolverError::IncorporationOverflow { rounds: 1 });

    // The same workload converges comfortably under the default cap.
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let a = new_var(&mut ctx);
    let mut set = BoundSet::new();
    set.add_variable(a);
    ctx.push_pending(
        a,
        Constraint::typing(w.types.use_of(a), string, TypingKind::Subtype),
    );
    set.incorporate_to_fixed_point(&mut ctx, BoundSet::new())
        .expect("default cap is generous");
}

#[test]
fn save_and_restore_scope_variable_state() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let a = new_var(&mut ctx);
    let number = w.types.declared(w.number, &[]);
    let string = w.types.declared(w.string, &[]);

    let mut set = BoundSet::new();
    set.add_variable(a);
    ctx.add_bound(a, BoundKind::Upper, number);
    set.save_bounds(&mut ctx);

    ctx.add_bound(a, BoundKind::Equal, string);
    assert!(ctx.var(a).bounds.has_instantiation());

    set.restore(&mut ctx);
    assert!(!ctx.var(a).bounds.has_instantiation());
    let uppers: Vec<TypeId> = ctx.var(a).bounds.bounds_of(BoundKind::Upper).collect();
    assert_eq!(uppers, vec![number]);
}

#[test]
fn initial_bounds_seed_declared_upper_bounds() {
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let number = w.types.declared(w.number, &[]);
    let t = ctx.classes.register_type_param("T", number);
    let u = ctx.classes.register_type_param("U", TypeId::OBJECT);

    let theta = crate::invocation::Theta::for_params(&mut ctx, &[t, u]);
    let set = BoundSet::initial_bounds(&mut ctx, &theta);
    assert!(!set.contains_false());
    assert_eq!(set.variables().len(), 2);

    let tv = theta.var(t).expect("mapped");
    let uv = theta.var(u).expect("mapped");
    let t_uppers: Vec<TypeId> = ctx.var(tv).bounds.bounds_of(BoundKind::Upper).collect();
    assert_eq!(t_uppers, vec![number]);
    let u_uppers: Vec<TypeId> = ctx.var(uv).bounds.bounds_of(BoundKind::Upper).collect();
    assert_eq!(u_uppers, vec![TypeId::OBJECT]);
}

#[test]
fn initial_bounds_substitute_sibling_parameters() {
    // <T, U extends List<T>> seeds U's upper bound as List<aT>.
    let w = world();
    let mut ctx = InferenceContext::new(&w.types, &w.store);
    let t = ctx.classes.register_type_param("T", TypeId::OBJECT);
    let list_t = w.types.declared(w.list, &[w.types.type_var(t)]);
    let u = ctx.classes.register_type_param("U", list_t);

    let theta = crate::invocation::Theta::for_params(&mut ctx, &[t, u]);
    let _ = BoundSet::initial_bounds(&mut ctx, &theta);

    let tv = theta.var(t).expect("mapped");
    let uv = theta.var(u).expect("mapped");
    let expected = w.types.declared(w.list, &[w.types.use_of(tv)]);
    let u_uppers: Vec<TypeId> = ctx.var(uv).bounds.bounds_of(BoundKind::Upper).collect();
    // The dependency bound plus the Object fallback.
    assert!(u_uppers.contains(&expected));
    assert!(u_uppers.contains(&TypeId::OBJECT));
}
