use super::*;
use crate::StringInterner;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn root_declarations_are_global() {
    let interner = StringInterner::new();
    let mut arena = ScopeArena::new();
    let root = arena.alloc_root();
    let a = interner.intern("a");
    let b = interner.intern("b");

    assert_eq!(arena.declare(root, SlotKind::Variable, a), Address::Global(0));
    assert_eq!(arena.declare(root, SlotKind::Variable, b), Address::Global(1));
    // Kinds are numbered independently.
    assert_eq!(arena.declare(root, SlotKind::Function, a), Address::Global(0));
    assert_eq!(arena.global_count(SlotKind::Variable), 2);
}

#[test]
fn nested_declarations_are_local_to_their_frame() {
    let interner = StringInterner::new();
    let mut arena = ScopeArena::new();
    let root = arena.alloc_root();
    let body = arena.alloc(Some(root), ScopeFlags::CALLABLE);
    let x = interner.intern("x");
    let y = interner.intern("y");

    assert_eq!(
        arena.declare(body, SlotKind::Variable, x),
        Address::Local { frame: body, offset: 0 }
    );
    assert_eq!(
        arena.declare(body, SlotKind::Variable, y),
        Address::Local { frame: body, offset: 1 }
    );
    assert_eq!(arena.get(body).local_count(SlotKind::Variable), 2);
    assert!(arena.get(body).has_locals());
    assert!(!arena.get(root).has_locals());
}

#[test]
fn redeclaring_returns_the_same_address() {
    let interner = StringInterner::new();
    let mut arena = ScopeArena::new();
    let root = arena.alloc_root();
    let x = interner.intern("x");
    let first = arena.declare(root, SlotKind::Variable, x);
    let second = arena.declare(root, SlotKind::Variable, x);
    assert_eq!(first, second);
    assert_eq!(arena.global_count(SlotKind::Variable), 1);
}

#[test]
fn builtin_functions_get_shadowed_by_fresh_slots() {
    let interner = StringInterner::new();
    let mut arena = ScopeArena::new();
    let name = interner.intern("if");
    let builtin = arena.declare(ScopeId::BUILTINS, SlotKind::Function, name);
    arena.seal_builtins();

    let redefined = arena.declare(ScopeId::BUILTINS, SlotKind::Function, name);
    assert_ne!(builtin, redefined);
    // Once shadowed, the user slot is reused.
    assert_eq!(
        arena.declare(ScopeId::BUILTINS, SlotKind::Function, name),
        redefined
    );
    assert_eq!(arena.private_boundary(SlotKind::Function), 1);
}

#[test]
fn import_scopes_redirect_declarations() {
    let interner = StringInterner::new();
    let mut arena = ScopeArena::new();
    let root = arena.alloc_root();
    let rule = arena.alloc(Some(root), ScopeFlags::empty());
    let import = arena.alloc(Some(rule), ScopeFlags::IMPORT);
    let x = interner.intern("x");

    let address = arena.declare(import, SlotKind::Variable, x);
    assert_eq!(address, Address::Local { frame: rule, offset: 0 });
    assert_eq!(arena.find_local(rule, SlotKind::Variable, x), Some(address));
    assert_eq!(arena.get(import).get(SlotKind::Variable, x), None);

    let top_import = arena.alloc(Some(root), ScopeFlags::IMPORT);
    assert!(arena
        .declare(top_import, SlotKind::Mixin, x)
        .is_global());
}

#[test]
fn find_respects_permeability() {
    let interner = StringInterner::new();
    let mut arena = ScopeArena::new();
    let root = arena.alloc_root();
    let x = interner.intern("x");
    let global = arena.declare(root, SlotKind::Variable, x);

    let control = arena.alloc(Some(root), ScopeFlags::PERMEABLE);
    assert_eq!(arena.find(control, SlotKind::Variable, x, false), Some(global));

    let callable = arena.alloc(Some(root), ScopeFlags::CALLABLE);
    let inner_if = arena.alloc(Some(callable), ScopeFlags::PERMEABLE);
    assert_eq!(arena.find(inner_if, SlotKind::Variable, x, false), None);
    assert_eq!(arena.find(inner_if, SlotKind::Variable, x, true), Some(global));
}

#[test]
fn find_never_leaves_a_root() {
    let interner = StringInterner::new();
    let mut arena = ScopeArena::new();
    let outer = arena.alloc_root();
    let x = interner.intern("x");
    arena.declare(outer, SlotKind::Variable, x);
    let module_root = arena.alloc(Some(outer), ScopeFlags::ROOT);
    assert_eq!(arena.find(module_root, SlotKind::Variable, x, true), None);
}

#[test]
fn find_falls_back_to_builtins() {
    let interner = StringInterner::new();
    let mut arena = ScopeArena::new();
    let name = interner.intern("inspect");
    let builtin = arena.declare(ScopeId::BUILTINS, SlotKind::Function, name);
    let root = arena.alloc_root();
    assert_eq!(arena.find(root, SlotKind::Function, name, true), Some(builtin));
    assert_eq!(arena.find(root, SlotKind::Function, name, false), None);
}

#[test]
fn assignment_targets() {
    let interner = StringInterner::new();
    let mut arena = ScopeArena::new();
    let root = arena.alloc_root();
    let x = interner.intern("x");
    let y = interner.intern("y");

    let mut alloc = ScopeAllocator::new(&mut arena, root);
    let global_x = alloc.assignment_target(x, false);
    assert!(global_x.is_global());

    let rule = alloc.enter(ScopeFlags::empty());
    // A style rule shadows instead of writing through.
    let shadow = alloc.assignment_target(x, false);
    assert_eq!(shadow, Address::Local { frame: rule, offset: 0 });

    alloc.enter(ScopeFlags::PERMEABLE);
    assert_eq!(alloc.assignment_target(x, false), shadow);
    assert_eq!(alloc.assignment_target(x, true), global_x);
    let new_global = alloc.assignment_target(y, true);
    assert_eq!(new_global, Address::Global(1));
    alloc.exit();
    alloc.exit();
    alloc.exit();
    assert_eq!(alloc.current(), root);
}

#[test]
fn namespaces_reject_a_different_module() {
    let interner = StringInterner::new();
    let mut arena = ScopeArena::new();
    let root = arena.alloc_root();
    let dep = arena.alloc_root();
    let other = arena.alloc_root();
    let ns = interner.intern("colors");
    let module = ModuleId::from_raw(0);
    let other_module = ModuleId::from_raw(1);

    let scope = arena.get_mut(root);
    assert_eq!(scope.register_namespace(ns, dep, module), Ok(()));
    assert_eq!(
        scope.register_namespace(ns, other, other_module),
        Err((dep, module))
    );
    assert_eq!(scope.namespace(ns), Some((dep, module)));
}

#[test]
fn namespaces_reject_the_same_module_twice() {
    let interner = StringInterner::new();
    let mut arena = ScopeArena::new();
    let root = arena.alloc_root();
    let dep = arena.alloc_root();
    let ns = interner.intern("colors");
    let module = ModuleId::from_raw(0);

    let scope = arena.get_mut(root);
    assert_eq!(scope.register_namespace(ns, dep, module), Ok(()));
    assert_eq!(scope.register_namespace(ns, dep, module), Err((dep, module)));
}

#[test]
fn try_alloc_hands_out_sequential_ids() {
    let mut arena = ScopeArena::new();
    let root = arena
        .try_alloc_root()
        .unwrap_or_else(|e| panic!("allocation failed: {e}"));
    let body = arena
        .try_alloc(Some(root), ScopeFlags::CALLABLE)
        .unwrap_or_else(|e| panic!("allocation failed: {e}"));

    assert_eq!(root.index() + 1, body.index());
    assert_eq!(arena.get(body).parent(), Some(root));
    assert_eq!(
        ScopeOverflow { count: 7 }.to_string(),
        "scope arena exceeded capacity: 7 descriptors"
    );
}

proptest! {
    #[test]
    fn distinct_names_get_distinct_addresses(
        raw in proptest::collection::vec("[a-z]{1,6}", 1..24),
        nested in any::<bool>(),
    ) {
        let interner = StringInterner::new();
        let mut arena = ScopeArena::new();
        let root = arena.alloc_root();
        let scope = if nested {
            arena.alloc(Some(root), ScopeFlags::CALLABLE)
        } else {
            root
        };

        let mut seen: FxHashMap<Name, Address> = FxHashMap::default();
        for spelling in &raw {
            let name = interner.intern(spelling);
            let address = arena.declare(scope, SlotKind::Variable, name);
            match seen.get(&name) {
                Some(&previous) => prop_assert_eq!(previous, address),
                None => {
                    prop_assert!(!seen.values().any(|&a| a == address));
                    seen.insert(name, address);
                }
            }
        }
    }
}
