use super::*;
use crate::errors::EvalErrorKind;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use sass_ir::{ScopeFlags, StringInterner};

struct Fixture {
    interner: StringInterner,
    arena: ScopeArena,
    root: ScopeId,
    body: ScopeId,
}

impl Fixture {
    /// A root with one callable body declaring `$a` and `$b`.
    fn new() -> Self {
        let interner = StringInterner::new();
        let mut arena = ScopeArena::new();
        let root = arena.alloc_root();
        let body = arena.alloc(Some(root), ScopeFlags::CALLABLE);
        for name in ["a", "b"] {
            arena.declare(body, SlotKind::Variable, interner.intern(name));
        }
        Fixture {
            interner,
            arena,
            root,
            body,
        }
    }

    fn local(&self, name: &str) -> Address {
        self.arena
            .find_local(self.body, SlotKind::Variable, self.interner.intern(name))
            .unwrap_or_else(|| panic!("${name} not declared"))
    }
}

fn host(name: &str) -> Callable {
    Callable::Host {
        name: Arc::from(name),
        run: Arc::new(|_: &mut Evaluator, _: &[Value]| -> EvalResult { Ok(Value::Null) }),
    }
}

#[test]
fn guarded_write_fills_empty_and_null_only() {
    let mut env = RuntimeEnvironment::new(16);
    let address = Address::Global(0);

    assert_eq!(env.set_variable(address, Value::Number(1.0), true), Ok(true));
    assert_eq!(env.set_variable(address, Value::Number(2.0), true), Ok(false));
    assert_eq!(env.variable(address), Some(&Value::Number(1.0)));

    env.set_variable(address, Value::Null, false).ok();
    assert_eq!(env.set_variable(address, Value::Number(3.0), true), Ok(true));
    assert_eq!(env.variable(address), Some(&Value::Number(3.0)));
}

#[test]
fn local_slots_need_an_open_activation() {
    let mut fx = Fixture::new();
    let mut env = RuntimeEnvironment::new(16);
    let a = fx.local("a");

    assert_eq!(env.variable(a), None);
    assert_eq!(
        env.set_variable(a, Value::Number(1.0), false),
        Err(SlotError::Inactive {
            kind: SlotKind::Variable,
            address: a
        })
    );

    let record = env
        .push_activation(&mut fx.arena, fx.body, FrameContent::Inherit)
        .unwrap_or_else(|e| panic!("{e}"));
    assert!(fx.arena.get(fx.body).is_active());
    assert_eq!(env.lengths().variables, 2);
    assert_eq!(env.set_variable(a, Value::Number(1.0), false), Ok(true));
    assert_eq!(env.variable(a), Some(&Value::Number(1.0)));

    env.pop_activation(&mut fx.arena, record);
    assert!(!fx.arena.get(fx.body).is_active());
    assert_eq!(env.lengths().variables, 0);
    assert_eq!(env.variable(a), None);
}

#[test]
fn recursive_activations_get_their_own_storage() {
    let mut fx = Fixture::new();
    let mut env = RuntimeEnvironment::new(16);
    let a = fx.local("a");

    let outer = env
        .push_activation(&mut fx.arena, fx.body, FrameContent::Inherit)
        .unwrap_or_else(|e| panic!("{e}"));
    env.set_variable(a, Value::Number(1.0), false).ok();

    let inner = env
        .push_activation(&mut fx.arena, fx.body, FrameContent::Inherit)
        .unwrap_or_else(|e| panic!("{e}"));
    assert_eq!(env.variable(a), None);
    env.set_variable(a, Value::Number(2.0), false).ok();
    assert_eq!(env.variable(a), Some(&Value::Number(2.0)));
    env.pop_activation(&mut fx.arena, inner);

    assert_eq!(env.variable(a), Some(&Value::Number(1.0)));
    assert!(fx.arena.get(fx.body).is_active());
    env.pop_activation(&mut fx.arena, outer);
    assert!(!fx.arena.get(fx.body).is_active());
}

#[test]
fn builtin_region_is_read_only() {
    let interner = StringInterner::new();
    let mut arena = ScopeArena::new();
    let builtin = arena.declare(ScopeId::BUILTINS, SlotKind::Function, interner.intern("if"));
    arena.seal_builtins();

    let mut env = RuntimeEnvironment::new(16);
    let Address::Global(offset) = builtin else {
        panic!("built-ins live in the global space");
    };
    env.define_builtin(offset, host("if"));
    env.seal(&arena);
    assert!(env.is_bound(SlotKind::Function, builtin));

    assert_eq!(
        env.set_callable(SlotKind::Function, builtin, host("mine")),
        Err(SlotError::Private {
            kind: SlotKind::Function,
            address: builtin
        })
    );

    let user = arena.declare(ScopeId::BUILTINS, SlotKind::Function, interner.intern("extra"));
    assert_eq!(env.set_callable(SlotKind::Function, user, host("extra")), Ok(()));
    assert!(env.is_bound(SlotKind::Function, user));
}

#[test]
fn depth_limit_fails_without_side_effects() {
    let mut fx = Fixture::new();
    let mut env = RuntimeEnvironment::new(2);

    let first = env
        .push_activation(&mut fx.arena, fx.root, FrameContent::Inherit)
        .unwrap_or_else(|e| panic!("{e}"));
    let second = env
        .push_activation(&mut fx.arena, fx.body, FrameContent::Inherit)
        .unwrap_or_else(|e| panic!("{e}"));
    let before = env.lengths();

    let err = env
        .push_activation(&mut fx.arena, fx.body, FrameContent::Inherit)
        .err()
        .map(|e| e.kind);
    assert_eq!(err, Some(EvalErrorKind::RecursionLimit { depth: 2 }));
    assert_eq!(env.lengths(), before);

    env.pop_activation(&mut fx.arena, second);
    env.pop_activation(&mut fx.arena, first);
    assert_eq!(env.depth(), 0);
}

#[test]
fn content_is_found_on_the_nearest_mixin_frame() {
    let mut fx = Fixture::new();
    let mut env = RuntimeEnvironment::new(16);
    assert!(env.content().is_none());

    let mixin = env
        .push_activation(&mut fx.arena, fx.body, FrameContent::Mixin(None))
        .unwrap_or_else(|e| panic!("{e}"));
    let nested = env
        .push_activation(&mut fx.arena, fx.root, FrameContent::Inherit)
        .unwrap_or_else(|e| panic!("{e}"));
    assert!(matches!(env.content(), Some(None)));

    let function = env
        .push_activation(&mut fx.arena, fx.body, FrameContent::Barrier)
        .unwrap_or_else(|e| panic!("{e}"));
    assert!(env.content().is_none());

    env.pop_activation(&mut fx.arena, function);
    env.pop_activation(&mut fx.arena, nested);
    env.pop_activation(&mut fx.arena, mixin);
}

#[test]
fn open_frame_grows_for_late_declarations() {
    let mut fx = Fixture::new();
    let mut env = RuntimeEnvironment::new(16);
    let record = env
        .push_activation(&mut fx.arena, fx.body, FrameContent::Inherit)
        .unwrap_or_else(|e| panic!("{e}"));

    let late = fx
        .arena
        .declare(fx.body, SlotKind::Variable, fx.interner.intern("late"));
    assert!(env.set_variable(late, Value::Bool(true), false).is_err());

    assert_eq!(env.grow_frame(&fx.arena, fx.body), Ok(()));
    assert_eq!(env.lengths().variables, 3);
    assert_eq!(env.set_variable(late, Value::Bool(true), false), Ok(true));

    env.pop_activation(&mut fx.arena, record);
    assert_eq!(env.lengths().variables, 0);
}

proptest! {
    /// Any nesting of scope entries returns the arrays to the lengths they had
    /// when each entry began.
    #[test]
    fn push_pop_symmetry(ops in proptest::collection::vec((0usize..3, any::<bool>()), 0..64)) {
        let interner = StringInterner::new();
        let mut arena = ScopeArena::new();
        let root = arena.alloc_root();
        let rule = arena.alloc(Some(root), ScopeFlags::empty());
        let body = arena.alloc(Some(rule), ScopeFlags::CALLABLE);
        arena.declare(rule, SlotKind::Variable, interner.intern("x"));
        arena.declare(body, SlotKind::Variable, interner.intern("y"));
        arena.declare(body, SlotKind::Mixin, interner.intern("m"));
        let scopes = [root, rule, body];

        let mut env = RuntimeEnvironment::new(1024);
        let initial = env.lengths();
        let mut open = Vec::new();

        for (choice, push) in ops {
            if push || open.is_empty() {
                let before = env.lengths();
                let record = env
                    .push_activation(&mut arena, scopes[choice], FrameContent::Inherit)
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                open.push((before, record));
            } else if let Some((before, record)) = open.pop() {
                env.pop_activation(&mut arena, record);
                prop_assert_eq!(env.lengths(), before);
            }
        }
        while let Some((before, record)) = open.pop() {
            env.pop_activation(&mut arena, record);
            prop_assert_eq!(env.lengths(), before);
        }
        prop_assert_eq!(env.lengths(), initial);
        for scope in scopes {
            prop_assert!(!arena.get(scope).is_active());
        }
    }
}
