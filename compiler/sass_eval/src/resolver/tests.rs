use super::*;
use crate::environment::FrameContent;
use pretty_assertions::assert_eq;
use sass_ir::ast::Stylesheet;
use sass_ir::{ScopeFlags, Value};
use std::path::PathBuf;

struct World {
    interner: StringInterner,
    arena: ScopeArena,
    env: RuntimeEnvironment,
    modules: ModuleGraph,
}

impl World {
    fn new() -> Self {
        World {
            interner: StringInterner::new(),
            arena: ScopeArena::new(),
            env: RuntimeEnvironment::new(64),
            modules: ModuleGraph::new(),
        }
    }

    fn module(&mut self, path: &str) -> (ScopeId, ModuleId) {
        let root = self.arena.alloc_root();
        let sheet = Stylesheet {
            root,
            body: Vec::new(),
        };
        let id = self
            .modules
            .insert(PathBuf::from(path), sheet, &mut self.arena)
            .unwrap_or_else(|e| panic!("{e}"));
        (root, id)
    }

    fn var(&mut self, scope: ScopeId, name: &str, value: Option<f64>) -> Address {
        let address = self
            .arena
            .declare(scope, SlotKind::Variable, self.interner.intern(name));
        if let Some(n) = value {
            self.env.set_variable(address, Value::Number(n), false).ok();
        }
        address
    }

    fn resolver(&self) -> Resolver<'_> {
        Resolver {
            arena: &self.arena,
            env: &self.env,
            modules: &self.modules,
            interner: &self.interner,
        }
    }

    fn lookup(&self, scope: ScopeId, name: &str, pass_through: bool) -> Option<Address> {
        self.resolver()
            .resolve(SlotKind::Variable, self.interner.intern(name), scope, pass_through)
    }

    fn ns_lookup(&self, scope: ScopeId, ns: &str, name: &str) -> NamespacedLookup {
        self.resolver().resolve_namespaced(
            SlotKind::Variable,
            self.interner.intern(ns),
            self.interner.intern(name),
            scope,
        )
    }
}

#[test]
fn candidate_order_follows_the_chain() {
    let mut w = World::new();
    let (root, module) = w.module("/main.scss");
    let (lib, lib_module) = w.module("/lib.scss");
    w.arena.get_mut(root).push_forwarded(lib);
    let branch = w.arena.alloc(Some(root), ScopeFlags::PERMEABLE);
    let body = w.arena.alloc(Some(branch), ScopeFlags::CALLABLE);

    let full: Vec<_> = Candidates::new(&w.arena, body, true).collect();
    assert_eq!(
        full,
        vec![
            Candidate::Own(body),
            Candidate::Own(branch),
            Candidate::Own(root),
            Candidate::Public(lib),
            Candidate::Merged(lib_module),
            Candidate::Merged(module),
            Candidate::Own(ScopeId::BUILTINS),
        ]
    );

    let local: Vec<_> = Candidates::new(&w.arena, body, false).collect();
    assert_eq!(local, vec![Candidate::Own(body)]);

    let bleeding: Vec<_> = Candidates::new(&w.arena, branch, false).collect();
    assert_eq!(
        bleeding,
        vec![
            Candidate::Own(branch),
            Candidate::Own(root),
            Candidate::Public(lib),
            Candidate::Merged(lib_module),
            Candidate::Merged(module),
        ]
    );
}

#[test]
fn import_scopes_are_invisible() {
    let mut w = World::new();
    let (root, module) = w.module("/main.scss");
    let import = w.arena.alloc(Some(root), ScopeFlags::IMPORT);
    let rule = w.arena.alloc(Some(import), ScopeFlags::empty());

    let from_import: Vec<_> = Candidates::new(&w.arena, import, false).collect();
    assert_eq!(
        from_import,
        vec![Candidate::Own(root), Candidate::Merged(module)]
    );

    let from_rule: Vec<_> = Candidates::new(&w.arena, rule, true).collect();
    assert_eq!(
        from_rule,
        vec![
            Candidate::Own(rule),
            Candidate::Own(root),
            Candidate::Merged(module),
            Candidate::Own(ScopeId::BUILTINS),
        ]
    );
}

#[test]
fn innermost_binding_wins() {
    let mut w = World::new();
    let (root, _) = w.module("/main.scss");
    let rule = w.arena.alloc(Some(root), ScopeFlags::empty());
    let global = w.var(root, "x", Some(1.0));
    let local = w.var(rule, "x", None);

    let record = w
        .env
        .push_activation(&mut w.arena, rule, FrameContent::Inherit)
        .unwrap_or_else(|e| panic!("{e}"));

    // Declared but unassigned: falls through to the global.
    assert_eq!(w.lookup(rule, "x", true), Some(global));

    w.env.set_variable(local, Value::Number(2.0), false).ok();
    assert_eq!(w.lookup(rule, "x", true), Some(local));
    assert_eq!(w.lookup(root, "x", true), Some(global));

    w.env.pop_activation(&mut w.arena, record);
}

#[test]
fn forwarded_roots_hide_private_names() {
    let mut w = World::new();
    let (root, _) = w.module("/main.scss");
    let (lib, _) = w.module("/lib.scss");
    w.arena.get_mut(root).push_forwarded(lib);
    let public = w.var(lib, "public", Some(1.0));
    w.var(lib, "-private", Some(2.0));

    assert_eq!(w.lookup(root, "public", false), Some(public));
    assert_eq!(w.lookup(root, "-private", false), None);
    assert_eq!(w.lookup(root, "_private", false), None);
}

#[test]
fn module_roots_do_not_inherit() {
    let mut w = World::new();
    let (outer, _) = w.module("/main.scss");
    w.var(outer, "x", Some(1.0));
    let (inner, _) = w.module("/dep.scss");
    assert_eq!(w.lookup(inner, "x", true), None);
}

#[test]
fn namespaced_lookup_uses_only_the_module() {
    let mut w = World::new();
    let (root, _) = w.module("/main.scss");
    let (lib, lib_module) = w.module("/lib.scss");
    let ns = w.interner.intern("lib");
    assert_eq!(
        w.arena.get_mut(root).register_namespace(ns, lib, lib_module),
        Ok(())
    );
    let rule = w.arena.alloc(Some(root), ScopeFlags::empty());

    let exposed = w.var(lib, "size", Some(3.0));
    w.var(lib, "-hidden", Some(0.0));
    w.var(root, "mine", Some(1.0));

    assert_eq!(w.ns_lookup(rule, "lib", "size"), NamespacedLookup::Found(exposed));
    assert_eq!(w.ns_lookup(rule, "lib", "mine"), NamespacedLookup::Missing);
    assert_eq!(w.ns_lookup(rule, "lib", "-hidden"), NamespacedLookup::Private);
    assert_eq!(
        w.ns_lookup(rule, "nope", "size"),
        NamespacedLookup::UnknownNamespace
    );
}
