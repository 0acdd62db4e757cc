use super::*;
use pretty_assertions::assert_eq;

#[test]
fn intern_is_idempotent() {
    let interner = StringInterner::new();
    let a = interner.intern("color");
    let b = interner.intern("color");
    assert_eq!(a, b);
    assert_eq!(interner.lookup(a), "color");
}

#[test]
fn underscore_and_hyphen_are_the_same_name() {
    let interner = StringInterner::new();
    let hyphen = interner.intern("font-size");
    let underscore = interner.intern("font_size");
    assert_eq!(hyphen, underscore);
    assert_eq!(interner.lookup(underscore), "font-size");
}

#[test]
fn empty_string_is_pre_interned() {
    let interner = StringInterner::new();
    assert_eq!(interner.intern(""), Name::EMPTY);
    assert_eq!(interner.len(), 1);
}

#[test]
fn private_names() {
    let interner = StringInterner::new();
    assert!(interner.is_private(interner.intern("-secret")));
    assert!(interner.is_private(interner.intern("_secret")));
    assert!(!interner.is_private(interner.intern("public")));
    assert!(!interner.is_private(interner.intern("a-b")));
}

#[test]
fn shared_interner_clones_share_storage() {
    let shared = SharedInterner::new();
    let other = shared.clone();
    let name = shared.intern("width");
    assert_eq!(other.lookup(name), "width");
}
