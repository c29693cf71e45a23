use super::*;

#[test]
fn none_is_the_default_shared_key() {
    let key = ContextKey::none();
    assert_eq!(key, ContextKey::default());
    assert!(!key.is_unique());
    assert_eq!(key.raw_id(), 0);
    assert_eq!(key.type_id(), None);
}

#[test]
fn id_keys_compare_by_id_and_uniqueness() {
    assert_eq!(ContextKey::id(3), ContextKey::id(3));
    assert_ne!(ContextKey::id(3), ContextKey::id(4));
    assert!(ContextKey::id(3).is_unique());
    assert_ne!(ContextKey::id(3), ContextKey::id(3).shared());
    assert_eq!(ContextKey::id(3).shared().unique(), ContextKey::id(3));
}

#[test]
fn value_keys_are_typed() {
    let a = ContextKey::value(&"apple");
    assert_eq!(a, ContextKey::value(&"apple"));
    assert_ne!(a, ContextKey::value(&"pear"));
    assert_eq!(a.type_id(), Some(TypeId::of::<&str>()));

    // same hash input, different types
    assert_ne!(ContextKey::value(&7u32), ContextKey::value(&7u64));
}

#[test]
fn reference_keys_follow_the_address() {
    let first = String::from("row");
    let second = first.clone();
    let key = ContextKey::reference(&first);
    assert_eq!(key, ContextKey::reference(&first));
    assert_ne!(key, ContextKey::reference(&second));
    assert_eq!(
        key.reference_address(),
        Some(&first as *const String as usize)
    );
    assert_eq!(ContextKey::id(5).reference_address(), None);
}

#[test]
fn debug_output_names_the_parts() {
    assert_eq!(format!("{:?}", ContextKey::none()), "ContextKey(0)");
    assert_eq!(format!("{:?}", ContextKey::id(9)), "ContextKey(9 unique)");
    let typed = format!("{:?}", ContextKey::value(&1u8));
    assert!(typed.contains(":u8"), "{typed}");
}
