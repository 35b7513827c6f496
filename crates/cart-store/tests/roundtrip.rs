use cart_core::{Cart, CartItem, MAX_QUANTITY_PER_ITEM};
use cart_store::{FailingBackend, MemoryBackend, PersistenceAdapter, StorageKeys};
use proptest::prelude::*;

fn item() -> impl Strategy<Value = CartItem> {
    ("[a-z0-9_]{1,8}", "[A-Za-z]{1,12}", 0u32..1_000_000, 1..=MAX_QUANTITY_PER_ITEM)
        .prop_map(|(sku, name, cents, qty)| CartItem::new(sku, name, f64::from(cents) / 100.0, qty))
}

fn cart() -> impl Strategy<Value = Cart> {
    proptest::collection::vec(item(), 1..6).prop_map(|items| Cart::from_items(items, "host"))
}

proptest! {
    #[test]
    fn save_then_load_with_failing_session(cart in cart()) {
        let local = MemoryBackend::new();
        let mut store = PersistenceAdapter::new(StorageKeys::default(), FailingBackend::new("disabled"), local);

        store.save(&cart);
        let loaded = store.load();

        prop_assert_eq!(loaded.map(|c| c.items), Some(cart.items));
    }

    #[test]
    fn save_then_load_with_failing_local(cart in cart()) {
        let mut store =
            PersistenceAdapter::new(StorageKeys::default(), MemoryBackend::new(), FailingBackend::new("quota"));

        store.save(&cart);
        let loaded = store.load();

        prop_assert_eq!(loaded.map(|c| c.items), Some(cart.items));
    }

    #[test]
    fn save_then_load_with_no_working_backend(cart in cart()) {
        let mut store = PersistenceAdapter::new(
            StorageKeys::default(),
            FailingBackend::new("disabled"),
            FailingBackend::new("disabled"),
        );

        prop_assert!(store.save(&cart).memory_only);
        prop_assert_eq!(store.load().map(|c| c.items), Some(cart.items.clone()));
        store.clear();
        prop_assert!(store.load().is_none());
    }
}
