//! Light userdata bridging: pinning host values and resolving them back.

use pluto::prelude::*;
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, PartialEq)]
struct Inventory {
    items: Vec<String>,
}

/// Counts how many times it was dropped.
struct DropProbe(Rc<Cell<u32>>);

impl Drop for DropProbe {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

fn inventory() -> Inventory {
    Inventory {
        items: vec!["rope".to_string(), "lamp".to_string()],
    }
}

#[test]
fn test_repeated_retrieval_returns_same_object() {
    let lua = Lua::new().unwrap();
    lua.push_light_user_data(inventory()).unwrap();
    assert!(lua.is_light_user_data(-1).unwrap());

    let first = lua.to_user_data::<Inventory>(-1).unwrap().unwrap();
    let second = lua.to_user_data::<Inventory>(-1).unwrap().unwrap();
    assert!(Rc::ptr_eq(&first, &second));
    assert_eq!(*first.borrow(), inventory());
    assert_eq!(lua.pinned_count(), 1);
}

#[test]
fn test_take_then_retrieve_is_empty() {
    let lua = Lua::new().unwrap();
    lua.push_light_user_data(inventory()).unwrap();

    let taken = lua.take_user_data::<Inventory>(-1).unwrap();
    assert_eq!(taken, Some(inventory()));
    assert_eq!(lua.pinned_count(), 0);

    assert!(lua.to_user_data::<Inventory>(-1).unwrap().is_none());
    assert!(lua.take_user_data::<Inventory>(-1).unwrap().is_none());
}

#[test]
fn test_mutation_through_pin() {
    let lua = Lua::new().unwrap();
    lua.push_light_user_data(inventory()).unwrap();

    lua.to_user_data::<Inventory>(-1)
        .unwrap()
        .unwrap()
        .borrow_mut()
        .items
        .push("map".to_string());

    let inventory = lua.to_user_data::<Inventory>(-1).unwrap().unwrap();
    assert_eq!(inventory.borrow().items.len(), 3);
}

#[test]
fn test_wrong_type_is_an_error_and_keeps_pin() {
    let lua = Lua::new().unwrap();
    lua.push_light_user_data(inventory()).unwrap();

    match lua.to_user_data::<String>(-1) {
        Err(LuaError::UserDataTypeMismatch { expected, found }) => {
            assert_eq!(expected, "alloc::string::String");
            assert!(found.ends_with("Inventory"));
        }
        other => panic!("expected a type mismatch, got {:?}", other),
    }

    assert!(lua.take_user_data::<u32>(-1).is_err());
    assert_eq!(lua.pinned_count(), 1);
    assert!(lua.take_user_data::<Inventory>(-1).unwrap().is_some());
}

#[test]
fn test_non_light_user_data_slots_are_empty() {
    let lua = Lua::new().unwrap();
    lua.push_nil().unwrap();
    lua.push_integer(3).unwrap();
    lua.new_table().unwrap();
    lua.push_light_pointer(std::ptr::null_mut()).unwrap();
    let mut foreign = 0u64;
    lua.push_light_pointer((&mut foreign as *mut u64).cast()).unwrap();

    for idx in 1..=6 {
        assert!(lua.to_user_data::<u64>(idx).unwrap().is_none());
        assert!(lua.take_user_data::<u64>(idx).unwrap().is_none());
    }
}

#[test]
fn test_pins_survive_the_guest() {
    let lua = Lua::new().unwrap();
    lua.push_light_user_data(inventory()).unwrap();
    lua.set_global("inventory").unwrap();

    lua.exec_string("local copy = inventory; return copy").unwrap();
    lua.gc_collect().unwrap();

    assert_eq!(
        lua.to_user_data::<Inventory>(-1)
            .unwrap()
            .map(|inv| inv.borrow().items.len()),
        Some(2)
    );
    lua.get_global("inventory").unwrap();
    assert!(lua.to_user_data::<Inventory>(-1).unwrap().is_some());
}

#[test]
fn test_close_releases_every_pin_once() {
    let drops = Rc::new(Cell::new(0));
    let mut lua = Lua::new().unwrap();
    lua.push_light_user_data(DropProbe(Rc::clone(&drops))).unwrap();
    lua.push_light_user_data(DropProbe(Rc::clone(&drops))).unwrap();
    lua.push_light_user_data(DropProbe(Rc::clone(&drops))).unwrap();

    drop(lua.take_user_data::<DropProbe>(-1).unwrap());
    assert_eq!(drops.get(), 1);

    lua.close();
    assert_eq!(drops.get(), 3);
    lua.close();
    drop(lua);
    assert_eq!(drops.get(), 3);
}

#[test]
fn test_drop_releases_pins() {
    let drops = Rc::new(Cell::new(0));
    {
        let lua = Lua::new().unwrap();
        lua.push_light_user_data(DropProbe(Rc::clone(&drops))).unwrap();
        assert_eq!(drops.get(), 0);
    }
    assert_eq!(drops.get(), 1);
}

#[test]
fn test_zero_sized_values_stay_distinct() {
    let lua = Lua::new().unwrap();
    lua.push_light_user_data(()).unwrap();
    lua.push_light_user_data(()).unwrap();

    assert_ne!(lua.to_pointer(1).unwrap(), lua.to_pointer(2).unwrap());
    assert!(lua.take_user_data::<()>(1).unwrap().is_some());
    assert!(lua.take_user_data::<()>(2).unwrap().is_some());
}

#[test]
fn test_take_waits_for_outstanding_handles() {
    let lua = Lua::new().unwrap();
    lua.push_light_user_data(inventory()).unwrap();

    let handle = lua.to_user_data::<Inventory>(-1).unwrap().unwrap();
    assert!(matches!(
        lua.take_user_data::<Inventory>(-1),
        Err(LuaError::UserDataInUse(_))
    ));
    assert_eq!(lua.pinned_count(), 1);

    drop(handle);
    assert_eq!(lua.take_user_data::<Inventory>(-1).unwrap(), Some(inventory()));
}

#[test]
fn test_handles_outlive_close() {
    let mut lua = Lua::new().unwrap();
    lua.push_light_user_data(inventory()).unwrap();
    let handle = lua.to_user_data::<Inventory>(-1).unwrap().unwrap();

    lua.close();
    assert_eq!(lua.pinned_count(), 0);
    assert_eq!(handle.borrow().items[0], "rope");
}

#[test]
fn test_views_share_the_owner_registry() {
    let lua = Lua::new().unwrap();
    lua.push_light_user_data(inventory()).unwrap();

    let view = unsafe { LuaRef::from_raw(lua.as_raw()) }.unwrap();
    assert_eq!(view.pinned_count(), 1);
    view.push_light_user_data(7u32).unwrap();
    assert_eq!(lua.pinned_count(), 2);
    assert_eq!(lua.take_user_data::<u32>(-1).unwrap(), Some(7));
    assert!(view.to_user_data::<Inventory>(1).unwrap().is_some());
}
