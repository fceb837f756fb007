use crate::core::error::{LuaError, LuaResult};
use rustc_hash::FxHashMap;
use std::any::{Any, type_name};
use std::cell::RefCell;
use std::ffi::c_void;
use std::rc::Rc;

/// A host value kept alive on behalf of the interpreter.
///
/// `value` is always an `Rc<RefCell<T>>` erased to `dyn Any`. The `Rc` allocation gives every
/// pin a distinct, stable address even for zero-sized values; that address is what the
/// interpreter sees as light userdata.
struct Pinned {
    value: Rc<dyn Any>,
    type_name: &'static str,
}

/// Owns every host value a state has been handed as light userdata.
///
/// Keys are the addresses pushed to the interpreter. A pin is released exactly once, either
/// by [`PinRegistry::take`] or by [`PinRegistry::release_all`]; lookups of an address that was
/// never pinned, or was already released, answer `None`.
///
/// Lookups hand out shared `Rc` handles rather than references, so releasing a pin can never
/// invalidate a value a caller is still holding.
#[derive(Default)]
pub(crate) struct PinRegistry {
    pins: FxHashMap<usize, Pinned>,
}

impl PinRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pin<T: Any>(&mut self, value: T) -> *mut c_void {
        let value: Rc<dyn Any> = Rc::new(RefCell::new(value));
        let address = Rc::as_ptr(&value).cast::<c_void>().cast_mut();
        self.pins.insert(
            address as usize,
            Pinned {
                value,
                type_name: type_name::<T>(),
            },
        );
        log::debug!("pinned {} at {:p}", type_name::<T>(), address);
        address
    }

    pub fn get<T: Any>(&self, address: *const c_void) -> LuaResult<Option<Rc<RefCell<T>>>> {
        match self.pins.get(&(address as usize)) {
            Some(pinned) => Rc::clone(&pinned.value)
                .downcast::<RefCell<T>>()
                .map(Some)
                .map_err(|_| mismatch::<T>(pinned)),
            None => Ok(None),
        }
    }

    /// Releases the pin at `address` and hands the value back.
    ///
    /// A type mismatch leaves the pin in place, and so does a value that still has handles
    /// from [`PinRegistry::get`] alive elsewhere.
    pub fn take<T: Any>(&mut self, address: *const c_void) -> LuaResult<Option<T>> {
        let key = address as usize;

        let Some(pinned) = self.pins.remove(&key) else {
            log::debug!("{:p} is not pinned; nothing to release", address);
            return Ok(None);
        };
        if !(*pinned.value).is::<RefCell<T>>() {
            let error = mismatch::<T>(&pinned);
            self.pins.insert(key, pinned);
            return Err(error);
        }

        let Pinned { value, type_name } = pinned;
        let cell = value
            .downcast::<RefCell<T>>()
            .map_err(|_| LuaError::NullPointer)?;
        match Rc::try_unwrap(cell) {
            Ok(cell) => {
                log::debug!("released {} at {:p}", type_name, address);
                Ok(Some(cell.into_inner()))
            }
            Err(cell) => {
                self.pins.insert(
                    key,
                    Pinned {
                        value: cell,
                        type_name,
                    },
                );
                Err(LuaError::UserDataInUse(type_name))
            }
        }
    }

    /// Drops every pinned value and returns how many there were.
    ///
    /// Handles still held by the host keep their value alive; the address stops resolving.
    pub fn release_all(&mut self) -> usize {
        let count = self.pins.len();
        self.pins.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.pins.len()
    }
}

fn mismatch<T: Any>(pinned: &Pinned) -> LuaError {
    LuaError::UserDataTypeMismatch {
        expected: type_name::<T>(),
        found: pinned.type_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Player {
        name: String,
        score: u32,
    }

    #[test]
    fn test_pin_and_get_returns_same_value() {
        let mut registry = PinRegistry::new();
        let address = registry.pin(Player {
            name: "ada".to_string(),
            score: 3,
        });

        let first = registry.get::<Player>(address).unwrap().unwrap();
        let second = registry.get::<Player>(address).unwrap().unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert_eq!(first.borrow().score, 3);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_take_releases_exactly_once() {
        let mut registry = PinRegistry::new();
        let address = registry.pin(Player {
            name: "bob".to_string(),
            score: 9,
        });

        let taken = registry.take::<Player>(address).unwrap();
        assert_eq!(taken.map(|p| p.name), Some("bob".to_string()));
        assert!(registry.take::<Player>(address).unwrap().is_none());
        assert!(registry.get::<Player>(address).unwrap().is_none());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_type_mismatch_keeps_pin() {
        let mut registry = PinRegistry::new();
        let address = registry.pin(17u64);

        assert!(matches!(
            registry.get::<String>(address),
            Err(LuaError::UserDataTypeMismatch { found: "u64", .. })
        ));
        assert!(registry.take::<i32>(address).is_err());
        assert!(registry.get::<u64>(address).unwrap().is_some());
        assert_eq!(registry.take::<u64>(address).unwrap(), Some(17));
    }

    #[test]
    fn test_take_refuses_while_handles_are_alive() {
        let mut registry = PinRegistry::new();
        let address = registry.pin(String::from("held"));
        let handle = registry.get::<String>(address).unwrap().unwrap();

        assert!(matches!(
            registry.take::<String>(address),
            Err(LuaError::UserDataInUse("alloc::string::String"))
        ));
        assert_eq!(registry.len(), 1);

        drop(handle);
        assert_eq!(
            registry.take::<String>(address).unwrap().as_deref(),
            Some("held")
        );
    }

    #[test]
    fn test_zero_sized_values_get_distinct_addresses() {
        let mut registry = PinRegistry::new();
        let a = registry.pin(());
        let b = registry.pin(());
        assert_ne!(a, b);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_mutation_through_handle() {
        let mut registry = PinRegistry::new();
        let address = registry.pin(vec![1, 2]);
        registry
            .get::<Vec<i32>>(address)
            .unwrap()
            .unwrap()
            .borrow_mut()
            .push(3);
        assert_eq!(
            *registry.get::<Vec<i32>>(address).unwrap().unwrap().borrow(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_release_all_drops_values() {
        let tracker = Rc::new(());
        let mut registry = PinRegistry::new();
        registry.pin(Rc::clone(&tracker));
        registry.pin(Rc::clone(&tracker));
        assert_eq!(Rc::strong_count(&tracker), 3);

        assert_eq!(registry.release_all(), 2);
        assert_eq!(Rc::strong_count(&tracker), 1);
        assert_eq!(registry.release_all(), 0);
    }

    #[test]
    fn test_unknown_address_is_none() {
        let mut registry = PinRegistry::new();
        let foreign = 0x1000 as *const c_void;
        assert!(registry.get::<u8>(foreign).unwrap().is_none());
        assert!(registry.take::<u8>(foreign).unwrap().is_none());
    }
}
