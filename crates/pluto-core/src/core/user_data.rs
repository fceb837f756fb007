use crate::core::error::{LuaError, LuaResult};
use crate::core::lua::LuaRef;
use crate::core::pin_registry::PinRegistry;
use crate::types::enums::LuaType;
use pluto_sys::*;
use std::any::Any;
use std::cell::RefCell;
use std::ffi::c_void;
use std::rc::Rc;

/// Registry slot holding the address of the state's [`PinRegistry`].
static PIN_REGISTRY_KEY: u8 = 0;

fn pin_registry_key() -> *const c_void {
    &PIN_REGISTRY_KEY as *const u8 as *const c_void
}

/// Creates a pin registry and records its address in the registry table of `state`.
///
/// The caller keeps the box alive until the state is closed.
///
/// # Safety
/// `state` must be a live state handle.
pub(crate) unsafe fn attach_pin_registry(state: *mut lua_State) -> Box<RefCell<PinRegistry>> {
    let registry = Box::new(RefCell::new(PinRegistry::new()));
    unsafe {
        lua_pushlightuserdata(state, &*registry as *const RefCell<PinRegistry> as *mut c_void);
        lua_rawsetp(state, LUA_REGISTRYINDEX, pin_registry_key());
    }
    registry
}

/// Host values passed to the interpreter as light userdata.
///
/// The guest only ever sees an address. The value itself is pinned in the registry of the
/// owning [`Lua`](crate::core::lua::Lua), which every view of the same state resolves
/// against, until it is taken back with [`LuaRef::take_user_data`] or the owner closes.
///
/// # Examples
///
/// ```rust
/// use pluto_core::prelude::*;
///
/// struct Player {
///     score: u32,
/// }
///
/// let lua = Lua::new()?;
/// lua.push_light_user_data(Player { score: 10 })?;
///
/// if let Some(player) = lua.to_user_data::<Player>(-1)? {
///     player.borrow_mut().score += 5;
/// }
///
/// let player = lua.take_user_data::<Player>(-1)?;
/// assert_eq!(player.map(|p| p.score), Some(15));
/// assert!(lua.to_user_data::<Player>(-1)?.is_none());
/// # Ok::<(), LuaError>(())
/// ```
impl LuaRef {
    /// Pins `value` and pushes its address as light userdata.
    ///
    /// Fails with [`LuaError::PinRegistryMissing`] on a state no [`Lua`](crate::core::lua::Lua)
    /// owns, since nothing would release the value.
    pub fn push_light_user_data<T: Any>(&self, value: T) -> LuaResult<()> {
        let state = self.state()?;
        let registry = self.pin_registry()?.ok_or(LuaError::PinRegistryMissing)?;
        let address = registry.borrow_mut().pin(value);
        unsafe { lua_pushlightuserdata(state, address) };
        Ok(())
    }

    /// A shared handle to the pinned value behind the light userdata at `idx`.
    ///
    /// Every call for the same address hands out the same object.
    ///
    /// # Returns
    /// `None` when the slot is not light userdata or the address is not pinned, and
    /// [`LuaError::UserDataTypeMismatch`] when the pinned value is not a `T`
    pub fn to_user_data<T: Any>(&self, idx: i32) -> LuaResult<Option<Rc<RefCell<T>>>> {
        let Some(address) = self.light_user_data(idx)? else {
            return Ok(None);
        };
        match self.pin_registry()? {
            Some(registry) => registry.borrow().get(address),
            None => Ok(None),
        }
    }

    /// Releases the pin behind the light userdata at `idx` and returns the value.
    ///
    /// The address stays on the stack but no longer resolves; taking it again answers `None`.
    /// On a type mismatch, or while handles from [`LuaRef::to_user_data`] are still alive
    /// ([`LuaError::UserDataInUse`]), the value stays pinned.
    pub fn take_user_data<T: Any>(&self, idx: i32) -> LuaResult<Option<T>> {
        let Some(address) = self.light_user_data(idx)? else {
            return Ok(None);
        };
        match self.pin_registry()? {
            Some(registry) => registry.borrow_mut().take(address),
            None => Ok(None),
        }
    }

    /// Number of host values currently pinned in this state.
    pub fn pinned_count(&self) -> usize {
        match self.pin_registry() {
            Ok(Some(registry)) => registry.borrow().len(),
            _ => 0,
        }
    }

    /// The registry attached by the owning facade, if any.
    pub(crate) fn pin_registry(&self) -> LuaResult<Option<&RefCell<PinRegistry>>> {
        let state = self.state()?;
        let registry = unsafe {
            lua_rawgetp(state, LUA_REGISTRYINDEX, pin_registry_key());
            let address = lua_touserdata(state, -1);
            lua_pop(state, 1);
            address.cast::<RefCell<PinRegistry>>()
        };
        Ok(unsafe { registry.as_ref() })
    }

    fn light_user_data(&self, idx: i32) -> LuaResult<Option<*const c_void>> {
        if self.type_of(idx)? != LuaType::LightUserData {
            return Ok(None);
        }
        let address = unsafe { lua_touserdata(self.state()?, idx) };
        Ok((!address.is_null()).then_some(address.cast_const()))
    }
}
