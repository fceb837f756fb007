//! Function pointer types the interpreter calls back into.
//!
//! A C function receives the state it runs in; wrap it with
//! [`LuaRef::from_raw`](crate::core::lua::LuaRef::from_raw) to use the facade, and return the
//! number of results it pushed. The view has no destructor, so argument errors raised by the
//! `check_*` readers can leave the frame safely. Keep other values with destructors out of
//! scope across such calls.
//!
//! ```rust
//! use pluto_core::prelude::*;
//! use pluto_sys::lua_State;
//!
//! unsafe extern "C-unwind" fn double(state: *mut lua_State) -> i32 {
//!     let Ok(lua) = (unsafe { LuaRef::from_raw(state) }) else {
//!         return 0;
//!     };
//!     let value = unsafe { lua.check_number(1) }.unwrap_or_default();
//!     lua.push_number(value * 2.0).map_or(0, |_| 1)
//! }
//!
//! let lua = Lua::new()?;
//! lua.register("double", double)?;
//! lua.exec_string("return double(21)")?;
//! assert_eq!(lua.to_number(-1)?, Some(42.0));
//! # Ok::<(), LuaError>(())
//! ```

/// A function callable from the guest.
pub type CFunction = pluto_sys::lua_CFunction;

/// Continuation run when a coroutine that yielded across a `call_k` / `pcall_k` resumes.
pub type KFunction = pluto_sys::lua_KFunction;

/// Context value handed to a [`KFunction`].
pub type KContext = pluto_sys::lua_KContext;
