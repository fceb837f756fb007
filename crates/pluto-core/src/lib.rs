//! Safe host facade over the Pluto / Lua 5.4 C API.
//!
//! [`Lua`](core::lua::Lua) owns one interpreter state; it dereferences to
//! [`LuaRef`](core::lua::LuaRef), which forwards each method to the matching entry point of
//! [`pluto_sys`]. Status and type codes come back as
//! [`LuaStatus`](types::enums::LuaStatus) and [`LuaType`](types::enums::LuaType); misuse on
//! the host side (a closed state, a string with a NUL byte, a wrong downcast) comes back as
//! [`LuaError`](core::error::LuaError).

pub mod core;
pub mod types;

pub mod prelude {
    pub use crate::core::error::{LuaError, LuaResult};
    pub use crate::core::lua::*;
    pub use crate::core::options::*;
    pub use crate::core::thread::*;
    pub use crate::types::callbacks::*;
    pub use crate::types::enums::*;
    pub use crate::types::value::*;
    pub use pluto_sys::{LUA_MULTRET, LUA_REGISTRYINDEX, lua_upvalueindex};
}
