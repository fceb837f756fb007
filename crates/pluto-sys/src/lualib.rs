//! Declarations from `lualib.h`.

use std::ffi::{CStr, c_int};

use crate::lua::lua_State;

pub const LUA_COLIBNAME: &CStr = c"coroutine";
pub const LUA_TABLIBNAME: &CStr = c"table";
pub const LUA_IOLIBNAME: &CStr = c"io";
pub const LUA_OSLIBNAME: &CStr = c"os";
pub const LUA_STRLIBNAME: &CStr = c"string";
pub const LUA_UTF8LIBNAME: &CStr = c"utf8";
pub const LUA_MATHLIBNAME: &CStr = c"math";
pub const LUA_DBLIBNAME: &CStr = c"debug";
pub const LUA_LOADLIBNAME: &CStr = c"package";

unsafe extern "C-unwind" {
    pub fn luaopen_base(L: *mut lua_State) -> c_int;
    pub fn luaopen_coroutine(L: *mut lua_State) -> c_int;
    pub fn luaopen_table(L: *mut lua_State) -> c_int;
    pub fn luaopen_io(L: *mut lua_State) -> c_int;
    pub fn luaopen_os(L: *mut lua_State) -> c_int;
    pub fn luaopen_string(L: *mut lua_State) -> c_int;
    pub fn luaopen_utf8(L: *mut lua_State) -> c_int;
    pub fn luaopen_math(L: *mut lua_State) -> c_int;
    pub fn luaopen_debug(L: *mut lua_State) -> c_int;
    pub fn luaopen_package(L: *mut lua_State) -> c_int;

    /// Opens all standard libraries into the given state.
    pub fn luaL_openlibs(L: *mut lua_State);
}
