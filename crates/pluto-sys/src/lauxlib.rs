//! Declarations from `lauxlib.h`.

use std::ffi::{c_char, c_int, c_void};
use std::ptr;

use crate::lua::*;

/// Global table name.
pub const LUA_GNAME: &std::ffi::CStr = c"_G";

/// Key, in the registry, for the table of loaded modules.
pub const LUA_LOADED_TABLE: &std::ffi::CStr = c"_LOADED";

/// Key, in the registry, for the table of preloaded loaders.
pub const LUA_PRELOAD_TABLE: &std::ffi::CStr = c"_PRELOAD";

/// Extra error code for `luaL_loadfilex`.
pub const LUA_ERRFILE: c_int = LUA_ERRERR + 1;

pub const LUA_NOREF: c_int = -2;
pub const LUA_REFNIL: c_int = -1;

unsafe extern "C-unwind" {
    pub fn luaL_newstate() -> *mut lua_State;

    pub fn luaL_getmetafield(L: *mut lua_State, obj: c_int, e: *const c_char) -> c_int;
    pub fn luaL_callmeta(L: *mut lua_State, obj: c_int, e: *const c_char) -> c_int;
    pub fn luaL_tolstring(L: *mut lua_State, idx: c_int, len: *mut usize) -> *const c_char;
    pub fn luaL_argerror(L: *mut lua_State, arg: c_int, extramsg: *const c_char) -> c_int;
    pub fn luaL_typeerror(L: *mut lua_State, arg: c_int, tname: *const c_char) -> c_int;
    pub fn luaL_checklstring(L: *mut lua_State, arg: c_int, l: *mut usize) -> *const c_char;
    pub fn luaL_optlstring(
        L: *mut lua_State,
        arg: c_int,
        def: *const c_char,
        l: *mut usize,
    ) -> *const c_char;
    pub fn luaL_checknumber(L: *mut lua_State, arg: c_int) -> lua_Number;
    pub fn luaL_optnumber(L: *mut lua_State, arg: c_int, def: lua_Number) -> lua_Number;
    pub fn luaL_checkinteger(L: *mut lua_State, arg: c_int) -> lua_Integer;
    pub fn luaL_optinteger(L: *mut lua_State, arg: c_int, def: lua_Integer) -> lua_Integer;

    pub fn luaL_checkstack(L: *mut lua_State, sz: c_int, msg: *const c_char);
    pub fn luaL_checktype(L: *mut lua_State, arg: c_int, t: c_int);
    pub fn luaL_checkany(L: *mut lua_State, arg: c_int);

    pub fn luaL_newmetatable(L: *mut lua_State, tname: *const c_char) -> c_int;
    pub fn luaL_setmetatable(L: *mut lua_State, tname: *const c_char);
    pub fn luaL_testudata(L: *mut lua_State, ud: c_int, tname: *const c_char) -> *mut c_void;
    pub fn luaL_checkudata(L: *mut lua_State, ud: c_int, tname: *const c_char) -> *mut c_void;

    pub fn luaL_where(L: *mut lua_State, lvl: c_int);

    pub fn luaL_ref(L: *mut lua_State, t: c_int) -> c_int;
    pub fn luaL_unref(L: *mut lua_State, t: c_int, r: c_int);

    pub fn luaL_loadfilex(L: *mut lua_State, filename: *const c_char, mode: *const c_char)
    -> c_int;
    pub fn luaL_loadbufferx(
        L: *mut lua_State,
        buff: *const c_char,
        sz: usize,
        name: *const c_char,
        mode: *const c_char,
    ) -> c_int;
    pub fn luaL_loadstring(L: *mut lua_State, s: *const c_char) -> c_int;

    pub fn luaL_len(L: *mut lua_State, idx: c_int) -> lua_Integer;
    pub fn luaL_gsub(
        L: *mut lua_State,
        s: *const c_char,
        p: *const c_char,
        r: *const c_char,
    ) -> *const c_char;
    pub fn luaL_getsubtable(L: *mut lua_State, idx: c_int, fname: *const c_char) -> c_int;
    pub fn luaL_traceback(
        L: *mut lua_State,
        L1: *mut lua_State,
        msg: *const c_char,
        level: c_int,
    );
    pub fn luaL_requiref(
        L: *mut lua_State,
        modname: *const c_char,
        openf: lua_CFunction,
        glb: c_int,
    );
}

// Macro equivalents

#[inline(always)]
pub unsafe fn luaL_checkstring(L: *mut lua_State, arg: c_int) -> *const c_char {
    unsafe { luaL_checklstring(L, arg, ptr::null_mut()) }
}

#[inline(always)]
pub unsafe fn luaL_optstring(L: *mut lua_State, arg: c_int, def: *const c_char) -> *const c_char {
    unsafe { luaL_optlstring(L, arg, def, ptr::null_mut()) }
}

#[inline(always)]
pub unsafe fn luaL_typename(L: *mut lua_State, i: c_int) -> *const c_char {
    unsafe { lua_typename(L, lua_type(L, i)) }
}

#[inline(always)]
pub unsafe fn luaL_dofile(L: *mut lua_State, filename: *const c_char) -> bool {
    unsafe { luaL_loadfile(L, filename) != LUA_OK || lua_pcall(L, 0, LUA_MULTRET, 0) != LUA_OK }
}

#[inline(always)]
pub unsafe fn luaL_dostring(L: *mut lua_State, s: *const c_char) -> bool {
    unsafe { luaL_loadstring(L, s) != LUA_OK || lua_pcall(L, 0, LUA_MULTRET, 0) != LUA_OK }
}

#[inline(always)]
pub unsafe fn luaL_getmetatable(L: *mut lua_State, n: *const c_char) -> c_int {
    unsafe { lua_getfield(L, LUA_REGISTRYINDEX, n) }
}

#[inline(always)]
pub unsafe fn luaL_loadbuffer(
    L: *mut lua_State,
    buff: *const c_char,
    sz: usize,
    name: *const c_char,
) -> c_int {
    unsafe { luaL_loadbufferx(L, buff, sz, name, ptr::null()) }
}

#[inline(always)]
pub unsafe fn luaL_loadfile(L: *mut lua_State, filename: *const c_char) -> c_int {
    unsafe { luaL_loadfilex(L, filename, ptr::null()) }
}
