use crate::core::error::{LuaError, LuaResult};
use crate::core::lua::LuaRef;
use crate::types::callbacks::CFunction;
use crate::types::enums::LuaType;
use pluto_sys::*;
use std::ffi::CString;

/// Globals, tables and metatables.
///
/// The getters push the value they read and return its type, like their C counterparts.
impl LuaRef {
    // ========== GLOBALS ==========

    pub fn get_global(&self, name: &str) -> LuaResult<LuaType> {
        let state = self.state()?;
        let name = CString::new(name)?;
        LuaError::from_type_code(unsafe { lua_getglobal(state, name.as_ptr()) })
    }

    /// Pops the top value into the global `name`.
    pub fn set_global(&self, name: &str) -> LuaResult<()> {
        let state = self.state()?;
        let name = CString::new(name)?;
        unsafe { lua_setglobal(state, name.as_ptr()) };
        Ok(())
    }

    /// Sets the global `name` to the C function `function`.
    pub fn register(&self, name: &str, function: CFunction) -> LuaResult<()> {
        let state = self.state()?;
        let name = CString::new(name)?;
        unsafe { lua_register(state, name.as_ptr(), function) };
        Ok(())
    }

    // ========== TABLES ==========

    /// Pops a key and pushes `t[key]` for the table at `idx`; may run metamethods.
    pub fn get_table(&self, idx: i32) -> LuaResult<LuaType> {
        LuaError::from_type_code(unsafe { lua_gettable(self.state()?, idx) })
    }

    /// Pops a value and a key, then performs `t[key] = value`.
    pub fn set_table(&self, idx: i32) -> LuaResult<()> {
        unsafe { lua_settable(self.state()?, idx) };
        Ok(())
    }

    pub fn get_field(&self, idx: i32, key: &str) -> LuaResult<LuaType> {
        let state = self.state()?;
        let key = CString::new(key)?;
        LuaError::from_type_code(unsafe { lua_getfield(state, idx, key.as_ptr()) })
    }

    /// Pops a value into `t[key]`.
    pub fn set_field(&self, idx: i32, key: &str) -> LuaResult<()> {
        let state = self.state()?;
        let key = CString::new(key)?;
        unsafe { lua_setfield(state, idx, key.as_ptr()) };
        Ok(())
    }

    /// Pushes `t[n]`.
    pub fn get_index(&self, idx: i32, n: i64) -> LuaResult<LuaType> {
        LuaError::from_type_code(unsafe { lua_geti(self.state()?, idx, n) })
    }

    /// Pops a value into `t[n]`.
    pub fn set_index(&self, idx: i32, n: i64) -> LuaResult<()> {
        unsafe { lua_seti(self.state()?, idx, n) };
        Ok(())
    }

    /// [`LuaRef::get_table`] without metamethods.
    pub fn raw_get(&self, idx: i32) -> LuaResult<LuaType> {
        LuaError::from_type_code(unsafe { lua_rawget(self.state()?, idx) })
    }

    /// [`LuaRef::set_table`] without metamethods.
    pub fn raw_set(&self, idx: i32) -> LuaResult<()> {
        unsafe { lua_rawset(self.state()?, idx) };
        Ok(())
    }

    pub fn raw_get_index(&self, idx: i32, n: i64) -> LuaResult<LuaType> {
        LuaError::from_type_code(unsafe { lua_rawgeti(self.state()?, idx, n) })
    }

    pub fn raw_set_index(&self, idx: i32, n: i64) -> LuaResult<()> {
        unsafe { lua_rawseti(self.state()?, idx, n) };
        Ok(())
    }

    /// Length without metamethods: string length, table border or userdata size.
    pub fn raw_len(&self, idx: i32) -> LuaResult<u64> {
        Ok(unsafe { lua_rawlen(self.state()?, idx) })
    }

    /// Pushes an empty table with room preallocated for `narr` sequence and `nrec` other
    /// entries.
    pub fn create_table(&self, narr: i32, nrec: i32) -> LuaResult<()> {
        unsafe { lua_createtable(self.state()?, narr, nrec) };
        Ok(())
    }

    pub fn new_table(&self) -> LuaResult<()> {
        unsafe { lua_newtable(self.state()?) };
        Ok(())
    }

    /// Pops a key and pushes the next key-value pair of the table at `idx`.
    ///
    /// Start with a nil key. Returns `false`, pushing nothing, once the traversal is done.
    ///
    /// ```rust
    /// use pluto_core::prelude::*;
    ///
    /// let lua = Lua::new()?;
    /// lua.exec_string("return { 10, 20, 30 }")?;
    ///
    /// let mut sum = 0;
    /// lua.push_nil()?;
    /// while lua.next(-2)? {
    ///     sum += lua.to_integer(-1)?.unwrap_or(0);
    ///     lua.pop(1)?;
    /// }
    /// assert_eq!(sum, 60);
    /// # Ok::<(), LuaError>(())
    /// ```
    pub fn next(&self, idx: i32) -> LuaResult<bool> {
        Ok(unsafe { lua_next(self.state()?, idx) } != 0)
    }

    // ========== METATABLES ==========

    /// Pushes the metatable of the value at `idx`; `false`, pushing nothing, if it has none.
    pub fn get_metatable(&self, idx: i32) -> LuaResult<bool> {
        Ok(unsafe { lua_getmetatable(self.state()?, idx) } != 0)
    }

    /// Pops a table (or nil) and makes it the metatable of the value at `idx`.
    pub fn set_metatable(&self, idx: i32) -> LuaResult<()> {
        unsafe { lua_setmetatable(self.state()?, idx) };
        Ok(())
    }

    /// Creates the registry metatable `name` and pushes it.
    ///
    /// # Returns
    /// `false` if the registry already had one, which is pushed instead
    pub fn new_metatable(&self, name: &str) -> LuaResult<bool> {
        let state = self.state()?;
        let name = CString::new(name)?;
        Ok(unsafe { luaL_newmetatable(state, name.as_ptr()) } != 0)
    }

    /// Pushes the registry metatable `name` (nil if there is none).
    pub fn get_named_metatable(&self, name: &str) -> LuaResult<LuaType> {
        let state = self.state()?;
        let name = CString::new(name)?;
        LuaError::from_type_code(unsafe { luaL_getmetatable(state, name.as_ptr()) })
    }

    /// Sets the registry metatable `name` on the value on top of the stack.
    pub fn set_named_metatable(&self, name: &str) -> LuaResult<()> {
        let state = self.state()?;
        let name = CString::new(name)?;
        unsafe { luaL_setmetatable(state, name.as_ptr()) };
        Ok(())
    }
}
