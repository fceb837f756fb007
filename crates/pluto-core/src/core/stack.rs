use crate::core::error::{LuaError, LuaResult};
use crate::core::lua::LuaRef;
use crate::types::callbacks::CFunction;
use crate::types::enums::LuaType;
use crate::types::value::IntoLua;
use pluto_sys::*;
use std::ffi::{CStr, CString, c_void};

/// Stack manipulation, type queries, push and read accessors.
impl LuaRef {
    // ========== STACK ==========

    /// Index of the top element, which is also the number of elements on the stack.
    pub fn get_top(&self) -> LuaResult<i32> {
        Ok(unsafe { lua_gettop(self.state()?) })
    }

    /// Grows (filling with nil) or shrinks the stack to `idx` elements.
    pub fn set_top(&self, idx: i32) -> LuaResult<()> {
        unsafe { lua_settop(self.state()?, idx) };
        Ok(())
    }

    pub fn pop(&self, n: i32) -> LuaResult<()> {
        unsafe { lua_pop(self.state()?, n) };
        Ok(())
    }

    /// Pushes a copy of the value at `idx`.
    pub fn push_value(&self, idx: i32) -> LuaResult<()> {
        unsafe { lua_pushvalue(self.state()?, idx) };
        Ok(())
    }

    /// Converts a relative index into an absolute one.
    pub fn abs_index(&self, idx: i32) -> LuaResult<i32> {
        Ok(unsafe { lua_absindex(self.state()?, idx) })
    }

    /// Rotates the elements between `idx` and the top by `n` positions toward the top.
    pub fn rotate(&self, idx: i32, n: i32) -> LuaResult<()> {
        unsafe { lua_rotate(self.state()?, idx, n) };
        Ok(())
    }

    /// Moves the top element into `idx`, shifting the elements above it up.
    pub fn insert(&self, idx: i32) -> LuaResult<()> {
        unsafe { lua_insert(self.state()?, idx) };
        Ok(())
    }

    pub fn remove(&self, idx: i32) -> LuaResult<()> {
        unsafe { lua_remove(self.state()?, idx) };
        Ok(())
    }

    /// Pops the top element into `idx`.
    pub fn replace(&self, idx: i32) -> LuaResult<()> {
        unsafe { lua_replace(self.state()?, idx) };
        Ok(())
    }

    pub fn copy(&self, from: i32, to: i32) -> LuaResult<()> {
        unsafe { lua_copy(self.state()?, from, to) };
        Ok(())
    }

    /// Ensures room for `n` more elements.
    ///
    /// # Returns
    /// [`LuaError::StackOverflow`] if the stack cannot grow that far
    pub fn check_stack(&self, n: i32) -> LuaResult<()> {
        if unsafe { lua_checkstack(self.state()?, n) } == 0 {
            return Err(LuaError::StackOverflow(n));
        }
        Ok(())
    }

    // ========== TYPE QUERIES ==========

    /// Type of the value at `idx`; [`LuaType::None`] for a valid but unused index.
    pub fn type_of(&self, idx: i32) -> LuaResult<LuaType> {
        LuaError::from_type_code(unsafe { lua_type(self.state()?, idx) })
    }

    /// Name the interpreter uses for `ty`.
    pub fn type_name(&self, ty: LuaType) -> LuaResult<&'static str> {
        let name = unsafe { CStr::from_ptr(lua_typename(self.state()?, ty.into())) };
        Ok(name.to_str()?)
    }

    pub fn is_none(&self, idx: i32) -> LuaResult<bool> {
        Ok(self.type_of(idx)? == LuaType::None)
    }

    pub fn is_nil(&self, idx: i32) -> LuaResult<bool> {
        Ok(self.type_of(idx)? == LuaType::Nil)
    }

    pub fn is_none_or_nil(&self, idx: i32) -> LuaResult<bool> {
        Ok(self.type_of(idx)?.is_none_or_nil())
    }

    pub fn is_boolean(&self, idx: i32) -> LuaResult<bool> {
        Ok(self.type_of(idx)? == LuaType::Boolean)
    }

    pub fn is_light_user_data(&self, idx: i32) -> LuaResult<bool> {
        Ok(self.type_of(idx)? == LuaType::LightUserData)
    }

    /// `true` only for actual numbers; strings convertible to numbers do not count.
    pub fn is_number(&self, idx: i32) -> LuaResult<bool> {
        Ok(self.type_of(idx)? == LuaType::Number)
    }

    /// `true` for a number stored with an integer representation.
    pub fn is_integer(&self, idx: i32) -> LuaResult<bool> {
        Ok(unsafe { lua_isinteger(self.state()?, idx) } != 0)
    }

    pub fn is_string(&self, idx: i32) -> LuaResult<bool> {
        Ok(self.type_of(idx)? == LuaType::String)
    }

    pub fn is_table(&self, idx: i32) -> LuaResult<bool> {
        Ok(self.type_of(idx)? == LuaType::Table)
    }

    pub fn is_function(&self, idx: i32) -> LuaResult<bool> {
        Ok(self.type_of(idx)? == LuaType::Function)
    }

    pub fn is_user_data(&self, idx: i32) -> LuaResult<bool> {
        Ok(self.type_of(idx)? == LuaType::UserData)
    }

    pub fn is_thread(&self, idx: i32) -> LuaResult<bool> {
        Ok(self.type_of(idx)? == LuaType::Thread)
    }

    // ========== PUSH ==========

    pub fn push_nil(&self) -> LuaResult<()> {
        unsafe { lua_pushnil(self.state()?) };
        Ok(())
    }

    pub fn push_boolean(&self, value: bool) -> LuaResult<()> {
        unsafe { lua_pushboolean(self.state()?, value as i32) };
        Ok(())
    }

    pub fn push_number(&self, value: f64) -> LuaResult<()> {
        unsafe { lua_pushnumber(self.state()?, value) };
        Ok(())
    }

    pub fn push_integer(&self, value: i64) -> LuaResult<()> {
        unsafe { lua_pushinteger(self.state()?, value) };
        Ok(())
    }

    /// Pushes a copy of `value`. Interior NUL bytes are rejected; use
    /// [`LuaRef::push_bytes`] for binary data.
    pub fn push_string(&self, value: &str) -> LuaResult<()> {
        let state = self.state()?;
        let value = CString::new(value)?;
        unsafe { lua_pushstring(state, value.as_ptr()) };
        Ok(())
    }

    /// Pushes a copy of `bytes` as a string, NUL bytes included.
    pub fn push_bytes(&self, bytes: &[u8]) -> LuaResult<()> {
        unsafe { lua_pushlstring(self.state()?, bytes.as_ptr().cast(), bytes.len()) };
        Ok(())
    }

    pub fn push_cfunction(&self, function: CFunction) -> LuaResult<()> {
        unsafe { lua_pushcfunction(self.state()?, function) };
        Ok(())
    }

    /// Pops `upvalues` values and pushes a C closure capturing them.
    ///
    /// Inside the function they are reachable through [`lua_upvalueindex`].
    pub fn push_cclosure(&self, function: CFunction, upvalues: i32) -> LuaResult<()> {
        unsafe { lua_pushcclosure(self.state()?, function, upvalues) };
        Ok(())
    }

    /// Pushes any value with an [`IntoLua`] conversion.
    ///
    /// ```rust
    /// use pluto_core::prelude::*;
    ///
    /// let lua = Lua::new()?;
    /// lua.push(7)?;
    /// lua.push("seven")?;
    /// lua.push(None::<f64>)?;
    /// assert_eq!(lua.type_of(-3)?, LuaType::Number);
    /// assert_eq!(lua.type_of(-2)?, LuaType::String);
    /// assert_eq!(lua.type_of(-1)?, LuaType::Nil);
    /// # Ok::<(), LuaError>(())
    /// ```
    pub fn push<T: IntoLua>(&self, value: T) -> LuaResult<()> {
        value.push_into(self)
    }

    // ========== READ ==========

    /// Truthiness of the value at `idx`: everything but `false` and nil is `true`.
    pub fn to_boolean(&self, idx: i32) -> LuaResult<bool> {
        Ok(unsafe { lua_toboolean(self.state()?, idx) } != 0)
    }

    /// The value at `idx` as a float, converting numeric strings; `None` if not convertible.
    pub fn to_number(&self, idx: i32) -> LuaResult<Option<f64>> {
        let mut is_number = 0;
        let value = unsafe { lua_tonumberx(self.state()?, idx, &mut is_number) };
        Ok((is_number != 0).then_some(value))
    }

    /// The value at `idx` as an integer; `None` if it has no exact integer representation.
    pub fn to_integer(&self, idx: i32) -> LuaResult<Option<i64>> {
        let mut is_number = 0;
        let value = unsafe { lua_tointegerx(self.state()?, idx, &mut is_number) };
        Ok((is_number != 0).then_some(value))
    }

    /// The string at `idx`; numbers are converted in place, as `lua_tolstring` does.
    ///
    /// # Returns
    /// `None` for values that are neither strings nor numbers, or
    /// [`LuaError::Utf8Conversion`] for a string that is not UTF-8
    pub fn to_string(&self, idx: i32) -> LuaResult<Option<String>> {
        match self.to_bytes(idx)? {
            Some(bytes) => Ok(Some(std::str::from_utf8(&bytes)?.to_owned())),
            None => Ok(None),
        }
    }

    /// The raw bytes of the string at `idx`.
    pub fn to_bytes(&self, idx: i32) -> LuaResult<Option<Vec<u8>>> {
        let mut len = 0usize;
        let data = unsafe { lua_tolstring(self.state()?, idx, &mut len) };
        if data.is_null() {
            return Ok(None);
        }
        Ok(Some(
            unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len) }.to_vec(),
        ))
    }

    /// Identity pointer of a table, function, thread or userdata; null for other values.
    pub fn to_pointer(&self, idx: i32) -> LuaResult<*const c_void> {
        Ok(unsafe { lua_topointer(self.state()?, idx) })
    }

    // ========== CHECKED ARGUMENTS ==========

    /// Reads argument `arg` of a C function as an integer.
    ///
    /// # Safety
    /// When the argument is not an integer the interpreter raises an argument error, which
    /// unwinds to the enclosing protected call. Only call this inside a C function.
    pub unsafe fn check_integer(&self, arg: i32) -> LuaResult<i64> {
        let state = self.state()?;
        Ok(unsafe { luaL_checkinteger(state, arg) })
    }

    /// Reads argument `arg` of a C function as a float.
    ///
    /// # Safety
    /// Same contract as [`LuaRef::check_integer`].
    pub unsafe fn check_number(&self, arg: i32) -> LuaResult<f64> {
        let state = self.state()?;
        Ok(unsafe { luaL_checknumber(state, arg) })
    }

    /// Reads argument `arg` of a C function as a string.
    ///
    /// A null buffer from the interpreter yields an empty string. Invalid UTF-8 is replaced
    /// rather than reported, since the caller cannot raise a Rust error to the guest.
    ///
    /// # Safety
    /// Same contract as [`LuaRef::check_integer`].
    pub unsafe fn check_string(&self, arg: i32) -> LuaResult<String> {
        let state = self.state()?;
        let mut len = 0usize;
        let data = unsafe { luaL_checklstring(state, arg, &mut len) };
        if data.is_null() {
            return Ok(String::new());
        }

        let bytes = unsafe { std::slice::from_raw_parts(data.cast::<u8>(), len) };
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Pushes a raw pointer as light userdata without pinning anything.
    ///
    /// Retrieval through [`LuaRef::to_user_data`] answers `None` for such pointers; read them
    /// back with [`LuaRef::to_pointer`].
    pub fn push_light_pointer(&self, pointer: *mut c_void) -> LuaResult<()> {
        unsafe { lua_pushlightuserdata(self.state()?, pointer) };
        Ok(())
    }
}
