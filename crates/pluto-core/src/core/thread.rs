use crate::core::error::{LuaError, LuaResult};
use crate::core::lua::LuaRef;
use crate::types::enums::LuaStatus;
use pluto_sys::*;
use std::ffi::c_int;
use std::ops::Deref;
use std::ptr;

/// A coroutine thread of a state, borrowed from the view that created or found it.
///
/// The thread value is anchored in the registry for as long as the `Thread` lives, so the
/// collector cannot free it even after it has been popped from every stack. Dropping the
/// `Thread` releases the anchor. The borrow keeps the owning [`Lua`](crate::core::lua::Lua)
/// from being closed or dropped first:
///
/// ```compile_fail
/// use pluto_core::prelude::*;
///
/// let lua = Lua::new()?;
/// let thread = lua.new_thread()?;
/// drop(lua);
/// thread.push_integer(1)?;
/// # Ok::<(), LuaError>(())
/// ```
#[derive(Debug)]
pub struct Thread<'a> {
    view: LuaRef,
    parent: &'a LuaRef,
    anchor: c_int,
}

impl<'a> Thread<'a> {
    /// Anchors `thread`, whose value sits at `idx` of `parent`'s stack.
    ///
    /// # Safety
    /// The value at `idx` must be the thread `thread`.
    unsafe fn anchor(parent: &'a LuaRef, thread: *mut lua_State, idx: c_int) -> LuaResult<Self> {
        let state = parent.state()?;
        let view = unsafe { LuaRef::from_raw(thread) }?;
        let anchor = unsafe {
            lua_pushvalue(state, idx);
            luaL_ref(state, LUA_REGISTRYINDEX)
        };
        log::trace!("anchored thread {:p} as registry ref {}", thread, anchor);

        Ok(Thread {
            view,
            parent,
            anchor,
        })
    }
}

impl Deref for Thread<'_> {
    type Target = LuaRef;

    fn deref(&self) -> &LuaRef {
        &self.view
    }
}

impl Drop for Thread<'_> {
    fn drop(&mut self) {
        if let Ok(state) = self.parent.state() {
            unsafe { luaL_unref(state, LUA_REGISTRYINDEX, self.anchor) };
        }
    }
}

impl LuaRef {
    // ========== COROUTINES ==========

    /// Creates a coroutine thread sharing this state's globals.
    ///
    /// The thread is pushed onto this stack; the returned [`Thread`] keeps it alive whether or
    /// not the value stays there.
    pub fn new_thread(&self) -> LuaResult<Thread<'_>> {
        let state = self.state()?;
        let thread = unsafe { lua_newthread(state) };
        unsafe { Thread::anchor(self, thread, -1) }
    }

    /// Pushes this thread onto its own stack; `true` if it is the main thread.
    pub fn push_thread(&self) -> LuaResult<bool> {
        let state = self.state()?;
        Ok(unsafe { lua_pushthread(state) } != 0)
    }

    /// The thread at `idx`, or `None` if the value is not a thread.
    pub fn to_thread(&self, idx: i32) -> LuaResult<Option<Thread<'_>>> {
        let state = self.state()?;
        let thread = unsafe { lua_tothread(state, idx) };
        if thread.is_null() {
            return Ok(None);
        }
        unsafe { Thread::anchor(self, thread, idx) }.map(Some)
    }

    /// Starts or resumes this coroutine with `nargs` arguments from its stack.
    ///
    /// # Returns
    /// The status ([`LuaStatus::Yield`] while suspended, [`LuaStatus::Ok`] once finished) and
    /// the number of values yielded or returned, which are on top of this stack
    pub fn resume(&self, from: Option<&LuaRef>, nargs: i32) -> LuaResult<(LuaStatus, i32)> {
        let state = self.state()?;
        let from = match from {
            Some(lua) => lua.state()?,
            None => ptr::null_mut(),
        };

        let mut nresults: c_int = 0;
        let code = unsafe { lua_resume(state, from, nargs, &mut nresults) };
        Ok((LuaError::from_status_code(code)?, nresults))
    }

    /// Status of this thread: `Ok` for a normal thread, `Yield` for a suspended coroutine, or
    /// the error that killed it.
    pub fn status(&self) -> LuaResult<LuaStatus> {
        LuaError::from_status_code(unsafe { lua_status(self.state()?) })
    }

    pub fn is_yieldable(&self) -> LuaResult<bool> {
        Ok(unsafe { lua_isyieldable(self.state()?) } != 0)
    }

    /// Pops `n` values from this stack and pushes them onto `to`.
    ///
    /// Both must be threads of the same state, or this fails with
    /// [`LuaError::ForeignState`].
    pub fn xmove(&self, to: &LuaRef, n: i32) -> LuaResult<()> {
        if self.main_thread()? != to.main_thread()? {
            return Err(LuaError::ForeignState);
        }
        unsafe { lua_xmove(self.state()?, to.state()?, n) };
        Ok(())
    }

    fn main_thread(&self) -> LuaResult<*mut lua_State> {
        let state = self.state()?;
        unsafe {
            lua_rawgeti(state, LUA_REGISTRYINDEX, LUA_RIDX_MAINTHREAD);
            let main = lua_tothread(state, -1);
            lua_pop(state, 1);
            Ok(main)
        }
    }
}
