use crate::core::error::{LuaError, LuaResult};
use crate::core::options::LuaOptions;
use crate::core::pin_registry::PinRegistry;
use crate::core::user_data::attach_pin_registry;
use crate::core::warnings::{WARNING_TARGET, WarnSink, forward_warning};
use crate::types::callbacks::{KContext, KFunction};
use crate::types::enums::*;
use pluto_sys::*;
use std::cell::RefCell;
use std::ffi::{CStr, CString, c_int, c_void};
use std::fmt;
use std::ops::Deref;
use std::path::Path;
use std::ptr;

/// A Pluto interpreter state.
///
/// `Lua` owns one native state handle. Every stack, call and table operation lives on
/// [`LuaRef`], which `Lua` dereferences to; see there for how indices and closed handles are
/// treated.
///
/// The owner also holds the state's pin registry: light userdata pushed through any view of
/// this state resolves against it, and [`Lua::close`] releases what is left.
///
/// A state is bound to the thread that uses it; `Lua` is neither `Send` nor `Sync`.
///
/// # Examples
///
/// ```rust
/// use pluto_core::prelude::*;
///
/// let lua = Lua::new()?;
/// lua.open_libs()?;
///
/// assert!(!lua.do_string("answer = 6 * 7")?);
/// lua.get_global("answer")?;
/// assert_eq!(lua.to_integer(-1)?, Some(42));
/// # Ok::<(), LuaError>(())
/// ```
pub struct Lua {
    view: LuaRef,
    ownership: Ownership,
    pins: Option<Box<RefCell<PinRegistry>>>,
    warnings: Option<Box<WarnSink>>,
}

/// A non-owning view of a state handle.
///
/// The value stack lives on the native side only: every query re-reads it, and indices are
/// passed through untouched (1-based from the bottom, negative from the top, or pseudo
/// indices such as [`LUA_REGISTRYINDEX`] and [`lua_upvalueindex`]).
///
/// A view has no destructor, so it is the type to use inside a C function, where
/// [`LuaRef::error`], [`LuaRef::call`] and the `check_*` readers may jump straight out of the
/// frame. Views reached through [`Lua`] or [`Thread`](crate::core::thread::Thread) borrow their
/// owner; once the owning [`Lua`] is closed every method answers [`LuaError::StateClosed`]
/// instead of calling through.
#[derive(Debug)]
pub struct LuaRef {
    state: *mut lua_State,
}

impl Lua {
    /// Creates a fresh state with no libraries open.
    ///
    /// # Returns
    /// The new state, or [`LuaError::AllocationFailed`] if the interpreter could not allocate it
    pub fn new() -> LuaResult<Lua> {
        Self::with_options(LuaOptions::new())
    }

    /// Creates a fresh state and applies `options`.
    ///
    /// The state gets a panic handler that logs unprotected errors before the interpreter
    /// aborts, and a warning function that forwards `warn(...)` output to the `log` crate.
    pub fn with_options(options: LuaOptions) -> LuaResult<Lua> {
        let state = unsafe { new_state() };
        if state.is_null() {
            return Err(LuaError::AllocationFailed);
        }

        let sink = Box::new(WarnSink::new(options.warnings));
        unsafe {
            lua_atpanic(state, Some(log_panic));
            lua_setwarnf(
                state,
                Some(forward_warning),
                &*sink as *const WarnSink as *mut c_void,
            );
        }

        let lua = Lua {
            view: LuaRef { state },
            ownership: Ownership::Owned,
            pins: Some(unsafe { attach_pin_registry(state) }),
            warnings: Some(sink),
        };
        log::debug!("created Lua state {:p}", state);

        lua.open_std_libs(options.libs)?;
        Ok(lua)
    }

    /// Adopts an existing state handle.
    ///
    /// [`Ownership::Owned`] hands the handle over: [`Lua::close`] passes it to `lua_close`, and
    /// the facade attaches a pin registry unless the state already has one.
    /// [`Ownership::Borrowed`] leaves both the handle and any registry to their owner; closing
    /// the facade only detaches it. Inside a C function use [`LuaRef::from_raw`] instead.
    ///
    /// # Safety
    /// `state` must be a live state handle that outlives the facade. An owned handle must not
    /// be closed elsewhere.
    pub unsafe fn from_raw(state: *mut lua_State, ownership: Ownership) -> LuaResult<Lua> {
        let view = unsafe { LuaRef::from_raw(state) }?;
        let pins = match ownership {
            Ownership::Owned if view.pin_registry()?.is_none() => {
                Some(unsafe { attach_pin_registry(state) })
            }
            _ => None,
        };

        Ok(Lua {
            view,
            ownership,
            pins,
            warnings: None,
        })
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Whether guest warnings currently reach the log. Always `false` for adopted handles.
    pub fn warnings_enabled(&self) -> bool {
        self.warnings.as_ref().is_some_and(|sink| sink.is_enabled())
    }

    /// Closes the state and releases every pinned host value.
    ///
    /// The native handle is only closed for [`Ownership::Owned`]. Calling this again is a
    /// no-op; afterwards [`LuaRef::as_raw`] is null.
    pub fn close(&mut self) {
        if self.view.state.is_null() {
            return;
        }

        // Finalizers run inside lua_close and may still warn or resolve pinned values.
        if self.ownership == Ownership::Owned {
            unsafe { lua_close(self.view.state) };
        }
        let state = std::mem::replace(&mut self.view.state, ptr::null_mut());

        let released = self
            .pins
            .take()
            .map_or(0, |pins| (*pins).into_inner().release_all());
        self.warnings = None;
        log::debug!(
            "closed Lua state {:p} ({:?}, {} pinned values released)",
            state,
            self.ownership,
            released
        );
    }
}

impl Deref for Lua {
    type Target = LuaRef;

    fn deref(&self) -> &LuaRef {
        &self.view
    }
}

impl Drop for Lua {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Lua {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lua")
            .field("state", &self.view.state)
            .field("ownership", &self.ownership)
            .field("pinned", &self.pinned_count())
            .finish()
    }
}

impl LuaRef {
    /// Wraps the state handle a C function receives.
    ///
    /// # Safety
    /// `state` must stay alive for as long as the view is used, and the view must not be kept
    /// past the C function call it was made for.
    pub unsafe fn from_raw(state: *mut lua_State) -> LuaResult<LuaRef> {
        if state.is_null() {
            return Err(LuaError::NullPointer);
        }
        Ok(LuaRef { state })
    }

    /// The native handle, null once the owning [`Lua`] is closed.
    pub fn as_raw(&self) -> *mut lua_State {
        self.state
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_null()
    }

    /// The non-null handle, or [`LuaError::StateClosed`].
    pub(crate) fn state(&self) -> LuaResult<*mut lua_State> {
        if self.state.is_null() {
            Err(LuaError::StateClosed)
        } else {
            Ok(self.state)
        }
    }

    /// Version number of the core that created this state (`504.0` for Lua 5.4).
    pub fn version(&self) -> LuaResult<f64> {
        Ok(unsafe { lua_version(self.state()?) })
    }

    // ========== LIBRARIES ==========

    /// Opens every standard library into the state.
    pub fn open_libs(&self) -> LuaResult<()> {
        unsafe { luaL_openlibs(self.state()?) };
        Ok(())
    }

    /// Opens the selected standard libraries, each as a global and in `package.loaded`.
    pub fn open_std_libs(&self, libs: StdLib) -> LuaResult<()> {
        let state = self.state()?;
        for (name, open) in libs.openers() {
            unsafe {
                luaL_requiref(state, name.as_ptr(), open, 1);
                lua_pop(state, 1);
            }
        }
        Ok(())
    }

    // ========== LOADING ==========

    /// Compiles `source` without running it.
    ///
    /// On success the compiled chunk is on top of the stack; otherwise the error message is.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn load_string(&self, source: &str) -> LuaResult<LuaStatus> {
        let state = self.state()?;
        let source = CString::new(source)?;
        log::trace!("loading {} byte chunk", source.as_bytes().len());
        LuaError::from_status_code(unsafe { luaL_loadstring(state, source.as_ptr()) })
    }

    /// Compiles a chunk from raw bytes, which may be text or precompiled binary.
    ///
    /// # Arguments
    /// * `buffer` - The chunk; it may contain NUL bytes
    /// * `chunk_name` - Name used in error messages and debug information
    /// * `mode` - Accepted chunk kinds; `None` accepts both
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn load_buffer(
        &self,
        buffer: &[u8],
        chunk_name: &str,
        mode: Option<LoadMode>,
    ) -> LuaResult<LuaStatus> {
        let state = self.state()?;
        let name = CString::new(chunk_name)?;
        log::trace!("loading chunk {} ({} bytes)", chunk_name, buffer.len());

        let code = unsafe {
            luaL_loadbufferx(
                state,
                buffer.as_ptr().cast(),
                buffer.len(),
                name.as_ptr(),
                mode_ptr(mode),
            )
        };
        LuaError::from_status_code(code)
    }

    /// Compiles the file at `path`.
    ///
    /// A file that cannot be opened or read is reported as [`LuaStatus::FileError`] with the
    /// reason on the stack. Only a path containing a NUL byte is a Rust error.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn load_file(&self, path: impl AsRef<Path>, mode: Option<LoadMode>) -> LuaResult<LuaStatus> {
        let state = self.state()?;
        let path = path.as_ref();
        log::trace!("loading file {}", path.display());

        let path = path_to_cstring(path)?;
        LuaError::from_status_code(unsafe { luaL_loadfilex(state, path.as_ptr(), mode_ptr(mode)) })
    }

    // ========== EXECUTION ==========

    /// Calls the function below `nargs` arguments in protected mode.
    ///
    /// # Arguments
    /// * `nargs` - Number of arguments pushed after the function
    /// * `nresults` - Results to keep, or [`LUA_MULTRET`] for all of them
    /// * `errfunc` - Stack index of a message handler, or `0` for none
    ///
    /// # Returns
    /// The call status; on error the error value replaces the function and its arguments
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn pcall(&self, nargs: i32, nresults: i32, errfunc: i32) -> LuaResult<LuaStatus> {
        let state = self.state()?;
        log::trace!("pcall nargs={} nresults={}", nargs, nresults);
        LuaError::from_status_code(unsafe { lua_pcall(state, nargs, nresults, errfunc) })
    }

    /// [`LuaRef::pcall`] with a continuation, so the callee may yield across this call when it
    /// runs inside a coroutine. `k` runs with `ctx` when the coroutine is resumed.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn pcall_k(
        &self,
        nargs: i32,
        nresults: i32,
        errfunc: i32,
        ctx: KContext,
        k: Option<KFunction>,
    ) -> LuaResult<LuaStatus> {
        let state = self.state()?;
        LuaError::from_status_code(unsafe { lua_pcallk(state, nargs, nresults, errfunc, ctx, k) })
    }

    /// Calls the function below `nargs` arguments without protection.
    ///
    /// # Safety
    /// A runtime error unwinds straight through this frame to the nearest protected call.
    /// Only use this where such a call encloses it, typically inside a C function.
    pub unsafe fn call(&self, nargs: i32, nresults: i32) -> LuaResult<()> {
        let state = self.state()?;
        unsafe { lua_call(state, nargs, nresults) };
        Ok(())
    }

    /// [`LuaRef::call`] with a continuation.
    ///
    /// # Safety
    /// Same contract as [`LuaRef::call`].
    pub unsafe fn call_k(
        &self,
        nargs: i32,
        nresults: i32,
        ctx: KContext,
        k: Option<KFunction>,
    ) -> LuaResult<()> {
        let state = self.state()?;
        unsafe { lua_callk(state, nargs, nresults, ctx, k) };
        Ok(())
    }

    /// Loads and runs `source`.
    ///
    /// # Returns
    /// `true` if either step failed. The error message is left on the stack; use
    /// [`LuaRef::exec_string`] to tell compile errors from runtime errors.
    pub fn do_string(&self, source: &str) -> LuaResult<bool> {
        Ok(!self.load_string(source)?.is_ok() || !self.pcall(0, LUA_MULTRET, 0)?.is_ok())
    }

    /// Loads and runs the file at `path`; `true` if either step failed.
    pub fn do_file(&self, path: impl AsRef<Path>) -> LuaResult<bool> {
        Ok(!self.load_file(path, None)?.is_ok() || !self.pcall(0, LUA_MULTRET, 0)?.is_ok())
    }

    /// Loads and runs `source`, turning a failed step into [`LuaError::Status`].
    ///
    /// The error message is popped into the error. On success the chunk's results stay on
    /// the stack.
    pub fn exec_string(&self, source: &str) -> LuaResult<()> {
        let status = self.load_string(source)?;
        self.check_status(status)?;
        let status = self.pcall(0, LUA_MULTRET, 0)?;
        self.check_status(status)
    }

    /// [`LuaRef::exec_string`] for a file.
    pub fn exec_file(&self, path: impl AsRef<Path>) -> LuaResult<()> {
        let status = self.load_file(path, None)?;
        self.check_status(status)?;
        let status = self.pcall(0, LUA_MULTRET, 0)?;
        self.check_status(status)
    }

    fn check_status(&self, status: LuaStatus) -> LuaResult<()> {
        if !status.is_error() {
            return Ok(());
        }

        let message = self.take_error_message()?;
        log::trace!("chunk failed with {:?}: {}", status, message);
        Err(LuaError::Status { status, message })
    }

    /// Raises the value on top of the stack as a guest error.
    ///
    /// # Safety
    /// This never returns normally: control jumps to the enclosing protected call. Call it
    /// only from a C function, as `return lua.error()`.
    pub unsafe fn error(&self) -> LuaResult<i32> {
        let state = self.state()?;
        Ok(unsafe { lua_error(state) })
    }

    /// Pops the error value on top of the stack and renders it as text.
    ///
    /// Strings and numbers convert directly; other values are described by type. An empty
    /// stack yields an empty message.
    pub fn take_error_message(&self) -> LuaResult<String> {
        let state = self.state()?;
        unsafe {
            if lua_gettop(state) == 0 {
                return Ok(String::new());
            }
            let message = error_text(state, -1);
            lua_pop(state, 1);
            Ok(message)
        }
    }

    /// Stack traceback of this state, starting at `level`.
    ///
    /// `message`, when given, is prepended to the traceback.
    pub fn traceback(&self, message: Option<&str>, level: i32) -> LuaResult<String> {
        let state = self.state()?;
        let message = message.map(CString::new).transpose()?;
        let message_ptr = message.as_ref().map_or(ptr::null(), |m| m.as_ptr());

        unsafe {
            luaL_traceback(state, state, message_ptr, level);
            let text = error_text(state, -1);
            lua_pop(state, 1);
            Ok(text)
        }
    }

    /// Emits a warning through the state's warning function.
    pub fn warn(&self, message: &str) -> LuaResult<()> {
        let state = self.state()?;
        let message = CString::new(message)?;
        unsafe { lua_warning(state, message.as_ptr(), 0) };
        Ok(())
    }

    // ========== GARBAGE COLLECTOR ==========

    /// Runs a full collection cycle.
    pub fn gc_collect(&self) -> LuaResult<()> {
        unsafe { lua_gc(self.state()?, LUA_GCCOLLECT) };
        Ok(())
    }

    /// Memory in use by the interpreter, in bytes.
    pub fn gc_count_bytes(&self) -> LuaResult<usize> {
        let state = self.state()?;
        let (kilobytes, remainder) =
            unsafe { (lua_gc(state, LUA_GCCOUNT), lua_gc(state, LUA_GCCOUNTB)) };
        Ok(kilobytes as usize * 1024 + remainder as usize)
    }

    pub fn gc_stop(&self) -> LuaResult<()> {
        unsafe { lua_gc(self.state()?, LUA_GCSTOP) };
        Ok(())
    }

    pub fn gc_restart(&self) -> LuaResult<()> {
        unsafe { lua_gc(self.state()?, LUA_GCRESTART) };
        Ok(())
    }

    pub fn gc_is_running(&self) -> LuaResult<bool> {
        Ok(unsafe { lua_gc(self.state()?, LUA_GCISRUNNING) } != 0)
    }
}

#[cfg(not(feature = "rust-alloc"))]
unsafe fn new_state() -> *mut lua_State {
    unsafe { luaL_newstate() }
}

#[cfg(feature = "rust-alloc")]
unsafe fn new_state() -> *mut lua_State {
    unsafe { lua_newstate(rust_alloc, ptr::null_mut()) }
}

/// `lua_Alloc` backed by Rust's global allocator.
///
/// The interpreter passes the old block size back on every realloc and free, so no header is
/// stored. For a fresh allocation `osize` encodes the object kind and is ignored.
#[cfg(feature = "rust-alloc")]
unsafe extern "C" fn rust_alloc(
    _ud: *mut c_void,
    block: *mut c_void,
    osize: usize,
    nsize: usize,
) -> *mut c_void {
    use std::alloc::{Layout, alloc, dealloc, realloc};

    const ALIGN: usize = 16;

    unsafe {
        if nsize == 0 {
            if !block.is_null() {
                dealloc(block.cast(), Layout::from_size_align_unchecked(osize, ALIGN));
            }
            return ptr::null_mut();
        }

        if block.is_null() {
            return match Layout::from_size_align(nsize, ALIGN) {
                Ok(layout) => alloc(layout).cast(),
                Err(_) => ptr::null_mut(),
            };
        }

        realloc(
            block.cast(),
            Layout::from_size_align_unchecked(osize, ALIGN),
            nsize,
        )
        .cast()
    }
}

/// Last words before the interpreter aborts on an unprotected error.
unsafe extern "C-unwind" fn log_panic(state: *mut lua_State) -> c_int {
    let message = unsafe { error_text(state, -1) };
    log::error!(
        target: WARNING_TARGET,
        "unprotected error in call to Lua API ({})",
        message
    );
    0
}

/// Renders the value at `idx` as an error message.
///
/// # Safety
/// `idx` must be a valid index of `state`.
pub(crate) unsafe fn error_text(state: *mut lua_State, idx: c_int) -> String {
    unsafe {
        let mut len = 0usize;
        let text = lua_tolstring(state, idx, &mut len);
        if text.is_null() {
            let type_name = CStr::from_ptr(lua_typename(state, lua_type(state, idx)));
            format!("(error object is a {} value)", type_name.to_string_lossy())
        } else {
            let bytes = std::slice::from_raw_parts(text.cast::<u8>(), len);
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn mode_ptr(mode: Option<LoadMode>) -> *const std::ffi::c_char {
    mode.map_or(ptr::null(), |mode| mode.as_cstr().as_ptr())
}

#[cfg(unix)]
fn path_to_cstring(path: &Path) -> LuaResult<CString> {
    use std::os::unix::ffi::OsStrExt;
    Ok(CString::new(path.as_os_str().as_bytes())?)
}

#[cfg(not(unix))]
fn path_to_cstring(path: &Path) -> LuaResult<CString> {
    Ok(CString::new(path.to_string_lossy().as_bytes())?)
}

#[cfg(all(test, feature = "rust-alloc"))]
mod rust_alloc_tests {
    use super::*;

    #[test]
    fn test_state_runs_on_rust_allocator() {
        let mut lua = Lua::with_options(LuaOptions::new().libs(StdLib::ALL)).unwrap();
        let before = lua.gc_count_bytes().unwrap();

        lua.exec_string(
            r#"
            local rows = {}
            for i = 1, 20000 do
                rows[i] = { index = i, label = string.rep("x", i % 64) .. i }
            end
            keep = rows
            "#,
        )
        .unwrap();
        assert!(lua.gc_count_bytes().unwrap() > before + 1024 * 1024);

        lua.exec_string("keep = nil").unwrap();
        lua.gc_collect().unwrap();
        assert!(lua.gc_count_bytes().unwrap() < before + 1024 * 1024);

        lua.close();
        assert!(lua.is_closed());
    }

    #[test]
    fn test_allocator_grows_and_frees_blocks() {
        unsafe {
            let block = rust_alloc(ptr::null_mut(), ptr::null_mut(), LUA_TTABLE as usize, 24);
            assert!(!block.is_null());
            assert_eq!(block as usize % 16, 0);
            block.cast::<u8>().write_bytes(0xAB, 24);

            let grown = rust_alloc(ptr::null_mut(), block, 24, 4096);
            assert!(!grown.is_null());
            assert_eq!(*grown.cast::<u8>().add(23), 0xAB);

            assert!(rust_alloc(ptr::null_mut(), grown, 4096, 0).is_null());
            assert!(rust_alloc(ptr::null_mut(), ptr::null_mut(), 0, 0).is_null());
        }
    }
}
