use bitflags::bitflags;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use pluto_sys::*;
use std::ffi::CStr;

/// Status codes returned by loads, protected calls and coroutine resumes.
///
/// These correspond directly to the `LUA_OK` .. `LUA_ERRFILE` constants of the C API.
/// A non-`Ok` status from a load or call leaves the error value on top of the stack.
///
/// # Usage
///
/// ```rust
/// use pluto_core::prelude::*;
///
/// let lua = Lua::new()?;
/// match lua.load_string("return 1 +")? {
///     LuaStatus::Ok => println!("compiled"),
///     LuaStatus::SyntaxError => println!("error: {}", lua.take_error_message()?),
///     other => println!("unexpected status {:?}", other),
/// }
/// # Ok::<(), LuaError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum LuaStatus {
    /// No errors.
    Ok = 0,
    /// The coroutine yielded.
    Yield = 1,
    /// A runtime error.
    RuntimeError = 2,
    /// Syntax error during precompilation.
    SyntaxError = 3,
    /// Memory allocation error. The message handler is not called.
    MemoryError = 4,
    /// Error while running the message handler (`LUA_ERRERR`).
    #[doc(alias = "UnhandledError")]
    #[doc(alias = "LUA_ERRERR")]
    HandlerError = 5,
    /// The file loader could not open or read the file.
    FileError = 6,
}

impl LuaStatus {
    pub fn is_ok(self) -> bool {
        self == LuaStatus::Ok
    }

    /// `true` for every status that leaves an error value on the stack.
    pub fn is_error(self) -> bool {
        !matches!(self, LuaStatus::Ok | LuaStatus::Yield)
    }
}

/// The type tag of a value on the stack, as reported by `lua_type`.
///
/// The discriminants follow the native ordering, which places `None` and `Nil` below every
/// other tag. Comparisons rely on it: `ty <= LuaType::Nil` means "none or nil".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive, IntoPrimitive,
)]
#[repr(i32)]
pub enum LuaType {
    /// No value at a valid but unused stack index.
    None = -1,
    Nil = 0,
    Boolean = 1,
    LightUserData = 2,
    Number = 3,
    String = 4,
    Table = 5,
    Function = 6,
    UserData = 7,
    Thread = 8,
}

impl LuaType {
    /// Every tag, in native order.
    pub const ALL: [LuaType; 10] = [
        LuaType::None,
        LuaType::Nil,
        LuaType::Boolean,
        LuaType::LightUserData,
        LuaType::Number,
        LuaType::String,
        LuaType::Table,
        LuaType::Function,
        LuaType::UserData,
        LuaType::Thread,
    ];

    /// Name of the type as `lua_typename` spells it.
    pub fn name(self) -> &'static str {
        match self {
            LuaType::None => "no value",
            LuaType::Nil => "nil",
            LuaType::Boolean => "boolean",
            LuaType::LightUserData | LuaType::UserData => "userdata",
            LuaType::Number => "number",
            LuaType::String => "string",
            LuaType::Table => "table",
            LuaType::Function => "function",
            LuaType::Thread => "thread",
        }
    }

    pub fn is_none_or_nil(self) -> bool {
        self <= LuaType::Nil
    }
}

bitflags! {
    /// Chunk kinds a loader accepts.
    ///
    /// Maps onto the `mode` string of `lua_load`: `BINARY` is `"b"`, `TEXT` is `"t"` and
    /// both together are `"bt"`. Loading without a mode behaves like `"bt"`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LoadMode: u8 {
        const BINARY = 0b01;
        const TEXT = 0b10;
    }
}

impl LoadMode {
    /// The C mode string for this set.
    ///
    /// An empty set yields `""`, which makes the loader reject every chunk.
    pub fn as_cstr(self) -> &'static CStr {
        match (self.contains(LoadMode::BINARY), self.contains(LoadMode::TEXT)) {
            (true, true) => c"bt",
            (true, false) => c"b",
            (false, true) => c"t",
            (false, false) => c"",
        }
    }
}

impl Default for LoadMode {
    fn default() -> Self {
        LoadMode::all()
    }
}

bitflags! {
    /// Standard libraries that can be opened into a state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StdLib: u16 {
        const BASE = 1 << 0;
        const COROUTINE = 1 << 1;
        const TABLE = 1 << 2;
        const IO = 1 << 3;
        const OS = 1 << 4;
        const STRING = 1 << 5;
        const UTF8 = 1 << 6;
        const MATH = 1 << 7;
        const DEBUG = 1 << 8;
        const PACKAGE = 1 << 9;

        /// Libraries that do not touch the file system, the process or the debug API.
        const SAFE = Self::BASE.bits()
            | Self::COROUTINE.bits()
            | Self::TABLE.bits()
            | Self::STRING.bits()
            | Self::UTF8.bits()
            | Self::MATH.bits();

        const ALL = Self::SAFE.bits()
            | Self::IO.bits()
            | Self::OS.bits()
            | Self::DEBUG.bits()
            | Self::PACKAGE.bits();
    }
}

impl StdLib {
    /// Module name and opener for each library in the set, in the order `luaL_openlibs` uses.
    pub(crate) fn openers(self) -> impl Iterator<Item = (&'static CStr, lua_CFunction)> {
        const TABLE: [(StdLib, &CStr, lua_CFunction); 10] = [
            (StdLib::BASE, LUA_GNAME, luaopen_base),
            (StdLib::PACKAGE, LUA_LOADLIBNAME, luaopen_package),
            (StdLib::COROUTINE, LUA_COLIBNAME, luaopen_coroutine),
            (StdLib::TABLE, LUA_TABLIBNAME, luaopen_table),
            (StdLib::IO, LUA_IOLIBNAME, luaopen_io),
            (StdLib::OS, LUA_OSLIBNAME, luaopen_os),
            (StdLib::STRING, LUA_STRLIBNAME, luaopen_string),
            (StdLib::MATH, LUA_MATHLIBNAME, luaopen_math),
            (StdLib::UTF8, LUA_UTF8LIBNAME, luaopen_utf8),
            (StdLib::DEBUG, LUA_DBLIBNAME, luaopen_debug),
        ];

        TABLE
            .into_iter()
            .filter(move |(lib, _, _)| self.contains(*lib))
            .map(|(_, name, open)| (name, open))
    }
}

/// Whether a [`Lua`](crate::core::lua::Lua) facade closes its state handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ownership {
    /// The facade created the state, or was handed ownership, and closes it.
    #[default]
    Owned,
    /// The handle and its pin registry belong to someone else. Closing the facade only
    /// detaches it.
    Borrowed,
}
