//! Rust bindings for the Pluto interpreter, a Lua 5.4 dialect.
//!
//! The [`prelude`] brings in the [`Lua`](prelude::Lua) state facade, its error type and the
//! enumerations it speaks in. The raw C API is available as [`sys`] for anything the facade
//! does not cover.
//!
//! ```rust
//! use pluto::prelude::*;
//!
//! let lua = Lua::with_options(LuaOptions::new().libs(StdLib::ALL))?;
//! assert!(!lua.do_string("print('Hello World')")?);
//! assert!(lua.do_string("this is not lua")?);
//! assert!(lua.take_error_message()?.contains("syntax error"));
//! # Ok::<(), LuaError>(())
//! ```

pub use pluto_core::{core, types};
pub use pluto_sys as sys;

pub mod prelude {
    pub use pluto_core::prelude::*;
}
