//! Raw bindings to the Pluto / Lua 5.4 C API.
//!
//! One declaration per native entry point, grouped by the header it comes from, plus Rust
//! functions standing in for the C macros. Nothing here is safe to call without reading the
//! Lua reference manual for the matching function; the `pluto-core` crate wraps these.
//!
//! `build.rs` decides where the native library comes from (`PLUTO_SRC_DIR`, `PLUTO_LIB_DIR`,
//! the `vendored` feature or pkg-config) and fails the build when none is available.
//!
//! The default `vendored` feature builds stock Lua 5.4 from the `lua-src` crate. That core
//! speaks the same C API but not Pluto's syntax extensions; point `PLUTO_SRC_DIR` at a Pluto
//! source tree (or `PLUTO_LIB_DIR` at a prebuilt Pluto library) to embed Pluto itself. The
//! first two options take precedence over the feature, so no feature change is needed.

#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::missing_safety_doc)]

pub mod lauxlib;
pub mod lua;
pub mod lualib;

pub use lauxlib::*;
pub use lua::*;
pub use lualib::*;
