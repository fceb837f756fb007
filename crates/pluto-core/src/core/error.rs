use crate::types::enums::{LuaStatus, LuaType};
use std::ffi::{NulError, c_int};
use std::str::Utf8Error;
use thiserror::Error;

pub type LuaResult<T> = anyhow::Result<T, LuaError>;

#[derive(Error, Debug)]
pub enum LuaError {
    #[error("Failed to allocate Lua state")]
    AllocationFailed,

    #[error("Lua state is closed")]
    StateClosed,

    #[error("Null pointer encountered")]
    NullPointer,

    #[error("Lua returned {status:?}: {message}")]
    Status { status: LuaStatus, message: String },

    #[error("Unknown status code: {0}")]
    UnknownStatus(i32),

    #[error("Unknown type code: {0}")]
    UnknownType(i32),

    #[error("String conversion error: {0}")]
    StringConversion(#[from] NulError),

    #[error("UTF-8 conversion error: {0}")]
    Utf8Conversion(#[from] Utf8Error),

    #[error("Light userdata holds {found}, not {expected}")]
    UserDataTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("Light userdata holding {0} is still borrowed by the host")]
    UserDataInUse(&'static str),

    #[error("No pin registry is attached to this state")]
    PinRegistryMissing,

    #[error("Threads belong to different Lua states")]
    ForeignState,

    #[error("Cannot grow the stack by {0} slots")]
    StackOverflow(i32),
}

impl LuaError {
    pub fn from_status_code(code: c_int) -> LuaResult<LuaStatus> {
        LuaStatus::try_from(code).map_err(|e| LuaError::UnknownStatus(e.number))
    }

    pub fn from_type_code(code: c_int) -> LuaResult<LuaType> {
        LuaType::try_from(code).map_err(|e| LuaError::UnknownType(e.number))
    }

    /// The status carried by a [`LuaError::Status`], if any.
    pub fn status(&self) -> Option<LuaStatus> {
        match self {
            LuaError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
