use crate::types::enums::StdLib;

/// Settings applied by [`Lua::with_options`](crate::core::lua::Lua::with_options).
///
/// # Examples
///
/// ```rust
/// use pluto_core::prelude::*;
///
/// let options = LuaOptions::new().libs(StdLib::SAFE).warnings(true);
/// let lua = Lua::with_options(options)?;
/// assert!(!lua.do_string("assert(io == nil)")?);
/// # Ok::<(), LuaError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LuaOptions {
    /// Standard libraries opened right after the state is created.
    pub libs: StdLib,
    /// Initial state of the guest warning channel (`warn("@on")` / `warn("@off")` still
    /// toggle it later).
    pub warnings: bool,
}

impl LuaOptions {
    /// No libraries, warnings off: the same state [`Lua::new`](crate::core::lua::Lua::new)
    /// produces.
    pub fn new() -> Self {
        LuaOptions {
            libs: StdLib::empty(),
            warnings: false,
        }
    }

    pub fn libs(mut self, libs: StdLib) -> Self {
        self.libs = libs;
        self
    }

    pub fn warnings(mut self, enabled: bool) -> Self {
        self.warnings = enabled;
        self
    }
}

impl Default for LuaOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_bare_state() {
        let options = LuaOptions::default();
        assert!(options.libs.is_empty());
        assert!(!options.warnings);
    }

    #[test]
    fn test_builder_methods() {
        let options = LuaOptions::new()
            .libs(StdLib::BASE | StdLib::STRING)
            .warnings(true);
        assert!(options.libs.contains(StdLib::STRING));
        assert!(!options.libs.contains(StdLib::IO));
        assert!(options.warnings);
    }
}
