use crate::core::error::LuaResult;
use crate::core::lua::LuaRef;

/// Host values that can be pushed onto the stack with [`LuaRef::push`].
pub trait IntoLua {
    /// Pushes `self` as exactly one stack value.
    fn push_into(self, lua: &LuaRef) -> LuaResult<()>;
}

impl IntoLua for bool {
    fn push_into(self, lua: &LuaRef) -> LuaResult<()> {
        lua.push_boolean(self)
    }
}

macro_rules! impl_into_lua_integer {
    ($($ty:ty),*) => {
        $(
            impl IntoLua for $ty {
                fn push_into(self, lua: &LuaRef) -> LuaResult<()> {
                    lua.push_integer(i64::from(self))
                }
            }
        )*
    };
}

impl_into_lua_integer!(i8, i16, i32, i64, u8, u16, u32);

impl IntoLua for f32 {
    fn push_into(self, lua: &LuaRef) -> LuaResult<()> {
        lua.push_number(f64::from(self))
    }
}

impl IntoLua for f64 {
    fn push_into(self, lua: &LuaRef) -> LuaResult<()> {
        lua.push_number(self)
    }
}

impl IntoLua for &str {
    fn push_into(self, lua: &LuaRef) -> LuaResult<()> {
        lua.push_bytes(self.as_bytes())
    }
}

impl IntoLua for String {
    fn push_into(self, lua: &LuaRef) -> LuaResult<()> {
        lua.push_bytes(self.as_bytes())
    }
}

impl IntoLua for &[u8] {
    fn push_into(self, lua: &LuaRef) -> LuaResult<()> {
        lua.push_bytes(self)
    }
}

/// `None` pushes nil.
impl<T: IntoLua> IntoLua for Option<T> {
    fn push_into(self, lua: &LuaRef) -> LuaResult<()> {
        match self {
            Some(value) => value.push_into(lua),
            None => lua.push_nil(),
        }
    }
}

impl IntoLua for () {
    fn push_into(self, lua: &LuaRef) -> LuaResult<()> {
        lua.push_nil()
    }
}
