//! Lua 5.4 runtime bridged to a [`Host`], via the `mlua` crate.
//!
//! A [`LuaRuntime`] is one interpreter instance with the host primitives
//! pre-registered as globals.  The translation layer in
//! [`crate::shim`] is loaded on top of it by the bootstrap.
//!
//! # Host globals
//!
//! | Lua function                                          | Effect                               |
//! |-------------------------------------------------------|--------------------------------------|
//! | `send_command(text, suppressExpansion)`               | [`Host::send_command`]               |
//! | `display_notice(text)`                                | [`Host::display_notice`]             |
//! | `reflex_find_by_name(kind, name, caseSens, inclDis)`  | handle userdata, or `nil` on a miss  |
//! | `reflex_enable(ref)` / `reflex_disable(ref)`          | toggle a reflex; `ref` may be `nil`  |
//! | `print(...)`                                          | [`Host::console`], tab-separated     |
//!
//! Host failures surface in Lua as runtime errors carrying the
//! [`HostError`](crate::host::HostError) unchanged.

use std::path::Path;
use std::rc::Rc;

use mlua::prelude::*;
use mlua::{
    FromLuaMulti, IntoLua, IntoLuaMulti, MetaMethod, UserData, UserDataFields, UserDataMethods,
    UserDataRef, Variadic,
};

use crate::host::Host;
use crate::reflex::{ReflexKind, ReflexRef};

// ── ReflexRef as userdata ─────────────────────────────────────────────────────

impl UserData for ReflexRef {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("kind", |_, this| Ok(this.kind.name()));
        fields.add_field_method_get("id", |_, this| Ok(this.id));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("reflex<{} #{}>", this.kind, this.id))
        });
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: UserDataRef<ReflexRef>| {
            Ok(*this == *other)
        });
    }
}

// ── LuaRuntime ────────────────────────────────────────────────────────────────

/// A Lua interpreter with the host API registered.
///
/// Not `Send`: the runtime lives on the host's single control thread.
pub struct LuaRuntime {
    lua: Lua,
}

impl LuaRuntime {
    /// Create a new interpreter and bridge `host` into its globals.
    pub fn new(host: Rc<dyn Host>) -> LuaResult<Self> {
        let lua = Lua::new();
        Self::register_host(&lua, host)?;
        Ok(Self { lua })
    }

    fn register_host(lua: &Lua, host: Rc<dyn Host>) -> LuaResult<()> {
        let globals = lua.globals();

        // send_command(text, suppressExpansion)
        {
            let host = Rc::clone(&host);
            globals.set(
                "send_command",
                lua.create_function(move |_, (text, suppress): (String, bool)| {
                    host.send_command(&text, suppress).map_err(LuaError::external)
                })?,
            )?;
        }

        // display_notice(text)
        {
            let host = Rc::clone(&host);
            globals.set(
                "display_notice",
                lua.create_function(move |_, text: String| {
                    host.display_notice(&text).map_err(LuaError::external)
                })?,
            )?;
        }

        // reflex_find_by_name(kind, name, caseSensitive, includeDisabled) → ref | nil
        {
            let host = Rc::clone(&host);
            globals.set(
                "reflex_find_by_name",
                lua.create_function(
                    move |_, (kind, name, case_sensitive, include_disabled): (String, String, bool, bool)| {
                        let kind: ReflexKind = kind.parse().map_err(|e| {
                            LuaError::RuntimeError(format!(
                                "bad argument #1 to 'reflex_find_by_name' ({e})"
                            ))
                        })?;
                        host.reflex_find_by_name(kind, &name, case_sensitive, include_disabled)
                            .map_err(LuaError::external)
                    },
                )?,
            )?;
        }

        // reflex_enable(ref | nil)
        {
            let host = Rc::clone(&host);
            globals.set(
                "reflex_enable",
                lua.create_function(move |_, reflex: Option<UserDataRef<ReflexRef>>| {
                    host.reflex_enable(reflex.as_deref()).map_err(LuaError::external)
                })?,
            )?;
        }

        // reflex_disable(ref | nil)
        {
            let host = Rc::clone(&host);
            globals.set(
                "reflex_disable",
                lua.create_function(move |_, reflex: Option<UserDataRef<ReflexRef>>| {
                    host.reflex_disable(reflex.as_deref()).map_err(LuaError::external)
                })?,
            )?;
        }

        // print(...) → host console
        {
            let host = Rc::clone(&host);
            globals.set(
                "print",
                lua.create_function(move |lua, args: Variadic<LuaValue>| {
                    let tostring: LuaFunction = lua.globals().get("tostring")?;
                    let parts = args
                        .iter()
                        .map(|v| tostring.call::<String>(v.clone()))
                        .collect::<LuaResult<Vec<_>>>()?;
                    host.console(&parts.join("\t"));
                    Ok(())
                })?,
            )?;
        }

        Ok(())
    }

    // ── Loading ───────────────────────────────────────────────────────────

    /// Execute a Lua chunk string.
    pub fn exec(&self, chunk: &str) -> LuaResult<()> {
        self.lua.load(chunk).exec()
    }

    /// Execute a chunk, naming it `name` in error messages and tracebacks.
    pub fn exec_named(&self, chunk: &str, name: &str) -> LuaResult<()> {
        self.lua.load(chunk).set_name(format!("@{name}")).exec()
    }

    /// Load and execute a Lua source file.
    pub fn load_file(&self, path: &Path) -> LuaResult<()> {
        self.lua.load(path).exec()
    }

    /// Evaluate a Lua expression and convert its value(s) to `R`.
    pub fn eval<R: FromLuaMulti>(&self, expr: &str) -> LuaResult<R> {
        self.lua.load(expr).eval()
    }

    // ── Calls ─────────────────────────────────────────────────────────────

    /// Call the global function `name` with positional `args`.
    ///
    /// A missing global is an error, as in Lua itself.
    pub fn call_func<R: FromLuaMulti>(&self, name: &str, args: impl IntoLuaMulti) -> LuaResult<R> {
        let func: LuaFunction = self.lua.globals().get(name)?;
        func.call::<R>(args)
    }

    /// `true` if the global `name` is a function.
    pub fn has_function(&self, name: &str) -> bool {
        matches!(self.lua.globals().get::<LuaValue>(name), Ok(LuaValue::Function(_)))
    }

    /// Build a Lua sequence table from Rust values (e.g. a `sendAll` list).
    pub fn create_sequence<T: IntoLua>(
        &self,
        items: impl IntoIterator<Item = T>,
    ) -> LuaResult<LuaTable> {
        self.lua.create_sequence_from(items)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
