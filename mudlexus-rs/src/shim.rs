//! The Mudlet translation layer.
//!
//! The layer itself is Lua (`lua/mudlet_shim.lua`), baked into the binary
//! with `include_str!()` so that [`EmbeddedLoader`](crate::bootstrap::EmbeddedLoader)
//! can serve it without any network or disk access.
//!
//! | Mudlet function                     | Host call                                                      |
//! |-------------------------------------|----------------------------------------------------------------|
//! | `send(cmd, showOnScreen)`           | `send_command(cmd, true)`                                      |
//! | `sendAll(cmds [, echoBack])`        | `send_command(cmd, true)` for each command, in order           |
//! | `expandAlias(cmd, echoBack)`        | `send_command(cmd, false)`                                     |
//! | `echo([window,] text)`              | `display_notice(text)`                                         |
//! | `enableAlias(name)`                 | `reflex_enable(reflex_find_by_name('alias', name, false, false))` |
//! | `disableAlias(name)`                | `reflex_disable(reflex_find_by_name('alias', name, false, true))` |
//! | `enableKey` / `disableKey`          | as above with `'keybind'`                                      |
//! | `enableTrigger` / `disableTrigger`  | as above with `'trigger'`                                      |

use mlua::Result as LuaResult;

use crate::lua::LuaRuntime;

/// Lua source of the translation layer.
pub const SHIM_SOURCE: &str = include_str!("../lua/mudlet_shim.lua");

/// Asset name under which the layer is published.
pub const ASSET_NAME: &str = "mudlet_shim.lua";

/// Version of the bundled [`SHIM_SOURCE`].
pub const SHIM_VERSION: &str = "1.0";

/// Globals the layer defines for end-user scripts.
pub const PUBLIC_SURFACE: &[&str] = &[
    "send",
    "sendAll",
    "expandAlias",
    "echo",
    "enableAlias",
    "disableAlias",
    "enableKey",
    "disableKey",
    "enableTrigger",
    "disableTrigger",
];

/// Load the bundled layer into `runtime`.
pub fn install(runtime: &LuaRuntime) -> LuaResult<()> {
    runtime.exec_named(SHIM_SOURCE, ASSET_NAME)
}

/// Public-surface functions that `runtime` does not define.
pub fn missing_functions(runtime: &LuaRuntime) -> Vec<&'static str> {
    PUBLIC_SURFACE
        .iter()
        .copied()
        .filter(|name| !runtime.has_function(name))
        .collect()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
