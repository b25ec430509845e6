//! Bootstrap: fetch the translation layer and wire it into a fresh runtime.
//!
//! ```text
//! ShimContext (no runtime)
//!   └─ Bootstrap::run
//!        1. runtime already present?  → AlreadyLoaded, nothing fetched
//!        2. resolve version            → host var `mudlexus_version`, else "1.0"
//!        3. fetch {base}@{version}/mudlet_shim.lua through the AssetLoader
//!        4. new LuaRuntime bridged to the host, execute the asset
//!        5. log the confirmation, run the smoke test, check the public surface
//!        6. install the runtime into the context
//! ```
//!
//! Any failure in 3–5 is logged with the asset URL and returned; the partly
//! built runtime is dropped and the context stays unloaded.  There is no
//! retry and no timeout: a fetch that never completes stalls the bootstrap.

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use mlua::prelude::*;
use mlua::{FromLuaMulti, IntoLuaMulti};
use thiserror::Error;
use tracing::{debug, error, info};

use crate::host::Host;
use crate::lua::LuaRuntime;
use crate::shim::{self, ASSET_NAME, SHIM_SOURCE, SHIM_VERSION};

/// Where published builds of the layer live.
pub const DEFAULT_BASE_URL: &str = "https://cdn.jsdelivr.net/gh/MegophrysNasuta/Mudlexus";

/// Version fetched when the host does not select one.
pub const DEFAULT_VERSION: &str = SHIM_VERSION;

/// Host variable holding the version selector.
pub const VERSION_VAR: &str = "mudlexus_version";

/// Run through the bridge once the layer is loaded.
pub const SMOKE_TEST: &str = r#"print("Lua is working!")"#;

// ── AssetUrl ──────────────────────────────────────────────────────────────────

/// A versioned asset location, displayed as `{base}@{version}/{asset}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetUrl {
    pub base: String,
    pub version: String,
    pub asset: String,
}

impl AssetUrl {
    pub fn new(base: impl Into<String>, version: impl Into<String>, asset: impl Into<String>) -> Self {
        Self { base: base.into(), version: version.into(), asset: asset.into() }
    }
}

impl fmt::Display for AssetUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}/{}", self.base, self.version, self.asset)
    }
}

// ── Loaders ───────────────────────────────────────────────────────────────────

/// Failure to obtain an asset's source.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("asset not found: {0}")]
    NotFound(String),

    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("HTTP fetch failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Fetches the source text of an asset.  One attempt per call.
#[allow(async_fn_in_trait)]
pub trait AssetLoader {
    async fn fetch(&self, url: &AssetUrl) -> Result<String, LoadError>;
}

/// Serves the layer compiled into this binary, for its own version only.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmbeddedLoader;

impl AssetLoader for EmbeddedLoader {
    async fn fetch(&self, url: &AssetUrl) -> Result<String, LoadError> {
        if url.version == SHIM_VERSION && url.asset == ASSET_NAME {
            Ok(SHIM_SOURCE.to_owned())
        } else {
            Err(LoadError::NotFound(url.to_string()))
        }
    }
}

/// Reads `{root}/{version}/{asset}`: a local mirror of the published layout.
///
/// Version and asset must each be a single plain path component, so a
/// request can never resolve outside `root`.
#[derive(Debug, Clone)]
pub struct DirLoader {
    root: PathBuf,
}

impl DirLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

fn is_plain_component(s: &str) -> bool {
    let mut components = Path::new(s).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

impl AssetLoader for DirLoader {
    async fn fetch(&self, url: &AssetUrl) -> Result<String, LoadError> {
        if !is_plain_component(&url.version) || !is_plain_component(&url.asset) {
            return Err(LoadError::NotFound(url.to_string()));
        }
        let path = self.root.join(&url.version).join(&url.asset);
        match tokio::fs::read_to_string(&path).await {
            Ok(source) => Ok(source),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(LoadError::NotFound(path.display().to_string()))
            }
            Err(source) => Err(LoadError::Io { path, source }),
        }
    }
}

/// Fetches the asset URL over HTTPS.
#[cfg(feature = "remote")]
#[derive(Debug, Clone, Default)]
pub struct HttpLoader {
    client: reqwest::Client,
}

#[cfg(feature = "remote")]
impl HttpLoader {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "remote")]
impl AssetLoader for HttpLoader {
    async fn fetch(&self, url: &AssetUrl) -> Result<String, LoadError> {
        let resp = self.client.get(url.to_string()).send().await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound(url.to_string()));
        }
        Ok(resp.error_for_status()?.text().await?)
    }
}

/// A loader chosen at runtime.
#[derive(Debug, Clone)]
pub enum AnyLoader {
    Embedded(EmbeddedLoader),
    Dir(DirLoader),
    #[cfg(feature = "remote")]
    Http(HttpLoader),
}

impl AssetLoader for AnyLoader {
    async fn fetch(&self, url: &AssetUrl) -> Result<String, LoadError> {
        match self {
            AnyLoader::Embedded(l) => l.fetch(url).await,
            AnyLoader::Dir(l) => l.fetch(url).await,
            #[cfg(feature = "remote")]
            AnyLoader::Http(l) => l.fetch(url).await,
        }
    }
}

// ── ShimContext ───────────────────────────────────────────────────────────────

/// Handle to one shared runtime and the host it is bridged to.
///
/// Starts unloaded; [`Bootstrap::run`] installs the runtime.  Independent
/// contexts are fully isolated from each other.
pub struct ShimContext {
    host: Rc<dyn Host>,
    runtime: Option<LuaRuntime>,
}

impl ShimContext {
    pub fn new(host: Rc<dyn Host>) -> Self {
        Self { host, runtime: None }
    }

    pub fn host(&self) -> &Rc<dyn Host> {
        &self.host
    }

    pub fn is_loaded(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn runtime(&self) -> Option<&LuaRuntime> {
        self.runtime.as_ref()
    }

    fn loaded(&self, what: &str) -> LuaResult<&LuaRuntime> {
        self.runtime.as_ref().ok_or_else(|| {
            LuaError::RuntimeError(format!("Mudlet shim is not loaded; '{what}' is undefined"))
        })
    }

    /// Execute a user chunk against the loaded layer.
    pub fn exec(&self, chunk: &str) -> LuaResult<()> {
        self.loaded("chunk")?.exec(chunk)
    }

    /// Run a user script file against the loaded layer.
    pub fn load_file(&self, path: &Path) -> LuaResult<()> {
        self.loaded("script")?.load_file(path)
    }

    /// Call a layer function by name.  Fails loudly when nothing is loaded.
    pub fn call_func<R: FromLuaMulti>(&self, name: &str, args: impl IntoLuaMulti) -> LuaResult<R> {
        self.loaded(name)?.call_func(name, args)
    }
}

// ── Bootstrap ─────────────────────────────────────────────────────────────────

/// Why a bootstrap failed.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("could not fetch {url}: {source}")]
    Fetch { url: AssetUrl, source: LoadError },

    #[error("could not create Lua runtime: {0}")]
    Runtime(#[source] LuaError),

    #[error("error executing {url}: {source}")]
    Exec { url: AssetUrl, source: LuaError },

    #[error("{url} did not define: {}", .missing.join(", "))]
    MissingSurface { url: AssetUrl, missing: Vec<&'static str> },

    #[error("smoke test failed: {0}")]
    SmokeTest(#[source] LuaError),
}

/// Result of a successful [`Bootstrap::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootOutcome {
    Loaded { version: String, url: AssetUrl },
    /// The context already had a runtime; nothing was fetched.
    AlreadyLoaded,
}

/// The startup sequence, parameterised over how assets are fetched.
pub struct Bootstrap<L> {
    loader: L,
    base_url: String,
    default_version: String,
}

impl<L: AssetLoader> Bootstrap<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            base_url: DEFAULT_BASE_URL.to_owned(),
            default_version: DEFAULT_VERSION.to_owned(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// The host's version selector, or the default when unset or empty.
    pub fn resolve_version(&self, host: &dyn Host) -> String {
        host.get_variable(VERSION_VAR)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.default_version.clone())
    }

    pub fn asset_url(&self, version: &str) -> AssetUrl {
        AssetUrl::new(self.base_url.as_str(), version, ASSET_NAME)
    }

    /// Load the layer into `ctx` unless it already has a runtime.
    pub async fn run(&self, ctx: &mut ShimContext) -> Result<BootOutcome, BootstrapError> {
        if ctx.is_loaded() {
            debug!("Mudlet Lua shim already loaded");
            return Ok(BootOutcome::AlreadyLoaded);
        }

        let version = self.resolve_version(&*ctx.host);
        let url = self.asset_url(&version);
        debug!(%url, "fetching Mudlet Lua shim");

        match self.load(Rc::clone(&ctx.host), &version, &url).await {
            Ok(runtime) => {
                ctx.runtime = Some(runtime);
                Ok(BootOutcome::Loaded { version, url })
            }
            Err(e) => {
                error!(%url, error = %e, "Could not load Mudlet Lua shim");
                Err(e)
            }
        }
    }

    async fn load(
        &self,
        host: Rc<dyn Host>,
        version: &str,
        url: &AssetUrl,
    ) -> Result<LuaRuntime, BootstrapError> {
        let source = self
            .loader
            .fetch(url)
            .await
            .map_err(|source| BootstrapError::Fetch { url: url.clone(), source })?;

        let runtime = LuaRuntime::new(host).map_err(BootstrapError::Runtime)?;
        runtime
            .exec_named(&source, &url.asset)
            .map_err(|source| BootstrapError::Exec { url: url.clone(), source })?;

        info!(%version, "Loaded Mudlet Lua shim {version}");
        runtime.exec(SMOKE_TEST).map_err(BootstrapError::SmokeTest)?;

        let missing = shim::missing_functions(&runtime);
        if !missing.is_empty() {
            return Err(BootstrapError::MissingSurface { url: url.clone(), missing });
        }
        Ok(runtime)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
