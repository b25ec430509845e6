//! Mudlexus: run Mudlet Lua scripts on a Nexus-style MUD host.
//!
//! The crate embeds a Lua 5.4 runtime, bridges it to a [`host::Host`], and
//! loads a Lua translation layer that re-expresses Mudlet's scripting API in
//! terms of the host's primitives.
//!
//! ```no_run
//! use std::rc::Rc;
//! use mudlexus::bootstrap::{Bootstrap, EmbeddedLoader, ShimContext};
//! use mudlexus::host::ConsoleHost;
//! use mudlexus::reflex::ReflexStore;
//! use mudlexus::var::VarStore;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let host = Rc::new(ConsoleHost::new(std::io::stdout(), VarStore::new(), ReflexStore::new()));
//! let mut ctx = ShimContext::new(host);
//! Bootstrap::new(EmbeddedLoader).run(&mut ctx).await?;
//! ctx.exec("sendAll('stand', 'look', true)")?;
//! # Ok(())
//! # }
//! ```

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod host;
pub mod lua;
pub mod package;
pub mod reflex;
pub mod shim;
pub mod var;
