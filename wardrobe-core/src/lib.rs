//! # wardrobe-core
//!
//! Runtime around the pure compiler in `wardrobe-types`: configuration,
//! SQLite persistence of slot stores, host collaborator traits and the
//! all-or-nothing compile pipeline.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use wardrobe_core::config::Config;
//! use wardrobe_core::host::MemoryHost;
//! use wardrobe_core::session::Wardrobe;
//! use wardrobe_types::AvatarId;
//!
//! // 1. Open (or create) the avatar's store
//! let mut wardrobe = Wardrobe::open(&db_path, AvatarId::new(guid), Config::load())?;
//!
//! // 2. Capture the current visibility of the discovered outfit parts
//! wardrobe.capture_candidates(0, &scene)?;
//!
//! // 3. Compile and hand layer, selector and menu to the host
//! let mut host = MemoryHost::new();
//! let report = wardrobe.compile(&scene, &mut host)?;
//! for finding in &report.findings { println!("{}", finding); }
//! ```
//!
//! ## Module Overview
//!
//! - [`config`]: TOML configuration (embedded defaults + user override)
//! - [`persistence`]: slot store save/load (SQLite, one store per avatar), JSON documents
//! - [`host`]: `StateMachineHost` / `ParameterHost` traits and the in-memory `MemoryHost`
//! - [`pipeline`]: `compile_outfits()` and `apply_report()`
//! - [`session`]: the `Wardrobe` façade persisting at each completion point

pub mod config;
pub mod host;
pub mod persistence;
pub mod pipeline;
pub mod session;

pub use config::Config;
pub use host::{HostCall, HostError, HostOp, MemoryHost, ParameterHost, StateMachineHost};
pub use persistence::StoreError;
pub use pipeline::{apply_report, compile_outfits, CompileError, CompileReport};
pub use session::{Wardrobe, WardrobeError};
