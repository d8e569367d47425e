//! Config-target registry and checksum-gated rendering
//!
//! Maps target config files to the context generators that feed them and
//! the services that must restart when a file's content actually changes.
//! The registry is a plain value: a config-changed pass constructs a fresh
//! one rather than mutating anything global.
//!
//! Rendering here is deliberately minimal — the resolved context is written
//! as canonical JSON for an external templating step to consume; no
//! templating syntax is defined. What this crate does own is the change
//! decision: a target is only rewritten (and its services only restarted)
//! when the rendered content's checksum differs from what is on disk.

pub mod error;
pub mod registry;

pub use error::{Error, Result};
pub use registry::{ConfigTarget, ContextGenerator, Registry, StaticContext, WriteOutcome};
