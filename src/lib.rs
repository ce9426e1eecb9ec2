//! Scaffold SDK: resolves a declarative description of an application's data layer and
//! HTTP surface into a validated, read-only intermediate representation.

pub mod case;
pub mod config;
pub mod error;
pub mod ir;
pub mod resolve;

pub use config::{load, load_from_dir, validate, Scaffold, ScaffoldDocument};
pub use error::{ConfigError, ErrorKind, ScaffoldError};
pub use resolve::{resolve, ResolutionContext, Stage, STAGES};
