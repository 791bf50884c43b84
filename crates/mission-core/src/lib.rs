pub mod backlog;
pub mod checkpoint;
pub mod config;
pub mod diagnosis;
pub mod document;
pub mod error;
pub mod io;
pub mod mission;
pub mod paths;
pub mod section;
pub mod validation;
pub mod vcs;

pub use error::{ErrorKind, MissionError, Result};
