//! Plugin discovery and command dispatch for the `ag` entry point.

pub mod builtin;
pub mod config;
pub mod descriptor;
pub mod dispatcher;
pub mod env_check;
pub mod error;
pub mod exec;
pub mod handler;
pub mod io;
pub mod loader;
pub mod paths;
pub mod registry;
pub mod source;

pub use builtin::BuiltinTable;
pub use descriptor::{LoaderReference, PluginDescriptor};
pub use dispatcher::{exit_code, Dispatcher};
pub use error::{AgError, Result};
pub use handler::{CommandHandler, Context};
pub use loader::{Load, Loader};
pub use registry::{Discover, PluginSet, Registry};
