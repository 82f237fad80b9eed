//! Core of a per-note toolbar: the settings schema and its migrations, and
//! the resolver that expands `{{...}}` variables and script expressions in
//! toolbar labels, links and script arguments.

pub mod adapters;
pub mod cli;
pub mod migrate;
pub mod resolver;
pub mod settings;
pub mod store;

pub use adapters::{AdapterError, AdapterRegistry, AdapterRequest, ErrorBehavior, ScriptAdapter};
pub use resolver::{MemoryContext, NoteContext, NoteFile, Resolver};
pub use settings::{ItemSettings, ItemType, ScriptKind, Settings, ToolbarSettings, SETTINGS_VERSION};
pub use store::{load_settings, save_settings, LoadedSettings, StoreError};
