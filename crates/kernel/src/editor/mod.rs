//! Rich-text editor support.
//!
//! The editor's document model lives in the browser. The server owns its
//! configuration, the toolbar bindings, and a pure model of what each
//! toolbar command does to the formatting state.

mod command;
mod config;
mod toolbar;

pub use command::{ActiveQuery, Block, Command, EditorError, EditorState, Mark, apply};
pub use config::{EditorConfig, LinkConfig, ListConfig};
pub use toolbar::{ButtonInput, ToolbarButton, toolbar};
