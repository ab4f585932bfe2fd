//! Response post-processing for the chat surface.

pub mod linkify;

pub use linkify::{keybinding_link, setting_link, IdentifierLookup, Linkifier, Rendered};
