//! Toggles every video on a page between normal and double speed, and pauses or resumes them
//! all, from two keyboard shortcuts.
//!
//! Built for `wasm32` this is a content script: the `web` module registers the listeners on load.
//! Natively the same controller runs against an in-memory page, see the `speed-toggle` binary.

#[cfg(not(target_arch = "wasm32"))]
pub mod app;
pub mod config;
pub mod controller;
pub mod keys;
pub mod memory;
pub mod notification;
pub mod page;
pub mod playback;
#[cfg(target_arch = "wasm32")]
pub mod web;
