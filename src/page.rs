//! The slice of the host page the controller works against.
//!
//! The browser build implements these traits on top of `web-sys`; tests and the simulator use the
//! in-memory page from [`crate::memory`].

use crate::keys::FocusedElement;

/// A playable media element owned by the page.
pub trait Video {
    fn is_paused(&self) -> bool;

    fn play(&self) -> anyhow::Result<()>;

    fn pause(&self) -> anyhow::Result<()>;

    fn playback_rate(&self) -> f64;

    fn set_playback_rate(&self, rate: f64);
}

pub trait Document {
    type Video: Video;
    type ShadowRoot;

    /// Videos reachable by a plain query on the document tree, in document order.
    fn videos(&self) -> anyhow::Result<Vec<Self::Video>>;

    /// Shadow roots attached to any element of the document, in document order. Elements
    /// without an accessible root are left out.
    fn shadow_roots(&self) -> anyhow::Result<Vec<Self::ShadowRoot>>;

    fn shadow_videos(&self, root: &Self::ShadowRoot) -> anyhow::Result<Vec<Self::Video>>;

    fn focused_element(&self) -> Option<FocusedElement>;
}
