//! The live render seam.
//!
//! The preview surface (a webview on device) applies optimistic updates
//! before any file has changed on disk. Calls are fire-and-forget:
//! implementations enqueue to their bridge and return immediately, and
//! the persistence path never awaits or observes them.

pub trait LiveRender: Send + Sync {
    fn apply_style(&self, selector: &str, property: &str, value: &str);
    fn apply_text(&self, selector: &str, text: &str);
    fn apply_image_src(&self, selector: &str, src: &str);

    /// Reload the preview from disk, picking up persisted changes.
    fn reload(&self);
}

/// Renderless stand-in for headless use.
pub struct NoopRender;

impl LiveRender for NoopRender {
    fn apply_style(&self, _selector: &str, _property: &str, _value: &str) {}
    fn apply_text(&self, _selector: &str, _text: &str) {}
    fn apply_image_src(&self, _selector: &str, _src: &str) {}
    fn reload(&self) {}
}
