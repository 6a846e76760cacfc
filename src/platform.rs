//! The window collaborator.
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};

/// A native window a surface can be created for.
pub trait PlatformWindow: HasRawDisplayHandle + HasRawWindowHandle {
    /// Size of the drawable area in pixels, `(width, height)`.
    fn drawable_size(&self) -> (u32, u32);
}

#[cfg(feature = "window")]
impl PlatformWindow for winit::window::Window {
    fn drawable_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}
