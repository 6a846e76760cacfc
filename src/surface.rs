//! Surface creation and capability probing.
use ash::extensions::khr::Surface;
use ash::vk;
#[cfg(feature = "surface")]
use ash::{Entry, Instance};
#[cfg(feature = "surface")]
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use thiserror::Error;

/// Errors that can occur while querying a device for presentation support.
#[derive(Debug, Error)]
pub enum DeviceQueryError {
    /// Vulkan Error, e.g. the surface was lost.
    #[error("vulkan error: {0}")]
    VulkanError(#[from] vk::Result),
    /// The device reports no way of presenting to the surface.
    #[error("device cannot present to this surface (no {0})")]
    PresentationUnsupported(&'static str),
}

/// Errors that can occur during surface creation.
#[derive(Debug, Error)]
pub enum SurfaceCreationError {
    /// The platform rejected the surface.
    #[error("surface creation failed: {0}")]
    VulkanError(#[from] vk::Result),
}

/// Creates a presentation surface for `window`.
///
/// The instance must have been created with the extensions returned for the
/// window's display, see
/// [`InstanceBuilder::require_surface_extensions`](crate::InstanceBuilder::require_surface_extensions).
#[cfg(feature = "surface")]
pub unsafe fn create_surface(
    entry: &Entry,
    instance: &Instance,
    window: &(impl HasRawDisplayHandle + HasRawWindowHandle),
) -> Result<vk::SurfaceKHR, SurfaceCreationError> {
    Ok(ash_window::create_surface(
        entry,
        instance,
        window.raw_display_handle(),
        window.raw_window_handle(),
        None,
    )?)
}

/// What a physical device and surface pair supports for presentation.
///
/// A snapshot: query again with [`probe`] when the device or surface changes.
#[derive(Debug, Clone)]
pub struct CapabilitySet {
    capabilities: vk::SurfaceCapabilitiesKHR,
    formats: Vec<vk::SurfaceFormatKHR>,
    present_modes: Vec<vk::PresentModeKHR>,
}

impl CapabilitySet {
    /// Value of [`current_extent`](Self::current_extent)'s width when the
    /// surface size is determined by the swapchain extent.
    pub const FOLLOW_WINDOW: u32 = u32::MAX;

    /// Wraps already queried capabilities. Formats and present modes keep the
    /// order they were reported in.
    pub fn new(
        capabilities: vk::SurfaceCapabilitiesKHR,
        formats: Vec<vk::SurfaceFormatKHR>,
        present_modes: Vec<vk::PresentModeKHR>,
    ) -> Self {
        CapabilitySet {
            capabilities,
            formats,
            present_modes,
        }
    }

    /// The raw surface capabilities.
    #[inline]
    pub fn capabilities(&self) -> &vk::SurfaceCapabilitiesKHR {
        &self.capabilities
    }

    /// Minimum number of swapchain images.
    #[inline]
    pub fn min_image_count(&self) -> u32 {
        self.capabilities.min_image_count
    }

    /// Maximum number of swapchain images, `0` means unbounded.
    #[inline]
    pub fn max_image_count(&self) -> u32 {
        self.capabilities.max_image_count
    }

    /// Current surface size, or [`FOLLOW_WINDOW`](Self::FOLLOW_WINDOW) as
    /// width if the window decides.
    #[inline]
    pub fn current_extent(&self) -> vk::Extent2D {
        self.capabilities.current_extent
    }

    /// Smallest supported swapchain extent.
    #[inline]
    pub fn min_image_extent(&self) -> vk::Extent2D {
        self.capabilities.min_image_extent
    }

    /// Largest supported swapchain extent.
    #[inline]
    pub fn max_image_extent(&self) -> vk::Extent2D {
        self.capabilities.max_image_extent
    }

    /// Returns true if the extent has to be derived from the window.
    #[inline]
    pub fn follows_window(&self) -> bool {
        self.capabilities.current_extent.width == Self::FOLLOW_WINDOW
    }

    /// Transform currently applied by the presentation engine.
    #[inline]
    pub fn current_transform(&self) -> vk::SurfaceTransformFlagsKHR {
        self.capabilities.current_transform
    }

    /// Supported composite alpha modes.
    #[inline]
    pub fn supported_composite_alpha(&self) -> vk::CompositeAlphaFlagsKHR {
        self.capabilities.supported_composite_alpha
    }

    /// Supported formats, in the order the implementation reported them.
    #[inline]
    pub fn formats(&self) -> &[vk::SurfaceFormatKHR] {
        &self.formats
    }

    /// Supported present modes, in the order the implementation reported them.
    #[inline]
    pub fn present_modes(&self) -> &[vk::PresentModeKHR] {
        &self.present_modes
    }
}

/// Queries what `physical_device` supports when presenting to `surface`.
pub unsafe fn probe(
    surface_loader: &Surface,
    physical_device: vk::PhysicalDevice,
    surface: vk::SurfaceKHR,
) -> Result<CapabilitySet, DeviceQueryError> {
    let capabilities =
        surface_loader.get_physical_device_surface_capabilities(physical_device, surface)?;
    let formats = surface_loader.get_physical_device_surface_formats(physical_device, surface)?;
    let present_modes =
        surface_loader.get_physical_device_surface_present_modes(physical_device, surface)?;

    if formats.is_empty() {
        return Err(DeviceQueryError::PresentationUnsupported("surface formats"));
    }
    if present_modes.is_empty() {
        return Err(DeviceQueryError::PresentationUnsupported("present modes"));
    }

    log::debug!(
        "surface capabilities: {} formats, present modes {:?}, images {}..{}",
        formats.len(),
        present_modes,
        capabilities.min_image_count,
        capabilities.max_image_count
    );

    Ok(CapabilitySet::new(capabilities, formats, present_modes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_width_follows_window() {
        let caps = CapabilitySet::new(
            vk::SurfaceCapabilitiesKHR {
                current_extent: vk::Extent2D {
                    width: u32::MAX,
                    height: u32::MAX,
                },
                ..Default::default()
            },
            vec![],
            vec![],
        );
        assert!(caps.follows_window());

        let caps = CapabilitySet::new(
            vk::SurfaceCapabilitiesKHR {
                current_extent: vk::Extent2D {
                    width: 640,
                    height: 480,
                },
                ..Default::default()
            },
            vec![],
            vec![],
        );
        assert!(!caps.follows_window());
    }

    #[test]
    fn reported_order_is_kept() {
        let formats = vec![
            vk::SurfaceFormatKHR {
                format: vk::Format::R8G8B8A8_UNORM,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
        ];
        let caps = CapabilitySet::new(
            Default::default(),
            formats.clone(),
            vec![vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO],
        );
        assert_eq!(caps.formats(), formats.as_slice());
        assert_eq!(
            caps.present_modes(),
            &[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO]
        );
    }
}
