//! Swapchain utils.
//!
//! Configuration is split from creation: [`SwapchainOptions::select`] turns a
//! [`CapabilitySet`] into a [`SelectedConfiguration`], which
//! [`Swapchain::new`] then consumes.
use crate::{CapabilitySet, DeviceMetadata};
use ash::{vk, Device, Instance};
use thiserror::Error;

/// The surface reported something the Vulkan specification rules out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// `VK_PRESENT_MODE_FIFO_KHR` is required to be supported.
    #[error("invariant violation: FIFO present mode not supported ({0:?})")]
    FifoUnsupported(Vec<vk::PresentModeKHR>),
    /// At least one surface format is required to be supported.
    #[error("invariant violation: no surface formats")]
    NoSurfaceFormats,
    /// At least one composite alpha mode is required to be supported.
    #[error("invariant violation: no composite alpha modes")]
    NoCompositeAlpha,
}

/// Errors that can occur during swapchain creation.
#[derive(Debug, Error)]
pub enum SwapchainCreationError {
    /// The device rejected the configuration, e.g. because the surface or
    /// the device was lost.
    #[error("swapchain creation failed: {0}")]
    VulkanError(#[from] vk::Result),
    /// The device was created without a surface.
    #[error("device was not created for a surface")]
    NoSurface,
}

/// [`Swapchain`] configuration policy
#[derive(Debug, Clone)]
pub struct SwapchainOptions {
    desired_image_count: u32,
    preferred_format: vk::SurfaceFormatKHR,
    preferred_present_mode: vk::PresentModeKHR,
    usage: vk::ImageUsageFlags,
    composite_alpha: vk::CompositeAlphaFlagsKHR,
}

impl SwapchainOptions {
    /// Uses the default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of images to ask for, within what the surface allows. Defaults to 3.
    pub fn desired_image_count(&mut self, count: u32) -> &mut Self {
        self.desired_image_count = count;
        self
    }

    /// Format to pick if the surface supports it. Otherwise the first
    /// supported format is used. Defaults to 8-bit sRGB BGRA.
    pub fn preferred_format(&mut self, format: vk::SurfaceFormatKHR) -> &mut Self {
        self.preferred_format = format;
        self
    }

    /// Present mode to pick if the surface supports it. Otherwise
    /// [`vk::PresentModeKHR::FIFO`] is used. Defaults to
    /// [`vk::PresentModeKHR::MAILBOX`].
    pub fn preferred_present_mode(&mut self, mode: vk::PresentModeKHR) -> &mut Self {
        self.preferred_present_mode = mode;
        self
    }

    /// Required swapchain image usage flags. Defaults to [`vk::ImageUsageFlags::COLOR_ATTACHMENT`].
    pub fn usage(&mut self, usage: vk::ImageUsageFlags) -> &mut Self {
        self.usage = usage;
        self
    }

    /// Preferred composite alpha. Defaults to [`vk::CompositeAlphaFlagsKHR::OPAQUE`].
    pub fn composite_alpha(&mut self, value: vk::CompositeAlphaFlagsKHR) -> &mut Self {
        self.composite_alpha = value;
        self
    }

    /// Never below the surface minimum, never above a nonzero surface maximum.
    pub fn choose_image_count(&self, capabilities: &CapabilitySet) -> u32 {
        let count = self
            .desired_image_count
            .max(capabilities.min_image_count());
        match capabilities.max_image_count() {
            0 => count,
            max => count.min(max),
        }
    }

    /// Surface extent if the surface knows it, otherwise the window's
    /// drawable size clamped into the supported range.
    pub fn choose_extent(
        &self,
        capabilities: &CapabilitySet,
        drawable_size: vk::Extent2D,
    ) -> vk::Extent2D {
        if !capabilities.follows_window() {
            return capabilities.current_extent();
        }

        let min = capabilities.min_image_extent();
        let max = capabilities.max_image_extent();
        vk::Extent2D {
            width: drawable_size.width.max(min.width).min(max.width),
            height: drawable_size.height.max(min.height).min(max.height),
        }
    }

    /// The preferred format wherever it is listed, otherwise the first one.
    pub fn choose_surface_format(
        &self,
        capabilities: &CapabilitySet,
    ) -> Result<vk::SurfaceFormatKHR, ConfigurationError> {
        let formats = capabilities.formats();
        formats
            .iter()
            .find(|&&format| format == self.preferred_format)
            .or_else(|| formats.first())
            .copied()
            .ok_or(ConfigurationError::NoSurfaceFormats)
    }

    /// The preferred present mode if supported, otherwise FIFO.
    pub fn choose_present_mode(
        &self,
        capabilities: &CapabilitySet,
    ) -> Result<vk::PresentModeKHR, ConfigurationError> {
        let modes = capabilities.present_modes();
        if !modes.contains(&vk::PresentModeKHR::FIFO) {
            return Err(ConfigurationError::FifoUnsupported(modes.to_vec()));
        }

        if modes.contains(&self.preferred_present_mode) {
            Ok(self.preferred_present_mode)
        } else {
            Ok(vk::PresentModeKHR::FIFO)
        }
    }

    /// The preferred composite alpha if supported, otherwise the lowest
    /// supported bit.
    pub fn choose_composite_alpha(
        &self,
        capabilities: &CapabilitySet,
    ) -> Result<vk::CompositeAlphaFlagsKHR, ConfigurationError> {
        let supported = capabilities.supported_composite_alpha();
        if supported.contains(self.composite_alpha) && !self.composite_alpha.is_empty() {
            return Ok(self.composite_alpha);
        }

        let raw = supported.as_raw();
        if raw == 0 {
            return Err(ConfigurationError::NoCompositeAlpha);
        }
        Ok(vk::CompositeAlphaFlagsKHR::from_raw(raw & raw.wrapping_neg()))
    }

    /// Picks a full configuration out of `capabilities`.
    pub fn select(
        &self,
        capabilities: &CapabilitySet,
        drawable_size: vk::Extent2D,
    ) -> Result<SelectedConfiguration, ConfigurationError> {
        Ok(SelectedConfiguration {
            image_count: self.choose_image_count(capabilities),
            extent: self.choose_extent(capabilities, drawable_size),
            surface_format: self.choose_surface_format(capabilities)?,
            present_mode: self.choose_present_mode(capabilities)?,
            pre_transform: capabilities.current_transform(),
            composite_alpha: self.choose_composite_alpha(capabilities)?,
            usage: self.usage,
        })
    }
}

impl Default for SwapchainOptions {
    fn default() -> Self {
        Self {
            desired_image_count: 3,
            preferred_format: vk::SurfaceFormatKHR {
                format: vk::Format::B8G8R8A8_SRGB,
                color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
            },
            preferred_present_mode: vk::PresentModeKHR::MAILBOX,
            usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
        }
    }
}

/// Concrete values for one swapchain, chosen by [`SwapchainOptions::select`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedConfiguration {
    /// Minimum number of images to request.
    pub image_count: u32,
    /// Size of the images.
    pub extent: vk::Extent2D,
    /// Format and color space of the images.
    pub surface_format: vk::SurfaceFormatKHR,
    /// How images are queued for display.
    pub present_mode: vk::PresentModeKHR,
    /// Transform applied on presentation.
    pub pre_transform: vk::SurfaceTransformFlagsKHR,
    /// How the images are composited with other surfaces.
    pub composite_alpha: vk::CompositeAlphaFlagsKHR,
    /// Image usage.
    pub usage: vk::ImageUsageFlags,
}

/// A swapchain and its images.
pub struct Swapchain {
    loader: ash::extensions::khr::Swapchain,
    handle: vk::SwapchainKHR,
    images: Vec<vk::Image>,
    configuration: SelectedConfiguration,
}

impl Swapchain {
    /// Creates a swapchain for the surface `device` was created for, owned
    /// exclusively by its queue family.
    ///
    /// # Safety
    ///
    /// `device` must have been created from `instance`, and `device_metadata`
    /// must belong to `device`.
    pub unsafe fn new(
        instance: &Instance,
        device: &Device,
        device_metadata: &DeviceMetadata,
        configuration: SelectedConfiguration,
    ) -> Result<Self, SwapchainCreationError> {
        let surface = device_metadata
            .surface()
            .ok_or(SwapchainCreationError::NoSurface)?;
        let loader = ash::extensions::khr::Swapchain::new(instance, device);

        let queue_family_indices = [device_metadata.queue_family_index()];
        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(surface)
            .min_image_count(configuration.image_count)
            .image_format(configuration.surface_format.format)
            .image_color_space(configuration.surface_format.color_space)
            .image_extent(configuration.extent)
            .image_array_layers(1)
            .image_usage(configuration.usage)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .queue_family_indices(&queue_family_indices)
            .pre_transform(configuration.pre_transform)
            .composite_alpha(configuration.composite_alpha)
            .present_mode(configuration.present_mode)
            .clipped(true)
            .old_swapchain(vk::SwapchainKHR::null());

        let handle = loader.create_swapchain(&create_info, None)?;
        let images = match loader.get_swapchain_images(handle) {
            Ok(images) => images,
            Err(err) => {
                loader.destroy_swapchain(handle, None);
                return Err(err.into());
            }
        };

        log::info!(
            "swapchain created: {:?} {:?}, {}x{}, {} images (requested {})",
            configuration.surface_format.format,
            configuration.present_mode,
            configuration.extent.width,
            configuration.extent.height,
            images.len(),
            configuration.image_count
        );

        Ok(Swapchain {
            loader,
            handle,
            images,
            configuration,
        })
    }

    /// The swapchain handle.
    #[inline]
    pub fn handle(&self) -> vk::SwapchainKHR {
        self.handle
    }

    /// Loader for the swapchain functions.
    #[inline]
    pub fn loader(&self) -> &ash::extensions::khr::Swapchain {
        &self.loader
    }

    /// The swapchain images. They are owned by the swapchain and go away with it.
    #[inline]
    pub fn images(&self) -> &[vk::Image] {
        &self.images
    }

    /// The configuration the swapchain was created with.
    #[inline]
    pub fn configuration(&self) -> &SelectedConfiguration {
        &self.configuration
    }

    /// Format of images in [`images`](Self::images), and the color space that will be used to
    /// present them
    #[inline]
    pub fn format(&self) -> vk::SurfaceFormatKHR {
        self.configuration.surface_format
    }

    /// Dimensions of images in [`images`](Self::images)
    #[inline]
    pub fn extent(&self) -> vk::Extent2D {
        self.configuration.extent
    }

    /// Destroys the swapchain together with its images.
    ///
    /// ```rust,compile_fail
    /// # unsafe fn destroy_twice(swapchain: swapchain_bootstrap::Swapchain) {
    /// swapchain.destroy();
    /// swapchain.destroy();
    /// # }
    /// ```
    pub unsafe fn destroy(self) {
        self.loader.destroy_swapchain(self.handle, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BGRA_SRGB: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_SRGB,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    const RGBA_SRGB: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        format: vk::Format::R8G8B8A8_SRGB,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };
    const BGRA_UNORM: vk::SurfaceFormatKHR = vk::SurfaceFormatKHR {
        format: vk::Format::B8G8R8A8_UNORM,
        color_space: vk::ColorSpaceKHR::SRGB_NONLINEAR,
    };

    fn extent(width: u32, height: u32) -> vk::Extent2D {
        vk::Extent2D { width, height }
    }

    fn capabilities(min: u32, max: u32) -> vk::SurfaceCapabilitiesKHR {
        vk::SurfaceCapabilitiesKHR {
            min_image_count: min,
            max_image_count: max,
            current_extent: extent(u32::MAX, u32::MAX),
            min_image_extent: extent(1, 1),
            max_image_extent: extent(4096, 4096),
            current_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
            supported_transforms: vk::SurfaceTransformFlagsKHR::IDENTITY,
            supported_composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
            ..Default::default()
        }
    }

    fn caps(
        capabilities: vk::SurfaceCapabilitiesKHR,
        formats: &[vk::SurfaceFormatKHR],
        present_modes: &[vk::PresentModeKHR],
    ) -> CapabilitySet {
        CapabilitySet::new(capabilities, formats.to_vec(), present_modes.to_vec())
    }

    fn image_count(min: u32, max: u32) -> u32 {
        SwapchainOptions::default()
            .choose_image_count(&caps(capabilities(min, max), &[], &[]))
    }

    #[test]
    fn unbounded_image_count() {
        for min in 0..=3 {
            assert_eq!(image_count(min, 0), 3);
        }
        assert_eq!(image_count(5, 0), 5);
    }

    #[test]
    fn bounded_image_count() {
        for max in 1..=8 {
            for min in 0..=max.min(3) {
                let count = image_count(min, max);
                assert_eq!(count, 3.min(max));
                assert!(count <= max);
            }
        }
        assert_eq!(image_count(4, 6), 4);
        assert_eq!(image_count(6, 6), 6);
    }

    #[test]
    fn defined_extent_is_used_verbatim() {
        let mut raw = capabilities(2, 0);
        raw.current_extent = extent(800, 600);
        raw.max_image_extent = extent(640, 480);
        let chosen =
            SwapchainOptions::default().choose_extent(&caps(raw, &[], &[]), extent(1920, 1080));
        assert_eq!(chosen, extent(800, 600));
    }

    #[test]
    fn window_extent_is_clamped_per_axis() {
        let mut raw = capabilities(2, 0);
        raw.min_image_extent = extent(100, 100);
        raw.max_image_extent = extent(1000, 1000);
        let caps = caps(raw, &[], &[]);
        let options = SwapchainOptions::default();

        assert_eq!(options.choose_extent(&caps, extent(640, 480)), extent(640, 480));
        assert_eq!(options.choose_extent(&caps, extent(50, 2000)), extent(100, 1000));
        assert_eq!(options.choose_extent(&caps, extent(4000, 10)), extent(1000, 100));
        assert_eq!(options.choose_extent(&caps, extent(0, 0)), extent(100, 100));
    }

    #[test]
    fn preferred_format_at_any_position() {
        let options = SwapchainOptions::default();
        for formats in [
            [BGRA_SRGB, RGBA_SRGB, BGRA_UNORM],
            [RGBA_SRGB, BGRA_SRGB, BGRA_UNORM],
            [RGBA_SRGB, BGRA_UNORM, BGRA_SRGB],
        ] {
            let caps = caps(capabilities(2, 0), &formats, &[vk::PresentModeKHR::FIFO]);
            assert_eq!(options.choose_surface_format(&caps), Ok(BGRA_SRGB));
        }
    }

    #[test]
    fn first_format_without_preferred() {
        let options = SwapchainOptions::default();
        let linear_bgra = vk::SurfaceFormatKHR {
            format: vk::Format::B8G8R8A8_SRGB,
            color_space: vk::ColorSpaceKHR::EXTENDED_SRGB_LINEAR_EXT,
        };
        let caps = caps(
            capabilities(2, 0),
            &[BGRA_UNORM, linear_bgra, RGBA_SRGB],
            &[vk::PresentModeKHR::FIFO],
        );
        assert_eq!(options.choose_surface_format(&caps), Ok(BGRA_UNORM));

        let empty = super::CapabilitySet::new(capabilities(2, 0), vec![], vec![]);
        assert_eq!(
            options.choose_surface_format(&empty),
            Err(ConfigurationError::NoSurfaceFormats)
        );
    }

    #[test]
    fn present_mode_preference() {
        let options = SwapchainOptions::default();
        let with_mailbox = caps(
            capabilities(2, 0),
            &[BGRA_SRGB],
            &[
                vk::PresentModeKHR::FIFO,
                vk::PresentModeKHR::IMMEDIATE,
                vk::PresentModeKHR::MAILBOX,
            ],
        );
        assert_eq!(
            options.choose_present_mode(&with_mailbox),
            Ok(vk::PresentModeKHR::MAILBOX)
        );

        let without_mailbox = caps(
            capabilities(2, 0),
            &[BGRA_SRGB],
            &[vk::PresentModeKHR::IMMEDIATE, vk::PresentModeKHR::FIFO],
        );
        assert_eq!(
            options.choose_present_mode(&without_mailbox),
            Ok(vk::PresentModeKHR::FIFO)
        );
    }

    #[test]
    fn missing_fifo_is_an_invariant_violation() {
        let options = SwapchainOptions::default();
        let caps = caps(
            capabilities(2, 0),
            &[BGRA_SRGB],
            &[vk::PresentModeKHR::MAILBOX, vk::PresentModeKHR::IMMEDIATE],
        );
        assert!(matches!(
            options.choose_present_mode(&caps),
            Err(ConfigurationError::FifoUnsupported(_))
        ));
        assert!(options.select(&caps, extent(640, 480)).is_err());
    }

    #[test]
    fn composite_alpha_falls_back_to_lowest_supported() {
        let options = SwapchainOptions::default();
        let mut raw = capabilities(2, 0);
        raw.supported_composite_alpha =
            vk::CompositeAlphaFlagsKHR::INHERIT | vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED;
        assert_eq!(
            options.choose_composite_alpha(&caps(raw, &[], &[])),
            Ok(vk::CompositeAlphaFlagsKHR::POST_MULTIPLIED)
        );

        raw.supported_composite_alpha = vk::CompositeAlphaFlagsKHR::empty();
        assert_eq!(
            options.choose_composite_alpha(&caps(raw, &[], &[])),
            Err(ConfigurationError::NoCompositeAlpha)
        );
    }

    #[test]
    fn end_to_end_selection() {
        let caps = caps(
            capabilities(2, 0),
            &[RGBA_SRGB],
            &[vk::PresentModeKHR::FIFO],
        );
        let selected = SwapchainOptions::default()
            .select(&caps, extent(1200, 1000))
            .unwrap();

        assert_eq!(
            selected,
            SelectedConfiguration {
                image_count: 3,
                extent: extent(1200, 1000),
                surface_format: RGBA_SRGB,
                present_mode: vk::PresentModeKHR::FIFO,
                pre_transform: vk::SurfaceTransformFlagsKHR::IDENTITY,
                composite_alpha: vk::CompositeAlphaFlagsKHR::OPAQUE,
                usage: vk::ImageUsageFlags::COLOR_ATTACHMENT,
            }
        );
    }

    #[test]
    fn selection_stays_within_bounds() {
        let options = SwapchainOptions::default();
        for (min, max) in [(1, 2), (2, 3), (3, 8), (4, 4), (2, 0)] {
            for drawable in [extent(0, 0), extent(10, 5000), extent(9000, 9000)] {
                let caps = caps(capabilities(min, max), &[BGRA_UNORM], &[vk::PresentModeKHR::FIFO]);
                let selected = options.select(&caps, drawable).unwrap();

                assert!(selected.image_count >= min);
                assert!(max == 0 || selected.image_count <= max);
                assert!((1..=4096).contains(&selected.extent.width));
                assert!((1..=4096).contains(&selected.extent.height));
                assert!(caps.formats().contains(&selected.surface_format));
                assert!(caps.present_modes().contains(&selected.present_mode));
            }
        }
    }
}
