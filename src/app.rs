//! The bootstrapped application context.
use crate::{
    create_surface, probe, ConfigurationError, DebugMessenger, DeviceBuilder,
    DeviceCreationError, DeviceMetadata, DeviceQueryError, InstanceBuilder,
    InstanceCreationError, InstanceMetadata, PlatformWindow, ReleaseStack, SelectedConfiguration,
    SurfaceCreationError, Swapchain, SwapchainCreationError, SwapchainOptions, ValidationLayers,
};
use ash::extensions::khr::Surface;
use ash::{vk, Device, Entry, Instance, LoadingError};
use std::ffi::NulError;
use thiserror::Error;

/// Settings resolved once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Application name advertised to the driver.
    pub app_name: String,
    /// Register a debug messenger forwarding driver warnings and errors to
    /// the log.
    pub enable_diagnostics: bool,
    /// Validation layer policy, only applied with diagnostics enabled.
    pub validation: ValidationLayers,
    /// Swapchain configuration policy.
    pub swapchain: SwapchainOptions,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            app_name: "vulkan".to_owned(),
            enable_diagnostics: cfg!(debug_assertions),
            validation: ValidationLayers::Request,
            swapchain: SwapchainOptions::default(),
        }
    }
}

/// Everything that can abort [`Application::new`].
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The Vulkan library couldn't be loaded.
    #[error("failed to load vulkan: {0}")]
    PlatformInit(#[from] LoadingError),
    /// A name contained an interior nul byte.
    #[error("invalid name: {0}")]
    InvalidName(#[from] NulError),
    /// Instance creation failed, e.g. because a required layer or extension is missing.
    #[error("instance creation failed: {0}")]
    Instance(#[from] InstanceCreationError),
    /// The platform rejected the surface.
    #[error(transparent)]
    Surface(#[from] SurfaceCreationError),
    /// No usable device or queue.
    #[error("device creation failed: {0}")]
    Device(DeviceCreationError),
    /// The device couldn't be queried for presentation support.
    #[error("surface query failed: {0}")]
    DeviceQuery(#[from] DeviceQueryError),
    /// The surface capabilities break an API guarantee.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The swapchain couldn't be created.
    #[error(transparent)]
    Swapchain(#[from] SwapchainCreationError),
}

impl From<DeviceCreationError> for BootstrapError {
    fn from(err: DeviceCreationError) -> Self {
        match err {
            DeviceCreationError::Query(err) => BootstrapError::DeviceQuery(err),
            err => BootstrapError::Device(err),
        }
    }
}

const INSTANCE: &str = "instance";
const DEBUG_MESSENGER: &str = "debug messenger";
const SURFACE: &str = "surface";
const DEVICE: &str = "device";
const SWAPCHAIN: &str = "swapchain";

/// Release steps in the order [`Application::new`] registers them. They run
/// back to front.
pub(crate) const SETUP_ORDER: [&str; 5] = [INSTANCE, DEBUG_MESSENGER, SURFACE, DEVICE, SWAPCHAIN];

/// A window's Vulkan instance, device, queue and swapchain.
///
/// Created in one go by [`Application::new`]. Everything is released in
/// reverse order of creation when the application is dropped, or as soon as
/// a setup step fails.
pub struct Application {
    releases: ReleaseStack,
    swapchain: Swapchain,
    queue: vk::Queue,
    device_metadata: DeviceMetadata,
    device: Device,
    surface: vk::SurfaceKHR,
    surface_loader: Surface,
    diagnostics_active: bool,
    instance_metadata: InstanceMetadata,
    instance: Instance,
    entry: Entry,
}

impl Application {
    /// Runs the setup sequence for `window`: instance, diagnostics, surface,
    /// device and queue, then swapchain.
    pub fn new(config: &AppConfig, window: &impl PlatformWindow) -> Result<Self, BootstrapError> {
        let entry = unsafe { Entry::load() }?;
        let mut releases = ReleaseStack::new();

        let validation = if config.enable_diagnostics {
            config.validation
        } else {
            ValidationLayers::Disable
        };
        let (instance, diagnostics, instance_metadata) = unsafe {
            InstanceBuilder::new()
                .app_name(&config.app_name)?
                .app_version(0, 1)
                .engine_name("No Engine")?
                .require_api_version(1, 3)
                .validation_layers(validation)
                .request_debug_messenger(DebugMessenger::from_flag(config.enable_diagnostics))
                .require_surface_extensions(window)?
                .build(&entry)
        }?;
        let instance_handle = instance.clone();
        releases.push(INSTANCE, move || unsafe {
            instance_handle.destroy_instance(None)
        });
        let diagnostics_active = diagnostics.is_active();
        releases.push(DEBUG_MESSENGER, move || unsafe { diagnostics.destroy() });
        log::info!("instance created: {:?}", instance_metadata);

        let surface_loader = Surface::new(&entry, &instance);
        let surface = unsafe { create_surface(&entry, &instance, window) }?;
        let surface_release = surface_loader.clone();
        releases.push(SURFACE, move || unsafe {
            surface_release.destroy_surface(surface, None)
        });

        let (device, device_metadata) = unsafe {
            DeviceBuilder::new()
                .require_version(1, 3)
                .require_extension(ash::extensions::khr::Swapchain::name())
                .require_dynamic_rendering()
                .require_extended_dynamic_state()
                .for_surface(surface)
                .build(&instance, &surface_loader, &instance_metadata)
        }?;
        let device_release = device.clone();
        releases.push(DEVICE, move || unsafe { device_release.destroy_device(None) });
        let queue = unsafe { device_metadata.device_queue(&device, 0) };

        let capabilities =
            unsafe { probe(&surface_loader, device_metadata.physical_device(), surface) }?;
        let (width, height) = window.drawable_size();
        let configuration = config
            .swapchain
            .select(&capabilities, vk::Extent2D { width, height })?;
        log::debug!("selected {:?}", configuration);

        let swapchain = unsafe { Swapchain::new(&instance, &device, &device_metadata, configuration) }?;
        let swapchain_loader = swapchain.loader().clone();
        let swapchain_handle = swapchain.handle();
        releases.push(SWAPCHAIN, move || unsafe {
            swapchain_loader.destroy_swapchain(swapchain_handle, None)
        });
        debug_assert!(releases.names().eq(SETUP_ORDER));

        Ok(Application {
            releases,
            swapchain,
            queue,
            device_metadata,
            device,
            surface,
            surface_loader,
            diagnostics_active,
            instance_metadata,
            instance,
            entry,
        })
    }

    /// The loaded Vulkan entry points.
    #[inline]
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// The instance.
    #[inline]
    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    /// What is enabled on the instance.
    #[inline]
    pub fn instance_metadata(&self) -> &InstanceMetadata {
        &self.instance_metadata
    }

    /// Returns true if driver diagnostics are forwarded to the log.
    #[inline]
    pub fn diagnostics_active(&self) -> bool {
        self.diagnostics_active
    }

    /// The window surface.
    #[inline]
    pub fn surface(&self) -> vk::SurfaceKHR {
        self.surface
    }

    /// Loader for the surface functions.
    #[inline]
    pub fn surface_loader(&self) -> &Surface {
        &self.surface_loader
    }

    /// The logical device.
    #[inline]
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// The chosen physical device and queue family.
    #[inline]
    pub fn device_metadata(&self) -> &DeviceMetadata {
        &self.device_metadata
    }

    /// The graphics and present queue.
    #[inline]
    pub fn queue(&self) -> vk::Queue {
        self.queue
    }

    /// The swapchain.
    #[inline]
    pub fn swapchain(&self) -> &Swapchain {
        &self.swapchain
    }

    /// The configuration the swapchain was built with.
    #[inline]
    pub fn configuration(&self) -> &SelectedConfiguration {
        self.swapchain.configuration()
    }
}

impl Drop for Application {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();
        }
        self.releases.release_all();
    }
}
