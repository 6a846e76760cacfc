//! Instance creation utils.
use crate::{BootstrapSmallVec, DebugMessenger, DiagnosticSink};
use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry, Instance};
use cstr::cstr;
#[cfg(feature = "surface")]
use raw_window_handle::HasRawDisplayHandle;
use std::{
    ffi::{CStr, CString, NulError},
    fmt,
    os::raw::c_char,
};
use thiserror::Error;

/// Require, request or disable validation layers.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ValidationLayers {
    /// Instance creation will fail if there are no validation layers installed.
    Require,
    /// If there are validation layers installed, enable them.
    Request,
    /// Don't enable validation layers.
    Disable,
}

/// Metadata for after instance creation.
#[derive(Clone)]
pub struct InstanceMetadata {
    instance_handle: vk::Instance,
    api_version: u32,
    enabled_layers: BootstrapSmallVec<CString>,
    enabled_extensions: BootstrapSmallVec<CString>,
}

impl InstanceMetadata {
    /// The instance this metadata belongs to.
    #[inline]
    pub fn instance_handle(&self) -> vk::Instance {
        self.instance_handle
    }

    /// Retrieve the used instance API version.
    #[inline]
    pub fn api_version_raw(&self) -> u32 {
        self.api_version
    }

    /// Retrieve the used instance API major version.
    #[inline]
    pub fn api_version_major(&self) -> u32 {
        vk::api_version_major(self.api_version)
    }

    /// Retrieve the used instance API minor version.
    #[inline]
    pub fn api_version_minor(&self) -> u32 {
        vk::api_version_minor(self.api_version)
    }

    /// List of all enabled layers in the instance.
    #[inline]
    pub fn enabled_layers(&self) -> &[CString] {
        &self.enabled_layers
    }

    /// Returns true if `layer` is enabled.
    #[inline]
    pub fn is_layer_enabled(&self, layer: &CStr) -> bool {
        self.enabled_layers.iter().any(|e| e.as_c_str() == layer)
    }

    /// List of all enabled extensions in the instance.
    #[inline]
    pub fn enabled_extensions(&self) -> &[CString] {
        &self.enabled_extensions
    }

    /// Returns true if `extension` is enabled.
    #[inline]
    pub fn is_extension_enabled(&self, extension: &CStr) -> bool {
        self.enabled_extensions.iter().any(|i| i.as_c_str() == extension)
    }
}

impl fmt::Debug for InstanceMetadata {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("InstanceMetadata")
            .field(
                "api_version",
                &format_args!("{}.{}", self.api_version_major(), self.api_version_minor()),
            )
            .field("enabled_layers", &self.enabled_layers)
            .field("enabled_extensions", &self.enabled_extensions)
            .finish()
    }
}

/// Errors that can occur during instance creation.
#[derive(Debug, Error)]
pub enum InstanceCreationError {
    /// Vulkan Error.
    #[error("vulkan error: {0}")]
    VulkanError(#[from] vk::Result),
    /// The loader doesn't support the required API version.
    #[error("instance API version {required_major}.{required_minor} required, loader supports {found_major}.{found_minor}")]
    ApiVersionUnsupported {
        /// Required major version.
        required_major: u32,
        /// Required minor version.
        required_minor: u32,
        /// Supported major version.
        found_major: u32,
        /// Supported minor version.
        found_minor: u32,
    },
    /// One or more required layers are not present.
    #[error("required layers {0:?} not present")]
    LayersNotPresent(BootstrapSmallVec<CString>),
    /// One or more required extensions are not present.
    #[error("required extensions {0:?} not present")]
    ExtensionsNotPresent(BootstrapSmallVec<CString>),
    /// The window system has no Vulkan surface support.
    #[error("no surface extensions available for this display")]
    SurfaceExtensionsUnavailable(#[source] vk::Result),
}

/// Splits `wanted` into the names to enable and the required names that
/// `available` is missing. Requested names which are missing are dropped.
fn partition_supported<'n>(
    wanted: impl IntoIterator<Item = (&'n CStr, bool)>,
    available: &[&CStr],
) -> (BootstrapSmallVec<&'n CStr>, BootstrapSmallVec<CString>) {
    let mut enabled = BootstrapSmallVec::new();
    let mut missing = BootstrapSmallVec::new();
    for (name, required) in wanted {
        let present = available.iter().any(|&supported| supported == name);
        match (required, present) {
            (_, true) => {
                if !enabled.contains(&name) {
                    enabled.push(name);
                }
            }
            (true, false) => missing.push(name.to_owned()),
            (false, false) => (),
        }
    }

    (enabled, missing)
}

/// Allows to easily create an [`ash::Instance`] and friends.
pub struct InstanceBuilder {
    app_name: Option<CString>,
    app_version: Option<u32>,
    engine_name: Option<CString>,
    engine_version: Option<u32>,
    required_api_version: u32,
    layers: BootstrapSmallVec<(*const c_char, bool)>,
    extensions: BootstrapSmallVec<(*const c_char, bool)>,
    debug_messenger: DebugMessenger,
    debug_message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    debug_message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    allocator: Option<vk::AllocationCallbacks>,
}

impl InstanceBuilder {
    /// Create a new instance builder with opinionated defaults.
    #[inline]
    pub fn new() -> Self {
        InstanceBuilder {
            app_name: None,
            app_version: None,
            engine_name: None,
            engine_version: None,
            required_api_version: vk::API_VERSION_1_0,
            layers: BootstrapSmallVec::new(),
            extensions: BootstrapSmallVec::new(),
            debug_messenger: DebugMessenger::Disable,
            debug_message_severity: vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
                | vk::DebugUtilsMessageSeverityFlagsEXT::ERROR,
            debug_message_type: vk::DebugUtilsMessageTypeFlagsEXT::GENERAL
                | vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
            allocator: None,
        }
    }

    /// Application name to advertise.
    #[inline]
    pub fn app_name(mut self, app_name: &str) -> Result<Self, NulError> {
        self.app_name = Some(CString::new(app_name)?);
        Ok(self)
    }

    /// Application version to advertise.
    #[inline]
    pub fn app_version(mut self, major: u32, minor: u32) -> Self {
        self.app_version = Some(vk::make_api_version(0, major, minor, 0));
        self
    }

    /// Engine name to advertise.
    #[inline]
    pub fn engine_name(mut self, engine_name: &str) -> Result<Self, NulError> {
        self.engine_name = Some(CString::new(engine_name)?);
        Ok(self)
    }

    /// Engine version to advertise.
    #[inline]
    pub fn engine_version(mut self, major: u32, minor: u32) -> Self {
        self.engine_version = Some(vk::make_api_version(0, major, minor, 0));
        self
    }

    /// Instance API version to be used as minimum requirement.
    #[inline]
    pub fn require_api_version(mut self, major: u32, minor: u32) -> Self {
        self.required_api_version = vk::make_api_version(0, major, minor, 0);
        self
    }

    /// Try to enable this layer, ignore if it's not supported
    #[inline]
    pub fn request_layer(mut self, layer: *const c_char) -> Self {
        self.layers.push((layer, false));
        self
    }

    /// Enable this layer, fail if it's not supported.
    #[inline]
    pub fn require_layer(mut self, layer: *const c_char) -> Self {
        self.layers.push((layer, true));
        self
    }

    /// Try to enable this extension, ignore if it is not supported.
    #[inline]
    pub fn request_extension(mut self, extension: *const c_char) -> Self {
        self.extensions.push((extension, false));
        self
    }

    /// Enable this extension, fail if it's not supported.
    #[inline]
    pub fn require_extension(mut self, extension: *const c_char) -> Self {
        self.extensions.push((extension, true));
        self
    }

    #[cfg(feature = "surface")]
    /// Adds an requirement on all Vulkan extensions necessary to create a
    /// surface on `display_handle`. This is only supported on feature `surface`.
    #[inline]
    pub fn require_surface_extensions(
        mut self,
        display_handle: &impl HasRawDisplayHandle,
    ) -> Result<Self, InstanceCreationError> {
        let required_extensions =
            ash_window::enumerate_required_extensions(display_handle.raw_display_handle())
                .map_err(InstanceCreationError::SurfaceExtensionsUnavailable)?;
        self.extensions
            .extend(required_extensions.iter().map(|&name| (name, true)));
        Ok(self)
    }

    /// Add Khronos validation layers.
    #[inline]
    pub fn validation_layers(mut self, validation_layers: ValidationLayers) -> Self {
        match validation_layers {
            ValidationLayers::Require | ValidationLayers::Request => {
                self.layers.push((
                    cstr!("VK_LAYER_KHRONOS_validation").as_ptr(),
                    matches!(validation_layers, ValidationLayers::Require),
                ));
            }
            ValidationLayers::Disable => (),
        }

        self
    }

    /// Try to create a debug messenger with the config provided by
    /// `debug_messenger`.
    #[inline]
    pub fn request_debug_messenger(mut self, debug_messenger: DebugMessenger) -> Self {
        if debug_messenger.is_enabled() {
            self.extensions.push((DebugUtils::name().as_ptr(), false));
        }

        self.debug_messenger = debug_messenger;
        self
    }

    /// Filter for the severity of debug messages.
    #[inline]
    pub fn debug_message_severity(
        mut self,
        severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    ) -> Self {
        self.debug_message_severity = severity;
        self
    }

    /// Filter for the type of debug messages.
    #[inline]
    pub fn debug_message_type(mut self, ty: vk::DebugUtilsMessageTypeFlagsEXT) -> Self {
        self.debug_message_type = ty;
        self
    }

    /// Allocation callback to use for internal Vulkan calls in the builder.
    #[inline]
    pub fn allocation_callbacks(mut self, allocator: vk::AllocationCallbacks) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Returns the [`ash::Instance`], the [`DiagnosticSink`] which is a live
    /// messenger if one was requested and could be created, and
    /// [`InstanceMetadata`] about what is actually enabled in the instance.
    ///
    /// Required layers and extensions are checked before anything is created.
    pub unsafe fn build(
        self,
        entry: &Entry,
    ) -> Result<(Instance, DiagnosticSink, InstanceMetadata), InstanceCreationError> {
        let instance_version = entry
            .try_enumerate_instance_version()?
            .unwrap_or(vk::API_VERSION_1_0);
        if vk::make_api_version(
            0,
            vk::api_version_major(instance_version),
            vk::api_version_minor(instance_version),
            0,
        ) < self.required_api_version
        {
            return Err(InstanceCreationError::ApiVersionUnsupported {
                required_major: vk::api_version_major(self.required_api_version),
                required_minor: vk::api_version_minor(self.required_api_version),
                found_major: vk::api_version_major(instance_version),
                found_minor: vk::api_version_minor(instance_version),
            });
        }

        let mut app_info = vk::ApplicationInfo::builder().api_version(self.required_api_version);
        if let Some(app_name) = &self.app_name {
            app_info = app_info.application_name(app_name);
        }
        if let Some(app_version) = self.app_version {
            app_info = app_info.application_version(app_version);
        }
        if let Some(engine_name) = &self.engine_name {
            app_info = app_info.engine_name(engine_name);
        }
        if let Some(engine_version) = self.engine_version {
            app_info = app_info.engine_version(engine_version);
        }

        let layer_properties = entry.enumerate_instance_layer_properties()?;
        let supported_layers: Vec<&CStr> = layer_properties
            .iter()
            .map(|layer| CStr::from_ptr(layer.layer_name.as_ptr()))
            .collect();
        let (enabled_layers, layers_not_present) = partition_supported(
            self.layers
                .iter()
                .map(|&(name, required)| (CStr::from_ptr(name), required)),
            &supported_layers,
        );
        if !layers_not_present.is_empty() {
            return Err(InstanceCreationError::LayersNotPresent(layers_not_present));
        }

        let mut extension_properties = entry.enumerate_instance_extension_properties(None)?;
        for &layer_name in &enabled_layers {
            extension_properties
                .extend(entry.enumerate_instance_extension_properties(Some(layer_name))?);
        }
        let supported_extensions: Vec<&CStr> = extension_properties
            .iter()
            .map(|extension| CStr::from_ptr(extension.extension_name.as_ptr()))
            .collect();
        let (enabled_extensions, extensions_not_present) = partition_supported(
            self.extensions
                .iter()
                .map(|&(name, required)| (CStr::from_ptr(name), required)),
            &supported_extensions,
        );
        if !extensions_not_present.is_empty() {
            return Err(InstanceCreationError::ExtensionsNotPresent(
                extensions_not_present,
            ));
        }

        let is_debug_utils_enabled = enabled_extensions.contains(&DebugUtils::name());
        let messenger_info = (self.debug_messenger.is_enabled() && is_debug_utils_enabled)
            .then(|| {
                let messenger_info = vk::DebugUtilsMessengerCreateInfoEXT::builder()
                    .message_severity(self.debug_message_severity)
                    .message_type(self.debug_message_type);
                match self.debug_messenger {
                    DebugMessenger::Custom {
                        callback,
                        user_data_pointer,
                    } => messenger_info
                        .pfn_user_callback(callback)
                        .user_data(user_data_pointer)
                        .build(),
                    _ => messenger_info
                        .pfn_user_callback(Some(crate::default_debug_callback))
                        .build(),
                }
            });
        if self.debug_messenger.is_enabled() && messenger_info.is_none() {
            log::warn!("debug utils unavailable, diagnostics are disabled");
        }

        let layer_ptrs: BootstrapSmallVec<*const c_char> =
            enabled_layers.iter().map(|name| name.as_ptr()).collect();
        let extension_ptrs: BootstrapSmallVec<*const c_char> =
            enabled_extensions.iter().map(|name| name.as_ptr()).collect();
        let mut instance_info = vk::InstanceCreateInfo::builder()
            .application_info(&app_info)
            .enabled_layer_names(&layer_ptrs)
            .enabled_extension_names(&extension_ptrs);

        // Also covers messages emitted during instance creation and destruction.
        let mut instance_messenger_info;
        if let Some(messenger_info) = messenger_info {
            instance_messenger_info = messenger_info;
            instance_info = instance_info.push_next(&mut instance_messenger_info);
        }

        let instance = entry.create_instance(&instance_info, self.allocator.as_ref())?;
        let diagnostics = match messenger_info {
            Some(messenger_info) => {
                match DiagnosticSink::create(entry, &instance, &messenger_info, self.allocator.as_ref())
                {
                    Ok(sink) => sink,
                    Err(err) => {
                        instance.destroy_instance(self.allocator.as_ref());
                        return Err(err.into());
                    }
                }
            }
            None => DiagnosticSink::Disabled,
        };

        let instance_metadata = InstanceMetadata {
            instance_handle: instance.handle(),
            api_version: self.required_api_version,
            enabled_layers: enabled_layers.iter().map(|&name| name.to_owned()).collect(),
            enabled_extensions: enabled_extensions
                .iter()
                .map(|&name| name.to_owned())
                .collect(),
        };

        Ok((instance, diagnostics, instance_metadata))
    }
}

impl Default for InstanceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
