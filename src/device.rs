//! Device creation utils.
use crate::{BootstrapSmallVec, DeviceQueryError, InstanceMetadata};
use ash::extensions::khr::Surface;
use ash::{vk, Device, Instance};
use std::{
    borrow::Cow,
    ffi::{CStr, CString},
    os::raw::c_char,
};
use thiserror::Error;

/// Criteria for queue families.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct QueueFamilyCriteria {
    /// A queue family will only be considered if all these flags are set.
    pub must_support: vk::QueueFlags,
    /// This criteria is only met if the presentation support matches with
    /// this flag. `None` corresponds to being indifferent to the support.
    /// `Some(expected)` corresponds to the criteria being met if the support
    /// matches with `expected`.
    pub presentation_support: Option<bool>,
}

impl QueueFamilyCriteria {
    /// Queue family criteria that are always met.
    #[inline]
    pub fn none() -> QueueFamilyCriteria {
        QueueFamilyCriteria::default()
    }

    /// The criteria are only met if the queue family supports graphics and
    /// presentation.
    #[inline]
    pub fn graphics_present() -> QueueFamilyCriteria {
        QueueFamilyCriteria::none()
            .must_support(vk::QueueFlags::GRAPHICS)
            .must_support_presentation()
    }

    /// Add an requirement that these queue flags must be present in the
    /// queue family.
    #[inline]
    pub fn must_support(mut self, must_support: vk::QueueFlags) -> QueueFamilyCriteria {
        self.must_support |= must_support;
        self
    }

    /// Require that the queue family must support presentation.
    #[inline]
    pub fn must_support_presentation(mut self) -> QueueFamilyCriteria {
        self.presentation_support = Some(true);
        self
    }

    /// Returns true if the queue flags alone satisfy the criteria.
    #[inline]
    pub fn flags_met_by(&self, queue_family: &QueueFamilyReport) -> bool {
        queue_family.flags.contains(self.must_support)
    }

    /// Returns true if the queue family satisfies the criteria.
    pub fn is_met_by(&self, queue_family: &QueueFamilyReport) -> bool {
        let presentation = match (self.presentation_support, queue_family.presentation_support) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(expected), Some(support)) => support == expected,
        };

        self.flags_met_by(queue_family) && presentation
    }

    /// Returns the index of the first queue family meeting the criteria, in
    /// the order the device reports them.
    pub fn choose_queue_family(&self, queue_families: &[QueueFamilyReport]) -> Option<u32> {
        queue_families
            .iter()
            .position(|queue_family| self.is_met_by(queue_family))
            .map(|idx| idx as u32)
    }
}

/// What a queue family of a physical device can do.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct QueueFamilyReport {
    /// Operations supported by the queues of this family.
    pub flags: vk::QueueFlags,
    /// Number of queues in the family.
    pub queue_count: u32,
    /// Whether the family can present to the surface. `None` if no surface
    /// was given.
    pub presentation_support: Option<bool>,
}

/// Optional device features this crate knows how to require.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct DeviceFeatures {
    /// `dynamicRendering` of [`vk::PhysicalDeviceVulkan13Features`].
    pub dynamic_rendering: bool,
    /// `extendedDynamicState` of
    /// [`vk::PhysicalDeviceExtendedDynamicStateFeaturesEXT`].
    pub extended_dynamic_state: bool,
}

impl DeviceFeatures {
    /// Names of the features set in `self` but not in `available`.
    pub fn missing_from(&self, available: &DeviceFeatures) -> BootstrapSmallVec<&'static str> {
        let mut missing = BootstrapSmallVec::new();
        if self.dynamic_rendering && !available.dynamic_rendering {
            missing.push("dynamicRendering");
        }
        if self.extended_dynamic_state && !available.extended_dynamic_state {
            missing.push("extendedDynamicState");
        }
        missing
    }

    fn is_empty(&self) -> bool {
        *self == DeviceFeatures::default()
    }
}

/// Everything device selection looks at, gathered from one physical device.
#[derive(Debug, Clone)]
pub struct PhysicalDeviceReport {
    /// The physical device.
    pub handle: vk::PhysicalDevice,
    /// Properties of the physical device.
    pub properties: vk::PhysicalDeviceProperties,
    /// Queue families, indexed like the device reports them.
    pub queue_families: Vec<QueueFamilyReport>,
    /// Supported device extensions.
    pub extensions: Vec<CString>,
    /// Supported optional features.
    pub features: DeviceFeatures,
}

impl PhysicalDeviceReport {
    /// Queries `physical_device`. Presentation support is only queried if
    /// `surface` is given, features only if `features2_supported`.
    pub unsafe fn query(
        instance: &Instance,
        surface_loader: &Surface,
        physical_device: vk::PhysicalDevice,
        surface: Option<vk::SurfaceKHR>,
        features2_supported: bool,
    ) -> Result<Self, DeviceQueryError> {
        let properties = instance.get_physical_device_properties(physical_device);

        let mut queue_families = Vec::new();
        for (i, family) in instance
            .get_physical_device_queue_family_properties(physical_device)
            .into_iter()
            .enumerate()
        {
            let presentation_support = match surface {
                Some(surface) => Some(surface_loader.get_physical_device_surface_support(
                    physical_device,
                    i as u32,
                    surface,
                )?),
                None => None,
            };

            queue_families.push(QueueFamilyReport {
                flags: family.queue_flags,
                queue_count: family.queue_count,
                presentation_support,
            });
        }

        let extensions: Vec<CString> = instance
            .enumerate_device_extension_properties(physical_device)?
            .iter()
            .map(|extension| CStr::from_ptr(extension.extension_name.as_ptr()).to_owned())
            .collect();
        let has_extended_dynamic_state = extensions
            .iter()
            .any(|e| e.as_c_str() == vk::ExtExtendedDynamicStateFn::name());

        let mut features = DeviceFeatures::default();
        if features2_supported && properties.api_version >= vk::API_VERSION_1_3 {
            let mut vulkan13 = vk::PhysicalDeviceVulkan13Features::default();
            let mut extended_dynamic_state =
                vk::PhysicalDeviceExtendedDynamicStateFeaturesEXT::default();
            let mut features2 = vk::PhysicalDeviceFeatures2::builder().push_next(&mut vulkan13);
            // Extension structs may only be chained if the device lists the extension.
            if has_extended_dynamic_state {
                features2 = features2.push_next(&mut extended_dynamic_state);
            }
            let mut features2 = features2.build();
            instance.get_physical_device_features2(physical_device, &mut features2);

            features.dynamic_rendering = vulkan13.dynamic_rendering == vk::TRUE;
            features.extended_dynamic_state =
                extended_dynamic_state.extended_dynamic_state == vk::TRUE;
        }

        Ok(PhysicalDeviceReport {
            handle: physical_device,
            properties,
            queue_families,
            extensions,
            features,
        })
    }

    /// Name of the physical device.
    #[inline]
    pub fn device_name(&self) -> Cow<str> {
        unsafe { CStr::from_ptr(self.properties.device_name.as_ptr()).to_string_lossy() }
    }

    /// Returns true if `extension` is supported.
    #[inline]
    pub fn supports_extension(&self, extension: &CStr) -> bool {
        self.extensions.iter().any(|e| e.as_c_str() == extension)
    }
}

/// Why a physical device was passed over.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Unsuitable {
    /// The device API version is too old.
    #[error("API version {}.{} is below the required {}.{}", vk::api_version_major(*found), vk::api_version_minor(*found), vk::api_version_major(*required), vk::api_version_minor(*required))]
    ApiVersion {
        /// Required version.
        required: u32,
        /// Version of the device.
        found: u32,
    },
    /// No queue family has the required queue flags.
    #[error("no queue family supports {0:?}")]
    NoQueueFamily(vk::QueueFlags),
    /// Required extensions are missing.
    #[error("missing extensions {0:?}")]
    MissingExtensions(BootstrapSmallVec<CString>),
    /// Required features are missing.
    #[error("missing features {0:?}")]
    MissingFeatures(BootstrapSmallVec<&'static str>),
}

/// Errors that can occur during device creation.
#[derive(Debug, Error)]
pub enum DeviceCreationError {
    /// Vulkan Error.
    #[error("vulkan error: {0}")]
    VulkanError(#[from] vk::Result),
    /// A physical device couldn't be queried, e.g. for presentation support.
    #[error(transparent)]
    Query(#[from] DeviceQueryError),
    /// No physical device met the requirements.
    #[error("no physical device met the requirements")]
    NoSuitableDevice,
    /// The chosen device has no queue family meeting the queue criteria.
    #[error("{device_name} has no queue family meeting {criteria:?}")]
    NoSuitableQueue {
        /// Name of the chosen physical device.
        device_name: String,
        /// The criteria that couldn't be met.
        criteria: QueueFamilyCriteria,
    },
}

/// Metadata for after device creation.
#[derive(Debug, Clone)]
pub struct DeviceMetadata {
    device_handle: vk::Device,
    physical_device: vk::PhysicalDevice,
    properties: vk::PhysicalDeviceProperties,
    queue_family_index: u32,
    queue_family: QueueFamilyReport,
    surface: Option<vk::SurfaceKHR>,
    enabled_extensions: BootstrapSmallVec<CString>,
    enabled_features: DeviceFeatures,
}

impl DeviceMetadata {
    /// The device this metadata belongs to.
    #[inline]
    pub fn device_handle(&self) -> vk::Device {
        self.device_handle
    }

    /// The physical device this device belongs to.
    #[inline]
    pub fn physical_device(&self) -> vk::PhysicalDevice {
        self.physical_device
    }

    /// The surface this device was created for.
    #[inline]
    pub fn surface(&self) -> Option<vk::SurfaceKHR> {
        self.surface
    }

    /// Properties of the physical device.
    #[inline]
    pub fn properties(&self) -> &vk::PhysicalDeviceProperties {
        &self.properties
    }

    /// Name of the physical device.
    #[inline]
    pub fn device_name(&self) -> Cow<str> {
        unsafe { CStr::from_ptr(self.properties.device_name.as_ptr()).to_string_lossy() }
    }

    /// Type of the physical device.
    #[inline]
    pub fn device_type(&self) -> vk::PhysicalDeviceType {
        self.properties.device_type
    }

    /// Index of the queue family the device was created with.
    #[inline]
    pub fn queue_family_index(&self) -> u32 {
        self.queue_family_index
    }

    /// The queue family the device was created with.
    #[inline]
    pub fn queue_family(&self) -> &QueueFamilyReport {
        &self.queue_family
    }

    /// Returns the queue at `queue_index` within the chosen queue family.
    /// Only one queue is created, so `queue_index` is normally `0`.
    #[inline]
    pub unsafe fn device_queue(&self, device: &Device, queue_index: u32) -> vk::Queue {
        debug_assert!(queue_index < self.queue_family.queue_count);
        device.get_device_queue(self.queue_family_index, queue_index)
    }

    /// List of all enabled extensions in the device.
    #[inline]
    pub fn enabled_extensions(&self) -> &[CString] {
        &self.enabled_extensions
    }

    /// Returns true if `extension` is enabled.
    #[inline]
    pub fn is_extension_enabled(&self, extension: &CStr) -> bool {
        self.enabled_extensions.iter().any(|i| i.as_c_str() == extension)
    }

    /// The optional features enabled on the device.
    #[inline]
    pub fn enabled_features(&self) -> DeviceFeatures {
        self.enabled_features
    }
}

/// Allows to easily create an [`ash::Device`] and its queue.
///
/// Physical devices are considered in enumeration order and the first one
/// meeting every requirement is taken.
pub struct DeviceBuilder {
    surface: Option<vk::SurfaceKHR>,
    queue_family_criteria: QueueFamilyCriteria,
    extensions: BootstrapSmallVec<CString>,
    required_version: u32,
    required_features: DeviceFeatures,
    allocator: Option<vk::AllocationCallbacks>,
}

impl DeviceBuilder {
    /// Create a new device builder. By default, a queue family supporting
    /// graphics and presentation is required.
    #[inline]
    pub fn new() -> Self {
        DeviceBuilder {
            surface: None,
            queue_family_criteria: QueueFamilyCriteria::graphics_present(),
            extensions: BootstrapSmallVec::new(),
            required_version: vk::API_VERSION_1_0,
            required_features: DeviceFeatures::default(),
            allocator: None,
        }
    }

    /// Surface to use to check for presentation support in queue families.
    #[inline]
    pub fn for_surface(mut self, surface: vk::SurfaceKHR) -> Self {
        self.surface = Some(surface);
        self
    }

    /// The queue family chosen by the criteria will be enabled on the device.
    #[inline]
    pub fn queue_family(mut self, criteria: QueueFamilyCriteria) -> Self {
        self.queue_family_criteria = criteria;
        self
    }

    /// Require a device which supports `extension`.
    /// The extension will be enabled.
    #[inline]
    pub fn require_extension(mut self, extension: &CStr) -> Self {
        self.extensions.push(extension.to_owned());
        self
    }

    /// Require the device to support this version.
    #[inline]
    pub fn require_version(mut self, major: u32, minor: u32) -> Self {
        self.required_version = vk::make_api_version(0, major, minor, 0);
        self
    }

    /// Require the device to support this version.
    #[inline]
    pub fn require_version_raw(mut self, version: u32) -> Self {
        self.required_version = version;
        self
    }

    /// Require and enable `dynamicRendering`.
    #[inline]
    pub fn require_dynamic_rendering(mut self) -> Self {
        self.required_features.dynamic_rendering = true;
        self
    }

    /// Require and enable `extendedDynamicState`, together with
    /// `VK_EXT_extended_dynamic_state`.
    #[inline]
    pub fn require_extended_dynamic_state(mut self) -> Self {
        let extension = vk::ExtExtendedDynamicStateFn::name();
        if !self.extensions.iter().any(|e| e.as_c_str() == extension) {
            self.extensions.push(extension.to_owned());
        }
        self.required_features.extended_dynamic_state = true;
        self
    }

    /// Allocation callback to use for internal Vulkan calls in the builder.
    #[inline]
    pub fn allocation_callbacks(mut self, allocator: vk::AllocationCallbacks) -> Self {
        self.allocator = Some(allocator);
        self
    }

    /// Checks every device-level requirement against `report`.
    pub fn check(&self, report: &PhysicalDeviceReport) -> Result<(), Unsuitable> {
        if self.required_version > report.properties.api_version {
            return Err(Unsuitable::ApiVersion {
                required: self.required_version,
                found: report.properties.api_version,
            });
        }

        if !report
            .queue_families
            .iter()
            .any(|queue_family| self.queue_family_criteria.flags_met_by(queue_family))
        {
            return Err(Unsuitable::NoQueueFamily(
                self.queue_family_criteria.must_support,
            ));
        }

        let missing_extensions: BootstrapSmallVec<CString> = self
            .extensions
            .iter()
            .filter(|extension| !report.supports_extension(extension))
            .cloned()
            .collect();
        if !missing_extensions.is_empty() {
            return Err(Unsuitable::MissingExtensions(missing_extensions));
        }

        let missing_features = self.required_features.missing_from(&report.features);
        if !missing_features.is_empty() {
            return Err(Unsuitable::MissingFeatures(missing_features));
        }

        Ok(())
    }

    /// Returns the first suitable device and the index of its queue family.
    /// Devices after the first suitable one are never looked at.
    pub fn select<I>(&self, reports: I) -> Result<(PhysicalDeviceReport, u32), DeviceCreationError>
    where
        I: IntoIterator<Item = Result<PhysicalDeviceReport, DeviceQueryError>>,
    {
        for report in reports {
            let report = report?;
            if let Err(reason) = self.check(&report) {
                log::debug!("skipping {}: {}", report.device_name(), reason);
                continue;
            }

            return match self
                .queue_family_criteria
                .choose_queue_family(&report.queue_families)
            {
                Some(queue_family_index) => Ok((report, queue_family_index)),
                None => Err(DeviceCreationError::NoSuitableQueue {
                    device_name: report.device_name().into_owned(),
                    criteria: self.queue_family_criteria,
                }),
            };
        }

        Err(DeviceCreationError::NoSuitableDevice)
    }

    /// Returns the [`ash::Device`] and [`DeviceMetadata`], containing
    /// the handle of the used physical device handle and its properties, as
    /// wells as the enabled device extensions and the chosen queue family.
    pub unsafe fn build(
        self,
        instance: &Instance,
        surface_loader: &Surface,
        instance_metadata: &InstanceMetadata,
    ) -> Result<(Device, DeviceMetadata), DeviceCreationError> {
        assert_eq!(instance.handle(), instance_metadata.instance_handle());

        let features2_supported = instance_metadata.api_version_raw() >= vk::API_VERSION_1_1
            || instance_metadata
                .is_extension_enabled(vk::KhrGetPhysicalDeviceProperties2Fn::name());

        let physical_devices = instance.enumerate_physical_devices()?;
        let reports = physical_devices.into_iter().map(|physical_device| {
            PhysicalDeviceReport::query(
                instance,
                surface_loader,
                physical_device,
                self.surface,
                features2_supported,
            )
        });
        let (candidate, queue_family_index) = self.select(reports)?;

        let queue_priorities = [1.0];
        let queue_create_infos = [vk::DeviceQueueCreateInfo::builder()
            .queue_family_index(queue_family_index)
            .queue_priorities(&queue_priorities)
            .build()];
        let extension_ptrs: BootstrapSmallVec<*const c_char> =
            self.extensions.iter().map(|name| name.as_ptr()).collect();
        let mut device_info = vk::DeviceCreateInfo::builder()
            .queue_create_infos(&queue_create_infos)
            .enabled_extension_names(&extension_ptrs);

        let mut vulkan13 = vk::PhysicalDeviceVulkan13Features {
            dynamic_rendering: vk::TRUE,
            ..Default::default()
        };
        if self.required_features.dynamic_rendering {
            device_info = device_info.push_next(&mut vulkan13);
        }
        let mut extended_dynamic_state = vk::PhysicalDeviceExtendedDynamicStateFeaturesEXT {
            extended_dynamic_state: vk::TRUE,
            ..Default::default()
        };
        if self.required_features.extended_dynamic_state {
            device_info = device_info.push_next(&mut extended_dynamic_state);
        }
        if !self.required_features.is_empty() && !features2_supported {
            log::warn!("instance lacks features2 support, device features may not be enabled");
        }

        let device = instance.create_device(
            candidate.handle,
            &device_info,
            self.allocator.as_ref(),
        )?;

        log::info!(
            "selected {} ({:?}), queue family {}",
            candidate.device_name(),
            candidate.properties.device_type,
            queue_family_index
        );

        let device_metadata = DeviceMetadata {
            device_handle: device.handle(),
            physical_device: candidate.handle,
            properties: candidate.properties,
            queue_family_index,
            queue_family: candidate.queue_families[queue_family_index as usize],
            surface: self.surface,
            enabled_extensions: self.extensions,
            enabled_features: self.required_features,
        };

        Ok((device, device_metadata))
    }
}

impl Default for DeviceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ash::vk::Handle;
    use std::cell::Cell;

    const GRAPHICS_PRESENT: QueueFamilyReport = QueueFamilyReport {
        flags: vk::QueueFlags::from_raw(
            vk::QueueFlags::GRAPHICS.as_raw() | vk::QueueFlags::TRANSFER.as_raw(),
        ),
        queue_count: 1,
        presentation_support: Some(true),
    };

    fn swapchain_builder() -> DeviceBuilder {
        DeviceBuilder::new()
            .require_version(1, 3)
            .require_extension(ash::extensions::khr::Swapchain::name())
            .require_dynamic_rendering()
            .require_extended_dynamic_state()
    }

    fn report(raw: u64, name: &str) -> PhysicalDeviceReport {
        let mut properties = vk::PhysicalDeviceProperties {
            api_version: vk::API_VERSION_1_3,
            ..Default::default()
        };
        for (dst, &src) in properties.device_name.iter_mut().zip(name.as_bytes()) {
            *dst = src as c_char;
        }

        PhysicalDeviceReport {
            handle: vk::PhysicalDevice::from_raw(raw),
            properties,
            queue_families: vec![GRAPHICS_PRESENT],
            extensions: vec![
                ash::extensions::khr::Swapchain::name().to_owned(),
                vk::ExtExtendedDynamicStateFn::name().to_owned(),
            ],
            features: DeviceFeatures {
                dynamic_rendering: true,
                extended_dynamic_state: true,
            },
        }
    }

    #[test]
    fn first_qualifying_device_wins() {
        let mut lacks_swapchain = report(1, "first");
        lacks_swapchain.extensions.clear();
        let devices = vec![lacks_swapchain, report(2, "second"), report(3, "third")];

        let looked_at = Cell::new(0);
        let (chosen, queue_family_index) = swapchain_builder()
            .select(devices.into_iter().map(|report| {
                looked_at.set(looked_at.get() + 1);
                Ok(report)
            }))
            .unwrap();

        assert_eq!(chosen.handle, vk::PhysicalDevice::from_raw(2));
        assert_eq!(chosen.device_name(), "second");
        assert_eq!(queue_family_index, 0);
        assert_eq!(looked_at.get(), 2);
    }

    #[test]
    fn unsuitable_reasons() {
        let builder = swapchain_builder();

        let mut old = report(1, "old");
        old.properties.api_version = vk::API_VERSION_1_2;
        assert!(matches!(
            builder.check(&old),
            Err(Unsuitable::ApiVersion { .. })
        ));

        let mut compute_only = report(1, "compute");
        compute_only.queue_families = vec![QueueFamilyReport {
            flags: vk::QueueFlags::COMPUTE,
            queue_count: 4,
            presentation_support: Some(true),
        }];
        assert_eq!(
            builder.check(&compute_only),
            Err(Unsuitable::NoQueueFamily(vk::QueueFlags::GRAPHICS))
        );

        let mut no_swapchain = report(1, "headless");
        no_swapchain.extensions.clear();
        match builder.check(&no_swapchain) {
            Err(Unsuitable::MissingExtensions(missing)) => {
                assert_eq!(missing[0].as_c_str(), ash::extensions::khr::Swapchain::name())
            }
            other => panic!("unexpected {:?}", other),
        }

        let mut no_dynamic_rendering = report(1, "legacy");
        no_dynamic_rendering.features.dynamic_rendering = false;
        match builder.check(&no_dynamic_rendering) {
            Err(Unsuitable::MissingFeatures(missing)) => {
                assert_eq!(missing.as_slice(), &["dynamicRendering"])
            }
            other => panic!("unexpected {:?}", other),
        }

        assert_eq!(builder.check(&report(1, "fine")), Ok(()));
    }

    #[test]
    fn no_devices() {
        let result = swapchain_builder().select(std::iter::empty());
        assert!(matches!(result, Err(DeviceCreationError::NoSuitableDevice)));

        let mut old = report(1, "old");
        old.properties.api_version = vk::API_VERSION_1_1;
        let result = swapchain_builder().select([Ok(old)]);
        assert!(matches!(result, Err(DeviceCreationError::NoSuitableDevice)));
    }

    #[test]
    fn query_errors_propagate() {
        let lost = DeviceQueryError::VulkanError(vk::Result::ERROR_SURFACE_LOST_KHR);
        let result = swapchain_builder().select([Err(lost)]);
        assert!(matches!(
            result,
            Err(DeviceCreationError::Query(DeviceQueryError::VulkanError(
                vk::Result::ERROR_SURFACE_LOST_KHR
            )))
        ));
    }

    #[test]
    fn extended_dynamic_state_needs_its_extension() {
        let builder = DeviceBuilder::new().require_extended_dynamic_state();
        assert_eq!(builder.extensions.len(), 1);
        assert_eq!(
            builder.extensions[0].as_c_str(),
            vk::ExtExtendedDynamicStateFn::name()
        );

        let mut core_only = report(1, "core only");
        core_only.extensions = vec![ash::extensions::khr::Swapchain::name().to_owned()];
        match swapchain_builder().check(&core_only) {
            Err(Unsuitable::MissingExtensions(missing)) => {
                assert_eq!(missing.len(), 1);
                assert_eq!(missing[0].as_c_str(), vk::ExtExtendedDynamicStateFn::name());
            }
            other => panic!("unexpected {:?}", other),
        }

        let twice = DeviceBuilder::new()
            .require_extended_dynamic_state()
            .require_extended_dynamic_state();
        assert_eq!(twice.extensions.len(), 1);
    }

    #[test]
    fn first_combined_queue_family() {
        let mut device = report(1, "split");
        device.queue_families = vec![
            QueueFamilyReport {
                flags: vk::QueueFlags::GRAPHICS,
                queue_count: 1,
                presentation_support: Some(false),
            },
            QueueFamilyReport {
                flags: vk::QueueFlags::COMPUTE,
                queue_count: 1,
                presentation_support: Some(true),
            },
            GRAPHICS_PRESENT,
            GRAPHICS_PRESENT,
        ];

        let (_, queue_family_index) = swapchain_builder().select([Ok(device)]).unwrap();
        assert_eq!(queue_family_index, 2);
    }

    #[test]
    fn split_families_are_not_combined() {
        let mut device = report(1, "split");
        device.queue_families = vec![
            QueueFamilyReport {
                flags: vk::QueueFlags::GRAPHICS,
                queue_count: 1,
                presentation_support: Some(false),
            },
            QueueFamilyReport {
                flags: vk::QueueFlags::COMPUTE,
                queue_count: 1,
                presentation_support: Some(true),
            },
        ];

        match swapchain_builder().select([Ok(device), Ok(report(2, "never"))]) {
            Err(DeviceCreationError::NoSuitableQueue { device_name, .. }) => {
                assert_eq!(device_name, "split")
            }
            other => panic!("unexpected {:?}", other.map(|(report, idx)| (report.handle, idx))),
        }
    }

    #[test]
    fn presentation_needs_a_surface() {
        let criteria = QueueFamilyCriteria::graphics_present();
        let unknown = QueueFamilyReport {
            flags: vk::QueueFlags::GRAPHICS,
            queue_count: 1,
            presentation_support: None,
        };
        assert!(!criteria.is_met_by(&unknown));
        assert!(criteria.flags_met_by(&unknown));
        assert!(QueueFamilyCriteria::none()
            .must_support(vk::QueueFlags::GRAPHICS)
            .is_met_by(&unknown));
    }
}
