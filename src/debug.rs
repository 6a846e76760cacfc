//! Debug messenger utils.
use ash::extensions::ext::DebugUtils;
use ash::{vk, Entry, Instance};
use std::{
    borrow::Cow,
    ffi::{c_void, CStr},
};

/// Enable or disable the debug messenger, optionally providing a custom callback.
#[derive(Copy, Clone)]
pub enum DebugMessenger {
    /// Enables the debug messenger with the [`default_debug_callback`]
    /// callback.
    Default,
    /// Enables the debug messenger with a custom, user-provided callback.
    Custom {
        /// The user provided callback function. Feel free to take a look at the
        /// [`default_debug_callback`] when implementing your own.
        callback: vk::PFN_vkDebugUtilsMessengerCallbackEXT,
        /// A user data pointer passed to the debug callback.
        user_data_pointer: *mut c_void,
    },
    /// Disables the debug messenger.
    Disable,
}

impl DebugMessenger {
    /// [`DebugMessenger::Default`] if `enable_diagnostics` is set,
    /// [`DebugMessenger::Disable`] otherwise.
    #[inline]
    pub fn from_flag(enable_diagnostics: bool) -> Self {
        if enable_diagnostics {
            DebugMessenger::Default
        } else {
            DebugMessenger::Disable
        }
    }

    /// Whether a messenger will be requested at all.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        !matches!(self, DebugMessenger::Disable)
    }
}

/// Maps a message severity to the [`log::Level`] it is reported at.
/// Anything below a warning is discarded.
pub fn report_level(severity: vk::DebugUtilsMessageSeverityFlagsEXT) -> Option<log::Level> {
    if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        Some(log::Level::Error)
    } else if severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        Some(log::Level::Warn)
    } else {
        None
    }
}

/// The default debug callback used in [`DebugMessenger::Default`].
///
/// Warnings and errors are forwarded to the `vulkan` log target, everything
/// else is dropped.
pub unsafe extern "system" fn default_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _p_user_data: *mut c_void,
) -> vk::Bool32 {
    let Some(level) = report_level(message_severity) else {
        return vk::FALSE;
    };

    let message = if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        Cow::Borrowed("<no message>")
    } else {
        CStr::from_ptr((*p_callback_data).p_message).to_string_lossy()
    };

    log::log!(target: "vulkan", level, "{:?} | {}", message_type, message);

    vk::FALSE
}

/// Where driver diagnostics end up. Either a live debug messenger or
/// nothing at all; decided once when the instance is built.
pub enum DiagnosticSink {
    /// A debug messenger is registered with the instance.
    Messenger {
        /// Loader for the `VK_EXT_debug_utils` functions.
        loader: DebugUtils,
        /// The registered messenger.
        handle: vk::DebugUtilsMessengerEXT,
    },
    /// Diagnostics are discarded.
    Disabled,
}

impl DiagnosticSink {
    pub(crate) unsafe fn create(
        entry: &Entry,
        instance: &Instance,
        create_info: &vk::DebugUtilsMessengerCreateInfoEXT,
        allocator: Option<&vk::AllocationCallbacks>,
    ) -> Result<Self, vk::Result> {
        let loader = DebugUtils::new(entry, instance);
        let handle = loader.create_debug_utils_messenger(create_info, allocator)?;
        Ok(DiagnosticSink::Messenger { loader, handle })
    }

    /// Returns true if a messenger is registered.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, DiagnosticSink::Messenger { .. })
    }

    /// Unregisters the messenger, if any. Must happen before the instance is
    /// destroyed.
    pub unsafe fn destroy(self) {
        if let DiagnosticSink::Messenger { loader, handle } = self {
            loader.destroy_debug_utils_messenger(handle, None);
        }
    }
}

impl std::fmt::Debug for DiagnosticSink {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DiagnosticSink::Messenger { handle, .. } => {
                fmt.debug_tuple("Messenger").field(handle).finish()
            }
            DiagnosticSink::Disabled => fmt.write_str("Disabled"),
        }
    }
}
