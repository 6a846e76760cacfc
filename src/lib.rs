#![allow(clippy::missing_safety_doc)]
#![warn(missing_docs)]
/*!
Vulkan bootstrapping for Rust: everything a "hello triangle" needs before the
first frame, built on [`ash`].

- ✅ Instance creation, with eager checks for required layers and extensions
- ✅ Optional debug messenger, resolved once into a [`DiagnosticSink`]
- ✅ Surface creation and surface capability probing
- ✅ Physical device selection, in enumeration order
- ✅ Device creation and getting the graphics/present queue
- ✅ Swapchain configuration and creation

Rendering, frame pacing and swapchain recreation are not handled.

## Cargo Features

- `surface` (enabled by default): Enables the use of [`raw-window-handle`] and
  the [`Application`] context.
- `window` (enabled by default): Implements [`PlatformWindow`] for `winit`
  windows and builds the `swapchain-bootstrap` binary.

## Example

```rust,ignore
let entry = unsafe { ash::Entry::load() }?;
let (instance, diagnostics, instance_metadata) = unsafe {
    InstanceBuilder::new()
        .require_api_version(1, 3)
        .validation_layers(ValidationLayers::Request)
        .request_debug_messenger(DebugMessenger::from_flag(true))
        .require_surface_extensions(&window)?
        .build(&entry)
}?;

let surface_loader = Surface::new(&entry, &instance);
let surface = unsafe { create_surface(&entry, &instance, &window) }?;

let (device, device_metadata) = unsafe {
    DeviceBuilder::new()
        .require_version(1, 3)
        .require_extension(ash::extensions::khr::Swapchain::name())
        .require_dynamic_rendering()
        .require_extended_dynamic_state()
        .for_surface(surface)
        .build(&instance, &surface_loader, &instance_metadata)
}?;
let queue = unsafe { device_metadata.device_queue(&device, 0) };

let capabilities =
    unsafe { surface::probe(&surface_loader, device_metadata.physical_device(), surface) }?;
let (width, height) = window.drawable_size();
let configuration = SwapchainOptions::default()
    .select(&capabilities, vk::Extent2D { width, height })?;
let swapchain =
    unsafe { Swapchain::new(&instance, &device, &device_metadata, configuration) }?;
```

## Licensing

This project is licensed under the [zlib License].

`vk-bootstrap`, the inspiration of this project, is licensed under the [MIT license].

[zlib License]: https://gitlab.com/Friz64/erupt-bootstrap/-/blob/main/LICENSE
[MIT license]: https://gitlab.com/Friz64/erupt-bootstrap/-/blob/main/LICENSE-vk-bootstrap
[`raw-window-handle`]: https://crates.io/crates/raw-window-handle
*/

#[cfg(feature = "surface")]
pub mod app;
pub mod debug;
pub mod device;
pub mod instance;
#[cfg(feature = "surface")]
pub mod platform;
pub mod surface;
pub mod swapchain;
pub mod teardown;

#[cfg(feature = "surface")]
pub use app::*;
pub use debug::*;
pub use device::*;
pub use instance::*;
#[cfg(feature = "surface")]
pub use platform::*;
pub use surface::*;
pub use swapchain::*;
pub use teardown::*;

type BootstrapSmallVec<T> = smallvec::SmallVec<[T; 8]>;
