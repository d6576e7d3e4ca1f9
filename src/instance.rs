use std::{
    ffi::{CStr, CString},
    ops::Deref,
};

use anyhow::Result;
use ash::{
    ext::debug_utils,
    vk::{make_api_version, ApplicationInfo, InstanceCreateInfo, API_VERSION_1_3},
    Entry,
};
use tracing::debug;

use crate::{debug_utils::get_debug_messenger_create_info, error::EngineError};

const API_VERSION: u32 = API_VERSION_1_3;
const VALIDATION_LAYER: &CStr = c"VK_LAYER_KHRONOS_validation";

pub struct Instance {
    instance: ash::Instance,
    entry: Entry,
    validations_enabled: bool,
}

impl Instance {
    /// Creates an Instance to interact with the core of Vulkan. Registers the window system's
    /// extensions, the validation layer when requested, and basic information about the
    /// application.
    pub fn new(
        entry: Entry,
        window_extensions: &[&CStr],
        enable_validations: bool,
    ) -> Result<Self> {
        debug!("Creating Vulkan instance");
        let appname = CString::new(env!("CARGO_PKG_NAME"))?;
        let version_major = env!("CARGO_PKG_VERSION_MAJOR").parse::<u32>()?;
        let version_minor = env!("CARGO_PKG_VERSION_MINOR").parse::<u32>()?;
        let version_patch = env!("CARGO_PKG_VERSION_PATCH").parse::<u32>()?;
        let app_version = make_api_version(0, version_major, version_minor, version_patch);

        let app_info = ApplicationInfo::default()
            .application_name(&appname)
            .application_version(app_version)
            .api_version(API_VERSION)
            .engine_name(&appname)
            .engine_version(app_version);

        let enabled_extension_names = required_instance_extensions(window_extensions, enable_validations);
        debug!("Instance extensions to enable: {:?}", enabled_extension_names);
        let enabled_extension_name_ptrs = enabled_extension_names
            .iter()
            .map(|extension_name| extension_name.as_ptr())
            .collect::<Vec<_>>();

        let enabled_layer_names = if enable_validations {
            check_validation_layer_support(&entry)?;
            vec![VALIDATION_LAYER]
        } else {
            vec![]
        };
        debug!("Layers to enable: {:?}", enabled_layer_names);
        let enabled_layer_name_ptrs = enabled_layer_names
            .iter()
            .map(|layer_name| layer_name.as_ptr())
            .collect::<Vec<_>>();

        // chained so instance creation and destruction are covered by the messenger too
        let mut debug_messenger_create_info = get_debug_messenger_create_info();

        let mut instance_create_info = InstanceCreateInfo::default()
            .application_info(&app_info)
            .enabled_extension_names(&enabled_extension_name_ptrs)
            .enabled_layer_names(&enabled_layer_name_ptrs);
        if enable_validations {
            instance_create_info = instance_create_info.push_next(&mut debug_messenger_create_info);
        }

        let instance = unsafe { entry.create_instance(&instance_create_info, None)? };
        debug!("Vulkan instance created");

        Ok(Self {
            instance,
            entry,
            validations_enabled: enable_validations,
        })
    }

    pub fn get_entry(&self) -> &Entry {
        &self.entry
    }

    pub fn validations_enabled(&self) -> bool {
        self.validations_enabled
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        debug!("Dropping Vulkan instance");
        unsafe { self.instance.destroy_instance(None) }
    }
}

impl Deref for Instance {
    type Target = ash::Instance;

    fn deref(&self) -> &Self::Target {
        &self.instance
    }
}

/// Returns the instance extensions Vulkan needs. These always include the extensions needed
/// to talk to the native windowing system, plus debug utils when validations are enabled.
pub fn required_instance_extensions<'a>(
    window_extensions: &[&'a CStr],
    enable_validations: bool,
) -> Vec<&'a CStr> {
    let mut extension_names = window_extensions.to_vec();
    if enable_validations && !extension_names.contains(&debug_utils::NAME) {
        extension_names.push(debug_utils::NAME);
    }
    extension_names
}

fn check_validation_layer_support(entry: &Entry) -> Result<()> {
    let available_layers = unsafe { entry.enumerate_instance_layer_properties()? };
    let found = available_layers
        .iter()
        .any(|layer| layer.layer_name_as_c_str().is_ok_and(|name| name == VALIDATION_LAYER));
    if !found {
        return Err(
            EngineError::MissingValidationLayer(VALIDATION_LAYER.to_string_lossy().into_owned())
                .into(),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_utils_added_only_with_validations() {
        let window_extensions = [c"VK_KHR_surface", c"VK_KHR_xlib_surface"];

        let without = required_instance_extensions(&window_extensions, false);
        assert_eq!(without, window_extensions.to_vec());

        let with = required_instance_extensions(&window_extensions, true);
        assert_eq!(with.len(), 3);
        assert_eq!(with.last(), Some(&debug_utils::NAME));
    }

    #[test]
    fn test_debug_utils_not_duplicated() {
        let window_extensions = [c"VK_KHR_surface", debug_utils::NAME];
        let extensions = required_instance_extensions(&window_extensions, true);
        assert_eq!(extensions.len(), 2);
    }
}
