use std::{
    ffi::{c_void, CStr},
    rc::Rc,
};

use anyhow::Result;
use ash::{
    ext::debug_utils,
    vk::{
        self, Bool32, DebugUtilsMessageSeverityFlagsEXT, DebugUtilsMessageTypeFlagsEXT,
        DebugUtilsMessengerCallbackDataEXT, DebugUtilsMessengerCreateInfoEXT,
        DebugUtilsMessengerEXT,
    },
};
use tracing::{debug, event, Level};

use crate::Instance;

/// Routes validation layer messages into the logging facade by severity.
pub unsafe extern "system" fn vulkan_debug_utils_callback(
    message_severity: DebugUtilsMessageSeverityFlagsEXT,
    message_type: DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const DebugUtilsMessengerCallbackDataEXT<'_>,
    _p_user_data: *mut c_void,
) -> Bool32 {
    if p_callback_data.is_null() || (*p_callback_data).p_message.is_null() {
        return vk::FALSE;
    }
    let message = CStr::from_ptr((*p_callback_data).p_message).to_string_lossy();
    let ty = format!("{:?}", message_type).to_lowercase();

    match message_severity {
        DebugUtilsMessageSeverityFlagsEXT::VERBOSE => {
            event!(Level::TRACE, message = %message, ty = %ty)
        }
        DebugUtilsMessageSeverityFlagsEXT::INFO => {
            event!(Level::INFO, message = %message, ty = %ty)
        }
        DebugUtilsMessageSeverityFlagsEXT::WARNING => {
            event!(Level::WARN, message = %message, ty = %ty)
        }
        DebugUtilsMessageSeverityFlagsEXT::ERROR => {
            event!(Level::ERROR, message = %message, ty = %ty)
        }
        _ => event!(Level::DEBUG, message = %message, ty = %ty),
    }
    // dont skip driver
    vk::FALSE
}

/// Messenger settings shared by instance creation and the standalone messenger.
pub fn get_debug_messenger_create_info() -> DebugUtilsMessengerCreateInfoEXT<'static> {
    DebugUtilsMessengerCreateInfoEXT::default()
        .message_severity(
            DebugUtilsMessageSeverityFlagsEXT::VERBOSE
                | DebugUtilsMessageSeverityFlagsEXT::INFO
                | DebugUtilsMessageSeverityFlagsEXT::WARNING
                | DebugUtilsMessageSeverityFlagsEXT::ERROR,
        )
        .message_type(
            DebugUtilsMessageTypeFlagsEXT::GENERAL
                | DebugUtilsMessageTypeFlagsEXT::VALIDATION
                | DebugUtilsMessageTypeFlagsEXT::PERFORMANCE,
        )
        .pfn_user_callback(Some(vulkan_debug_utils_callback))
}

/// The registered debug messenger, unregistered on drop.
pub struct DebugUtils {
    debug_utils_fn: debug_utils::Instance,
    messenger: DebugUtilsMessengerEXT,
    _instance: Rc<Instance>,
}

impl DebugUtils {
    pub fn new(instance: &Rc<Instance>) -> Result<Self> {
        debug!("Creating debug messenger");
        let debug_utils_fn = debug_utils::Instance::new(instance.get_entry(), instance);
        let messenger = unsafe {
            debug_utils_fn.create_debug_utils_messenger(&get_debug_messenger_create_info(), None)?
        };
        Ok(Self {
            debug_utils_fn,
            messenger,
            _instance: Rc::clone(instance),
        })
    }
}

impl Drop for DebugUtils {
    fn drop(&mut self) {
        debug!("Dropping debug messenger");
        unsafe {
            self.debug_utils_fn
                .destroy_debug_utils_messenger(self.messenger, None)
        }
    }
}
