//! Platform local-notification capability.
//!
//! The store only ever *requests* an immediate, fire-and-forget alert. A
//! failed request is logged by the caller and never turned into an error for
//! the operation that triggered it.

use std::ffi::CString;
use std::os::raw::c_char;

use log::info;

use crate::app_response::AppResponse;
use crate::movie_model::LocalAlert;

pub trait Notifier: Send + Sync {
    fn schedule(&self, alert: &LocalAlert) -> Result<(), AppResponse>;
}

/// Notifier that only writes the alert to the log. Used until the host
/// registers a platform scheduler.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn schedule(&self, alert: &LocalAlert) -> Result<(), AppResponse> {
        info!("Local alert (no scheduler registered): {} | {}", alert.title, alert.body);
        Ok(())
    }
}

/// Host callback: receives the alert title and body as NUL-terminated UTF-8
/// strings that are only valid for the duration of the call. Returns `true`
/// when the platform accepted the request.
pub type NotifyCallback = extern "C" fn(title: *const c_char, body: *const c_char) -> bool;

/// Notifier forwarding to a host-registered C callback.
#[derive(Debug, Clone, Copy)]
pub struct CallbackNotifier {
    callback: NotifyCallback,
}

impl CallbackNotifier {
    pub fn new(callback: NotifyCallback) -> Self {
        CallbackNotifier { callback }
    }
}

impl Notifier for CallbackNotifier {
    fn schedule(&self, alert: &LocalAlert) -> Result<(), AppResponse> {
        let title = CString::new(alert.title.as_str())
            .map_err(|e| AppResponse::BadRequest(format!("Alert title contains NUL: {e}")))?;
        let body = CString::new(alert.body.as_str())
            .map_err(|e| AppResponse::BadRequest(format!("Alert body contains NUL: {e}")))?;

        if (self.callback)(title.as_ptr(), body.as_ptr()) {
            Ok(())
        } else {
            Err(AppResponse::PlatformError("Notification scheduler rejected the request".to_string()))
        }
    }
}
