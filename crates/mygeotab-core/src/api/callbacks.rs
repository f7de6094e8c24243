use std::future::Future;

use super::ApiError;

type SuccessHook<'a, T> = Box<dyn FnOnce(&T) + Send + 'a>;
type ErrorHook<'a> = Box<dyn FnOnce(&ApiError) + Send + 'a>;

/// Callback-style adapter over the async API.
///
/// ```no_run
/// # async fn demo(api: mygeotab_core::ApiClient) {
/// use mygeotab_core::Callbacks;
/// use serde_json::json;
///
/// let _ = Callbacks::new()
///     .on_success(|devices: &serde_json::Value| println!("{}", devices))
///     .on_error(|e| eprintln!("{}", e))
///     .attach(api.call("Get", json!({"typeName": "Device"})))
///     .await;
/// # }
/// ```
pub struct Callbacks<'a, T> {
    on_success: Option<SuccessHook<'a, T>>,
    on_error: Option<ErrorHook<'a>>,
}

impl<T> Default for Callbacks<'_, T> {
    fn default() -> Self {
        Self {
            on_success: None,
            on_error: None,
        }
    }
}

impl<'a, T> Callbacks<'a, T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_success(mut self, f: impl FnOnce(&T) + Send + 'a) -> Self {
        self.on_success = Some(Box::new(f));
        self
    }

    pub fn on_error(mut self, f: impl FnOnce(&ApiError) + Send + 'a) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    /// Await `call`, hand its outcome to the matching hook, and return the
    /// outcome unchanged.
    pub async fn attach<F>(self, call: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        let result = call.await;
        match &result {
            Ok(value) => {
                if let Some(hook) = self.on_success {
                    hook(value);
                }
            }
            Err(e) => {
                if let Some(hook) = self.on_error {
                    hook(e);
                }
            }
        }
        result
    }
}
