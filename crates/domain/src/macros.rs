//! Macro for implementing the [`Callback`](crate::callback::Callback) trait
//!
//! Every callback variant is a thin typed view over a
//! [`RawCallback`](crate::callback::RawCallback) stored in a field named
//! `raw`. This macro generates the object-safe plumbing (raw access,
//! downcasting, boxed cloning) and the [`CallbackVariant`] registration
//! hook so variant modules only carry their typed accessors.
//!
//! # Example
//!
//! ```rust
//! use authtree_domain::callback::{CallbackError, RawCallback};
//! use authtree_domain::impl_callback;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! pub struct DeviceProfileCallback {
//!     raw: RawCallback,
//! }
//!
//! impl_callback!(DeviceProfileCallback, "DeviceProfileCallback", |raw| {
//!     raw.require_inputs(1)?;
//!     Ok(DeviceProfileCallback { raw })
//! });
//! ```
//!
//! [`CallbackVariant`]: crate::callback::CallbackVariant

/// Implements `Callback` and `CallbackVariant` for a struct with a `raw`
/// field.
///
/// # Arguments
///
/// * `$ty` - The variant struct
/// * `$wire` - The wire `type` discriminant
/// * `|$raw| $body` - Constructor validating the raw payload
#[macro_export]
macro_rules! impl_callback {
    ($ty:ident, $wire:expr, |$raw:ident| $body:block) => {
        impl $crate::callback::Callback for $ty {
            fn raw(&self) -> &$crate::callback::RawCallback {
                &self.raw
            }

            fn raw_mut(&mut self) -> &mut $crate::callback::RawCallback {
                &mut self.raw
            }

            fn as_any(&self) -> &dyn std::any::Any {
                self
            }

            fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
                self
            }

            fn clone_box(&self) -> Box<dyn $crate::callback::Callback> {
                Box::new(self.clone())
            }
        }

        impl $crate::callback::CallbackVariant for $ty {
            const TYPE: &'static str = $wire;

            fn from_raw(
                $raw: $crate::callback::RawCallback,
            ) -> std::result::Result<Self, $crate::callback::CallbackError> {
                $body
            }
        }
    };
}
