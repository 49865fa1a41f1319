//! # recordkit-cpal
//!
//! cpal capture backend for `recordkit-core`.
//!
//! Provides a [`PcmSource`](recordkit_core::source::PcmSource) implementation
//! over the host's default audio API plus input device enumeration. Plug
//! [`CpalSourceBuilder`] into `Recorder::new` to record from real hardware.

pub mod devices;
pub mod source;

pub use devices::list_input_devices;
pub use source::{CpalPcmSource, CpalSourceBuilder};
