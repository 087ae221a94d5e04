//! Platform plugin system.
//!
//! Each chat platform (Discord, Guilded, Matrix, ...) is bridged by an adapter
//! implementing the [`Plugin`] capability trait. Adapters report native
//! activity back to the core through a [`PluginHandle`]; the core owns the
//! [`PluginRegistry`] and never lets plugins touch its state directly.

pub mod error;
pub mod events;
pub mod plugin;
pub mod registry;

pub use {
    error::{Error, Result},
    events::{PluginEnvelope, PluginEvent, PluginEventReceiver, PluginHandle, event_channel},
    plugin::{BridgePlatform, BridgeStatus, BridgeTarget, PROTOCOL_VERSION, Plugin},
    registry::PluginRegistry,
};
