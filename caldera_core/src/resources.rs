// Copyright 2026 the Caldera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The resource-manager interface the coordination core consumes.
//!
//! The resource manager is the sole owner of hardware resource state. The
//! coordination core never mutates resources directly; it only brackets
//! selection attempts with [`start`](ResourceManager::start) /
//! [`stop`](ResourceManager::stop) and asks for validation through
//! [`acquire`](ResourceManager::acquire). This keeps a single-writer
//! invariant on the resource inventory.

use crate::device::{DeviceAttributes, DeviceKind, HwResourceInfo};
use crate::error::CompError;
use crate::stack::LayerStack;

/// Owns the hardware compositing inventory and validates candidate
/// strategies against it.
///
/// All calls are made with the coordination core's lock held, so
/// implementations see strictly serialized access.
pub trait ResourceManager {
    /// The manager's own per-device handle. Returned by
    /// [`register_device`](Self::register_device), held by the coordination
    /// core's device record, and passed back by value on unregistration.
    type DeviceToken;

    /// Initializes the manager with the hardware topology.
    ///
    /// Called exactly once, before any other method.
    fn init(&mut self, info: &HwResourceInfo) -> Result<(), CompError>;

    /// Releases all resource state. Called exactly once, last.
    fn deinit(&mut self);

    /// Registers a device and returns its token.
    fn register_device(
        &mut self,
        kind: DeviceKind,
        attrs: &DeviceAttributes,
    ) -> Result<Self::DeviceToken, CompError>;

    /// Releases everything held for the device and consumes its token.
    fn unregister_device(&mut self, token: Self::DeviceToken);

    /// Opens a resource-selection attempt scope for the device. Tentative
    /// reservations made by [`acquire`](Self::acquire) calls live inside
    /// this scope.
    fn start(&mut self, token: &mut Self::DeviceToken);

    /// Closes the attempt scope opened by [`start`](Self::start). Invoked
    /// on every prepare outcome, success or not.
    fn stop(&mut self, token: &mut Self::DeviceToken);

    /// Validates and tentatively reserves resources for the candidate
    /// strategy currently written in `stack`.
    ///
    /// On failure the implementation must roll back that candidate's
    /// tentative reservations before returning; the coordination core then
    /// retries with the next candidate without closing the attempt scope.
    fn acquire(
        &mut self,
        token: &mut Self::DeviceToken,
        stack: &mut LayerStack,
    ) -> Result<(), CompError>;

    /// Finalizes resource bookkeeping for a committed frame (tentative
    /// reservations become steady-state use).
    fn post_commit(&mut self, token: &mut Self::DeviceToken, stack: &mut LayerStack);

    /// Releases resources held by the device outside the normal
    /// prepare/commit cycle (e.g. on device disable).
    fn purge(&mut self, token: &mut Self::DeviceToken);
}
