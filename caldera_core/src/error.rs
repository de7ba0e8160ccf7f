// Copyright 2026 the Caldera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The result taxonomy callers see from coordination operations.

use thiserror::Error;

/// Errors surfaced by the coordination core and its collaborators.
///
/// Internal retry and fallback logic is invisible to callers except through
/// logs; every operation resolves to success or one of these values.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Hash)]
pub enum CompError {
    /// Device-record allocation failed. No partial state is left behind.
    #[error("device record allocation failed")]
    OutOfMemory,

    /// The hardware cannot support the candidate strategy right now.
    ///
    /// Inside the strategy-selection loop this is recovered by advancing to
    /// the next candidate; it reaches callers only from resource managers
    /// used directly.
    #[error("insufficient hardware resources for candidate strategy")]
    Resources,

    /// The device handle refers to a slot that has been unregistered (or was
    /// never allocated). Using a handle after unregistration is detected,
    /// not undefined.
    #[error("stale or unknown device handle")]
    StaleDevice,

    /// The strategy provider ran out of candidates before any acquisition
    /// succeeded.
    ///
    /// By contract the terminal fallback candidate has no hardware resource
    /// requirements, so this indicates a defect in the provider or the
    /// resource manager. Callers should treat the frame as lost.
    #[error("composition strategies exhausted")]
    StrategiesExhausted,

    /// The resource manager rejected the hardware description.
    #[error("unsupported hardware description")]
    Unsupported,
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn display_names_the_failure() {
        assert_eq!(
            CompError::StrategiesExhausted.to_string(),
            "composition strategies exhausted"
        );
        assert_eq!(
            CompError::StaleDevice.to_string(),
            "stale or unknown device handle"
        );
    }
}
