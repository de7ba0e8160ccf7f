// Copyright 2026 the Caldera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Display device categories, attributes, and set bookkeeping.

use alloc::collections::BTreeSet;
use core::fmt;

/// Enumerated display category.
///
/// Each category represents one logical display output with an independent
/// composition lifecycle. The coordination core tracks registration and
/// configuration per category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DeviceKind {
    /// The built-in primary panel.
    Primary,
    /// An external output (HDMI, DP, ...).
    External,
    /// A virtual display (writeback, casting).
    Virtual,
}

impl DeviceKind {
    /// Returns a short lowercase label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::External => "external",
            Self::Virtual => "virtual",
        }
    }
}

/// A set of [`DeviceKind`] values.
///
/// Used for the registered-displays and configured-displays bookkeeping that
/// drives the safe-mode invariant: safe mode holds exactly while the
/// configured set is a proper subset of the registered set.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeviceSet(BTreeSet<DeviceKind>);

impl DeviceSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeSet::new())
    }

    /// Adds `kind` to the set. Returns `true` if it was not already present.
    pub fn insert(&mut self, kind: DeviceKind) -> bool {
        self.0.insert(kind)
    }

    /// Removes `kind` from the set. Returns `true` if it was present.
    pub fn remove(&mut self, kind: DeviceKind) -> bool {
        self.0.remove(&kind)
    }

    /// Returns `true` if `kind` is in the set.
    #[must_use]
    pub fn contains(&self, kind: DeviceKind) -> bool {
        self.0.contains(&kind)
    }

    /// Returns the number of kinds in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns `true` if every kind in `self` is also in `other`.
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.0.is_subset(&other.0)
    }

    /// Iterates the kinds in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = DeviceKind> + '_ {
        self.0.iter().copied()
    }
}

impl fmt::Display for DeviceSet {
    /// Formats as `{primary,external}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, kind) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            f.write_str(kind.label())?;
        }
        f.write_str("}")
    }
}

impl FromIterator<DeviceKind> for DeviceSet {
    fn from_iter<I: IntoIterator<Item = DeviceKind>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Per-device attributes supplied at registration.
///
/// The coordination core forwards these to the resource manager unmodified
/// and reads only [`max_hw_layers`](Self::max_hw_layers) when refining
/// strategy constraints.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeviceAttributes {
    /// Active width in pixels.
    pub width: u32,
    /// Active height in pixels.
    pub height: u32,
    /// Refresh rate in millihertz (60 Hz = 60_000).
    pub refresh_millihz: u32,
    /// Maximum number of layers this device can route through dedicated
    /// compositing hardware in a single frame.
    pub max_hw_layers: u32,
}

impl Default for DeviceAttributes {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            refresh_millihz: 60_000,
            max_hw_layers: 4,
        }
    }
}

/// Hardware compositing topology, passed through to the resource manager at
/// initialization.
///
/// The coordination core never interprets these fields.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HwResourceInfo {
    /// Hardware block revision.
    pub hw_revision: u32,
    /// Number of blend units shared across devices.
    pub blend_units: u32,
    /// Number of scaler units shared across devices.
    pub scaler_units: u32,
    /// Number of writeback units.
    pub writeback_units: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_and_remove_report_membership_changes() {
        let mut set = DeviceSet::new();
        assert!(set.insert(DeviceKind::Primary));
        assert!(!set.insert(DeviceKind::Primary));
        assert!(set.contains(DeviceKind::Primary));
        assert!(set.remove(DeviceKind::Primary));
        assert!(!set.remove(DeviceKind::Primary));
        assert!(set.is_empty());
    }

    #[test]
    fn subset_relation() {
        let registered: DeviceSet = [DeviceKind::Primary, DeviceKind::External]
            .into_iter()
            .collect();
        let configured: DeviceSet = [DeviceKind::Primary].into_iter().collect();
        assert!(configured.is_subset(&registered));
        assert!(!registered.is_subset(&configured));
        // A set is a subset of itself.
        assert!(registered.is_subset(&registered));
    }

    #[test]
    fn display_lists_kinds_in_order() {
        use alloc::string::ToString;

        let set: DeviceSet = [DeviceKind::Virtual, DeviceKind::Primary]
            .into_iter()
            .collect();
        assert_eq!(set.to_string(), "{primary,virtual}");
        assert_eq!(DeviceSet::new().to_string(), "{}");
    }
}
