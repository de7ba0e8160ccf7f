// Copyright 2026 the Caldera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The strategy-provider capability and the dynamic provider-module
//! contract.
//!
//! A strategy provider enumerates candidate composition strategies for one
//! prepare attempt, in a fixed priority order: strategies that offload the
//! most layers to dedicated hardware first, pure GPU composition last. The
//! terminal GPU-only candidate has no hardware resource requirements, which
//! is what makes the coordination core's selection loop terminate.
//!
//! Providers come in exactly two variants: an externally supplied module
//! loaded at initialization (see the module-contract items below) and the
//! built-in [`GpuOnlyStrategy`] fallback. The selection loop never needs to
//! know which variant is active.

use alloc::boxed::Box;

use thiserror::Error;

use crate::stack::{Composition, LayerStack};

/// Per-attempt inputs to strategy selection.
///
/// Recomputed fresh for every prepare call; never persisted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StrategyConstraints {
    /// Only minimal-resource strategies may be proposed. Set while resource
    /// validity across the registered device set is unconfirmed, or when the
    /// previous frame's strategy failed downstream validation.
    pub safe_mode: bool,
    /// Upper bound on layers this device may route through dedicated
    /// hardware for this attempt.
    pub max_layers: u32,
}

/// The provider has no further candidates for this attempt.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("strategy candidates exhausted")]
pub struct Exhausted;

/// Produces successive candidate composition strategies.
///
/// `Send` is required because providers are owned by the coordination core,
/// which is shared across caller threads behind its serializing lock.
pub trait StrategyProvider: Send {
    /// Writes the next candidate strategy into `stack` (assigning a
    /// [`Composition`] to every layer), or reports [`Exhausted`].
    ///
    /// Candidates must be produced in fixed priority order ending in a
    /// strategy with no hardware resource requirements. When
    /// [`StrategyConstraints::safe_mode`] is set, only minimal-resource
    /// candidates may be proposed.
    fn next_strategy(
        &mut self,
        constraints: &StrategyConstraints,
        stack: &mut LayerStack,
    ) -> Result<(), Exhausted>;
}

/// The built-in fallback provider: GPU composition for every layer.
///
/// The GPU-only candidate is its own terminal fallback, so this provider
/// never reports exhaustion.
#[derive(Clone, Copy, Debug, Default)]
pub struct GpuOnlyStrategy;

impl StrategyProvider for GpuOnlyStrategy {
    fn next_strategy(
        &mut self,
        _constraints: &StrategyConstraints,
        stack: &mut LayerStack,
    ) -> Result<(), Exhausted> {
        for layer in &mut stack.layers {
            layer.composition = Composition::Gpu;
        }
        Ok(())
    }
}

/// Well-known base name of the loadable strategy module
/// (`libcaldera_strategy.so` / `caldera_strategy.dll` per platform).
pub const STRATEGY_MODULE_NAME: &str = "caldera_strategy";

/// Well-known factory symbol exported by a strategy module.
pub const STRATEGY_ENTRY_POINT: &[u8] = b"caldera_strategy_provider";

/// Signature of the factory behind [`STRATEGY_ENTRY_POINT`].
///
/// Returns `None` when the module cannot produce a provider (the loader
/// then releases the module and falls back to [`GpuOnlyStrategy`]). This is
/// a Rust-ABI contract: modules must be built with the same toolchain as
/// the host.
pub type StrategyProviderCreate = fn() -> Option<Box<dyn StrategyProvider>>;

#[cfg(test)]
mod tests {
    use alloc::vec;

    use kurbo::Rect;

    use super::*;
    use crate::stack::Layer;

    #[test]
    fn gpu_only_assigns_every_layer() {
        let r = Rect::new(0.0, 0.0, 100.0, 100.0);
        let mut stack = LayerStack {
            layers: vec![Layer::new(r, r), Layer::new(r, r)],
            ..LayerStack::default()
        };
        let mut provider = GpuOnlyStrategy;

        let constraints = StrategyConstraints::default();
        assert!(provider.next_strategy(&constraints, &mut stack).is_ok());
        assert_eq!(stack.count(Composition::Gpu), stack.layers.len());
    }

    #[test]
    fn gpu_only_never_exhausts() {
        let mut stack = LayerStack::new();
        let mut provider = GpuOnlyStrategy;
        let constraints = StrategyConstraints {
            safe_mode: true,
            max_layers: 0,
        };
        for _ in 0..8 {
            assert!(provider.next_strategy(&constraints, &mut stack).is_ok());
        }
    }
}
