// Copyright 2026 the Caldera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strategy-provider resolution: dynamic module loading with built-in
//! fallback.
//!
//! At initialization the manager resolves which provider variant is active,
//! once. The well-known strategy module is opened with `libloading` and its
//! factory symbol invoked; any failure along that path degrades to the
//! built-in GPU-only provider with a warning. The selection loop only ever
//! sees `&mut dyn StrategyProvider`.

#![allow(
    unsafe_code,
    reason = "provider modules are resolved through libloading"
)]

use caldera_core::strategy::{
    GpuOnlyStrategy, STRATEGY_ENTRY_POINT, STRATEGY_MODULE_NAME, StrategyProvider,
    StrategyProviderCreate,
};
use libloading::Library;
use thiserror::Error;
use tracing::{info, warn};

/// Why the external strategy module could not supply a provider.
///
/// Never surfaced to callers; logged at warning level before falling back.
#[derive(Debug, Error)]
enum ProviderLoadError {
    /// The module could not be opened.
    #[error("unable to load strategy module: {0}")]
    Library(libloading::Error),
    /// The module lacks the well-known factory symbol.
    #[error("strategy module lacks entry point: {0}")]
    Symbol(libloading::Error),
    /// The factory ran but reported failure.
    #[error("strategy provider factory reported failure")]
    Factory,
}

/// The resolved strategy provider, in one of its two variants.
pub(crate) enum ActiveProvider {
    /// An externally supplied implementation, optionally backed by a loaded
    /// module.
    External {
        /// Declared before `module`: the provider must drop before its
        /// backing module unloads.
        provider: Box<dyn StrategyProvider>,
        /// Keeps the backing module resident for the provider's lifetime.
        module: Option<Library>,
    },
    /// The built-in GPU-only fallback.
    Builtin(GpuOnlyStrategy),
}

impl core::fmt::Debug for ActiveProvider {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ActiveProvider")
            .field("variant", &self.label())
            .finish_non_exhaustive()
    }
}

impl ActiveProvider {
    /// Attempts to load the well-known strategy module, falling back to the
    /// built-in GPU-only provider on any failure. Never an error.
    pub(crate) fn load_or_default() -> Self {
        match Self::try_load() {
            Ok(active) => active,
            Err(err) => {
                warn!(
                    module = STRATEGY_MODULE_NAME,
                    error = %err,
                    "using built-in GPU-only composition"
                );
                Self::Builtin(GpuOnlyStrategy)
            }
        }
    }

    /// Wraps an explicitly supplied provider (no backing module).
    pub(crate) fn supplied(provider: Box<dyn StrategyProvider>) -> Self {
        Self::External {
            provider,
            module: None,
        }
    }

    fn try_load() -> Result<Self, ProviderLoadError> {
        let name = libloading::library_filename(STRATEGY_MODULE_NAME);

        // SAFETY: opening the well-known strategy module. Its only
        // obligation is the factory contract in `caldera_core::strategy`;
        // no other initialization runs on load.
        let module = unsafe { Library::new(&name) }.map_err(ProviderLoadError::Library)?;

        // SAFETY: the entry point, when present, has the
        // `StrategyProviderCreate` signature by contract.
        let symbol = unsafe { module.get::<StrategyProviderCreate>(STRATEGY_ENTRY_POINT) }
            .map_err(ProviderLoadError::Symbol)?;
        // Deref-copy the plain fn pointer out of the symbol; it stays valid
        // because the module handle is stored alongside the provider.
        let create: StrategyProviderCreate = *symbol;

        match create() {
            Some(provider) => {
                info!(module = STRATEGY_MODULE_NAME, "loaded strategy provider");
                Ok(Self::External {
                    provider,
                    module: Some(module),
                })
            }
            // `module` drops here: the library is released before the
            // caller falls back to the built-in provider.
            None => Err(ProviderLoadError::Factory),
        }
    }

    /// The active provider, whichever variant is resolved.
    pub(crate) fn provider_mut(&mut self) -> &mut dyn StrategyProvider {
        match self {
            Self::External { provider, .. } => provider.as_mut(),
            Self::Builtin(provider) => provider,
        }
    }

    /// Short variant label for diagnostics.
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::External { .. } => "external",
            Self::Builtin(_) => "builtin",
        }
    }
}

#[cfg(test)]
mod tests {
    use caldera_core::stack::{Composition, LayerStack};
    use caldera_core::strategy::StrategyConstraints;

    use super::*;

    #[test]
    fn load_falls_back_when_module_is_absent() {
        // No strategy module is installed in the test environment.
        let mut active = ActiveProvider::load_or_default();
        assert_eq!(active.label(), "builtin");

        let mut stack = LayerStack::new();
        let constraints = StrategyConstraints::default();
        assert!(
            active
                .provider_mut()
                .next_strategy(&constraints, &mut stack)
                .is_ok()
        );
    }

    #[test]
    fn supplied_provider_is_external() {
        let active = ActiveProvider::supplied(Box::new(GpuOnlyStrategy));
        assert_eq!(active.label(), "external");
    }

    #[test]
    fn builtin_composes_everything_on_gpu() {
        let mut active = ActiveProvider::Builtin(GpuOnlyStrategy);
        let mut stack = caldera_harness::layer_stack(4);
        let constraints = StrategyConstraints::default();
        active
            .provider_mut()
            .next_strategy(&constraints, &mut stack)
            .unwrap();
        assert_eq!(stack.count(Composition::Gpu), 4);
    }
}
