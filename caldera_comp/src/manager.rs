// Copyright 2026 the Caldera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Device lifecycle, safe-mode bookkeeping, and the strategy-selection
//! loop.

use core::fmt;
use core::fmt::Write as _;

use caldera_core::device::{DeviceAttributes, DeviceKind, DeviceSet, HwResourceInfo};
use caldera_core::error::CompError;
use caldera_core::resources::ResourceManager;
use caldera_core::stack::LayerStack;
use caldera_core::strategy::{StrategyConstraints, StrategyProvider};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::dump::CappedWriter;
use crate::loader::ActiveProvider;
use crate::registry::{DeviceId, DeviceTable};

/// Everything the manager tracks for one registered device.
struct DeviceRecord<R: ResourceManager> {
    kind: DeviceKind,
    attrs: DeviceAttributes,
    /// The resource manager's handle for this device, referenced on every
    /// per-device call and returned on unregistration.
    token: R::DeviceToken,
    /// Per-attempt constraint snapshot, recomputed by every prepare.
    constraints: StrategyConstraints,
}

struct Inner<R: ResourceManager> {
    res: R,
    provider: ActiveProvider,
    devices: DeviceTable<DeviceRecord<R>>,
    registered: DeviceSet,
    configured: DeviceSet,
    safe_mode: bool,
}

/// Coordinates composition-strategy selection and shared compositing
/// resources across display devices.
///
/// # Safe mode
///
/// Safe mode is a cross-device state: it is set whenever a device joins the
/// registered set (its resource impact is unvalidated for *every* device)
/// and cleared only when the configured set (devices whose most recent
/// frame committed successfully) again equals the registered set. While
/// set, strategy constraints steer every device toward minimal-resource
/// composition. `configured ⊆ registered` holds after every operation.
///
/// # Locking
///
/// One mutex serializes the entire public surface. Every entry point holds
/// it for the full call, so no read of the registered/configured sets or
/// the safe-mode flag is ever concurrent with a write. Frame preparation
/// for multiple displays is therefore not pipelined by this layer, and
/// collaborator callbacks must not reenter the manager.
///
/// # Usage
///
/// ```rust,ignore
/// let comp = CompManager::init(res_manager, &hw_info)?;
/// let device = comp.register_device(DeviceKind::Primary, &attrs)?;
/// loop {
///     let mut stack = build_layer_stack();
///     comp.prepare(device, &mut stack)?;
///     comp.post_prepare(device, &mut stack)?;
///     // ... commit the selected strategy to hardware ...
///     comp.post_commit(device, &mut stack)?;
/// }
/// ```
pub struct CompManager<R: ResourceManager> {
    inner: Mutex<Inner<R>>,
}

impl<R: ResourceManager> fmt::Debug for CompManager<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompManager").finish_non_exhaustive()
    }
}

impl<R: ResourceManager> CompManager<R> {
    /// Initializes the resource manager with the hardware topology, then
    /// resolves the strategy provider: the well-known strategy module if it
    /// loads, the built-in GPU-only provider otherwise.
    ///
    /// Fails only if resource-manager initialization fails; provider
    /// loading degrades with a warning and is never an error. On failure no
    /// provider loading is attempted.
    pub fn init(mut res: R, info: &HwResourceInfo) -> Result<Self, CompError> {
        res.init(info)?;
        let provider = ActiveProvider::load_or_default();
        info!(provider = provider.label(), "composition coordination ready");
        Ok(Self::assemble(res, provider))
    }

    /// Like [`init`](Self::init), but with an explicitly supplied strategy
    /// provider instead of the module-loading path.
    pub fn with_provider(
        mut res: R,
        info: &HwResourceInfo,
        provider: Box<dyn StrategyProvider>,
    ) -> Result<Self, CompError> {
        res.init(info)?;
        Ok(Self::assemble(res, ActiveProvider::supplied(provider)))
    }

    fn assemble(res: R, provider: ActiveProvider) -> Self {
        Self {
            inner: Mutex::new(Inner {
                res,
                provider,
                devices: DeviceTable::new(),
                registered: DeviceSet::new(),
                configured: DeviceSet::new(),
                safe_mode: false,
            }),
        }
    }

    /// Tears down the resource manager and releases the strategy provider
    /// (unloading its module, if one was loaded).
    ///
    /// Consumes the manager; a second deinit, or any call after deinit,
    /// is impossible by construction.
    pub fn deinit(self) {
        let mut inner = self.inner.into_inner();
        inner.res.deinit();
    }

    /// Registers a display device and returns its handle.
    ///
    /// On success the device's kind joins the registered set and safe mode
    /// is set unconditionally: the new device's resource impact is
    /// unvalidated across the whole set, so every device re-validates under
    /// safe mode until the full set configures cleanly again.
    ///
    /// Failure is atomic: allocation failure surfaces as
    /// [`CompError::OutOfMemory`] and resource-manager rejection is
    /// propagated, in both cases with registry state unchanged.
    ///
    /// One live device per kind is the supported usage; registering a
    /// second device of an already-registered kind shares that kind's
    /// membership in the registered/configured sets.
    pub fn register_device(
        &self,
        kind: DeviceKind,
        attrs: &DeviceAttributes,
    ) -> Result<DeviceId, CompError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        // Reserve the record slot first so the resource manager is never
        // asked to unwind an allocation failure.
        inner.devices.ensure_free_slot()?;
        let token = inner.res.register_device(kind, attrs)?;
        let id = inner.devices.insert(DeviceRecord {
            kind,
            attrs: *attrs,
            token,
            constraints: StrategyConstraints::default(),
        });
        inner.registered.insert(kind);
        inner.safe_mode = true;

        debug!(device = ?id, kind = kind.label(), "registered display device");
        Ok(id)
    }

    /// Unregisters a device, releasing its resources and clearing its kind
    /// from both the registered and configured sets.
    ///
    /// Removal never touches safe mode: it only reduces what must be
    /// re-validated.
    pub fn unregister_device(&self, device: DeviceId) -> Result<(), CompError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let record = inner
            .devices
            .remove(device)
            .ok_or(CompError::StaleDevice)?;
        inner.res.unregister_device(record.token);
        inner.registered.remove(record.kind);
        inner.configured.remove(record.kind);

        debug!(device = ?device, kind = record.kind.label(), "unregistered display device");
        Ok(())
    }

    /// Selects a composition strategy for the frame in `stack` and acquires
    /// hardware resources for it.
    ///
    /// Candidates are taken from the active provider in priority order;
    /// each is validated through the resource manager inside one
    /// start/stop attempt scope. A rejected candidate is discarded and the
    /// next one tried. The terminal GPU-only candidate has no resource
    /// requirements, so a conforming provider/resource-manager pair always
    /// converges; provider exhaustion before convergence is a defect and
    /// surfaces as [`CompError::StrategiesExhausted`]. The attempt scope is
    /// closed on every outcome.
    pub fn prepare(&self, device: DeviceId, stack: &mut LayerStack) -> Result<(), CompError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let record = inner
            .devices
            .get_mut(device)
            .ok_or(CompError::StaleDevice)?;
        prepare_constraints(inner.safe_mode, record, stack);

        let provider = inner.provider.provider_mut();
        inner.res.start(&mut record.token);
        let mut outcome = Ok(());
        loop {
            if provider.next_strategy(&record.constraints, stack).is_err() {
                // By contract the fallback candidate is always acquirable;
                // running dry means the provider or resource manager is
                // defective. Not retried.
                error!(device = ?device, "composition strategies exhausted");
                outcome = Err(CompError::StrategiesExhausted);
                break;
            }

            match inner.res.acquire(&mut record.token, stack) {
                Ok(()) => break,
                Err(err) => {
                    debug!(device = ?device, error = %err, "candidate rejected, trying next");
                }
            }
        }
        inner.res.stop(&mut record.token);

        outcome
    }

    /// Post-selection hook between [`prepare`](Self::prepare) and commit.
    ///
    /// Validates the handle and serializes with the other entry points;
    /// otherwise an extension point for strategy-specific adjustment.
    pub fn post_prepare(&self, device: DeviceId, stack: &mut LayerStack) -> Result<(), CompError> {
        let guard = self.inner.lock();
        guard.devices.get(device).ok_or(CompError::StaleDevice)?;
        let _ = stack;
        Ok(())
    }

    /// Finalizes a committed frame: the device's kind joins the configured
    /// set, safe mode clears once the configured set equals the registered
    /// set, and the resource manager moves the frame's reservations to
    /// steady state.
    pub fn post_commit(&self, device: DeviceId, stack: &mut LayerStack) -> Result<(), CompError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let record = inner
            .devices
            .get_mut(device)
            .ok_or(CompError::StaleDevice)?;
        inner.configured.insert(record.kind);
        if inner.configured == inner.registered {
            inner.safe_mode = false;
            debug!("all registered displays configured, safe mode cleared");
        }
        inner.res.post_commit(&mut record.token, stack);
        Ok(())
    }

    /// Releases resources held by the device outside the prepare/commit
    /// cycle. Registered/configured membership is untouched.
    pub fn purge(&self, device: DeviceId) -> Result<(), CompError> {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let record = inner
            .devices
            .get_mut(device)
            .ok_or(CompError::StaleDevice)?;
        inner.res.purge(&mut record.token);
        Ok(())
    }

    /// Returns whether safe mode is currently in force.
    #[must_use]
    pub fn safe_mode(&self) -> bool {
        self.inner.lock().safe_mode
    }

    /// Returns a snapshot of the registered display kinds.
    #[must_use]
    pub fn registered_displays(&self) -> DeviceSet {
        self.inner.lock().registered.clone()
    }

    /// Returns a snapshot of the configured display kinds.
    #[must_use]
    pub fn configured_displays(&self) -> DeviceSet {
        self.inner.lock().configured.clone()
    }

    /// Appends a human-readable status snapshot to `buf`, never appending
    /// more than `capacity` bytes.
    ///
    /// Safe to call at any time; the format is for diagnostics only and not
    /// stable.
    pub fn append_dump(&self, buf: &mut String, capacity: usize) {
        let inner = self.inner.lock();
        let mut w = CappedWriter::new(buf, capacity);
        let _ = writeln!(
            w,
            "comp: safe_mode={} registered={} configured={} provider={}",
            inner.safe_mode,
            inner.registered,
            inner.configured,
            inner.provider.label(),
        );
        for (id, record) in inner.devices.iter() {
            let _ = writeln!(
                w,
                "device {:?}: kind={} {}x{}@{}mHz max_hw_layers={}",
                id,
                record.kind.label(),
                record.attrs.width,
                record.attrs.height,
                record.attrs.refresh_millihz,
                record.attrs.max_hw_layers,
            );
        }
    }
}

/// Computes the per-attempt constraint snapshot for one device.
///
/// Invoked only while the manager lock is held; never reacquires it, and
/// never touches global state.
fn prepare_constraints<R: ResourceManager>(
    safe_mode: bool,
    record: &mut DeviceRecord<R>,
    stack: &LayerStack,
) {
    let constraints = &mut record.constraints;
    *constraints = StrategyConstraints::default();
    constraints.safe_mode = safe_mode;
    if stack.flags.validation_failed {
        // The previously selected strategy failed driver validation; force
        // this attempt to minimal-resource composition and skip further
        // refinement.
        constraints.safe_mode = true;
        return;
    }
    constraints.max_layers = record.attrs.max_hw_layers;
}
