// Copyright 2026 the Caldera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scripted collaborator doubles for exercising the coordination core.
//!
//! [`FakeResourceManager`] and [`ScriptedStrategy`] implement the
//! collaborator contracts from `caldera_core` with behavior driven by
//! test-supplied scripts. Each double shares its state with the test
//! through a probe handle ([`RmProbe`], [`StrategyProbe`]), so the test can
//! keep scripting and observing after the double has moved into the
//! coordination core.

use std::collections::VecDeque;
use std::sync::Arc;

use caldera_core::device::{DeviceAttributes, DeviceKind, HwResourceInfo};
use caldera_core::error::CompError;
use caldera_core::resources::ResourceManager;
use caldera_core::stack::{Composition, Layer, LayerStack};
use caldera_core::strategy::{Exhausted, StrategyConstraints, StrategyProvider};
use kurbo::Rect;
use parking_lot::Mutex;

/// Builds a stack of `n` full-screen layers with no strategy assignment.
#[must_use]
pub fn layer_stack(n: usize) -> LayerStack {
    let r = Rect::new(0.0, 0.0, 1920.0, 1080.0);
    let mut stack = LayerStack::new();
    for _ in 0..n {
        stack.layers.push(Layer::new(r, r));
    }
    stack
}

// ---------------------------------------------------------------------------
// Resource-manager double
// ---------------------------------------------------------------------------

/// One observed resource-manager call, in call order.
///
/// Device-scoped events carry the token id they were invoked with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RmEvent {
    /// `init` was called.
    Init,
    /// `deinit` was called.
    Deinit,
    /// `register_device` was called for the given kind.
    Register(DeviceKind),
    /// `unregister_device` consumed the given token.
    Unregister(u32),
    /// `start` opened an attempt scope on the given token.
    Start(u32),
    /// `stop` closed the attempt scope on the given token.
    Stop(u32),
    /// `acquire` validated a candidate on the given token.
    Acquire(u32),
    /// `post_commit` finalized a frame on the given token.
    PostCommit(u32),
    /// `purge` released the given token's resources.
    Purge(u32),
}

#[derive(Debug, Default)]
struct RmState {
    events: Vec<RmEvent>,
    acquire_script: VecDeque<Result<(), CompError>>,
    init_error: Option<CompError>,
    register_error: Option<CompError>,
    next_token: u32,
}

/// Test-side handle to a [`FakeResourceManager`]'s shared state.
#[derive(Clone, Debug)]
pub struct RmProbe {
    state: Arc<Mutex<RmState>>,
}

impl RmProbe {
    /// Returns every call observed so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<RmEvent> {
        self.state.lock().events.clone()
    }

    /// Queues outcomes for upcoming `acquire` calls (FIFO). Calls beyond
    /// the script succeed.
    pub fn script_acquire<I>(&self, outcomes: I)
    where
        I: IntoIterator<Item = Result<(), CompError>>,
    {
        self.state.lock().acquire_script.extend(outcomes);
    }

    /// Makes the next `init` call fail with `err`.
    pub fn fail_init(&self, err: CompError) {
        self.state.lock().init_error = Some(err);
    }

    /// Makes the next `register_device` call fail with `err`.
    pub fn fail_next_register(&self, err: CompError) {
        self.state.lock().register_error = Some(err);
    }

    /// Returns how many `acquire` calls were observed.
    #[must_use]
    pub fn acquire_count(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|e| matches!(e, RmEvent::Acquire(_)))
            .count()
    }
}

/// Per-device token handed out by [`FakeResourceManager`].
#[derive(Debug, PartialEq, Eq)]
pub struct FakeToken(pub u32);

/// A scriptable [`ResourceManager`] that records every call.
#[derive(Debug, Default)]
pub struct FakeResourceManager {
    state: Arc<Mutex<RmState>>,
}

impl FakeResourceManager {
    /// Creates a double with an all-success script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a probe sharing this double's state.
    #[must_use]
    pub fn probe(&self) -> RmProbe {
        RmProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl ResourceManager for FakeResourceManager {
    type DeviceToken = FakeToken;

    fn init(&mut self, _info: &HwResourceInfo) -> Result<(), CompError> {
        let mut state = self.state.lock();
        state.events.push(RmEvent::Init);
        match state.init_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn deinit(&mut self) {
        self.state.lock().events.push(RmEvent::Deinit);
    }

    fn register_device(
        &mut self,
        kind: DeviceKind,
        _attrs: &DeviceAttributes,
    ) -> Result<Self::DeviceToken, CompError> {
        let mut state = self.state.lock();
        state.events.push(RmEvent::Register(kind));
        if let Some(err) = state.register_error.take() {
            return Err(err);
        }
        let token = FakeToken(state.next_token);
        state.next_token += 1;
        Ok(token)
    }

    fn unregister_device(&mut self, token: Self::DeviceToken) {
        self.state.lock().events.push(RmEvent::Unregister(token.0));
    }

    fn start(&mut self, token: &mut Self::DeviceToken) {
        self.state.lock().events.push(RmEvent::Start(token.0));
    }

    fn stop(&mut self, token: &mut Self::DeviceToken) {
        self.state.lock().events.push(RmEvent::Stop(token.0));
    }

    fn acquire(
        &mut self,
        token: &mut Self::DeviceToken,
        _stack: &mut LayerStack,
    ) -> Result<(), CompError> {
        let mut state = self.state.lock();
        state.events.push(RmEvent::Acquire(token.0));
        state.acquire_script.pop_front().unwrap_or(Ok(()))
    }

    fn post_commit(&mut self, token: &mut Self::DeviceToken, _stack: &mut LayerStack) {
        self.state.lock().events.push(RmEvent::PostCommit(token.0));
    }

    fn purge(&mut self, token: &mut Self::DeviceToken) {
        self.state.lock().events.push(RmEvent::Purge(token.0));
    }
}

// ---------------------------------------------------------------------------
// Strategy-provider double
// ---------------------------------------------------------------------------

/// One candidate strategy in a [`ScriptedStrategy`] script: route the first
/// `hardware_layers` layers through dedicated hardware, the rest to the GPU.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CandidatePlan {
    /// Layers assigned [`Composition::Hardware`], from the back.
    pub hardware_layers: usize,
}

impl CandidatePlan {
    /// The terminal fallback candidate: every layer on the GPU.
    pub const ALL_GPU: Self = Self { hardware_layers: 0 };

    /// Writes this candidate's assignments into `stack`.
    pub fn apply(self, stack: &mut LayerStack) {
        for (i, layer) in stack.layers.iter_mut().enumerate() {
            layer.composition = if i < self.hardware_layers {
                Composition::Hardware
            } else {
                Composition::Gpu
            };
        }
    }
}

#[derive(Debug, Default)]
struct StrategyState {
    script: VecDeque<CandidatePlan>,
    seen: Vec<StrategyConstraints>,
}

/// Test-side handle to a [`ScriptedStrategy`]'s shared state.
#[derive(Clone, Debug)]
pub struct StrategyProbe {
    state: Arc<Mutex<StrategyState>>,
}

impl StrategyProbe {
    /// Returns every constraint snapshot the provider was shown, in order.
    #[must_use]
    pub fn seen_constraints(&self) -> Vec<StrategyConstraints> {
        self.state.lock().seen.clone()
    }

    /// Queues further candidates onto the script.
    pub fn push_candidates<I>(&self, candidates: I)
    where
        I: IntoIterator<Item = CandidatePlan>,
    {
        self.state.lock().script.extend(candidates);
    }
}

/// A [`StrategyProvider`] that replays a fixed candidate script and records
/// the constraints it was shown. Reports [`Exhausted`] when the script runs
/// dry.
#[derive(Debug, Default)]
pub struct ScriptedStrategy {
    state: Arc<Mutex<StrategyState>>,
}

impl ScriptedStrategy {
    /// Creates a provider that will replay `candidates` in order.
    #[must_use]
    pub fn new<I>(candidates: I) -> Self
    where
        I: IntoIterator<Item = CandidatePlan>,
    {
        let provider = Self::default();
        provider.state.lock().script.extend(candidates);
        provider
    }

    /// Returns a probe sharing this provider's state.
    #[must_use]
    pub fn probe(&self) -> StrategyProbe {
        StrategyProbe {
            state: Arc::clone(&self.state),
        }
    }
}

impl StrategyProvider for ScriptedStrategy {
    fn next_strategy(
        &mut self,
        constraints: &StrategyConstraints,
        stack: &mut LayerStack,
    ) -> Result<(), Exhausted> {
        let mut state = self.state.lock();
        state.seen.push(*constraints);
        match state.script.pop_front() {
            Some(candidate) => {
                candidate.apply(stack);
                Ok(())
            }
            None => Err(Exhausted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_script_is_consumed_in_order() {
        let mut rm = FakeResourceManager::new();
        let probe = rm.probe();
        probe.script_acquire([Err(CompError::Resources), Ok(())]);

        let mut token = rm
            .register_device(DeviceKind::Primary, &DeviceAttributes::default())
            .unwrap();
        let mut stack = layer_stack(1);
        assert_eq!(
            rm.acquire(&mut token, &mut stack),
            Err(CompError::Resources)
        );
        assert_eq!(rm.acquire(&mut token, &mut stack), Ok(()));
        // Beyond the script, acquire succeeds.
        assert_eq!(rm.acquire(&mut token, &mut stack), Ok(()));
        assert_eq!(probe.acquire_count(), 3);
    }

    #[test]
    fn tokens_are_distinct_per_registration() {
        let mut rm = FakeResourceManager::new();
        let a = rm
            .register_device(DeviceKind::Primary, &DeviceAttributes::default())
            .unwrap();
        let b = rm
            .register_device(DeviceKind::External, &DeviceAttributes::default())
            .unwrap();
        assert_ne!(a.0, b.0);
    }

    #[test]
    fn scripted_strategy_exhausts_after_script() {
        let mut provider = ScriptedStrategy::new([
            CandidatePlan { hardware_layers: 2 },
            CandidatePlan::ALL_GPU,
        ]);
        let probe = provider.probe();
        let constraints = StrategyConstraints::default();
        let mut stack = layer_stack(3);

        assert!(provider.next_strategy(&constraints, &mut stack).is_ok());
        assert_eq!(stack.count(Composition::Hardware), 2);

        assert!(provider.next_strategy(&constraints, &mut stack).is_ok());
        assert_eq!(stack.count(Composition::Gpu), 3);

        assert_eq!(
            provider.next_strategy(&constraints, &mut stack),
            Err(Exhausted)
        );
        assert_eq!(probe.seen_constraints().len(), 3);
    }
}
