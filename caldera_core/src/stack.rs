// Copyright 2026 the Caldera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame layer list submitted for composition.
//!
//! A client builds a [`LayerStack`] each frame and hands it to the
//! coordination core's prepare step. The strategy provider writes a
//! candidate strategy into the stack by assigning a [`Composition`] to each
//! layer; the resource manager then validates that assignment against the
//! hardware. After commit, a lower driver layer may raise
//! [`StackFlags::validation_failed`] on the stack it hands back for the next
//! frame, which forces the next attempt into safe mode.

use alloc::vec::Vec;

use kurbo::Rect;

/// How a single layer is composed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Composition {
    /// Not yet assigned by a strategy provider.
    #[default]
    Undefined,
    /// Composed by the GPU into the target surface.
    Gpu,
    /// Routed through a dedicated hardware compositing block.
    Hardware,
}

/// One layer submitted for composition.
#[derive(Clone, Debug)]
pub struct Layer {
    /// Source rectangle in buffer coordinates.
    pub src: Rect,
    /// Destination rectangle in device coordinates.
    pub dst: Rect,
    /// Plane opacity (0.0–1.0).
    pub opacity: f32,
    /// Strategy assignment, written by the provider.
    pub composition: Composition,
}

impl Layer {
    /// Creates an opaque layer with no strategy assignment.
    #[must_use]
    pub fn new(src: Rect, dst: Rect) -> Self {
        Self {
            src,
            dst,
            opacity: 1.0,
            composition: Composition::Undefined,
        }
    }
}

/// Per-frame feedback flags carried on the stack.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StackFlags {
    /// A previously selected strategy failed downstream driver validation.
    /// The next prepare attempt runs in safe mode regardless of global
    /// state.
    pub validation_failed: bool,
}

/// An ordered list of layers for a single frame on a single device,
/// back-to-front.
#[derive(Clone, Debug, Default)]
pub struct LayerStack {
    /// Layers in back-to-front order.
    pub layers: Vec<Layer>,
    /// Frame feedback flags.
    pub flags: StackFlags,
}

impl LayerStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many layers carry the given assignment.
    #[must_use]
    pub fn count(&self, composition: Composition) -> usize {
        self.layers
            .iter()
            .filter(|l| l.composition == composition)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_with(n: usize) -> LayerStack {
        let mut stack = LayerStack::new();
        for i in 0..n {
            let r = Rect::new(0.0, 0.0, 64.0, 64.0 + i as f64);
            stack.layers.push(Layer::new(r, r));
        }
        stack
    }

    #[test]
    fn new_layers_are_unassigned() {
        let stack = stack_with(3);
        assert_eq!(stack.count(Composition::Undefined), 3);
        assert_eq!(stack.count(Composition::Gpu), 0);
    }

    #[test]
    fn count_tracks_assignments() {
        let mut stack = stack_with(3);
        stack.layers[0].composition = Composition::Hardware;
        stack.layers[1].composition = Composition::Gpu;
        assert_eq!(stack.count(Composition::Hardware), 1);
        assert_eq!(stack.count(Composition::Gpu), 1);
        assert_eq!(stack.count(Composition::Undefined), 1);
    }
}
