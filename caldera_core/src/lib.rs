// Copyright 2026 the Caldera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Data model and collaborator contracts for display-composition coordination.
//!
//! `caldera_core` defines the types exchanged between the coordination core
//! (`caldera_comp`) and its two collaborators: a *resource manager* that owns
//! the hardware compositing inventory, and a *strategy provider* that
//! enumerates candidate composition strategies. It is `no_std` compatible
//! (with `alloc`).
//!
//! # Architecture
//!
//! Per frame, per device, the coordination core drives this loop:
//!
//! ```text
//!   LayerStack ──► constraints ──► StrategyProvider::next_strategy()
//!                                        │ candidate written into stack
//!                                        ▼
//!                          ResourceManager::acquire()
//!                             │ ok            │ insufficient
//!                             ▼               └──► next candidate
//!                        selected strategy
//! ```
//!
//! **[`device`]** — Display categories, per-device attributes, the hardware
//! topology descriptor, and the set bookkeeping used for the safe-mode
//! invariant.
//!
//! **[`stack`]** — The per-frame layer list a client submits for
//! composition, including the per-layer strategy assignment written by the
//! provider and the downstream validation-failure flag.
//!
//! **[`strategy`]** — The [`StrategyProvider`](strategy::StrategyProvider)
//! capability, the built-in GPU-only fallback, and the dynamic
//! provider-module contract.
//!
//! **[`resources`]** — The [`ResourceManager`](resources::ResourceManager)
//! interface the coordination core consumes. Resource state has a single
//! writer: the resource manager itself.
//!
//! **[`error`]** — The small closed result taxonomy callers see.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod device;
pub mod error;
pub mod resources;
pub mod stack;
pub mod strategy;
