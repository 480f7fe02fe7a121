// SPDX-License-Identifier: MIT

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! hygiene-daemon: the orchestrator binary (`hygiened`). No in-process
//! scheduler of its own (§5 "concurrency externalized to processes") — one
//! tick loop invokes the fleet balancer and rescan scheduler in a single
//! logical thread, honors the control channel, and checkpoints periodically.

pub mod env;
pub mod lifecycle;
pub mod tick;

pub use lifecycle::{Config, DaemonState, LifecycleError};
pub use tick::run_tick;
