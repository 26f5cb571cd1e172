// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! triage-locks: keyed exclusive locks with TTL, priority-ordered waiter
//! queues, stale-holder eviction, and deadlock detection (Component B, §4.B,
//! §5). State lives entirely in memory: waiters are in-process futures, so
//! nothing here needs to survive a process restart.

mod deadlock;
mod error;
mod manager;
mod process;
mod waiter;

pub use deadlock::detect_cycle;
pub use error::LockError;
pub use manager::{AcquireOpts, LockGuard, LockManager};
pub use process::{ProcessChecker, UnixProcessChecker};
pub use waiter::WaiterTicket;
