// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;
use triage_bus::BusError;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("bus error: {0}")]
    Bus(#[from] BusError),
    #[error("malformed queue payload: {0}")]
    Payload(#[from] serde_json::Error),
}
