// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod atomic;

pub use atomic::{write_atomic, write_new};
