// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Outbound request budget shared by all web providers

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovRateLimiter};
use std::num::NonZeroU32;

use super::types::SearchError;

const DEFAULT_REQUESTS_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(60) {
    Some(n) => n,
    None => unreachable!(),
};

pub struct SearchRateLimiter {
    limiter: GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    requests_per_minute: u32,
}

impl SearchRateLimiter {
    /// Zero falls back to 60 requests per minute
    pub fn new(requests_per_minute: u32) -> Self {
        let rpm = NonZeroU32::new(requests_per_minute).unwrap_or(DEFAULT_REQUESTS_PER_MINUTE);

        Self {
            limiter: GovRateLimiter::direct(Quota::per_minute(rpm)),
            requests_per_minute: rpm.get(),
        }
    }

    /// Take one request from the budget, or fail without waiting
    pub fn check(&self) -> Result<(), SearchError> {
        self.limiter
            .check()
            .map_err(|_| SearchError::RateLimited {
                retry_after_secs: (60 / self.requests_per_minute.max(1)).max(1) as u64,
            })
    }

    pub fn requests_per_minute(&self) -> u32 {
        self.requests_per_minute
    }
}
