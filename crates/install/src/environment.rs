// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

/// Max concurrency for in-flight fetches (spec §4.5 "global semaphore").
pub const MAX_NETWORK_CONCURRENCY: usize = 5;
/// Retry attempts per fetch, including the first (spec §4.5).
pub const MAX_FETCH_ATTEMPTS: u32 = 3;
/// Base delay for exponential backoff between retries.
pub const RETRY_BASE_DELAY: std::time::Duration = std::time::Duration::from_secs(1);
/// Total per-fetch timeout (spec §5 "Timeouts").
pub const FETCH_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
