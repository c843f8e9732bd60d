// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request deadlines for collaborator calls.

use std::future::Future;
use std::time::Duration;

use crate::error::AutoboyError;

/// Run `fut` under a deadline; an elapsed deadline becomes [`AutoboyError::Timeout`].
pub async fn within<T, F>(duration: Duration, fut: F) -> Result<T, AutoboyError>
where
    F: Future<Output = Result<T, AutoboyError>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(AutoboyError::Timeout { duration }),
    }
}
