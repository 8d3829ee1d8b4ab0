// SPDX-FileCopyrightText: 2026 Leadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded waits for calls that leave the process.

use std::future::Future;
use std::time::Duration;

use crate::error::LeadlineError;

/// Runs `fut` and fails with [`LeadlineError::Timeout`] if it has not
/// completed within `duration`.
pub async fn with_timeout<T, F>(duration: Duration, fut: F) -> Result<T, LeadlineError>
where
    F: Future<Output = Result<T, LeadlineError>>,
{
    match tokio::time::timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(LeadlineError::Timeout { duration }),
    }
}
