// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user sliding-window limit on inbound frames.

use std::collections::VecDeque;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

const WINDOW: Duration = Duration::from_secs(1);

/// Admits at most `limit` frames per user in any one-second window.
pub struct RateLimiter {
    limit: usize,
    windows: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(limit_per_second: u32) -> Self {
        Self {
            limit: limit_per_second as usize,
            windows: DashMap::new(),
        }
    }

    /// Record a frame from `user_id`; false when it exceeds the limit.
    pub fn allow(&self, user_id: &str) -> bool {
        let now = Instant::now();
        let mut window = self.windows.entry(user_id.to_string()).or_default();
        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) >= WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }
        if window.len() >= self.limit {
            return false;
        }
        window.push_back(now);
        true
    }

    /// Drop all state held for `user_id`.
    pub fn forget(&self, user_id: &str) {
        self.windows.remove(user_id);
    }

    pub fn tracked_users(&self) -> usize {
        self.windows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn eleventh_frame_in_a_second_is_refused() {
        let limiter = RateLimiter::new(10);
        for _ in 0..10 {
            assert!(limiter.allow("u1"));
        }
        assert!(!limiter.allow("u1"));
        // Other users have their own budget.
        assert!(limiter.allow("u2"));
    }

    #[tokio::test(start_paused = true)]
    async fn window_slides() {
        let limiter = RateLimiter::new(2);
        assert!(limiter.allow("u1"));
        tokio::time::advance(Duration::from_millis(600)).await;
        assert!(limiter.allow("u1"));
        assert!(!limiter.allow("u1"));

        tokio::time::advance(Duration::from_millis(400)).await;
        // The first frame has aged out, the second has not.
        assert!(limiter.allow("u1"));
        assert!(!limiter.allow("u1"));
    }

    #[tokio::test(start_paused = true)]
    async fn refused_frames_do_not_consume_budget() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.allow("u1"));
        for _ in 0..5 {
            assert!(!limiter.allow("u1"));
        }
        tokio::time::advance(WINDOW).await;
        assert!(limiter.allow("u1"));
    }

    #[tokio::test]
    async fn forget_discards_state() {
        let limiter = RateLimiter::new(1);
        assert!(limiter.allow("u1"));
        assert_eq!(limiter.tracked_users(), 1);
        limiter.forget("u1");
        assert_eq!(limiter.tracked_users(), 0);
        assert!(limiter.allow("u1"));
    }
}
