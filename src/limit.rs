//! Process-wide sliding-window admission gate for outbound upstream calls.
//!
//! Every outbound call - user-token proxy traffic and service-identity
//! lookups alike - draws from the same upstream quota, so the relay routes
//! all of them through one shared [`RateLimiter`].

// std
use std::time::Duration;
// crates.io
use tokio::time::{Instant, sleep};
// self
use crate::_prelude::{AsyncMutex, VecDeque};

/// Sliding-window rate limiter shared by all concurrent relay requests.
///
/// [`acquire`](Self::acquire) suspends the calling task until a slot is free;
/// it never fails, only delays. The window lock is held only around the
/// check-and-mutate section, never across the sleep.
#[derive(Debug)]
pub struct RateLimiter {
	max_calls: usize,
	period: Duration,
	window: AsyncMutex<VecDeque<Instant>>,
}
impl RateLimiter {
	/// Creates a limiter granting at most `max_calls` per trailing `period`.
	///
	/// A quota of zero would deadlock every caller, so it is treated as one.
	pub fn new(max_calls: usize, period: Duration) -> Self {
		Self {
			max_calls: max_calls.max(1),
			period,
			window: AsyncMutex::new(VecDeque::new()),
		}
	}

	/// Waits until the window has room, then records the grant.
	///
	/// Several waiters may wake for a single freed slot; each retries the full
	/// check, so the window never exceeds `max_calls` live entries.
	pub async fn acquire(&self) {
		loop {
			let wait = {
				let mut window = self.window.lock().await;
				let now = Instant::now();

				while window
					.front()
					.is_some_and(|oldest| now.duration_since(*oldest) >= self.period)
				{
					window.pop_front();
				}

				if window.len() < self.max_calls {
					window.push_back(now);

					return;
				}

				// Front entry exists and is younger than the period here.
				self.period.saturating_sub(now.duration_since(window[0]))
			};

			sleep(wait).await;
		}
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::Arc;
	// self
	use super::*;

	#[tokio::test(start_paused = true)]
	async fn grants_within_quota_resolve_immediately() {
		let limiter = RateLimiter::new(3, Duration::from_secs(60));
		let start = Instant::now();

		for _ in 0..3 {
			limiter.acquire().await;
		}

		assert_eq!(Instant::now().duration_since(start), Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn third_concurrent_acquire_waits_a_full_window() {
		let limiter = Arc::new(RateLimiter::new(2, Duration::from_secs(60)));
		let start = Instant::now();
		let mut handles = Vec::new();

		for _ in 0..3 {
			let limiter = limiter.clone();

			handles.push(tokio::spawn(async move {
				limiter.acquire().await;

				Instant::now().duration_since(start)
			}));
		}

		let mut waits = Vec::new();

		for handle in handles {
			waits.push(handle.await.expect("Acquire task should not panic."));
		}

		waits.sort();

		assert_eq!(waits[0], Duration::ZERO);
		assert_eq!(waits[1], Duration::ZERO);
		assert!(waits[2] >= Duration::from_secs(60), "Third grant fired at {:?}.", waits[2]);
		assert!(waits[2] < Duration::from_secs(61), "Third grant fired at {:?}.", waits[2]);
	}

	#[tokio::test(start_paused = true)]
	async fn expired_entries_are_pruned_from_the_window() {
		let limiter = RateLimiter::new(2, Duration::from_secs(1));

		limiter.acquire().await;
		limiter.acquire().await;
		sleep(Duration::from_secs(1)).await;

		let start = Instant::now();

		limiter.acquire().await;
		limiter.acquire().await;

		assert_eq!(Instant::now().duration_since(start), Duration::ZERO);
	}

	#[tokio::test(start_paused = true)]
	async fn window_slides_rather_than_resetting() {
		let limiter = RateLimiter::new(1, Duration::from_secs(10));

		limiter.acquire().await;
		sleep(Duration::from_secs(4)).await;

		let start = Instant::now();

		// The single slot frees 10s after the first grant, i.e. 6s from here.
		limiter.acquire().await;

		let waited = Instant::now().duration_since(start);

		assert!(waited >= Duration::from_secs(6), "Second grant fired after {waited:?}.");
		assert!(waited < Duration::from_secs(7), "Second grant fired after {waited:?}.");
	}

	#[tokio::test(start_paused = true)]
	async fn zero_quota_is_clamped_to_one() {
		let limiter = RateLimiter::new(0, Duration::from_secs(60));

		// Must not deadlock.
		limiter.acquire().await;
	}
}
