use std::{collections::HashMap, sync::Mutex};

use time::Duration;

use crate::actor::SessionHandle;

/// Derives the stable actor key for a token. The raw token is an opaque
/// secret; only its hash is used for routing, and the same token always
/// resolves to the same key.
pub fn derive_key(token: &str) -> String {
	blake3::hash(token.as_bytes()).to_hex().to_string()
}

/// Owns the per-token actors. Operations on the same token are serialized by
/// that token's actor; different tokens proceed fully in parallel.
pub struct SessionRegistry {
	ttl: Duration,
	actors: Mutex<HashMap<String, SessionHandle>>,
}
impl SessionRegistry {
	pub fn new(ttl: Duration) -> Self {
		Self { ttl, actors: Mutex::new(HashMap::new()) }
	}

	/// Returns the handle for this token's actor, spawning it on first use.
	/// A closed mailbox (the actor task was aborted) is replaced with a
	/// fresh, empty actor.
	pub fn instance_for(&self, token: &str) -> SessionHandle {
		let key = derive_key(token);
		let mut actors = self.actors.lock().unwrap_or_else(|err| err.into_inner());

		match actors.get(&key) {
			Some(handle) if !handle.is_closed() => handle.clone(),
			_ => {
				let handle = SessionHandle::spawn(self.ttl);

				actors.insert(key, handle.clone());

				handle
			},
		}
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}
}

#[cfg(test)]
mod tests {
	use std::time::Duration as StdDuration;

	use super::*;

	#[test]
	fn key_derivation_is_deterministic_and_token_scoped() {
		assert_eq!(derive_key("token-a"), derive_key("token-a"));
		assert_ne!(derive_key("token-a"), derive_key("token-b"));
	}

	#[tokio::test]
	async fn save_then_get_within_ttl_returns_user() {
		let registry = SessionRegistry::new(Duration::hours(24));
		let handle = registry.instance_for("token-a");

		handle.save("user-1").await.expect("save failed");

		assert_eq!(handle.get().await.expect("get failed").as_deref(), Some("user-1"));
	}

	#[tokio::test]
	async fn same_token_reaches_the_same_actor() {
		let registry = SessionRegistry::new(Duration::hours(24));

		registry.instance_for("token-a").save("user-1").await.expect("save failed");

		let seen = registry.instance_for("token-a").get().await.expect("get failed");

		assert_eq!(seen.as_deref(), Some("user-1"));
		assert_eq!(registry.instance_for("token-b").get().await.expect("get failed"), None);
	}

	#[tokio::test]
	async fn expired_get_clears_state_and_stays_absent() {
		let registry = SessionRegistry::new(Duration::milliseconds(20));
		let handle = registry.instance_for("token-a");

		handle.save("user-1").await.expect("save failed");
		tokio::time::sleep(StdDuration::from_millis(50)).await;

		assert_eq!(handle.get().await.expect("get failed"), None);
		// A second read after expiry is also absent, not an error.
		assert_eq!(handle.get().await.expect("get failed"), None);
	}

	#[tokio::test]
	async fn resave_restarts_the_ttl_window() {
		let registry = SessionRegistry::new(Duration::milliseconds(80));
		let handle = registry.instance_for("token-a");

		handle.save("user-1").await.expect("save failed");
		tokio::time::sleep(StdDuration::from_millis(50)).await;
		handle.save("user-1").await.expect("save failed");
		tokio::time::sleep(StdDuration::from_millis(50)).await;

		assert_eq!(handle.get().await.expect("get failed").as_deref(), Some("user-1"));
	}

	#[tokio::test]
	async fn invalidate_is_idempotent() {
		let registry = SessionRegistry::new(Duration::hours(24));
		let handle = registry.instance_for("token-a");

		handle.save("user-1").await.expect("save failed");
		handle.invalidate().await.expect("invalidate failed");
		handle.invalidate().await.expect("second invalidate failed");

		assert_eq!(handle.get().await.expect("get failed"), None);
	}

	#[tokio::test]
	async fn tokens_are_independent() {
		let registry = SessionRegistry::new(Duration::hours(24));

		registry.instance_for("token-a").save("user-1").await.expect("save failed");
		registry.instance_for("token-b").save("user-2").await.expect("save failed");
		registry.instance_for("token-a").invalidate().await.expect("invalidate failed");

		assert_eq!(registry.instance_for("token-a").get().await.expect("get failed"), None);
		assert_eq!(
			registry.instance_for("token-b").get().await.expect("get failed").as_deref(),
			Some("user-2")
		);
	}
}
