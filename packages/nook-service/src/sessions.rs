//! Session facade over the per-token actors. Any actor failure is treated as
//! the session store being unavailable and fails closed; an unreachable
//! session is never reported as merely absent.

use serde::Serialize;
use uuid::Uuid;

use crate::{Error, Result, Service};

#[derive(Clone, Debug, Serialize)]
pub struct SessionStartResponse {
	pub token: String,
}

impl Service {
	/// Mints an opaque token and stores the session under it.
	pub async fn start_session(&self, user_id: &str) -> Result<SessionStartResponse> {
		let user_id = user_id.trim();

		if user_id.is_empty() {
			return Err(Error::InvalidRequest { message: "user_id is required.".into() });
		}

		let token = Uuid::new_v4().simple().to_string();

		self.sessions.instance_for(&token).save(user_id).await?;

		Ok(SessionStartResponse { token })
	}

	/// Returns the user id behind a live session, `None` for an expired,
	/// invalidated or unknown one.
	pub async fn check_session(&self, token: &str) -> Result<Option<String>> {
		match self.sessions.instance_for(token).get().await {
			Ok(user_id) => Ok(user_id),
			Err(err) => {
				tracing::warn!(error = %err, "Session actor unreachable. Failing closed.");

				Err(Error::SessionUnavailable { message: err.to_string() })
			},
		}
	}

	/// Ends the session. Ending an already-absent session is a no-op.
	pub async fn end_session(&self, token: &str) -> Result<()> {
		Ok(self.sessions.instance_for(token).invalidate().await?)
	}
}
