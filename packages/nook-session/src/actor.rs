use time::{Duration, OffsetDateTime};
use tokio::sync::{mpsc, oneshot};

use crate::{Error, Result};

const MAILBOX_CAPACITY: usize = 32;

pub(crate) enum Command {
	Save { user_id: String, reply: oneshot::Sender<()> },
	Get { reply: oneshot::Sender<Option<String>> },
	Invalidate { reply: oneshot::Sender<()> },
}

struct SessionState {
	user_id: String,
	created_at: OffsetDateTime,
}

/// Handle to the single actor owning one token's session state. Cheap to
/// clone; all clones reach the same mailbox.
#[derive(Clone)]
pub struct SessionHandle {
	sender: mpsc::Sender<Command>,
}
impl SessionHandle {
	pub(crate) fn spawn(ttl: Duration) -> Self {
		let (sender, receiver) = mpsc::channel(MAILBOX_CAPACITY);

		tokio::spawn(run_actor(receiver, ttl));

		Self { sender }
	}

	pub(crate) fn is_closed(&self) -> bool {
		self.sender.is_closed()
	}

	/// Stores the user id with the current timestamp, overwriting any prior
	/// state. Re-saving is harmless.
	pub async fn save(&self, user_id: &str) -> Result<()> {
		let (reply, rx) = oneshot::channel();

		self.sender
			.send(Command::Save { user_id: user_id.to_string(), reply })
			.await
			.map_err(|_| Error::MailboxClosed)?;

		rx.await.map_err(|_| Error::ReplyDropped)
	}

	/// Returns the stored user id while the session is within its TTL. An
	/// expired read deletes the state as a side effect and returns `None`;
	/// so does a read of a never-saved or invalidated session.
	pub async fn get(&self) -> Result<Option<String>> {
		let (reply, rx) = oneshot::channel();

		self.sender.send(Command::Get { reply }).await.map_err(|_| Error::MailboxClosed)?;

		rx.await.map_err(|_| Error::ReplyDropped)
	}

	/// Clears the stored state unconditionally. Idempotent.
	pub async fn invalidate(&self) -> Result<()> {
		let (reply, rx) = oneshot::channel();

		self.sender.send(Command::Invalidate { reply }).await.map_err(|_| Error::MailboxClosed)?;

		rx.await.map_err(|_| Error::ReplyDropped)
	}
}

async fn run_actor(mut receiver: mpsc::Receiver<Command>, ttl: Duration) {
	let mut state: Option<SessionState> = None;

	while let Some(command) = receiver.recv().await {
		match command {
			Command::Save { user_id, reply } => {
				state = Some(SessionState { user_id, created_at: OffsetDateTime::now_utc() });

				let _ = reply.send(());
			},
			Command::Get { reply } => {
				let now = OffsetDateTime::now_utc();
				let user_id = match &state {
					Some(session) if now - session.created_at <= ttl =>
						Some(session.user_id.clone()),
					Some(_) => {
						tracing::debug!("Session expired at read time. Clearing state.");

						state = None;

						None
					},
					None => None,
				};

				let _ = reply.send(user_id);
			},
			Command::Invalidate { reply } => {
				state = None;

				let _ = reply.send(());
			},
		}
	}
}
