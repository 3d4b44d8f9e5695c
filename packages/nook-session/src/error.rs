pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Session actor mailbox is closed.")]
	MailboxClosed,
	#[error("Session actor dropped the reply channel.")]
	ReplyDropped,
}
