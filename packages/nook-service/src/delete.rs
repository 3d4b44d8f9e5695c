use uuid::Uuid;

use crate::{
	Error, NoteStore as _, Result, Service, VectorIndex as _,
	error::{index_err, storage_err},
};

impl Service {
	/// Deletes a note and its vector point, vector first. A crash between the
	/// two leaves a note row whose point is already gone, which retrieval
	/// tolerates; the reverse order would leave a dangling hit forever.
	pub async fn delete_note(&self, note_id: Uuid) -> Result<()> {
		let note = self.stores.notes.get_note(note_id).await.map_err(storage_err)?;

		if note.is_none() {
			return Err(Error::NotFound { message: format!("Note {note_id} does not exist.") });
		}

		self.stores.vectors.delete_by_ids(&[note_id]).await.map_err(index_err)?;
		self.stores.notes.delete_note(note_id).await.map_err(storage_err)?;

		tracing::info!(note_id = %note_id, "Note deleted.");

		Ok(())
	}
}
