//! Retrieval-augmented answering. Read-only: embeds the question, pulls the
//! nearest notes, hydrates their text and asks the generation provider once.
//! Generation failures are never retried.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
	EmbeddingProvider as _, Error, GenerationProvider as _, NoteStore as _, Result, Service,
	VectorIndex as _,
	error::{index_err, provider_err, storage_err},
};

/// Fallback used when the caller supplies no question, or an empty one.
pub const DEFAULT_QUESTION: &str = "What is the square root of 9?";

const INSTRUCTION: &str =
	"Answer the user's question. When notes are provided, ground the answer in them.";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AnswerRequest {
	pub question: Option<String>,
	pub owner_id: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnswerResponse {
	pub answer: String,
}

impl Service {
	pub async fn answer_question(&self, req: AnswerRequest) -> Result<AnswerResponse> {
		let question = match req.question.as_deref().map(str::trim) {
			Some(question) if !question.is_empty() => question.to_string(),
			_ => DEFAULT_QUESTION.to_string(),
		};
		let owner_id = req.owner_id.as_deref().map(str::trim).filter(|owner| !owner.is_empty());
		let texts = [question.clone()];
		let vectors = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, &texts)
			.await
			.map_err(provider_err)?;

		if vectors.len() != 1 {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for one question.",
					vectors.len()
				),
			});
		}

		let Some(vector) = vectors.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vector.".into(),
			});
		};
		let expected_dim = self.cfg.storage.qdrant.vector_dim as usize;

		if vector.len() != expected_dim {
			return Err(Error::Provider {
				message: format!(
					"Question embedding has dimension {}, expected {expected_dim}.",
					vector.len()
				),
			});
		}

		let hits = self
			.stores
			.vectors
			.query_top_k(&vector, self.cfg.retrieval.top_k)
			.await
			.map_err(index_err)?;
		let mut contexts = Vec::with_capacity(hits.len());

		for hit in hits {
			match self.stores.notes.get_note(hit.note_id).await.map_err(storage_err)? {
				Some(note) => {
					// A tenant's question never surfaces another tenant's
					// note text.
					if owner_id.is_some_and(|owner| owner != note.owner_id) {
						continue;
					}

					contexts.push(note.text);
				},
				// Race with deletion. The hit is dropped, not an error.
				None => {
					tracing::debug!(note_id = %hit.note_id, "Vector hit has no note row. Dropping.");
				},
			}
		}

		let messages = build_messages(&question, &contexts);
		let answer = self
			.providers
			.generation
			.generate(&self.cfg.providers.generation, &messages)
			.await
			.map_err(|err| Error::Generation { message: err.to_string() })?;
		let Some(answer) = answer else {
			return Err(Error::Generation {
				message: "Generation provider returned no usable output.".into(),
			});
		};

		Ok(AnswerResponse { answer })
	}
}

/// Assembles the chat messages. With no hydrated notes the context message is
/// omitted entirely, leaving exactly the instruction and the question.
pub fn build_messages(question: &str, contexts: &[String]) -> Vec<Value> {
	let mut messages = Vec::with_capacity(contexts.len().min(1) + 2);

	if !contexts.is_empty() {
		let bullets =
			contexts.iter().map(|text| format!("- {text}")).collect::<Vec<_>>().join("\n");

		messages.push(serde_json::json!({ "role": "system", "content": bullets }));
	}

	messages.push(serde_json::json!({ "role": "system", "content": INSTRUCTION }));
	messages.push(serde_json::json!({ "role": "user", "content": question }));

	messages
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn no_contexts_yields_instruction_and_question_only() {
		let messages = build_messages("What is the square root of 9?", &[]);

		assert_eq!(messages.len(), 2);
		assert_eq!(messages[0]["role"], "system");
		assert_eq!(messages[0]["content"], INSTRUCTION);
		assert_eq!(messages[1]["role"], "user");
		assert_eq!(messages[1]["content"], "What is the square root of 9?");
	}

	#[test]
	fn contexts_are_bulleted_in_a_leading_system_message() {
		let contexts = vec!["first note".to_string(), "second note".to_string()];
		let messages = build_messages("q", &contexts);

		assert_eq!(messages.len(), 3);
		assert_eq!(messages[0]["role"], "system");
		assert_eq!(messages[0]["content"], "- first note\n- second note");
		assert_eq!(messages[1]["content"], INSTRUCTION);
		assert_eq!(messages[2]["content"], "q");
	}
}
