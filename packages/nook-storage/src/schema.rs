/// Bootstrap DDL. The vector itself lives in Qdrant; Postgres holds the note
/// rows and the durable ingestion run state.
pub const SCHEMA_SQL: &str = "\
CREATE TABLE IF NOT EXISTS notes (
	note_id uuid PRIMARY KEY,
	owner_id text NOT NULL,
	text text NOT NULL,
	indexed_at timestamptz,
	created_at timestamptz NOT NULL
);

CREATE INDEX IF NOT EXISTS notes_owner_created_idx ON notes (owner_id, created_at DESC);

CREATE TABLE IF NOT EXISTS ingest_runs (
	idempotency_key text PRIMARY KEY,
	owner_id text NOT NULL,
	text text NOT NULL,
	step text NOT NULL,
	status text NOT NULL,
	note_id uuid,
	attempts integer NOT NULL DEFAULT 0,
	last_error text,
	created_at timestamptz NOT NULL,
	updated_at timestamptz NOT NULL
);

CREATE INDEX IF NOT EXISTS ingest_runs_status_updated_idx ON ingest_runs (status, updated_at)";

pub fn statements() -> impl Iterator<Item = &'static str> {
	SCHEMA_SQL.split(';').map(str::trim).filter(|statement| !statement.is_empty())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_into_non_empty_statements() {
		let statements: Vec<_> = statements().collect();

		assert_eq!(statements.len(), 4);
		assert!(statements.iter().all(|statement| !statement.is_empty()));
		assert!(statements[0].starts_with("CREATE TABLE IF NOT EXISTS notes"));
	}
}
