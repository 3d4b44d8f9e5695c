use time::OffsetDateTime;

use nook_config::Postgres;
use nook_storage::{db::Db, models, notes, runs};

fn env_dsn() -> Option<String> {
	std::env::var("NOOK_PG_DSN").ok()
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set NOOK_PG_DSN to run."]
async fn schema_bootstrap_and_note_roundtrip() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping schema_bootstrap_and_note_roundtrip; set NOOK_PG_DSN to run this test.");

		return;
	};
	let cfg = Postgres { dsn, pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");
	// Bootstrap must be re-runnable.
	db.ensure_schema().await.expect("Failed to re-run schema bootstrap.");

	let now = OffsetDateTime::now_utc();
	let note_id = notes::insert_note(&db, "smoke-owner", "Smoke test note.", now)
		.await
		.expect("Failed to insert note.");
	let note = notes::get_note(&db, note_id)
		.await
		.expect("Failed to fetch note.")
		.expect("Inserted note must be readable.");

	assert_eq!(note.owner_id, "smoke-owner");
	assert!(note.indexed_at.is_none());

	notes::mark_indexed(&db, note_id, now).await.expect("Failed to mark note indexed.");

	let note = notes::get_note(&db, note_id)
		.await
		.expect("Failed to fetch note.")
		.expect("Indexed note must be readable.");

	assert!(note.indexed_at.is_some());

	notes::delete_note(&db, note_id).await.expect("Failed to delete note.");

	assert!(notes::get_note(&db, note_id).await.expect("Failed to fetch note.").is_none());
}

#[tokio::test]
#[ignore = "Requires external Postgres. Set NOOK_PG_DSN to run."]
async fn run_rows_upsert_and_stall_query() {
	let Some(dsn) = env_dsn() else {
		eprintln!("Skipping run_rows_upsert_and_stall_query; set NOOK_PG_DSN to run this test.");

		return;
	};
	let cfg = Postgres { dsn, pool_max_conns: 2 };
	let db = Db::connect(&cfg).await.expect("Failed to connect to Postgres.");

	db.ensure_schema().await.expect("Failed to ensure schema.");

	let now = OffsetDateTime::now_utc();
	let key = format!("smoke-{}", uuid::Uuid::new_v4());
	let mut run = models::IngestRunRecord::new(&key, "smoke-owner", "Smoke run.", now);

	runs::save_run(&db, &run).await.expect("Failed to save run.");

	run.step = models::RUN_STEP_RECORD_CREATED.to_string();
	run.attempts = 2;

	runs::save_run(&db, &run).await.expect("Failed to upsert run.");

	let stored = runs::fetch_run(&db, &key)
		.await
		.expect("Failed to fetch run.")
		.expect("Saved run must be readable.");

	assert_eq!(stored.step, models::RUN_STEP_RECORD_CREATED);
	assert_eq!(stored.attempts, 2);

	let stalled = runs::fetch_stalled_runs(&db, now + time::Duration::seconds(1), 10)
		.await
		.expect("Failed to query stalled runs.");

	assert!(stalled.iter().any(|candidate| candidate.idempotency_key == key));
}
