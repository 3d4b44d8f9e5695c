//! Background sweep that re-drives ingestion runs left RUNNING by a crashed
//! process. Resuming goes through the same idempotent pipeline the original
//! request used, so a run that actually finished is a cheap no-op.

use std::time::Duration as StdDuration;

use color_eyre::Result;
use time::{Duration, OffsetDateTime};
use tokio::time as tokio_time;

use nook_service::{IngestRequest, RunStore as _, Service};

const POLL_INTERVAL_MS: u64 = 500;
const STALL_AFTER_SECONDS: i64 = 60;
const RESUME_BATCH_SIZE: u32 = 16;

pub async fn run_worker(service: Service) -> Result<()> {
	loop {
		if let Err(err) = resume_stalled_runs_once(&service).await {
			tracing::error!(error = %err, "Stalled-run sweep failed.");
		}

		tokio_time::sleep(StdDuration::from_millis(POLL_INTERVAL_MS)).await;
	}
}

/// One sweep: fetch runs still RUNNING but untouched since the stall cutoff
/// and re-drive each through the pipeline. Per-run failures are logged and do
/// not stop the sweep.
pub async fn resume_stalled_runs_once(service: &Service) -> Result<()> {
	let cutoff = stall_cutoff(OffsetDateTime::now_utc());
	let runs = service.stores.runs.fetch_stalled_runs(cutoff, RESUME_BATCH_SIZE).await?;

	for run in runs {
		let idempotency_key = run.idempotency_key.clone();
		let request = IngestRequest {
			text: run.text,
			owner_id: run.owner_id,
			idempotency_key: run.idempotency_key,
		};

		match service.ingest_note(request).await {
			Ok(response) => {
				tracing::info!(
					idempotency_key = %idempotency_key,
					note_id = %response.note_id,
					"Resumed stalled ingestion run."
				);
			},
			Err(err) => {
				tracing::error!(idempotency_key = %idempotency_key, error = %err, "Stalled run resume failed.");
			},
		}
	}

	Ok(())
}

fn stall_cutoff(now: OffsetDateTime) -> OffsetDateTime {
	now - Duration::seconds(STALL_AFTER_SECONDS)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn cutoff_trails_now_by_the_stall_window() {
		let now = OffsetDateTime::now_utc();

		assert_eq!(now - stall_cutoff(now), Duration::seconds(STALL_AFTER_SECONDS));
	}
}
