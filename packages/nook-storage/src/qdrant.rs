use std::collections::HashMap;

use qdrant_client::{
	Qdrant,
	client::Payload,
	qdrant::{
		CreateCollectionBuilder, DeletePointsBuilder, Distance, PointId, PointStruct,
		PointsIdsList, Query, QueryPointsBuilder, UpsertPointsBuilder, Value, VectorParamsBuilder,
		point_id::PointIdOptions,
	},
};
use uuid::Uuid;

use crate::Result;

/// One point per fully ingested note. The point id is the note id, which is
/// what ties deletion and hydration back to the relational row.
#[derive(Clone, Debug)]
pub struct VectorPoint {
	pub note_id: Uuid,
	pub owner_id: String,
	pub vector: Vec<f32>,
}

#[derive(Clone, Copy, Debug)]
pub struct VectorHit {
	pub note_id: Uuid,
	pub score: f32,
}

pub struct QdrantStore {
	pub client: Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &nook_config::Qdrant) -> Result<Self> {
		let client = Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(&self.collection).await? {
			return Ok(());
		}

		let builder = CreateCollectionBuilder::new(self.collection.clone())
			.vectors_config(VectorParamsBuilder::new(self.vector_dim as u64, Distance::Cosine));

		self.client.create_collection(builder).await?;

		Ok(())
	}

	pub async fn upsert_points(&self, points: &[VectorPoint]) -> Result<()> {
		let mut structs = Vec::with_capacity(points.len());

		for point in points {
			let mut payload_map = HashMap::new();

			payload_map.insert("owner_id".to_string(), Value::from(point.owner_id.clone()));

			structs.push(PointStruct::new(
				point.note_id.to_string(),
				point.vector.clone(),
				Payload::from(payload_map),
			));
		}

		let upsert = UpsertPointsBuilder::new(self.collection.clone(), structs).wait(true);

		self.client.upsert_points(upsert).await?;

		Ok(())
	}

	pub async fn query_top_k(&self, vector: &[f32], k: u32) -> Result<Vec<VectorHit>> {
		let search = QueryPointsBuilder::new(self.collection.clone())
			.query(Query::new_nearest(vector.to_vec()))
			.limit(k as u64)
			.with_payload(false);
		let response = self.client.query(search).await?;
		let mut hits = Vec::with_capacity(response.result.len());

		for point in response.result {
			let Some(note_id) = point.id.as_ref().and_then(point_uuid) else {
				continue;
			};

			hits.push(VectorHit { note_id, score: point.score });
		}

		Ok(hits)
	}

	pub async fn delete_by_ids(&self, note_ids: &[Uuid]) -> Result<()> {
		if note_ids.is_empty() {
			return Ok(());
		}

		let ids: Vec<PointId> =
			note_ids.iter().map(|note_id| PointId::from(note_id.to_string())).collect();
		let delete = DeletePointsBuilder::new(self.collection.clone())
			.points(PointsIdsList { ids })
			.wait(true);

		self.client.delete_points(delete).await?;

		Ok(())
	}
}

fn point_uuid(point_id: &PointId) -> Option<Uuid> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Uuid::parse_str(id).ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_uuid_point_ids_only() {
		let id = Uuid::new_v4();
		let uuid_point = PointId::from(id.to_string());
		let numeric_point = PointId::from(7_u64);

		assert_eq!(point_uuid(&uuid_point), Some(id));
		assert_eq!(point_uuid(&numeric_point), None);
	}
}
