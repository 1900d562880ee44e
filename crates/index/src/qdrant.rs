use std::collections::HashMap;
use std::future::Future;

use filter::qdrant::point_id;
use filter::Predicate;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::vectors_output::VectorsOptions;
use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, DeletePointsBuilder, Distance as QDistance,
    Filter, PointId, PointStruct, Query, QueryBatchPointsBuilder, QueryPointsBuilder,
    ScrollPointsBuilder, SetPayloadPointsBuilder, UpsertPointsBuilder, Value as QValue,
    VectorParamsBuilder, VectorsOutput,
};
use qdrant_client::{Payload as QPayload, Qdrant};
use serde_json::{Map, Number, Value};
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use tracing::{debug, info};

use crate::vector::{
    Distance, Payload, Point, QueryRequest, ScoredPoint, StoredPoint, VectorStore,
};
use crate::IndexError;

/// Vector store backed by a Qdrant collection.
///
/// The async client is driven from synchronous code: inside a multi-threaded
/// Tokio runtime the ambient handle is used through `block_in_place`. Inside
/// a current-thread runtime the store's own runtime runs the call on a
/// helper thread; outside any runtime it runs on the calling thread.
pub struct QdrantVectorStore {
    client: Qdrant,
    collection: String,
    runtime: Runtime,
}

impl QdrantVectorStore {
    pub fn connect(
        url: &str,
        collection: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, IndexError> {
        let mut builder = Qdrant::from_url(url);
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        let client = builder.build().map_err(IndexError::backend)?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .build()
            .map_err(IndexError::backend)?;
        let collection = collection.into();
        info!(url, collection = %collection, "connected to qdrant");
        Ok(Self {
            client,
            collection,
            runtime,
        })
    }

    fn block_on<F>(&self, fut: F) -> F::Output
    where
        F: Future + Send,
        F::Output: Send,
    {
        drive(&self.runtime, fut)
    }

    fn query_points(
        &self,
        vector: &[f32],
        filter: Option<&Predicate>,
        limit: usize,
    ) -> Result<QueryPointsBuilder, IndexError> {
        let mut builder = QueryPointsBuilder::new(&self.collection)
            .query(Query::new_nearest(vector.to_vec()))
            .limit(limit as u64)
            .with_payload(true);
        if let Some(filter) = filter {
            builder = builder.filter(Filter::try_from(filter)?);
        }
        Ok(builder)
    }
}

impl VectorStore for QdrantVectorStore {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn create_collection_if_absent(
        &self,
        vector_size: usize,
        distance: Distance,
    ) -> Result<bool, IndexError> {
        self.block_on(async {
            let exists = self
                .client
                .collection_exists(&self.collection)
                .await
                .map_err(IndexError::backend)?;
            if exists {
                return Ok(false);
            }
            self.client
                .create_collection(
                    CreateCollectionBuilder::new(&self.collection).vectors_config(
                        VectorParamsBuilder::new(vector_size as u64, qdrant_distance(distance)),
                    ),
                )
                .await
                .map_err(IndexError::backend)?;
            debug!(collection = %self.collection, vector_size, %distance, "created collection");
            Ok::<bool, IndexError>(true)
        })
    }

    fn delete_collection_if_exists(&self) -> Result<bool, IndexError> {
        self.block_on(async {
            let exists = self
                .client
                .collection_exists(&self.collection)
                .await
                .map_err(IndexError::backend)?;
            if !exists {
                return Ok(false);
            }
            self.client
                .delete_collection(&self.collection)
                .await
                .map_err(IndexError::backend)?;
            Ok::<bool, IndexError>(true)
        })
    }

    fn upsert(&self, points: Vec<Point>) -> Result<(), IndexError> {
        if points.is_empty() {
            return Ok(());
        }
        let points = points
            .into_iter()
            .map(|p| {
                let payload =
                    QPayload::try_from(Value::Object(p.payload)).map_err(IndexError::backend)?;
                Ok(PointStruct::new(point_id(&p.id), p.vector, payload))
            })
            .collect::<Result<Vec<_>, IndexError>>()?;
        self.block_on(
            self.client
                .upsert_points(UpsertPointsBuilder::new(&self.collection, points).wait(true)),
        )
        .map_err(IndexError::backend)?;
        Ok(())
    }

    fn query(
        &self,
        vector: &[f32],
        filter: Option<&Predicate>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, IndexError> {
        let request = self.query_points(vector, filter, limit)?;
        let response = self
            .block_on(self.client.query(request))
            .map_err(IndexError::backend)?;
        Ok(response.result.into_iter().map(scored_point).collect())
    }

    fn query_batch(&self, requests: &[QueryRequest]) -> Result<Vec<Vec<ScoredPoint>>, IndexError> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let queries = requests
            .iter()
            .map(|req| {
                self.query_points(&req.vector, req.filter.as_ref(), req.limit)
                    .map(|builder| builder.build())
            })
            .collect::<Result<Vec<_>, IndexError>>()?;
        let response = self
            .block_on(
                self.client
                    .query_batch(QueryBatchPointsBuilder::new(&self.collection, queries)),
            )
            .map_err(IndexError::backend)?;
        Ok(response
            .result
            .into_iter()
            .map(|batch| batch.result.into_iter().map(scored_point).collect())
            .collect())
    }

    fn scroll(
        &self,
        filter: Option<&Predicate>,
        limit: usize,
        with_vectors: bool,
    ) -> Result<Vec<StoredPoint>, IndexError> {
        let mut request = ScrollPointsBuilder::new(&self.collection)
            .limit(limit as u32)
            .with_payload(true)
            .with_vectors(with_vectors);
        if let Some(filter) = filter {
            request = request.filter(Filter::try_from(filter)?);
        }
        let response = self
            .block_on(self.client.scroll(request))
            .map_err(IndexError::backend)?;
        Ok(response
            .result
            .into_iter()
            .map(|point| StoredPoint {
                id: id_string(point.id),
                vector: point.vectors.and_then(dense_vector),
                payload: json_payload(point.payload),
            })
            .collect())
    }

    fn delete_where(&self, filter: &Predicate) -> Result<(), IndexError> {
        let filter = Filter::try_from(filter)?;
        self.block_on(
            self.client.delete_points(
                DeletePointsBuilder::new(&self.collection)
                    .points(filter)
                    .wait(true),
            ),
        )
        .map_err(IndexError::backend)?;
        Ok(())
    }

    fn set_payload_where(&self, payload: Payload, filter: &Predicate) -> Result<(), IndexError> {
        let filter = Filter::try_from(filter)?;
        let payload = QPayload::try_from(Value::Object(payload)).map_err(IndexError::backend)?;
        self.block_on(
            self.client.set_payload(
                SetPayloadPointsBuilder::new(&self.collection, payload)
                    .points_selector(filter)
                    .wait(true),
            ),
        )
        .map_err(IndexError::backend)?;
        Ok(())
    }

    fn count(&self, filter: Option<&Predicate>) -> Result<usize, IndexError> {
        let mut request = CountPointsBuilder::new(&self.collection).exact(true);
        if let Some(filter) = filter {
            request = request.filter(Filter::try_from(filter)?);
        }
        let response = self
            .block_on(self.client.count(request))
            .map_err(IndexError::backend)?;
        Ok(response.result.map_or(0, |r| r.count as usize))
    }
}

fn qdrant_distance(distance: Distance) -> QDistance {
    match distance {
        Distance::Cosine => QDistance::Cosine,
        Distance::Euclidean => QDistance::Euclid,
        Distance::Dot => QDistance::Dot,
    }
}

fn scored_point(point: qdrant_client::qdrant::ScoredPoint) -> ScoredPoint {
    ScoredPoint {
        id: id_string(point.id),
        score: point.score,
        payload: json_payload(point.payload),
    }
}

fn id_string(id: Option<PointId>) -> String {
    match id.and_then(|id| id.point_id_options) {
        Some(PointIdOptions::Num(num)) => num.to_string(),
        Some(PointIdOptions::Uuid(uuid)) => uuid,
        None => String::new(),
    }
}

#[allow(deprecated)]
fn dense_vector(vectors: VectorsOutput) -> Option<Vec<f32>> {
    match vectors.vectors_options? {
        VectorsOptions::Vector(vector) => Some(vector.data),
        VectorsOptions::Vectors(_) => None,
    }
}

fn json_payload(payload: HashMap<String, QValue>) -> Payload {
    payload
        .into_iter()
        .map(|(key, value)| (key, json_value(value)))
        .collect()
}

fn json_value(value: QValue) -> Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::from(i),
        Some(Kind::DoubleValue(d)) => Number::from_f64(d).map_or(Value::Null, Value::Number),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(json_value).collect())
        }
        Some(Kind::StructValue(st)) => Value::Object(
            st.fields
                .into_iter()
                .map(|(k, v)| (k, json_value(v)))
                .collect::<Map<String, Value>>(),
        ),
    }
}

/// Run `fut` to completion from synchronous code, whatever runtime (if any)
/// the caller is on.
fn drive<F>(runtime: &Runtime, fut: F) -> F::Output
where
    F: Future + Send,
    F::Output: Send,
{
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| handle.block_on(fut))
        }
        // block_in_place panics on a current-thread runtime.
        Ok(_) => std::thread::scope(|scope| {
            match scope.spawn(|| runtime.block_on(fut)).join() {
                Ok(output) => output,
                Err(panic) => std::panic::resume_unwind(panic),
            }
        }),
        Err(_) => runtime.block_on(fut),
    }
}
