use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::catalog::VectorStoreLoader;
use crate::domain::ItemId;
use crate::errors::RecommendError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    /// Cosine similarity in `[-1, 1]`; zero when either vector has zero norm.
    #[default]
    Cosine,
    Dot,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Dot => "dot",
        }
    }

    pub fn compare(&self, left: &EmbeddingVector, right: &EmbeddingVector) -> f64 {
        match self {
            Self::Cosine => cosine_similarity(left.as_slice(), right.as_slice()),
            Self::Dot => dot_product(left.as_slice(), right.as_slice()),
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "dot" => Ok(Self::Dot),
            other => Err(format!("unsupported similarity metric `{other}` (expected cosine|dot)")),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EmbeddingVector(Vec<f32>);

impl EmbeddingVector {
    pub fn new(values: Vec<f32>) -> Self {
        Self(values)
    }

    pub fn dim(&self) -> usize {
        self.0.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }
}

/// Read-only `{item id -> vector}` mapping, built once and shared freely
/// across threads afterwards.
#[derive(Clone, Debug)]
pub struct VectorIndex {
    vectors: HashMap<ItemId, EmbeddingVector>,
    dimension: usize,
    metric: SimilarityMetric,
}

impl VectorIndex {
    /// Every vector must share one non-zero dimension and hold only finite
    /// values.
    pub fn new(
        vectors: HashMap<ItemId, Vec<f32>>,
        metric: SimilarityMetric,
    ) -> Result<Self, RecommendError> {
        let mut dimension = None;
        let mut index = HashMap::with_capacity(vectors.len());

        for (id, values) in vectors {
            if values.is_empty() {
                return Err(RecommendError::InvalidConfiguration(format!(
                    "vector for item `{id}` is empty"
                )));
            }
            if values.iter().any(|value| !value.is_finite()) {
                return Err(RecommendError::InvalidConfiguration(format!(
                    "vector for item `{id}` contains non-finite values"
                )));
            }
            match dimension {
                None => dimension = Some(values.len()),
                Some(expected) if expected != values.len() => {
                    return Err(RecommendError::InvalidConfiguration(format!(
                        "vector for item `{id}` has dimension {} but the index uses {expected}",
                        values.len()
                    )));
                }
                Some(_) => {}
            }
            index.insert(id, EmbeddingVector::new(values));
        }

        Ok(Self { vectors: index, dimension: dimension.unwrap_or(0), metric })
    }

    pub fn load<L>(
        loader: &L,
        location: &str,
        metric: SimilarityMetric,
    ) -> Result<Self, RecommendError>
    where
        L: VectorStoreLoader + ?Sized,
    {
        let vectors = loader.load(location)?;
        let index = Self::new(vectors, metric)?;
        tracing::info!(
            event_name = "vectors.index_loaded",
            location,
            vectors = index.len(),
            dimension = index.dimension(),
            metric = metric.as_str(),
            "vector index loaded"
        );
        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> SimilarityMetric {
        self.metric
    }

    pub fn contains(&self, id: &ItemId) -> bool {
        self.vectors.contains_key(id)
    }

    pub fn vector_for(&self, id: &ItemId) -> Result<&EmbeddingVector, RecommendError> {
        self.vectors.get(id).ok_or_else(|| RecommendError::VectorMissing(id.clone()))
    }

    pub fn similarity(&self, left: &ItemId, right: &ItemId) -> Result<f64, RecommendError> {
        let left = self.vector_for(left)?;
        let right = self.vector_for(right)?;
        Ok(self.metric.compare(left, right))
    }

    /// The `n` items most similar to `id`, excluding `id` itself. Ordered by
    /// similarity descending, then by identifier ascending.
    pub fn most_similar(
        &self,
        id: &ItemId,
        n: usize,
    ) -> Result<Vec<(ItemId, f64)>, RecommendError> {
        let target = self.vector_for(id)?;
        let mut scored: Vec<(ItemId, f64)> = self
            .vectors
            .iter()
            .filter(|(other, _)| *other != id)
            .map(|(other, vector)| (other.clone(), self.metric.compare(target, vector)))
            .collect();

        scored.sort_by(|left, right| right.1.total_cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
        scored.truncate(n);
        Ok(scored)
    }
}

pub fn cosine_similarity(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() {
        tracing::warn!(
            left_len = left.len(),
            right_len = right.len(),
            "embedding dimension mismatch; returning zero similarity"
        );
        return 0.0;
    }

    let dot = dot_product(left, right);
    let norm_left = left.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();
    let norm_right = right.iter().map(|x| f64::from(*x).powi(2)).sum::<f64>().sqrt();

    if norm_left == 0.0 || norm_right == 0.0 {
        return 0.0;
    }

    (dot / (norm_left * norm_right)).clamp(-1.0, 1.0)
}

pub fn dot_product(left: &[f32], right: &[f32]) -> f64 {
    if left.len() != right.len() {
        return 0.0;
    }
    left.iter().zip(right.iter()).map(|(x, y)| f64::from(*x) * f64::from(*y)).sum()
}
