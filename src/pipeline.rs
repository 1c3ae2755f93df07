//! Pipelines: adjustments applied in order.
//!
//! A [`Pipeline`] is a non-empty list of [`Adjustment`]s folded left to
//! right. Its serialized form (`requested`, see
//! [`serialize`](crate::adjustment::serialize)) doubles as the cache key.
//!
//! Two ways to run one:
//!
//! - **Dimensions only**: [`Pipeline::info`] folds `calculate` and never
//!   touches pixels. This is what page templates use to write `width` and
//!   `height` attributes before any image exists.
//! - **Full**: [`Adjuster::adjust`] decodes, folds `apply`, encodes and
//!   stores the result in a [`ResultCache`].
//!
//! Areas are only fetched from the [`AreaSource`] when some stage reads
//! them.

use crate::adjustment::{Adjustment, AdjustmentError, SearchOptions, serialize};
use crate::areas::{AreaSource, AreaSourceError};
use crate::cache::{CacheError, CacheKey, CacheStats, ResultCache};
use crate::geometry::{Area, Dimensions};
use crate::imaging::{BackendError, DecodedImage, ImageBackend};
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Pipeline has no adjustments")]
    Empty,
    #[error("Invalid adjustment: {0}")]
    Adjustment(#[from] AdjustmentError),
    #[error("Image processing failed: {0}")]
    Backend(#[from] BackendError),
    #[error("Area lookup failed: {0}")]
    Areas(#[from] AreaSourceError),
    #[error("Cache failure: {0}")]
    Cache(#[from] CacheError),
}

/// Dimension-only description of an adjusted image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdjustmentInfo {
    pub width: u32,
    pub height: u32,
    pub requested: String,
    pub ident: String,
}

/// An ordered, non-empty list of adjustments.
#[derive(Debug, Clone, PartialEq)]
pub struct Pipeline {
    stages: Vec<Adjustment>,
}

impl Pipeline {
    /// Stages built from struct literals are checked the same way as
    /// parsed ones.
    pub fn new(stages: Vec<Adjustment>) -> Result<Self, PipelineError> {
        if stages.is_empty() {
            return Err(PipelineError::Empty);
        }
        for stage in &stages {
            stage.validate()?;
        }
        Ok(Self { stages })
    }

    /// Parse a serialized pipeline such as `fit|25|50>crop|25|`.
    pub fn parse(requested: &str) -> Result<Self, PipelineError> {
        Self::new(serialize::deserialize(requested)?)
    }

    pub fn stages(&self) -> &[Adjustment] {
        &self.stages
    }

    /// Canonical serialized form.
    pub fn requested(&self) -> String {
        serialize::serialize(&self.stages)
    }

    pub fn calculate_uses_areas(&self) -> bool {
        self.stages.iter().any(|s| s.kind().calculate_uses_areas())
    }

    pub fn apply_uses_areas(&self) -> bool {
        self.stages.iter().any(|s| s.kind().apply_uses_areas())
    }

    pub fn calculate(&self, dims: Dimensions, areas: &[Area]) -> Dimensions {
        self.stages
            .iter()
            .fold(dims, |dims, stage| stage.calculate(dims, areas))
    }

    /// Result of every stage in turn, starting with `dims` itself.
    pub fn calculate_stages(&self, dims: Dimensions, areas: &[Area]) -> Vec<Dimensions> {
        let mut out = Vec::with_capacity(self.stages.len() + 1);
        out.push(dims);
        let mut current = dims;
        for stage in &self.stages {
            current = stage.calculate(current, areas);
            out.push(current);
        }
        out
    }

    /// Fold `apply` over the stages. The first failing stage aborts the run.
    pub fn apply(
        &self,
        backend: &impl ImageBackend,
        image: &DecodedImage,
        areas: &[Area],
        search: SearchOptions,
    ) -> Result<DecodedImage, BackendError> {
        let mut current = image.clone();
        for stage in &self.stages {
            current = stage.apply(backend, &current, areas, search)?;
        }
        Ok(current)
    }

    pub fn info(&self, ident: &str, dims: Dimensions, areas: &[Area]) -> AdjustmentInfo {
        let out = self.calculate(dims, areas);
        AdjustmentInfo {
            width: out.width,
            height: out.height,
            requested: self.requested(),
            ident: ident.to_string(),
        }
    }
}

/// Where an [`Adjusted`] result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from the cache.
    Hit,
    /// Computed and stored.
    Computed,
    /// Computed, but another writer stored the same key first; theirs is returned.
    Duplicate,
}

/// An encoded, adjusted image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adjusted {
    pub bytes: Vec<u8>,
    pub outcome: Outcome,
}

/// One source image for [`Adjuster::adjust_many`].
#[derive(Debug, Clone, Copy)]
pub struct Source<'a> {
    pub ident: &'a str,
    pub bytes: &'a [u8],
}

/// Runs pipelines against real images, with area lookup and caching.
pub struct Adjuster<'a, B: ImageBackend> {
    backend: &'a B,
    areas: &'a dyn AreaSource,
    cache: &'a dyn ResultCache,
    search: SearchOptions,
}

impl<'a, B: ImageBackend> Adjuster<'a, B> {
    pub fn new(backend: &'a B, areas: &'a dyn AreaSource, cache: &'a dyn ResultCache) -> Self {
        Self {
            backend,
            areas,
            cache,
            search: SearchOptions::default(),
        }
    }

    pub fn with_search(mut self, search: SearchOptions) -> Self {
        self.search = search;
        self
    }

    fn areas_if(&self, needed: bool, ident: &str) -> Result<Vec<Area>, PipelineError> {
        if needed {
            Ok(self.areas.areas_for(ident)?)
        } else {
            Ok(Vec::new())
        }
    }

    /// Output dimensions without decoding pixels.
    pub fn info(
        &self,
        ident: &str,
        bytes: &[u8],
        pipeline: &Pipeline,
    ) -> Result<AdjustmentInfo, PipelineError> {
        let dims = self.backend.identify(bytes)?;
        let areas = self.areas_if(pipeline.calculate_uses_areas(), ident)?;
        Ok(pipeline.info(ident, dims, &areas))
    }

    /// Adjust one image, reusing a cached result when there is one.
    pub fn adjust(
        &self,
        ident: &str,
        bytes: &[u8],
        pipeline: &Pipeline,
    ) -> Result<Adjusted, PipelineError> {
        let key = CacheKey::new(ident, pipeline.requested());
        if let Some(bytes) = self.cache.get(&key)? {
            debug!("Cache hit for {ident} ({})", key.requested);
            return Ok(Adjusted {
                bytes,
                outcome: Outcome::Hit,
            });
        }

        let image = self.backend.decode(bytes)?;
        let areas = self.areas_if(pipeline.apply_uses_areas(), ident)?;
        let adjusted = pipeline.apply(self.backend, &image, &areas, self.search)?;
        let encoded = self.backend.encode(&adjusted)?;

        if let Some(existing) = self.cache.get(&key)? {
            warn!(
                "{ident} ({}) was adjusted concurrently, discarding this result",
                key.requested
            );
            return Ok(Adjusted {
                bytes: existing,
                outcome: Outcome::Duplicate,
            });
        }
        self.cache.put(&key, &encoded)?;
        debug!(
            "Adjusted {ident} {} -> {} ({})",
            image.dimensions(),
            adjusted.dimensions(),
            key.requested
        );
        Ok(Adjusted {
            bytes: encoded,
            outcome: Outcome::Computed,
        })
    }

    /// Adjust independent sources in parallel. Results are in input order.
    pub fn adjust_many(
        &self,
        sources: &[Source<'_>],
        pipeline: &Pipeline,
    ) -> (Vec<Result<Adjusted, PipelineError>>, CacheStats) {
        let results: Vec<_> = sources
            .par_iter()
            .map(|source| self.adjust(source.ident, source.bytes, pipeline))
            .collect();

        let mut stats = CacheStats::default();
        for adjusted in results.iter().flatten() {
            match adjusted.outcome {
                Outcome::Hit => stats.hits += 1,
                Outcome::Computed => stats.computed += 1,
                Outcome::Duplicate => stats.duplicates += 1,
            }
        }
        info!("Adjusted {} images: {stats}", sources.len());
        (results, stats)
    }
}
