use std::sync::Arc;

use crate::oracle::RelevanceOracle;
use crate::pipeline::HighlightPipeline;
use crate::store::QueryStore;

/// Shared state behind every gateway route.
///
/// The store appears twice on purpose: the pipeline owns one handle for
/// the highlight path, and the gateway reads through its own handle for
/// listings and permalink lookups.
pub struct GatewayState<O: RelevanceOracle + 'static, S: QueryStore + 'static> {
    pub pipeline: HighlightPipeline<O, S>,
    pub store: Arc<S>,
}

impl<O, S> Clone for GatewayState<O, S>
where
    O: RelevanceOracle + 'static,
    S: QueryStore + 'static,
{
    fn clone(&self) -> Self {
        Self {
            pipeline: self.pipeline.clone(),
            store: Arc::clone(&self.store),
        }
    }
}

impl<O, S> GatewayState<O, S>
where
    O: RelevanceOracle + 'static,
    S: QueryStore + 'static,
{
    pub fn new(pipeline: HighlightPipeline<O, S>, store: Arc<S>) -> Self {
        Self { pipeline, store }
    }
}
