//! Async front end: loads models once in the background and runs one
//! analysis at a time off the caller's task.

use std::sync::Arc;

use image::DynamicImage;
use strum::IntoEnumIterator;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::{
    error::AnalysisError,
    pipeline::Pipeline,
    report::AnalysisReport,
    runtime::{ModelRuntime, Readiness},
    traits::ModelLoader,
    types::ModelRole,
};

/// Cloneable handle to a shared pipeline and model runtime
#[derive(Clone)]
pub struct LeafAnalyzer {
    pipeline: Arc<Pipeline>,
    runtime: watch::Receiver<Option<Arc<ModelRuntime>>>,
    in_flight: Arc<Mutex<()>>,
}

impl LeafAnalyzer {
    /// Start loading both models on a blocking worker and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<L>(loader: L, pipeline: Pipeline) -> Self
    where
        L: ModelLoader + 'static,
    {
        let (tx, rx) = watch::channel(None);

        tokio::task::spawn_blocking(move || {
            let runtime = ModelRuntime::initialize(&loader);
            match runtime.readiness() {
                Readiness::Ready => info!("Both segmenters loaded"),
                Readiness::Degraded { failures } => {
                    warn!("Model runtime degraded, {} model(s) unavailable", failures.len())
                }
            }
            if tx.send(Some(Arc::new(runtime))).is_err() {
                debug!("Every analyzer handle was dropped before loading finished");
            }
        });

        Self::with_receiver(rx, pipeline)
    }

    /// Wrap a runtime that is already initialized
    pub fn from_runtime(runtime: ModelRuntime, pipeline: Pipeline) -> Self {
        let (_tx, rx) = watch::channel(Some(Arc::new(runtime)));
        Self::with_receiver(rx, pipeline)
    }

    fn with_receiver(runtime: watch::Receiver<Option<Arc<ModelRuntime>>>, pipeline: Pipeline) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            runtime,
            in_flight: Arc::new(Mutex::new(())),
        }
    }

    /// `None` while loading is still in progress
    pub fn readiness(&self) -> Option<Readiness> {
        self.runtime.borrow().as_ref().map(|runtime| runtime.readiness())
    }

    /// Wait for loading to finish, then report the first load failure if any
    pub async fn wait_until_loaded(&self) -> Result<(), AnalysisError> {
        let mut rx = self.runtime.clone();
        let runtime = rx
            .wait_for(Option::is_some)
            .await
            .map_err(|_| AnalysisError::Worker("model loading task exited without reporting".to_string()))?
            .clone();

        match runtime {
            Some(runtime) => runtime.readiness().into_result(),
            None => Err(AnalysisError::Worker("model runtime missing after load".to_string())),
        }
    }

    /// Analyze one image.
    ///
    /// Fails fast with `NotReady` while models are loading and with `Busy`
    /// while another analysis is running; never queues.
    pub async fn analyze(&self, image: DynamicImage) -> Result<AnalysisReport, AnalysisError> {
        let runtime = self.runtime.borrow().clone().ok_or_else(|| AnalysisError::NotReady {
            missing: ModelRole::iter().collect(),
        })?;

        let guard = self.in_flight.clone().try_lock_owned().map_err(|_| {
            debug!("Rejecting analysis, another request is in flight");
            AnalysisError::Busy
        })?;

        let pipeline = Arc::clone(&self.pipeline);
        tokio::task::spawn_blocking(move || {
            let _guard = guard;
            pipeline.analyze(&runtime, &image)
        })
        .await
        .map_err(|e| AnalysisError::Worker(e.to_string()))?
    }
}
