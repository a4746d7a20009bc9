//! The comparison engine thread.
//!
//! ONNX sessions require `&mut` and inference is CPU-bound, so one
//! dedicated OS thread owns the extractor and serves requests over a
//! bounded channel. HTTP handlers talk to it through the clone-safe
//! [`EngineHandle`].

use facematch_core::compare;
use facematch_core::{ComparisonOutcome, EmbeddingExtractor};
use image::RgbImage;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("comparison engine unavailable")]
    ChannelClosed,
}

/// Messages sent from HTTP handlers to the engine thread.
enum EngineRequest {
    Compare {
        first: RgbImage,
        second: RgbImage,
        tolerance: f64,
        reply: oneshot::Sender<ComparisonOutcome>,
    },
}

/// Clone-safe handle to the engine thread.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Compare the faces in two decoded images at the given tolerance.
    ///
    /// Extraction faults surface inside the returned outcome; `Err` only
    /// means the engine thread is gone.
    pub async fn compare(
        &self,
        first: RgbImage,
        second: RgbImage,
        tolerance: f64,
    ) -> Result<ComparisonOutcome, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Compare {
                first,
                second,
                tolerance,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the engine on a dedicated OS thread.
///
/// The extractor moves onto the thread and is never shared; requests are
/// served one at a time in arrival order.
pub fn spawn_engine<E>(mut extractor: E) -> EngineHandle
where
    E: EmbeddingExtractor + Send + 'static,
{
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("facematch-engine".into())
        .spawn(move || {
            tracing::info!("engine thread started");
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Compare {
                        first,
                        second,
                        tolerance,
                        reply,
                    } => {
                        let outcome =
                            compare::compare_images(&mut extractor, &first, &second, tolerance);
                        let _ = reply.send(outcome);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })
        .expect("failed to spawn engine thread");

    EngineHandle { tx }
}
