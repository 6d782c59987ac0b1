//! Non-blocking model loads.
//!
//! Every request runs on its own worker thread and reports back through a
//! oneshot channel. The frame loop polls the receivers between frames, so
//! all scene mutation stays on the owning thread.

use std::sync::Arc;

use futures::channel::oneshot;

use crate::assets::{AssetError, AssetSource, Placement};
use crate::model::SceneFragment;

type LoadResult = Result<SceneFragment, AssetError>;

/// Outcome of one finished request.
#[derive(Debug)]
pub enum LoadEvent {
    Loaded { placement: Placement, fragment: SceneFragment },
    Failed { placement: Placement, error: AssetError },
}

struct PendingLoad {
    placement: Placement,
    receiver: oneshot::Receiver<LoadResult>,
}

/// Completion side of a request whose result is supplied by the caller.
pub struct LoadHandle {
    sender: oneshot::Sender<LoadResult>,
}

impl LoadHandle {
    pub fn complete(self, result: LoadResult) {
        // receiver gone means the pipeline was dropped; nothing to report to
        let _ = self.sender.send(result);
    }
}

pub struct AssetPipeline {
    source: Arc<dyn AssetSource>,
    pending: Vec<PendingLoad>,
    ready: Vec<LoadEvent>,
}

impl AssetPipeline {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            pending: Vec::new(),
            ready: Vec::new(),
        }
    }

    /// Start loading `placement` on a worker thread.
    pub fn issue(&mut self, placement: Placement) {
        let (sender, receiver) = oneshot::channel();
        let source = Arc::clone(&self.source);
        let asset = placement.asset.clone();

        let spawned = std::thread::Builder::new()
            .name(format!("load-{}", placement.label))
            .spawn(move || {
                let _ = sender.send(source.load(&asset));
            });

        match spawned {
            Ok(_) => {
                tracing::debug!("issued load for {}", placement.label);
                self.pending.push(PendingLoad { placement, receiver });
            }
            Err(e) => {
                let error = AssetError::Io {
                    path: format!("<worker for {}>", placement.label).into(),
                    source: e,
                };
                self.ready.push(LoadEvent::Failed { placement, error });
            }
        }
    }

    /// Register a request whose result is delivered through the returned handle.
    pub fn defer(&mut self, placement: Placement) -> LoadHandle {
        let (sender, receiver) = oneshot::channel();
        self.pending.push(PendingLoad { placement, receiver });
        LoadHandle { sender }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Collect every request that finished since the last poll, in issue order.
    pub fn poll(&mut self) -> Vec<LoadEvent> {
        let mut events = std::mem::take(&mut self.ready);

        let mut i = 0;
        while i < self.pending.len() {
            let outcome = match self.pending[i].receiver.try_recv() {
                Ok(None) => {
                    i += 1;
                    continue;
                }
                Ok(Some(result)) => result,
                Err(oneshot::Canceled) => Err(AssetError::Cancelled),
            };
            let PendingLoad { placement, .. } = self.pending.remove(i);
            events.push(match outcome {
                Ok(fragment) => LoadEvent::Loaded { placement, fragment },
                Err(error) => LoadEvent::Failed { placement, error },
            });
        }

        events
    }
}
