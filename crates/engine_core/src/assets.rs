//! Background asset loading with per-frame polling.
//!
//! Requests go to a worker thread; completions come back over a channel and
//! only become visible when [`AssetLoader::poll`] drains it at the top of a
//! frame. Handles are plain ids, so a consumer that goes away mid-load just
//! calls [`AssetLoader::release`] and the late result is dropped on arrival.

use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::JoinHandle;

use thiserror::Error;

/// Opaque id of a requested asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetHandle(u64);

/// Errors raised by the loader itself (individual load failures are
/// reported through [`LoadState::Failed`]).
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("failed to spawn asset worker thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("asset worker has shut down; cannot request {0}")]
    WorkerGone(String),
}

/// Load state of a single asset as seen by the frame loop.
#[derive(Debug)]
pub enum LoadState<T> {
    Pending,
    Ready(Arc<T>),
    Failed(String),
}

/// Aggregate progress over every request made so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadProgress {
    pub total: usize,
    pub loaded: usize,
    pub failed: usize,
}

impl LoadProgress {
    /// All requested assets resolved (successfully or not).
    pub fn is_complete(&self) -> bool {
        self.loaded + self.failed >= self.total
    }

    /// Fraction of resolved requests, 1.0 when nothing was requested.
    pub fn fraction(&self) -> f32 {
        if self.total == 0 {
            1.0
        } else {
            (self.loaded + self.failed) as f32 / self.total as f32
        }
    }
}

struct Request {
    handle: AssetHandle,
    path: String,
}

struct Completion<T> {
    handle: AssetHandle,
    path: String,
    result: anyhow::Result<T>,
}

/// Loads assets of one type on a worker thread.
pub struct AssetLoader<T: Send + Sync + 'static> {
    requests: Option<Sender<Request>>,
    results: Receiver<Completion<T>>,
    states: HashMap<AssetHandle, LoadState<T>>,
    released: HashSet<AssetHandle>,
    next_id: u64,
    progress: LoadProgress,
    worker: Option<JoinHandle<()>>,
}

impl<T: Send + Sync + 'static> AssetLoader<T> {
    /// Spawn a loader whose worker resolves paths with `resolver`.
    pub fn new<F>(name: &str, resolver: F) -> Result<Self, AssetError>
    where
        F: Fn(&str) -> anyhow::Result<T> + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (result_tx, result_rx) = mpsc::channel::<Completion<T>>();

        let worker = std::thread::Builder::new()
            .name(format!("assets-{name}"))
            .spawn(move || {
                for request in request_rx {
                    let result = resolver(&request.path);
                    let completion = Completion {
                        handle: request.handle,
                        path: request.path,
                        result,
                    };
                    if result_tx.send(completion).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self {
            requests: Some(request_tx),
            results: result_rx,
            states: HashMap::new(),
            released: HashSet::new(),
            next_id: 0,
            progress: LoadProgress::default(),
            worker: Some(worker),
        })
    }

    /// Queue an asset for loading and return its handle immediately.
    pub fn request(&mut self, path: &str) -> Result<AssetHandle, AssetError> {
        let handle = AssetHandle(self.next_id);
        let sender = self
            .requests
            .as_ref()
            .ok_or_else(|| AssetError::WorkerGone(path.to_string()))?;
        sender
            .send(Request {
                handle,
                path: path.to_string(),
            })
            .map_err(|_| AssetError::WorkerGone(path.to_string()))?;

        self.next_id += 1;
        self.progress.total += 1;
        self.states.insert(handle, LoadState::Pending);
        Ok(handle)
    }

    /// Drain completed loads. Call once at the top of a frame.
    /// Returns how many completions were applied.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        loop {
            let completion = match self.results.try_recv() {
                Ok(c) => c,
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            };
            applied += 1;

            let state = match completion.result {
                Ok(asset) => {
                    self.progress.loaded += 1;
                    LoadState::Ready(Arc::new(asset))
                }
                Err(e) => {
                    self.progress.failed += 1;
                    log::warn!("Asset {} failed to load: {:#}", completion.path, e);
                    LoadState::Failed(format!("{e:#}"))
                }
            };

            if self.released.remove(&completion.handle) {
                log::debug!("Dropping late asset {} (handle released)", completion.path);
                continue;
            }
            self.states.insert(completion.handle, state);
        }
        applied
    }

    /// Current state of a handle, `None` if it was released or never issued.
    pub fn state(&self, handle: AssetHandle) -> Option<&LoadState<T>> {
        self.states.get(&handle)
    }

    /// The asset if it has finished loading.
    pub fn get(&self, handle: AssetHandle) -> Option<Arc<T>> {
        match self.states.get(&handle) {
            Some(LoadState::Ready(asset)) => Some(Arc::clone(asset)),
            _ => None,
        }
    }

    /// Forget a handle. A load still in flight is discarded when it arrives.
    pub fn release(&mut self, handle: AssetHandle) {
        if let Some(LoadState::Pending) = self.states.remove(&handle) {
            self.released.insert(handle);
        }
    }

    /// Aggregate progress of every request made so far.
    pub fn progress(&self) -> LoadProgress {
        self.progress
    }
}

impl<T: Send + Sync + 'static> Drop for AssetLoader<T> {
    fn drop(&mut self) {
        // Closing the request channel ends the worker loop.
        self.requests.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Asset worker panicked");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn poll_until_complete<T: Send + Sync + 'static>(loader: &mut AssetLoader<T>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !loader.progress().is_complete() {
            loader.poll();
            assert!(Instant::now() < deadline, "loader did not finish in time");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn loads_resolve_after_poll() {
        let mut loader = AssetLoader::new("test", |path: &str| Ok(path.len())).unwrap();
        let a = loader.request("tree.fbx").unwrap();
        let b = loader.request("nest.obj").unwrap();
        assert!(matches!(loader.state(a), Some(LoadState::Pending)));

        poll_until_complete(&mut loader);

        assert_eq!(loader.get(a).as_deref(), Some(&8));
        assert_eq!(loader.get(b).as_deref(), Some(&8));
        assert_eq!(
            loader.progress(),
            LoadProgress { total: 2, loaded: 2, failed: 0 }
        );
    }

    #[test]
    fn failures_count_towards_completion() {
        let mut loader = AssetLoader::new("test", |path: &str| {
            if path.ends_with(".missing") {
                anyhow::bail!("no such file: {path}");
            }
            Ok(())
        })
        .unwrap();
        let ok = loader.request("a.obj").unwrap();
        let bad = loader.request("b.missing").unwrap();

        poll_until_complete(&mut loader);

        assert!(loader.get(ok).is_some());
        assert!(matches!(loader.state(bad), Some(LoadState::Failed(_))));
        assert_eq!(loader.progress().failed, 1);
        assert_eq!(loader.progress().fraction(), 1.0);
    }

    #[test]
    fn released_handle_never_becomes_ready() {
        let mut loader = AssetLoader::new("test", |_: &str| {
            std::thread::sleep(Duration::from_millis(20));
            Ok(1u8)
        })
        .unwrap();
        let handle = loader.request("nest.obj").unwrap();
        loader.release(handle);

        poll_until_complete(&mut loader);

        assert!(loader.state(handle).is_none());
        assert!(loader.get(handle).is_none());
    }
}
