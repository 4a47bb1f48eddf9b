//! Background mesh loading
//!
//! A mesh load runs on its own thread and is resolved once, before the first
//! frame samples it. Nothing else in the pipeline spawns threads that outlive
//! a call.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Instant;

use tracing::{debug, info};

use super::MeshData;
use crate::error::{DelaunayError, Result};

/// Spawns mesh load tasks
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshLoader;

impl MeshLoader {
    /// Run `load` on a background thread
    ///
    /// # Example
    ///
    /// ```rust
    /// use cloud_delaunay::mesh::{sphere_mesh, MeshLoader};
    ///
    /// let pending = MeshLoader::spawn(|| Ok(sphere_mesh(100, 1.0, 3)));
    /// let mesh = pending.wait().unwrap();
    /// assert_eq!(mesh.vertex_count(), 100);
    /// ```
    pub fn spawn<F>(load: F) -> PendingMesh
    where
        F: FnOnce() -> Result<MeshData> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let result = load();
            debug!(elapsed = ?start.elapsed(), ok = result.is_ok(), "mesh load task finished");
            // the receiver may already be gone
            let _ = sender.send(result);
        });

        PendingMesh {
            receiver,
            handle: Some(handle),
            ready: None,
        }
    }
}

/// A mesh that is still loading
#[derive(Debug)]
pub struct PendingMesh {
    receiver: Receiver<Result<MeshData>>,
    handle: Option<JoinHandle<()>>,
    ready: Option<Result<MeshData>>,
}

impl PendingMesh {
    /// True once the load has finished, successfully or not
    pub fn is_ready(&mut self) -> bool {
        if self.ready.is_some() {
            return true;
        }
        match self.receiver.try_recv() {
            Ok(result) => {
                self.ready = Some(result);
                true
            }
            Err(TryRecvError::Empty) => false,
            // the task ended without sending, so it panicked
            Err(TryRecvError::Disconnected) => {
                self.ready = Some(Err(self.join_failure()));
                true
            }
        }
    }

    /// Block until the load finishes
    ///
    /// # Errors
    ///
    /// - `MeshLoad` if the task failed or panicked
    /// - `EmptyMesh` if the loaded mesh has no vertices
    pub fn wait(mut self) -> Result<MeshData> {
        let result = match self.ready.take() {
            Some(result) => result,
            None => match self.receiver.recv() {
                Ok(result) => result,
                Err(_) => Err(self.join_failure()),
            },
        };

        let mesh = result?;
        if mesh.is_empty() {
            return Err(DelaunayError::EmptyMesh);
        }
        info!(
            vertices = mesh.vertex_count(),
            triangles = mesh.triangle_count(),
            "mesh loaded"
        );
        Ok(mesh)
    }

    fn join_failure(&mut self) -> DelaunayError {
        let reason = match self.handle.take().map(JoinHandle::join) {
            Some(Err(payload)) => payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "load task panicked".to_string()),
            _ => "load task ended without a result".to_string(),
        };
        DelaunayError::MeshLoad(reason)
    }
}
