//! Stream registry implementation
//!
//! Maps each camera identity to at most one live [`StreamSession`].
//!
//! Every identity has its own slot guarded by an async mutex. Attach, detach
//! and the teardown decision for that identity all run inside that one lock,
//! so two sessions can never exist for the same camera and a session is
//! never stopped while a viewer is being added to it. Different identities
//! only share the directory lock, which is held just long enough to look up
//! or insert a slot.
//!
//! A slot whose session was torn down is retired and removed from the
//! directory. An attacher that was already waiting on a retired slot goes
//! back to the directory and gets a fresh one.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use crate::device::{CameraId, DeviceOpener};
use crate::error::Result;
use crate::session::{SessionPhase, StreamSession};
use crate::sink::{ChannelSink, CloseCode, SinkHandle, ViewerReceiver};
use crate::stats::SessionStats;

use super::config::RegistryConfig;

#[derive(Default)]
struct SlotState {
    retired: bool,
    session: Option<StreamSession>,
}

#[derive(Default)]
struct Slot {
    state: Mutex<SlotState>,
}

/// Central registry for all camera streams
pub struct StreamRegistry<O: DeviceOpener> {
    /// Camera identity to session slot
    slots: RwLock<HashMap<CameraId, Arc<Slot>>>,

    /// Opens devices for new sessions
    opener: Arc<O>,

    /// Configuration
    config: RegistryConfig,
}

impl<O: DeviceOpener> StreamRegistry<O> {
    /// Create a new registry with default configuration
    pub fn new(opener: O) -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            opener: Arc::new(opener),
            config: RegistryConfig::default(),
        }
    }

    /// Create a new registry with custom configuration
    ///
    /// Fails with [`Error::Config`] if the configuration does not validate.
    pub fn with_config(opener: O, config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            slots: RwLock::new(HashMap::new()),
            opener: Arc::new(opener),
            config,
        })
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get the device opener
    pub fn opener(&self) -> &Arc<O> {
        &self.opener
    }

    async fn slot_for(&self, id: &CameraId) -> Arc<Slot> {
        let mut slots = self.slots.write().await;
        Arc::clone(slots.entry(id.clone()).or_default())
    }

    async fn existing_slot(&self, id: &CameraId) -> Option<Arc<Slot>> {
        self.slots.read().await.get(id).cloned()
    }

    async fn retire(&self, id: &CameraId, slot: &Arc<Slot>, state: &mut SlotState) {
        state.retired = true;

        let mut slots = self.slots.write().await;
        if slots.get(id).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            slots.remove(id);
        }
    }

    /// Attach a viewer sink to a camera's stream
    ///
    /// Starts a session if none is live for `id`. A session that ended after
    /// a device failure is replaced by a fresh one.
    pub async fn attach(&self, id: &CameraId, sink: SinkHandle) {
        let mut sink = sink;

        loop {
            let slot = self.slot_for(id).await;
            let mut state = slot.state.lock().await;
            if state.retired {
                continue;
            }

            if let Some(mut dead) = state.session.take_if(|s| !s.is_alive()) {
                dead.stop().await;
                tracing::info!(camera = %id, "Replacing ended session");
            }

            if let Some(session) = state.session.as_ref() {
                match session.add_sink(sink) {
                    Ok(_) => return,
                    Err(returned) => {
                        // Worker tore down between the liveness check and the add
                        sink = returned;
                        if let Some(mut dead) = state.session.take() {
                            dead.stop().await;
                        }
                    }
                }
            }

            let mut session = StreamSession::new(id.clone());
            if let Err(returned) = session.add_sink(sink) {
                sink = returned;
                continue;
            }
            session.start(Arc::clone(&self.opener), &self.config);
            state.session = Some(session);
            tracing::info!(camera = %id, "Stream created");
            return;
        }
    }

    /// Create a channel-backed viewer and attach it
    ///
    /// Returns the sink handle (needed for [`detach`](Self::detach)) and the
    /// receiver the connection task reads from.
    pub async fn attach_viewer(&self, id: &CameraId) -> (SinkHandle, ViewerReceiver) {
        let (sink, receiver) = ChannelSink::channel(self.config.sink_buffer);
        let handle: SinkHandle = sink;
        self.attach(id, Arc::clone(&handle)).await;
        (handle, receiver)
    }

    /// Detach a viewer sink
    ///
    /// When the last sink leaves, the session is stopped (this waits for the
    /// worker to exit and the device to close) and removed. Detaching an
    /// unknown camera or a sink that is not attached is a no-op.
    pub async fn detach(&self, id: &CameraId, sink: &SinkHandle) {
        let Some(slot) = self.existing_slot(id).await else {
            return;
        };
        let mut state = slot.state.lock().await;
        if state.retired {
            return;
        }

        let Some(session) = state.session.as_ref() else {
            return;
        };
        if session.remove_sink(sink).is_none() {
            tracing::debug!(camera = %id, "Detach of a sink that is not attached");
        }
        if session.sink_count() > 0 {
            return;
        }

        if let Some(mut session) = state.session.take() {
            session.stop().await;
        }
        self.retire(id, &slot, &mut state).await;
        tracing::info!(camera = %id, "Stream removed");
    }

    /// Number of live sessions
    ///
    /// Slots busy with an attach or detach are skipped, so the count never
    /// waits on a session that is being stopped.
    pub async fn session_count(&self) -> usize {
        let slots: Vec<Arc<Slot>> = self.slots.read().await.values().cloned().collect();

        slots
            .iter()
            .filter(|slot| {
                slot.state
                    .try_lock()
                    .is_ok_and(|state| state.session.as_ref().is_some_and(|s| s.is_alive()))
            })
            .count()
    }

    /// Whether a live session exists for `id`
    pub async fn is_streaming(&self, id: &CameraId) -> bool {
        let Some(slot) = self.existing_slot(id).await else {
            return false;
        };
        let state = slot.state.lock().await;
        state.session.as_ref().is_some_and(|s| s.is_alive())
    }

    /// Number of sinks attached to the camera's session
    pub async fn sink_count(&self, id: &CameraId) -> usize {
        let Some(slot) = self.existing_slot(id).await else {
            return 0;
        };
        let state = slot.state.lock().await;
        state.session.as_ref().map_or(0, |s| s.sink_count())
    }

    /// Phase of the camera's session, if one is registered
    pub async fn session_phase(&self, id: &CameraId) -> Option<SessionPhase> {
        let slot = self.existing_slot(id).await?;
        let state = slot.state.lock().await;
        state.session.as_ref().map(|s| s.phase())
    }

    /// Statistics for the camera's session
    pub async fn session_stats(&self, id: &CameraId) -> Option<SessionStats> {
        let slot = self.existing_slot(id).await?;
        let state = slot.state.lock().await;
        state.session.as_ref().map(|s| s.stats())
    }

    /// Run cleanup once
    ///
    /// Removes sessions whose worker ended on its own after a device failure.
    /// Their viewers were already closed with the fatal code. Slots busy with
    /// an attach or detach are skipped until the next pass.
    pub async fn cleanup(&self) {
        let slots: Vec<(CameraId, Arc<Slot>)> = self
            .slots
            .read()
            .await
            .iter()
            .map(|(id, slot)| (id.clone(), Arc::clone(slot)))
            .collect();

        for (id, slot) in slots {
            let Ok(mut state) = slot.state.try_lock() else {
                continue;
            };
            if state.retired || state.session.as_ref().map_or(true, |s| s.is_alive()) {
                continue;
            }

            if let Some(mut dead) = state.session.take() {
                dead.stop().await;
            }
            self.retire(&id, &slot, &mut state).await;
            tracing::info!(camera = %id, "Stream removed by cleanup");
        }
    }

    /// Spawn background cleanup task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = registry.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.cleanup().await;
            }
        })
    }

    /// Stop every session, closing remaining viewers normally
    pub async fn shutdown(&self) {
        let slots: Vec<(CameraId, Arc<Slot>)> = self.slots.write().await.drain().collect();

        for (id, slot) in slots {
            let mut state = slot.state.lock().await;
            state.retired = true;
            if let Some(mut session) = state.session.take() {
                let closed = session.close_sinks(CloseCode::NORMAL);
                session.stop().await;
                tracing::info!(camera = %id, sinks = closed, "Stream shut down");
            }
        }
    }
}
