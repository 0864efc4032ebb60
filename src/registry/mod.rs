//! Stream registry for camera fan-out
//!
//! The registry keeps at most one live stream session per camera and routes
//! viewer sinks to it. The first viewer of a camera starts its session; the
//! last viewer to leave stops it.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<StreamRegistry>
//!                  ┌─────────────────────────────┐
//!                  │ slots: HashMap<CameraId,    │
//!                  │   Slot {                    │
//!                  │     Mutex<SlotState {       │
//!                  │       session: Option<..>,  │
//!                  │     }>                      │
//!                  │   }                         │
//!                  │ >                           │
//!                  └──────────────┬──────────────┘
//!                                 │
//!        ┌────────────────────────┼────────────────────────┐
//!        │                        │                        │
//!        ▼                        ▼                        ▼
//!   [Viewer A]               [Viewer B]               [Viewer C]
//!   attach("CAM1")           attach("CAM1")           attach("CAM2")
//!        │                        │                        │
//!        └──► StreamSession(CAM1) ◄┘                StreamSession(CAM2)
//!               encode once ──► send() to A, B       encode once ──► C
//! ```
//!
//! # Shared Payloads
//!
//! Each frame is encoded into a single `bytes::Bytes` envelope. Sinks receive
//! clones of that handle, so fan-out to many viewers costs a reference count
//! per viewer, not a copy.

pub mod config;
pub mod store;

pub use config::RegistryConfig;
pub use store::StreamRegistry;
