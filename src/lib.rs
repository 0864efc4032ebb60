//! Live industrial camera streaming with viewer fan-out
//!
//! `camstream` runs one acquisition loop per physical camera, no matter how
//! many viewers watch it, and pushes every captured frame to all of them.
//!
//! - [`StreamRegistry`] maps camera identities to live sessions. Viewers
//!   [`attach`](StreamRegistry::attach) and [`detach`](StreamRegistry::detach);
//!   the first attach starts the camera and the last detach stops it.
//! - [`StreamSession`] owns one camera connection on a dedicated worker,
//!   grabs latest-only frames, encodes each one to a JPEG envelope once and
//!   broadcasts it to the attached sinks.
//! - [`CaptureDevice`] / [`DeviceOpener`] and [`FrameSink`] are the seams to
//!   the camera SDK and to the viewer transport.
//! - [`features`] provides typed, validated feature configuration.
//!
//! # Example
//! ```no_run
//! use camstream::device::{CameraId, SimulatedOpener};
//! use camstream::sink::ViewerMessage;
//! use camstream::StreamRegistry;
//!
//! # async fn example() {
//! let registry = StreamRegistry::new(SimulatedOpener::new());
//! let camera = CameraId::new("40012345");
//!
//! let (sink, mut viewer) = registry.attach_viewer(&camera).await;
//! if let Some(ViewerMessage::Frame(envelope)) = viewer.recv().await {
//!     println!("{} byte envelope", envelope.len());
//! }
//! registry.detach(&camera, &sink).await;
//! # }
//! ```

pub mod device;
pub mod encode;
pub mod error;
pub mod features;
pub mod registry;
pub mod session;
pub mod sink;
pub mod stats;

pub use device::{CameraId, CaptureDevice, DeviceOpener, Frame};
pub use error::{DeviceError, Error, Result};
pub use registry::{RegistryConfig, StreamRegistry};
pub use session::{SessionPhase, StreamSession};
pub use sink::{ChannelSink, CloseCode, FrameSink, SinkHandle};
pub use stats::SessionStats;
