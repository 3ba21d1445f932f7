//! POI Telemetry
//!
//! Tracks which points of interest a moving observer can actually see, and
//! on each route or attention event writes one fixed-width row describing the
//! observer and the nearest visible POIs.
//!
//! ## Architecture
//!
//! ```text
//! TelemetrySession  (session.rs)       ← lifecycle root, one per run
//!   ├── IdentityRegistry   (identity.rs)   ← permanent ids, bucketed walk
//!   ├── VisibilityClassifier (visibility.rs) ← frustum + occlusion per tick
//!   │     └── VisibleSet   (registry.rs)   ← edge-triggered membership
//!   ├── ObserverTracker    (observer.rs)   ← pose + session clock
//!   ├── CheckpointTrack    (checkpoint.rs) ← route events
//!   └── EventAggregator    (telemetry.rs)  ← packet → row → RowSink
//!         └── flatten      (flatten.rs)    ← 5 + 7·N columns
//! ```
//!
//! The scene (`scene.rs`) and its collision world are built from a
//! [`protocol::SceneDescription`]. The `replay` feature adds an async row
//! transport (`transport.rs`) and the `poi-telemetry-replay` binary.

pub mod checkpoint;
pub mod error;
pub mod flatten;
pub mod geometry;
pub mod identity;
pub mod observer;
pub mod protocol;
pub mod registry;
pub mod scene;
pub mod session;
pub mod sink;
pub mod telemetry;
pub mod types;
pub mod visibility;

// Async transport requires the `replay` feature.
#[cfg(feature = "replay")]
pub mod transport;

pub use checkpoint::{Checkpoint, CheckpointTrack};
pub use error::{Result, TelemetryError};
pub use geometry::{GlyphLayout, MonospaceLayout, Obb, Ray};
pub use identity::IdentityRegistry;
pub use observer::{Observer, ObserverSnapshot, ObserverStateProvider, ObserverTracker};
pub use registry::VisibleSet;
pub use scene::{CollisionWorld, PhysicsScene, PoiBody, PoiKey, PointOfInterest, Scene};
pub use session::TelemetrySession;
pub use sink::{LogSink, MemorySink, RowSink};
pub use telemetry::{EventAggregator, EventKind, EventPacket, PoiProvider, PoiSnapshot};
pub use types::{PoiCategory, Quat, SessionStats, TelemetryConfig, Transform, Vec3};
pub use visibility::{TickReport, VisibilityClassifier};
