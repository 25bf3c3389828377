// ============================================================================
// Status Sync - mirrors the active order onto the live status surface
// ============================================================================
//
// - surface: the external surface contract and an in-memory implementation
// - bridge:  the reconciliation algorithm
// - worker:  single-flight task driven by the lifecycle's snapshot channel
//
// ============================================================================

pub mod surface;
pub mod bridge;
pub mod worker;

pub use surface::{
    InMemoryLiveStatusSurface, LiveStatusSurface, SessionId, StatusPayload, SurfaceCall, SurfaceError,
    SurfaceOp,
};
pub use bridge::{ReconcileOutcome, StatusSyncBridge, TrackedSession};
pub use worker::{spawn, StatusSyncHandle};
