//! Staging and cleanup for Zipgate.
//!
//! Content headed for the remote store is materialized here, held only as
//! long as one operation needs it, and reclaimed afterwards. Leftovers from
//! crashed runs are swept at startup.

pub mod files;
pub mod handle;
pub mod lock;
pub mod manager;
pub mod sandbox;
pub mod supervisor;
pub mod sweep;

pub use files::{SandboxEntry, SandboxFiles};
pub use handle::StagedHandle;
pub use lock::LockMarker;
pub use manager::{StagingLimits, StagingManager};
pub use sandbox::SandboxRoot;
pub use supervisor::CleanupSupervisor;
pub use sweep::{SweepPolicy, SweepReport};
