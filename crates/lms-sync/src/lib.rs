//! LMS mirror sync engine (spec §4.H) and scheduled aggregator (§4.H
//! component L).

pub mod ports;
pub mod scheduler;
pub mod sync;

pub use ports::{CanvasConnectionStore, CanvasItemStore, CanvasMaterialStore, CourseStore};
pub use scheduler::{run_scheduled_sync, ScheduledSyncReport};
pub use sync::{sync_user, SyncLimits, SyncOutcome};
