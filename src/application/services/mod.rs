mod sync;

pub use sync::{Backoff, FullSyncReport, SyncSupervisor};
