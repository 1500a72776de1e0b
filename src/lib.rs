pub mod asset;
pub mod config;
pub mod core;
pub mod events;
pub mod execution;
pub mod scheduler;
pub mod testing;
pub mod transfer;

pub use asset::{ArchiveAsset, ArchiveSummary, Asset, AssetError, FileAsset};
pub use core::job::{BackupJob, JobError, JobType};
pub use core::naming::NamingPolicy;
pub use core::state::{JobState, RunState, StartPolicy};
pub use core::types::{JobId, RunId};
pub use events::{Event, EventBus, EventHandler};
pub use execution::{ArchiveBackup, Backup, BackupError, CopyBackup, JobWorker, RemoteBackup};
pub use scheduler::{Scheduler, SchedulerError, SchedulerHandle, SchedulerState};
pub use transfer::{Credentials, SftpShipper, Shipper, TransferError};
