//! vCenter Automation REST API 模块

pub mod guest;
pub mod inventory;
pub mod snapshot;
pub mod task;
pub mod vm;

pub use guest::GuestApi;
pub use inventory::InventoryApi;
pub use snapshot::SnapshotApi;
pub use task::TaskApi;
pub use vm::VmApi;
