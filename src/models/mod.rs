pub mod device;
pub mod raid;
pub mod snapshot;
