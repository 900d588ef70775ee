pub mod config;
pub mod logging;

pub mod checkpoint;
pub mod checksum;
pub mod control;
pub mod fetch;
pub mod manifest;
pub mod outcome;
pub mod retry;
pub mod scheduler;
pub mod storage;
