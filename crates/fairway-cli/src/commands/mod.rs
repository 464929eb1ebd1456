pub mod common;
pub mod fetch;
pub mod gc;
pub mod merge;
pub mod push;
pub mod stats;
