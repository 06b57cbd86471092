pub mod config;
pub mod error;
pub mod lineardoc;
pub mod processor;
pub mod segmentation;
