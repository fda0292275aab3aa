pub mod augment;
pub mod data_loader;
pub mod job;
