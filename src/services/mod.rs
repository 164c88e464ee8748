pub mod client;
pub mod controller;
pub mod monitor;
pub mod preview;
pub mod scoring;
pub mod upload;
pub mod validation;
