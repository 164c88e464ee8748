pub mod job;
pub(crate) mod lenient;
pub mod responses;
pub mod result;
pub mod video;
