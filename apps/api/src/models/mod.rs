pub mod contact;
pub mod job;
pub mod resume;
pub mod task;
