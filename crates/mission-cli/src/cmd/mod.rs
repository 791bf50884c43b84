pub mod backlog;
pub mod checkpoint;
pub mod diagnosis;
pub mod status;
pub mod validate;
