pub mod comment;
pub mod history;
pub mod task;
pub mod time_entry;
