pub mod comments;
pub mod diff;
pub mod events;
pub mod history;
pub mod tasks;
pub mod time_entries;
pub mod wall;

#[cfg(test)]
pub(crate) mod test_support;
