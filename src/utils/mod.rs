pub(crate) mod async_task;
mod path;

pub use path::*;

#[cfg(test)]
mod async_task_test;
