// SPDX-License-Identifier: GPL-3.0-only

//! Follow-up work returned from `AppModel::update`

use super::state::Message;
use std::time::Duration;

/// Work for the runtime to carry out after a message was handled
pub enum Task {
    /// Nothing to do
    None,
    /// Dispatch a message right away
    Done(Message),
    /// Dispatch a message once the duration has elapsed
    Delay(Duration, Message),
    /// Run a blocking closure off the UI thread and dispatch its result
    Perform(Box<dyn FnOnce() -> Message + Send + 'static>),
    /// Several tasks at once
    Batch(Vec<Task>),
    /// Leave the UI loop
    Exit,
}

impl Task {
    pub fn none() -> Self {
        Task::None
    }

    pub fn done(message: Message) -> Self {
        Task::Done(message)
    }

    pub fn delay(duration: Duration, message: Message) -> Self {
        Task::Delay(duration, message)
    }

    pub fn perform<F>(f: F) -> Self
    where
        F: FnOnce() -> Message + Send + 'static,
    {
        Task::Perform(Box::new(f))
    }

    /// Combine tasks, dropping the empty ones
    pub fn batch(tasks: impl IntoIterator<Item = Task>) -> Self {
        let mut tasks: Vec<Task> = tasks.into_iter().filter(|t| !t.is_none()).collect();
        match tasks.len() {
            0 => Task::None,
            1 => tasks.remove(0),
            _ => Task::Batch(tasks),
        }
    }

    pub fn exit() -> Self {
        Task::Exit
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Task::None)
    }

    /// Flatten into the individual tasks
    pub fn into_vec(self) -> Vec<Task> {
        match self {
            Task::None => Vec::new(),
            Task::Batch(tasks) => tasks.into_iter().flat_map(Task::into_vec).collect(),
            other => vec![other],
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Task::None => write!(f, "None"),
            Task::Done(message) => f.debug_tuple("Done").field(message).finish(),
            Task::Delay(duration, message) => {
                f.debug_tuple("Delay").field(duration).field(message).finish()
            }
            Task::Perform(_) => write!(f, "Perform(..)"),
            Task::Batch(tasks) => f.debug_tuple("Batch").field(tasks).finish(),
            Task::Exit => write!(f, "Exit"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_drops_empty_tasks() {
        assert!(Task::batch([Task::none(), Task::none()]).is_none());
        let single = Task::batch([Task::none(), Task::exit()]);
        assert!(matches!(single, Task::Exit));
    }

    #[test]
    fn test_into_vec_flattens() {
        let task = Task::batch([
            Task::exit(),
            Task::batch([Task::exit(), Task::done(Message::Quit)]),
        ]);
        assert_eq!(task.into_vec().len(), 3);
    }
}
