use std::collections::VecDeque;

use thiserror::Error;

/// Identifies one in-flight model load.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AssetTicket(pub u64);

impl std::fmt::Display for AssetTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ticket#{}", self.0)
    }
}

/// Loader-assigned identity of a built model.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ModelHandle(pub u64);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssetError {
    #[error("asset {0} not found")]
    NotFound(String),
    #[error("asset {file} could not be built: {reason}")]
    Malformed { file: String, reason: String },
}

pub type AssetOutcome = Result<ModelHandle, AssetError>;

/// Starts asynchronous model builds.
///
/// `load` must return immediately. The outcome of every ticket is delivered
/// later, exactly once, by the event loop that owns the loader.
pub trait AssetLoader {
    fn load(&mut self, file: &str) -> AssetTicket;
}

/// Loader that only records requests; whoever drives it decides when and
/// how each ticket settles.
#[derive(Debug, Default)]
pub struct QueuedLoader {
    next_ticket: u64,
    queue: VecDeque<(AssetTicket, String)>,
}

impl QueuedLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> impl Iterator<Item = &(AssetTicket, String)> {
        self.queue.iter()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn pop(&mut self) -> Option<(AssetTicket, String)> {
        self.queue.pop_front()
    }

    pub fn drain(&mut self) -> Vec<(AssetTicket, String)> {
        self.queue.drain(..).collect()
    }

    /// Removes and returns the first queued request for `file`.
    pub fn take_file(&mut self, file: &str) -> Option<AssetTicket> {
        let idx = self.queue.iter().position(|(_, f)| f == file)?;
        self.queue.remove(idx).map(|(ticket, _)| ticket)
    }
}

impl AssetLoader for QueuedLoader {
    fn load(&mut self, file: &str) -> AssetTicket {
        self.next_ticket += 1;
        let ticket = AssetTicket(self.next_ticket);
        self.queue.push_back((ticket, file.to_string()));
        ticket
    }
}

#[cfg(test)]
mod tests {
    use super::{AssetLoader, AssetTicket, QueuedLoader};

    #[test]
    fn tickets_are_unique_and_queued_in_order() {
        let mut loader = QueuedLoader::new();
        let a = loader.load("daa-target.dae");
        let b = loader.load("daa-alert.dae");
        assert_ne!(a, b);
        assert_eq!(loader.len(), 2);
        assert_eq!(loader.take_file("daa-alert.dae"), Some(b));
        assert_eq!(loader.pop(), Some((a, "daa-target.dae".to_string())));
        assert!(loader.is_empty());
        assert_eq!(loader.take_file("daa-alert.dae"), None::<AssetTicket>);
    }
}
