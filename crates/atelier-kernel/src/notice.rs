//! Toast-style notices surfaced to the user.
//!
//! Notices are transient and dismissible. The board is bounded: when it is
//! full the oldest notice is evicted.

use std::collections::VecDeque;
use std::fmt;

/// Default number of notices kept.
pub const DEFAULT_NOTICE_CAPACITY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

impl fmt::Display for NoticeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NoticeLevel::Info => "info",
            NoticeLevel::Success => "success",
            NoticeLevel::Error => "error",
        })
    }
}

/// A short title plus a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: u64,
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.description.is_empty() {
            write!(f, "{}", self.title)
        } else {
            write!(f, "{}: {}", self.title, self.description)
        }
    }
}

/// Bounded queue of undismissed notices.
#[derive(Debug)]
pub struct NoticeBoard {
    notices: VecDeque<Notice>,
    capacity: usize,
    next_id: u64,
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::new(DEFAULT_NOTICE_CAPACITY)
    }
}

impl NoticeBoard {
    pub fn new(capacity: usize) -> Self {
        Self {
            notices: VecDeque::with_capacity(capacity.min(64)),
            capacity: capacity.max(1),
            next_id: 0,
        }
    }

    /// Post a notice, evicting the oldest one if the board is full.
    pub fn push(
        &mut self,
        level: NoticeLevel,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> u64 {
        self.next_id += 1;
        let id = self.next_id;
        if self.notices.len() == self.capacity {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            id,
            level,
            title: title.into(),
            description: description.into(),
        });
        id
    }

    pub fn info(&mut self, title: impl Into<String>, description: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Info, title, description)
    }

    pub fn success(&mut self, title: impl Into<String>, description: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Success, title, description)
    }

    pub fn error(&mut self, title: impl Into<String>, description: impl Into<String>) -> u64 {
        self.push(NoticeLevel::Error, title, description)
    }

    /// Remove one notice. Returns `false` if it was already gone.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        self.notices.len() != before
    }

    /// Current notices, oldest first.
    pub fn list(&self) -> Vec<Notice> {
        self.notices.iter().cloned().collect()
    }

    /// Take every notice, leaving the board empty.
    pub fn drain(&mut self) -> Vec<Notice> {
        self.notices.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.notices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_and_drain() {
        let mut board = NoticeBoard::default();
        board.error("Generation failed", "timed out after 60s");
        board.success("Patch applied", "");
        let notices = board.drain();
        assert_eq!(notices.len(), 2);
        assert_eq!(notices[0].level, NoticeLevel::Error);
        assert_eq!(notices[0].to_string(), "Generation failed: timed out after 60s");
        assert_eq!(notices[1].to_string(), "Patch applied");
        assert!(board.is_empty());
    }

    #[test]
    fn test_dismiss() {
        let mut board = NoticeBoard::default();
        let a = board.info("a", "");
        let b = board.info("b", "");
        assert!(board.dismiss(a));
        assert!(!board.dismiss(a));
        assert_eq!(board.list()[0].id, b);
    }

    #[test]
    fn test_bounded() {
        let mut board = NoticeBoard::new(2);
        board.info("1", "");
        board.info("2", "");
        board.info("3", "");
        let titles: Vec<_> = board.list().into_iter().map(|n| n.title).collect();
        assert_eq!(titles, vec!["2", "3"]);
        assert_eq!(board.len(), 2);
    }
}
