use crate::normalize::NormalizedUrl;
use std::collections::{HashSet, VecDeque};

/// FIFO queue of URLs awaiting a fetch.
///
/// The queue is mirrored by a hash set so membership checks stay O(1) and a
/// URL can never sit in the queue twice.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<NormalizedUrl>,
    queued: HashSet<NormalizedUrl>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail. Returns `false` when the URL is already queued.
    pub fn push(&mut self, url: NormalizedUrl) -> bool {
        if self.queued.contains(&url) {
            return false;
        }
        self.queued.insert(url.clone());
        self.queue.push_back(url);
        true
    }

    pub fn pop(&mut self) -> Option<NormalizedUrl> {
        let url = self.queue.pop_front()?;
        self.queued.remove(&url);
        Some(url)
    }

    pub fn contains(&self, url: &NormalizedUrl) -> bool {
        self.queued.contains(url)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// URLs already taken for fetching, whatever the outcome. Only grows.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: HashSet<NormalizedUrl>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-then-insert in one step. Returns `true` if the URL was new.
    pub fn insert(&mut self, url: NormalizedUrl) -> bool {
        self.urls.insert(url)
    }

    pub fn contains(&self, url: &NormalizedUrl) -> bool {
        self.urls.contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    fn url(path: &str) -> NormalizedUrl {
        normalize(&format!("http://example.com{}", path), None).unwrap()
    }

    #[test]
    fn test_fifo_order() {
        let mut frontier = Frontier::new();
        frontier.push(url("/a"));
        frontier.push(url("/b"));
        frontier.push(url("/c"));

        assert_eq!(frontier.pop(), Some(url("/a")));
        assert_eq!(frontier.pop(), Some(url("/b")));
        assert_eq!(frontier.pop(), Some(url("/c")));
        assert_eq!(frontier.pop(), None);
    }

    #[test]
    fn test_no_duplicates_while_queued() {
        let mut frontier = Frontier::new();
        assert!(frontier.push(url("/a")));
        assert!(!frontier.push(url("/a#frag")));
        assert_eq!(frontier.len(), 1);
        assert!(frontier.contains(&url("/a")));

        frontier.pop();
        assert!(!frontier.contains(&url("/a")));
        assert!(frontier.is_empty());
        // Once dequeued it may be pushed again; the visited set guards re-fetching.
        assert!(frontier.push(url("/a")));
    }

    #[test]
    fn test_visited_insert_reports_novelty() {
        let mut visited = VisitedSet::new();
        assert!(visited.is_empty());
        assert!(visited.insert(url("/a")));
        assert!(!visited.insert(url("/a?x=1")));
        assert!(visited.contains(&url("/a")));
        assert_eq!(visited.len(), 1);
    }
}
