//! Offset/limit cursor over paged host listings.
//!
//! The cursor hands out one `PageRequest` at a time and stops as soon as a
//! page comes back with fewer results than were asked for.

use super::types::PageRequest;

#[derive(Debug, Clone)]
pub struct PageCursor {
    start: usize,
    limit: usize,
    exhausted: bool,
}

impl PageCursor {
    pub fn new(limit: usize) -> Self {
        Self {
            start: 0,
            limit: limit.max(1),
            exhausted: false,
        }
    }

    /// Request for the next page, or `None` once the listing is exhausted.
    pub fn next_request(&self) -> Option<PageRequest> {
        if self.exhausted {
            None
        } else {
            Some(PageRequest::new(self.start, self.limit))
        }
    }

    /// Record how many values the last requested page returned.
    pub fn advance(&mut self, received: usize) {
        if received < self.limit {
            self.exhausted = true;
        }
        self.start += received;
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}
