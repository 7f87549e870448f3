#![forbid(unsafe_code)]

//! Page scroll freezing shared by every open modal.
//!
//! The lock pins the page with fixed positioning while modals are open and
//! scrolls back to the saved offset once the last one closes. Acquire and
//! release are idempotent, so nesting never pins twice.

use dimmer_core::Document;

/// Freezes and restores page scroll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScrollLock {
    locked: bool,
    saved_offset: i32,
    acquisitions: u32,
    releases: u32,
}

impl ScrollLock {
    pub const fn new() -> Self {
        Self {
            locked: false,
            saved_offset: 0,
            acquisitions: 0,
            releases: 0,
        }
    }

    #[inline]
    pub const fn is_locked(&self) -> bool {
        self.locked
    }

    /// Page offset recorded by the last acquire.
    #[inline]
    pub const fn saved_offset(&self) -> i32 {
        self.saved_offset
    }

    /// Number of acquires that actually pinned the page.
    #[inline]
    pub const fn acquisitions(&self) -> u32 {
        self.acquisitions
    }

    /// Number of releases that actually unpinned the page.
    #[inline]
    pub const fn releases(&self) -> u32 {
        self.releases
    }

    /// Record the scroll offset and pin the page. No-op while locked.
    pub(crate) fn acquire(&mut self, doc: &mut dyn Document) {
        if self.locked {
            return;
        }
        self.saved_offset = doc.scroll_y();
        doc.pin_page(self.saved_offset);
        self.locked = true;
        self.acquisitions += 1;
        #[cfg(feature = "tracing")]
        tracing::debug!(offset = self.saved_offset, "scroll locked");
    }

    /// Unpin the page and scroll back to the saved offset. No-op when
    /// unlocked.
    pub(crate) fn release(&mut self, doc: &mut dyn Document) {
        if !self.locked {
            return;
        }
        doc.unpin_page();
        doc.scroll_to(self.saved_offset);
        self.locked = false;
        self.releases += 1;
        #[cfg(feature = "tracing")]
        tracing::debug!(offset = self.saved_offset, "scroll released");
    }
}
