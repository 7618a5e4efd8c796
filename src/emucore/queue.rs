// Bounded ring buffer of pending output level transitions. Cursors are
// logical (never wrapped); they are reduced modulo the capacity only when
// indexing the storage, so `write - read` is always the live entry count.

pub const DELAY_ENTRIES: usize = 1024;

#[derive(Clone, Copy, Default, Debug, PartialEq)]
pub struct DelayEntry {
    /// Virtual time of the transition, in milliseconds.
    pub index: f64,
    /// Output level from this time onwards.
    pub level: f32,
}

pub struct DelayQueue {
    entries: [DelayEntry; DELAY_ENTRIES],
    read: u64,
    write: u64,
}

impl DelayQueue {
    pub fn new() -> Self {
        DelayQueue {
            entries: [DelayEntry::default(); DELAY_ENTRIES],
            read: 0,
            write: 0,
        }
    }

    fn slot(cursor: u64) -> usize {
        cursor as usize % DELAY_ENTRIES
    }

    /// Append a transition. A level equal to the last appended one is
    /// dropped; a full queue evicts its oldest entry, which the listener
    /// has effectively already heard as the baseline level.
    pub fn push(&mut self, index: f64, level: f32) {
        if self.write > 0 && self.entries[Self::slot(self.write - 1)].level == level {
            return;
        }
        if self.write - self.read == DELAY_ENTRIES as u64 {
            self.read += 1;
        }
        self.entries[Self::slot(self.write)] = DelayEntry { index, level };
        self.write += 1;
    }

    /// Consume the front entry if it lies before `limit`; entries at or
    /// beyond it stay queued for the next sample window.
    pub fn pop_before(&mut self, limit: f64) -> Option<DelayEntry> {
        if self.read == self.write {
            return None;
        }
        let entry = self.entries[Self::slot(self.read)];
        if entry.index >= limit {
            return None;
        }
        self.read += 1;
        Some(entry)
    }

    /// Shift every unread entry back in time by `adjust` milliseconds.
    /// Relative order is untouched, so this is transparent to integration.
    pub fn rebase(&mut self, adjust: f64) {
        for cursor in self.read..self.write {
            self.entries[Self::slot(cursor)].index -= adjust;
        }
    }

    pub fn len(&self) -> usize {
        (self.write - self.read) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.read == self.write
    }
}
