//! Command history stored inside the engine's history region.
//!
//! Entries are NUL-terminated, oldest first. When a new entry does not fit,
//! the oldest entries are evicted. Entering a command already present moves
//! it to the newest position.

#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct History {
    used: usize,
}

impl History {
    pub const fn new() -> Self {
        Self { used: 0 }
    }

    /// Number of stored entries.
    pub fn len(&self, region: &[u8]) -> usize {
        region[..self.used].iter().filter(|&&b| b == 0).count()
    }

    /// Store `line` as the newest entry.
    pub fn push(&mut self, region: &mut [u8], line: &[u8]) {
        let needed = line.len() + 1;
        if line.is_empty() || needed > region.len() {
            return;
        }

        if let Some(start) = self.find(region, line) {
            self.remove_at(region, start, needed);
        }

        while self.used + needed > region.len() {
            let oldest = region[..self.used]
                .iter()
                .position(|&b| b == 0)
                .map_or(self.used, |end| end + 1);
            self.remove_at(region, 0, oldest);
        }

        region[self.used..self.used + line.len()].copy_from_slice(line);
        region[self.used + line.len()] = 0;
        self.used += needed;
    }

    /// Entry `age` steps back from the newest (1 = newest).
    pub fn get<'r>(&self, region: &'r [u8], age: usize) -> Option<&'r [u8]> {
        if age == 0 {
            return None;
        }
        region[..self.used]
            .split(|&b| b == 0)
            .rev()
            .skip(1) // trailing empty piece after the last terminator
            .nth(age - 1)
    }

    fn find(&self, region: &[u8], line: &[u8]) -> Option<usize> {
        let mut start = 0;
        for entry in region[..self.used].split(|&b| b == 0) {
            if entry == line {
                return Some(start);
            }
            start += entry.len() + 1;
        }
        None
    }

    fn remove_at(&mut self, region: &mut [u8], start: usize, len: usize) {
        region.copy_within(start + len..self.used, start);
        self.used -= len;
    }
}
