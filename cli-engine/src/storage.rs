//! Backing storage for the engine's buffers.

use crate::config::CliUint;
use core::mem::size_of;

#[cfg(feature = "alloc")]
use alloc::vec::Vec;

/// Memory the engine carves its FIFO, line, history and tables from.
#[derive(Debug)]
pub enum Storage<'s> {
    /// Caller-supplied, statically provisioned words.
    Borrowed(&'s mut [CliUint]),
    /// Engine-owned words allocated for exactly the required size.
    #[cfg(feature = "alloc")]
    Owned(Vec<CliUint>),
}

impl<'s> Storage<'s> {
    /// Allocate zeroed storage of `words` words.
    #[cfg(feature = "alloc")]
    #[must_use]
    pub fn allocate(words: usize) -> Self {
        Storage::Owned(alloc::vec![0; words])
    }

    /// Capacity in words.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.words().len()
    }

    /// True when no words are available.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when the storage is a caller-supplied buffer.
    #[inline]
    #[must_use]
    pub fn is_borrowed(&self) -> bool {
        matches!(self, Storage::Borrowed(_))
    }

    fn words(&self) -> &[CliUint] {
        match self {
            Storage::Borrowed(words) => words,
            #[cfg(feature = "alloc")]
            Storage::Owned(words) => words,
        }
    }

    fn words_mut(&mut self) -> &mut [CliUint] {
        match self {
            Storage::Borrowed(words) => words,
            #[cfg(feature = "alloc")]
            Storage::Owned(words) => words,
        }
    }

    /// Read-only byte view over the whole storage.
    pub(crate) fn bytes(&self) -> &[u8] {
        let words = self.words();
        let len = words.len() * size_of::<CliUint>();
        // SAFETY: see `bytes_mut`; shared borrow of initialized words.
        unsafe { core::slice::from_raw_parts(words.as_ptr().cast::<u8>(), len) }
    }

    /// Byte view over the whole storage.
    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        let words = self.words_mut();
        let len = words.len() * size_of::<CliUint>();
        // SAFETY: `u8` has no alignment or validity requirements, the pointer
        // comes from a live `&mut [CliUint]` spanning exactly `len` bytes, and
        // the returned borrow is tied to `self`.
        unsafe { core::slice::from_raw_parts_mut(words.as_mut_ptr().cast::<u8>(), len) }
    }

    /// Release the storage, handing back a borrowed buffer if there is one.
    #[must_use]
    pub fn into_borrowed(self) -> Option<&'s mut [CliUint]> {
        match self {
            Storage::Borrowed(words) => Some(words),
            #[cfg(feature = "alloc")]
            Storage::Owned(_) => None,
        }
    }
}

impl<'s> From<&'s mut [CliUint]> for Storage<'s> {
    fn from(words: &'s mut [CliUint]) -> Self {
        Storage::Borrowed(words)
    }
}
