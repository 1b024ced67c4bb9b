use crate::EntryLo;
use std::collections::BTreeMap;
use kernel_memory_addresses::VirtualPage;

/// Translations of one address space, ordered by virtual page.
#[derive(Debug, Default)]
pub struct PageTable {
    entries: BTreeMap<VirtualPage, EntryLo>,
}

impl PageTable {
    #[must_use]
    pub fn get(&self, page: VirtualPage) -> Option<EntryLo> {
        self.entries.get(&page).copied()
    }

    pub fn get_mut(&mut self, page: VirtualPage) -> Option<&mut EntryLo> {
        self.entries.get_mut(&page)
    }

    #[must_use]
    pub fn contains(&self, page: VirtualPage) -> bool {
        self.entries.contains_key(&page)
    }

    /// Installs a translation for an unmapped page.
    ///
    /// # Panics
    /// Panics if `page` is already mapped; the old frame would leak.
    pub fn insert(&mut self, page: VirtualPage, entry: EntryLo) {
        let old = self.entries.insert(page, entry);
        assert!(old.is_none(), "page {page} mapped twice");
    }

    pub fn remove(&mut self, page: VirtualPage) -> Option<EntryLo> {
        self.entries.remove(&page)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VirtualPage, EntryLo)> + '_ {
        self.entries.iter().map(|(&page, &entry)| (page, entry))
    }

    /// Removes and returns every translation.
    pub fn drain(&mut self) -> impl Iterator<Item = (VirtualPage, EntryLo)> + use<> {
        core::mem::take(&mut self.entries).into_iter()
    }
}
