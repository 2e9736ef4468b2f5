//! Dispatch registrations: which issue each dispatch was sent for.
//!
//! Written at dispatch time, read at outcome-parsing time to recover the
//! issue of a transcript that never names it. Entries are never rewritten.

use std::collections::BTreeMap;

use super::{Result, Snapshot, Storage, commit_store, read_store};

impl Storage {
    /// Loads the dispatch id → issue id map.
    pub fn load_dispatch_map(&self) -> Result<BTreeMap<String, String>> {
        Ok(self.load_dispatch_map_for_update()?.data)
    }

    pub fn load_dispatch_map_for_update(&self) -> Result<Snapshot<BTreeMap<String, String>>> {
        read_store(&self.paths.dispatch_map)
    }

    pub fn commit_dispatch_map(
        &self,
        snapshot: &mut Snapshot<BTreeMap<String, String>>,
    ) -> Result<()> {
        snapshot.revision =
            commit_store(&self.paths.dispatch_map, &snapshot.revision, &snapshot.data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::tests::test_storage;

    #[test]
    fn round_trips_dispatch_map() {
        let (_dir, storage) = test_storage();

        let mut snapshot = storage.load_dispatch_map_for_update().unwrap();
        assert!(snapshot.data.is_empty());
        snapshot
            .data
            .insert("task-0001".into(), "lint-0001".into());
        storage.commit_dispatch_map(&mut snapshot).unwrap();

        let map = storage.load_dispatch_map().unwrap();
        assert_eq!(map.get("task-0001").map(String::as_str), Some("lint-0001"));
    }
}
