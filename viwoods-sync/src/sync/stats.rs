use std::time::Duration;

/// Per-run counters, threaded by `&mut` through the traversal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub folders: u64,
    pub downloaded: u64,
    pub skipped: u64,
    pub failed: u64,
}

impl SyncStats {
    pub fn files_seen(&self) -> u64 {
        self.downloaded + self.skipped + self.failed
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncScope {
    /// Every allowed top-level container. `filtered_roots` lists the ones left out.
    Full {
        include_all: bool,
        filtered_roots: Vec<String>,
    },
    /// A single resolved folder path.
    Folder { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub scope: SyncScope,
    pub stats: SyncStats,
    pub elapsed: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_seen_sums_file_outcomes() {
        let stats = SyncStats {
            folders: 3,
            downloaded: 2,
            skipped: 5,
            failed: 1,
        };
        assert_eq!(stats.files_seen(), 8);
        assert!(!stats.is_clean());
        assert!(SyncStats::default().is_clean());
    }
}
