//! Clip pool: classification, ordering and at-most-once claims.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use beatcut_models::{parse_clip_id, ClipCategory, ClipRecord};

/// A listed source file with its probed duration.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSource {
    pub file_name: String,
    pub path: PathBuf,
    pub duration: f64,
}

impl ClipSource {
    pub fn new(file_name: impl Into<String>, path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            file_name: file_name.into(),
            path: path.into(),
            duration,
        }
    }
}

/// Why a listed file did not make it into the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum ExclusionReason {
    /// Name does not carry a numeric clip id
    UnmatchedName,
    /// Another file already claimed this id
    DuplicateId { id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedClip {
    pub file_name: String,
    #[serde(flatten)]
    pub reason: ExclusionReason,
}

/// Registry of source clips in claim order.
///
/// Claims are tracked here only; a claimed id never returns to the pool.
#[derive(Debug, Clone, Default)]
pub struct ClipPool {
    clips: Vec<ClipRecord>,
    claimed: HashSet<u64>,
    excluded: Vec<ExcludedClip>,
    ambiguous: Vec<u64>,
}

/// Key used to match user-declared names against listed files.
fn name_keys(name: &str) -> (String, String) {
    let path = Path::new(name);
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    (file, stem)
}

fn build_lookup(names: &[String]) -> HashSet<String> {
    names
        .iter()
        .flat_map(|n| {
            let (file, stem) = name_keys(n.trim());
            [file, stem]
        })
        .filter(|k| !k.is_empty())
        .collect()
}

fn listed_in(lookup: &HashSet<String>, file_name: &str) -> bool {
    let (file, stem) = name_keys(file_name);
    lookup.contains(&file) || lookup.contains(&stem)
}

impl ClipPool {
    /// Build the pool from listed sources and the declared category lists.
    ///
    /// Names match on basename (with or without extension), ignoring case.
    /// A clip listed as both long and timelapse is ambiguous: it is kept as
    /// `Regular` and reported through [`ClipPool::ambiguous`].
    pub fn classify(sources: Vec<ClipSource>, long: &[String], timelapse: &[String]) -> Self {
        let long_lookup = build_lookup(long);
        let timelapse_lookup = build_lookup(timelapse);

        let mut sources = sources;
        sources.sort_by(|a, b| a.file_name.cmp(&b.file_name));

        let mut pool = ClipPool::default();
        let mut seen: HashMap<u64, String> = HashMap::new();

        for source in sources {
            let Some(id) = parse_clip_id(&source.file_name) else {
                debug!(file = %source.file_name, "Excluding clip without numeric id");
                pool.excluded.push(ExcludedClip {
                    file_name: source.file_name,
                    reason: ExclusionReason::UnmatchedName,
                });
                continue;
            };

            if let Some(first) = seen.get(&id) {
                warn!(
                    file = %source.file_name,
                    kept = %first,
                    id,
                    "Excluding clip with duplicate id"
                );
                pool.excluded.push(ExcludedClip {
                    file_name: source.file_name,
                    reason: ExclusionReason::DuplicateId { id },
                });
                continue;
            }
            seen.insert(id, source.file_name.clone());

            let is_long = listed_in(&long_lookup, &source.file_name);
            let is_timelapse = listed_in(&timelapse_lookup, &source.file_name);
            let category = match (is_long, is_timelapse) {
                (true, true) => {
                    warn!(
                        file = %source.file_name,
                        "Clip listed as both long and timelapse, treating as regular"
                    );
                    pool.ambiguous.push(id);
                    ClipCategory::Regular
                }
                (true, false) => ClipCategory::Long,
                (false, true) => ClipCategory::Timelapse,
                (false, false) => ClipCategory::Regular,
            };

            pool.clips.push(ClipRecord::new(
                id,
                source.file_name,
                source.path,
                category,
                source.duration,
            ));
        }

        pool.clips.sort_by_key(|c| c.id);
        pool
    }

    /// Claim the first unused clip in sort order.
    pub fn claim_next(&mut self) -> Option<ClipRecord> {
        self.claim_next_matching(|_| true)
    }

    /// Claim the first unused clip accepted by `predicate`.
    pub fn claim_next_matching<F>(&mut self, predicate: F) -> Option<ClipRecord>
    where
        F: Fn(&ClipRecord) -> bool,
    {
        let clip = self
            .clips
            .iter()
            .find(|c| !self.claimed.contains(&c.id) && predicate(c))?
            .clone();
        self.claimed.insert(clip.id);
        Some(clip)
    }

    pub fn is_claimed(&self, id: u64) -> bool {
        self.claimed.contains(&id)
    }

    /// Clips in claim order.
    pub fn clips(&self) -> &[ClipRecord] {
        &self.clips
    }

    pub fn get(&self, id: u64) -> Option<&ClipRecord> {
        self.clips.iter().find(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Unused clips left.
    pub fn remaining(&self) -> usize {
        self.clips.len() - self.claimed.len()
    }

    pub fn used_count(&self) -> usize {
        self.claimed.len()
    }

    /// Files left out of the pool.
    pub fn excluded(&self) -> &[ExcludedClip] {
        &self.excluded
    }

    /// Ids that were declared both long and timelapse.
    pub fn ambiguous(&self) -> &[u64] {
        &self.ambiguous
    }

    pub fn count_by_category(&self, category: ClipCategory) -> usize {
        self.clips.iter().filter(|c| c.category == category).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sources(names: &[&str]) -> Vec<ClipSource> {
        names
            .iter()
            .map(|n| ClipSource::new(*n, format!("/clips/{}", n), 4.0))
            .collect()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sorted_by_numeric_id() {
        let pool = ClipPool::classify(
            sources(&["IMG_10.mov", "IMG_2.mov", "IMG_1.MOV"]),
            &[],
            &[],
        );
        let ids: Vec<u64> = pool.clips().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 10]);
    }

    #[test]
    fn test_unmatched_names_are_excluded() {
        let pool = ClipPool::classify(sources(&["IMG_3.mov", "notes.mp4", "DSC_1.mov"]), &[], &[]);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.excluded().len(), 2);
        assert!(pool
            .excluded()
            .iter()
            .all(|e| e.reason == ExclusionReason::UnmatchedName));
    }

    #[test]
    fn test_duplicate_ids_keep_first_name() {
        let pool = ClipPool::classify(sources(&["IMG_5.mp4", "IMG_005.mov"]), &[], &[]);
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.clips()[0].file_name, "IMG_005.mov");
        assert_eq!(
            pool.excluded()[0].reason,
            ExclusionReason::DuplicateId { id: 5 }
        );
    }

    #[test]
    fn test_categories_from_lists() {
        let pool = ClipPool::classify(
            sources(&["IMG_1.mov", "IMG_2.mov", "IMG_3.mov"]),
            &names(&["img_1.MOV"]),
            &names(&["IMG_3"]),
        );
        assert_eq!(pool.get(1).unwrap().category, ClipCategory::Long);
        assert_eq!(pool.get(2).unwrap().category, ClipCategory::Regular);
        assert_eq!(pool.get(3).unwrap().category, ClipCategory::Timelapse);
        assert_eq!(pool.count_by_category(ClipCategory::Regular), 1);
    }

    #[test]
    fn test_ambiguous_clip_is_regular() {
        let pool = ClipPool::classify(
            sources(&["IMG_1.mov"]),
            &names(&["IMG_1.mov"]),
            &names(&["IMG_1.mov"]),
        );
        assert_eq!(pool.get(1).unwrap().category, ClipCategory::Regular);
        assert_eq!(pool.ambiguous(), &[1]);
    }

    #[test]
    fn test_claims_are_at_most_once() {
        let mut pool = ClipPool::classify(sources(&["IMG_1.mov", "IMG_2.mov"]), &[], &[]);
        assert_eq!(pool.claim_next().unwrap().id, 1);
        assert_eq!(pool.claim_next().unwrap().id, 2);
        assert!(pool.claim_next().is_none());
        assert_eq!(pool.used_count(), 2);
        assert_eq!(pool.remaining(), 0);
    }

    #[test]
    fn test_claim_with_predicate() {
        let mut pool = ClipPool::classify(
            sources(&["IMG_1.mov", "IMG_2.mov", "IMG_3.mov"]),
            &[],
            &names(&["IMG_2.mov"]),
        );
        let clip = pool
            .claim_next_matching(|c| c.category == ClipCategory::Timelapse)
            .unwrap();
        assert_eq!(clip.id, 2);
        assert!(pool.is_claimed(2));
        assert!(!pool.is_claimed(1));
        assert!(pool
            .claim_next_matching(|c| c.category == ClipCategory::Timelapse)
            .is_none());
        assert_eq!(pool.claim_next().unwrap().id, 1);
    }

    #[test]
    fn test_claim_state_stays_with_the_pool() {
        let mut pool = ClipPool::classify(sources(&["IMG_1.mov", "IMG_2.mov"]), &[], &[]);
        let mut copy = pool.claim_next().unwrap();
        copy.category = ClipCategory::Long;

        assert_eq!(pool.get(1).unwrap().category, ClipCategory::Regular);
        assert!(pool.is_claimed(1));
        assert_eq!(pool.claim_next().unwrap().id, 2);
        assert!(pool.claim_next_matching(|c| c.id == 1).is_none());
        assert_eq!((pool.used_count(), pool.remaining()), (2, 0));
    }
}
