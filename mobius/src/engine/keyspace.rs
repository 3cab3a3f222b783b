//! In-memory keyspace and the operations that mutate it.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use super::ScoredMember;

/// A mutation, as recorded in the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum JournalOp {
    SAdd { key: String, member: Vec<u8> },
    SRem { key: String, member: Vec<u8> },
    HSet { key: String, field: Vec<u8>, value: Vec<u8> },
    HDel { key: String, field: Vec<u8> },
    HClear { key: String },
    ZAdd { key: String, score: u64, member: Vec<u8> },
    ZRem { key: String, member: Vec<u8> },
    ZRemRangeByScore { key: String, min: u64, max: u64 },
    ZClear { key: String },
}

#[derive(Debug, Default)]
struct SortedSet {
    by_member: HashMap<Vec<u8>, u64>,
    by_score: BTreeSet<(u64, Vec<u8>)>,
}

impl SortedSet {
    fn insert(&mut self, score: u64, member: Vec<u8>) -> bool {
        match self.by_member.insert(member.clone(), score) {
            Some(old) => {
                self.by_score.remove(&(old, member.clone()));
                self.by_score.insert((score, member));
                false
            }
            None => {
                self.by_score.insert((score, member));
                true
            }
        }
    }

    fn remove(&mut self, member: &[u8]) -> bool {
        match self.by_member.remove(member) {
            Some(score) => {
                self.by_score.remove(&(score, member.to_vec()));
                true
            }
            None => false,
        }
    }

    /// Entries with `min <= score <= max`, ascending.
    fn range(&self, min: u64, max: u64) -> impl Iterator<Item = &(u64, Vec<u8>)> {
        self.by_score
            .range((min, Vec::new())..)
            .take_while(move |(score, _)| *score <= max)
    }

    fn len(&self) -> usize {
        self.by_member.len()
    }

    fn is_empty(&self) -> bool {
        self.by_member.is_empty()
    }
}

/// Every key the engine holds.
#[derive(Debug, Default)]
pub(crate) struct Keyspace {
    sets: BTreeMap<String, BTreeSet<Vec<u8>>>,
    hashes: BTreeMap<String, BTreeMap<Vec<u8>, Vec<u8>>>,
    zsets: BTreeMap<String, SortedSet>,
}

impl Keyspace {
    /// Applies a mutation and returns how many entries it changed.
    pub(crate) fn apply(&mut self, op: &JournalOp) -> u64 {
        match op {
            JournalOp::SAdd { key, member } => {
                u64::from(self.sets.entry(key.clone()).or_default().insert(member.clone()))
            }
            JournalOp::SRem { key, member } => {
                let Some(set) = self.sets.get_mut(key) else {
                    return 0;
                };
                let removed = set.remove(member);
                if set.is_empty() {
                    self.sets.remove(key);
                }
                u64::from(removed)
            }
            JournalOp::HSet { key, field, value } => {
                self.hashes
                    .entry(key.clone())
                    .or_default()
                    .insert(field.clone(), value.clone());
                1
            }
            JournalOp::HDel { key, field } => {
                let Some(hash) = self.hashes.get_mut(key) else {
                    return 0;
                };
                let removed = hash.remove(field).is_some();
                if hash.is_empty() {
                    self.hashes.remove(key);
                }
                u64::from(removed)
            }
            JournalOp::HClear { key } => self.hashes.remove(key).map_or(0, |h| h.len() as u64),
            JournalOp::ZAdd { key, score, member } => u64::from(
                self.zsets
                    .entry(key.clone())
                    .or_default()
                    .insert(*score, member.clone()),
            ),
            JournalOp::ZRem { key, member } => {
                let Some(zset) = self.zsets.get_mut(key) else {
                    return 0;
                };
                let removed = zset.remove(member);
                if zset.is_empty() {
                    self.zsets.remove(key);
                }
                u64::from(removed)
            }
            JournalOp::ZRemRangeByScore { key, min, max } => {
                let Some(zset) = self.zsets.get_mut(key) else {
                    return 0;
                };
                let doomed: Vec<Vec<u8>> =
                    zset.range(*min, *max).map(|(_, m)| m.clone()).collect();
                for member in &doomed {
                    zset.remove(member);
                }
                if zset.is_empty() {
                    self.zsets.remove(key);
                }
                doomed.len() as u64
            }
            JournalOp::ZClear { key } => self.zsets.remove(key).map_or(0, |z| z.len() as u64),
        }
    }

    pub(crate) fn set_members(&self, key: &str) -> Vec<Vec<u8>> {
        self.sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn set_is_member(&self, key: &str, member: &[u8]) -> bool {
        self.sets.get(key).is_some_and(|set| set.contains(member))
    }

    pub(crate) fn hash_get(&self, key: &str, field: &[u8]) -> Option<Vec<u8>> {
        self.hashes.get(key).and_then(|hash| hash.get(field)).cloned()
    }

    pub(crate) fn zset_range_by_score(
        &self,
        key: &str,
        min: u64,
        max: u64,
        limit: Option<usize>,
        reverse: bool,
    ) -> Vec<ScoredMember> {
        let Some(zset) = self.zsets.get(key) else {
            return Vec::new();
        };
        let limit = limit.unwrap_or(usize::MAX);
        let to_member = |(score, member): &(u64, Vec<u8>)| ScoredMember {
            score: *score,
            member: member.clone(),
        };

        if reverse {
            let all: Vec<&(u64, Vec<u8>)> = zset.range(min, max).collect();
            all.into_iter().rev().take(limit).map(to_member).collect()
        } else {
            zset.range(min, max).take(limit).map(to_member).collect()
        }
    }

    pub(crate) fn zset_range_by_rank(
        &self,
        key: &str,
        count: usize,
        reverse: bool,
    ) -> Vec<ScoredMember> {
        let Some(zset) = self.zsets.get(key) else {
            return Vec::new();
        };
        let to_member = |(score, member): &(u64, Vec<u8>)| ScoredMember {
            score: *score,
            member: member.clone(),
        };

        if reverse {
            zset.by_score.iter().rev().take(count).map(to_member).collect()
        } else {
            zset.by_score.iter().take(count).map(to_member).collect()
        }
    }

    pub(crate) fn zset_count(&self, key: &str, min: u64, max: u64) -> u64 {
        self.zsets
            .get(key)
            .map_or(0, |zset| zset.range(min, max).count() as u64)
    }

    pub(crate) fn to_image(&self) -> KeyspaceImage {
        KeyspaceImage {
            sets: self
                .sets
                .iter()
                .map(|(k, set)| (k.clone(), set.iter().cloned().collect()))
                .collect(),
            hashes: self
                .hashes
                .iter()
                .map(|(k, hash)| (k.clone(), hash.iter().map(|(f, v)| (f.clone(), v.clone())).collect()))
                .collect(),
            zsets: self
                .zsets
                .iter()
                .map(|(k, zset)| (k.clone(), zset.by_score.iter().cloned().collect()))
                .collect(),
        }
    }

    pub(crate) fn from_image(image: KeyspaceImage) -> Self {
        let mut keyspace = Self::default();
        for (key, members) in image.sets {
            if !members.is_empty() {
                keyspace.sets.insert(key, members.into_iter().collect());
            }
        }
        for (key, fields) in image.hashes {
            if !fields.is_empty() {
                keyspace.hashes.insert(key, fields.into_iter().collect());
            }
        }
        for (key, entries) in image.zsets {
            let mut zset = SortedSet::default();
            for (score, member) in entries {
                zset.insert(score, member);
            }
            if !zset.is_empty() {
                keyspace.zsets.insert(key, zset);
            }
        }
        keyspace
    }
}

/// Serializable form of a [`Keyspace`].
#[derive(Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct KeyspaceImage {
    sets: Vec<(String, Vec<Vec<u8>>)>,
    hashes: Vec<(String, Vec<(Vec<u8>, Vec<u8>)>)>,
    zsets: Vec<(String, Vec<(u64, Vec<u8>)>)>,
}
