use std::collections::HashMap;

use serde::{
    Serialize,
    Serializer,
};

/// One (label, count) entry of an analysis result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub label: String,
    pub count: u32,
}

/// Label -> occurrence count, remembering the order in which labels first appeared.
/// That order breaks ties when findings are ranked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindingCounts {
    entries: Vec<(String, u32)>,
    index: HashMap<String, usize>,
}

impl FindingCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, label: impl Into<String>) {
        self.add_n(label, 1);
    }

    pub fn add_n(&mut self, label: impl Into<String>, n: u32) {
        let label = label.into();
        match self.index.get(&label) {
            Some(&idx) => self.entries[idx].1 += n,
            None => {
                self.index.insert(label.clone(), self.entries.len());
                self.entries.push((label, n));
            }
        }
    }

    /// Adds `other` into `self`; labels new to `self` keep `other`'s order.
    pub fn merge(&mut self, other: FindingCounts) {
        for (label, count) in other.entries {
            self.add_n(label, count);
        }
    }

    pub fn get(&self, label: &str) -> u32 {
        self.index.get(label).map(|&idx| self.entries[idx].1).unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.entries.iter().map(|&(_, c)| c as u64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(label, count)| (label.as_str(), *count))
    }

    /// Findings in first-occurrence order.
    pub fn to_findings(&self) -> Vec<Finding> {
        self.iter().map(|(label, count)| Finding { label: label.to_string(), count }).collect()
    }
}

/// Serializes as a plain JSON object in first-seen order.
impl Serialize for FindingCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<S: Into<String>> FromIterator<S> for FindingCounts {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut counts = FindingCounts::new();
        for label in iter {
            counts.add(label);
        }
        counts
    }
}
