pub mod domains;

use regex::Regex;

pub use domains::{Domain, UserAgentBreakdown, UserAgentClassifier};

/// A labeled pattern plus the number of times it has won a classification.
///
/// `exclude` lets overlapping candidates (e.g. Chrome vs. Edge, whose user
/// agents both mention `Chrome/`) stay correct whatever order the list is in.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub label: String,
    pub matcher: Regex,
    pub exclude: Option<Regex>,
    pub match_count: u64,
}

impl Candidate {
    pub fn new(label: &str, pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            label: label.to_string(),
            matcher: Regex::new(pattern)?,
            exclude: None,
            match_count: 0,
        })
    }

    pub fn excluding(label: &str, pattern: &str, exclude: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            exclude: Some(Regex::new(exclude)?),
            ..Self::new(label, pattern)?
        })
    }

    pub fn matches(&self, text: &str) -> bool {
        self.matcher.is_match(text)
            && !self.exclude.as_ref().is_some_and(|exclude| exclude.is_match(text))
    }
}

/// Candidates kept in descending `match_count` order, with equal counts
/// keeping their relative order.
#[derive(Debug, Clone)]
pub struct CandidateList {
    candidates: Vec<Candidate>,
    other: String,
}

impl CandidateList {
    pub fn new(candidates: Vec<Candidate>, other: &str) -> Self {
        Self {
            candidates,
            other: other.to_string(),
        }
    }

    /// Return the label of the first candidate matching `text`, promoting it
    /// towards the front. Falls back to the `other` label without touching the
    /// order when nothing matches.
    pub fn classify(&mut self, text: &str) -> String {
        let Some(index) = self.candidates.iter().position(|c| c.matches(text)) else {
            return self.other.clone();
        };

        self.candidates[index].match_count += 1;
        let index = bubble_up(&mut self.candidates, index);
        self.candidates[index].label.clone()
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// `(label, match_count)` in current order.
    pub fn snapshot(&self) -> Vec<(String, u64)> {
        self.candidates
            .iter()
            .map(|c| (c.label.clone(), c.match_count))
            .collect()
    }
}

/// Move the element at `index` towards the front while its count is strictly
/// greater than its predecessor's. Returns the final index.
pub fn bubble_up(candidates: &mut [Candidate], mut index: usize) -> usize {
    while index > 0 && candidates[index].match_count > candidates[index - 1].match_count {
        candidates.swap(index, index - 1);
        index -= 1;
    }
    index
}
