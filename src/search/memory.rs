//! In-process index with token matching and bounded edit distance.

use std::{collections::BTreeMap, sync::RwLock};

use async_trait::async_trait;

use super::{
    document::{SearchDocument, SearchQuery},
    index::{DocumentIndex, SearchError},
};
use crate::util::lock::{rw_read, rw_write};

const OWNER: &str = "search::memory";
const TITLE_BOOST: u32 = 2;

#[derive(Debug)]
pub struct MemoryIndex {
    name: String,
    documents: RwLock<BTreeMap<i64, SearchDocument>>,
}

impl MemoryIndex {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            documents: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn get(&self, id: i64) -> Option<SearchDocument> {
        rw_read(&self.documents, OWNER).get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        rw_read(&self.documents, OWNER).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DocumentIndex for MemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search_ids(&self, query: &SearchQuery) -> Result<Vec<i64>, SearchError> {
        let terms = tokenize(&query.text);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let documents = rw_read(&self.documents, OWNER);
        let mut scored: Vec<(u32, i64)> = documents
            .values()
            .filter(|doc| doc.user_id == query.user_id)
            .filter(|doc| query.list_id.is_none() || doc.list_id == query.list_id)
            .filter(|doc| query.done.is_none() || doc.done == query.done)
            .filter_map(|doc| {
                let score = score(&terms, &doc.title) * TITLE_BOOST + score(&terms, &doc.description);
                (score > 0).then_some((score, doc.id))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(scored.into_iter().map(|(_, id)| id).collect())
    }

    async fn upsert(&self, document: &SearchDocument) -> Result<(), SearchError> {
        rw_write(&self.documents, OWNER).insert(document.id, document.clone());
        Ok(())
    }

    async fn delete(&self, id: i64) -> Result<(), SearchError> {
        rw_write(&self.documents, OWNER).remove(&id);
        Ok(())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Number of query terms that match some token of `field`.
fn score(terms: &[String], field: &str) -> u32 {
    let tokens = tokenize(field);
    let matched = terms
        .iter()
        .filter(|term| tokens.iter().any(|token| fuzzy_eq(term, token)))
        .count();
    u32::try_from(matched).unwrap_or(u32::MAX)
}

/// Edit budget scales with term length: 0 up to two chars, 1 up to five, 2 beyond.
fn fuzzy_eq(term: &str, token: &str) -> bool {
    let budget = match term.chars().count() {
        0..=2 => 0,
        3..=5 => 1,
        _ => 2,
    };
    levenshtein(term, token) <= budget
}

fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
