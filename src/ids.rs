//! Entity id generation.
//!
//! Ids look like `{prefix}-{unix_millis}-{random}`. The generator remembers
//! every id it issued (and every id it was told about) so none repeats
//! within a session.

use std::collections::HashSet;

use chrono::Utc;
use uuid::Uuid;

/// Length of the random suffix, in hex characters.
const RANDOM_LEN: usize = 8;

/// Issues unique, prefixed entity ids.
#[derive(Debug, Default, Clone)]
pub struct IdGenerator {
    issued: HashSet<String>,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce a fresh id with the given prefix.
    pub fn next(&mut self, prefix: &str) -> String {
        loop {
            let random = Uuid::new_v4().simple().to_string();
            let id = format!(
                "{}-{}-{}",
                prefix,
                Utc::now().timestamp_millis(),
                &random[..RANDOM_LEN]
            );
            if self.issued.insert(id.clone()) {
                return id;
            }
        }
    }

    /// Mark ids created elsewhere (e.g. an imported project) as taken.
    pub fn reserve<I, S>(&mut self, ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.issued.extend(ids.into_iter().map(Into::into));
    }

    /// Number of ids issued or reserved.
    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }
}
