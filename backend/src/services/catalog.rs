use std::collections::HashSet;

/// Every interest ever submitted, deduplicated, in first-seen order.
#[derive(Debug, Default, Clone)]
pub struct InterestCatalog {
    entries: Vec<String>,
    seen: HashSet<String>,
}

impl InterestCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the interests not already present.
    pub fn extend<'a, I>(&mut self, interests: I)
    where
        I: IntoIterator<Item = &'a String>,
    {
        for interest in interests {
            if self.seen.insert(interest.clone()) {
                self.entries.push(interest.clone());
            }
        }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}
