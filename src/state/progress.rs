/// Progress of one category of an entity
///
/// `parsed` is always a copy of the durable record count taken by the
/// checkpoint store; nothing else is allowed to bump it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryProgress {
    /// Remote category identifier
    pub category_id: String,

    /// Number of items the catalog reports for this category
    pub amount: u64,

    /// Number of records durably stored
    pub parsed: u64,
}

impl CategoryProgress {
    /// Creates progress for a freshly counted category
    pub fn new(category_id: impl Into<String>, amount: u64) -> Self {
        Self {
            category_id: category_id.into(),
            amount,
            parsed: 0,
        }
    }

    /// Returns true if every expected item is stored
    pub fn is_complete(&self) -> bool {
        self.parsed >= self.amount
    }

    /// Returns how many records are still missing
    pub fn remaining(&self) -> u64 {
        self.amount.saturating_sub(self.parsed)
    }
}

/// Progress of all categories of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityProgress {
    pub entity_code: String,
    pub categories: Vec<CategoryProgress>,
}

impl EntityProgress {
    /// Returns true if every category is complete
    ///
    /// An entity without categories is never complete: it either has not
    /// been counted yet or holds nothing worth harvesting.
    pub fn all_complete(&self) -> bool {
        !self.categories.is_empty() && self.categories.iter().all(|c| c.is_complete())
    }

    /// Returns the categories that still need records
    pub fn incomplete(&self) -> impl Iterator<Item = &CategoryProgress> {
        self.categories.iter().filter(|c| !c.is_complete())
    }

    /// Total number of stored records across categories
    pub fn total_parsed(&self) -> u64 {
        self.categories.iter().map(|c| c.parsed).sum()
    }

    /// Total number of expected records across categories
    pub fn total_amount(&self) -> u64 {
        self.categories.iter().map(|c| c.amount).sum()
    }
}
