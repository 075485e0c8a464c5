#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// One ORDER BY key; earlier terms sort first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderTerm {
    pub column: String,
    pub direction: SortOrder,
}

impl OrderTerm {
    pub fn new(column: impl Into<String>, direction: SortOrder) -> Self {
        Self {
            column: column.into(),
            direction,
        }
    }
}
