use super::filter::WhereClause;

/// GROUP BY columns with the HAVING conditions that filter the groups
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupBy {
    /// Fields to group by
    pub fields: Vec<String>,
    /// HAVING conditions, ANDed
    pub having: Vec<WhereClause>,
}

impl GroupBy {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.having.is_empty()
    }

    pub fn has_having(&self) -> bool {
        !self.having.is_empty()
    }
}
