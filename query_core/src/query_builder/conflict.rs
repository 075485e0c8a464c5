/// What to do with a row that hits the conflict target
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictAction {
    DoNothing,
    /// Overwrite these columns from the incoming row (`EXCLUDED`)
    DoUpdate(Vec<String>),
}

/// `ON CONFLICT (target) DO ...` for upserts
///
/// The conflict target is always explicit; the primary key is never inferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnConflict {
    pub target: Vec<String>,
    pub action: ConflictAction,
}

impl OnConflict {
    /// Start a conflict clause on the given target columns
    pub fn columns<I, S>(target: I) -> ConflictTarget
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ConflictTarget {
            target: target.into_iter().map(Into::into).collect(),
        }
    }
}

/// A conflict target waiting for its action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictTarget {
    target: Vec<String>,
}

impl ConflictTarget {
    pub fn do_nothing(self) -> OnConflict {
        OnConflict {
            target: self.target,
            action: ConflictAction::DoNothing,
        }
    }

    pub fn do_update<I, S>(self, columns: I) -> OnConflict
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OnConflict {
            target: self.target,
            action: ConflictAction::DoUpdate(columns.into_iter().map(Into::into).collect()),
        }
    }
}
