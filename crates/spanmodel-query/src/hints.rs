//! Spanner statement hints.

use crate::statement::SqlBuilder;

/// A table hint rendered after the FROM table, e.g. `` @{FORCE_INDEX=`idx`} ``.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexHint {
    /// Hint prefix including the `=`, e.g. `FORCE_INDEX=`.
    pub kind: &'static str,
    pub key: String,
}

impl IndexHint {
    pub fn build(&self, b: &mut SqlBuilder<'_>) {
        if self.key.is_empty() {
            return;
        }
        b.write_str(" @{");
        b.write_str(self.kind);
        b.write_quoted(&self.key);
        b.write_char('}');
    }
}

/// Force the query to read from the named secondary index.
pub fn force_index(name: impl Into<String>) -> IndexHint {
    IndexHint {
        kind: "FORCE_INDEX=",
        key: name.into(),
    }
}
