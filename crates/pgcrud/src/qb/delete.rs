//! DELETE statement assembler.

use crate::qb::common::{QbCore, impl_qb_common};
use crate::qb::traits::{BuiltQuery, SqlQb};

/// DELETE builder for the first registered entity.
#[derive(Clone, Debug, Default)]
pub struct DeleteQb {
    core: QbCore,
}

impl_qb_common!(DeleteQb, returning);

impl DeleteQb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the statement.
    pub fn build(&self) -> BuiltQuery {
        let mut params = self.core.params();
        let table = self
            .core
            .target()
            .map(|reg| reg.from_source())
            .unwrap_or_default();
        let mut sql = format!("DELETE FROM {}", table);
        sql.push_str(&self.core.render_where(&mut params, &[]));
        sql.push_str(self.core.returning_sql());
        BuiltQuery::new(sql, params.into_values())
    }
}

impl SqlQb for DeleteQb {
    fn build_query(&self) -> Option<BuiltQuery> {
        Some(self.build())
    }
}
