//! Stateless repositories. Each method takes a `&Connection` (or an open
//! transaction) and translates between domain types and SQL.

pub mod history;
pub mod report;
pub mod task;

use uuid::Uuid;

/// Generate a prefixed UUID v7 id.
pub(crate) fn generate_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7())
}
