// Role-scoped counters and hiring analytics. `stats` holds the pure arithmetic,
// `queries` the SQL that feeds it.

pub mod handlers;
pub mod queries;
pub mod stats;
