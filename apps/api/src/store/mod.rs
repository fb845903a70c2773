pub mod matches;
pub mod profiles;

pub use matches::{PgMatchStore, RowFailure, UpsertCounts, UpsertStore};
pub use profiles::{resolve_candidate, PgProfileStore, ProfileStore};
