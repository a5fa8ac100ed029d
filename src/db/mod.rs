pub mod competitors;
pub mod store;
pub mod summaries;
pub mod supabase;

pub use store::{Filter, Row, StoreError, TabularStore};
pub use supabase::SupabaseStore;
