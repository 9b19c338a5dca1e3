pub mod flatten;
pub mod format;
pub mod query;
pub mod record;
pub mod schema;
pub mod window;

pub use flatten::{CaseRow, Flattener, dedupe_by_key, dedupe_cases};
pub use query::{PageCursor, QuerySpec, SearchRequest};
pub use record::{RawRecord, SearchResponse};
pub use schema::cases;
pub use window::{DateEncoding, SearchWindow, WindowError};
