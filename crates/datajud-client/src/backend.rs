//! The seam between the pagination loop and the wire.

use async_trait::async_trait;
use datajud_core::RawRecord;
use serde_json::Value;

use crate::SearchError;

/// Executes one `_search` request and returns the page's hits in order.
///
/// An empty vector means the server has no more hits for the query.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, body: &Value) -> Result<Vec<RawRecord>, SearchError>;
}

#[async_trait]
impl<B: SearchBackend + ?Sized> SearchBackend for &B {
    async fn search(&self, body: &Value) -> Result<Vec<RawRecord>, SearchError> {
        (**self).search(body).await
    }
}
