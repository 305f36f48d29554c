use crate::document::Document;
use crate::error::ModelResult;
use async_trait::async_trait;

/// Typed lifecycle stages around a collection's save and destroy operations.
///
/// The collection wrapper invokes registered hooks in registration order at
/// each stage; there is no global hook registry. `before_save` runs before
/// the persistence write and can abort it by returning an error. `after_save`
/// and `after_destroy` run once the document write has been accepted; an error
/// from them surfaces to the caller but does not roll the document back.
///
/// `previous` is the pre-update snapshot of the document, when one existed.
#[async_trait]
pub trait LifecycleHooks: Send + Sync {
    async fn before_save(&self, doc: &Document, previous: Option<&Document>) -> ModelResult<()> {
        let _ = (doc, previous);
        Ok(())
    }

    async fn after_save(&self, doc: &Document, previous: Option<&Document>) -> ModelResult<()> {
        let _ = (doc, previous);
        Ok(())
    }

    async fn after_destroy(&self, doc: &Document) -> ModelResult<()> {
        let _ = doc;
        Ok(())
    }
}
