//! Dispatch seam between the navigation engine and the resolver

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{ActionBody, InteractionRecord};

/// Performs one interaction against the frame resolver.
///
/// Every call produces a brand new record (fresh id and timestamp) or an
/// error; implementations never touch navigation state.
#[async_trait]
pub trait Dispatch: Send + Sync {
    /// GET a frame document by absolute URL.
    async fn get_frame(&self, url: &str) -> Result<InteractionRecord>;

    /// Submit a button press that is answered with another frame.
    async fn post_frame_action(&self, body: &ActionBody) -> Result<InteractionRecord>;

    /// Submit a button press that is answered with a redirect.
    async fn post_frame_redirect(&self, body: &ActionBody) -> Result<InteractionRecord>;
}

#[async_trait]
impl<T: Dispatch + ?Sized> Dispatch for Arc<T> {
    async fn get_frame(&self, url: &str) -> Result<InteractionRecord> {
        (**self).get_frame(url).await
    }

    async fn post_frame_action(&self, body: &ActionBody) -> Result<InteractionRecord> {
        (**self).post_frame_action(body).await
    }

    async fn post_frame_redirect(&self, body: &ActionBody) -> Result<InteractionRecord> {
        (**self).post_frame_redirect(body).await
    }
}
