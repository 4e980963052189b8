//! The host container boundary.
//!
//! The host delivers zero or more [`ExtensionItem`]s, each carrying
//! attachments that can be loaded by type identifier, together with a
//! [`Completion`] the request must be finished through exactly once. The
//! host keeps the matching [`PendingResponse`] to receive what was
//! delivered.

use std::{fmt, sync::Arc};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;

/// Type identifier for structured property-list attachments.
pub const PROPERTY_LIST_TYPE: &str = "com.apple.property-list";

/// Key under which a loaded attachment carries the page's pre-processed
/// message.
pub const PREPROCESSING_RESULTS_KEY: &str = "NSExtensionJavaScriptPreprocessingResultsKey";

/// Key under which a response attachment carries the envelope handed back
/// to the page.
pub const FINALIZE_ARGUMENT_KEY: &str = "NSExtensionJavaScriptFinalizeArgumentKey";

/// Errors loading an attachment.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The attachment has nothing of the requested type.
    #[error("no item conforming to '{0}'")]
    Unsupported(String),

    /// The attachment failed to produce its item.
    #[error("item failed to load: {0}")]
    Failed(String),
}

/// An attachment that can load its content on demand.
#[async_trait]
pub trait ItemProvider: Send + Sync {
    /// Whether the attachment can produce an item of `type_identifier`.
    fn conforms_to(&self, type_identifier: &str) -> bool;

    /// Load the item of `type_identifier`.
    async fn load_item(&self, type_identifier: &str) -> Result<Value, LoadError>;
}

/// An attachment holding an already-materialized item.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyListItem {
    type_identifier: String,
    item: Value,
}

impl PropertyListItem {
    /// A property-list attachment.
    pub fn new(item: Value) -> Self {
        Self::with_type(PROPERTY_LIST_TYPE, item)
    }

    /// An attachment of an arbitrary type.
    pub fn with_type(type_identifier: impl Into<String>, item: Value) -> Self {
        Self {
            type_identifier: type_identifier.into(),
            item,
        }
    }

    /// Wrap a page message the way the host presents it: under
    /// [`PREPROCESSING_RESULTS_KEY`].
    pub fn preprocessed(message: Value) -> Self {
        let mut item = serde_json::Map::new();
        item.insert(PREPROCESSING_RESULTS_KEY.into(), message);
        Self::new(Value::Object(item))
    }

    /// The attachment's type identifier.
    pub fn type_identifier(&self) -> &str {
        &self.type_identifier
    }

    /// The attachment's content.
    pub fn item(&self) -> &Value {
        &self.item
    }
}

#[async_trait]
impl ItemProvider for PropertyListItem {
    fn conforms_to(&self, type_identifier: &str) -> bool {
        self.type_identifier == type_identifier
    }

    async fn load_item(&self, type_identifier: &str) -> Result<Value, LoadError> {
        if !self.conforms_to(type_identifier) {
            return Err(LoadError::Unsupported(type_identifier.into()));
        }
        Ok(self.item.clone())
    }
}

/// One input item delivered by the host.
#[derive(Clone, Default)]
pub struct ExtensionItem {
    /// The item's attachments, in delivery order.
    pub attachments: Vec<Arc<dyn ItemProvider>>,
}

impl ExtensionItem {
    /// An item with no attachments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attachment.
    pub fn with_attachment(mut self, attachment: impl ItemProvider + 'static) -> Self {
        self.attachments.push(Arc::new(attachment));
        self
    }
}

impl fmt::Debug for ExtensionItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionItem")
            .field("attachments", &self.attachments.len())
            .finish()
    }
}

/// One item handed back to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseItem {
    /// The item's attachments.
    pub attachments: Vec<PropertyListItem>,
}

/// The host's request-completion handle.
///
/// Consumed by [`Completion::complete`], so a request cannot be completed
/// twice.
#[derive(Debug)]
pub struct Completion {
    sender: oneshot::Sender<Vec<ResponseItem>>,
}

impl Completion {
    /// Complete the request with `items`.
    ///
    /// Returns `false` if the host has already torn the request down, in
    /// which case the items are discarded.
    pub fn complete(self, items: Vec<ResponseItem>) -> bool {
        self.sender.send(items).is_ok()
    }
}

/// The request was never completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("request was abandoned before completion")]
pub struct Abandoned;

/// The host side of a [`Completion`].
#[derive(Debug)]
pub struct PendingResponse {
    receiver: oneshot::Receiver<Vec<ResponseItem>>,
}

impl PendingResponse {
    /// Wait for the request to complete.
    ///
    /// # Errors
    ///
    /// Returns [`Abandoned`] if the [`Completion`] was dropped unused, e.g.
    /// because the request was cancelled.
    pub async fn wait(self) -> Result<Vec<ResponseItem>, Abandoned> {
        self.receiver.await.map_err(|_| Abandoned)
    }
}

/// Everything the host hands over for one request.
#[derive(Debug)]
pub struct HostContext {
    input_items: Vec<ExtensionItem>,
    completion: Completion,
}

impl HostContext {
    /// Create a context for `input_items`, along with the host's end of the
    /// completion.
    pub fn new(input_items: Vec<ExtensionItem>) -> (Self, PendingResponse) {
        let (sender, receiver) = oneshot::channel();
        (
            Self {
                input_items,
                completion: Completion { sender },
            },
            PendingResponse { receiver },
        )
    }

    /// The delivered input items.
    pub fn input_items(&self) -> &[ExtensionItem] {
        &self.input_items
    }

    /// Split into the input items and the completion handle.
    pub fn into_parts(self) -> (Vec<ExtensionItem>, Completion) {
        (self.input_items, self.completion)
    }
}
