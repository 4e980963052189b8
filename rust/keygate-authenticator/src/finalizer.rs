//! Hands the terminal result back to the host.

use serde_json::{Map, Value};

use crate::{
    Envelope,
    host::{Completion, FINALIZE_ARGUMENT_KEY, PropertyListItem, ResponseItem},
};

/// Build the response item carrying `envelope`: one property-list
/// attachment mapping [`FINALIZE_ARGUMENT_KEY`] to the envelope.
pub fn response_item(envelope: &Envelope) -> ResponseItem {
    let mut results = Map::new();
    results.insert(FINALIZE_ARGUMENT_KEY.into(), envelope.to_property_list());

    ResponseItem {
        attachments: vec![PropertyListItem::new(Value::Object(results))],
    }
}

/// Complete the request.
///
/// With an envelope the host receives exactly one [`response_item`];
/// without one it receives no items. `completion` is consumed either way.
pub fn finish(completion: Completion, envelope: Option<Envelope>) {
    let items = match &envelope {
        Some(envelope) => vec![response_item(envelope)],
        None => Vec::new(),
    };

    if !completion.complete(items) {
        tracing::debug!("host tore down the request before it completed; response dropped");
    }
}
