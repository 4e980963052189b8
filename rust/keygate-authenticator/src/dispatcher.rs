use keygate_credentials::{Attestation, AttestationIssuer, KeyHandle, KeyStore, SelfSignedIssuer};
use serde_json::Value;

use crate::{
    AuthenticatorConfig, AuthenticatorError, Envelope, KeyProvisioning, Request, SignerDispatch,
    ValidationFailurePolicy, finalizer,
    host::{ExtensionItem, HostContext, PREPROCESSING_RESULTS_KEY, PROPERTY_LIST_TYPE},
};

/// Where a request is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// Waiting for the host to deliver a message.
    AwaitingInput,
    /// Checking the message shape.
    Validating,
    /// Provisioning a key and attesting to it.
    Registering,
    /// Signing with an existing key.
    Signing,
    /// Handing the result to the host.
    Finalizing,
    /// Terminal.
    Done,
}

impl State {
    /// Whether `next` directly follows this state.
    pub fn can_advance_to(self, next: State) -> bool {
        use State::*;
        matches!(
            (self, next),
            (AwaitingInput, Validating | Finalizing)
                | (Validating, Registering | Signing | Finalizing)
                | (Registering | Signing, Finalizing)
                | (Finalizing, Done)
        )
    }
}

/// Tracks one request through [`State`]s.
#[derive(Debug)]
struct Lifecycle {
    state: State,
    key_handle: Option<KeyHandle>,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: State::AwaitingInput,
            key_handle: None,
        }
    }

    fn handle(&self) -> Option<&str> {
        self.key_handle.as_ref().map(KeyHandle::as_str)
    }

    fn advance(&mut self, next: State) {
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal transition {:?} -> {next:?}",
            self.state
        );
        tracing::debug!(
            from = ?self.state,
            to = ?next,
            key_handle = ?self.handle(),
            "request state"
        );
        self.state = next;
    }
}

/// The request dispatcher.
///
/// Drives one request per [`Authenticator::begin_request`] call from the
/// host's input items to exactly one completion. Holds no per-request state
/// between calls.
#[derive(Debug, Clone)]
pub struct Authenticator<S, I> {
    provisioning: KeyProvisioning<S>,
    signer: SignerDispatch<S>,
    issuer: I,
    config: AuthenticatorConfig,
}

impl<S> Authenticator<S, SelfSignedIssuer>
where
    S: KeyStore + Clone,
{
    /// An authenticator issuing self-signed attestations described by
    /// `config.attestation`.
    pub fn with_self_signed(store: S, config: AuthenticatorConfig) -> Self {
        let issuer = SelfSignedIssuer::new(config.attestation.clone());
        Self::new(store, issuer, config)
    }
}

impl<S, I> Authenticator<S, I>
where
    S: KeyStore + Clone,
    I: AttestationIssuer,
{
    /// Build an authenticator over `store`, attesting registrations with
    /// `issuer`.
    pub fn new(store: S, issuer: I, config: AuthenticatorConfig) -> Self {
        Self {
            provisioning: KeyProvisioning::new(store.clone()),
            signer: SignerDispatch::new(store),
            issuer,
            config,
        }
    }

    /// The settings in use.
    pub fn config(&self) -> &AuthenticatorConfig {
        &self.config
    }

    /// Serve one request end to end.
    ///
    /// The context's completion is consumed exactly once on every path. If
    /// the returned future is dropped early, nothing is delivered and the
    /// host sees the request as abandoned.
    pub async fn begin_request(&self, context: HostContext) {
        let (input_items, completion) = context.into_parts();
        let mut lifecycle = Lifecycle::new();

        let envelope = match self.serve(&input_items, &mut lifecycle).await {
            Ok(envelope) => Some(envelope),
            Err(error) => self.failure_envelope(&error, &lifecycle),
        };

        lifecycle.advance(State::Finalizing);
        finalizer::finish(completion, envelope);
        lifecycle.advance(State::Done);
    }

    /// Validate and serve an already-located message.
    ///
    /// # Errors
    ///
    /// Returns the [`AuthenticatorError`] of whichever step failed first.
    pub async fn process(&self, message: &Value) -> Result<Envelope, AuthenticatorError> {
        let mut lifecycle = Lifecycle::new();
        lifecycle.advance(State::Validating);
        self.dispatch(message, &mut lifecycle).await
    }

    async fn serve(
        &self,
        input_items: &[ExtensionItem],
        lifecycle: &mut Lifecycle,
    ) -> Result<Envelope, AuthenticatorError> {
        let message = locate_message(input_items).await?;
        lifecycle.advance(State::Validating);
        self.dispatch(&message, lifecycle).await
    }

    async fn dispatch(
        &self,
        message: &Value,
        lifecycle: &mut Lifecycle,
    ) -> Result<Envelope, AuthenticatorError> {
        let request = Request::parse(message)?;
        lifecycle.key_handle = Some(request.key_handle().clone());

        match request {
            Request::Register {
                key_handle,
                to_sign,
            } => {
                lifecycle.advance(State::Registering);
                self.register(&key_handle, to_sign).await
            }
            Request::Sign {
                key_handle,
                to_sign,
            } => {
                lifecycle.advance(State::Signing);
                tracing::debug!(%key_handle, bytes = to_sign.len(), "sign request");
                self.sign(&key_handle, &to_sign).await
            }
        }
    }

    async fn register(
        &self,
        key_handle: &KeyHandle,
        to_sign: Vec<u8>,
    ) -> Result<Envelope, AuthenticatorError> {
        let public_key = self.provisioning.ensure_key(key_handle).await?;
        let attestation = self.issuer.issue().await?;

        // toSign first, then the raw public key.
        let mut full_to_sign = to_sign;
        full_to_sign.extend_from_slice(&public_key);

        let signature = attestation.sign(&full_to_sign)?;
        tracing::info!(%key_handle, "registered");

        Ok(Envelope::Registered {
            signature,
            public_key,
            certificate: attestation.to_der().to_vec(),
        })
    }

    async fn sign(
        &self,
        key_handle: &KeyHandle,
        to_sign: &[u8],
    ) -> Result<Envelope, AuthenticatorError> {
        let signature = self.signer.sign(key_handle, to_sign).await?;
        tracing::info!(%key_handle, "signed");

        Ok(Envelope::Signed { signature })
    }

    fn failure_envelope(
        &self,
        error: &AuthenticatorError,
        lifecycle: &Lifecycle,
    ) -> Option<Envelope> {
        tracing::warn!(%error, key_handle = ?lifecycle.handle(), "request failed");

        if error.is_validation()
            && self.config.validation_failures == ValidationFailurePolicy::Silent
        {
            return None;
        }
        Some(Envelope::from(error))
    }
}

/// Load the page message from the first property-list attachment among
/// `input_items`.
async fn locate_message(input_items: &[ExtensionItem]) -> Result<Value, AuthenticatorError> {
    let provider = input_items
        .iter()
        .flat_map(|item| item.attachments.iter())
        .find(|attachment| attachment.conforms_to(PROPERTY_LIST_TYPE))
        .ok_or(AuthenticatorError::NoMessageFound)?;

    let item = provider
        .load_item(PROPERTY_LIST_TYPE)
        .await
        .map_err(|error| {
            AuthenticatorError::Validation(format!("failed to load message: {error}"))
        })?;

    match item {
        Value::Object(mut fields) => fields.remove(PREPROCESSING_RESULTS_KEY).ok_or_else(|| {
            AuthenticatorError::Validation("message has no preprocessing results".into())
        }),
        _ => Err(AuthenticatorError::Validation(
            "message is not a property list mapping".into(),
        )),
    }
}
