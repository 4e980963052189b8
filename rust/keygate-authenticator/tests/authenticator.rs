//! End-to-end request handling: the host delivers items, the authenticator
//! drives the key store and attestation issuer, and exactly one completion
//! comes back.

use std::sync::Arc;

use async_trait::async_trait;
use keygate_authenticator::{
    Authenticator, AuthenticatorConfig, ExtensionItem, HostContext, ResponseItem,
    ValidationFailurePolicy,
    bytes::decode_byte_array,
    host::{FINALIZE_ARGUMENT_KEY, PROPERTY_LIST_TYPE, PropertyListItem},
};
use keygate_credentials::{
    AlwaysConfirm, AlwaysDeny, Attestation, AttestationError, AttestationIssuer, KeyHandle,
    KeyStore, MemoryKeyStore, PresenceError, PresencePurpose, UserPresence,
};
use p256::ecdsa::{DerSignature, VerifyingKey, signature::Verifier as _};
use serde_json::{Value, json};
use testresult::TestResult;
use x509_cert::{Certificate, der::Decode as _};

fn authenticator<P>(
    store: MemoryKeyStore<P>,
    policy: ValidationFailurePolicy,
) -> Authenticator<MemoryKeyStore<P>, keygate_credentials::SelfSignedIssuer>
where
    P: UserPresence,
{
    Authenticator::with_self_signed(
        store,
        AuthenticatorConfig {
            validation_failures: policy,
            ..AuthenticatorConfig::default()
        },
    )
}

fn message_items(message: Value) -> Vec<ExtensionItem> {
    vec![ExtensionItem::new().with_attachment(PropertyListItem::preprocessed(message))]
}

/// Run one request and return every item the host received.
async fn run<S, I>(authenticator: &Authenticator<S, I>, items: Vec<ExtensionItem>) -> Vec<ResponseItem>
where
    S: KeyStore + Clone,
    I: AttestationIssuer,
{
    let (context, pending) = HostContext::new(items);
    authenticator.begin_request(context).await;
    pending.wait().await.expect("request completed")
}

/// The envelope inside the single response item.
fn envelope(items: &[ResponseItem]) -> &Value {
    assert_eq!(items.len(), 1, "expected exactly one response item");
    assert_eq!(items[0].attachments.len(), 1);

    let attachment = &items[0].attachments[0];
    assert_eq!(attachment.type_identifier(), PROPERTY_LIST_TYPE);
    &attachment.item()[FINALIZE_ARGUMENT_KEY]
}

fn data_field(envelope: &Value, name: &str) -> Vec<u8> {
    serde_json::from_value(envelope[name].clone()).expect("binary field")
}

fn text_field(envelope: &Value, name: &str) -> Vec<u8> {
    decode_byte_array(envelope[name].as_str().expect("text field")).expect("byte-array text")
}

/// Parse the DER certificate and pull out the key it certifies.
fn certificate_key(certificate: &[u8]) -> VerifyingKey {
    let certificate = Certificate::from_der(certificate).expect("DER certificate");
    let spki = certificate.tbs_certificate.subject_public_key_info;
    VerifyingKey::from_sec1_bytes(spki.subject_public_key.raw_bytes()).expect("P-256 point")
}

fn error_reason(envelope: &Value) -> &str {
    let fields = envelope.as_object().expect("mapping");
    assert_eq!(fields.len(), 1, "error envelopes carry nothing else");
    fields["error"].as_str().expect("reason")
}

#[tokio::test]
async fn registration_attests_the_hardware_key() -> TestResult {
    let store = MemoryKeyStore::default();
    let authenticator = authenticator(store.clone(), ValidationFailurePolicy::Report);

    let items = run(
        &authenticator,
        message_items(json!({ "type": "register", "keyHandle": "abc", "toSign": "[1,2,3]" })),
    )
    .await;
    let envelope = envelope(&items);

    assert_eq!(envelope.as_object().map(|fields| fields.len()), Some(3));

    let public_key = text_field(envelope, "publicKey");
    let certificate = data_field(envelope, "certificate");
    let signature = data_field(envelope, "signature");

    assert!(!public_key.is_empty());
    assert_eq!(
        public_key,
        store.public_key_bytes(&KeyHandle::new("abc")?).await?
    );

    // The certificate names the attestation key, not the hardware key, and
    // that key signed toSign ‖ publicKey.
    let attestation_key = certificate_key(&certificate);
    assert_ne!(
        attestation_key.to_encoded_point(false).as_bytes(),
        public_key.as_slice()
    );

    let mut signed = vec![1, 2, 3];
    signed.extend_from_slice(&public_key);
    let signature = DerSignature::from_bytes(&signature)?;
    assert!(attestation_key.verify(&signed, &signature).is_ok());

    let mut reversed = public_key.clone();
    reversed.extend_from_slice(&[1, 2, 3]);
    assert!(attestation_key.verify(&reversed, &signature).is_err());
    Ok(())
}

#[tokio::test]
async fn repeated_registration_keeps_the_public_key() -> TestResult {
    let store = MemoryKeyStore::default();
    let authenticator = authenticator(store.clone(), ValidationFailurePolicy::Report);
    let request = json!({ "type": "register", "keyHandle": "abc", "toSign": "[9]" });

    let first = run(&authenticator, message_items(request.clone())).await;
    let second = run(&authenticator, message_items(request)).await;

    assert_eq!(
        text_field(envelope(&first), "publicKey"),
        text_field(envelope(&second), "publicKey")
    );
    // Each registration gets its own attestation.
    assert_ne!(
        data_field(envelope(&first), "certificate"),
        data_field(envelope(&second), "certificate")
    );
    assert_eq!(store.len().await, 1);
    Ok(())
}

#[tokio::test]
async fn signing_uses_the_registered_key() -> TestResult {
    let authenticator = authenticator(MemoryKeyStore::default(), ValidationFailurePolicy::Report);

    let registered = run(
        &authenticator,
        message_items(json!({ "type": "register", "keyHandle": "abc", "toSign": "[0]" })),
    )
    .await;
    let public_key = text_field(envelope(&registered), "publicKey");

    let signed = run(
        &authenticator,
        message_items(json!({ "type": "sign", "keyHandle": "abc", "toSign": "[10,20,30]" })),
    )
    .await;
    let envelope = envelope(&signed);
    assert_eq!(envelope.as_object().map(|fields| fields.len()), Some(1));

    let signature = text_field(envelope, "signature");
    let hardware_key = VerifyingKey::from_sec1_bytes(&public_key)?;
    let signature = DerSignature::from_bytes(&signature)?;
    assert!(hardware_key.verify(&[10, 20, 30], &signature).is_ok());
    Ok(())
}

#[tokio::test]
async fn signing_with_an_unprovisioned_handle_fails() -> TestResult {
    let authenticator = authenticator(MemoryKeyStore::default(), ValidationFailurePolicy::Report);

    let items = run(
        &authenticator,
        message_items(json!({ "type": "sign", "keyHandle": "ghost", "toSign": "[1]" })),
    )
    .await;

    assert_eq!(
        error_reason(envelope(&items)),
        "no key provisioned for handle 'ghost'"
    );
    Ok(())
}

#[tokio::test]
async fn declined_confirmation_is_reported() -> TestResult {
    struct EnrollOnly;

    #[async_trait]
    impl UserPresence for EnrollOnly {
        async fn confirm(
            &self,
            _: &KeyHandle,
            purpose: PresencePurpose,
        ) -> Result<(), PresenceError> {
            match purpose {
                PresencePurpose::Enroll => Ok(()),
                PresencePurpose::Sign => Err(PresenceError::Denied),
            }
        }
    }

    let store = MemoryKeyStore::new(EnrollOnly);
    store.generate(&KeyHandle::new("abc")?).await?;
    let authenticator = authenticator(store, ValidationFailurePolicy::Report);

    let items = run(
        &authenticator,
        message_items(json!({ "type": "sign", "keyHandle": "abc", "toSign": "[1]" })),
    )
    .await;

    assert_eq!(error_reason(envelope(&items)), "user declined to sign");
    Ok(())
}

#[tokio::test]
async fn refused_enrollment_fails_registration() -> TestResult {
    let store = MemoryKeyStore::new(AlwaysDeny);
    let authenticator = authenticator(store.clone(), ValidationFailurePolicy::Silent);

    let items = run(
        &authenticator,
        message_items(json!({ "type": "register", "keyHandle": "abc", "toSign": "[1]" })),
    )
    .await;

    // Component failures are reported even under the silent policy.
    assert!(error_reason(envelope(&items)).starts_with("error generating or finding key"));
    assert!(store.is_empty().await);
    Ok(())
}

#[tokio::test]
async fn malformed_to_sign_is_a_decode_error() -> TestResult {
    let authenticator = authenticator(MemoryKeyStore::default(), ValidationFailurePolicy::Report);

    let items = run(
        &authenticator,
        message_items(json!({ "type": "register", "keyHandle": "abc", "toSign": "[1,2,300]" })),
    )
    .await;

    assert_eq!(
        error_reason(envelope(&items)),
        "invalid toSign: element 2 of byte array is not a byte"
    );
    Ok(())
}

#[tokio::test]
async fn missing_key_handle_is_a_validation_error() -> TestResult {
    let authenticator = authenticator(MemoryKeyStore::default(), ValidationFailurePolicy::Report);

    let items = run(
        &authenticator,
        message_items(json!({ "type": "sign", "toSign": "[1]" })),
    )
    .await;

    assert_eq!(
        error_reason(envelope(&items)),
        "invalid request: missing field 'keyHandle'"
    );
    Ok(())
}

#[tokio::test]
async fn unknown_types_are_reported_by_default() -> TestResult {
    let authenticator = authenticator(MemoryKeyStore::default(), ValidationFailurePolicy::Report);

    let items = run(&authenticator, message_items(json!({ "type": "bogus" }))).await;

    assert_eq!(
        error_reason(envelope(&items)),
        "invalid request: unknown request type 'bogus'"
    );
    Ok(())
}

#[tokio::test]
async fn unknown_types_complete_silently_when_configured() -> TestResult {
    let authenticator = authenticator(MemoryKeyStore::default(), ValidationFailurePolicy::Silent);

    let items = run(&authenticator, message_items(json!({ "type": "bogus" }))).await;

    assert!(items.is_empty());
    Ok(())
}

#[tokio::test]
async fn missing_messages_are_always_reported() -> TestResult {
    let authenticator = authenticator(MemoryKeyStore::default(), ValidationFailurePolicy::Silent);

    let no_items = run(&authenticator, vec![]).await;
    assert_eq!(error_reason(envelope(&no_items)), "failed to find message");

    let wrong_type = run(
        &authenticator,
        vec![ExtensionItem::new().with_attachment(PropertyListItem::with_type(
            "public.plain-text",
            json!("hello"),
        ))],
    )
    .await;
    assert_eq!(error_reason(envelope(&wrong_type)), "failed to find message");
    Ok(())
}

/// An issuer whose certificates can be generated but never sign, or that
/// cannot generate at all.
struct BrokenIssuer {
    generates: bool,
}

struct UnsignableAttestation;

impl Attestation for UnsignableAttestation {
    fn to_der(&self) -> &[u8] {
        &[0x30, 0x00]
    }

    fn sign(&self, _: &[u8]) -> Result<Vec<u8>, AttestationError> {
        Err(AttestationError::Signing("primitive failure".into()))
    }
}

#[async_trait]
impl AttestationIssuer for BrokenIssuer {
    type Attestation = UnsignableAttestation;

    async fn issue(&self) -> Result<UnsignableAttestation, AttestationError> {
        if self.generates {
            Ok(UnsignableAttestation)
        } else {
            Err(AttestationError::Generation("no entropy".into()))
        }
    }
}

#[tokio::test]
async fn attestation_failures_abort_registration() -> TestResult {
    let store = MemoryKeyStore::new(AlwaysConfirm);
    let request = json!({ "type": "register", "keyHandle": "abc", "toSign": "[1]" });

    let cannot_generate = Authenticator::new(
        store.clone(),
        BrokenIssuer { generates: false },
        AuthenticatorConfig::default(),
    );
    let items = run(&cannot_generate, message_items(request.clone())).await;
    assert_eq!(
        error_reason(envelope(&items)),
        "error generating certificate: no entropy"
    );

    let cannot_sign = Authenticator::new(
        store,
        BrokenIssuer { generates: true },
        AuthenticatorConfig::default(),
    );
    let items = run(&cannot_sign, message_items(request)).await;
    assert_eq!(
        error_reason(envelope(&items)),
        "failed to sign message: primitive failure"
    );
    Ok(())
}

#[tokio::test]
async fn authenticators_can_be_shared_across_requests() -> TestResult {
    let authenticator = Arc::new(authenticator(
        MemoryKeyStore::default(),
        ValidationFailurePolicy::Report,
    ));

    let mut tasks = Vec::new();
    for handle in ["a", "b", "c"] {
        let authenticator = authenticator.clone();
        tasks.push(tokio::spawn(async move {
            run(
                &authenticator,
                message_items(json!({ "type": "register", "keyHandle": handle, "toSign": "[]" })),
            )
            .await
        }));
    }

    for task in tasks {
        let items = task.await?;
        assert!(envelope(&items).get("certificate").is_some());
    }
    Ok(())
}
