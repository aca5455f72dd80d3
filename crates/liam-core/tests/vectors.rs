//! Shared request-signing test vectors.
//!
//! `vectors/request_signing.json` is produced by an independent
//! implementation; every binding of the signing contract runs against it.

use liam_core::encoding::Value;
use liam_core::signing::{self, NonceMode, Signature};
use liam_core::{
    Canonicalizer, Credentials, KeyOrder, KeyPair, KeyRegistry, PayloadDigest, PublicKey, RequestSigner,
    Verifier,
};
use serde::Deserialize;

const VECTORS: &str = include_str!("../../../vectors/request_signing.json");

#[derive(Deserialize)]
struct Vectors {
    private_key_pkcs8_pem: String,
    private_key_sec1_pem: String,
    public_key_pem: String,
    cases: Vec<Case>,
    tampered: Tampered,
}

#[derive(Deserialize)]
struct Case {
    name: String,
    endpoint: String,
    key_order: KeyOrder,
    body: serde_json::Value,
    canonical: String,
    sha256: String,
    signature: String,
}

#[derive(Deserialize)]
struct Tampered {
    case: String,
    body: serde_json::Value,
    canonical: String,
}

fn vectors() -> Vectors {
    serde_json::from_str(VECTORS).expect("vector file parses")
}

#[test]
fn keys_agree() {
    let v = vectors();
    let pkcs8 = KeyPair::from_pem(&v.private_key_pkcs8_pem).unwrap();
    let sec1 = KeyPair::from_pem(&v.private_key_sec1_pem).unwrap();
    let public = PublicKey::from_pem(&v.public_key_pem).unwrap();
    assert_eq!(pkcs8.public_key(), public);
    assert_eq!(sec1.public_key(), public);
}

#[test]
fn canonical_bytes_and_digests_match() {
    for case in vectors().cases {
        let canonical = Canonicalizer::new(case.key_order)
            .canonicalize(&Value::try_from(case.body).unwrap())
            .unwrap();
        assert_eq!(canonical.as_str(), case.canonical, "case {}", case.name);

        let digest = PayloadDigest::digest(canonical.as_bytes());
        assert_eq!(digest.to_hex(), case.sha256, "case {}", case.name);
        assert_eq!(hex::decode(&case.sha256).unwrap(), digest.as_bytes().to_vec());
    }
}

#[test]
fn reference_signatures_verify() {
    let v = vectors();
    let public = PublicKey::from_pem(&v.public_key_pem).unwrap();
    for case in &v.cases {
        let ok = signing::verify_base64(&public, case.canonical.as_bytes(), &case.signature).unwrap();
        assert!(ok, "case {}", case.name);
    }
}

#[test]
fn our_signatures_verify_with_reference_key() {
    let v = vectors();
    let creds = Credentials::new("vector-key", KeyPair::from_pem(&v.private_key_sec1_pem).unwrap());
    let public = PublicKey::from_pem(&v.public_key_pem).unwrap();

    for case in &v.cases {
        for nonce in [NonceMode::Randomized, NonceMode::Deterministic] {
            let envelope = RequestSigner::new(&creds)
                .key_order(case.key_order)
                .nonce(nonce)
                .build(&case.endpoint, &Value::try_from(case.body.clone()).unwrap())
                .unwrap();
            assert_eq!(envelope.body().as_str(), case.canonical, "case {}", case.name);
            assert!(signing::verify(&public, envelope.body().as_bytes(), envelope.signature()));
        }
    }
}

#[test]
fn reference_signature_does_not_transfer_to_tampered_body() {
    let v = vectors();
    let public = PublicKey::from_pem(&v.public_key_pem).unwrap();
    let original = v.cases.iter().find(|c| c.name == v.tampered.case).unwrap();

    let tampered = Canonicalizer::default()
        .canonicalize(&Value::try_from(v.tampered.body.clone()).unwrap())
        .unwrap();
    assert_eq!(tampered.as_str(), v.tampered.canonical);
    assert_ne!(tampered.as_str(), original.canonical);

    let sig = Signature::from_base64(&original.signature).unwrap();
    assert!(signing::verify(&public, original.canonical.as_bytes(), &sig));
    assert!(!signing::verify(&public, tampered.as_bytes(), &sig));
}

#[test]
fn verifier_accepts_reference_requests() {
    let v = vectors();
    let mut registry = KeyRegistry::new();
    registry.register("vector-key", PublicKey::from_pem(&v.public_key_pem).unwrap());
    let strict = Verifier::new(registry).strict(Canonicalizer::default());

    for case in v.cases.iter().filter(|c| c.key_order == KeyOrder::Sorted) {
        let result = strict.verify(Some("vector-key"), Some(&case.signature), case.canonical.as_bytes());
        assert!(result.is_ok(), "case {}: {result:?}", case.name);
    }
}
