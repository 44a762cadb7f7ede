use mailseal::prelude::*;
use mailseal::smime::{Error, Sealer};
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::pkey::PKey;
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::X509;
use std::collections::HashMap;

const BODY: &[u8] = b"Content-Type: text/plain\r\n\r\nsecret stuff\r\n";

fn envelope(to: &[&str]) -> Envelope {
    Envelope::new(
        Some("sender@example.org".parse().unwrap()),
        to.iter().map(|a| a.parse().unwrap()).collect(),
        "test-id".to_string(),
    )
    .unwrap()
}

fn data(name: &str) -> CertSource {
    CertSource::file(format!("tests/data/{}", name))
}

fn pem(name: &str) -> Vec<u8> {
    std::fs::read(format!("tests/data/{}", name)).unwrap()
}

/// Decrypts an S/MIME enveloped message with the given key and cert.
fn decrypt(sealed: &[u8], key: &str, cert: &str) -> Result<Vec<u8>, openssl::error::ErrorStack> {
    let (pkcs7, _) = Pkcs7::from_smime(sealed)?;
    let key = PKey::private_key_from_pem(&pem(key))?;
    let cert = X509::from_pem(&pem(cert))?;
    pkcs7.decrypt(&key, &cert, Pkcs7Flags::empty())
}

/// Verifies an S/MIME signed message against the sender certificate
/// and returns the signed content.
fn verify(signed: &[u8]) -> Vec<u8> {
    let (pkcs7, content) = Pkcs7::from_smime(signed).unwrap();
    let sender = X509::from_pem(&pem("sender.crt")).unwrap();
    let mut store = X509StoreBuilder::new().unwrap();
    store.add_cert(sender.clone()).unwrap();
    let store = store.build();
    let mut certs = Stack::new().unwrap();
    certs.push(sender).unwrap();
    let mut output = Vec::new();
    pkcs7
        .verify(
            &certs,
            &store,
            content.as_deref(),
            Some(&mut output),
            Pkcs7Flags::NOVERIFY,
        )
        .unwrap();
    output
}

#[async_attributes::test]
async fn unsealed_body_passes_through_unchanged() {
    let config = SealerConfig::new();
    let copies = Sealer::new(&config)
        .seal(&envelope(&["alice@example.org"]), BODY)
        .await
        .unwrap();
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].body(), BODY);
}

#[async_attributes::test]
async fn signed_message_verifies_against_sender_cert() {
    let config = SealerConfig::new()
        .sign_with(SigningIdentity::new(data("sender.crt"), data("sender.key")));
    let copies = Sealer::new(&config)
        .seal(&envelope(&["alice@example.org"]), BODY)
        .await
        .unwrap();
    assert_eq!(copies.len(), 1);
    assert_eq!(verify(copies[0].body()), BODY);
}

#[async_attributes::test]
async fn encrypted_message_decrypts_with_recipient_key() {
    let config = SealerConfig::new().encrypt_for(EncryptionCerts::Single(data("alice.crt")));
    let copies = Sealer::new(&config)
        .seal(&envelope(&["alice@example.org", "bob@example.org"]), BODY)
        .await
        .unwrap();
    // one copy for the whole envelope, encrypted to the single cert
    assert_eq!(copies.len(), 1);
    assert_eq!(copies[0].envelope().to().len(), 2);
    let plain = decrypt(copies[0].body(), "alice.key", "alice.crt").unwrap();
    assert_eq!(plain, BODY);
}

#[async_attributes::test]
async fn cert_list_envelopes_for_every_certificate() {
    let config = SealerConfig::new().encrypt_for(EncryptionCerts::List(vec![
        data("alice.crt"),
        data("bob.crt"),
    ]));
    let copies = Sealer::new(&config)
        .seal(&envelope(&["alice@example.org", "bob@example.org"]), BODY)
        .await
        .unwrap();
    assert_eq!(copies.len(), 1);
    assert_eq!(
        decrypt(copies[0].body(), "alice.key", "alice.crt").unwrap(),
        BODY
    );
    assert_eq!(
        decrypt(copies[0].body(), "bob.key", "bob.crt").unwrap(),
        BODY
    );
}

#[async_attributes::test]
async fn mixed_cert_sources_envelope_together() {
    let config = SealerConfig::new().encrypt_for(EncryptionCerts::List(vec![
        data("alice.crt"),
        CertSource::bytes(pem("bob.crt")),
    ]));
    let copies = Sealer::new(&config)
        .seal(&envelope(&["alice@example.org", "bob@example.org"]), BODY)
        .await
        .unwrap();
    assert_eq!(copies.len(), 1);
    assert_eq!(
        decrypt(copies[0].body(), "alice.key", "alice.crt").unwrap(),
        BODY
    );
    assert_eq!(
        decrypt(copies[0].body(), "bob.key", "bob.crt").unwrap(),
        BODY
    );
}

#[async_attributes::test]
async fn recipient_keyed_certs_seal_one_copy_each() {
    let mut map = HashMap::new();
    map.insert("alice@example.org".to_string(), data("alice.crt"));
    map.insert("bob@example.org".to_string(), data("bob.crt"));
    let config = SealerConfig::new().encrypt_for(EncryptionCerts::ByRecipient(map));
    let copies = Sealer::new(&config)
        .seal(&envelope(&["alice@example.org", "bob@example.org"]), BODY)
        .await
        .unwrap();
    assert_eq!(copies.len(), 2);

    let alice = copies
        .iter()
        .find(|c| AsRef::<str>::as_ref(&c.envelope().to()[0]) == "alice@example.org")
        .unwrap();
    assert_eq!(alice.envelope().to().len(), 1);
    assert_eq!(decrypt(alice.body(), "alice.key", "alice.crt").unwrap(), BODY);
    // Alice's copy must not open with Bob's key
    assert!(decrypt(alice.body(), "bob.key", "bob.crt").is_err());
}

#[async_attributes::test]
async fn missing_recipient_certificate_fails_the_seal() {
    let mut map = HashMap::new();
    map.insert("alice@example.org".to_string(), data("alice.crt"));
    let config = SealerConfig::new().encrypt_for(EncryptionCerts::ByRecipient(map));
    let result = Sealer::new(&config)
        .seal(&envelope(&["alice@example.org", "bob@example.org"]), BODY)
        .await;
    match result {
        Err(Error::MissingRecipientCert(address)) => assert_eq!(address, "bob@example.org"),
        other => panic!("expected missing certificate error, got {:?}", other),
    }
}

#[async_attributes::test]
async fn passphrase_protected_key_signs_inside_the_envelope() {
    let config = SealerConfig::new()
        .sign_with(
            SigningIdentity::new(data("sender.crt"), data("sender-enc.key"))
                .with_passphrase("swordfish"),
        )
        .encrypt_for(EncryptionCerts::Single(data("alice.crt")));
    let copies = Sealer::new(&config)
        .seal(&envelope(&["alice@example.org"]), BODY)
        .await
        .unwrap();
    assert_eq!(copies.len(), 1);
    let signed = decrypt(copies[0].body(), "alice.key", "alice.crt").unwrap();
    assert_eq!(verify(&signed), BODY);
}

#[async_attributes::test]
async fn wrong_passphrase_fails_the_seal() {
    let config = SealerConfig::new().sign_with(
        SigningIdentity::new(data("sender.crt"), data("sender-enc.key")).with_passphrase("nope"),
    );
    let result = Sealer::new(&config)
        .seal(&envelope(&["alice@example.org"]), BODY)
        .await;
    assert!(matches!(result, Err(Error::Crypto(_))));
}

#[async_attributes::test]
async fn cert_in_place_of_key_fails_the_seal() {
    // structurally complete identity, but the key material is garbage
    let config = SealerConfig::new()
        .sign_with(SigningIdentity::new(data("sender.crt"), data("sender.crt")));
    let result = Sealer::new(&config)
        .seal(&envelope(&["alice@example.org"]), BODY)
        .await;
    assert!(result.is_err());
}

#[async_attributes::test]
async fn pem_bytes_work_like_files() {
    let config = SealerConfig::new().sign_with(SigningIdentity::new(
        CertSource::bytes(pem("sender.crt")),
        CertSource::bytes(pem("sender.key")),
    ));
    let copies = Sealer::new(&config)
        .seal(&envelope(&["alice@example.org"]), BODY)
        .await
        .unwrap();
    assert_eq!(verify(copies[0].body()), BODY);
}
