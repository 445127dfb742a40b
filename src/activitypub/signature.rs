//! HTTP message signatures for outgoing deliveries.
//!
//! Implements the `draft-cavage-http-signatures-12` profile that Mastodon and
//! most fediverse servers verify: an `rsa-sha256` signature over
//! `(request-target) host date digest`, with the body bound through a
//! `Digest: SHA-256=...` header.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use reqwest::Url;
use ring::digest;
use ring::rand::SystemRandom;
use ring::signature::RSA_PKCS1_SHA256;

use super::keys::{ActorKey, KeyKind, PrivateKey};
use crate::error::SigningError;

/// Headers covered by the signature, in signing order.
const SIGNED_HEADERS: &str = "(request-target) host date digest";

/// Signature schemes a delivery can be signed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SigningScheme {
    DraftCavage,
}

impl SigningScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DraftCavage => "draft-cavage",
        }
    }

    /// Key family this scheme signs with.
    pub fn key_kind(&self) -> KeyKind {
        match self {
            Self::DraftCavage => KeyKind::Rsa,
        }
    }
}

impl std::fmt::Display for SigningScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header values to attach to a signed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedHeaders {
    pub host: String,
    pub date: String,
    pub digest: String,
    pub signature: String,
}

/// Sign a request with the given scheme.
pub fn sign_request(
    scheme: SigningScheme,
    method: &str,
    url: &Url,
    body: &[u8],
    key: &ActorKey,
    now: DateTime<Utc>,
) -> Result<SignedHeaders, SigningError> {
    match scheme {
        SigningScheme::DraftCavage => sign_draft_cavage(method, url, body, key, now),
    }
}

fn sign_draft_cavage(
    method: &str,
    url: &Url,
    body: &[u8],
    key: &ActorKey,
    now: DateTime<Utc>,
) -> Result<SignedHeaders, SigningError> {
    let PrivateKey::Rsa(key_pair) = &key.private_key else {
        return Err(SigningError::UnsupportedKey {
            key_id: key.key_id.clone(),
            scheme: SigningScheme::DraftCavage.to_string(),
        });
    };

    let host = host_header(url)?;
    let date = http_date(now);
    let digest = body_digest(body);
    let signing_string = signing_string(method, url, &host, &date, &digest);

    let mut signature = vec![0u8; key_pair.public().modulus_len()];
    key_pair
        .sign(
            &RSA_PKCS1_SHA256,
            &SystemRandom::new(),
            signing_string.as_bytes(),
            &mut signature,
        )
        .map_err(|e| SigningError::SignFailed(e.to_string()))?;

    let signature = format!(
        r#"keyId="{}",algorithm="rsa-sha256",headers="{}",signature="{}""#,
        key.key_id,
        SIGNED_HEADERS,
        STANDARD.encode(signature)
    );

    Ok(SignedHeaders {
        host,
        date,
        digest,
        signature,
    })
}

/// The exact byte string that gets signed.
pub fn signing_string(method: &str, url: &Url, host: &str, date: &str, digest: &str) -> String {
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    format!(
        "(request-target): {} {target}\nhost: {host}\ndate: {date}\ndigest: {digest}",
        method.to_lowercase()
    )
}

/// `Digest` header value for a body.
pub fn body_digest(body: &[u8]) -> String {
    let hash = digest::digest(&digest::SHA256, body);
    format!("SHA-256={}", STANDARD.encode(hash.as_ref()))
}

/// IMF-fixdate, as required for the `Date` header.
pub fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn host_header(url: &Url) -> Result<String, SigningError> {
    let host = url
        .host_str()
        .ok_or_else(|| SigningError::SignFailed(format!("URL {url} has no host")))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use ring::signature::{KeyPair, RSA_PKCS1_2048_8192_SHA256, UnparsedPublicKey};

    use super::*;
    use crate::activitypub::keys::tests::{RSA_PKCS8, rsa_key};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 8, 9, 10).unwrap()
    }

    #[test]
    fn date_is_imf_fixdate() {
        assert_eq!(http_date(fixed_now()), "Tue, 05 Mar 2024 08:09:10 GMT");
    }

    #[test]
    fn digest_of_empty_body() {
        assert_eq!(
            body_digest(b""),
            "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
        );
    }

    #[test]
    fn signing_string_layout() {
        let url = Url::parse("https://mastodon.social/users/fulano/inbox?x=1").unwrap();
        let s = signing_string("POST", &url, "mastodon.social", "DATE", "DIGEST");
        assert_eq!(
            s,
            "(request-target): post /users/fulano/inbox?x=1\nhost: mastodon.social\ndate: DATE\ndigest: DIGEST"
        );
    }

    #[test]
    fn signature_verifies_with_public_key() {
        let key = rsa_key("https://bot.test/users/testbot#main-key");
        let url = Url::parse("https://mastodon.social/users/fulano/inbox").unwrap();
        let body = br#"{"type":"Create"}"#;

        let headers =
            sign_request(SigningScheme::DraftCavage, "POST", &url, body, &key, fixed_now())
                .unwrap();

        assert_eq!(headers.host, "mastodon.social");
        assert_eq!(headers.digest, body_digest(body));
        assert!(
            headers
                .signature
                .starts_with(r#"keyId="https://bot.test/users/testbot#main-key",algorithm="rsa-sha256""#)
        );

        let b64 = headers
            .signature
            .rsplit("signature=\"")
            .next()
            .unwrap()
            .trim_end_matches('"');
        let raw = STANDARD.decode(b64).unwrap();

        let PrivateKey::Rsa(pair) = PrivateKey::from_pem(RSA_PKCS8).unwrap() else {
            panic!("fixture is RSA");
        };
        let public = UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA256, pair.public_key().as_ref());
        let message = signing_string("POST", &url, &headers.host, &headers.date, &headers.digest);
        public.verify(message.as_bytes(), &raw).unwrap();
    }

    #[test]
    fn host_keeps_explicit_port() {
        let key = rsa_key("k");
        let url = Url::parse("http://127.0.0.1:8080/inbox").unwrap();
        let headers =
            sign_request(SigningScheme::DraftCavage, "POST", &url, b"{}", &key, fixed_now())
                .unwrap();
        assert_eq!(headers.host, "127.0.0.1:8080");
    }

    #[test]
    fn ed25519_key_is_refused() {
        let key = ActorKey {
            key_id: "ed".into(),
            private_key: PrivateKey::from_pem(include_bytes!(
                "../../tests/fixtures/ed25519_private.pem"
            ))
            .unwrap(),
        };
        let url = Url::parse("https://x.test/inbox").unwrap();
        let err = sign_request(SigningScheme::DraftCavage, "POST", &url, b"{}", &key, fixed_now())
            .unwrap_err();
        assert!(matches!(err, SigningError::UnsupportedKey { .. }));
    }
}
