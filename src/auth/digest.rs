//! Digest response computation.
//!
//! Implements the `qop` flavoured MD5 digest:
//!
//! ```text
//! HA1      = MD5(username:realm:password)
//! HA2      = MD5(method:path)
//! response = MD5(HA1:nonce:nc:cnonce:qop:HA2)
//! ```
//!
//! Challenge values are hashed and echoed as the bytes the server sent
//! (see [`header_bytes`](super::header_bytes)), so a realm in a legacy
//! 8-bit charset still produces a digest the server accepts.
//!
//! # Nonce count
//!
//! Every header claims to be the first request on the session
//! ([`NONCE_COUNT`]). This only holds for servers that do not enforce
//! nonce-count monotonicity, which is the case for the device this crate
//! targets.

use super::{header_bytes, AuthChallenge};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand_core::{OsRng, RngCore};
use thiserror::Error;

/// Nonce count sent with every digest response.
pub const NONCE_COUNT: &str = "0000000f";

/// Number of random bytes in a client nonce (16 base64 characters).
const CNONCE_BYTES: usize = 12;

/// Errors that can occur while building a digest response.
#[derive(Debug, Error)]
pub enum DigestError {
    /// The OS random source could not supply a client nonce.
    #[error("random source failed while generating client nonce: {0}")]
    RandomSource(#[from] rand_core::Error),
}

/// Device login, supplied once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    password: String,
}

impl Credential {
    /// Creates a credential from a login name and password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// The login name.
    pub fn username(&self) -> &str {
        &self.username
    }

    pub(crate) fn password(&self) -> &str {
        &self.password
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Lowercase hex MD5 of `data`.
pub fn md5_hex(data: impl AsRef<[u8]>) -> String {
    format!("{:x}", md5::compute(data))
}

/// Lowercase hex MD5 of `parts` joined with `:`.
fn md5_joined(parts: &[&[u8]]) -> String {
    let mut context = md5::Context::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            context.consume(b":");
        }
        context.consume(part);
    }
    format!("{:x}", context.compute())
}

/// Generates a fresh client nonce from the OS CSPRNG.
///
/// Fails rather than falling back to a weaker source.
pub fn generate_cnonce() -> Result<String, DigestError> {
    let mut bytes = [0u8; CNONCE_BYTES];
    OsRng.try_fill_bytes(&mut bytes)?;
    Ok(STANDARD.encode(bytes))
}

/// The three hashes making up a digest response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestResponse {
    /// `MD5(username:realm:password)`
    pub ha1: String,
    /// `MD5(method:path)`
    pub ha2: String,
    /// `MD5(HA1:nonce:nc:cnonce:qop:HA2)`
    pub response: String,
}

impl DigestResponse {
    /// Computes the digest for a request.
    pub fn compute(
        credential: &Credential,
        challenge: &AuthChallenge,
        method: &str,
        path: &str,
        nc: &str,
        cnonce: &str,
    ) -> Self {
        let ha1 = md5_joined(&[
            credential.username().as_bytes(),
            &header_bytes(challenge.realm()),
            credential.password().as_bytes(),
        ]);
        let ha2 = md5_joined(&[method.as_bytes(), path.as_bytes()]);
        let response = md5_joined(&[
            ha1.as_bytes(),
            &header_bytes(challenge.nonce()),
            nc.as_bytes(),
            cnonce.as_bytes(),
            &header_bytes(challenge.qop()),
            ha2.as_bytes(),
        ]);

        Self { ha1, ha2, response }
    }
}

/// Renders the `Authorization` header value.
///
/// Field order is fixed; `qop` and `nc` are unquoted. The result is raw
/// header bytes because challenge values may fall outside ASCII.
pub fn render_authorization(
    credential: &Credential,
    challenge: &AuthChallenge,
    path: &str,
    digest: &DigestResponse,
    nc: &str,
    cnonce: &str,
) -> Vec<u8> {
    let fields: [(&str, Vec<u8>, bool); 9] = [
        ("username", credential.username().as_bytes().to_vec(), true),
        ("realm", header_bytes(challenge.realm()), true),
        ("nonce", header_bytes(challenge.nonce()), true),
        ("uri", path.as_bytes().to_vec(), true),
        ("response", digest.response.as_bytes().to_vec(), true),
        ("opaque", header_bytes(challenge.opaque()), true),
        ("qop", header_bytes(challenge.qop()), false),
        ("nc", nc.as_bytes().to_vec(), false),
        ("cnonce", cnonce.as_bytes().to_vec(), true),
    ];

    let mut header = b"Digest ".to_vec();
    for (i, (name, value, quoted)) in fields.iter().enumerate() {
        if i > 0 {
            header.extend_from_slice(b", ");
        }
        header.extend_from_slice(name.as_bytes());
        header.push(b'=');
        if *quoted {
            header.push(b'"');
        }
        header.extend_from_slice(value);
        if *quoted {
            header.push(b'"');
        }
    }
    header
}

/// Builds a complete `Authorization` header answering `challenge`.
pub fn authorization_header(
    credential: &Credential,
    challenge: &AuthChallenge,
    method: &str,
    path: &str,
) -> Result<Vec<u8>, DigestError> {
    let cnonce = generate_cnonce()?;
    let digest = DigestResponse::compute(credential, challenge, method, path, NONCE_COUNT, &cnonce);
    Ok(render_authorization(
        credential, challenge, path, &digest, NONCE_COUNT, &cnonce,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const CNONCE: &str = "Y2xpZW50bm9uY2Ux";

    fn challenge() -> AuthChallenge {
        AuthChallenge::from_header(r#"Digest realm="r", nonce="n", qop="auth""#)
    }

    fn compute(credential: &Credential, challenge: &AuthChallenge, method: &str) -> DigestResponse {
        DigestResponse::compute(credential, challenge, method, "/main", NONCE_COUNT, CNONCE)
    }

    #[test]
    fn test_known_digest() {
        let digest = compute(&Credential::new("u", "p"), &challenge(), "GET");

        assert_eq!(digest.ha1, "44add22b6f3179b751eafd68ee370f7d");
        assert_eq!(digest.ha2, "d36a9dcb599f413cf13cdeb613eafa28");
        assert_eq!(digest.response, "4d1881ce330b856db8490e900abc2233");
    }

    #[test]
    fn test_rfc2617_vector() {
        let credential = Credential::new("Mufasa", "Circle Of Life");
        let challenge = AuthChallenge::from_header(
            r#"Digest realm="testrealm@host.com", qop="auth", nonce="dcd98b7102dd2f0e8b11d0f600bfb0c093", opaque="5ccc069c403ebaf9f0171e9517f40e41""#,
        );

        let digest = DigestResponse::compute(
            &credential,
            &challenge,
            "GET",
            "/dir/index.html",
            "00000001",
            "0a4f113b",
        );

        assert_eq!(digest.response, "6629fae49393a05397450978507c4ef1");
    }

    #[test]
    fn test_every_input_changes_response() {
        let base = compute(&Credential::new("u", "p"), &challenge(), "GET").response;

        let variants = [
            compute(&Credential::new("v", "p"), &challenge(), "GET").response,
            compute(&Credential::new("u", "q"), &challenge(), "GET").response,
            compute(&Credential::new("u", "p"), &challenge(), "POST").response,
            compute(
                &Credential::new("u", "p"),
                &AuthChallenge::from_header(r#"Digest realm="r2", nonce="n", qop="auth""#),
                "GET",
            )
            .response,
            compute(
                &Credential::new("u", "p"),
                &AuthChallenge::from_header(r#"Digest realm="r", nonce="n2", qop="auth""#),
                "GET",
            )
            .response,
            compute(
                &Credential::new("u", "p"),
                &AuthChallenge::from_header(r#"Digest realm="r", nonce="n", qop="auth-int""#),
                "GET",
            )
            .response,
            DigestResponse::compute(&Credential::new("u", "p"), &challenge(), "GET", "/other", NONCE_COUNT, CNONCE)
                .response,
            DigestResponse::compute(&Credential::new("u", "p"), &challenge(), "GET", "/main", "00000001", CNONCE)
                .response,
            DigestResponse::compute(&Credential::new("u", "p"), &challenge(), "GET", "/main", NONCE_COUNT, "other")
                .response,
        ];

        for variant in variants {
            assert_ne!(variant, base);
        }
    }

    #[test]
    fn test_render_field_order() {
        let credential = Credential::new("u", "p");
        let challenge =
            AuthChallenge::from_header(r#"Digest realm="r", nonce="n", opaque="o", qop="auth""#);
        let digest = compute(&credential, &challenge, "GET");

        let header = render_authorization(&credential, &challenge, "/main", &digest, NONCE_COUNT, CNONCE);

        assert_eq!(
            header,
            format!(
                r#"Digest username="u", realm="r", nonce="n", uri="/main", response="{}", opaque="o", qop=auth, nc=0000000f, cnonce="{}""#,
                digest.response, CNONCE
            )
            .into_bytes()
        );
    }

    #[test]
    fn test_empty_challenge_renders_empty_fields() {
        let header = authorization_header(
            &Credential::new("u", "p"),
            &AuthChallenge::default(),
            "GET",
            "/main",
        )
        .unwrap();
        let header = String::from_utf8(header).unwrap();

        assert!(header.starts_with(r#"Digest username="u", realm="", nonce="", uri="/main""#));
        assert!(header.contains(r#"opaque="", qop=, nc=0000000f"#));
    }

    #[test]
    fn test_non_ascii_realm_hashed_as_sent() {
        let credential = Credential::new("u", "p");
        let challenge =
            AuthChallenge::from_header_bytes(b"Digest realm=\"B\xfcro\", nonce=\"n\", qop=\"auth\"");

        let digest = compute(&credential, &challenge, "GET");
        assert_eq!(digest.ha1, "fc68114ee99cedd155dc10c6518997b4");
        assert_eq!(digest.ha1, md5_hex(b"u:B\xfcro:p"));

        let header = render_authorization(&credential, &challenge, "/main", &digest, NONCE_COUNT, CNONCE);
        let realm = b"realm=\"B\xfcro\"";
        assert!(header.windows(realm.len()).any(|w| w == realm));
    }

    #[test]
    fn test_cnonce_differs_between_calls() {
        let a = generate_cnonce().unwrap();
        let b = generate_cnonce().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_credential_debug_hides_password() {
        let rendered = format!("{:?}", Credential::new("admin", "hunter2"));
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
    }

    proptest! {
        #[test]
        fn prop_cnonce_is_16_base64_chars(_run in 0u8..32) {
            let cnonce = generate_cnonce().unwrap();
            prop_assert_eq!(cnonce.len(), 16);
            prop_assert!(cnonce
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/'));
        }
    }
}
