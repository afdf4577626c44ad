//! HTTP digest authentication.
//!
//! Parses `WWW-Authenticate` challenges and answers them with an MD5
//! digest `Authorization` header. Only what the device login needs is
//! covered: MD5, a single `qop` value echoed back, and a fixed nonce count.

mod challenge;
mod digest;

pub use challenge::{decode_header_bytes, header_bytes, parse_list, parse_pairs, AuthChallenge};
pub use digest::{
    authorization_header, generate_cnonce, md5_hex, render_authorization, Credential,
    DigestError, DigestResponse, NONCE_COUNT,
};
