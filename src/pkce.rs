//! RFC 7636 (PKCE) verifier and challenge generation.

// std
use std::fmt::Write;
// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use sha2::{Digest, Sha256};
// self
use crate::_prelude::*;

const VERIFIER_ENTROPY_BYTES: usize = 22;

/// Supported PKCE challenge methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeChallengeMethod {
	/// SHA-256 based PKCE (RFC 7636 S256).
	S256,
}
impl CodeChallengeMethod {
	/// Returns the RFC 7636 identifier for the challenge method.
	pub fn as_str(self) -> &'static str {
		match self {
			CodeChallengeMethod::S256 => "S256",
		}
	}
}

/// A verifier plus its derived challenge, generated together per authorization attempt.
#[derive(Clone)]
pub struct PkcePair {
	verifier: String,
	challenge: String,
	method: CodeChallengeMethod,
}
impl PkcePair {
	/// Generates a fresh verifier and derives its S256 challenge.
	pub fn generate() -> Self {
		let verifier = code_verifier();
		let challenge = code_challenge(&verifier);

		Self { verifier, challenge, method: CodeChallengeMethod::S256 }
	}

	/// The secret verifier sent to the token endpoint as `code_verifier`.
	pub fn verifier(&self) -> &str {
		&self.verifier
	}

	/// The public challenge sent to the authorization endpoint as `code_challenge`.
	pub fn challenge(&self) -> &str {
		&self.challenge
	}

	/// PKCE challenge method (currently always `S256`).
	pub fn method(&self) -> CodeChallengeMethod {
		self.method
	}
}
impl Debug for PkcePair {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PkcePair")
			.field("verifier", &"<redacted>")
			.field("challenge", &self.challenge)
			.field("method", &self.method)
			.finish()
	}
}

/// Generates a high-entropy code verifier: 22 random bytes rendered as 44 lowercase hex chars.
pub fn code_verifier() -> String {
	let mut bytes = [0_u8; VERIFIER_ENTROPY_BYTES];

	rand::rng().fill(&mut bytes[..]);

	bytes.iter().fold(String::with_capacity(VERIFIER_ENTROPY_BYTES * 2), |mut buf, byte| {
		let _ = write!(buf, "{byte:02x}");

		buf
	})
}

/// Derives the S256 challenge: base64url-unpadded SHA-256 of the verifier's UTF-8 bytes.
pub fn code_challenge(verifier: &str) -> String {
	URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}
