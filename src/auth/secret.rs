//! Secret string that never prints its contents.

// self
use crate::_prelude::*;

const REDACTED: &str = "<redacted>";

/// Access or refresh token material.
///
/// `Debug` and `Display` print a placeholder. Serialization writes the plain string so stores
/// can persist it. Equality compares every byte regardless of where the first mismatch is.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenSecret(String);
impl TokenSecret {
	/// Wraps `value`.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the raw token. Keep the result out of logs.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Returns `true` when the secret holds no characters.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl From<String> for TokenSecret {
	fn from(value: String) -> Self {
		Self(value)
	}
}
impl From<&str> for TokenSecret {
	fn from(value: &str) -> Self {
		Self(value.to_owned())
	}
}
impl PartialEq for TokenSecret {
	fn eq(&self, other: &Self) -> bool {
		let (lhs, rhs) = (self.0.as_bytes(), other.0.as_bytes());

		lhs.len() == rhs.len() && lhs.iter().zip(rhs).fold(0, |acc, (a, b)| acc | (a ^ b)) == 0
	}
}
impl Eq for TokenSecret {}
impl Debug for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(f, "TokenSecret({REDACTED})")
	}
}
impl Display for TokenSecret {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(REDACTED)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn formatting_never_leaks_the_token() {
		let secret = TokenSecret::new("super-secret");

		assert_eq!(format!("{secret:?}"), "TokenSecret(<redacted>)");
		assert_eq!(secret.to_string(), "<redacted>");
		assert_eq!(secret.expose(), "super-secret");
	}

	#[test]
	fn equality_and_serde_use_the_raw_value() {
		let payload = serde_json::to_string(&TokenSecret::from("abc"))
			.expect("Token secrets should serialize to JSON.");

		assert_eq!(payload, "\"abc\"");
		assert_eq!(TokenSecret::from("abc"), TokenSecret::new(String::from("abc")));
		assert_ne!(TokenSecret::from("abc"), TokenSecret::from("abd"));
		assert_ne!(TokenSecret::from("abc"), TokenSecret::from("abcd"));
		assert!(TokenSecret::from("").is_empty());
	}
}
