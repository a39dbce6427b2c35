//! Codec errors.

/// A convenient type alias for `Result` with `E` = [`enum@crate::Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Reasons a frame could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
	/// The command line is not a STOMP 1.2 command.
	#[error("unknown command: {0:?}")]
	UnknownCommand(String),
	/// The frame ended before the blank line separating headers from body.
	#[error("frame headers are not terminated")]
	UnterminatedHeaders,
	/// A header line has no `:` separator.
	#[error("malformed header line: {0:?}")]
	MalformedHeader(String),
	/// A header contains an escape sequence outside the STOMP 1.2 set.
	#[error("invalid escape sequence \\{0} in header")]
	InvalidEscape(char),
	/// The body is not terminated by a NUL octet.
	#[error("frame body is missing its NUL terminator")]
	MissingNul,
	/// `content-length` is not a non-negative integer.
	#[error("invalid content-length: {0:?}")]
	InvalidContentLength(String),
	/// The body is shorter than the declared `content-length`.
	#[error("body has {actual} bytes but content-length declares {declared}")]
	TruncatedBody {
		/// Declared length in bytes.
		declared: usize,
		/// Bytes available before the end of input.
		actual: usize,
	},
}
