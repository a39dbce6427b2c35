//! Text codec for STOMP frames.
//!
//! A frame on the wire is `COMMAND EOL *(header EOL) EOL body NUL`, where EOL is
//! `\n` or `\r\n`. A payload made only of EOLs is a heartbeat.

use std::fmt::Write;

use crate::frame::header;
use crate::{Command, Error, Frame, Result};

/// Render `frame` as wire text, NUL terminator included.
///
/// A `content-length` header is added when the body is non-empty and the
/// frame does not already carry one.
pub fn encode(frame: &Frame) -> String {
	let mut out = String::with_capacity(64 + frame.body.len());
	out.push_str(frame.command.as_str());
	out.push('\n');

	let escape = frame.command.escapes_headers();
	for (name, value) in &frame.headers {
		if escape {
			push_escaped(&mut out, name);
			out.push(':');
			push_escaped(&mut out, value);
		} else {
			out.push_str(name);
			out.push(':');
			out.push_str(value);
		}
		out.push('\n');
	}
	if !frame.body.is_empty() && frame.get(header::CONTENT_LENGTH).is_none() {
		let _ = writeln!(out, "{}:{}", header::CONTENT_LENGTH, frame.body.len());
	}

	out.push('\n');
	out.push_str(&frame.body);
	out.push('\0');
	out
}

/// Parse one frame from wire text.
///
/// Returns `Ok(None)` for heartbeats. Trailing EOLs after the NUL terminator
/// are permitted; anything else after it is ignored.
pub fn decode(input: &str) -> Result<Option<Frame>> {
	let input = input.trim_start_matches(['\r', '\n']);
	if input.is_empty() {
		return Ok(None);
	}

	let (command_line, mut rest) = split_line(input).ok_or(Error::UnterminatedHeaders)?;
	let command: Command = command_line.parse()?;
	let unescape = command.escapes_headers();

	let mut headers = Vec::new();
	loop {
		let (line, tail) = split_line(rest).ok_or(Error::UnterminatedHeaders)?;
		rest = tail;
		if line.is_empty() {
			break;
		}
		let (name, value) = line.split_once(':').ok_or_else(|| Error::MalformedHeader(line.to_owned()))?;
		if unescape {
			headers.push((unescape_header(name)?, unescape_header(value)?));
		} else {
			headers.push((name.to_owned(), value.to_owned()));
		}
	}

	let declared = headers
		.iter()
		.find(|(k, _)| k == header::CONTENT_LENGTH)
		.map(|(_, v)| v.trim().parse::<usize>().map_err(|_| Error::InvalidContentLength(v.clone())))
		.transpose()?;

	let body = match declared {
		Some(len) => {
			let bytes = rest.as_bytes();
			if bytes.len() < len {
				return Err(Error::TruncatedBody {
					declared: len,
					actual: bytes.len(),
				});
			}
			if bytes.get(len) != Some(&0) {
				return Err(Error::MissingNul);
			}
			rest.get(..len).ok_or(Error::MissingNul)?.to_owned()
		}
		None => {
			let end = rest.find('\0').ok_or(Error::MissingNul)?;
			rest[..end].to_owned()
		}
	};

	Ok(Some(Frame { command, headers, body }))
}

/// Split off one line, accepting `\n` or `\r\n`.
fn split_line(input: &str) -> Option<(&str, &str)> {
	let idx = input.find('\n')?;
	let line = &input[..idx];
	Some((line.strip_suffix('\r').unwrap_or(line), &input[idx + 1..]))
}

fn push_escaped(out: &mut String, raw: &str) {
	for ch in raw.chars() {
		match ch {
			'\\' => out.push_str("\\\\"),
			'\n' => out.push_str("\\n"),
			'\r' => out.push_str("\\r"),
			':' => out.push_str("\\c"),
			other => out.push(other),
		}
	}
}

fn unescape_header(raw: &str) -> Result<String> {
	let mut out = String::with_capacity(raw.len());
	let mut chars = raw.chars();
	while let Some(ch) = chars.next() {
		if ch != '\\' {
			out.push(ch);
			continue;
		}
		match chars.next() {
			Some('\\') => out.push('\\'),
			Some('n') => out.push('\n'),
			Some('r') => out.push('\r'),
			Some('c') => out.push(':'),
			Some(other) => return Err(Error::InvalidEscape(other)),
			None => return Err(Error::InvalidEscape(' ')),
		}
	}
	Ok(out)
}
