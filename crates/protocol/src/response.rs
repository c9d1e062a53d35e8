//! Text response rendering.
//!
//! The original implementation this protocol is modeled on had a bug where
//! the three-digit-prefix check in its response formatter was always true,
//! causing the code to be concatenated twice down some paths. This crate
//! has exactly one rendering path — [`Response::render`] — so there is no
//! buggy branch to accidentally take.

use crate::codes::ResponseCode;

/// A response line plus optional detail lines, ready to be written to the wire.
///
/// Renders as `CODE SP TEXT CRLF [DETAIL-LINE CRLF]*` with no intermediate
/// blank lines, per the wire protocol.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    code: ResponseCode,
    text: String,
    detail_lines: Vec<String>,
}

impl Response {
    /// Builds a response using the code's default message.
    #[must_use]
    pub fn new(code: ResponseCode) -> Self {
        Self {
            code,
            text: code.default_message().to_owned(),
            detail_lines: Vec::new(),
        }
    }

    /// Overrides the default message text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Appends a CRLF-delimited detail line to the payload.
    #[must_use]
    pub fn with_detail(mut self, line: impl Into<String>) -> Self {
        self.detail_lines.push(line.into());
        self
    }

    /// Appends multiple detail lines at once.
    #[must_use]
    pub fn with_details<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.detail_lines.extend(lines.into_iter().map(Into::into));
        self
    }

    /// The response code this line carries.
    #[must_use]
    pub const fn code(&self) -> ResponseCode {
        self.code
    }

    /// Renders the full wire form: status line, then detail lines, each CRLF-terminated.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(self.text.len() + 8);
        out.push_str(&self.code.code().to_string());
        out.push(' ');
        out.push_str(&self.text);
        out.push_str("\r\n");
        for line in &self.detail_lines {
            out.push_str(line);
            out.push_str("\r\n");
        }
        out
    }
}

impl From<ResponseCode> for Response {
    fn from(code: ResponseCode) -> Self {
        Self::new(code)
    }
}
