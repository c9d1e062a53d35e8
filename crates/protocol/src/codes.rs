//! The fixed response-code table.
//!
//! Every key is a three-digit code paired with a default message. The
//! table is immutable for the lifetime of the process: it is expressed as
//! a `const fn` match rather than a lazily built map, so there is nothing
//! to initialize and nothing for two threads to race over.

use std::fmt;

/// A symbolic response code from the fixed table.
///
/// `Display` renders the three-digit numeric form; [`ResponseCode::default_message`]
/// returns the canned message used when a caller does not supply its own text.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    /// `220` — service ready, sent once per accepted connection.
    Ready,
    /// `221` — service closing the connection (`QUIT`, idle eviction, shutdown).
    Goodbye,
    /// `226` — upload transfer completed and renamed successfully.
    FileStatusOk,
    /// `200` — generic success, optionally carrying a payload.
    CmdOk,
    /// `150` — about to begin a transfer (precedes a `GET` body or a `PUT` ready signal).
    EnteringTransfer,
    /// `500` — command unrecognized.
    SyntaxError,
    /// `501` — command recognized but missing a required argument.
    SyntaxErrorParam,
    /// `502` — command recognized but not implemented.
    NotImplemented,
    /// `503` — command arrived out of the sequence the protocol requires.
    BadSequence,
    /// `550` — target unavailable: missing, a directory, a name collision, or permission denied.
    FileUnavailable,
    /// `451` — local server error encountered while a transfer was in progress.
    LocalError,
}

impl ResponseCode {
    /// The three-digit numeric code.
    #[must_use]
    pub const fn code(self) -> u16 {
        match self {
            Self::Ready => 220,
            Self::Goodbye => 221,
            Self::FileStatusOk => 226,
            Self::CmdOk => 200,
            Self::EnteringTransfer => 150,
            Self::SyntaxError => 500,
            Self::SyntaxErrorParam => 501,
            Self::NotImplemented => 502,
            Self::BadSequence => 503,
            Self::FileUnavailable => 550,
            Self::LocalError => 451,
        }
    }

    /// The canned message used when no caller-supplied text is given.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::Ready => "Service ready",
            Self::Goodbye => "Service closing connection",
            Self::FileStatusOk => "Closing connection, transfer successful",
            Self::CmdOk => "Command OK",
            Self::EnteringTransfer => "About to begin transfer",
            Self::SyntaxError => "Syntax error, command unrecognized",
            Self::SyntaxErrorParam => "Syntax error in parameters or arguments",
            Self::NotImplemented => "Command not implemented",
            Self::BadSequence => "Bad sequence of commands",
            Self::FileUnavailable => "File unavailable",
            Self::LocalError => "Local error in processing",
        }
    }

    /// Returns the code in the `2xx` / `5xx` success-or-error family.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.code() < 400
    }

    /// Parses a known three-digit code back into its symbolic form.
    ///
    /// Returns `None` for codes outside this table — the table only models
    /// the codes this protocol actually emits, not the full FTP code space.
    #[must_use]
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            220 => Some(Self::Ready),
            221 => Some(Self::Goodbye),
            226 => Some(Self::FileStatusOk),
            200 => Some(Self::CmdOk),
            150 => Some(Self::EnteringTransfer),
            500 => Some(Self::SyntaxError),
            501 => Some(Self::SyntaxErrorParam),
            502 => Some(Self::NotImplemented),
            503 => Some(Self::BadSequence),
            550 => Some(Self::FileUnavailable),
            451 => Some(Self::LocalError),
            _ => None,
        }
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
