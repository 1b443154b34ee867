//! AT command replies
//!
//! Modems and radio modules attached to the UART answer every command with
//! zero or more data lines followed by a final result line.

/// Classification of a received line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AtReply {
    /// Final result: command accepted
    Ok,
    /// Final result: command rejected (`ERROR`, `+CME ERROR: n`, `+CMS ERROR: n`)
    Error,
    /// Anything else (data lines, unsolicited result codes)
    Data,
}

impl AtReply {
    /// Classify a line with its terminator already removed
    pub fn classify(line: &[u8]) -> Self {
        let line = line.trim_ascii();
        if line == b"OK" {
            AtReply::Ok
        } else if line == b"ERROR"
            || line.starts_with(b"+CME ERROR")
            || line.starts_with(b"+CMS ERROR")
        {
            AtReply::Error
        } else {
            AtReply::Data
        }
    }

    /// Check if this line ends the reply to a command
    pub fn is_final(&self) -> bool {
        matches!(self, AtReply::Ok | AtReply::Error)
    }
}
