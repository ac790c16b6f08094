//! Error types for report encoding and decoding.

use std::fmt;

use thiserror::Error;

/// Section of a report message, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportSection {
    /// Per-frame interval durations.
    IntervalDurations,
    /// Cumulative increment durations.
    IncrementDurations,
    /// Per-frame occurrence counts.
    Counts,
    /// Cumulative memory usage deltas.
    MemoryUsages,
}

impl ReportSection {
    /// Get a display name for this section.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::IntervalDurations => "interval durations",
            Self::IncrementDurations => "increment durations",
            Self::Counts => "counts",
            Self::MemoryUsages => "memory usages",
        }
    }
}

impl fmt::Display for ReportSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors produced while writing or reading a report message.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The output stream rejected a write.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A value could not be encoded.
    #[error("Encode error: {0}")]
    Encode(bincode::Error),

    /// The message is truncated or contains an invalid value.
    #[error("Malformed report: {0}")]
    Decode(bincode::Error),

    /// An entry count field is negative.
    #[error("Invalid entry count for {section}: {count}")]
    InvalidCount {
        /// Section the count belongs to.
        section: ReportSection,
        /// Count read from the stream.
        count: i32,
    },

    /// A section holds more entries than an `int32` count can describe.
    #[error("Too many entries for {section}: {len}")]
    TooManyEntries {
        /// Section being written.
        section: ReportSection,
        /// Number of entries in the section.
        len: usize,
    },
}

impl ReportError {
    /// Classify an error raised while encoding, keeping stream failures as `Io`.
    pub(crate) fn from_encode(err: bincode::Error) -> Self {
        match *err {
            bincode::ErrorKind::Io(io) => Self::Io(io),
            other => Self::Encode(Box::new(other)),
        }
    }
}

/// Result type alias using [`ReportError`].
pub type Result<T> = std::result::Result<T, ReportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_count_display() {
        let err = ReportError::InvalidCount {
            section: ReportSection::Counts,
            count: -3,
        };
        assert_eq!(err.to_string(), "Invalid entry count for counts: -3");
    }

    #[test]
    fn encode_io_failures_stay_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err = ReportError::from_encode(Box::new(bincode::ErrorKind::Io(io)));
        assert!(matches!(err, ReportError::Io(ref e) if e.kind() == std::io::ErrorKind::BrokenPipe));

        let err = ReportError::from_encode(Box::new(bincode::ErrorKind::SizeLimit));
        assert!(matches!(err, ReportError::Encode(_)));
    }
}
