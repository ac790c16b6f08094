//! Binary wire format for frame reports.
//!
//! Fields are written back to back with no framing:
//!
//! ```text
//! bool    monitoringEnabled
//! -- if false: END
//! bool    true
//! int32   n { string label; float64 msPerFrame }                    (interval durations)
//! int32   n { string label; float64 totalMs }                       (increment durations)
//! int32   n { string label; int32 countPerFrame }                   (counts)
//! int32   n { string label; int64 allocated; int64 reserved; int64 unusedReserved }
//! ```
//!
//! Every field uses bincode's fixed-width little-endian encoding: a bool is one
//! byte and a string is a `u64` byte length followed by UTF-8 bytes.

use std::io::{Read, Write};

use bincode::Options;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ReportError, ReportSection, Result};
use crate::memory::MemoryUsage;
use crate::report::FrameReport;

/// Upper bound on the encoded size of a single field, including labels.
///
/// Applied on both sides, so anything the writer accepts the parser accepts.
pub const MAX_FIELD_BYTES: u64 = 64 * 1024;

/// Cap on capacity reserved up front from an untrusted count.
const MAX_PREALLOCATED_ENTRIES: usize = 1024;

fn wire_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .allow_trailing_bytes()
}

fn put<W: Write, T: Serialize + ?Sized>(writer: &mut W, value: &T) -> Result<()> {
    wire_options()
        .with_limit(MAX_FIELD_BYTES)
        .serialize_into(&mut *writer, value)
        .map_err(ReportError::from_encode)
}

fn take<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    wire_options()
        .with_limit(MAX_FIELD_BYTES)
        .deserialize_from(&mut *reader)
        .map_err(ReportError::Decode)
}

fn put_count<W: Write>(writer: &mut W, section: ReportSection, len: usize) -> Result<()> {
    let count = i32::try_from(len).map_err(|_| ReportError::TooManyEntries { section, len })?;
    put(writer, &count)
}

fn take_count<R: Read>(reader: &mut R, section: ReportSection) -> Result<usize> {
    let count: i32 = take(reader)?;
    usize::try_from(count).map_err(|_| ReportError::InvalidCount { section, count })
}

fn take_entries<R: Read, T>(
    reader: &mut R,
    section: ReportSection,
    mut read_value: impl FnMut(&mut R) -> Result<T>,
) -> Result<Vec<(String, T)>> {
    let count = take_count(reader, section)?;
    let mut entries = Vec::with_capacity(count.min(MAX_PREALLOCATED_ENTRIES));
    for _ in 0..count {
        let label: String = take(&mut *reader)?;
        let value = read_value(&mut *reader)?;
        entries.push((label, value));
    }
    Ok(entries)
}

/// Encode a report to `writer`.
///
/// A disabled report is a single `false` byte.
pub fn write_report<W: Write>(writer: &mut W, report: &FrameReport) -> Result<()> {
    put(writer, &report.performance_monitoring_enabled)?;
    if !report.performance_monitoring_enabled {
        return Ok(());
    }
    put(writer, &true)?;

    put_count(writer, ReportSection::IntervalDurations, report.interval_durations.len())?;
    for (label, ms_per_frame) in &report.interval_durations {
        put(writer, label.as_str())?;
        put(writer, ms_per_frame)?;
    }

    put_count(writer, ReportSection::IncrementDurations, report.increment_durations.len())?;
    for (label, total_ms) in &report.increment_durations {
        put(writer, label.as_str())?;
        put(writer, total_ms)?;
    }

    put_count(writer, ReportSection::Counts, report.counts.len())?;
    for (label, per_frame) in &report.counts {
        put(writer, label.as_str())?;
        put(writer, per_frame)?;
    }

    put_count(writer, ReportSection::MemoryUsages, report.memory_usages.len())?;
    for (label, usage) in &report.memory_usages {
        put(writer, label.as_str())?;
        put(writer, &usage.allocated_delta)?;
        put(writer, &usage.reserved_delta)?;
        put(writer, &usage.unused_reserved_delta)?;
    }

    Ok(())
}

/// Decode a report from `reader`.
///
/// A disabled report consumes exactly one byte. Truncated input, invalid
/// values and negative counts are errors; nothing is defaulted.
pub fn read_report<R: Read>(reader: &mut R) -> Result<FrameReport> {
    let enabled: bool = take(reader)?;
    if !enabled {
        return Ok(FrameReport::disabled());
    }
    // The writer repeats the flag; anything but `true` is malformed.
    let repeated: bool = take(reader)?;
    if !repeated {
        return Err(ReportError::Decode(Box::new(bincode::ErrorKind::Custom(
            "repeated monitoring flag is false".into(),
        ))));
    }

    let interval_durations = take_entries(reader, ReportSection::IntervalDurations, |r| take(r))?;
    let increment_durations =
        take_entries(reader, ReportSection::IncrementDurations, |r| take(r))?;
    let counts = take_entries(reader, ReportSection::Counts, |r| take(r))?;
    let memory_usages = take_entries(reader, ReportSection::MemoryUsages, |r| {
        Ok(MemoryUsage {
            allocated_delta: take(r)?,
            reserved_delta: take(r)?,
            unused_reserved_delta: take(r)?,
        })
    })?;

    Ok(FrameReport {
        performance_monitoring_enabled: true,
        interval_durations,
        increment_durations,
        counts,
        memory_usages,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn sample_report() -> FrameReport {
        FrameReport {
            performance_monitoring_enabled: true,
            interval_durations: vec![("Net.Send".into(), 1.25), ("Render.Cull".into(), 0.1)],
            increment_durations: vec![("Io.Load".into(), 1234.567)],
            counts: vec![("Render.Draw".into(), 42), ("Net.Recv".into(), 0)],
            memory_usages: vec![("Mem.Alloc".into(), MemoryUsage::new(1024, -4096, i64::MIN))],
        }
    }

    #[test]
    fn disabled_is_single_false_byte() {
        let mut buffer = Vec::new();
        write_report(&mut buffer, &FrameReport::disabled()).unwrap();
        assert_eq!(buffer, [0u8]);

        // Trailing bytes belong to the next message and must stay unread.
        buffer.extend_from_slice(&[0xAA, 0xBB]);
        let mut cursor = Cursor::new(buffer);
        let report = read_report(&mut cursor).unwrap();
        assert_eq!(report, FrameReport::disabled());
        assert_eq!(cursor.position(), 1);
    }

    #[test]
    fn layout_matches_wire_format() {
        let report = FrameReport {
            performance_monitoring_enabled: true,
            counts: vec![("A.B".into(), 7)],
            ..FrameReport::default()
        };
        let mut buffer = Vec::new();
        write_report(&mut buffer, &report).unwrap();

        let mut expected = vec![1u8, 1u8];
        expected.extend_from_slice(&0i32.to_le_bytes());
        expected.extend_from_slice(&0i32.to_le_bytes());
        expected.extend_from_slice(&1i32.to_le_bytes());
        expected.extend_from_slice(&3u64.to_le_bytes());
        expected.extend_from_slice(b"A.B");
        expected.extend_from_slice(&7i32.to_le_bytes());
        expected.extend_from_slice(&0i32.to_le_bytes());
        assert_eq!(buffer, expected);
    }

    #[test]
    fn roundtrip_is_bit_exact() {
        let report = sample_report();
        let mut buffer = Vec::new();
        write_report(&mut buffer, &report).unwrap();

        let decoded = read_report(&mut buffer.as_slice()).unwrap();
        assert_eq!(decoded, report);
        for ((_, a), (_, b)) in decoded
            .interval_durations
            .iter()
            .zip(&report.interval_durations)
        {
            assert_eq!(a.to_bits(), b.to_bits());
        }
    }

    #[test]
    fn consecutive_messages_share_a_stream() {
        let mut buffer = Vec::new();
        write_report(&mut buffer, &sample_report()).unwrap();
        write_report(&mut buffer, &FrameReport::disabled()).unwrap();

        let mut reader = buffer.as_slice();
        assert!(read_report(&mut reader).unwrap().performance_monitoring_enabled);
        assert!(!read_report(&mut reader).unwrap().performance_monitoring_enabled);
        assert!(reader.is_empty());
    }

    #[test]
    fn truncated_message_fails() {
        let mut buffer = Vec::new();
        write_report(&mut buffer, &sample_report()).unwrap();

        for cut in [1, 2, 5, buffer.len() / 2, buffer.len() - 1] {
            let result = read_report(&mut &buffer[..cut]);
            assert!(
                matches!(result, Err(ReportError::Decode(_))),
                "cut at {cut} gave {result:?}"
            );
        }
    }

    #[test]
    fn negative_count_fails() {
        let mut buffer = vec![1u8, 1u8];
        buffer.extend_from_slice(&(-1i32).to_le_bytes());

        let err = read_report(&mut buffer.as_slice()).unwrap_err();
        assert!(matches!(
            err,
            ReportError::InvalidCount {
                section: ReportSection::IntervalDurations,
                count: -1
            }
        ));
    }

    #[test]
    fn oversized_count_hits_end_of_stream() {
        let mut buffer = vec![1u8, 1u8];
        buffer.extend_from_slice(&i32::MAX.to_le_bytes());

        let err = read_report(&mut buffer.as_slice()).unwrap_err();
        assert!(matches!(err, ReportError::Decode(_)));
    }

    #[test]
    fn invalid_flag_byte_fails() {
        assert!(matches!(
            read_report(&mut [2u8].as_slice()),
            Err(ReportError::Decode(_))
        ));
        assert!(matches!(
            read_report(&mut [1u8, 0u8].as_slice()),
            Err(ReportError::Decode(_))
        ));
    }

    #[test]
    fn oversized_label_is_rejected() {
        let mut buffer = vec![1u8, 1u8];
        buffer.extend_from_slice(&1i32.to_le_bytes());
        buffer.extend_from_slice(&u64::MAX.to_le_bytes());

        assert!(matches!(
            read_report(&mut buffer.as_slice()),
            Err(ReportError::Decode(_))
        ));
    }

    #[test]
    fn label_limit_is_symmetric() {
        let limit = usize::try_from(MAX_FIELD_BYTES).unwrap();
        // A string field is its u64 length prefix plus the bytes.
        let longest = "L".repeat(limit - 8);
        let report = FrameReport {
            performance_monitoring_enabled: true,
            counts: vec![(longest.clone(), 1)],
            ..FrameReport::default()
        };
        let mut buffer = Vec::new();
        write_report(&mut buffer, &report).unwrap();
        assert_eq!(read_report(&mut buffer.as_slice()).unwrap(), report);

        let too_long = FrameReport {
            counts: vec![(format!("{longest}L"), 1)],
            ..report
        };
        let err = write_report(&mut Vec::new(), &too_long).unwrap_err();
        assert!(matches!(err, ReportError::Encode(_)), "got {err:?}");
    }

    #[test]
    fn write_failure_is_io() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
                Err(std::io::ErrorKind::BrokenPipe.into())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let err = write_report(&mut Closed, &sample_report()).unwrap_err();
        assert!(matches!(err, ReportError::Io(_)));
    }
}
