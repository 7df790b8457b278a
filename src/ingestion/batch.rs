//! Multi-frame uploads
//!
//! A device export holds frames back to back, optionally separated by blank
//! lines. Frames carry no timestamps of their own, so frame `i` (0-based) is
//! stamped `base + i * frame_spacing_secs`, where `base` comes from the
//! digits in the file name when they form a date.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Timelike, Utc};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::pipeline::{FrameIngestor, IngestError};
use crate::types::{BatchStatus, BatchUploadResult, PatientId};

/// Date layouts tried against the leading file name digits, most precise first.
const TIMESTAMP_LAYOUTS: [(&str, usize); 2] = [("%Y%m%d%H%M%S", 14), ("%Y%m%d%H%M", 12)];
const DATE_LAYOUT: (&str, usize) = ("%Y%m%d", 8);

/// Split an upload into `size`-line frame payloads.
///
/// Lines are trimmed. A blank line ends the current block, and a block is
/// emitted only when it holds exactly `size` lines, so partial blocks are
/// dropped wherever they occur.
pub fn split_frames(content: &str, size: usize) -> Vec<String> {
    let normalized = content.replace("\r\n", "\n");
    let mut frames = Vec::new();
    let mut buffer: Vec<&str> = Vec::with_capacity(size);

    for line in normalized.split('\n') {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut buffer, size, &mut frames);
            continue;
        }

        buffer.push(line);
        if buffer.len() == size {
            flush(&mut buffer, size, &mut frames);
        }
    }
    flush(&mut buffer, size, &mut frames);

    frames
}

fn flush(buffer: &mut Vec<&str>, size: usize, frames: &mut Vec<String>) {
    if size > 0 && buffer.len() == size {
        frames.push(buffer.join("\n"));
    }
    buffer.clear();
}

/// Infer a UTC base timestamp from the digits of a file name's stem.
///
/// `frame_20240115120000.csv` gives 2024-01-15T12:00:00Z. Returns `None`
/// when no layout matches.
pub fn infer_base_timestamp(file_name: &str) -> Option<DateTime<Utc>> {
    let stem = Path::new(file_name).file_stem()?.to_str()?;
    let digits: String = stem.chars().filter(char::is_ascii_digit).collect();

    for (layout, len) in TIMESTAMP_LAYOUTS {
        if digits.len() >= len {
            match NaiveDateTime::parse_from_str(&digits[..len], layout) {
                // `%S` accepts 60 as a leap second; treat it as a miss
                Ok(ts) if ts.nanosecond() < 1_000_000_000 => return Some(ts.and_utc()),
                _ => {}
            }
        }
    }

    let (layout, len) = DATE_LAYOUT;
    if digits.len() >= len {
        if let Ok(date) = NaiveDate::parse_from_str(&digits[..len], layout) {
            return date.and_hms_opt(0, 0, 0).map(|ts| ts.and_utc());
        }
    }

    None
}

fn frame_timestamp(base: DateTime<Utc>, index: usize, spacing_secs: u64) -> Option<DateTime<Utc>> {
    let offset = u64::try_from(index).ok()?.checked_mul(spacing_secs)?;
    let offset = Duration::try_seconds(i64::try_from(offset).ok()?)?;
    base.checked_add_signed(offset)
}

impl FrameIngestor {
    /// Ingest every complete frame in an upload.
    ///
    /// Frames run strictly in order and each one is isolated: a failure is
    /// recorded as `"Frame {n}: {error}"` and the next frame proceeds. Only
    /// whole-upload problems return `Err`. Cancellation is honoured between
    /// frames; frames already stored stay stored.
    pub async fn process_batch(
        &self,
        patient_id: &PatientId,
        file_name: &str,
        content: &str,
        cancel: &CancellationToken,
    ) -> Result<BatchUploadResult, IngestError> {
        if content.trim().is_empty() {
            return Err(IngestError::EmptyUpload);
        }

        let size = self.config.grid.size;
        let payloads = split_frames(content, size);
        if payloads.is_empty() {
            return Err(IngestError::NoFramesDetected { size });
        }

        let uploaded_at = self.clock.now();
        let base_timestamp = infer_base_timestamp(file_name).unwrap_or(uploaded_at);
        let spacing = self.config.batch.frame_spacing_secs;

        info!(
            patient = %patient_id,
            file = file_name,
            frames = payloads.len(),
            base = %base_timestamp,
            "Processing batch upload"
        );

        let mut result = BatchUploadResult {
            file_name: file_name.to_string(),
            frames_detected: payloads.len(),
            frames_processed: 0,
            alerts_raised: 0,
            status: BatchStatus::Failed,
            uploaded_at,
            base_timestamp,
            frame_ids: Vec::with_capacity(payloads.len()),
            errors: Vec::new(),
            cancelled: false,
        };

        for (index, raw) in payloads.iter().enumerate() {
            let number = index + 1;

            if cancel.is_cancelled() {
                warn!(file = file_name, frame = number, "Batch cancelled");
                result.errors.push(format!("Cancelled before frame {number}"));
                result.cancelled = true;
                break;
            }

            let Some(timestamp) = frame_timestamp(base_timestamp, index, spacing) else {
                warn!(file = file_name, frame = number, "Frame timestamp out of range");
                result.errors.push(format!("Frame {number}: timestamp out of range"));
                continue;
            };

            match self.process_frame(patient_id, raw, Some(timestamp)).await {
                Ok(frame) => {
                    result.frames_processed += 1;
                    if frame.is_flagged_for_review {
                        result.alerts_raised += 1;
                    }
                    result.frame_ids.push(frame.id);
                }
                Err(e) => {
                    warn!(frame = number, file = file_name, error = %e, "Frame rejected");
                    result.errors.push(format!("Frame {number}: {e}"));
                }
            }
        }

        result.status = BatchStatus::from_counts(result.frames_processed, result.errors.len());

        info!(
            file = file_name,
            status = %result.status,
            processed = result.frames_processed,
            failed = result.errors.len(),
            alerts = result.alerts_raised,
            "Batch upload finished"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn block(size: usize, fill: &str) -> String {
        vec![vec![fill; size].join(","); size].join("\n")
    }

    #[test]
    fn test_split_back_to_back_and_blank_separated() {
        let text = format!("{}\n{}\n\n{}", block(3, "1"), block(3, "2"), block(3, "3"));
        let frames = split_frames(&text, 3);
        assert_eq!(frames.len(), 3);
        assert!(frames[0].starts_with("1,1,1"));
        assert!(frames[2].starts_with("3,3,3"));
    }

    #[test]
    fn test_split_drops_partial_blocks() {
        let text = format!("9,9,9\n9,9,9\n\n{}\n\n4,4,4", block(3, "1"));
        let frames = split_frames(&text, 3);
        assert_eq!(frames, vec![block(3, "1")]);
    }

    #[test]
    fn test_split_normalizes_crlf_and_trims() {
        let text = "  1,2\r\n3,4  \r\n\r\n5,6\r\n7,8\r\n";
        assert_eq!(split_frames(text, 2), vec!["1,2\n3,4", "5,6\n7,8"]);
    }

    #[test]
    fn test_split_nothing_complete() {
        assert!(split_frames("1,2\n\n3,4", 2).is_empty());
        assert!(split_frames("", 2).is_empty());
    }

    #[test]
    fn test_infer_full_timestamp() {
        assert_eq!(
            infer_base_timestamp("frame_20240115120000.csv"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_infer_minute_and_date_precision() {
        assert_eq!(
            infer_base_timestamp("scan-202401151230.txt"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap())
        );
        assert_eq!(
            infer_base_timestamp("left_foot_2024-01-15.csv"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_infer_ignores_extension_digits() {
        assert_eq!(infer_base_timestamp("frame.csv"), None);
        assert_eq!(infer_base_timestamp("frame.2024011512"), None);
    }

    #[test]
    fn test_infer_falls_back_to_shorter_layout() {
        // Month 13 breaks every layout
        assert_eq!(infer_base_timestamp("20241315120000.csv"), None);
        // Seconds of 99 only break the full layout
        assert_eq!(
            infer_base_timestamp("20240115123099.csv"),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap())
        );
        // Leap second 60 is not a valid full timestamp either
        let ts = infer_base_timestamp("frame_20240115235960.csv").unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 15, 23, 59, 0).unwrap());
        assert!(ts.nanosecond() < 1_000_000_000);
    }

    #[test]
    fn test_frame_timestamp_spacing() {
        let base = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        assert_eq!(frame_timestamp(base, 0, 5), Some(base));
        assert_eq!(
            frame_timestamp(base, 3, 5),
            Some(Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 15).unwrap())
        );
        assert_eq!(frame_timestamp(base, usize::MAX, u64::MAX), None);
    }
}
