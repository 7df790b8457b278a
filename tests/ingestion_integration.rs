//! Ingestion Integration Tests
//!
//! Drives `FrameIngestor` end to end against `InMemoryFrameStore` with a
//! frozen clock: single frames, batch splitting, timestamp inference, fault
//! isolation, storage failures, and cancellation.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use plantar_sentinel::analysis::{calculate_peak_pressure, PressureGrid};
use plantar_sentinel::config::ThresholdConfig;
use plantar_sentinel::{
    Alert, AlertStatus, BatchStatus, EngineConfig, FixedClock, Frame, FrameIngestor, FrameStore,
    InMemoryFrameStore, IngestError, PatientId, PersistenceError, RiskLevel,
};
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

fn setup() -> (Arc<InMemoryFrameStore>, FrameIngestor) {
    let store = Arc::new(InMemoryFrameStore::new());
    let ingestor = FrameIngestor::with_clock(
        store.clone(),
        Arc::new(EngineConfig::default()),
        Arc::new(FixedClock(now())),
    );
    (store, ingestor)
}

fn render(cells: &[Vec<i32>]) -> String {
    cells
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect::<Vec<_>>().join(","))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 32x32 grid with a `side` x `side` block of `value` anchored at (2, 2).
fn block_frame(side: usize, value: i32) -> String {
    let mut cells = vec![vec![0; 32]; 32];
    for row in cells.iter_mut().skip(2).take(side) {
        for cell in row.iter_mut().skip(2).take(side) {
            *cell = value;
        }
    }
    render(&cells)
}

// ============================================================================
// Single frame
// ============================================================================

#[tokio::test]
async fn isolated_spike_is_filtered_but_counts_as_contact() {
    let (store, ingestor) = setup();
    let mut cells = vec![vec![0; 32]; 32];
    cells[16][16] = 250;

    let frame = ingestor
        .process_frame(&PatientId::new("p1"), &render(&cells), None)
        .await
        .unwrap();

    assert_eq!(frame.peak_pressure_index, 0.0);
    assert_eq!(frame.risk_level, RiskLevel::Low);
    assert!((frame.contact_area_percent - 0.1).abs() < 1e-9);
    assert_eq!(store.alert_count(), 0);
}

#[tokio::test]
async fn every_risk_band_alerts_only_from_high() {
    let (store, ingestor) = setup();
    let patient = PatientId::new("p1");

    let cases = [
        (30, RiskLevel::Low),
        (45, RiskLevel::Medium),
        (60, RiskLevel::High),
        (75, RiskLevel::Critical),
    ];
    for (value, expected) in cases {
        let frame = ingestor
            .process_frame(&patient, &block_frame(4, value), None)
            .await
            .unwrap();
        assert_eq!(frame.risk_level, expected, "peak {value}");
        assert_eq!(frame.is_flagged_for_review, expected >= RiskLevel::High);
    }

    let alerts = store.all_alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.status == AlertStatus::New));
    assert!(alerts.iter().all(|a| a.clinician_notes.is_none() && a.resolved_at.is_none()));
    assert_eq!(alerts[0].risk_level, RiskLevel::High);
    assert_eq!(alerts[1].risk_level, RiskLevel::Critical);
}

#[tokio::test]
async fn noise_area_boundary_uses_configured_minimum() {
    let (_, ingestor) = setup();
    let patient = PatientId::new("p1");

    // 3x3 = 9 cells, one short of the default minimum area of 10
    let small = ingestor.process_frame(&patient, &block_frame(3, 90), None).await.unwrap();
    assert_eq!(small.peak_pressure_index, 0.0);

    let mut cells = vec![vec![0; 32]; 32];
    for c in 0..10 {
        cells[5][c] = 90;
    }
    let line = ingestor.process_frame(&patient, &render(&cells), None).await.unwrap();
    assert_eq!(line.peak_pressure_index, 90.0);
    assert_eq!(line.risk_level, RiskLevel::Critical);
}

#[tokio::test]
async fn lenient_cells_read_as_zero() {
    let (_, ingestor) = setup();
    let text = block_frame(4, 62).replacen("62", "n/a", 1);

    let frame = ingestor
        .process_frame(&PatientId::new("p1"), &text, None)
        .await
        .unwrap();
    // 15 cells remain connected, peak unchanged
    assert_eq!(frame.peak_pressure_index, 62.0);
}

#[tokio::test]
async fn wrong_shape_is_rejected_and_nothing_persisted() {
    let (store, ingestor) = setup();
    let mut text = block_frame(4, 62);
    text.push_str(",0");

    let err = ingestor
        .process_frame(&PatientId::new("p1"), &text, None)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Parse(_)));
    assert_eq!(store.frame_count(), 0);
}

// ============================================================================
// Batch
// ============================================================================

#[tokio::test]
async fn batch_frames_are_spaced_from_filename_timestamp() {
    let (store, ingestor) = setup();
    let patient = PatientId::new("p2");
    let content = [block_frame(4, 20), block_frame(4, 61), block_frame(4, 80)].join("\n\n");

    let result = ingestor
        .process_batch(&patient, "frame_20240115120000.csv", &content, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, BatchStatus::Completed);
    assert_eq!(result.frames_detected, 3);
    assert_eq!(result.frames_processed, 3);
    assert_eq!(result.alerts_raised, 2);
    assert!(result.errors.is_empty());

    let base = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
    assert_eq!(result.base_timestamp, base);

    let mut frames = store.list_frames(&patient, None, 10).await.unwrap();
    frames.reverse();
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame.timestamp, base + Duration::seconds(5 * i as i64));
        assert_eq!(frame.id, result.frame_ids[i]);
    }
}

#[tokio::test]
async fn batch_without_timestamp_in_name_uses_clock() {
    let (_, ingestor) = setup();
    let result = ingestor
        .process_batch(
            &PatientId::new("p2"),
            "frame.csv",
            &block_frame(4, 20),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(result.base_timestamp, now());
    assert_eq!(result.uploaded_at, now());
}

#[tokio::test]
async fn malformed_block_is_isolated() {
    let (store, ingestor) = setup();
    let mut bad = block_frame(4, 20);
    bad = bad.replacen("0,0,0", "0,0", 1);
    let content = [block_frame(4, 20), bad, block_frame(4, 70)].join("\n\n");

    let result = ingestor
        .process_batch(&PatientId::new("p3"), "upload.csv", &content, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, BatchStatus::CompletedWithErrors);
    assert_eq!(result.frames_processed, 2);
    assert_eq!(result.errors.len(), 1);
    assert!(result.errors[0].starts_with("Frame 2: "), "{}", result.errors[0]);
    assert_eq!(result.alerts_raised, 1);
    assert_eq!(store.frame_count(), 2);
}

#[tokio::test]
async fn batch_where_every_frame_fails_is_failed() {
    let (_, ingestor) = setup();
    let bad = block_frame(4, 20).replacen("0,0,0", "0,0", 1);
    let content = [bad.clone(), bad].join("\n\n");

    let result = ingestor
        .process_batch(&PatientId::new("p3"), "upload.csv", &content, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, BatchStatus::Failed);
    assert_eq!(result.frames_processed, 0);
    assert_eq!(result.errors.len(), 2);
}

#[tokio::test]
async fn empty_and_frameless_uploads_are_errors() {
    let (_, ingestor) = setup();
    let patient = PatientId::new("p4");
    let token = CancellationToken::new();

    let err = ingestor.process_batch(&patient, "a.csv", " \r\n ", &token).await.unwrap_err();
    assert!(matches!(err, IngestError::EmptyUpload));
    assert_eq!(err.to_string(), "File was empty.");

    let partial: String = block_frame(4, 20).lines().take(31).collect::<Vec<_>>().join("\n");
    let err = ingestor.process_batch(&patient, "a.csv", &partial, &token).await.unwrap_err();
    assert!(matches!(err, IngestError::NoFramesDetected { size: 32 }));
}

#[tokio::test]
async fn cancelled_batch_stops_before_next_frame() {
    let (store, ingestor) = setup();
    let token = CancellationToken::new();
    token.cancel();

    let content = [block_frame(4, 20), block_frame(4, 20)].join("\n");
    let result = ingestor
        .process_batch(&PatientId::new("p5"), "upload.csv", &content, &token)
        .await
        .unwrap();

    assert!(result.cancelled);
    assert_eq!(result.frames_processed, 0);
    assert_eq!(result.status, BatchStatus::Failed);
    assert_eq!(result.errors, vec!["Cancelled before frame 1".to_string()]);
    assert_eq!(store.frame_count(), 0);
}

// ============================================================================
// Storage failures
// ============================================================================

/// Delegates to an in-memory store but fails the `fail_on`-th save (1-based).
struct FailingStore {
    inner: InMemoryFrameStore,
    saves: AtomicUsize,
    fail_on: usize,
}

impl FailingStore {
    fn new(fail_on: usize) -> Self {
        Self {
            inner: InMemoryFrameStore::new(),
            saves: AtomicUsize::new(0),
            fail_on,
        }
    }
}

#[async_trait]
impl FrameStore for FailingStore {
    async fn save(&self, frame: &Frame, alert: Option<&Alert>) -> Result<Frame, PersistenceError> {
        if self.saves.fetch_add(1, Ordering::SeqCst) + 1 == self.fail_on {
            return Err(PersistenceError::Storage("disk full".to_string()));
        }
        self.inner.save(frame, alert).await
    }

    async fn get_frame(&self, id: Uuid) -> Result<Option<Frame>, PersistenceError> {
        self.inner.get_frame(id).await
    }

    async fn list_frames(
        &self,
        patient_id: &PatientId,
        since: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<Vec<Frame>, PersistenceError> {
        self.inner.list_frames(patient_id, since, limit).await
    }

    async fn list_alerts(&self, patient_id: &PatientId) -> Result<Vec<Alert>, PersistenceError> {
        self.inner.list_alerts(patient_id).await
    }

    fn backend_name(&self) -> &'static str {
        "Failing"
    }
}

fn failing_setup(fail_on: usize) -> (Arc<FailingStore>, FrameIngestor) {
    let store = Arc::new(FailingStore::new(fail_on));
    let ingestor = FrameIngestor::with_clock(
        store.clone(),
        Arc::new(EngineConfig::default()),
        Arc::new(FixedClock(now())),
    );
    (store, ingestor)
}

#[tokio::test]
async fn storage_failure_surfaces_from_single_frame() {
    let (store, ingestor) = failing_setup(1);

    let err = ingestor
        .process_frame(&PatientId::new("p6"), &block_frame(4, 90), None)
        .await
        .unwrap_err();

    assert!(matches!(err, IngestError::Persist(PersistenceError::Storage(_))), "{err:?}");
    assert_eq!(err.to_string(), "persistence failed: storage error: disk full");
    assert_eq!(store.inner.frame_count(), 0);
    assert_eq!(store.inner.alert_count(), 0);
}

#[tokio::test]
async fn batch_records_storage_failure_and_continues() {
    let (store, ingestor) = failing_setup(2);
    let patient = PatientId::new("p6");
    let content = [block_frame(4, 90), block_frame(4, 85), block_frame(4, 80)].join("\n\n");

    let result = ingestor
        .process_batch(&patient, "upload.csv", &content, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(result.status, BatchStatus::CompletedWithErrors);
    assert_eq!(result.frames_processed, 2);
    assert_eq!(result.alerts_raised, 2);
    assert_eq!(
        result.errors,
        vec!["Frame 2: persistence failed: storage error: disk full".to_string()]
    );

    // The failed frame and its alert never reached the store
    assert_eq!(store.inner.frame_count(), 2);
    assert_eq!(store.inner.alert_count(), 2);
    let stored = store.list_frames(&patient, None, 10).await.unwrap();
    assert!(stored.iter().all(|f| f.peak_pressure_index != 85.0));
    assert!(store
        .inner
        .all_alerts()
        .iter()
        .all(|a| stored.iter().any(|f| f.id == a.frame_id)));
}

// ============================================================================
// Properties over random grids
// ============================================================================

#[test]
fn peak_never_exceeds_raw_maximum() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(0x5eed);
    let thresholds = ThresholdConfig::default();

    for _ in 0..200 {
        let mut grid = PressureGrid::zeros(32);
        let density: f64 = rng.gen_range(0.05..0.6);
        for r in 0..32 {
            for c in 0..32 {
                if rng.gen_bool(density) {
                    grid.set(r, c, rng.gen_range(1..=255));
                }
            }
        }

        let peak = calculate_peak_pressure(&grid, thresholds.min_pixel_area_for_alert);
        assert!(peak >= 0.0);
        assert!(peak <= f64::from(grid.raw_max()));
    }
}

#[test]
fn peak_equals_maximum_when_it_sits_in_a_large_region() {
    let mut rng = rand::rngs::StdRng::seed_from_u64(42);

    for _ in 0..50 {
        let mut grid = PressureGrid::zeros(32);
        // Solid 5x5 block guarantees one region above the minimum area
        let top = rng.gen_range(0..27);
        let left = rng.gen_range(0..27);
        let max = rng.gen_range(100..=255);
        for r in top..top + 5 {
            for c in left..left + 5 {
                grid.set(r, c, rng.gen_range(1..100));
            }
        }
        grid.set(top + 2, left + 2, max);

        assert_eq!(calculate_peak_pressure(&grid, 10), f64::from(max));
    }
}
