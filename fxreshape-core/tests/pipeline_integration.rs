//! End-to-end tests: fetch into a temp archive dir, reshape, load, overlay.
//!
//! Archives are built at test time with the `zip` crate, in the same layout
//! the publisher uses: one text entry, a header line, then raw rows.

use chrono::{NaiveDate, NaiveDateTime};
use std::cell::RefCell;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use zip::write::SimpleFileOptions;

use fxreshape_core::data::{
    archive_file_name, fetch_missing, sync, ArchiveSource, FetchError, NoProgress, OverlayCache,
    ParseError, ReshapeError, Reshaper, SeriesCache,
};

const HEADER: &str = "<TICKER>,<DTYYYYMMDD>,<TIME>,<OPEN>,<HIGH>,<LOW>,<CLOSE>";

// ── Helpers ──────────────────────────────────────────────────────────

fn zip_bytes(date: NaiveDate, rows: &[String]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    zip.start_file(date.format("%d%m%y.txt").to_string(), SimpleFileOptions::default())
        .unwrap();
    writeln!(zip, "{HEADER}").unwrap();
    for row in rows {
        writeln!(zip, "{row}").unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn write_archive(dir: &Path, date: NaiveDate, rows: &[String]) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join(archive_file_name(date));
    std::fs::write(&path, zip_bytes(date, rows)).unwrap();
    path
}

fn row(ticker: &str, date: NaiveDate, hhmmss: &str, price: f64) -> String {
    format!(
        "{ticker},{},{hhmmss},{price},{price},{price},{price}",
        date.format("%Y%m%d")
    )
}

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2019, 11, d).unwrap()
}

fn at(date: NaiveDate, h: u32, m: u32) -> NaiveDateTime {
    date.and_hms_opt(h, m, 0).unwrap()
}

/// Publishes one EURUSD row at 00:00 for any day and records each request.
struct FakeSource {
    calls: RefCell<Vec<NaiveDate>>,
}

impl FakeSource {
    fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl ArchiveSource for FakeSource {
    fn name(&self) -> &str {
        "fake"
    }

    fn locate(&self, date: NaiveDate) -> String {
        format!("fake://{date}")
    }

    fn download(&self, date: NaiveDate, out: &mut dyn Write) -> Result<u64, FetchError> {
        self.calls.borrow_mut().push(date);
        let bytes = zip_bytes(date, &[row("EURUSD", date, "000000", 1.1)]);
        out.write_all(&bytes).map_err(|e| FetchError::Io {
            path: PathBuf::from(self.locate(date)),
            source: e,
        })?;
        Ok(bytes.len() as u64)
    }
}

// ── Fetch + reshape + load ───────────────────────────────────────────

#[test]
fn fetch_reshape_load_round() {
    let tmp = tempfile::tempdir().unwrap();
    let archive_dir = tmp.path().join("forexite");
    let csv_dir = tmp.path().join("csv");
    let source = FakeSource::new();

    let fetched = fetch_missing(&source, &archive_dir, day(4), 4, &NoProgress).unwrap();
    assert_eq!(fetched.fetched.len(), 3);
    assert_eq!(*source.calls.borrow(), vec![day(3), day(2), day(1)]);

    let summary = Reshaper::new(&archive_dir, &csv_dir)
        .reshape(&fetched.fetched, &NoProgress)
        .unwrap();
    assert_eq!(summary.archives, 3);
    assert_eq!(summary.rows_written, 3);
    assert_eq!(summary.instruments, vec!["EURUSD".to_string()]);

    let mut cache = SeriesCache::new(&csv_dir);
    let series = cache.load("EURUSD", None).unwrap().unwrap();
    let stamps: Vec<_> = series.bars().iter().map(|b| b.timestamp).collect();
    assert_eq!(
        stamps,
        vec![
            at(NaiveDate::from_ymd_opt(2019, 10, 31).unwrap(), 23, 0),
            at(day(1), 23, 0),
            at(day(2), 23, 0),
        ]
    );
}

#[test]
fn second_fetch_downloads_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let source = FakeSource::new();

    fetch_missing(&source, tmp.path(), day(10), 5, &NoProgress).unwrap();
    let first_calls = source.calls.borrow().len();
    assert_eq!(first_calls, 4);

    let again = fetch_missing(&source, tmp.path(), day(10), 5, &NoProgress).unwrap();
    assert!(again.fetched.is_empty());
    assert_eq!(again.skipped, 4);
    assert_eq!(source.calls.borrow().len(), first_calls);

    // Moving the window forward only fetches the new day.
    let next = fetch_missing(&source, tmp.path(), day(11), 5, &NoProgress).unwrap();
    assert_eq!(next.fetched, vec![tmp.path().join("2019-11-10.zip")]);
}

// ── Daily sync ───────────────────────────────────────────────────────

fn eurusd_lines(csv_dir: &Path) -> Vec<String> {
    std::fs::read_to_string(csv_dir.join("EURUSD.csv"))
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn consecutive_syncs_append_each_day_once() {
    let tmp = tempfile::tempdir().unwrap();
    let reshaper = Reshaper::new(tmp.path().join("forexite"), tmp.path().join("csv"));
    let source = FakeSource::new();

    let first = sync(&source, &reshaper, day(3), 3, &NoProgress).unwrap();
    assert_eq!(first.fetch.fetched.len(), 2);
    assert_eq!(first.reshape.archives, 2);

    let second = sync(&source, &reshaper, day(4), 3, &NoProgress).unwrap();
    assert_eq!(
        second.fetch.fetched,
        vec![reshaper.archive_dir().join("2019-11-03.zip")]
    );
    assert_eq!(second.reshape.archives, 1);
    assert_eq!(second.reshape.rows_written, 1);

    assert_eq!(
        eurusd_lines(reshaper.csv_dir()),
        vec![
            "2019-11-01 00:00:00, 1.1, 1.1, 1.1, 1.1",
            "2019-11-02 00:00:00, 1.1, 1.1, 1.1, 1.1",
            "2019-11-03 00:00:00, 1.1, 1.1, 1.1, 1.1",
        ]
    );
}

#[test]
fn sync_with_nothing_new_reshapes_local_archives() {
    let tmp = tempfile::tempdir().unwrap();
    let reshaper = Reshaper::new(tmp.path().join("forexite"), tmp.path().join("csv"));
    let source = FakeSource::new();

    sync(&source, &reshaper, day(4), 3, &NoProgress).unwrap();
    let calls = source.calls.borrow().len();

    let again = sync(&source, &reshaper, day(4), 3, &NoProgress).unwrap();
    assert_eq!(source.calls.borrow().len(), calls);
    assert!(again.fetch.fetched.is_empty());
    assert_eq!(again.fetch.skipped, 2);
    assert_eq!(again.reshape.archives, 2);
    assert_eq!(again.reshape.rows_written, 2);
    assert_eq!(eurusd_lines(reshaper.csv_dir()).len(), 4);
}

// ── Universe discovery ───────────────────────────────────────────────

#[test]
fn instruments_missing_from_newest_archive_get_no_file() {
    let tmp = tempfile::tempdir().unwrap();
    let archive_dir = tmp.path().join("forexite");
    let csv_dir = tmp.path().join("csv");

    write_archive(
        &archive_dir,
        day(1),
        &[
            row("EURUSD", day(1), "000000", 1.1),
            row("USDCHF", day(1), "000000", 0.99),
            row("USDCHF", day(1), "000100", 0.98),
        ],
    );
    write_archive(
        &archive_dir,
        day(4),
        &[
            row("EURUSD", day(4), "000000", 1.2),
            row("GBPUSD", day(4), "000000", 1.3),
        ],
    );

    let summary = Reshaper::new(&archive_dir, &csv_dir)
        .reshape(&[], &NoProgress)
        .unwrap();

    assert_eq!(summary.archives, 2);
    assert_eq!(summary.rows_written, 3);
    assert_eq!(summary.rows_dropped, 2);
    assert!(csv_dir.join("EURUSD.csv").exists());
    assert!(csv_dir.join("GBPUSD.csv").exists());
    assert!(!csv_dir.join("USDCHF.csv").exists());

    let eurusd = std::fs::read_to_string(csv_dir.join("EURUSD.csv")).unwrap();
    assert_eq!(
        eurusd,
        "2019-11-01 00:00:00, 1.1, 1.1, 1.1, 1.1\n2019-11-04 00:00:00, 1.2, 1.2, 1.2, 1.2\n"
    );

    let mut cache = SeriesCache::new(&csv_dir);
    assert!(cache.load("USDCHF", None).unwrap().is_none());
}

#[test]
fn reshape_with_no_archives_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let err = Reshaper::new(tmp.path().join("empty"), tmp.path().join("csv"))
        .reshape(&[], &NoProgress)
        .unwrap_err();
    assert!(matches!(err, ReshapeError::NoArchives { .. }));
}

#[test]
fn malformed_row_aborts_with_location() {
    let tmp = tempfile::tempdir().unwrap();
    let archive_dir = tmp.path().join("forexite");
    let path = write_archive(
        &archive_dir,
        day(1),
        &[
            row("EURUSD", day(1), "000000", 1.1),
            "EURUSD,20191101,000100,1.1,1.1,1.1".to_string(),
        ],
    );

    let err = Reshaper::new(&archive_dir, tmp.path().join("csv"))
        .reshape(&[], &NoProgress)
        .unwrap_err();
    match err {
        ReshapeError::Row {
            archive,
            line,
            source,
        } => {
            assert_eq!(archive, path);
            assert_eq!(line, 3);
            assert!(matches!(source, ParseError::MalformedRow { found: 6, .. }));
        }
        other => panic!("expected Row error, got {other:?}"),
    }
}

// ── Loading ──────────────────────────────────────────────────────────

#[test]
fn appended_out_of_order_archives_load_sorted() {
    let tmp = tempfile::tempdir().unwrap();
    let archive_dir = tmp.path().join("forexite");
    let csv_dir = tmp.path().join("csv");
    let older = write_archive(&archive_dir, day(1), &[row("EURUSD", day(1), "120000", 1.0)]);
    let newer = write_archive(&archive_dir, day(2), &[row("EURUSD", day(2), "120000", 2.0)]);

    // Two runs in reverse chronological order leave the file unsorted.
    let reshaper = Reshaper::new(&archive_dir, &csv_dir);
    reshaper.reshape(&[newer], &NoProgress).unwrap();
    reshaper.reshape(&[older], &NoProgress).unwrap();

    let mut cache = SeriesCache::new(&csv_dir);
    let series = cache.load("EURUSD", None).unwrap().unwrap();
    let closes: Vec<f64> = series.bars().iter().map(|b| b.close).collect();
    assert_eq!(closes, vec![1.0, 2.0]);
    assert!(series
        .bars()
        .windows(2)
        .all(|w| w[0].timestamp < w[1].timestamp));
}

#[test]
fn resampled_load_aggregates_corrected_minutes() {
    let tmp = tempfile::tempdir().unwrap();
    let archive_dir = tmp.path().join("forexite");
    let csv_dir = tmp.path().join("csv");

    // 01:00..01:04 in archive time is 00:00..00:04 after correction.
    let mut rows: Vec<String> = (0..5)
        .map(|m| row("EURUSD", day(1), &format!("010{m}00"), (m + 1) as f64))
        .collect();
    // Nothing between 01:05 and 01:29, then one bar at 01:31.
    rows.push(row("EURUSD", day(1), "013100", 9.0));
    write_archive(&archive_dir, day(1), &rows);
    Reshaper::new(&archive_dir, &csv_dir)
        .reshape(&[], &NoProgress)
        .unwrap();

    let mut cache = SeriesCache::new(&csv_dir);
    let series = cache.load("EURUSD", Some(5)).unwrap().unwrap();
    assert_eq!(series.len(), 2);

    let first = series.bars()[0];
    assert_eq!(first.timestamp, at(day(1), 0, 0));
    assert_eq!(
        (first.open, first.high, first.low, first.close),
        (1.0, 5.0, 1.0, 5.0)
    );
    assert_eq!(series.bars()[1].timestamp, at(day(1), 0, 30));
}

#[test]
fn identical_requests_share_one_series() {
    let tmp = tempfile::tempdir().unwrap();
    let archive_dir = tmp.path().join("forexite");
    let csv_dir = tmp.path().join("csv");
    write_archive(&archive_dir, day(1), &[row("EURUSD", day(1), "000000", 1.1)]);
    Reshaper::new(&archive_dir, &csv_dir)
        .reshape(&[], &NoProgress)
        .unwrap();

    let mut cache = SeriesCache::new(&csv_dir);
    let a = cache.load("EURUSD", Some(15)).unwrap().unwrap();

    // Hits never touch the filesystem.
    std::fs::remove_file(csv_dir.join("EURUSD.csv")).unwrap();
    let b = cache.load("EURUSD", Some(15)).unwrap().unwrap();
    assert!(Arc::ptr_eq(&a, &b));

    // A different key needs the file, which is now gone.
    assert!(cache.load("EURUSD", None).unwrap().is_none());
}

// ── Overlay ──────────────────────────────────────────────────────────

#[test]
fn overlay_over_reshaped_data() {
    let tmp = tempfile::tempdir().unwrap();
    let archive_dir = tmp.path().join("forexite");
    let csv_dir = tmp.path().join("csv");
    let rows: Vec<String> = (0..30)
        .map(|m| {
            row(
                "EURUSD",
                day(1),
                &format!("01{m:02}00"),
                1.1 + m as f64 * 0.001,
            )
        })
        .collect();
    write_archive(&archive_dir, day(1), &rows);
    Reshaper::new(&archive_dir, &csv_dir)
        .reshape(&[], &NoProgress)
        .unwrap();

    let mut cache = OverlayCache::new(SeriesCache::new(&csv_dir));
    let overlay = cache.get_overlay("EURUSD", 3.0, 5, None).unwrap().unwrap();
    assert_eq!(overlay.len(), 30);
    assert_eq!(overlay.rows()[0].timestamp, at(day(1), 0, 0));
    assert!(overlay.rows()[3].overlay.is_nan());
    assert!(overlay.rows()[29].direction == 1 || overlay.rows()[29].direction == -1);

    let again = cache.get_overlay("EURUSD", 3.0, 5, None).unwrap().unwrap();
    assert!(Arc::ptr_eq(&overlay, &again));
    assert!(cache.get_overlay("XAUUSD", 3.0, 5, None).unwrap().is_none());
}
