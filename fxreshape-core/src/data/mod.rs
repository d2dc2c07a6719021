//! Data pipeline: fetch daily archives, reshape them into per-instrument
//! files, load and cache price series and their overlays.

pub mod archive;
pub mod fetch;
pub mod forexite;
pub mod loader;
pub mod overlay;
pub mod parse;
pub mod progress;
pub mod provider;
pub mod resample;
pub mod reshape;
pub mod series;
pub mod sync;

pub use archive::{for_each_row, ArchiveError};
pub use fetch::{fetch_missing, window_dates, FetchSummary, DEFAULT_WINDOW_DAYS};
pub use forexite::{archive_date, archive_file_name, remote_url, ForexiteSource, DEFAULT_BASE_URL};
pub use loader::{LoadError, SeriesCache, SeriesKey, TIMEZONE_OFFSET_HOURS};
pub use overlay::{OverlayBar, OverlayCache, OverlayKey, OverlaySeries};
pub use parse::{parse_row, ParseError};
pub use progress::{NoProgress, PipelineProgress, StdoutProgress};
pub use provider::{ArchiveSource, FetchError};
pub use resample::resample;
pub use reshape::{list_archives, ReshapeError, ReshapeSummary, Reshaper};
pub use series::PriceSeries;
pub use sync::{sync, SyncError, SyncSummary};
