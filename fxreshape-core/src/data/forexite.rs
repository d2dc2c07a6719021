//! Forexite archive source.
//!
//! Forexite publishes one zip per calendar day containing one-minute bars for
//! every instrument that traded that day:
//!
//! ```text
//! https://www.forexite.com/free_forex_quotes/{year}/{month:02}/{day:02}{month:02}{yy:02}.zip
//! ```
//!
//! Locally each archive is stored as `{year:04}-{month:02}-{day:02}.zip` so
//! that lexicographic file order equals chronological order.

use super::provider::{ArchiveSource, FetchError};
use crate::config::PipelineConfig;
use chrono::{Datelike, NaiveDate};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://www.forexite.com/free_forex_quotes";

const LOCAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Remote URL of the archive for `date`.
pub fn remote_url(base_url: &str, date: NaiveDate) -> String {
    format!(
        "{}/{}/{:02}/{:02}{:02}{:02}.zip",
        base_url.trim_end_matches('/'),
        date.year(),
        date.month(),
        date.day(),
        date.month(),
        date.year().rem_euclid(100)
    )
}

/// Local file name of the archive for `date`.
pub fn archive_file_name(date: NaiveDate) -> String {
    format!("{}.zip", date.format(LOCAL_DATE_FORMAT))
}

/// Recover the trading date from a local archive path, if it follows the
/// naming convention.
pub fn archive_date(path: &Path) -> Option<NaiveDate> {
    let stem = path.file_stem()?.to_str()?;
    NaiveDate::parse_from_str(stem, LOCAL_DATE_FORMAT).ok()
}

/// Blocking HTTP source for Forexite daily archives.
pub struct ForexiteSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl ForexiteSource {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn from_config(config: &PipelineConfig) -> Result<Self, FetchError> {
        Self::new(
            config.base_url.clone(),
            config.timeout(),
            &config.user_agent,
        )
    }
}

impl ArchiveSource for ForexiteSource {
    fn name(&self) -> &str {
        "forexite"
    }

    fn locate(&self, date: NaiveDate) -> String {
        remote_url(&self.base_url, date)
    }

    fn download(&self, date: NaiveDate, out: &mut dyn Write) -> Result<u64, FetchError> {
        let url = self.locate(date);

        let mut resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| FetchError::Network {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                url,
                status: status.as_u16(),
            });
        }

        resp.copy_to(out).map_err(|e| FetchError::Network {
            url,
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn remote_url_uses_day_month_short_year() {
        assert_eq!(
            remote_url(DEFAULT_BASE_URL, date(2011, 11, 1)),
            "https://www.forexite.com/free_forex_quotes/2011/11/011111.zip"
        );
        assert_eq!(
            remote_url("http://mirror.local/quotes/", date(2020, 2, 9)),
            "http://mirror.local/quotes/2020/02/090220.zip"
        );
    }

    #[test]
    fn short_year_is_zero_padded() {
        assert_eq!(
            remote_url(DEFAULT_BASE_URL, date(2005, 3, 7)),
            "https://www.forexite.com/free_forex_quotes/2005/03/070305.zip"
        );
    }

    #[test]
    fn local_name_sorts_chronologically() {
        let a = archive_file_name(date(2019, 12, 31));
        let b = archive_file_name(date(2020, 1, 1));
        assert_eq!(a, "2019-12-31.zip");
        assert!(a < b);
    }

    #[test]
    fn archive_date_roundtrips_local_name() {
        let path = PathBuf::from("forexite").join(archive_file_name(date(2021, 6, 4)));
        assert_eq!(archive_date(&path), Some(date(2021, 6, 4)));
        assert_eq!(archive_date(Path::new("forexite/notes.zip")), None);
    }
}
