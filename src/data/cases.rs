use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;
use std::io;
use std::path::Path;

/// One row of the cumulative case time series. Unknown columns such as
/// `deaths` are ignored; `fips` is empty for unassigned rows.
#[derive(Debug, Clone, Deserialize)]
pub struct CaseRow {
    pub date: NaiveDate,
    pub county: String,
    pub state: String,
    #[serde(default)]
    pub fips: Option<String>,
    pub cases: u64,
}

/// The full time series, kept in file order. The active date is taken from
/// the last row; the file's ordering is trusted, not validated.
#[derive(Debug, Clone)]
pub struct CaseTable {
    rows: Vec<CaseRow>,
    dates: Vec<NaiveDate>,
    latest: NaiveDate,
}

impl CaseTable {
    pub fn load(path: &Path) -> Result<Self> {
        let reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open case table {}", path.display()))?;
        Self::from_csv(reader)
    }

    pub fn from_reader<R: io::Read>(reader: R) -> Result<Self> {
        Self::from_csv(csv::Reader::from_reader(reader))
    }

    fn from_csv<R: io::Read>(mut reader: csv::Reader<R>) -> Result<Self> {
        let mut rows = Vec::new();
        for (i, record) in reader.deserialize::<CaseRow>().enumerate() {
            let row = record.with_context(|| format!("bad case row {}", i + 1))?;
            rows.push(row);
        }
        let latest = match rows.last() {
            Some(row) => row.date,
            None => bail!("case table has no rows"),
        };

        let mut dates: Vec<NaiveDate> = rows.iter().map(|r| r.date).collect();
        dates.sort_unstable();
        dates.dedup();

        Ok(Self { rows, dates, latest })
    }

    /// The date of the last row in the file.
    pub fn latest_date(&self) -> NaiveDate {
        self.latest
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Step `delta` distinct dates away from `current`, clamped to the
    /// series' first and last dates.
    pub fn step_date(&self, current: NaiveDate, delta: i64) -> NaiveDate {
        let at = self.dates.partition_point(|d| *d < current) as i64;
        let stepped = (at + delta).clamp(0, self.dates.len() as i64 - 1);
        self.dates[stepped as usize]
    }

    /// Case counts on one date, keyed by FIPS. Rows without a FIPS code
    /// cannot join and are left out.
    pub fn cases_on(&self, date: NaiveDate) -> HashMap<String, u64> {
        let mut cases = HashMap::new();
        for row in &self.rows {
            if row.date != date {
                continue;
            }
            if let Some(fips) = &row.fips {
                cases.insert(fips.clone(), row.cases);
            }
        }
        cases
    }

    /// County and state names by FIPS, as a fallback for regions whose
    /// boundary properties carry no name.
    pub fn names(&self) -> HashMap<String, (String, String)> {
        let mut names = HashMap::new();
        for row in &self.rows {
            if let Some(fips) = &row.fips {
                names
                    .entry(fips.clone())
                    .or_insert_with(|| (row.county.clone(), row.state.clone()));
            }
        }
        names
    }
}
