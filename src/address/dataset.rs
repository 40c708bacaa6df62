// 📚 Address Dataset
// Header-driven CSV → in-memory index, swapped in whole

use super::AddressRecord;
use crate::config::{DatasetColumns, DatasetConfig};
use crate::error::{ForgeError, Result};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Column positions resolved from the header row
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    street: usize,
    city: usize,
    state: Option<usize>,
    zip: usize,
    country: Option<usize>,
    width: usize,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord, columns: &DatasetColumns) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name.trim()))
        };
        let require = |name: &str| {
            find(name).ok_or_else(|| {
                ForgeError::InvalidDataset(format!("header row has no '{}' column", name))
            })
        };

        Ok(ColumnMap {
            street: require(&columns.street)?,
            city: require(&columns.city)?,
            state: find(&columns.state),
            zip: require(&columns.zip)?,
            country: columns.country.as_deref().and_then(find),
            width: headers.len(),
        })
    }
}

/// Process-wide address index
///
/// Readers take a cheap `Arc` snapshot; a reload parses fully before the
/// write lock is taken, so nobody sees a half-built index.
#[derive(Debug)]
pub struct AddressDataset {
    columns: DatasetColumns,
    default_state: String,
    default_country: String,
    load_timeout: Duration,
    index: RwLock<Option<Arc<Vec<AddressRecord>>>>,
}

impl AddressDataset {
    pub fn new(config: &DatasetConfig) -> Self {
        AddressDataset {
            columns: config.columns.clone(),
            default_state: config.default_state.clone(),
            default_country: config.default_country.clone(),
            load_timeout: Duration::from_secs(config.load_timeout_secs),
            index: RwLock::new(None),
        }
    }

    /// Parse a raw dataset blob without touching the installed index
    ///
    /// Rows whose field count differs from the header, or that lack a street,
    /// city or zip, are skipped. A blob with no usable rows is rejected.
    pub fn parse(&self, raw: &str) -> Result<Vec<AddressRecord>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(raw.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| ForgeError::InvalidDataset(format!("unreadable header row: {}", e)))?
            .clone();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(ForgeError::InvalidDataset("missing header row".to_string()));
        }

        let map = ColumnMap::resolve(&headers, &self.columns)?;

        let mut records = Vec::new();
        let mut skipped = 0usize;

        for result in reader.records() {
            let row = match result {
                Ok(row) => row,
                Err(e) => {
                    debug!("skipping malformed dataset row: {}", e);
                    skipped += 1;
                    continue;
                }
            };

            match self.row_to_record(&row, &map) {
                Some(record) => records.push(record),
                None => skipped += 1,
            }
        }

        if records.is_empty() {
            return Err(ForgeError::InvalidDataset(format!(
                "no usable rows ({} skipped)",
                skipped
            )));
        }

        debug!(accepted = records.len(), skipped, "parsed address dataset");
        Ok(records)
    }

    fn row_to_record(&self, row: &StringRecord, map: &ColumnMap) -> Option<AddressRecord> {
        if row.len() != map.width {
            return None;
        }

        let field = |i: usize| row.get(i).unwrap_or("").to_string();
        let optional = |i: Option<usize>, fallback: &str| {
            i.and_then(|i| row.get(i))
                .filter(|v| !v.is_empty())
                .unwrap_or(fallback)
                .to_string()
        };

        let street = field(map.street);
        let city = field(map.city);
        let zip = field(map.zip);
        if street.is_empty() || city.is_empty() || zip.is_empty() {
            return None;
        }

        Some(AddressRecord {
            street,
            city,
            state: optional(map.state, &self.default_state),
            zip,
            country: optional(map.country, &self.default_country),
            identity: None,
        })
    }

    /// Replace the index in one step
    pub fn install(&self, records: Vec<AddressRecord>) -> Arc<Vec<AddressRecord>> {
        let records = Arc::new(records);
        let mut index = self.index.write().unwrap_or_else(|e| e.into_inner());
        *index = Some(Arc::clone(&records));
        info!("address dataset installed: {} records", records.len());
        records
    }

    /// Parse then install; on failure the previous index stays in place
    pub fn load(&self, raw: &str) -> Result<Arc<Vec<AddressRecord>>> {
        match self.parse(raw) {
            Ok(records) => Ok(self.install(records)),
            Err(e) => {
                warn!("address dataset rejected: {}", e);
                Err(e)
            }
        }
    }

    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<Arc<Vec<AddressRecord>>> {
        let raw = read_dataset(path.as_ref())?;
        self.load(&raw)
    }

    /// File load bounded by `dataset.load_timeout_secs`
    ///
    /// Reading and parsing run on the blocking pool. A timeout abandons the
    /// parse and leaves the installed index untouched.
    #[cfg(feature = "server")]
    pub async fn load_file_bounded(
        self: &Arc<Self>,
        path: std::path::PathBuf,
    ) -> Result<Arc<Vec<AddressRecord>>> {
        let dataset = Arc::clone(self);
        let task = tokio::task::spawn_blocking(move || {
            let raw = read_dataset(&path)?;
            dataset.parse(&raw)
        });

        let records = match tokio::time::timeout(self.load_timeout, task).await {
            Ok(Ok(parsed)) => parsed?,
            Ok(Err(join_err)) => {
                return Err(ForgeError::InvalidDataset(format!(
                    "dataset load aborted: {}",
                    join_err
                )))
            }
            Err(_) => {
                warn!(
                    "address dataset load timed out after {}s",
                    self.load_timeout.as_secs()
                );
                return Err(ForgeError::InvalidDataset(format!(
                    "dataset load timed out after {}s",
                    self.load_timeout.as_secs()
                )));
            }
        };

        Ok(self.install(records))
    }

    /// Current index, or `DatasetNotLoaded`
    pub fn snapshot(&self) -> Result<Arc<Vec<AddressRecord>>> {
        let index = self.index.read().unwrap_or_else(|e| e.into_inner());
        index.as_ref().map(Arc::clone).ok_or(ForgeError::DatasetNotLoaded)
    }

    pub fn count(&self) -> usize {
        self.snapshot().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_loaded(&self) -> bool {
        self.index
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

impl Default for AddressDataset {
    fn default() -> Self {
        Self::new(&DatasetConfig::default())
    }
}

fn read_dataset(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        ForgeError::InvalidDataset(format!("cannot read {}: {}", path.display(), e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "FULL ADDRESS,CITY,JURISDICTION,ZIP\n\
        \"123 Main, Apt 4\",Baton Rouge,Louisiana,70801\n\
        456 Oak St,Shreveport,,71101\n\
        789 Pine Rd,Lafayette,Louisiana\n\
        ,Monroe,Louisiana,71201\n\
        10 Elm Ave,New Orleans,Louisiana,70112\n";

    #[test]
    fn test_quoted_comma_stays_in_one_field() {
        let dataset = AddressDataset::default();
        let records = dataset.parse(SAMPLE).unwrap();

        assert_eq!(records[0].street, "123 Main, Apt 4");
        assert_eq!(records[0].city, "Baton Rouge");
        assert_eq!(records[0].zip, "70801");
    }

    #[test]
    fn test_short_and_incomplete_rows_are_skipped() {
        let dataset = AddressDataset::default();
        let records = dataset.parse(SAMPLE).unwrap();

        // short row (Lafayette) and empty street (Monroe) are dropped
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.city != "Lafayette" && r.city != "Monroe"));
    }

    #[test]
    fn test_defaults_fill_state_and_country() {
        let dataset = AddressDataset::default();
        let records = dataset.parse(SAMPLE).unwrap();

        let shreveport = records.iter().find(|r| r.city == "Shreveport").unwrap();
        assert_eq!(shreveport.state, "Louisiana");
        assert!(records.iter().all(|r| r.country == "US"));
    }

    #[test]
    fn test_optional_country_column() {
        let mut config = DatasetConfig::default();
        config.columns.country = Some("COUNTRY".to_string());
        let dataset = AddressDataset::new(&config);

        let raw = "FULL ADDRESS,CITY,JURISDICTION,ZIP,COUNTRY\n1 Rue A,Paris,IDF,75001,FR\n";
        let records = dataset.parse(raw).unwrap();
        assert_eq!(records[0].country, "FR");
    }

    #[test]
    fn test_not_loaded_until_load() {
        let dataset = AddressDataset::default();
        assert!(!dataset.is_loaded());
        assert_eq!(dataset.count(), 0);
        assert!(matches!(dataset.snapshot(), Err(ForgeError::DatasetNotLoaded)));

        dataset.load(SAMPLE).unwrap();
        assert!(dataset.is_loaded());
        assert_eq!(dataset.count(), 3);
    }

    #[test]
    fn test_failed_reload_keeps_previous_index() {
        let dataset = AddressDataset::default();
        dataset.load(SAMPLE).unwrap();

        let err = dataset.load("FULL ADDRESS,CITY,JURISDICTION,ZIP\n,,,\n").unwrap_err();
        assert!(matches!(err, ForgeError::InvalidDataset(_)));
        assert_eq!(dataset.count(), 3);
    }

    #[test]
    fn test_missing_required_column_is_rejected() {
        let dataset = AddressDataset::default();
        let err = dataset.parse("STREET,CITY,ZIP\n1 A St,X,00000\n").unwrap_err();
        assert!(err.to_string().contains("FULL ADDRESS"));
        assert!(dataset.parse("").is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("us-US.csv");
        fs::write(&path, SAMPLE).unwrap();

        let dataset = AddressDataset::default();
        assert_eq!(dataset.load_file(&path).unwrap().len(), 3);

        let missing = dataset.load_file(dir.path().join("nope.csv"));
        assert!(matches!(missing, Err(ForgeError::InvalidDataset(_))));
        assert_eq!(dataset.count(), 3);
    }

    #[cfg(feature = "server")]
    #[tokio::test]
    async fn test_bounded_load_installs_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("us-US.csv");
        fs::write(&path, SAMPLE).unwrap();

        let dataset = Arc::new(AddressDataset::default());
        let records = dataset.load_file_bounded(path).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(dataset.is_loaded());

        let err = dataset
            .load_file_bounded(dir.path().join("missing.csv"))
            .await
            .unwrap_err();
        assert!(matches!(err, ForgeError::InvalidDataset(_)));
        assert_eq!(dataset.count(), 3);
    }

    #[cfg(feature = "server")]
    #[tokio::test]
    async fn test_timed_out_load_keeps_previous_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.csv");

        let mut raw = String::from("FULL ADDRESS,CITY,JURISDICTION,ZIP\n");
        for i in 0..300_000 {
            raw.push_str(&format!("{} Long Road,Baton Rouge,Louisiana,70801\n", i));
        }
        fs::write(&path, raw).unwrap();

        let config = DatasetConfig {
            load_timeout_secs: 0,
            ..Default::default()
        };
        let dataset = Arc::new(AddressDataset::new(&config));
        dataset.load(SAMPLE).unwrap();

        let err = dataset.load_file_bounded(path).await.unwrap_err();
        assert!(matches!(err, ForgeError::InvalidDataset(_)));
        assert!(err.to_string().contains("timed out"), "got err: {}", err);
        assert_eq!(dataset.count(), 3);
    }
}
