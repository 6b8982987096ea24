use crate::BREAKPOINTS;
use csv::ReaderBuilder;
use hec_core::{CouplingError, CropId, Result};
use std::collections::BTreeMap;
use std::path::Path;

/// Number of Kc columns per row: 11 growing breakpoints followed by the 10
/// maturity breakpoints after full cover. The growing 100% value doubles as
/// the maturity 0% value, which keeps the curve continuous at full cover.
pub const KC_COLUMNS: usize = 2 * BREAKPOINTS - 1;

/// Kc breakpoints of one crop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KcCurve {
    pub growing: [f64; BREAKPOINTS],
    pub maturity: [f64; BREAKPOINTS],
}

impl KcCurve {
    /// Split a table row of [`KC_COLUMNS`] values into the two phases.
    pub fn from_row(values: &[f64; KC_COLUMNS]) -> Self {
        let mut growing = [0.0; BREAKPOINTS];
        let mut maturity = [0.0; BREAKPOINTS];
        growing.copy_from_slice(&values[..BREAKPOINTS]);
        maturity.copy_from_slice(&values[BREAKPOINTS - 1..]);
        KcCurve { growing, maturity }
    }

    /// The same coefficient for the whole season.
    pub fn flat(kc: f64) -> Self {
        KcCurve {
            growing: [kc; BREAKPOINTS],
            maturity: [kc; BREAKPOINTS],
        }
    }
}

/// Crop coefficient lookup table, keyed by crop id.
///
/// Loaded explicitly from CSV text or a file and handed to
/// [`crate::CropCoefficientCurve`]; nothing is discovered implicitly.
///
/// # CSV format
///
/// Headered, one crop per row: `crop_id` followed by [`KC_COLUMNS`]
/// coefficients. Further columns (crop name, notes) are ignored.
///
/// ```text
/// crop_id,g0,g10,...,g100,m10,...,m100,name
/// 5,0.15,0.18,...,1.12,1.12,...,0.22,spring grain
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KcTable {
    curves: BTreeMap<CropId, KcCurve>,
}

impl KcTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the curve of one crop.
    pub fn insert(&mut self, crop_id: CropId, curve: KcCurve) {
        self.curves.insert(crop_id, curve);
    }

    pub fn get(&self, crop_id: CropId) -> Option<&KcCurve> {
        self.curves.get(&crop_id)
    }

    /// Curve of `crop_id`, or `UnknownCrop`.
    pub fn curve(&self, crop_id: CropId) -> Result<&KcCurve> {
        self.get(crop_id).ok_or(CouplingError::UnknownCrop(crop_id))
    }

    pub fn crop_ids(&self) -> impl Iterator<Item = CropId> + '_ {
        self.curves.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.curves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    /// Parse comma-separated table text.
    pub fn parse_csv(csv_object: &str) -> Result<Self> {
        Self::parse_delimited(csv_object, b',')
    }

    /// Parse table text with an arbitrary field delimiter.
    pub fn parse_delimited(text: &str, delimiter: u8) -> Result<Self> {
        let mut table = KcTable::new();
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        for (line, row) in rdr.records().enumerate() {
            let record = row.map_err(|e| CouplingError::KcTable(e.to_string()))?;
            // header is line 1
            let line = line + 2;
            let crop_id: CropId = record
                .get(0)
                .unwrap_or("")
                .trim()
                .parse()
                .map_err(|_| CouplingError::KcTable(format!("line {}: crop_id is not an integer", line)))?;
            if record.len() < KC_COLUMNS + 1 {
                return Err(CouplingError::KcTable(format!(
                    "line {}: expected {} coefficients for crop {}, found {}",
                    line,
                    KC_COLUMNS,
                    crop_id,
                    record.len().saturating_sub(1)
                )));
            }

            let mut values = [0.0; KC_COLUMNS];
            for (k, value) in values.iter_mut().enumerate() {
                let field = record.get(k + 1).unwrap_or("").trim();
                *value = field.parse().map_err(|_| {
                    CouplingError::KcTable(format!(
                        "line {}: coefficient {} of crop {} is not a number: '{}'",
                        line,
                        k,
                        crop_id,
                        field
                    ))
                })?;
            }
            if table.curves.insert(crop_id, KcCurve::from_row(&values)).is_some() {
                log::warn!("crop {} appears twice in Kc table, keeping line {}", crop_id, line);
            }
        }
        log::info!("loaded Kc curves for {} crops", table.len());
        Ok(table)
    }

    /// Read a table file; `.txt` and `.tsv` files are tab-delimited, anything
    /// else comma-separated.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let delimiter = match path.extension().and_then(|e| e.to_str()) {
            Some("txt") | Some("tsv") => b'\t',
            _ => b',',
        };
        Self::parse_delimited(&text, delimiter)
    }
}

impl FromIterator<(CropId, KcCurve)> for KcTable {
    fn from_iter<I: IntoIterator<Item = (CropId, KcCurve)>>(iter: I) -> Self {
        KcTable {
            curves: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = include_str!("../../fixtures/crop_coefficients.csv");

    #[test]
    fn test_parse_fixture() {
        let table = KcTable::parse_csv(FIXTURE).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.crop_ids().collect::<Vec<_>>(), vec![1, 5, 12, 21]);

        let grain = table.curve(5).unwrap();
        assert_eq!(grain.growing[0], 0.15);
        assert_eq!(grain.growing[10], 1.12);
        assert_eq!(grain.maturity[0], grain.growing[10]);
        assert_eq!(grain.maturity[10], 0.22);
    }

    #[test]
    fn test_unknown_crop() {
        let table = KcTable::parse_csv(FIXTURE).unwrap();
        assert!(matches!(table.curve(99), Err(CouplingError::UnknownCrop(99))));
    }

    #[test]
    fn test_tab_delimited() {
        let text = FIXTURE.replace(',', "\t");
        let table = KcTable::parse_delimited(&text, b'\t').unwrap();
        assert_eq!(table.len(), 4);
    }

    #[test]
    fn test_short_row_rejected() {
        let text = "crop_id,g0,g10\n3,0.1,0.2\n";
        assert!(matches!(KcTable::parse_csv(text), Err(CouplingError::KcTable(_))));
    }

    #[test]
    fn test_non_numeric_rejected() {
        let row: Vec<String> = std::iter::once("3".to_string())
            .chain((0..KC_COLUMNS).map(|k| if k == 4 { "n/a".to_string() } else { "0.5".to_string() }))
            .collect();
        let text = format!("header\n{}\n", row.join(","));
        match KcTable::parse_csv(&text) {
            Err(CouplingError::KcTable(msg)) => assert!(msg.contains("n/a")),
            other => panic!("expected KcTable error, got {:?}", other),
        }
    }

    #[test]
    fn test_from_path_and_iter() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kc.txt");
        std::fs::write(&path, FIXTURE.replace(',', "\t")).unwrap();
        assert_eq!(KcTable::from_path(&path).unwrap().len(), 4);

        let table: KcTable = vec![(5, KcCurve::flat(0.5))].into_iter().collect();
        assert_eq!(table.curve(5).unwrap().maturity[3], 0.5);
    }
}
