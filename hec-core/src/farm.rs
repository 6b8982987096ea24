use crate::{CouplingError, CropId, FarmId, Node};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Planting calendar and irrigation settings for one crop on one farm.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropSchedule {
    pub crop_id: CropId,
    /// Planting date
    pub start: NaiveDate,
    /// Date of full canopy cover
    pub cover: NaiveDate,
    /// Harvest or death of the crop
    pub end: NaiveDate,
    /// Irrigation efficiency, 0-1
    pub irr_eff: f64,
    /// Irrigation flag, 0 (rainfed) or 1 (irrigated)
    pub irr: f64,
}

/// What the allocator needs to know about a water user.
///
/// The economic model owns the farms; the allocator only reads them through
/// this trait and never copies them.
pub trait WaterUser {
    fn id(&self) -> FarmId;

    fn name(&self) -> &str;

    /// Node the farm diverts water from.
    fn source_id(&self) -> Node;

    fn crop_ids(&self) -> &[CropId];

    /// One schedule per crop, or `None` while no scenario has been simulated.
    /// Fails with `MismatchedCropLists` when the per-crop lists disagree in
    /// length.
    fn crop_schedule(&self) -> crate::Result<Option<Vec<CropSchedule>>>;

    /// Simulated water use per crop, populated after a scenario runs.
    fn water_sim(&self) -> Option<&[f64]>;

    /// Model-facing state written by `export_farms`.
    fn state(&self) -> serde_json::Value;
}

/// A farm record as produced by the economic model.
///
/// Per-crop fields are parallel lists indexed like `crop_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Farm {
    pub id: FarmId,
    #[serde(default)]
    pub name: String,
    pub source_id: Node,
    pub crop_id: Vec<CropId>,
    pub irr_eff: Vec<f64>,
    pub irr: Vec<f64>,
    #[serde(default, with = "schedule_dates", skip_serializing_if = "Option::is_none")]
    pub crop_start_date: Option<Vec<NaiveDate>>,
    #[serde(default, with = "schedule_dates", skip_serializing_if = "Option::is_none")]
    pub crop_cover_date: Option<Vec<NaiveDate>>,
    #[serde(default, with = "schedule_dates", skip_serializing_if = "Option::is_none")]
    pub crop_end_date: Option<Vec<NaiveDate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watersim: Option<Vec<f64>>,
}

impl Farm {
    /// Parse a list of farm records, either a bare JSON array or a
    /// `{ "farms": [...] }` document.
    pub fn parse_farms_json(json: &str) -> crate::Result<Vec<Farm>> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum FarmsDocument {
            Wrapped { farms: Vec<Farm> },
            Bare(Vec<Farm>),
        }

        let doc: FarmsDocument = serde_json::from_str(json)?;
        Ok(match doc {
            FarmsDocument::Wrapped { farms } => farms,
            FarmsDocument::Bare(farms) => farms,
        })
    }
}

impl WaterUser for Farm {
    fn id(&self) -> FarmId {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn source_id(&self) -> Node {
        self.source_id
    }

    fn crop_ids(&self) -> &[CropId] {
        &self.crop_id
    }

    fn crop_schedule(&self) -> crate::Result<Option<Vec<CropSchedule>>> {
        let (Some(starts), Some(covers), Some(ends)) =
            (&self.crop_start_date, &self.crop_cover_date, &self.crop_end_date)
        else {
            return Ok(None);
        };
        let n = self.crop_id.len();
        let lists = [
            ("crop_start_date", starts.len()),
            ("crop_cover_date", covers.len()),
            ("crop_end_date", ends.len()),
            ("irr_eff", self.irr_eff.len()),
            ("irr", self.irr.len()),
        ];
        if let Some((field, len)) = lists.iter().find(|(_, len)| *len != n) {
            return Err(CouplingError::MismatchedCropLists {
                farm_id: self.id,
                reason: format!("{} has {} entries for {} crops", field, len, n),
            });
        }
        Ok(Some(
            (0..n)
                .map(|i| CropSchedule {
                    crop_id: self.crop_id[i],
                    start: starts[i],
                    cover: covers[i],
                    end: ends[i],
                    irr_eff: self.irr_eff[i],
                    irr: self.irr[i],
                })
                .collect(),
        ))
    }

    fn water_sim(&self) -> Option<&[f64]> {
        self.watersim.as_deref()
    }

    fn state(&self) -> serde_json::Value {
        // Serializing a plain struct of numbers, strings and dates cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// Serde adapter for optional date lists: written as ISO dates, read in any
/// format `hec_utils::dates::parse_flexible` understands.
mod schedule_dates {
    use chrono::NaiveDate;
    use hec_utils::dates::{format_date, parse_flexible};
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dates: &Option<Vec<NaiveDate>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dates {
            Some(dates) => serializer.collect_seq(dates.iter().map(format_date)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<NaiveDate>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<Vec<String>> = Option::deserialize(deserializer)?;
        raw.map(|list| {
            list.iter()
                .map(|s| parse_flexible(s).map_err(D::Error::custom))
                .collect::<Result<Vec<NaiveDate>, D::Error>>()
        })
        .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FARMS_JSON: &str = r#"{
        "farms": [
            {
                "id": 7,
                "name": "Bitterroot Ranch",
                "source_id": 10,
                "crop_id": [5, 12],
                "irr_eff": [0.8, 1.0],
                "irr": [1, 0],
                "crop_start_date": ["05/01/2020", "2020-04-15"],
                "crop_cover_date": ["05/20/2020", "2020-06-01"],
                "crop_end_date": ["08/30/2020", "2020-09-15"],
                "watersim": [120.5, 0.0]
            },
            {
                "id": 8,
                "source_id": 20,
                "crop_id": [5],
                "irr_eff": [0.6],
                "irr": [1]
            }
        ]
    }"#;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_farms_json() {
        let farms = Farm::parse_farms_json(FARMS_JSON).unwrap();
        assert_eq!(farms.len(), 2);
        assert_eq!(farms[0].name, "Bitterroot Ranch");
        assert_eq!(farms[0].crop_start_date.as_ref().unwrap()[0], ymd(2020, 5, 1));
        assert_eq!(farms[0].crop_start_date.as_ref().unwrap()[1], ymd(2020, 4, 15));
        assert_eq!(farms[1].name, "");
        assert!(farms[1].crop_start_date.is_none());
        assert!(farms[1].watersim.is_none());
    }

    #[test]
    fn test_parse_bare_array() {
        let farms = Farm::parse_farms_json(r#"[{"id": 1, "source_id": 3, "crop_id": [], "irr_eff": [], "irr": []}]"#)
            .unwrap();
        assert_eq!(farms.len(), 1);
        assert_eq!(farms[0].source_id, 3);
    }

    #[test]
    fn test_crop_schedule() {
        let farms = Farm::parse_farms_json(FARMS_JSON).unwrap();
        let schedule = farms[0].crop_schedule().unwrap().unwrap();
        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule[0].crop_id, 5);
        assert_eq!(schedule[0].cover, ymd(2020, 5, 20));
        assert_eq!(schedule[1].end, ymd(2020, 9, 15));
        assert_eq!(schedule[1].irr, 0.0);
        assert!(farms[1].crop_schedule().unwrap().is_none());
    }

    #[test]
    fn test_crop_schedule_length_mismatch() {
        let mut farm = Farm::parse_farms_json(FARMS_JSON).unwrap().remove(0);
        farm.crop_end_date = Some(vec![ymd(2020, 8, 30)]);
        match farm.crop_schedule() {
            Err(CouplingError::MismatchedCropLists { farm_id, reason }) => {
                assert_eq!(farm_id, 7);
                assert_eq!(reason, "crop_end_date has 1 entries for 2 crops");
            }
            other => panic!("expected MismatchedCropLists, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_date_rejected() {
        let json = r#"[{"id": 1, "source_id": 3, "crop_id": [1], "irr_eff": [1], "irr": [1],
            "crop_start_date": ["not a date"], "crop_cover_date": ["2020-01-01"], "crop_end_date": ["2020-01-02"]}]"#;
        assert!(Farm::parse_farms_json(json).is_err());
    }

    #[test]
    fn test_state_uses_iso_dates() {
        let farms = Farm::parse_farms_json(FARMS_JSON).unwrap();
        let state = farms[0].state();
        assert_eq!(state["crop_start_date"][0], "2020-05-01");
        assert_eq!(state["watersim"][0], 120.5);
        assert!(farms[1].state().get("watersim").is_none());
    }
}
