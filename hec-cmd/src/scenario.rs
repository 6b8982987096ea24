//! Commands that run a full allocator over one scenario.

use crate::ScenarioArgs;
use anyhow::{bail, Context};
use hec_core::farm::Farm;
use hec_core::feature::{read_features, Feature};
use hec_core::grid::{GeoTransform, GridSpec};
use hec_coupling::{load_farms, AllocatorConfig, FarmWaterAllocator, WaterUse};
use hec_crop::{CropCoefficientCurve, KcTable};
use hec_network::NetworkTopology;
use hec_utils::dates::parse_flexible;
use log::info;
use ndarray::Array2;

/// Everything read from disk for one scenario.
pub struct Scenario {
    pub topology: NetworkTopology,
    pub farms: Vec<Farm>,
    pub curve: CropCoefficientCurve,
    pub water_users: Vec<Feature>,
    pub grid: GridSpec,
    pub config: AllocatorConfig,
}

impl ScenarioArgs {
    pub fn grid(&self) -> anyhow::Result<GridSpec> {
        let coeffs: [f64; 6] = match self.transform.as_slice().try_into() {
            Ok(coeffs) => coeffs,
            Err(_) => bail!(
                "--transform needs 6 comma separated coefficients, got {}",
                self.transform.len()
            ),
        };
        Ok(GridSpec::new(self.rows, self.cols, GeoTransform::from_gdal(coeffs)))
    }

    pub fn load(&self) -> anyhow::Result<Scenario> {
        let config = match &self.config {
            Some(path) => {
                AllocatorConfig::from_path(path).with_context(|| format!("Failed to read config {}", path))?
            }
            None => AllocatorConfig::default(),
        };
        let topology = NetworkTopology::from_path(&self.network)
            .with_context(|| format!("Failed to read network {}", self.network))?;
        let farms = load_farms(&self.farms).with_context(|| format!("Failed to read farms {}", self.farms))?;
        let table = KcTable::from_path(&self.kc_table)
            .with_context(|| format!("Failed to read crop coefficients {}", self.kc_table))?;
        let water_users = read_features(&self.water_users)
            .with_context(|| format!("Failed to read water users {}", self.water_users))?;

        info!(
            "Loaded {} farms, {} crops and {} water-user polygons",
            farms.len(),
            table.len(),
            water_users.len()
        );
        Ok(Scenario {
            topology,
            farms,
            curve: CropCoefficientCurve::new(table),
            water_users,
            grid: self.grid()?,
            config,
        })
    }
}

impl Scenario {
    /// An allocator with farms attached, the mask burned and factors computed.
    pub fn allocator(&self) -> anyhow::Result<FarmWaterAllocator<'_, Farm>> {
        let mut allocator = FarmWaterAllocator::new(self.curve.clone(), self.grid, self.config.clone());
        allocator.attach_farms(&self.topology, &self.farms)?;
        allocator.set_water_user_mask(&self.water_users, &self.config.water_user_id_field)?;
        allocator.compute_applied_water_factors()?;
        Ok(allocator)
    }
}

pub fn run_factors(args: &ScenarioArgs) -> anyhow::Result<()> {
    let scenario = args.load()?;
    let allocator = scenario.allocator()?;
    let factors = allocator
        .applied_water_factors()
        .context("Applied water factors were not computed")?;
    println!("{}", serde_json::to_string_pretty(factors)?);
    Ok(())
}

/// Read a land-use grid stored as a JSON array of equally long rows.
pub fn read_land_use(path: &str) -> anyhow::Result<Array2<i64>> {
    let text = std::fs::read_to_string(path).with_context(|| format!("Failed to read land use {}", path))?;
    let rows: Vec<Vec<i64>> =
        serde_json::from_str(&text).with_context(|| format!("Failed to parse land use {}", path))?;
    let (n_rows, n_cols) = (rows.len(), rows.first().map_or(0, Vec::len));
    if rows.iter().any(|row| row.len() != n_cols) {
        bail!("Land-use rows in {} differ in length", path);
    }
    Ok(Array2::from_shape_vec((n_rows, n_cols), rows.into_iter().flatten().collect())?)
}

fn simulated_water_use(scenario: &Scenario, path: Option<&str>) -> anyhow::Result<WaterUse> {
    Ok(match path {
        Some(path) => WaterUse::from_path(path).with_context(|| format!("Failed to read water use {}", path))?,
        None => WaterUse::from_farms(&scenario.farms),
    })
}

pub fn run_diversions(
    args: &ScenarioArgs,
    water_use: Option<&str>,
    start: &str,
    end: &str,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let start = parse_flexible(start)?;
    let end = parse_flexible(end)?;
    if end < start {
        bail!("End date {} precedes start date {}", end, start);
    }

    let scenario = args.load()?;
    let water_use = simulated_water_use(&scenario, water_use)?;

    let mut allocator = scenario.allocator()?;
    allocator.record_simulation(water_use)?;
    let series = allocator.diversion_series(start, end)?;

    match output {
        Some(path) => {
            series.write_json(path).with_context(|| format!("Failed to write {}", path))?;
            info!("Diversions complete. Output: {}", path);
        }
        None => println!("{}", serde_json::to_string_pretty(&series.to_document())?),
    }
    Ok(())
}

pub fn run_irrigation(
    args: &ScenarioArgs,
    land_use: &str,
    water_use: Option<&str>,
    date: &str,
    output: Option<&str>,
) -> anyhow::Result<()> {
    let date = parse_flexible(date)?;
    let land_use = read_land_use(land_use)?;
    let scenario = args.load()?;
    let water_use = simulated_water_use(&scenario, water_use)?;

    let mut allocator = scenario.allocator()?;
    allocator.record_simulation(water_use)?;
    let table = allocator.compute_diversions(date)?;
    let map = allocator.compute_configured_irrigation(&land_use, &table)?;

    let rows: Vec<Vec<f64>> = map.array().outer_iter().map(|row| row.to_vec()).collect();
    let json = serde_json::to_string_pretty(&rows)?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path))?;
            info!("Irrigation complete. {} applied. Output: {}", map.total(), path);
        }
        None => println!("{}", json),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hec_coupling::NodeSeriesDocument;

    fn fixture(name: &str) -> String {
        format!("{}/../fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn args() -> ScenarioArgs {
        ScenarioArgs {
            network: fixture("network.geojson"),
            farms: fixture("farms.json"),
            kc_table: fixture("crop_coefficients.csv"),
            water_users: fixture("water_users.geojson"),
            rows: 4,
            cols: 4,
            transform: vec![0.0, 1.0, 0.0, 4.0, 0.0, -1.0],
            config: None,
        }
    }

    #[test]
    fn test_grid_needs_six_coefficients() {
        let mut bad = args();
        bad.transform = vec![0.0, 1.0];
        assert!(bad.grid().is_err());
        let grid = args().grid().unwrap();
        assert_eq!(grid.shape(), (4, 4));
        assert_eq!(grid.transform.cell_center(0, 0), (0.5, 3.5));
    }

    #[test]
    fn test_scenario_allocator() {
        let scenario = args().load().unwrap();
        let allocator = scenario.allocator().unwrap();
        let factors = allocator.applied_water_factors().unwrap();
        assert_eq!(factors.len(), 2);
        assert_eq!(factors[&2][1], 0.0);
    }

    #[test]
    fn test_run_diversions_writes_series() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("diversions.json");
        run_diversions(
            &args(),
            Some(&fixture("water_use.json")),
            "2020-05-01",
            "05/03/2020",
            output.to_str(),
        )
        .unwrap();

        let doc: NodeSeriesDocument = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(doc.nodes.len(), 3);
        assert_eq!(doc.nodes[0].dates.len(), 3);
        assert_eq!(doc.nodes[2].dates[2].date, "2020/05/03");
    }

    #[test]
    fn test_read_land_use() {
        let grid = read_land_use(&fixture("land_use.json")).unwrap();
        assert_eq!(grid.dim(), (4, 4));
        assert_eq!(grid[[0, 2]], 41);

        let dir = tempfile::tempdir().unwrap();
        let ragged = dir.path().join("ragged.json");
        std::fs::write(&ragged, "[[82, 82], [82]]").unwrap();
        assert!(read_land_use(ragged.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_run_irrigation_uses_configured_classes() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("config.json");
        std::fs::write(&config, r#"{"irrigated_classes": [82]}"#).unwrap();
        let mut scenario_args = args();
        scenario_args.config = config.to_str().map(String::from);
        let output = dir.path().join("irrigation.json");

        run_irrigation(
            &scenario_args,
            &fixture("land_use.json"),
            Some(&fixture("water_use.json")),
            "2020-05-11",
            output.to_str(),
        )
        .unwrap();
        let rows: Vec<Vec<f64>> = serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();

        let scenario = scenario_args.load().unwrap();
        let mut allocator = scenario.allocator().unwrap();
        allocator
            .record_simulation(WaterUse::from_path(fixture("water_use.json")).unwrap())
            .unwrap();
        let table = allocator.compute_diversions(parse_flexible("2020-05-11").unwrap()).unwrap();

        let total: f64 = rows.iter().flatten().sum();
        assert!((total - table.total()).abs() < 1e-9);
        assert!(table.total() > 0.0);
        // forest cell of farm 2 and the unclaimed corner stay dry
        assert_eq!(rows[0][2], 0.0);
        assert_eq!(rows[2][0], 0.0);
        assert!((rows[0][0] - table.farm_total(1).unwrap() / 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_run_diversions_rejects_reversed_range() {
        assert!(run_diversions(&args(), None, "2020-05-03", "2020-05-01", None).is_err());
    }
}
