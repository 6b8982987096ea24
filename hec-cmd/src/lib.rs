//! Command implementations for the hec CLI.
//!
//! Provides subcommands to inspect a river network, compute applied water
//! factors, write daily node diversions, map supplemental irrigation and
//! rewrite farm snapshots.

use clap::{Args, Subcommand};

pub mod export;
pub mod scenario;
pub mod topology;

#[derive(Subcommand)]
pub enum Command {
    /// Print the nodes and reaches of a river network as JSON
    Topology {
        /// Reach GeoJSON with FROM_NODE / TO_NODE properties
        #[arg(short = 'n', long)]
        network: String,
    },

    /// Print the applied water factors of every farm and crop as JSON
    Factors {
        #[command(flatten)]
        scenario: ScenarioArgs,
    },

    /// Write daily node diversions over a date range
    Diversions {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Simulated water use per farm (`{"<farm id>": [per-crop volumes]}`);
        /// defaults to each farm's `watersim`
        #[arg(short = 'u', long)]
        water_use: Option<String>,

        /// First day, inclusive
        #[arg(short = 's', long)]
        start: String,

        /// Last day, inclusive
        #[arg(short = 'e', long)]
        end: String,

        /// Output path for the node series JSON; stdout when omitted
        #[arg(short = 'o', long)]
        output: Option<String>,
    },

    /// Spread one day's diversions over the irrigated cells of a land-use grid
    Irrigation {
        #[command(flatten)]
        scenario: ScenarioArgs,

        /// Land-use classes as a JSON array of rows, shaped like the reference grid
        #[arg(short = 'l', long)]
        land_use: String,

        /// Simulated water use per farm; defaults to each farm's `watersim`
        #[arg(short = 'u', long)]
        water_use: Option<String>,

        /// Day to map
        #[arg(short = 'd', long)]
        date: String,

        /// Output path for the irrigation grid JSON; stdout when omitted
        #[arg(short = 'o', long)]
        output: Option<String>,
    },

    /// Re-write a farm list as a `{"farms": [...]}` snapshot
    Export {
        /// Farm records JSON
        #[arg(short = 'f', long)]
        farms: String,

        /// Output path of the snapshot
        #[arg(short = 'o', long)]
        output: String,
    },
}

/// Inputs shared by the commands that run an allocator.
#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    /// Reach GeoJSON with FROM_NODE / TO_NODE properties
    #[arg(short = 'n', long)]
    pub network: String,

    /// Farm records JSON
    #[arg(short = 'f', long)]
    pub farms: String,

    /// Crop coefficient table (CSV, or tab separated .txt/.tsv)
    #[arg(short = 'k', long)]
    pub kc_table: String,

    /// Water-user polygons GeoJSON
    #[arg(short = 'w', long)]
    pub water_users: String,

    /// Rows of the reference grid
    #[arg(long)]
    pub rows: usize,

    /// Columns of the reference grid
    #[arg(long)]
    pub cols: usize,

    /// GDAL geotransform of the reference grid:
    /// origin_x,pixel_width,row_rotation,origin_y,col_rotation,pixel_height
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub transform: Vec<f64>,

    /// Allocator settings JSON
    #[arg(short = 'c', long)]
    pub config: Option<String>,
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Topology { network } => topology::run_topology(&network),
        Command::Factors { scenario } => scenario::run_factors(&scenario),
        Command::Diversions {
            scenario,
            water_use,
            start,
            end,
            output,
        } => scenario::run_diversions(
            &scenario,
            water_use.as_deref(),
            &start,
            &end,
            output.as_deref(),
        ),
        Command::Irrigation {
            scenario,
            land_use,
            water_use,
            date,
            output,
        } => scenario::run_irrigation(
            &scenario,
            &land_use,
            water_use.as_deref(),
            &date,
            output.as_deref(),
        ),
        Command::Export { farms, output } => export::run_export(&farms, &output),
    }
}
