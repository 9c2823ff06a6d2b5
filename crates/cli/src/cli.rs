//! Command-line surface.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

use techpassport_location_plan::{CoordinatePoint, PlanScale};
use techpassport_observability::LogFormat;

#[derive(Debug, Parser)]
#[command(name = "techpassport")]
#[command(about = "Location plans of building technical passports")]
pub struct Cli {
    /// Database file, or `:memory:` (overrides TECHPASSPORT_DB_PATH)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Log output: `json` or `pretty` (overrides TECHPASSPORT_LOG_FORMAT)
    #[arg(long, global = true, value_parser = parse_log_format)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a plan, or update the fields of an existing one
    Init {
        /// Passport id; a new one is generated when omitted
        passport: Option<String>,

        #[arg(long, value_parser = parse_scale)]
        scale: PlanScale,

        #[arg(long)]
        executor: Option<String>,

        /// Plan date, YYYY-MM-DD
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,

        #[arg(long)]
        notes: Option<String>,

        /// Raster image of the plan
        #[arg(long)]
        image: Option<String>,
    },

    /// Print a plan as JSON
    Show {
        passport: String,

        /// Also print the regional coordinate system for this region code
        #[arg(long)]
        region: Option<String>,
    },

    /// Add a building outline
    AddBuilding {
        passport: String,

        #[arg(long)]
        litera: String,

        #[arg(long)]
        description: Option<String>,

        /// Vertex as `X:Y`; repeat for each point, in order
        #[arg(long = "point", value_parser = parse_point, required = true)]
        points: Vec<CoordinatePoint>,
    },

    /// Remove a building by litera
    RemoveBuilding { passport: String, litera: String },

    /// Change the scale of an existing plan
    SetScale {
        passport: String,

        #[arg(value_parser = parse_scale)]
        scale: PlanScale,
    },

    /// Delete a plan with all of its buildings
    Delete { passport: String },

    /// List allowed plan scales
    Scales,

    /// List known regional coordinate systems
    Regions,
}

fn parse_log_format(raw: &str) -> Result<LogFormat, String> {
    raw.parse::<LogFormat>().map_err(|e| e.to_string())
}

fn parse_scale(raw: &str) -> Result<PlanScale, String> {
    PlanScale::parse(raw).map_err(|e| e.to_string())
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| format!("{raw}: {e}"))
}

/// `X:Y`, each side with `.` or `,` as decimal separator.
fn parse_point(raw: &str) -> Result<CoordinatePoint, String> {
    let (x, y) = raw
        .split_once(':')
        .ok_or_else(|| format!("point '{raw}' must look like X:Y"))?;
    CoordinatePoint::from_strings(x, y).map_err(|e| e.to_string())
}
