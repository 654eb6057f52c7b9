use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::NaiveTime;
use clap::Parser;

use travel_optimizer::{
    OptimizerConfig, PlanOptions, Query, RoutePlanner, TimeWindow, TransportMode,
    TravelOptimizerError, logging, summary,
};

/// Find and rank flight, train and bus options between two cities
#[derive(Parser, Debug)]
#[command(name = "travel-optimizer", version)]
struct Cli {
    /// Departure city or airport code
    #[arg(long)]
    origin: String,

    /// Arrival city or airport code
    #[arg(long)]
    destination: String,

    /// Travel date, YYYY-MM-DD
    #[arg(long)]
    date: String,

    /// Checked bags that must be included
    #[arg(long)]
    bags: Option<u32>,

    /// Minimum weight allowance per checked bag in kg
    #[arg(long)]
    min_bag_weight: Option<f64>,

    /// Maximum number of connections
    #[arg(long)]
    max_connections: Option<u32>,

    /// Weight of travel time in the score
    #[arg(long)]
    w_time: Option<f64>,

    /// Weight of price in the score
    #[arg(long)]
    w_cost: Option<f64>,

    /// Weight of fewer connections in the score
    #[arg(long)]
    w_convenience: Option<f64>,

    /// Number of results to show
    #[arg(long)]
    top_n: Option<usize>,

    /// Minimum price in EUR
    #[arg(long)]
    min_price: Option<f64>,

    /// Maximum price in EUR
    #[arg(long)]
    max_price: Option<f64>,

    /// Maximum travel time in hours
    #[arg(long)]
    max_hours: Option<f64>,

    /// Earliest departure time, HH:MM
    #[arg(long, value_parser = parse_time)]
    depart_after: Option<NaiveTime>,

    /// Latest departure time, HH:MM
    #[arg(long, value_parser = parse_time)]
    depart_before: Option<NaiveTime>,

    /// Earliest arrival time, HH:MM
    #[arg(long, value_parser = parse_time)]
    arrive_after: Option<NaiveTime>,

    /// Latest arrival time, HH:MM
    #[arg(long, value_parser = parse_time)]
    arrive_before: Option<NaiveTime>,

    /// Only consider these modes (flight, train, bus); repeatable
    #[arg(long = "mode")]
    modes: Vec<TransportMode>,

    /// Only consider these carriers; repeatable
    #[arg(long = "carrier")]
    carriers: Vec<String>,

    /// Never consider these carriers; repeatable
    #[arg(long = "exclude-carrier")]
    excluded_carriers: Vec<String>,

    /// Print the full plan as JSON
    #[arg(long)]
    json: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(short, long, env = "TRAVEL_OPTIMIZER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Command-line flags layered over the configured defaults
    fn plan_options(&self, defaults: PlanOptions) -> PlanOptions {
        PlanOptions {
            max_connections: self.max_connections.or(defaults.max_connections),
            required_bags: self.bags.unwrap_or(defaults.required_bags),
            min_bag_weight_kg: self.min_bag_weight.or(defaults.min_bag_weight_kg),
            min_price: self.min_price.or(defaults.min_price),
            max_price: self.max_price.or(defaults.max_price),
            max_duration_hours: self.max_hours.or(defaults.max_duration_hours),
            departure_window: TimeWindow::from_bounds(self.depart_after, self.depart_before)
                .or(defaults.departure_window),
            arrival_window: TimeWindow::from_bounds(self.arrive_after, self.arrive_before)
                .or(defaults.arrival_window),
            modes: if self.modes.is_empty() {
                defaults.modes
            } else {
                self.modes.clone()
            },
            preferred_carriers: if self.carriers.is_empty() {
                defaults.preferred_carriers
            } else {
                self.carriers.clone()
            },
            excluded_carriers: if self.excluded_carriers.is_empty() {
                defaults.excluded_carriers
            } else {
                self.excluded_carriers.clone()
            },
            weight_time: self.w_time.unwrap_or(defaults.weight_time),
            weight_cost: self.w_cost.unwrap_or(defaults.weight_cost),
            weight_convenience: self.w_convenience.unwrap_or(defaults.weight_convenience),
            top_n: self.top_n.or(defaults.top_n),
        }
    }
}

fn parse_time(value: &str) -> std::result::Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| format!("invalid time '{value}', expected HH:MM: {e}"))
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<TravelOptimizerError>() {
                Some(err) => eprintln!("{}", err.user_message()),
                None => eprintln!("Error: {e:#}"),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = OptimizerConfig::load_from_path(cli.config.clone())?;
    logging::init_tracing(&config.logging, cli.verbose);

    let options = cli.plan_options(config.defaults.plan_options());
    let query = Query::from_options(&cli.origin, &cli.destination, &cli.date, &options)?;

    let planner = RoutePlanner::from_config(&config);
    let plan = planner.plan(&query).await?;

    if cli.json {
        let json = serde_json::to_string_pretty(&plan).context("Failed to serialize plan")?;
        println!("{json}");
    } else {
        println!("{}", summary::format_results(&plan.results));
        println!();
        println!("{}", summary::describe(&plan, &query));
    }

    Ok(())
}
