//! Command line surface of `near-aggregator`

use analytics_common::Clock;
use clap::Parser;

use crate::error::AggregatorError;
use crate::registry::AggregationRegistry;
use crate::scheduler::RunMode;

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(author, version, about = "Compute NEAR analytics aggregations", long_about = None)]
pub struct Cli {
    /// Unix timestamp (seconds) inside the window to compute; defaults to yesterday
    #[arg(short, long, conflicts_with = "all")]
    pub timestamp: Option<i64>,

    /// Aggregations to compute; defaults to every registered one
    #[arg(short = 's', long = "stats-types", num_args = 1..)]
    pub stats_types: Vec<String>,

    /// Recompute all history since genesis
    #[arg(short, long)]
    pub all: bool,
}

impl Cli {
    pub fn run_mode(&self, clock: &dyn Clock) -> Result<RunMode, AggregatorError> {
        RunMode::from_options(self.timestamp, self.all, clock)
    }

    /// Requested names, or every registered aggregation in registry order
    pub fn requested(&self, registry: &AggregationRegistry) -> Vec<String> {
        if self.stats_types.is_empty() {
            registry.names()
        } else {
            self.stats_types.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analytics_common::FixedClock;

    #[test]
    fn test_defaults_to_yesterday() {
        let cli = Cli::try_parse_from(["near-aggregator"]).unwrap();
        let mode = cli.run_mode(&FixedClock(1_000_000)).unwrap();
        assert_eq!(mode, RunMode::At(1_000_000 - 86_400));
        assert!(cli.stats_types.is_empty());
    }

    #[test]
    fn test_parses_names_and_timestamp() {
        let cli = Cli::try_parse_from([
            "near-aggregator",
            "-t",
            "1615984496",
            "-s",
            "deployed_contracts",
            "unique_contracts",
        ])
        .unwrap();

        assert_eq!(cli.timestamp, Some(1_615_984_496));
        assert_eq!(cli.stats_types, ["deployed_contracts", "unique_contracts"]);
    }

    #[test]
    fn test_all_conflicts_with_timestamp() {
        assert!(Cli::try_parse_from(["near-aggregator", "--all", "-t", "1"]).is_err());
    }

    #[test]
    fn test_full_history() {
        let cli = Cli::try_parse_from(["near-aggregator", "-a"]).unwrap();
        assert_eq!(cli.run_mode(&FixedClock(0)).unwrap(), RunMode::FullHistory);
    }
}
