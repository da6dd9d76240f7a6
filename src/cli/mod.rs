//! Command-line parsing for the `lsfit` lineshape fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! fitting code and from command dispatch (`app`).

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::domain::{LorentzianGuess, TripletGuess};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "lsfit", version, about = "Lorentzian lineshape fitting and EOM sideband calibration")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). `LSFIT_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a single Lorentzian and print the parameters.
    Fit(FitArgs),
    /// Fit a carrier plus two sidebands (Lorentzian triplet).
    Triplet(TripletArgs),
    /// Calibrate the x-axis from the EOM sidebands and write the calibrated trace.
    Calibrate(CalibrateArgs),
    /// Report the carrier linewidth in calibrated units.
    Linewidth(LinewidthArgs),
    /// Normalize a transmission dip against a baseline trace.
    Normalize(NormalizeArgs),
    /// Linewidths for many traces in parallel.
    Batch(BatchArgs),
    /// Write a synthetic noisy triplet trace.
    Simulate(SimulateArgs),
    /// Equivalent noise bandwidth of the analyzer's Kaiser window.
    Enbw(EnbwArgs),
    /// Plot a previously exported fit report.
    Plot(PlotArgs),
}

/// Input trace selection.
#[derive(Debug, Args, Clone)]
pub struct TraceArgs {
    /// Trace CSV with `x,y` columns (optional header row).
    #[arg(value_name = "CSV")]
    pub input: PathBuf,

    /// The y column is in dB; convert to linear power before fitting.
    #[arg(long)]
    pub db: bool,
}

/// Output and solver options shared by the fitting subcommands.
#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    /// Render an ASCII plot of the data and the fit.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Export the fit (params + errors + fitted grid) to JSON.
    #[arg(long = "export-json", value_name = "PATH")]
    pub export_json: Option<PathBuf>,

    /// JSON file with Levenberg-Marquardt settings (missing keys keep defaults).
    #[arg(long = "solver-config", value_name = "JSON", env = "LSFIT_SOLVER_CONFIG")]
    pub solver_config: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub trace: TraceArgs,

    /// Fit a dip: seed the center at the minimum instead of the maximum.
    #[arg(long)]
    pub invert: bool,

    #[arg(long, allow_negative_numbers = true)]
    pub x0: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub y0: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub amp: Option<f64>,
    #[arg(long)]
    pub fwhm: Option<f64>,

    #[command(flatten)]
    pub output: OutputArgs,
}

impl FitArgs {
    pub fn guess(&self) -> LorentzianGuess {
        LorentzianGuess {
            x0: self.x0,
            y0: self.y0,
            amp: self.amp,
            fwhm: self.fwhm,
        }
    }
}

#[derive(Debug, Args, Clone)]
pub struct TripletArgs {
    #[command(flatten)]
    pub trace: TraceArgs,

    /// Estimate seeds for a dip triplet (minimum) instead of a peak triplet.
    #[arg(long)]
    pub inverted: bool,

    /// Explicit seeds. Setting any of these disables automatic estimation.
    #[command(flatten)]
    pub seeds: TripletSeedArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone, Default)]
pub struct TripletSeedArgs {
    #[arg(long, allow_negative_numbers = true)]
    pub x0: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub y0: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub amp: Option<f64>,
    #[arg(long)]
    pub fwhm: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub xl: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub ampl: Option<f64>,
    #[arg(long)]
    pub fwhml: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub xr: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    pub ampr: Option<f64>,
    #[arg(long)]
    pub fwhmr: Option<f64>,
}

impl TripletSeedArgs {
    pub fn guess(&self) -> TripletGuess {
        TripletGuess {
            x0: self.x0,
            y0: self.y0,
            amp: self.amp,
            fwhm: self.fwhm,
            xl: self.xl,
            ampl: self.ampl,
            fwhml: self.fwhml,
            xr: self.xr,
            ampr: self.ampr,
            fwhmr: self.fwhmr,
        }
    }
}

/// EOM settings shared by the calibration subcommands.
#[derive(Debug, Args, Clone)]
pub struct EomArgs {
    /// EOM modulation frequency; sidebands sit at +/- this value (e.g. MHz).
    #[arg(long = "eom", value_name = "FREQ", env = "LSFIT_EOM_FREQUENCY")]
    pub eom_frequency: f64,

    /// The features are peaks, not transmission dips.
    #[arg(long)]
    pub no_invert: bool,
}

#[derive(Debug, Args, Clone)]
pub struct CalibrateArgs {
    #[command(flatten)]
    pub trace: TraceArgs,

    #[command(flatten)]
    pub eom: EomArgs,

    /// Calibrated CSV output (default: `calibrated_<timestamp>.csv`).
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct LinewidthArgs {
    #[command(flatten)]
    pub trace: TraceArgs,

    #[command(flatten)]
    pub eom: EomArgs,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct NormalizeArgs {
    #[command(flatten)]
    pub trace: TraceArgs,

    /// Baseline trace CSV (off-resonance transmission); its y column is averaged.
    #[arg(long, value_name = "CSV")]
    pub baseline: PathBuf,

    /// Normalized CSV output (default: `normalized_<timestamp>.csv`).
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,

    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args, Clone)]
pub struct BatchArgs {
    /// Trace CSV files.
    #[arg(value_name = "CSV", required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,

    /// The y columns are in dB.
    #[arg(long)]
    pub db: bool,

    #[command(flatten)]
    pub eom: EomArgs,

    /// Write the batch results as CSV (`trace,fwhm,fwhm_err`).
    #[arg(long, value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// JSON file with Levenberg-Marquardt settings.
    #[arg(long = "solver-config", value_name = "JSON", env = "LSFIT_SOLVER_CONFIG")]
    pub solver_config: Option<PathBuf>,

    /// Hide the progress line.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Args, Clone)]
pub struct SimulateArgs {
    /// Output CSV.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Number of samples.
    #[arg(short = 'n', long, default_value_t = 2001)]
    pub points: usize,

    #[arg(long, default_value_t = -1.0, allow_negative_numbers = true)]
    pub x_min: f64,

    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub x_max: f64,

    /// Standard deviation of the additive Gaussian noise.
    #[arg(long, default_value_t = 0.005)]
    pub noise: f64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Generate a dip triplet (negated amplitudes).
    #[arg(long)]
    pub dip: bool,

    #[arg(long)]
    pub plot: bool,
}

#[derive(Debug, Args, Clone)]
pub struct EnbwArgs {
    /// Number of samples in the acquisition.
    #[arg(long)]
    pub samples: usize,

    /// Acquisition time in seconds.
    #[arg(long = "time", value_name = "SECONDS")]
    pub acquisition_time: f64,
}

/// Options for plotting a saved fit report.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Fit JSON produced by `--export-json`.
    #[arg(long, value_name = "JSON")]
    pub report: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn triplet_seeds_parse_into_guess() {
        let cli = Cli::parse_from(["lsfit", "triplet", "t.csv", "--xl=-0.5", "--fwhmr", "0.05"]);
        let Command::Triplet(args) = cli.command else {
            panic!("expected triplet subcommand");
        };
        let guess = args.seeds.guess();
        assert_eq!(guess.xl, Some(-0.5));
        assert_eq!(guess.fwhmr, Some(0.05));
        assert_eq!(guess.x0, None);
        assert!(!args.inverted);
    }

    #[test]
    fn linewidth_requires_eom_and_counts_verbosity() {
        let cli = Cli::parse_from(["lsfit", "-vv", "linewidth", "t.csv", "--eom", "10", "--no-invert"]);
        assert_eq!(cli.verbose, 2);
        let Command::Linewidth(args) = cli.command else {
            panic!("expected linewidth subcommand");
        };
        assert_eq!(args.eom.eom_frequency, 10.0);
        assert!(args.eom.no_invert);
    }
}
