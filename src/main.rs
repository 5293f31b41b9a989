use chrono::{Local, NaiveDate};
use docopt::Docopt;
use serde::Deserialize;
use std::fs::{self, File};

use libcams::aggregate::aggregate;
use libcams::config::SolverConfig;
use libcams::parser::Parser;
use libcams::report;
use libcams::returns;
use libcams::statement::Statement;
use libcams::Error;

const USAGE: &str = "
CAMS Statement XIRR

Usage:
  cams2xirr report (--pdf=<pdf> --password=<password> | --text=<text-file>) [--as-of=<date>] [--config=<config-file>] [--json]
  cams2xirr transactions (--pdf=<pdf> --password=<password> | --text=<text-file>)
  cams2xirr (-h | --help)
  cams2xirr --version

Options:
  -h --help                   Show this screen.
  --version                   Show version.
  --pdf=<pdf>                 Password-protected statement PDF.
  --password=<password>       Password of the statement PDF.
  --text=<text-file>          Statement text already extracted from the PDF.
  --as-of=<date>              Valuation date (YYYY-MM-DD) for current market values.
                              Defaults to the statement's market value date.
  --config=<config-file>      JSON file with solver settings.
  --json                      Print the report as JSON.
";

#[derive(Debug, Deserialize)]
struct Args {
    cmd_report: bool,
    cmd_transactions: bool,
    flag_pdf: Option<String>,
    flag_password: Option<String>,
    flag_text: Option<String>,
    flag_as_of: Option<String>,
    flag_config: Option<String>,
    flag_json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = Docopt::new(USAGE)
        .map(|d| d.version(Some(env!("CARGO_PKG_VERSION").to_string())))
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    if args.cmd_transactions {
        show_transactions(&args)?;
    }

    if args.cmd_report {
        show_report(&args)?;
    }

    Ok(())
}

fn load_statement(args: &Args) -> Result<Statement, Error> {
    let mut parser = Parser::new();
    match (&args.flag_text, &args.flag_pdf) {
        (Some(text_filename), _) => {
            let text = fs::read_to_string(text_filename)?;
            parser.parse_text(&text)
        }
        (None, Some(pdf_filename)) => {
            let pdf_file = File::open(pdf_filename)?;
            let password = args.flag_password.as_deref().unwrap_or_default();
            parser.parse(pdf_file, password)
        }
        (None, None) => Err(Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            "no statement given",
        ))),
    }
}

fn show_transactions(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut statement = load_statement(args)?;
    statement.calculate_fund_overview();
    let j = serde_json::to_string_pretty(&statement)?;
    println!("{}", j);
    Ok(())
}

fn show_report(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = match &args.flag_config {
        Some(config_filename) => SolverConfig::from_file(config_filename)?,
        None => SolverConfig::default(),
    };

    let statement = load_statement(args)?;
    let as_of = match &args.flag_as_of {
        Some(date) => NaiveDate::parse_from_str(date, "%Y-%m-%d")
            .map_err(|_| Error::Date(date.to_string()))?,
        None => statement
            .valuation_date()
            .unwrap_or_else(|| Local::now().date_naive()),
    };

    let aggregation = aggregate(&statement.cash_flows(), &statement.market_values(), as_of);
    let returns = returns::compute(&aggregation, &config);

    if args.flag_json {
        println!("{}", report::to_json(&returns)?);
    } else {
        print!("{}", report::render(&returns));
    }
    Ok(())
}
