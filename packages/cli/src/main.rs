#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for surplus.
//!
//! Converts a Plus Code, local code, coordinate pair or place name into
//! shareable text (or any other [`ConversionResultType`]) using the public
//! Nominatim instance.
//!
//! ```text
//! surplus 8QMF+FX Singapore
//! surplus -c pluscode 1.3336875, 103.7749375
//! echo "Wisma Atria" | surplus -
//! ```

use std::io::Read;
use std::process::ExitCode;

use clap::Parser;
use strum::IntoEnumIterator as _;
use surplus::{ErrorKind, Surplus, SurplusError, VERSION};
use surplus_geocoder::NominatimGeocoder;
use surplus_models::ConversionResultType;
use surplus_query::ParseOptions;
use thiserror::Error;

/// Google Maps Plus Code to iOS Shortcuts-like shareable text.
#[derive(Debug, Parser)]
#[command(name = "surplus")]
#[command(disable_version_flag = true, allow_negative_numbers = true)]
struct Cli {
    /// Full-length Plus Code (6PH58QMF+FX), local code (8QMF+FX Singapore),
    /// latlong (1.3336875, 103.7749375), string query, or '-' to read from
    /// stdin.
    query: Vec<String>,

    /// Print debug information to stderr.
    #[arg(short, long)]
    debug: bool,

    /// Print version information and exit.
    #[arg(short = 'v', long)]
    version: bool,

    /// Converts query to a specific output type.
    #[arg(
        short = 'c',
        long,
        default_value_t = ConversionResultType::ShareableText,
        value_parser = parse_result_type,
    )]
    convert_to: ConversionResultType,

    /// Use a custom user agent string.
    #[arg(short = 'u', long)]
    user_agent: Option<String>,

    /// Print the user agent string to use and exit: the '--user-agent'
    /// value if given, otherwise the fingerprinted default.
    #[arg(long)]
    show_user_agent: bool,

    /// Treat the query as the JSON output of 'termux-location'.
    #[arg(short = 't', long)]
    using_termux_location: bool,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("could not read query from stdin: {0}")]
    Stdin(#[from] std::io::Error),

    #[error(transparent)]
    Surplus(#[from] SurplusError),
}

impl CliError {
    /// `1` no usable input, `2` unparseable query, `3` resolution failure.
    const fn exit_status(&self) -> u8 {
        match self {
            Self::Stdin(_) => 1,
            Self::Surplus(e) => match e.kind() {
                ErrorKind::Input => 1,
                ErrorKind::Parse => 2,
                ErrorKind::Resolution => 3,
            },
        }
    }
}

fn parse_result_type(value: &str) -> Result<ConversionResultType, String> {
    value.parse().map_err(|_| {
        let choices: Vec<String> = ConversionResultType::iter()
            .map(|t| t.as_ref().to_string())
            .collect();
        format!("expected one of: {}", choices.join(", "))
    })
}

fn init_logger(debug: bool) {
    let mut builder = pretty_env_logger::formatted_builder();

    if std::env::var_os("RUST_LOG").is_some() {
        builder.parse_env("RUST_LOG");
    } else if debug {
        builder.parse_filters("warn,surplus=debug");
    } else {
        builder.parse_filters("warn");
    }

    builder.try_init().ok(); // Ignore error if logger was already set
}

fn version_header(debug: bool) -> String {
    if debug {
        format!("surplus version {VERSION}, debug mode")
    } else {
        format!("surplus version {VERSION}")
    }
}

/// Returns the query text: the positional tokens joined by spaces, or
/// every trimmed line of `stdin` when the only token is `-`.
fn query_text(tokens: &[String], stdin: impl Read) -> std::io::Result<String> {
    if matches!(tokens, [token] if token == "-") {
        let input = std::io::read_to_string(stdin)?;
        return Ok(input.lines().map(str::trim).collect::<Vec<_>>().join("\n"));
    }

    Ok(tokens.join(" "))
}

/// The `-u` override, or the fingerprinted default for this host.
fn effective_user_agent(cli: &Cli) -> String {
    cli.user_agent
        .clone()
        .unwrap_or_else(|| surplus_geocoder::default_user_agent(VERSION))
}

fn run(cli: &Cli, user_agent: &str) -> Result<String, CliError> {
    let query = query_text(&cli.query, std::io::stdin().lock())?;
    log::debug!("query: {query:?}");

    let service = surplus_geocoder::service_registry::nominatim();
    let nominatim = NominatimGeocoder::new(&service, user_agent).map_err(SurplusError::from)?;
    let surplus = Surplus::new(&nominatim, &nominatim);

    let options = ParseOptions {
        using_termux_location: cli.using_termux_location,
    };

    Ok(surplus.convert_str(&query, &options, cli.convert_to)?)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logger(cli.debug);

    let header = version_header(cli.debug);
    if cli.version {
        println!("{header}");
        return ExitCode::SUCCESS;
    }
    eprintln!("{header}");

    let user_agent = effective_user_agent(&cli);
    log::debug!("user agent: {user_agent}");

    if cli.show_user_agent {
        println!("{user_agent}");
        return ExitCode::SUCCESS;
    }

    match run(&cli, &user_agent) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(e.exit_status())
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory as _;
    use surplus_query::QueryError;

    use super::*;

    fn tokens(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults_to_shareable_text() {
        let cli = Cli::try_parse_from(["surplus", "8QMF+FX", "Singapore"]).unwrap();
        assert_eq!(cli.convert_to, ConversionResultType::ShareableText);
        assert_eq!(cli.query, tokens(&["8QMF+FX", "Singapore"]));
        assert!(!cli.debug);
        assert!(!cli.using_termux_location);
    }

    #[test]
    fn parses_every_result_type() {
        for (value, expected) in [
            ("pluscode", ConversionResultType::PlusCode),
            ("localcode", ConversionResultType::LocalCode),
            ("latlong", ConversionResultType::Latlong),
            ("sharetext", ConversionResultType::ShareableText),
        ] {
            let cli = Cli::try_parse_from(["surplus", "-c", value, "x"]).unwrap();
            assert_eq!(cli.convert_to, expected);
        }

        assert!(Cli::try_parse_from(["surplus", "-c", "geojson", "x"]).is_err());
    }

    #[test]
    fn short_flags() {
        let cli =
            Cli::try_parse_from(["surplus", "-d", "-t", "-u", "custom/1.0", "{}"]).unwrap();
        assert!(cli.debug);
        assert!(cli.using_termux_location);
        assert_eq!(cli.user_agent.as_deref(), Some("custom/1.0"));

        let cli = Cli::try_parse_from(["surplus", "-v"]).unwrap();
        assert!(cli.version);

        let cli = Cli::try_parse_from(["surplus", "-33.8688", "151.2093"]).unwrap();
        assert_eq!(cli.query, tokens(&["-33.8688", "151.2093"]));
    }

    #[test]
    fn shown_user_agent_prefers_override() {
        let cli = Cli::try_parse_from(["surplus", "--show-user-agent"]).unwrap();
        assert_eq!(
            effective_user_agent(&cli),
            surplus_geocoder::default_user_agent(VERSION)
        );

        let cli =
            Cli::try_parse_from(["surplus", "--show-user-agent", "-u", "custom/1.0"]).unwrap();
        assert_eq!(effective_user_agent(&cli), "custom/1.0");
    }

    #[test]
    fn tokens_are_joined_with_spaces() {
        let query = query_text(&tokens(&["1.3336875,", "103.7749375"]), std::io::empty()).unwrap();
        assert_eq!(query, "1.3336875, 103.7749375");
    }

    #[test]
    fn dash_reads_trimmed_lines_from_stdin() {
        let stdin = "  8QMF+FX  \n Singapore \n".as_bytes();
        let query = query_text(&tokens(&["-"]), stdin).unwrap();
        assert_eq!(query, "8QMF+FX\nSingapore");
    }

    #[test]
    fn dash_among_other_tokens_is_literal() {
        let query = query_text(&tokens(&["Ang", "Mo", "Kio", "-"]), std::io::empty()).unwrap();
        assert_eq!(query, "Ang Mo Kio -");
    }

    #[test]
    fn version_header_mentions_debug_mode() {
        assert_eq!(version_header(false), format!("surplus version {VERSION}"));
        assert!(version_header(true).ends_with(", debug mode"));
    }

    #[test]
    fn exit_codes_follow_error_kind() {
        let status = |e: SurplusError| CliError::from(e).exit_status();

        assert_eq!(status(QueryError::EmptyQuery.into()), 1);
        assert_eq!(status(QueryError::PlusCodeNotFound.into()), 2);
        assert_eq!(
            status(
                QueryError::LatlongParse {
                    message: "could not parse termux-location json".to_string()
                }
                .into()
            ),
            2
        );
        assert_eq!(
            status(surplus_models::GeocodeError::RateLimited.into()),
            3
        );
    }
}
