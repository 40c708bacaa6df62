// CardForge - Command Line
// Every subcommand is one façade request printed to stdout

use anyhow::{bail, Context, Result};
use cardforge::api::{
    ApiResponse, GenerateAddressRequest, GenerateAddressesRequest, GenerateCardRequest,
    GenerateCardsRequest, GenerateNameRequest, LoginRequest,
};
use cardforge::config::AppConfig;
use cardforge::{CardType, Forge, Gender, GenerateOptions, OutputFormat};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cardforge", version, about = "Test card, address and identity generator")]
struct Cli {
    /// Configuration file (defaults apply when missing)
    #[arg(short, long, global = true, default_value = "cardforge.toml")]
    config: PathBuf,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate one card
    Card {
        pattern: String,
        #[command(flatten)]
        options: CardArgs,
    },
    /// Generate many cards
    Cards {
        pattern: String,
        #[arg(short = 'n', long, default_value_t = 10)]
        count: i64,
        #[arg(short, long, default_value = "plain")]
        format: OutputFormat,
        #[command(flatten)]
        options: CardArgs,
    },
    /// Sample an address from the dataset
    Address {
        /// Address CSV (overrides dataset.path)
        #[arg(short, long)]
        dataset: Option<PathBuf>,
        #[arg(long)]
        state: Option<String>,
        #[arg(long)]
        country: Option<String>,
        /// Attach a generated name, email and phone
        #[arg(long)]
        with_name: bool,
        #[arg(short, long, default_value = "any")]
        gender: Gender,
        /// Number of addresses to draw
        #[arg(short = 'n', long, default_value_t = 1)]
        count: i64,
    },
    /// Generate a person name with email and phone
    Name {
        #[arg(short, long, default_value = "any")]
        gender: Gender,
        #[arg(long)]
        country: Option<String>,
    },
    /// List active BIN patterns
    Bins,
    /// Print the config store location
    ConfigPath,
    /// Restore the store to factory defaults (admin credential required)
    Reset {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Write the default configuration file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args)]
struct CardArgs {
    /// Total digits including the check digit
    #[arg(short, long)]
    length: Option<usize>,
    /// Expiry horizon in years
    #[arg(short, long)]
    years: Option<u32>,
    /// Card type label instead of prefix detection
    #[arg(short = 't', long = "type")]
    card_type: Option<CardType>,
    /// Fixed expiry month (1-12), used with --exp-year
    #[arg(long, requires = "exp_year")]
    exp_month: Option<u32>,
    /// Fixed expiry year (YY or YYYY), used with --exp-month
    #[arg(long, requires = "exp_month")]
    exp_year: Option<i32>,
    /// CVV length, 3 or 4
    #[arg(long)]
    cvv_length: Option<usize>,
}

impl From<CardArgs> for GenerateOptions {
    fn from(args: CardArgs) -> Self {
        GenerateOptions {
            length: args.length,
            years_ahead: args.years,
            card_type: args.card_type,
            exp_month: args.exp_month,
            exp_year: args.exp_year,
            cvv_length: args.cvv_length,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    if let Command::InitConfig { force } = cli.command {
        if cli.config.exists() && !force {
            bail!("{} already exists (use --force)", cli.config.display());
        }
        AppConfig::save_default(&cli.config)?;
        println!("✓ Wrote {}", cli.config.display());
        return Ok(());
    }

    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let forge = Forge::open(config).context("opening config store")?;

    match cli.command {
        Command::Card { pattern, options } => {
            let card = envelope(forge.generate_card(&GenerateCardRequest {
                pattern,
                options: options.into(),
            }))?;
            if let Some(card) = card {
                print!("{}", terminal_text(&OutputFormat::Plain.render(&[card])?));
            }
        }
        Command::Cards {
            pattern,
            count,
            format,
            options,
        } => {
            let generated = envelope(forge.generate_cards(&GenerateCardsRequest {
                pattern,
                count,
                format: Some(format),
                options: options.into(),
            }))?;
            if let Some(generated) = generated {
                print!("{}", terminal_text(&generated.rendered));
            }
        }
        Command::Address {
            dataset,
            state,
            country,
            with_name,
            gender,
            count,
        } => {
            if let Some(path) = dataset {
                envelope(forge.load_dataset(&path))?;
            }
            let address = GenerateAddressRequest {
                country,
                state,
                include_name: with_name,
                gender,
            };
            if count == 1 {
                let record = envelope(forge.generate_address(&address))?;
                println!("{}", serde_json::to_string_pretty(&record)?);
            } else {
                let records = envelope(
                    forge.generate_addresses(&GenerateAddressesRequest { count, address }),
                )?;
                println!("{}", serde_json::to_string_pretty(&records)?);
            }
        }
        Command::Name { gender, country } => {
            let name = envelope(forge.generate_name(&GenerateNameRequest { gender, country }))?;
            println!("{}", serde_json::to_string_pretty(&name)?);
        }
        Command::Bins => {
            for bin in envelope(forge.get_active_bins())?.unwrap_or_default() {
                println!(
                    "{}  {:<12} {}",
                    bin.pattern,
                    bin.card_type.as_str(),
                    bin.description
                );
            }
        }
        Command::ConfigPath => {
            if let Some(path) = envelope(forge.get_config_path())? {
                println!("{}", path.path);
            }
        }
        Command::Reset { username, password } => {
            let session = envelope(forge.admin_login(&LoginRequest { username, password }))?
                .context("login returned no session")?;
            envelope(forge.reset_config(&session.token))?;
            println!("✓ Configuration restored to defaults");
        }
        Command::InitConfig { .. } => unreachable!("handled before the store is opened"),
    }

    Ok(())
}

/// Rendered output with exactly one trailing newline
fn terminal_text(rendered: &str) -> String {
    format!("{}\n", rendered.trim_end())
}

/// Turn a failed envelope into a CLI error
fn envelope<T>(response: ApiResponse<T>) -> Result<Option<T>> {
    if !response.success {
        let kind = response.error.map(|k| k.as_str()).unwrap_or("error");
        bail!(
            "{}: {}",
            kind,
            response.message.unwrap_or_else(|| "request failed".to_string())
        );
    }
    Ok(response.data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_text_ends_with_one_newline() {
        assert_eq!(terminal_text("4111111111111111"), "4111111111111111\n");
        assert_eq!(terminal_text("a\nb"), "a\nb\n");
        // csv rendering already ends its last record
        assert_eq!(terminal_text("number\n4111\n"), "number\n4111\n");
    }

    #[test]
    fn test_fixed_expiry_flags_reach_options() {
        let cli = Cli::parse_from([
            "cardforge", "cards", "552461xxxxxxxxxx", "--exp-month", "3", "--exp-year", "28",
            "--cvv-length", "4",
        ]);
        let Command::Cards { options, .. } = cli.command else {
            panic!("expected cards subcommand");
        };

        let options = GenerateOptions::from(options);
        assert_eq!(options.exp_month, Some(3));
        assert_eq!(options.exp_year, Some(28));
        assert_eq!(options.cvv_length, Some(4));
    }

    #[test]
    fn test_exp_month_requires_exp_year() {
        let result = Cli::try_parse_from(["cardforge", "card", "552461", "--exp-month", "3"]);
        assert!(result.is_err());
    }
}
