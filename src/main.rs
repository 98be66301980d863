//! askdb entry point.

use std::process::ExitCode;

use askdb::cli::{self, Cli, Command};
use askdb::config::{Config, ConnectionProfile};
use askdb::error::{AskdbError, Result};
use askdb::llm::{GeminiClient, GeminiConfig, LlmClient, LlmProvider, MockLlmClient, SqlGenerator};
use askdb::session::Session;
use askdb::{logging, sample};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    logging::init_stderr_logging();

    let cli = Cli::parse_args();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_from_file(&cli.config_path())?;

    // create-sample needs no connection.
    if let Command::CreateSample { path } = &cli.command {
        sample::create_sample_database(path).await?;
        println!("Sample database created at {}", path.display());
        return Ok(());
    }

    let profile = resolve_profile(&cli, &config)?;
    let generator = build_generator(&cli, &config)?;

    let mut session = Session::new(generator);
    session.connect(profile).await?;

    let outcome = dispatch(&cli.command, &mut session).await;
    session.close().await;
    outcome
}

async fn dispatch(command: &Command, session: &mut Session) -> Result<()> {
    match command {
        Command::Test => {
            let (ok, message) = session.test_connection().await;
            println!("{message}");
            if !ok {
                return Err(AskdbError::connection("connection test failed"));
            }
        }
        Command::Schema => {
            println!("{}", session.schema_report().await?);
        }
        Command::Tables => {
            for table in session.list_tables().await? {
                println!("{table}");
            }
        }
        Command::Sql { question } => {
            println!("{}", session.generate_sql(question).await?);
        }
        Command::Ask { question } => {
            let (sql, result) = session.ask(question).await?;
            println!("{sql}\n");
            println!("{}", result.format_text());
        }
        Command::Run { sql } => {
            let result = session.run_sql(sql).await?;
            println!("{}", result.format_text());
        }
        Command::CreateSample { .. } => unreachable!("handled before connecting"),
    }
    Ok(())
}

/// Resolves the connection profile: CLI arguments, then the named or
/// default config entry, then environment defaults filling the gaps.
fn resolve_profile(cli: &Cli, config: &Config) -> Result<ConnectionProfile> {
    let mut profile = if let Some(p) = cli.to_connection_profile()? {
        p
    } else if let Some(name) = cli.connection_name() {
        config
            .get_connection(Some(name))
            .cloned()
            .ok_or_else(|| AskdbError::config(format!("Connection '{name}' not found in config")))?
    } else if let Some(p) = config.get_connection(None) {
        p.clone()
    } else {
        ConnectionProfile::default()
    };

    profile.apply_defaults(&cli::defaults_from_env());
    profile.validate()?;
    Ok(profile)
}

/// Builds the SQL generator for the configured LLM provider.
fn build_generator(cli: &Cli, config: &Config) -> Result<SqlGenerator> {
    let provider_name = cli.llm.as_deref().unwrap_or(&config.llm.provider);
    let provider: LlmProvider = provider_name.parse().map_err(AskdbError::config)?;

    let client: Box<dyn LlmClient> = match provider {
        LlmProvider::Gemini => {
            let api_key = std::env::var("GOOGLE_API_KEY")
                .map_err(|_| AskdbError::llm("GOOGLE_API_KEY environment variable not set"))?;
            Box::new(GeminiClient::new(GeminiConfig::new(
                api_key,
                config.llm.model.clone(),
            ))?)
        }
        LlmProvider::Mock => Box::new(MockLlmClient::new()),
    };

    Ok(SqlGenerator::new(client))
}
