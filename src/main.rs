use anyhow::Result;
use clap::Parser;

use sqlrest::api;

#[derive(Parser)]
#[clap(version, author = "sql.rest Contributors")]
enum Cli {
    /// Start the sql.rest service
    Serve {
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Bind a template offline and print the statement and its parameters
    Bind {
        #[clap(short, long)]
        template: String,
        /// Variables as name=value, may be repeated
        #[clap(short, long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(n, v)| (n.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli {
        Cli::Serve { config } => {
            println!("Starting sql.rest service with config: {}", config);
            api::start_service(config).await?;
        }
        Cli::Bind { template, vars } => {
            println!("{}", api::bind_template(&template, &vars)?);
        }
    }

    Ok(())
}
