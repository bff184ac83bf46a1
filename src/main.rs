use clap::Parser;
use clap::error::ErrorKind;
use fabric_invoker::cli::{self, Cli};
use fabric_invoker::{ChaincodeInvoker, ErrorEnvelope};

async fn run() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            println!("{}", serde_json::to_string(&cli::usage_envelope(&e))?);
            return Ok(());
        }
    };
    let result = cli::execute(cli, |config| async move {
        ChaincodeInvoker::from_config(&config).await
    })
    .await;
    println!("{}", serde_json::to_string(&result)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    if let Err(e) = run().await {
        println!("{}", ErrorEnvelope::new(e.to_string()).to_value());
        std::process::exit(1);
    }
}
