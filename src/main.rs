use clap::Parser;
use seedpool::cli::{check, ledger, output, plan, run, CheckCommand, Cli, Commands};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Plan(args) => plan::execute(&args.config).map(|()| true),
        Commands::Check(CheckCommand::Config(args)) => check::execute_config(&args.config).map(|()| true),
        Commands::Ledger(args) => ledger::execute(args).map(|()| true),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(2),
        Err(e) => {
            output::error(&e.to_string());
            std::process::exit(1);
        }
    }
}
