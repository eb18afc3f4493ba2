use clap::Parser;
use iris_timeline_import::ImportCli;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

#[tokio::main]
async fn main() {
    let cli = ImportCli::parse();
    init_tracing(cli.verbose);

    let code = iris_timeline_import::run(&cli, &mut std::io::stdout(), &mut std::io::stderr()).await;
    std::process::exit(code);
}
