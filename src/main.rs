use clap::Parser;
use records_ui::config::cli::Command;
use records_ui::utils::{logger, validation::Validate};
use records_ui::{
    Caller, Capabilities, CliArgs, Fixtures, MemoryPidStore, MemoryRecordStore, RecordsUi,
    RecordsUiConfig, Request,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    let config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            match RecordsUiConfig::from_file(path) {
                Ok(config) => config,
                Err(e) => {
                    eprintln!("❌ Failed to load config file '{}': {}", path, e);
                    std::process::exit(1);
                }
            }
        }
        None => RecordsUiConfig::default(),
    };

    if let Err(e) = config.validate() {
        tracing::error!("Configuration validation failed: {}", e);
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let pids = Arc::new(MemoryPidStore::new());
    let records = Arc::new(MemoryRecordStore::new());

    if let Some(path) = &args.fixtures {
        let fixtures = Fixtures::from_file(path)?;
        fixtures.load_into(&pids, &records).await?;
    }

    let ui = RecordsUi::builder(config, Capabilities::new(records), pids)
        .on_record_viewed(|event| {
            tracing::info!(pid = %event.pid, endpoint = %event.endpoint, "record viewed");
        })
        .build()?;

    match args.command {
        Command::Routes => {
            for endpoint in ui.endpoints() {
                let methods: Vec<&str> = endpoint.methods.iter().map(String::as_str).collect();
                println!(
                    "{:<20} {:<10} {:<40} {}",
                    endpoint.name,
                    endpoint.pid_type,
                    endpoint.route.rule(),
                    methods.join(",")
                );
            }
        }
        Command::Get { path, user, method } => {
            let (path, query) = match path.split_once('?') {
                Some((p, q)) => (p.to_string(), Some(q.to_string())),
                None => (path.clone(), None),
            };

            let mut request = Request::new(method, path);
            if let Some(query) = query {
                request = request.with_query(query);
            }
            if let Some(user) = user {
                request = request.with_caller(Caller::user(user));
            }

            let response = ui.handle(&request).await?;
            let reason = records_ui::domain::model::reason_phrase(response.status);
            println!("{} {}", response.status, reason);
            if let Some(location) = &response.location {
                println!("Location: {}", location);
            }
            println!();
            println!("{}", response.body);
        }
    }

    Ok(())
}
