use anyhow::Context;
use clap::Parser;
use record_store::config::cli::{Command, RecordArgs};
use record_store::utils::{logger, validation::Validate};
use record_store::{
    AuthSession, CliConfig, FirestoreClient, IdentityToolkitClient, NewRecord, Record,
    RecordPatch, RecordStore, StoreConfig, StoreError,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting record-store CLI");

    let mut config = match &cli.config {
        Some(path) => StoreConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => StoreConfig::from_env(),
    };
    if let Some(collection) = &cli.collection {
        config.collection = collection.clone();
    }
    if cli.verbose {
        tracing::debug!(
            "Project: {}, collection: {}, endpoint: {}",
            config.project_id,
            config.collection,
            config.firestore_endpoint
        );
    }

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let session = AuthSession::new(IdentityToolkitClient::new(&config)?);
    match (&cli.email, &cli.password) {
        (Some(email), Some(password)) => {
            if let Err(e) = session.sign_in(email, password).await {
                eprintln!("❌ {}", e.user_friendly_message());
                std::process::exit(1);
            }
        }
        (None, None) => {}
        _ => {
            let err = missing_credential_error(&cli);
            tracing::error!("❌ {}", err);
            eprintln!("❌ {}", err.user_friendly_message());
            std::process::exit(2);
        }
    }

    let client = FirestoreClient::new(&config)?.with_auth(session.user_watch());
    let store = RecordStore::new(client, config.collection.clone());

    if let Err(e) = run(&store, cli.command).await {
        tracing::error!("❌ Operation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        let exit_code = match e {
            StoreError::NotFound { .. } => 4,
            StoreError::ValidationError { .. } => 2,
            _ => 1,
        };
        std::process::exit(exit_code);
    }

    Ok(())
}

async fn run(store: &RecordStore<FirestoreClient>, command: Command) -> record_store::Result<()> {
    match command {
        Command::Create(args) => {
            let record = new_record(args)?;
            let id = store.create(record).await?;
            println!("{}", id);
        }
        Command::List => {
            let records = store.list().await?;
            for record in &records {
                print_record(record);
            }
            tracing::info!("{} records", records.len());
        }
        Command::Get { id } => {
            let record = store.get(&id).await?;
            println!("{}", serde_json::to_string_pretty(&record)?);
        }
        Command::Update { id, fields } => {
            store.update(&id, patch(fields)?).await?;
            println!("✅ Updated {}", id);
        }
        Command::Delete { id } => {
            store.delete(&id).await?;
            println!("✅ Deleted {}", id);
        }
    }
    Ok(())
}

fn missing_credential_error(cli: &CliConfig) -> StoreError {
    let missing = if cli.email.is_none() { "--email" } else { "--password" };
    StoreError::ValidationError {
        message: format!("{} is required when signing in; pass both --email and --password", missing),
    }
}

fn parse_price(raw: &str) -> record_store::Result<f64> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| StoreError::ValidationError {
            message: format!("Price must be a number, got '{}'", raw),
        })
}

fn new_record(args: RecordArgs) -> record_store::Result<NewRecord> {
    let name = args.name.ok_or_else(|| StoreError::ValidationError {
        message: "--name is required".to_string(),
    })?;
    let price = args.price.ok_or_else(|| StoreError::ValidationError {
        message: "--price is required".to_string(),
    })?;

    Ok(NewRecord {
        name,
        description: args.description,
        price: parse_price(&price)?,
        details: args.details,
    })
}

fn patch(args: RecordArgs) -> record_store::Result<RecordPatch> {
    Ok(RecordPatch {
        name: args.name,
        description: args.description,
        price: args.price.as_deref().map(parse_price).transpose()?,
        details: args.details,
    })
}

fn print_record(record: &Record) {
    let created = chrono::DateTime::from_timestamp_millis(record.created_at)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| record.created_at.to_string());
    println!(
        "{}\t{}\t{:.2}\t{}\t{}",
        record.id,
        record.name,
        record.price,
        created,
        record.description.as_deref().unwrap_or("")
    );
}
