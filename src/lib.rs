pub mod bulk;
pub mod cli;
pub mod config;
pub mod data;
pub mod dates;
pub mod dispatch;
pub mod emptiness;
pub mod error;
pub mod fields;
pub mod io_utils;
pub mod normalize;
pub mod parser;
pub mod pipeline;
pub mod records;
pub mod report;
pub mod schema;
pub mod store;

use std::{env, sync::OnceLock};

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, debug, info, warn};

use crate::{
    cli::{BulkArgs, ClassifyArgs, Cli, Commands, IngestArgs, StoreArgs},
    config::{IngestConfig, Overrides},
    error::IngestError,
    pipeline::{SlotBoard, SlotState},
    store::CsvDirectoryStore,
};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("stat_ingest", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Schemas => {
            print!("{}", report::render_schemas());
            Ok(())
        }
        Commands::Classify(args) => handle_classify(&args),
        Commands::Ingest(args) => handle_ingest(&args),
        Commands::Bulk(args) => handle_bulk(&args),
    }
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Starting async runtime")
}

fn overrides_from(store: &StoreArgs) -> Overrides {
    Overrides {
        store_dir: store.store.clone(),
        table_prefix: store.table_prefix.clone(),
        today: store.today,
        ..Overrides::default()
    }
}

fn handle_classify(args: &ClassifyArgs) -> Result<()> {
    let delimiter = io_utils::resolve_input_delimiter(&args.input, args.delimiter);
    let encoding = io_utils::resolve_encoding(args.input_encoding.as_deref())?;
    info!(
        "Classifying '{}' with delimiter '{}'",
        args.input.display(),
        printable_delimiter(delimiter)
    );
    let text = io_utils::read_input_text(&args.input, encoding)?;
    let doc = pipeline::parse_upload(&text, delimiter)
        .with_context(|| format!("Parsing {:?}", args.input))?;
    match schema::classify(doc.headers()) {
        Some(detected) => {
            println!("{detected}");
            Ok(())
        }
        None => {
            println!("unrecognized");
            bail!(IngestError::UnrecognizedSchema {
                headers: doc.headers().join(", "),
            })
        }
    }
}

fn handle_ingest(args: &IngestArgs) -> Result<()> {
    let config = IngestConfig::load_optional(args.store.config.as_deref())?;
    let overrides = Overrides {
        delimiter: args.delimiter,
        input_encoding: args.input_encoding.clone(),
        serial: args.serial,
        ..overrides_from(&args.store)
    };
    let options = config.resolve_options(&overrides)?;
    let explicit_delimiter = config.resolve_delimiter(&overrides)?;
    let encoding = io_utils::resolve_encoding(config.resolve_encoding_label(&overrides).as_deref())?;
    let store_dir = config.resolve_store_dir(&overrides)?;
    let sink = CsvDirectoryStore::new(&store_dir);
    info!(
        "Ingesting {} slot(s) into {:?} (reference date {})",
        args.slots.len(),
        store_dir,
        options.today
    );

    let mut board = SlotBoard::new();
    for slot in &args.slots {
        if board.state(slot.schema) != Some(SlotState::Idle) {
            warn!("{} slot given more than once; using {:?}", slot.schema, slot.path);
        }
        let delimiter = io_utils::resolve_input_delimiter(&slot.path, explicit_delimiter);
        debug!(
            "Staging {:?} as {} with delimiter '{}'",
            slot.path,
            slot.schema,
            printable_delimiter(delimiter)
        );
        let text = io_utils::read_input_bytes(&slot.path).and_then(|bytes| {
            io_utils::decode_bytes(&bytes, encoding)
                .with_context(|| format!("Decoding input file {:?}", slot.path))
        });
        match text {
            Ok(text) => {
                board.stage(slot.schema, &text, delimiter)?;
            }
            Err(err) => {
                warn!("Could not read {:?}: {err:#}", slot.path);
                board.fail(
                    slot.schema,
                    &IngestError::Io(std::io::Error::other(format!("{err:#}"))),
                )?;
            }
        }
    }
    let outcomes = runtime()?.block_on(board.upload_all(&sink, &options));

    if args.store.json {
        println!("{}", report::to_json(&outcomes)?);
    } else {
        print!("{}", report::render_outcomes(&outcomes));
    }

    let failed = outcomes.iter().filter(|o| o.is_failed()).count();
    if failed > 0 {
        bail!("{failed} of {} slot(s) failed", outcomes.len());
    }
    Ok(())
}

fn handle_bulk(args: &BulkArgs) -> Result<()> {
    let config = IngestConfig::load_optional(args.store.config.as_deref())?;
    let overrides = Overrides {
        input_encoding: args.input_encoding.clone(),
        ..overrides_from(&args.store)
    };
    let options = config.resolve_options(&overrides)?;
    let encoding = io_utils::resolve_encoding(config.resolve_encoding_label(&overrides).as_deref())?;
    let store_dir = config.resolve_store_dir(&overrides)?;
    let sink = CsvDirectoryStore::new(&store_dir);
    info!("Uploading bulk statistics from '{}'", args.input.display());

    let text = io_utils::read_input_text(&args.input, encoding)?;
    let outcomes = runtime()?.block_on(bulk::upload_bulk(
        &sink,
        &text,
        options.today,
        options.table_prefix.as_deref(),
    ));

    if args.store.json {
        println!("{}", report::to_json(&outcomes)?);
    } else {
        print!("{}", report::render_bulk(&outcomes));
    }

    let failed = outcomes.iter().filter(|o| !o.success).count();
    if failed > 0 {
        bail!("{failed} of {} element(s) failed", outcomes.len());
    }
    Ok(())
}

pub(crate) fn printable_delimiter(delimiter: u8) -> String {
    match delimiter {
        b',' => ",".to_string(),
        b'\t' => "\\t".to_string(),
        b'\n' => "\\n".to_string(),
        other => (other as char).to_string(),
    }
}
