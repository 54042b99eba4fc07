//! Loads a schema file and prints the contents of every table.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::error;

use heapdb::execution::{Operator, SeqScan};
use heapdb::{Config, Database, Result};

/// Dump every table declared in a schema file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Schema file, one `name (field type [pk], ...)` line per table
    schema: PathBuf,

    /// Page size in bytes
    #[arg(short, long, default_value_t = heapdb::common::DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Buffer pool capacity in pages
    #[arg(short = 'n', long, default_value_t = heapdb::common::DEFAULT_BUFFER_POOL_PAGES)]
    pool_pages: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let config = Config::default()
        .with_page_size(args.page_size)
        .with_buffer_pool_pages(args.pool_pages);
    let db = Database::open(config, &args.schema)?;

    let txn = db.begin();
    for table_id in db.catalog().table_ids() {
        let name = db.catalog().table_name(table_id)?;
        let mut scan = SeqScan::new(db.buffer_pool().clone(), txn.id(), table_id, &name)?;

        let header: Vec<&str> = scan.schema().columns().map(|c| c.name()).collect();
        println!("{}", header.join("\t"));

        scan.open()?;
        let mut rows = 0;
        while let Some(tuple) = scan.next()? {
            println!("{}", tuple);
            rows += 1;
        }
        scan.close();
        println!("({} rows)\n", rows);
    }
    txn.commit()
}
