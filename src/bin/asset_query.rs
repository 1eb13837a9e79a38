//! Asset Query
//!
//! Runs a read-only SQL query against a database inside an asset bundle
//! directory, going through the asset VFS exactly as an application would.

use anyhow::{bail, Context};
use clap::Parser;
use rusqlite::types::ValueRef;
use sqlite_asset_vfs::{open_bundled, unregister_vfs, AssetMode, DirAssets, VfsConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "asset-query")]
#[command(about = "Query a SQLite database shipped inside an asset bundle")]
struct Args {
    /// Bundle root directory
    #[arg(short = 'b', long)]
    bundle: PathBuf,

    /// Asset name of the database (e.g. databases/demo.db)
    database: String,

    /// SQL to run
    sql: String,

    /// Memory-map assets regardless of the configured asset mode
    #[arg(long)]
    mapped: bool,

    /// VFS settings file (TOML)
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Print column names before the rows
    #[arg(long)]
    header: bool,
}

fn render(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) => String::from_utf8_lossy(t).into_owned(),
        ValueRef::Blob(b) => format!("<blob {} bytes>", b.len()),
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if !args.bundle.is_dir() {
        bail!("bundle root {:?} is not a directory", args.bundle);
    }

    let config = match &args.config {
        Some(path) => VfsConfig::from_file(path)
            .with_context(|| format!("loading VFS config from {:?}", path))?,
        None => VfsConfig::default(),
    };

    let mode = if args.mapped {
        AssetMode::Mapped
    } else {
        config.asset_mode
    };
    info!("Bundle root: {:?} ({:?})", args.bundle, mode);

    let assets = Arc::new(DirAssets::with_mode(&args.bundle, mode));
    let conn = open_bundled(assets, &config, &args.database)
        .with_context(|| format!("opening {} from {:?}", args.database, args.bundle))?;

    {
        let mut stmt = conn.prepare(&args.sql).context("preparing query")?;
        let columns = stmt.column_count();

        if args.header {
            println!("{}", stmt.column_names().join("\t"));
        }

        let mut rows = stmt.query([])?;
        let mut count = 0usize;
        while let Some(row) = rows.next()? {
            let fields = (0..columns)
                .map(|i| row.get_ref(i).map(render))
                .collect::<Result<Vec<_>, _>>()?;
            println!("{}", fields.join("\t"));
            count += 1;
        }
        info!("{} row(s)", count);
    }

    drop(conn);
    unregister_vfs(&config.name)?;

    Ok(())
}
