use std::io::{self, BufRead};

use anyhow::Context;
use clap::Parser;
use pql::{Column, DataType, Database, Value, row};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pql")]
#[command(about = "Run SELECT queries against in-memory columnar tables", long_about = None)]
struct Args {
    /// Run a single query and exit (otherwise one query per stdin line)
    #[arg(short, long)]
    query: Option<String>,

    /// Start with an empty catalog instead of the demo USERS table
    #[arg(long)]
    no_demo: bool,

    /// Log filter directives, e.g. `pql=debug` (falls back to RUST_LOG)
    #[arg(long, env = "PQL_LOG")]
    log_filter: Option<String>,
}

fn seed_demo(db: &mut Database) -> pql::Result<()> {
    db.create_table(
        "users",
        vec![
            Column::new("id", DataType::Int),
            Column::new("name", DataType::Text),
            Column::new("age", DataType::Int),
            Column::new("active", DataType::Bool),
        ],
    )?;
    // query text is upper-cased, so stored text is too
    db.insert("users", row![1, "ALICE", 30, true])?;
    db.insert("users", row![2, "BOB", 25, false])?;
    db.insert("users", row![3, "CHARLIE", 35, true])?;
    db.insert("users", row![4, "DANA", Value::Null, true])?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter = match &args.log_filter {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter {directives:?}"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| "pql=warn".into()),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let mut db = Database::new();
    if !args.no_demo {
        seed_demo(&mut db).context("failed to seed the demo table")?;
        tracing::info!(tables = ?db.list_tables(), "demo catalog ready");
    }

    if let Some(sql) = &args.query {
        let result = db.query(sql).with_context(|| format!("query failed: {sql}"))?;
        println!("{result}");
        return Ok(());
    }

    for line in io::stdin().lock().lines() {
        let line = line.context("failed to read stdin")?;
        let sql = line.trim();
        if sql.is_empty() {
            continue;
        }
        match db.query(sql) {
            Ok(result) => println!("{result}\n"),
            Err(err) => eprintln!("error: {err}"),
        }
    }
    Ok(())
}
