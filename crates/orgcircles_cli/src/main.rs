//! CLI entry point for inspecting a workspace database.
//!
//! # Responsibility
//! - Open (and migrate) a snapshot database, load the organization and print
//!   its packed layout as an indented outline.
//! - Keep output deterministic for quick local sanity checks.
//!
//! Usage: `orgcircles_cli [DB_PATH] [CONFIG_JSON]`

use log::error;
use orgcircles_core::db::open_db;
use orgcircles_core::{
    core_version, init_logging_from_config, SqliteSnapshotStore, WorkspaceConfig,
    WorkspaceService,
};
use std::process::ExitCode;

const DEFAULT_DB_PATH: &str = "orgcircles.sqlite3";

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let db_path = args.next().unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
    let config = match args.next() {
        Some(path) => match WorkspaceConfig::from_json_file(&path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("config error: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => WorkspaceConfig::default(),
    };
    if let Err(err) = init_logging_from_config(&config.logging) {
        eprintln!("logging disabled: {err}");
    }

    let conn = match open_db(&db_path) {
        Ok(conn) => conn,
        Err(err) => {
            error!("event=cli_open module=cli status=error");
            eprintln!("database error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let store = match SqliteSnapshotStore::try_new(&conn) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("snapshot store error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let workspace = WorkspaceService::open(store, config);

    println!("orgcircles_core version={}", core_version());
    let org = workspace.organization();
    println!(
        "nodes={} members={} templates={}",
        org.tree().len(),
        org.members().len(),
        org.templates().len()
    );
    for record in workspace.layout().iter() {
        println!(
            "{indent}{kind} {name} x={x:.1} y={y:.1} r={r:.1}",
            indent = "  ".repeat(record.depth),
            kind = record.kind.as_str(),
            name = record.name,
            x = record.x,
            y = record.y,
            r = record.radius,
        );
    }
    ExitCode::SUCCESS
}
