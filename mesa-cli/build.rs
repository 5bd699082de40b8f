//! Build script for mesa-cli.
//!
//! This script generates man pages at build time using clap_mangen.
//! The generated man page is placed in OUT_DIR for inclusion in release builds.
//!
//! Note: We build a minimal command structure here rather than importing from
//! the main crate, since build scripts cannot depend on the crate being built.

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::fs;
use std::path::PathBuf;

/// Build the CLI command structure for man page generation.
///
/// IMPORTANT: Keep this structure synchronized with src/cli.rs
/// When adding/removing/modifying commands, update both files.
fn build_cli() -> Command {
    Command::new("mesa")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Coordinate restaurant table reservations")
        .long_about(
            "Command-line tool for assigning tables to reservations, resolving customer \
             contact conflicts and driving reservations through their lifecycle",
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .help("Enable verbose output")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .help("Suppress non-essential output")
                .global(true)
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("data-dir")
                .long("data-dir")
                .help("Override the data directory location")
                .value_name("PATH")
                .global(true)
                .env("MESA_DATA_DIR"),
        )
        .arg(
            Arg::new("busy-timeout")
                .long("busy-timeout")
                .help("Override the default busy timeout (in seconds)")
                .value_name("SECONDS")
                .global(true)
                .env("MESA_BUSY_TIMEOUT"),
        )
        .arg(
            Arg::new("actor")
                .long("actor")
                .help("Staff member running the command, recorded in the audit log")
                .value_name("ID")
                .global(true)
                .env("MESA_ACTOR"),
        )
        .arg(
            Arg::new("role")
                .long("role")
                .help("Role of the staff member: viewer, host, manager or admin")
                .value_name("ROLE")
                .global(true)
                .env("MESA_ROLE"),
        )
        .subcommands(vec![
            Command::new("init")
                .about("Initialize the data directory and database")
                .long_about("Create the data directory, the database and optionally a config file"),
            Command::new("zone")
                .about("Manage dining zones")
                .long_about("Add, list, enable and disable the zones of the floor"),
            Command::new("table")
                .about("Manage tables")
                .long_about(
                    "Add and list tables, block and unblock them, and mark them clean after service",
                ),
            Command::new("reserve")
                .about("Take a new reservation")
                .long_about("Store a booking and link it to an existing or new customer"),
            Command::new("availability")
                .about("Find tables able to seat a party")
                .long_about("List single tables and groups of adjacent tables, best fit first"),
            Command::new("assign")
                .about("Assign tables to a reservation")
                .long_about("Put a reservation on given tables, or on the best available fit"),
            Command::new("release")
                .about("Release a reservation's tables")
                .long_about("Free the tables held by a reservation without changing its status"),
            Command::new("confirm").about("Confirm a pending reservation"),
            Command::new("cancel").about("Cancel a reservation and release its tables"),
            Command::new("seat").about("Seat a confirmed reservation"),
            Command::new("complete").about("Complete a seated reservation"),
            Command::new("no-show").about("Mark a reservation as a no-show"),
            Command::new("customer")
                .about("Look up customers and resolve contact conflicts")
                .long_about(
                    "Check which customers own an email and phone, and settle conflicts \
                     by keeping one record, merging both, or creating a new one",
                ),
            Command::new("list")
                .about("List reservations")
                .long_about("Display reservations as a table, JSON, CSV or TSV"),
            Command::new("history")
                .about("Show a table's state history")
                .long_about("Read a table's status and fusion changes back from the audit log"),
            Command::new("completions")
                .about("Generate shell completion scripts")
                .long_about("Generate shell completion scripts for bash, zsh, fish, or PowerShell"),
        ])
}

fn main() {
    // Generate man pages at build time
    let out_dir = PathBuf::from(std::env::var("OUT_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).unwrap();

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();
    man.render(&mut buffer).unwrap();

    fs::write(man_dir.join("mesa.1"), buffer).unwrap();

    println!("cargo:rerun-if-changed=src/cli.rs");
    println!("cargo:rerun-if-changed=src/commands/");
}
