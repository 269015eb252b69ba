use anyhow::Result;
use clap::{Arg, ArgMatches, Command};

use hostwatch::commands;

fn monitor_args(command: Command) -> Command {
    command
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("JSON config file (defaults are used when omitted)"),
        )
        .arg(
            Arg::new("interval")
                .short('i')
                .long("interval")
                .value_name("MS")
                .help("Tick interval in milliseconds")
                .value_parser(clap::value_parser!(u64)),
        )
}

fn build_cli() -> Command {
    Command::new("hostwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Host metric sampling with threshold alerts")
        .subcommand(
            monitor_args(Command::new("state").about("Print the current system state")).arg(
                Arg::new("json")
                    .long("json")
                    .help("Print the snapshot as JSON")
                    .action(clap::ArgAction::SetTrue),
            ),
        )
        .subcommand(monitor_args(
            Command::new("check").about("Evaluate thresholds once and print fired alerts"),
        ))
        .subcommand(monitor_args(
            Command::new("watch").about("Monitor in the background until Ctrl+C"),
        ))
}

fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("state", sub_matches)) => commands::state(sub_matches),
        Some(("check", sub_matches)) => commands::check(sub_matches),
        Some(("watch", sub_matches)) => commands::watch(sub_matches),
        _ => {
            println!("Welcome to hostwatch!");
            println!("Use 'hostwatch --help' for more information.");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    hostwatch::init_logging();
    let matches = build_cli().get_matches();
    run(&matches)
}
