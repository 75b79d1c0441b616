use crate::CLAP_STYLING;
use clap::{arg, command};
use std::path::PathBuf;

fn root_arg() -> clap::Arg {
    arg!([ROOT])
        .required(false)
        .help("Root directory of the document tree")
        .default_value(".")
}

fn threads_arg() -> clap::Arg {
    arg!(-t --"threads" <NUM_WORKERS>)
        .required(false)
        .help("The number of async workers reading documents")
        .value_parser(clap::value_parser!(usize))
        .default_value("8")
}

fn dry_run_arg() -> clap::Arg {
    arg!(-n --"dry-run")
        .required(false)
        .help("Report what would change without writing any file")
        .action(clap::ArgAction::SetTrue)
}

fn output_arg(help: &'static str) -> clap::Arg {
    arg!(-o --"output" <PATH>)
        .required(false)
        .help(help)
        .value_parser(clap::value_parser!(PathBuf))
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("linkmend")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("linkmend")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Only print errors").required(false).global(true))
        .arg(
            arg!(-v --"verbose" "Show debug logging")
                .required(false)
                .global(true)
                .conflicts_with("quiet"),
        )
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .global(true)
                .help("Config file (default: <ROOT>/linkmend.toml)"),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("init")
                .about("Writes a commented default linkmend.toml")
                .arg(
                    arg!([DIR])
                        .required(false)
                        .help("Directory to write the config into")
                        .default_value("."),
                )
                .arg(
                    arg!(-f --"force")
                        .help("Overwrite an existing config file")
                        .required(false),
                ),
        )
        .subcommand(
            command!("analyze")
                .about("Builds the link graph and reports hubs, references, orphans and broken links")
                .arg(root_arg())
                .arg(threads_arg())
                .arg(output_arg("Save the report to a file (default: print to screen)"))
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, html")
                        .value_parser(["text", "json", "html"])
                        .default_value("text"),
                )
                .arg(
                    arg!(--"dot" <PATH>)
                        .required(false)
                        .help("Also write the link graph in Graphviz DOT format")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            command!("fix-links")
                .about("Rewrites broken and legacy links to their canonical targets")
                .arg(root_arg())
                .arg(
                    arg!(--"only" <NAMES>)
                        .required(false)
                        .help("Comma-separated document basenames to correct (default: canonical pages, else all)")
                        .action(clap::ArgAction::Append),
                )
                .arg(dry_run_arg())
                .arg(output_arg("Where to write the JSON correction report")),
        )
        .subcommand(
            command!("connect-orphans")
                .about("Links every orphan page from the hub pages through a categorised widget")
                .arg(root_arg())
                .arg(threads_arg())
                .arg(dry_run_arg())
                .arg(output_arg("Where to write the JSON orphan report")),
        )
        .subcommand(
            command!("link-page")
                .about("Adds a navigation link to one page in every hub")
                .arg(root_arg())
                .arg(
                    arg!(--"target" <PAGE>)
                        .required(true)
                        .help("Basename or corpus path of the page to link"),
                )
                .arg(
                    arg!(--"label" <LABEL>)
                        .required(false)
                        .help("Link text (default: derived from the file name)"),
                )
                .arg(threads_arg())
                .arg(dry_run_arg())
                .arg(output_arg("Where to write the JSON report")),
        )
        .subcommand(
            command!("optimize-hubs")
                .about("Regroups hubs carrying too many links into a sectioned digest")
                .arg(root_arg())
                .arg(threads_arg())
                .arg(dry_run_arg())
                .arg(output_arg("Where to write the JSON hub report")),
        )
        .subcommand(
            command!("goals")
                .about("Checks the success rate and orphan count against the configured goals")
                .arg(root_arg())
                .arg(
                    arg!(--"report" <PATH>)
                        .required(false)
                        .help("Use a JSON report from an earlier analyze run instead of scanning")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(threads_arg())
                .arg(output_arg("Save the goal check as JSON (default: print to screen)")),
        )
        .subcommand(
            command!("backups")
                .about("Lists the documents backed up by earlier runs")
                .arg(root_arg())
                .arg(
                    arg!(--"purpose" <PURPOSE>)
                        .required(false)
                        .help("Which command's backups to read")
                        .value_parser(["links", "orphans", "link-page", "hubs"])
                        .default_value("links"),
                )
                .arg(
                    arg!(--"restore")
                        .required(false)
                        .help("Copy every backup over its original document")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            command!("theme")
                .about("Applies the site theme to one document")
                .arg(
                    arg!(<FILE>)
                        .required(true)
                        .help("The document to theme")
                        .value_parser(clap::value_parser!(PathBuf)),
                )
                .arg(
                    arg!(--"query" <QUERY>)
                        .required(false)
                        .help("Request query string; theme=off leaves the document untouched"),
                )
                .arg(output_arg("Write the result to a file (default: print to screen)")),
        )
}
