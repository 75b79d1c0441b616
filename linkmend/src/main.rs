use colored::Colorize;
use commands::command_argument_builder;
use linkmend::handlers::{
    GlobalOptions, handle_analyze, handle_backups, handle_connect_orphans, handle_fix_links, handle_goals,
    handle_init, handle_link_page, handle_optimize_hubs, handle_theme, init_tracing,
};

mod commands;

#[tokio::main]
async fn main() {
    let cmd = command_argument_builder();
    let chosen_command = cmd.get_matches();
    let globals = GlobalOptions::from_matches(&chosen_command);
    init_tracing(&globals);

    let outcome = match chosen_command.subcommand() {
        Some(("init", primary_command)) => handle_init(primary_command, &globals),
        Some(("analyze", primary_command)) => handle_analyze(primary_command, &globals).await,
        Some(("fix-links", primary_command)) => handle_fix_links(primary_command, &globals),
        Some(("connect-orphans", primary_command)) => handle_connect_orphans(primary_command, &globals).await,
        Some(("link-page", primary_command)) => handle_link_page(primary_command, &globals).await,
        Some(("optimize-hubs", primary_command)) => handle_optimize_hubs(primary_command, &globals).await,
        Some(("goals", primary_command)) => handle_goals(primary_command, &globals).await,
        Some(("backups", primary_command)) => handle_backups(primary_command, &globals),
        Some(("theme", primary_command)) => handle_theme(primary_command, &globals),
        _ => unreachable!("clap should ensure we don't get here"),
    };

    if let Err(e) = outcome {
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);
