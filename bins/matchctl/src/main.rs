//! matchctl - match-action table configuration tool.
//!
//! Talks to a packet-processing pipeline over its generic netlink family:
//! inspects headers, actions, and tables, installs rules, and configures
//! logical ports.

mod commands;
mod render;

use clap::{Parser, Subcommand};
use matchlink::netlink::genl::mat::{CancelToken, MatConnection};

#[derive(Parser)]
#[command(name = "matchctl", version, about = "Match-action table configuration tool")]
struct Cli {
    /// Numeric generic netlink family id (resolved by name when omitted).
    #[arg(short = 'f', long)]
    family: Option<u16>,

    /// Netlink port id of the userspace pipeline daemon (0 = kernel).
    #[arg(short = 'p', long, default_value_t = 0)]
    pid: u32,

    /// Target interface index.
    #[arg(short = 'i', long, default_value_t = 0)]
    ifindex: u32,

    /// Silence verbose printing.
    #[arg(short = 's', long)]
    silent: bool,

    /// Output JSON.
    #[arg(short = 'j', long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Display match action tables
    #[command(name = "get_tables")]
    GetTables,

    /// Display headers in the pipeline
    #[command(name = "get_headers")]
    GetHeaders,

    /// Display actions in the pipeline
    #[command(name = "get_actions")]
    GetActions,

    /// Display the match action table graph
    #[command(name = "get_graph")]
    GetGraph,

    /// Display the parser header graph
    #[command(name = "get_header_graph")]
    GetHeaderGraph,

    /// Display rules in a table
    #[command(name = "get_rules")]
    GetRules { args: Vec<String> },

    /// Set a rule in a match action table
    #[command(name = "set_rule")]
    SetRule { args: Vec<String> },

    /// Delete an existing rule from a table (not supported by the protocol)
    #[command(name = "del_rule")]
    DelRule { args: Vec<String> },

    /// Create a match action table
    Create { args: Vec<String> },

    /// Destroy a match action table
    Destroy { args: Vec<String> },

    /// Update a match action table attribute
    Update { args: Vec<String> },

    /// Display pci/mac to logical port mappings
    #[command(name = "lport_lookup")]
    LportLookup { args: Vec<String> },

    /// Display logical to physical port mappings
    #[command(name = "phys_port_lookup")]
    PhysPortLookup { args: Vec<String> },

    /// Display logical port info
    #[command(name = "get_ports")]
    GetPorts { args: Vec<String> },

    /// Set port attributes
    #[command(name = "set_port")]
    SetPort { args: Vec<String> },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .init();

    let cli = Cli::parse();
    let out = render::Output {
        json: cli.json,
        silent: cli.silent,
    };

    let mut conn = match cli.family {
        Some(id) => MatConnection::new(id, cli.ifindex, cli.pid),
        None => MatConnection::resolve(cli.ifindex, cli.pid).await?,
    };

    // SIGINT lands between reply messages, never mid-decode.
    let cancel = CancelToken::new();
    conn.set_cancel(cancel.clone());
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    match cli.command {
        Command::GetTables => commands::show::tables(&conn, &out).await,
        Command::GetHeaders => commands::show::headers(&conn, &out).await,
        Command::GetActions => commands::show::actions(&conn, &out).await,
        Command::GetGraph => commands::show::table_graph(&conn, &out).await,
        Command::GetHeaderGraph => commands::show::header_graph(&conn, &out).await,
        Command::GetRules { args } => commands::rule::get(&conn, &args, &out).await,
        Command::SetRule { args } => commands::rule::set(&conn, &args, &out).await,
        Command::DelRule { .. } => commands::rule::del(&conn),
        Command::Create { args } => commands::table::create(&conn, &args, &out).await,
        Command::Destroy { args } => commands::table::destroy(&conn, &args, &out).await,
        Command::Update { args } => commands::table::update(&conn, &args, &out).await,
        Command::LportLookup { args } => commands::port::lport_lookup(&conn, &args, &out).await,
        Command::PhysPortLookup { args } => {
            commands::port::phys_port_lookup(&conn, &args, &out).await
        }
        Command::GetPorts { args } => commands::port::get(&conn, &args, &out).await,
        Command::SetPort { args } => commands::port::set(&conn, &args, &out).await,
    }
}
