//! Read-only pipeline introspection commands.

use matchlink::netlink::genl::mat::MatConnection;

use crate::render::{self, Output};

/// `get_tables`
pub async fn tables(conn: &MatConnection, out: &Output) -> anyhow::Result<()> {
    let pipe = conn.load_pipeline().await?;
    let tables = conn.get_tables().await?;
    out.emit(&tables, |tables| render::print_tables(tables, &pipe))
}

/// `get_headers`
pub async fn headers(conn: &MatConnection, out: &Output) -> anyhow::Result<()> {
    let headers = conn.get_headers().await?;
    out.emit(&headers, render::print_headers)
}

/// `get_actions`
pub async fn actions(conn: &MatConnection, out: &Output) -> anyhow::Result<()> {
    let actions = conn.get_actions().await?;
    out.emit(&actions, render::print_actions)
}

/// `get_header_graph`
pub async fn header_graph(conn: &MatConnection, out: &Output) -> anyhow::Result<()> {
    let nodes = conn.get_header_graph().await?;
    out.emit(&nodes, render::print_header_graph)
}

/// `get_graph`
pub async fn table_graph(conn: &MatConnection, out: &Output) -> anyhow::Result<()> {
    let nodes = conn.get_table_graph().await?;
    out.emit(&nodes, render::print_table_graph)
}
