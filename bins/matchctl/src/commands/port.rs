//! Port commands: `get_ports`, `lport_lookup`, `phys_port_lookup`,
//! `set_port`.

use matchlink::netlink::genl::mat::args::{self, PortLookup};
use matchlink::netlink::genl::mat::MatConnection;

use crate::render::{self, Output};

/// `get_ports [min N] [max N]`
pub async fn get(conn: &MatConnection, tokens: &[String], out: &Output) -> anyhow::Result<()> {
    let query = args::parse_port_query(tokens, PortLookup::Range)?;
    let ports = conn.get_ports(query.min, query.max).await?;
    out.emit(&ports, render::print_ports)
}

/// `lport_lookup (pci BUS:DEVICE.FUNCTION | mac MACADDR)`
pub async fn lport_lookup(
    conn: &MatConnection,
    tokens: &[String],
    out: &Output,
) -> anyhow::Result<()> {
    let query = args::parse_port_query(tokens, PortLookup::Logical)?;
    let ports = conn.get_logical_port(&query).await?;
    if out.json {
        return out.emit(&ports, |_| {});
    }
    for port in &ports {
        if let Some(id) = port.id {
            println!("Logical Port: {}", id);
        }
    }
    Ok(())
}

/// `phys_port_lookup lport NUM`
pub async fn phys_port_lookup(
    conn: &MatConnection,
    tokens: &[String],
    out: &Output,
) -> anyhow::Result<()> {
    let query = args::parse_port_query(tokens, PortLookup::Physical)?;
    let ports = conn.get_physical_port(&query).await?;
    out.emit(&ports, render::print_ports)
}

/// `set_port port NUM [KEYWORD VALUE ...]`
pub async fn set(conn: &MatConnection, tokens: &[String], out: &Output) -> anyhow::Result<()> {
    let port = args::parse_set_port(tokens)?;
    let id = port.id.ok_or_else(|| anyhow::anyhow!("port id is required"))?;
    conn.set_port(&port).await?;

    // Show the resulting state as the pipeline reports it.
    let updated = conn.get_ports(Some(id), Some(id)).await?;
    out.emit(&updated, render::print_ports)
}
