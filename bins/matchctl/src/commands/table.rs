//! Table commands: `create`, `update`, `destroy`.

use matchlink::netlink::genl::mat::args::{self, TableCmd};
use matchlink::netlink::genl::mat::MatConnection;

use crate::render::{self, Output};

/// `create source NUM name STRING [id NUM] size NUM [match ...] [action ...]`
pub async fn create(conn: &MatConnection, tokens: &[String], out: &Output) -> anyhow::Result<()> {
    let pipe = conn.load_pipeline().await?;
    let table = args::parse_table(tokens, &pipe, TableCmd::Create)?;
    if !out.silent && !out.json {
        render::print_table(&table, &pipe);
    }
    conn.create_table(&table).await?;
    Ok(())
}

/// `update id NUM [attrib NAME VALUE ...]`
pub async fn update(conn: &MatConnection, tokens: &[String], out: &Output) -> anyhow::Result<()> {
    let pipe = conn.load_pipeline().await?;
    let table = args::parse_table(tokens, &pipe, TableCmd::Update)?;
    if !out.silent && !out.json {
        render::print_table(&table, &pipe);
    }
    conn.update_table(&table).await?;
    Ok(())
}

/// `destroy source NUM (name STRING | id NUM)`
pub async fn destroy(conn: &MatConnection, tokens: &[String], out: &Output) -> anyhow::Result<()> {
    let pipe = conn.load_pipeline().await?;
    let table = args::parse_destroy(tokens, &pipe)?;
    if !out.silent && !out.json {
        render::print_table(&table, &pipe);
    }
    conn.destroy_table(&table).await?;
    Ok(())
}
