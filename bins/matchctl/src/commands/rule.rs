//! Rule commands: `set_rule`, `get_rules`, `del_rule`.

use matchlink::netlink::genl::mat::{args, MatConnection};

use crate::render::{self, Output};

/// `set_rule prio NUM handle NUM table NUM match ... action ...`
pub async fn set(conn: &MatConnection, tokens: &[String], out: &Output) -> anyhow::Result<()> {
    let pipe = conn.load_pipeline().await?;
    let rule = args::parse_set_rule(tokens, &pipe)?;

    if !out.silent && !out.json {
        render::print_rule(&rule, &pipe);
    }

    let failed = conn.set_rule(&rule).await?;
    if !failed.is_empty() {
        eprintln!("Failed to set:");
        for rule in &failed {
            render::print_rule(rule, &pipe);
        }
        anyhow::bail!("{} rule(s) not set", failed.len());
    }
    Ok(())
}

/// `get_rules table (NUM|NAME) [min N] [max N]`
pub async fn get(conn: &MatConnection, tokens: &[String], out: &Output) -> anyhow::Result<()> {
    let pipe = conn.load_pipeline().await?;
    let query = args::parse_get_rules(tokens, &pipe)?;
    let rules = conn.get_rules(&query).await?;
    out.emit(&rules, |rules| render::print_rules(rules, &pipe))
}

/// `del_rule` is not part of the protocol; nothing is sent.
pub fn del(conn: &MatConnection) -> anyhow::Result<()> {
    conn.del_rule()?;
    Ok(())
}
