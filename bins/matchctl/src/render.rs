//! Plain-text rendering of decoded pipeline records.

use matchlink::netlink::genl::mat::Pipeline;
use matchlink::netlink::genl::mat::types::{
    Action, ActionArgValue, FieldValue, Header, HeaderNode, Port, Rule, Table, TableNode,
};
use matchlink::netlink::genl::mat::value::format_mac;

/// Output settings shared by every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    pub json: bool,
    pub silent: bool,
}

impl Output {
    /// Emit records as JSON or hand them to a text renderer.
    pub fn emit<T: serde::Serialize>(
        &self,
        records: &T,
        text: impl FnOnce(&T),
    ) -> anyhow::Result<()> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(records)?);
        } else if !self.silent {
            text(records);
        }
        Ok(())
    }
}

/// `instance.field` display name for a rule match.
fn match_name(pipe: &Pipeline, instance: u32, header: u32, field: u32) -> String {
    let node = pipe
        .nodes()
        .iter()
        .find(|n| n.uid == instance)
        .map(|n| n.name.clone())
        .unwrap_or_else(|| instance.to_string());
    let field = pipe
        .field(header, field)
        .map(|f| f.name.clone())
        .unwrap_or_else(|| field.to_string());
    format!("{}.{}", node, field)
}

fn value_string(value: &FieldValue) -> String {
    match value {
        FieldValue::U8 { value, mask } => format!("{:#04x} ({:#04x})", value, mask),
        FieldValue::U16 { value, mask } => format!("{:#06x} ({:#06x})", value, mask),
        FieldValue::U32 { value, mask } => format!("{:#010x} ({:#010x})", value, mask),
        FieldValue::U64 { value, mask } => format!("{:#x} ({:#x})", value, mask),
        FieldValue::In6 { value, mask } => format!(
            "{} ({})",
            std::net::Ipv6Addr::from(*value),
            std::net::Ipv6Addr::from(*mask)
        ),
    }
}

fn arg_value_string(value: &ActionArgValue) -> String {
    match value {
        ActionArgValue::U8(v) => v.to_string(),
        ActionArgValue::U16(v) => v.to_string(),
        ActionArgValue::U32(v) => v.to_string(),
        ActionArgValue::U64(v) => format_mac(*v),
        ActionArgValue::In6(v) => std::net::Ipv6Addr::from(*v).to_string(),
    }
}

pub fn print_headers(headers: &Vec<Header>) {
    for header in headers {
        println!("{} [uid {}]", header.name, header.uid);
        for field in &header.fields {
            println!("  {} [uid {}, {} bits]", field.name, field.uid, field.bitwidth);
        }
    }
}

pub fn print_actions(actions: &Vec<Action>) {
    for action in actions {
        let args: Vec<String> = action
            .args
            .iter()
            .map(|a| format!("{} {}", a.arg_type, a.name))
            .collect();
        println!("{} [uid {}] ({})", action.name, action.uid, args.join(", "));
    }
}

pub fn print_header_graph(nodes: &Vec<HeaderNode>) {
    for node in nodes {
        let headers: Vec<String> = node.headers.iter().map(u32::to_string).collect();
        println!(
            "{} [uid {}] headers: {}",
            node.name,
            node.uid,
            headers.join(", ")
        );
    }
}

pub fn print_table_graph(nodes: &Vec<TableNode>) {
    for node in nodes {
        let jumps: Vec<String> = node.jump.iter().map(u32::to_string).collect();
        println!(
            "table {} [flags {:#x}] -> {}",
            node.uid,
            node.flags,
            if jumps.is_empty() {
                "terminal".to_string()
            } else {
                jumps.join(", ")
            }
        );
    }
}

pub fn print_table(table: &Table, pipe: &Pipeline) {
    println!(
        "table: {} [id {} source {} size {}]",
        table.name, table.uid, table.source, table.size
    );
    for m in &table.matches {
        let mask_type = m
            .mask_type
            .map(|t| format!(" ({})", t))
            .unwrap_or_default();
        println!(
            "  match: {}{}",
            match_name(pipe, m.instance, m.header, m.field),
            mask_type
        );
    }
    for uid in &table.actions {
        let name = pipe
            .action(*uid)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| uid.to_string());
        println!("  action: {}", name);
    }
    for attrib in &table.attribs {
        println!(
            "  attrib: {}{}",
            attrib.name,
            if attrib.write { "" } else { " (read-only)" }
        );
    }
}

pub fn print_tables(tables: &Vec<Table>, pipe: &Pipeline) {
    for table in tables {
        print_table(table, pipe);
    }
}

pub fn print_rule(rule: &Rule, pipe: &Pipeline) {
    println!(
        "rule: table {} handle {} prio {}",
        rule.table_id, rule.uid, rule.priority
    );
    for m in &rule.matches {
        let value = m.value.as_ref().map(value_string).unwrap_or_default();
        println!(
            "  match: {} {}",
            match_name(pipe, m.instance, m.header, m.field),
            value
        );
    }
    for action in &rule.actions {
        let args: Vec<String> = action
            .args
            .iter()
            .filter_map(|a| a.value.as_ref().map(arg_value_string))
            .collect();
        println!("  action: {} {}", action.name, args.join(" "));
    }
}

pub fn print_rules(rules: &Vec<Rule>, pipe: &Pipeline) {
    if rules.is_empty() {
        println!("Table empty");
        return;
    }
    for rule in rules {
        print_rule(rule, pipe);
    }
}

pub fn print_ports(ports: &Vec<Port>) {
    for port in ports {
        let id = port
            .id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "?".to_string());
        print!("port {}:", id);
        if let Some(mac) = port.mac_string() {
            print!(" mac {}", mac);
        }
        if let Some(pci) = port.pci {
            print!(" pci {}", pci);
        }
        if let Some(state) = port.state {
            print!(" state {}", state);
        }
        if let Some(speed) = port.speed {
            print!(" speed {}", speed);
        }
        if let Some(size) = port.max_frame_size {
            print!(" max_frame_size {}", size);
        }
        println!();
        if let Some(def_vlan) = port.def_vlan {
            print!("  def_vlan {}", def_vlan);
            if let Some(prio) = port.def_priority {
                print!(" def_priority {}", prio);
            }
            println!();
        }
        if let Some(vlans) = &port.vlans {
            let vids: Vec<String> = vlans.iter().map(|v| v.to_string()).collect();
            if !vids.is_empty() {
                println!("  vlans {}", vids.join(","));
            }
        }
        for (name, state) in [
            ("drop_tagged", port.drop_tagged),
            ("drop_untagged", port.drop_untagged),
            ("loopback", port.loopback),
            ("learning", port.learning),
            ("update_dscp", port.update_dscp),
            ("update_ttl", port.update_ttl),
            ("update_dmac", port.update_dmac),
            ("update_smac", port.update_smac),
            ("update_vlan", port.update_vlan),
            ("mcast_flooding", port.mcast_flooding),
        ] {
            if let Some(state) = state {
                println!("  {} {}", name, state);
            }
        }
    }
}
