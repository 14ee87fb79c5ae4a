//! Command argument grammar.
//!
//! Commands take flat, keyword-delimited token lists (`match
//! ethernet.dst_mac 00:11:22:33:44:55 action set_egress_port 5 ...`).
//! The grammar consumes tokens strictly left to right through a cursor;
//! the only re-read is the variadic-argument pre-scan, which counts ahead
//! and restores the cursor before parsing.
//!
//! A trailing match value has its mask omitted (exact match assumed)
//! exactly when the next token is missing or is a reserved keyword of the
//! calling command, so the next clause's keyword is never mis-parsed as a
//! mask.

use super::pipeline::Pipeline;
use super::types::{
    Action, ActionArg, ActionArgType, ActionArgValue, FieldRef, MaskType, NamedValue, Port,
    PortState, FlagState, Rule, ScalarValue, Table, VlanMembership,
};
use super::value;
use super::{MAT_MAX_ACTIONS, MAT_MAX_ATTRIBS, MAT_MAX_MATCHES, MAT_MAX_NAME};
use crate::netlink::error::{Error, Result};

/// Reserved keywords of the `set_rule` command.
const SET_RULE_KEYWORDS: &[&str] = &["match", "action", "prio", "handle", "table"];

/// Cursor over a command's token list.
pub struct Tokens<'a> {
    toks: &'a [String],
    pos: usize,
}

impl<'a> Tokens<'a> {
    /// Create a cursor at the start of a token list.
    pub fn new(toks: &'a [String]) -> Self {
        Self { toks, pos: 0 }
    }

    /// Look at the next token without consuming it.
    pub fn peek(&self) -> Option<&'a str> {
        self.toks.get(self.pos).map(String::as_str)
    }

    /// Consume and return the next token.
    pub fn next(&mut self) -> Option<&'a str> {
        let tok = self.peek()?;
        self.pos += 1;
        Some(tok)
    }

    /// Consume the next token, failing with a missing-argument error.
    pub fn expect(&mut self, what: &str) -> Result<&'a str> {
        self.next()
            .ok_or_else(|| Error::parse(format!("missing {}", what)))
    }

    /// Current cursor position, for the variadic pre-scan.
    fn save(&self) -> usize {
        self.pos
    }

    /// Restore a saved cursor position.
    fn restore(&mut self, pos: usize) {
        self.pos = pos;
    }
}

/// Consume `KEYWORD VALUE` where VALUE is a u32 (hex or decimal).
fn expect_u32(cur: &mut Tokens<'_>, keyword: &str) -> Result<u32> {
    let tok = cur.expect(keyword)?;
    value::parse_int(tok)
        .filter(|&v| v <= u64::from(u32::MAX))
        .map(|v| v as u32)
        .ok_or_else(|| Error::parse(format!("invalid {} argument `{}`", keyword, tok)))
}

/// Consume `KEYWORD VALUE` where VALUE is `enabled` or `disabled`.
fn expect_flag(cur: &mut Tokens<'_>, keyword: &str) -> Result<FlagState> {
    let tok = cur.expect(&format!("{} state", keyword))?;
    tok.parse()
        .map_err(|_| Error::parse(format!("invalid {} state `{}`", keyword, tok)))
}

/// Parse one match clause, positioned after the `match` keyword.
///
/// `INSTANCE.FIELD [MASK_TYPE] [VALUE [MASK]]`. The mask type is consumed
/// only when `need_mask_type` is set (table creation); the value and
/// optional mask only when `need_value` is set (rule setting). `keywords`
/// is the calling command's reserved set, bounding mask consumption.
pub fn parse_match(
    cur: &mut Tokens<'_>,
    pipe: &Pipeline,
    need_value: bool,
    need_mask_type: bool,
    keywords: &[&str],
) -> Result<FieldRef> {
    let token = cur.expect("match instance")?;

    // The instance name (not the header name) selects the parser graph
    // node, so repeated or tunneled headers stay unambiguous.
    let (instance, field_name) = token.split_once('.').ok_or_else(|| {
        Error::parse(format!(
            "invalid match `{}`, input should be `instance.field`",
            token
        ))
    })?;

    let node = pipe
        .node_by_name(instance)
        .ok_or_else(|| Error::UnknownInstance {
            name: instance.to_string(),
        })?;

    // Only single-header nodes are supported; there is no way to infer
    // which header a field belongs to otherwise.
    let &[header_uid] = node.headers.as_slice() else {
        return Err(Error::parse(format!(
            "instance `{}` exposes {} headers, expected exactly one",
            instance,
            node.headers.len()
        )));
    };

    let header_name = pipe
        .header(header_uid)
        .map(|h| h.name.clone())
        .unwrap_or_default();
    let field = pipe
        .field_by_name(header_uid, field_name)
        .ok_or_else(|| Error::UnknownField {
            header: header_name,
            name: field_name.to_string(),
        })?
        .clone();

    let mask_type = if need_mask_type {
        let tok = cur.expect("match mask type")?;
        Some(
            tok.parse::<MaskType>()
                .map_err(|_| Error::parse(format!("unknown mask type `{}`", tok)))?,
        )
    } else {
        None
    };

    let mut field_ref = FieldRef {
        instance: node.uid,
        header: header_uid,
        field: field.uid,
        mask_type,
        value: None,
    };

    if !need_value {
        return Ok(field_ref);
    }

    let tok = cur.expect("match value")?;
    let mut parsed = value::parse_value(&field, tok)?;

    // A following non-keyword token is the mask; otherwise the exact mask
    // synthesized by the value parse stands.
    if let Some(next) = cur.peek() {
        if !keywords.contains(&next) {
            cur.next();
            value::parse_mask(&mut parsed, &field, next)?;
        }
    }

    field_ref.value = Some(parsed);
    Ok(field_ref)
}

/// Parse one action clause, positioned after the `action` keyword.
///
/// When the final declared argument is variadic, every remaining token up
/// to the next literal `action` keyword (or end of input) is consumed;
/// variadic tokens inherit the type and name of the last declared
/// non-variadic argument.
pub fn parse_action(cur: &mut Tokens<'_>, pipe: &Pipeline, need_args: bool) -> Result<Action> {
    let name = cur.expect("action name")?;
    let def = pipe
        .action_by_name(name)
        .ok_or_else(|| Error::UnknownAction {
            name: name.to_string(),
        })?;

    let mut action = Action {
        uid: def.uid,
        name: def.name.clone(),
        args: Vec::new(),
    };

    if def.args.is_empty() || !need_args {
        return Ok(action);
    }

    let variadic = def
        .args
        .last()
        .is_some_and(|a| a.arg_type == ActionArgType::Variadic);

    let num_args = if variadic {
        // Count ahead to the clause boundary, then restore the cursor.
        let mark = cur.save();
        let mut count = 0;
        while let Some(tok) = cur.next() {
            if tok == "action" {
                break;
            }
            count += 1;
        }
        cur.restore(mark);
        count
    } else {
        def.args.len()
    };

    let mut bound_type = ActionArgType::Null;
    let mut bound_name = String::new();

    for i in 0..num_args {
        if let Some(decl) = def.args.get(i) {
            if decl.arg_type != ActionArgType::Variadic {
                bound_type = decl.arg_type;
                bound_name = decl.name.clone();
            }
        }

        let Some(tok) = cur.next() else {
            // Token exhaustion is only an error for a declared,
            // non-variadic slot; the variadic pre-scan never overcounts.
            if variadic && i >= def.args.len() - 1 {
                return Ok(action);
            }
            return Err(Error::MissingArg {
                arg_type: bound_type.to_string(),
                name: bound_name,
            });
        };

        let parsed = value::parse_action_arg(bound_type, &bound_name, tok)?;
        action.args.push(ActionArg {
            name: bound_name.clone(),
            arg_type: bound_type,
            value: Some(parsed),
        });
    }

    Ok(action)
}

/// Parse one attribute clause, positioned after the `attrib` keyword.
///
/// `NAME VALUE`, resolved against the target table's declared attribute
/// list. Unknown names and read-only attributes are rejected.
pub fn parse_attrib(cur: &mut Tokens<'_>, pipe: &Pipeline, table_uid: u32) -> Result<NamedValue> {
    let name = cur.expect("attribute name")?;

    let attribs = pipe.table_attribs(table_uid).ok_or_else(|| {
        Error::parse(format!("table {} does not support attributes", table_uid))
    })?;

    let decl = attribs
        .iter()
        .find(|a| a.name == name)
        .ok_or_else(|| Error::UnknownAttribute {
            table: table_uid,
            name: name.to_string(),
        })?;

    if !decl.write {
        return Err(Error::ReadOnlyAttribute {
            table: table_uid,
            name: name.to_string(),
        });
    }

    let tok = cur.expect("attribute value")?;
    let arg_type = match decl.value {
        ScalarValue::U8(_) => ActionArgType::U8,
        ScalarValue::U16(_) => ActionArgType::U16,
        ScalarValue::U32(_) => ActionArgType::U32,
        ScalarValue::U64(_) => ActionArgType::U64,
    };
    let parsed = match value::parse_action_arg(arg_type, name, tok)? {
        ActionArgValue::U8(v) => ScalarValue::U8(v),
        ActionArgValue::U16(v) => ScalarValue::U16(v),
        ActionArgValue::U32(v) => ScalarValue::U32(v),
        ActionArgValue::U64(v) => ScalarValue::U64(v),
        ActionArgValue::In6(_) => unreachable!("attributes have scalar types"),
    };

    Ok(NamedValue {
        uid: decl.uid,
        name: decl.name.clone(),
        write: decl.write,
        value: parsed,
    })
}

/// Parse the `set_rule` argument list.
///
/// `prio NUM handle NUM table NUM match ... action ...`; priority
/// defaults to 1, handle and table are required.
pub fn parse_set_rule(tokens: &[String], pipe: &Pipeline) -> Result<Rule> {
    let mut cur = Tokens::new(tokens);
    let mut rule = Rule::default();

    while let Some(tok) = cur.next() {
        match tok {
            "match" => {
                if rule.matches.len() >= MAT_MAX_MATCHES {
                    return Err(Error::parse("too many matches"));
                }
                let m = parse_match(&mut cur, pipe, true, false, SET_RULE_KEYWORDS)?;
                rule.matches.push(m);
            }
            "action" => {
                if rule.actions.len() >= MAT_MAX_ACTIONS {
                    return Err(Error::parse("too many actions"));
                }
                let a = parse_action(&mut cur, pipe, true)?;
                rule.actions.push(a);
            }
            "prio" => rule.priority = expect_u32(&mut cur, "prio")?,
            "handle" => rule.uid = expect_u32(&mut cur, "handle")?,
            "table" => rule.table_id = expect_u32(&mut cur, "table")?,
            other => {
                return Err(Error::parse(format!("unexpected argument `{}`", other)));
            }
        }
    }

    if rule.table_id == 0 {
        return Err(Error::parse("table id is required"));
    }
    if rule.uid == 0 {
        return Err(Error::parse("rule handle is required"));
    }
    if rule.priority == 0 {
        rule.priority = 1;
    }

    Ok(rule)
}

/// Which table mutation a token list is being parsed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableCmd {
    Create,
    Update,
}

/// Parse the `create`/`update` argument list into a table record.
///
/// Create requires `source`, `name`, and `size` and generates an id when
/// none is given; update requires `id`, forbids `source` and `size`, and
/// requires at least one `attrib`.
pub fn parse_table(tokens: &[String], pipe: &Pipeline, cmd: TableCmd) -> Result<Table> {
    let mut cur = Tokens::new(tokens);
    let mut table = Table::default();

    while let Some(tok) = cur.next() {
        match tok {
            "match" => {
                if table.matches.len() >= MAT_MAX_MATCHES {
                    return Err(Error::parse("too many matches"));
                }
                let m = parse_match(&mut cur, pipe, false, true, &[])?;
                table.matches.push(m);
            }
            "action" => {
                if table.actions.len() >= MAT_MAX_ACTIONS {
                    return Err(Error::parse("too many actions"));
                }
                let a = parse_action(&mut cur, pipe, false)?;
                table.actions.push(a.uid);
            }
            "attrib" => {
                if table.attribs.len() >= MAT_MAX_ATTRIBS {
                    return Err(Error::parse("too many attributes"));
                }
                let v = parse_attrib(&mut cur, pipe, table.uid)?;
                table.attribs.push(v);
            }
            "name" => {
                let name = cur.expect("name")?;
                if name.len() > MAT_MAX_NAME {
                    return Err(Error::parse("table name too long"));
                }
                table.name = name.to_string();
            }
            "id" => table.uid = expect_u32(&mut cur, "id")?,
            "source" => table.source = expect_u32(&mut cur, "source")?,
            "size" => table.size = expect_u32(&mut cur, "size")?,
            other => {
                return Err(Error::parse(format!("unexpected argument `{}`", other)));
            }
        }
    }

    match cmd {
        TableCmd::Create => {
            if table.source == 0 {
                return Err(Error::parse("source is required"));
            }
            if table.name.is_empty() {
                return Err(Error::parse("name is required"));
            }
            if table.size == 0 {
                return Err(Error::parse("size is required"));
            }
            if pipe.table_id_by_name(&table.name).is_some() {
                return Err(Error::parse(format!(
                    "table `{}` already exists",
                    table.name
                )));
            }
            if table.uid == 0 {
                table.uid = pipe.gen_table_id();
            }
        }
        TableCmd::Update => {
            if table.uid == 0 {
                return Err(Error::parse("table id is required for update"));
            }
            if table.source != 0 {
                return Err(Error::parse("source is not a valid update argument"));
            }
            if table.size != 0 {
                return Err(Error::parse("size can not be changed"));
            }
            if table.attribs.is_empty() {
                return Err(Error::parse("no attributes specified for update"));
            }
            if table.name.is_empty() {
                if let Some(name) = pipe.table_name(table.uid) {
                    table.name = name.to_string();
                }
            }
        }
    }

    Ok(table)
}

/// Parse the `destroy` argument list.
///
/// `source NUM (name STRING | id NUM)`; a name and id given together must
/// resolve to the same table.
pub fn parse_destroy(tokens: &[String], pipe: &Pipeline) -> Result<Table> {
    let mut cur = Tokens::new(tokens);
    let mut table = Table::default();

    while let Some(tok) = cur.next() {
        match tok {
            "name" => {
                let name = cur.expect("name")?;
                if name.len() > MAT_MAX_NAME {
                    return Err(Error::parse("table name too long"));
                }
                table.name = name.to_string();
            }
            "id" => table.uid = expect_u32(&mut cur, "id")?,
            "source" => table.source = expect_u32(&mut cur, "source")?,
            other => {
                return Err(Error::parse(format!("unexpected argument `{}`", other)));
            }
        }
    }

    match (table.name.is_empty(), table.uid) {
        (true, 0) => return Err(Error::parse("name or id is required")),
        (false, 0) => {
            table.uid = pipe
                .table_id_by_name(&table.name)
                .ok_or_else(|| Error::UnknownTable {
                    name: table.name.clone(),
                })?;
        }
        (true, uid) => {
            table.name = pipe
                .table_name(uid)
                .ok_or_else(|| Error::UnknownTable {
                    name: uid.to_string(),
                })?
                .to_string();
        }
        (false, uid) => {
            if pipe.table_id_by_name(&table.name) != Some(uid) {
                return Err(Error::TableMismatch {
                    name: table.name.clone(),
                    id: uid,
                });
            }
        }
    }

    if table.source == 0 {
        return Err(Error::parse("source is required"));
    }

    Ok(table)
}

/// A `get_rules` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleQuery {
    pub table: u32,
    pub min: Option<u32>,
    pub max: Option<u32>,
}

/// Parse the `get_rules` argument list: `table (NUM|NAME) [min N] [max N]`.
pub fn parse_get_rules(tokens: &[String], pipe: &Pipeline) -> Result<RuleQuery> {
    let mut cur = Tokens::new(tokens);
    let mut table: Option<&str> = None;
    let mut min = None;
    let mut max = None;

    while let Some(tok) = cur.next() {
        match tok {
            "table" => table = Some(cur.expect("table")?),
            "min" => min = Some(expect_u32(&mut cur, "min")?),
            "max" => max = Some(expect_u32(&mut cur, "max")?),
            other => {
                return Err(Error::parse(format!("unexpected argument `{}`", other)));
            }
        }
    }

    let table = table.ok_or_else(|| Error::parse("missing `table` argument"))?;
    let table_id = match value::parse_int(table) {
        Some(id) if id <= u64::from(u32::MAX) => id as u32,
        _ => pipe
            .table_id_by_name(table)
            .ok_or_else(|| Error::UnknownTable {
                name: table.to_string(),
            })?,
    };

    Ok(RuleQuery {
        table: table_id,
        min,
        max,
    })
}

/// Which port query a token list is being parsed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortLookup {
    /// `get_ports [min N] [max N]`
    Range,
    /// `lport_lookup (pci B:D.F | mac MAC)`
    Logical,
    /// `phys_port_lookup lport N`
    Physical,
}

/// A parsed port query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortQuery {
    pub port: Port,
    pub min: Option<u32>,
    pub max: Option<u32>,
}

/// Parse the argument list of the port query commands.
pub fn parse_port_query(tokens: &[String], lookup: PortLookup) -> Result<PortQuery> {
    let mut cur = Tokens::new(tokens);
    let mut query = PortQuery::default();

    while let Some(tok) = cur.next() {
        match tok {
            "pci" => {
                let tok = cur.expect("pci bus:device.function")?;
                let pci = tok.parse().map_err(|_| {
                    Error::parse(format!("pci device must be `bus:device.function`, got `{}`", tok))
                })?;
                query.port.pci = Some(pci);
            }
            "mac" => {
                let tok = cur.expect("mac address")?;
                query.port.mac_addr = Some(value::parse_mac(tok)?);
            }
            "lport" => query.port.id = Some(expect_u32(&mut cur, "lport")?),
            "min" => query.min = Some(expect_u32(&mut cur, "min")?),
            "max" => query.max = Some(expect_u32(&mut cur, "max")?),
            other => {
                return Err(Error::parse(format!("unexpected argument `{}`", other)));
            }
        }
    }

    match lookup {
        PortLookup::Logical => {
            if query.port.pci.is_some() == query.port.mac_addr.is_some() {
                return Err(Error::parse("exactly one pci/mac argument is required"));
            }
        }
        PortLookup::Physical => {
            if query.port.pci.is_some() || query.port.mac_addr.is_some() {
                return Err(Error::parse("unsupported pci/mac argument"));
            }
            if query.port.id.is_none() {
                return Err(Error::parse("lport is required"));
            }
        }
        PortLookup::Range => {}
    }

    Ok(query)
}

/// Parse the `set_port` argument list.
///
/// `port NUM` is required. An omitted `vlans` clause leaves `port.vlans`
/// unset; the caller preserves the currently configured membership map in
/// that case instead of clearing it.
pub fn parse_set_port(tokens: &[String]) -> Result<Port> {
    let mut cur = Tokens::new(tokens);
    let mut port = Port::default();

    while let Some(tok) = cur.next() {
        match tok {
            "port" => port.id = Some(expect_u32(&mut cur, "port")?),
            "speed" => port.speed = Some(expect_u32(&mut cur, "speed")?),
            "max_frame_size" => {
                let size = expect_u32(&mut cur, "max_frame_size")?;
                if size == 0 {
                    return Err(Error::parse("max_frame_size can not be zero"));
                }
                port.max_frame_size = Some(size);
            }
            "state" => {
                let tok = cur.expect("state")?;
                let state: PortState = tok
                    .parse()
                    .map_err(|_| Error::parse(format!("invalid state `{}`", tok)))?;
                port.state = Some(state);
            }
            "def_vlan" => {
                let vlan = expect_u32(&mut cur, "def_vlan")?;
                if !(1..=4095).contains(&vlan) {
                    return Err(Error::parse("default VLAN must be in range [1..4095]"));
                }
                port.def_vlan = Some(vlan as u16);
            }
            "def_priority" => {
                let prio = expect_u32(&mut cur, "def_priority")?;
                if prio > 7 {
                    return Err(Error::parse(
                        "default VLAN priority must be in range [0..7]",
                    ));
                }
                port.def_priority = Some(prio as u8);
            }
            "vlans" => {
                let list = cur.expect("vlans")?;
                let mut vlans = VlanMembership::new();
                for vid in list.split(',') {
                    match value::parse_int(vid) {
                        Some(v) if v <= 4095 => vlans.set(v as u16),
                        _ => {
                            return Err(Error::parse(format!("invalid `vlans` input `{}`", vid)));
                        }
                    }
                }
                port.vlans = Some(vlans);
            }
            "drop_tagged" => port.drop_tagged = Some(expect_flag(&mut cur, "drop_tagged")?),
            "drop_untagged" => port.drop_untagged = Some(expect_flag(&mut cur, "drop_untagged")?),
            "loopback" => port.loopback = Some(expect_flag(&mut cur, "loopback")?),
            "learning" => port.learning = Some(expect_flag(&mut cur, "learning")?),
            "update_dscp" => port.update_dscp = Some(expect_flag(&mut cur, "update_dscp")?),
            "update_ttl" => port.update_ttl = Some(expect_flag(&mut cur, "update_ttl")?),
            "update_dmac" => port.update_dmac = Some(expect_flag(&mut cur, "update_dmac")?),
            "update_smac" => port.update_smac = Some(expect_flag(&mut cur, "update_smac")?),
            "update_vlan" => port.update_vlan = Some(expect_flag(&mut cur, "update_vlan")?),
            "mcast_flooding" => {
                port.mcast_flooding = Some(expect_flag(&mut cur, "mcast_flooding")?)
            }
            other => {
                return Err(Error::parse(format!("unexpected argument `{}`", other)));
            }
        }
    }

    if port.id.is_none() {
        return Err(Error::parse("port id is required"));
    }

    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::genl::mat::pipeline::fixtures;
    use crate::netlink::genl::mat::types::FieldValue;

    fn toks(s: &str) -> Vec<String> {
        s.split_whitespace().map(String::from).collect()
    }

    #[test]
    fn test_set_rule_full_line() {
        let pipe = fixtures::pipeline();
        let rule = parse_set_rule(
            &toks(
                "prio 10 handle 4 table 1 \
                 match ethernet.dst_mac 00:01:02:03:04:05 ff:ff:ff:ff:ff:ff \
                 match ipv4.dst_ip 10.0.0.0 255.0.0.0 \
                 action set_egress_port 5",
            ),
            &pipe,
        )
        .unwrap();

        assert_eq!(rule.priority, 10);
        assert_eq!(rule.uid, 4);
        assert_eq!(rule.table_id, 1);
        assert_eq!(rule.matches.len(), 2);
        assert_eq!(
            rule.matches[0].value,
            Some(FieldValue::U64 {
                value: 0x000102030405,
                mask: 0xffffffffffff,
            })
        );
        assert_eq!(
            rule.matches[1].value,
            Some(FieldValue::U32 {
                value: 0x0a000000,
                mask: 0xff000000,
            })
        );
        assert_eq!(rule.actions.len(), 1);
        assert_eq!(
            rule.actions[0].args[0].value,
            Some(ActionArgValue::U32(5))
        );
    }

    #[test]
    fn test_set_rule_defaults_priority() {
        let pipe = fixtures::pipeline();
        let rule = parse_set_rule(
            &toks("handle 1 table 1 match ethernet.ethertype 0x800 action drop_packet"),
            &pipe,
        )
        .unwrap();
        assert_eq!(rule.priority, 1);
    }

    #[test]
    fn test_set_rule_requires_table_and_handle() {
        let pipe = fixtures::pipeline();
        assert!(parse_set_rule(&toks("handle 1"), &pipe).is_err());
        assert!(parse_set_rule(&toks("table 1"), &pipe).is_err());
    }

    #[test]
    fn test_keyword_stops_mask_consumption() {
        let pipe = fixtures::pipeline();
        // `action` directly after the value must not be eaten as a mask.
        let rule = parse_set_rule(
            &toks("handle 1 table 1 match ipv4.tos 4 action drop_packet"),
            &pipe,
        )
        .unwrap();
        assert_eq!(
            rule.matches[0].value,
            Some(FieldValue::U8 {
                value: 4,
                mask: 0xff,
            })
        );
        assert_eq!(rule.actions.len(), 1);
    }

    #[test]
    fn test_unknown_instance_and_field() {
        let pipe = fixtures::pipeline();
        let err = parse_set_rule(&toks("handle 1 table 1 match bogus.f 1"), &pipe).unwrap_err();
        assert!(matches!(err, Error::UnknownInstance { .. }));

        let err =
            parse_set_rule(&toks("handle 1 table 1 match ethernet.bogus 1"), &pipe).unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn test_multi_header_instance_rejected() {
        let pipe = fixtures::pipeline();
        assert!(parse_set_rule(&toks("handle 1 table 1 match overlay.tos 1"), &pipe).is_err());
    }

    #[test]
    fn test_variadic_consumes_to_clause_boundary() {
        let pipe = fixtures::pipeline();
        let rule = parse_set_rule(
            &toks(
                "handle 1 table 1 \
                 action forward_to_ports 1 2 3 4 \
                 action drop_packet",
            ),
            &pipe,
        )
        .unwrap();

        // Exactly the 4 tokens before the next `action` keyword.
        assert_eq!(rule.actions.len(), 2);
        assert_eq!(rule.actions[0].args.len(), 4);
        assert_eq!(
            rule.actions[0]
                .args
                .iter()
                .map(|a| a.value.unwrap())
                .collect::<Vec<_>>(),
            vec![
                ActionArgValue::U32(1),
                ActionArgValue::U32(2),
                ActionArgValue::U32(3),
                ActionArgValue::U32(4),
            ]
        );
        // Variadic tokens inherit the preceding declared argument's name.
        assert!(rule.actions[0].args.iter().all(|a| a.name == "port"));
        assert_eq!(rule.actions[1].name, "drop_packet");
    }

    #[test]
    fn test_variadic_at_end_of_input() {
        let pipe = fixtures::pipeline();
        let rule =
            parse_set_rule(&toks("handle 1 table 1 action forward_to_ports 7 8"), &pipe).unwrap();
        assert_eq!(rule.actions[0].args.len(), 2);
    }

    #[test]
    fn test_missing_action_arg() {
        let pipe = fixtures::pipeline();
        let err =
            parse_set_rule(&toks("handle 1 table 1 action set_egress_port"), &pipe).unwrap_err();
        match err {
            Error::MissingArg { arg_type, name } => {
                assert_eq!(arg_type, "u32");
                assert_eq!(name, "port");
            }
            other => panic!("expected MissingArg, got {other}"),
        }
    }

    #[test]
    fn test_create_table() {
        let pipe = fixtures::pipeline();
        let table = parse_table(
            &toks(
                "source 1 name l2fwd size 1024 \
                 match ethernet.dst_mac exact \
                 match ipv4.dst_ip lpm \
                 action set_egress_port",
            ),
            &pipe,
            TableCmd::Create,
        )
        .unwrap();

        assert_eq!(table.source, 1);
        assert_eq!(table.name, "l2fwd");
        assert_eq!(table.size, 1024);
        // Unused ids start after the fixture's two tables.
        assert_eq!(table.uid, 3);
        assert_eq!(table.matches.len(), 2);
        assert_eq!(table.matches[0].mask_type, Some(MaskType::Exact));
        assert_eq!(table.matches[1].mask_type, Some(MaskType::Lpm));
        assert!(table.matches.iter().all(|m| m.value.is_none()));
        assert_eq!(table.actions, vec![2]);
    }

    #[test]
    fn test_create_requires_size_name_source() {
        let pipe = fixtures::pipeline();
        let err = parse_table(&toks("source 1 name t"), &pipe, TableCmd::Create).unwrap_err();
        assert!(err.to_string().contains("size is required"));
        assert!(parse_table(&toks("name t size 10"), &pipe, TableCmd::Create).is_err());
        assert!(parse_table(&toks("source 1 size 10"), &pipe, TableCmd::Create).is_err());
    }

    #[test]
    fn test_create_rejects_duplicate_name() {
        let pipe = fixtures::pipeline();
        let err =
            parse_table(&toks("source 1 name tcam size 10"), &pipe, TableCmd::Create).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_update_validation() {
        let pipe = fixtures::pipeline();

        // size is not allowed on update
        let err = parse_table(
            &toks("id 1 size 10 attrib vxlan_dst_mac 00:11:22:33:44:55"),
            &pipe,
            TableCmd::Update,
        )
        .unwrap_err();
        assert!(err.to_string().contains("size can not be changed"));

        // id is required
        let err = parse_table(
            &toks("attrib vxlan_dst_mac 00:11:22:33:44:55"),
            &pipe,
            TableCmd::Update,
        )
        .unwrap_err();
        assert!(err.to_string().contains("id is required"));

        // at least one attrib is required
        let err = parse_table(&toks("id 1"), &pipe, TableCmd::Update).unwrap_err();
        assert!(err.to_string().contains("no attributes"));

        // a valid update inherits the current name
        let table = parse_table(
            &toks("id 1 attrib vxlan_dst_mac 00:11:22:33:44:55"),
            &pipe,
            TableCmd::Update,
        )
        .unwrap();
        assert_eq!(table.name, "tcam");
        assert_eq!(
            table.attribs[0].value,
            ScalarValue::U64(0x001122334455)
        );
    }

    #[test]
    fn test_attrib_rejects_unknown_and_readonly() {
        let pipe = fixtures::pipeline();
        let err = parse_table(
            &toks("id 1 attrib bogus 1"),
            &pipe,
            TableCmd::Update,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnknownAttribute { .. }));

        let err = parse_table(
            &toks("id 1 attrib rule_count 5"),
            &pipe,
            TableCmd::Update,
        )
        .unwrap_err();
        assert!(matches!(err, Error::ReadOnlyAttribute { .. }));

        // Table 2 declares no attributes at all.
        let err = parse_table(
            &toks("id 2 attrib anything 5"),
            &pipe,
            TableCmd::Update,
        )
        .unwrap_err();
        assert!(err.to_string().contains("does not support attributes"));
    }

    #[test]
    fn test_destroy_resolution() {
        let pipe = fixtures::pipeline();

        let t = parse_destroy(&toks("source 1 name nexthop"), &pipe).unwrap();
        assert_eq!(t.uid, 2);

        let t = parse_destroy(&toks("source 1 id 2"), &pipe).unwrap();
        assert_eq!(t.name, "nexthop");

        // Consistent name and id pass.
        assert!(parse_destroy(&toks("source 1 name tcam id 1"), &pipe).is_ok());

        // Mismatched name and id fail before anything is sent.
        let err = parse_destroy(&toks("source 1 name tcam id 2"), &pipe).unwrap_err();
        assert!(matches!(err, Error::TableMismatch { .. }));

        assert!(parse_destroy(&toks("source 1"), &pipe).is_err());
        assert!(parse_destroy(&toks("name tcam"), &pipe).is_err());
    }

    #[test]
    fn test_get_rules_table_by_name_or_id() {
        let pipe = fixtures::pipeline();
        let q = parse_get_rules(&toks("table nexthop min 5 max 9"), &pipe).unwrap();
        assert_eq!(
            q,
            RuleQuery {
                table: 2,
                min: Some(5),
                max: Some(9),
            }
        );

        let q = parse_get_rules(&toks("table 1"), &pipe).unwrap();
        assert_eq!(q.table, 1);

        assert!(parse_get_rules(&toks("min 1"), &pipe).is_err());
    }

    #[test]
    fn test_port_query_validation() {
        let q = parse_port_query(&toks("pci 5e:00.1"), PortLookup::Logical).unwrap();
        assert!(q.port.pci.is_some());

        // Logical lookup wants exactly one of pci/mac.
        assert!(parse_port_query(&toks(""), PortLookup::Logical).is_err());
        assert!(
            parse_port_query(&toks("pci 5e:00.1 mac 00:11:22:33:44:55"), PortLookup::Logical)
                .is_err()
        );

        // Physical lookup requires lport and rejects pci/mac.
        assert!(parse_port_query(&toks("lport 5"), PortLookup::Physical).is_ok());
        assert!(parse_port_query(&toks(""), PortLookup::Physical).is_err());
        assert!(parse_port_query(&toks("pci 5e:00.1"), PortLookup::Physical).is_err());

        let q = parse_port_query(&toks("min 1 max 4"), PortLookup::Range).unwrap();
        assert_eq!((q.min, q.max), (Some(1), Some(4)));
    }

    #[test]
    fn test_set_port_vlans_bits() {
        let port = parse_set_port(&toks("port 2 vlans 10,20,4095")).unwrap();
        let vlans = port.vlans.unwrap();
        assert_eq!(vlans.iter().collect::<Vec<_>>(), vec![10, 20, 4095]);
    }

    #[test]
    fn test_set_port_validation() {
        assert!(parse_set_port(&toks("speed 1000")).is_err()); // port required
        assert!(parse_set_port(&toks("port 1 vlans 4096")).is_err());
        assert!(parse_set_port(&toks("port 1 def_vlan 0")).is_err());
        assert!(parse_set_port(&toks("port 1 def_priority 8")).is_err());
        assert!(parse_set_port(&toks("port 1 max_frame_size 0")).is_err());
        assert!(parse_set_port(&toks("port 1 state sideways")).is_err());
        assert!(parse_set_port(&toks("port 1 learning on")).is_err());

        let port = parse_set_port(&toks(
            "port 2 speed 1000 state up learning enabled drop_tagged disabled",
        ))
        .unwrap();
        assert_eq!(port.id, Some(2));
        assert_eq!(port.state, Some(PortState::Up));
        assert_eq!(port.learning, Some(FlagState::Enabled));
        assert_eq!(port.drop_tagged, Some(FlagState::Disabled));
        assert!(port.vlans.is_none());
    }
}
