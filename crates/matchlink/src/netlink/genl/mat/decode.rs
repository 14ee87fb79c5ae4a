//! Record deserialization from the nested attribute wire format.
//!
//! Decoders walk collection nests item by item. A malformed item is
//! logged and skipped rather than failing the whole reply; only damage
//! that prevents identifying the surrounding structure is fatal.

use tracing::warn;

use super::types::{
    Action, ActionArg, ActionArgType, ActionArgValue, Field, FieldRef, FieldValue, FlagState,
    Header, HeaderNode, MaskType, NamedValue, Port, PortState, Rule, ScalarValue, Table,
    TableNode, VlanMembership, VLAN_BITMAP_LEN,
};
use super::{
    ActionArgAttr, ActionArgTypeAttr, ActionAttr, ActionsAttr, AttribsAttr, FieldAttr,
    FieldRefAttr, FieldRefType, FieldsAttr, FlagStateAttr, GraphNodeAttr, HeaderAttr,
    HeaderGraphAttr, HeadersAttr, MaskTypeAttr, MatchesAttr, NamedValueAttr, NamedValueTypeAttr,
    PortAttr, PortStateAttr, PortVlanAttr, PortsAttr, RuleAttr, RulesAttr, SignatureAttr,
    TableAttr, TableGraphAttr, TableNodeAttr, TablesAttr,
};
use crate::netlink::attr::{AttrIter, get};
use crate::netlink::error::{Error, Result};

fn mask_type_from(raw: u32) -> Option<MaskType> {
    match raw {
        x if x == MaskTypeAttr::Exact as u32 => Some(MaskType::Exact),
        x if x == MaskTypeAttr::Mask as u32 => Some(MaskType::Mask),
        x if x == MaskTypeAttr::Lpm as u32 => Some(MaskType::Lpm),
        _ => None,
    }
}

fn flag_from(raw: u8) -> Option<FlagState> {
    match raw {
        x if x == FlagStateAttr::Enabled as u8 => Some(FlagState::Enabled),
        x if x == FlagStateAttr::Disabled as u8 => Some(FlagState::Disabled),
        _ => None,
    }
}

fn arg_type_from(raw: u32) -> Option<ActionArgType> {
    match raw {
        x if x == ActionArgTypeAttr::Null as u32 => Some(ActionArgType::Null),
        x if x == ActionArgTypeAttr::U8 as u32 => Some(ActionArgType::U8),
        x if x == ActionArgTypeAttr::U16 as u32 => Some(ActionArgType::U16),
        x if x == ActionArgTypeAttr::U32 as u32 => Some(ActionArgType::U32),
        x if x == ActionArgTypeAttr::U64 as u32 => Some(ActionArgType::U64),
        x if x == ActionArgTypeAttr::In6 as u32 => Some(ActionArgType::In6),
        x if x == ActionArgTypeAttr::Variadic as u32 => Some(ActionArgType::Variadic),
        _ => None,
    }
}

/// Decode one field reference item.
fn parse_field_ref(data: &[u8]) -> Result<FieldRef> {
    let mut fref = FieldRef {
        instance: 0,
        header: 0,
        field: 0,
        mask_type: None,
        value: None,
    };
    let mut ref_type: Option<FieldRefType> = None;
    let mut value_payload: Option<&[u8]> = None;
    let mut mask_payload: Option<&[u8]> = None;

    for (attr_type, payload) in AttrIter::new(data) {
        match attr_type {
            t if t == FieldRefAttr::Instance as u16 => fref.instance = get::u32_ne(payload)?,
            t if t == FieldRefAttr::Header as u16 => fref.header = get::u32_ne(payload)?,
            t if t == FieldRefAttr::Field as u16 => fref.field = get::u32_ne(payload)?,
            t if t == FieldRefAttr::MaskType as u16 => {
                fref.mask_type = mask_type_from(get::u32_ne(payload)?);
            }
            t if t == FieldRefAttr::Type as u16 => {
                ref_type = match get::u32_ne(payload)? {
                    x if x == FieldRefType::U8 as u32 => Some(FieldRefType::U8),
                    x if x == FieldRefType::U16 as u32 => Some(FieldRefType::U16),
                    x if x == FieldRefType::U32 as u32 => Some(FieldRefType::U32),
                    x if x == FieldRefType::U64 as u32 => Some(FieldRefType::U64),
                    x if x == FieldRefType::In6 as u32 => Some(FieldRefType::In6),
                    other => {
                        return Err(Error::InvalidAttribute(format!(
                            "unknown field ref type {}",
                            other
                        )));
                    }
                };
            }
            t if t == FieldRefAttr::Value as u16 => value_payload = Some(payload),
            t if t == FieldRefAttr::Mask as u16 => mask_payload = Some(payload),
            _ => {}
        }
    }

    if let (Some(ref_type), Some(value), Some(mask)) = (ref_type, value_payload, mask_payload) {
        fref.value = Some(match ref_type {
            FieldRefType::U8 => FieldValue::U8 {
                value: get::u8(value)?,
                mask: get::u8(mask)?,
            },
            FieldRefType::U16 => FieldValue::U16 {
                value: get::u16_ne(value)?,
                mask: get::u16_ne(mask)?,
            },
            FieldRefType::U32 => FieldValue::U32 {
                value: get::u32_ne(value)?,
                mask: get::u32_ne(mask)?,
            },
            FieldRefType::U64 => FieldValue::U64 {
                value: get::u64_ne(value)?,
                mask: get::u64_ne(mask)?,
            },
            FieldRefType::In6 => FieldValue::In6 {
                value: get::in6(value)?,
                mask: get::in6(mask)?,
            },
            FieldRefType::Unspec => unreachable!(),
        });
    }

    Ok(fref)
}

/// Decode an action argument value under its declared type.
fn parse_arg_value(arg_type: ActionArgType, payload: &[u8]) -> Result<ActionArgValue> {
    Ok(match arg_type {
        ActionArgType::U8 => ActionArgValue::U8(get::u8(payload)?),
        ActionArgType::U16 => ActionArgValue::U16(get::u16_ne(payload)?),
        ActionArgType::U32 => ActionArgValue::U32(get::u32_ne(payload)?),
        ActionArgType::U64 => ActionArgValue::U64(get::u64_ne(payload)?),
        ActionArgType::In6 => ActionArgValue::In6(get::in6(payload)?),
        ActionArgType::Null | ActionArgType::Variadic => {
            return Err(Error::InvalidAttribute(
                "value on a non-value argument type".into(),
            ));
        }
    })
}

/// Decode one action item.
fn parse_action(data: &[u8]) -> Result<Action> {
    let mut action = Action {
        uid: 0,
        name: String::new(),
        args: Vec::new(),
    };

    for (attr_type, payload) in AttrIter::new(data) {
        match attr_type {
            t if t == ActionAttr::Name as u16 => action.name = get::string(payload)?.to_string(),
            t if t == ActionAttr::Uid as u16 => action.uid = get::u32_ne(payload)?,
            t if t == ActionAttr::Signature as u16 => {
                for (sig_type, arg_data) in AttrIter::new(payload) {
                    if sig_type != SignatureAttr::Arg as u16 {
                        continue;
                    }
                    let mut name = String::new();
                    let mut arg_type = ActionArgType::Null;
                    let mut value_payload: Option<&[u8]> = None;
                    for (t, p) in AttrIter::new(arg_data) {
                        match t {
                            x if x == ActionArgAttr::Name as u16 => {
                                name = get::string(p)?.to_string();
                            }
                            x if x == ActionArgAttr::Type as u16 => {
                                arg_type = arg_type_from(get::u32_ne(p)?).ok_or_else(|| {
                                    Error::InvalidAttribute("unknown action arg type".into())
                                })?;
                            }
                            x if x == ActionArgAttr::Value as u16 => value_payload = Some(p),
                            _ => {}
                        }
                    }
                    let value = match value_payload {
                        Some(p) => Some(parse_arg_value(arg_type, p)?),
                        None => None,
                    };
                    action.args.push(ActionArg {
                        name,
                        arg_type,
                        value,
                    });
                }
            }
            _ => {}
        }
    }

    Ok(action)
}

/// Decode one named value item.
fn parse_named_value(data: &[u8]) -> Result<NamedValue> {
    let mut uid = 0;
    let mut name = String::new();
    let mut write = false;
    let mut kind: Option<NamedValueTypeAttr> = None;
    let mut value_payload: Option<&[u8]> = None;

    for (attr_type, payload) in AttrIter::new(data) {
        match attr_type {
            t if t == NamedValueAttr::Uid as u16 => uid = get::u32_ne(payload)?,
            t if t == NamedValueAttr::Name as u16 => name = get::string(payload)?.to_string(),
            t if t == NamedValueAttr::Write as u16 => write = get::u8(payload)? != 0,
            t if t == NamedValueAttr::Type as u16 => {
                kind = match get::u32_ne(payload)? {
                    x if x == NamedValueTypeAttr::U8 as u32 => Some(NamedValueTypeAttr::U8),
                    x if x == NamedValueTypeAttr::U16 as u32 => Some(NamedValueTypeAttr::U16),
                    x if x == NamedValueTypeAttr::U32 as u32 => Some(NamedValueTypeAttr::U32),
                    x if x == NamedValueTypeAttr::U64 as u32 => Some(NamedValueTypeAttr::U64),
                    other => {
                        return Err(Error::InvalidAttribute(format!(
                            "unknown named value type {}",
                            other
                        )));
                    }
                };
            }
            t if t == NamedValueAttr::Value as u16 => value_payload = Some(payload),
            _ => {}
        }
    }

    let kind = kind.ok_or_else(|| Error::InvalidAttribute("named value without type".into()))?;
    let value = match (kind, value_payload) {
        (NamedValueTypeAttr::U8, Some(p)) => ScalarValue::U8(get::u8(p)?),
        (NamedValueTypeAttr::U16, Some(p)) => ScalarValue::U16(get::u16_ne(p)?),
        (NamedValueTypeAttr::U32, Some(p)) => ScalarValue::U32(get::u32_ne(p)?),
        (NamedValueTypeAttr::U64, Some(p)) => ScalarValue::U64(get::u64_ne(p)?),
        (NamedValueTypeAttr::U8, None) => ScalarValue::U8(0),
        (NamedValueTypeAttr::U16, None) => ScalarValue::U16(0),
        (NamedValueTypeAttr::U32, None) => ScalarValue::U32(0),
        (NamedValueTypeAttr::U64, None) => ScalarValue::U64(0),
        (NamedValueTypeAttr::Unspec, _) => unreachable!(),
    };

    Ok(NamedValue {
        uid,
        name,
        write,
        value,
    })
}

/// Decode the `Tables` collection.
pub fn parse_tables(data: &[u8]) -> Result<Vec<Table>> {
    let mut tables = Vec::new();
    for (attr_type, item) in AttrIter::new(data) {
        if attr_type != TablesAttr::Table as u16 {
            continue;
        }
        match parse_table(item) {
            Ok(table) => tables.push(table),
            Err(e) => warn!("skipping malformed table: {}", e),
        }
    }
    Ok(tables)
}

fn parse_table(data: &[u8]) -> Result<Table> {
    let mut table = Table::default();
    for (attr_type, payload) in AttrIter::new(data) {
        match attr_type {
            t if t == TableAttr::Name as u16 => table.name = get::string(payload)?.to_string(),
            t if t == TableAttr::Uid as u16 => table.uid = get::u32_ne(payload)?,
            t if t == TableAttr::Source as u16 => table.source = get::u32_ne(payload)?,
            t if t == TableAttr::Size as u16 => table.size = get::u32_ne(payload)?,
            t if t == TableAttr::Matches as u16 => {
                for (m_type, m_data) in AttrIter::new(payload) {
                    if m_type == MatchesAttr::FieldRef as u16 {
                        table.matches.push(parse_field_ref(m_data)?);
                    }
                }
            }
            t if t == TableAttr::Actions as u16 => {
                for (a_type, a_data) in AttrIter::new(payload) {
                    if a_type == ActionsAttr::ActionUid as u16 {
                        table.actions.push(get::u32_ne(a_data)?);
                    }
                }
            }
            t if t == TableAttr::Attribs as u16 => {
                for (v_type, v_data) in AttrIter::new(payload) {
                    if v_type == AttribsAttr::NamedValue as u16 {
                        table.attribs.push(parse_named_value(v_data)?);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(table)
}

/// Decode the `Headers` collection.
pub fn parse_headers(data: &[u8]) -> Result<Vec<Header>> {
    let mut headers = Vec::new();
    for (attr_type, item) in AttrIter::new(data) {
        if attr_type != HeadersAttr::Header as u16 {
            continue;
        }
        match parse_header(item) {
            Ok(header) => headers.push(header),
            Err(e) => warn!("skipping malformed header: {}", e),
        }
    }
    Ok(headers)
}

fn parse_header(data: &[u8]) -> Result<Header> {
    let mut header = Header {
        uid: 0,
        name: String::new(),
        fields: Vec::new(),
    };
    for (attr_type, payload) in AttrIter::new(data) {
        match attr_type {
            t if t == HeaderAttr::Name as u16 => header.name = get::string(payload)?.to_string(),
            t if t == HeaderAttr::Uid as u16 => header.uid = get::u32_ne(payload)?,
            t if t == HeaderAttr::Fields as u16 => {
                for (f_type, f_data) in AttrIter::new(payload) {
                    if f_type == FieldsAttr::Field as u16 {
                        header.fields.push(parse_field(f_data)?);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(header)
}

fn parse_field(data: &[u8]) -> Result<Field> {
    let mut field = Field {
        uid: 0,
        name: String::new(),
        bitwidth: 0,
    };
    for (attr_type, payload) in AttrIter::new(data) {
        match attr_type {
            t if t == FieldAttr::Name as u16 => field.name = get::string(payload)?.to_string(),
            t if t == FieldAttr::Uid as u16 => field.uid = get::u32_ne(payload)?,
            t if t == FieldAttr::BitWidth as u16 => field.bitwidth = get::u32_ne(payload)?,
            _ => {}
        }
    }
    Ok(field)
}

/// Decode the `Actions` collection.
pub fn parse_actions(data: &[u8]) -> Result<Vec<Action>> {
    let mut actions = Vec::new();
    for (attr_type, item) in AttrIter::new(data) {
        if attr_type != ActionsAttr::Action as u16 {
            continue;
        }
        match parse_action(item) {
            Ok(action) => actions.push(action),
            Err(e) => warn!("skipping malformed action: {}", e),
        }
    }
    Ok(actions)
}

/// Decode the `HeaderGraph` collection.
pub fn parse_header_nodes(data: &[u8]) -> Result<Vec<HeaderNode>> {
    let mut nodes = Vec::new();
    for (attr_type, item) in AttrIter::new(data) {
        if attr_type != HeaderGraphAttr::Node as u16 {
            continue;
        }
        let mut node = HeaderNode {
            uid: 0,
            name: String::new(),
            headers: Vec::new(),
        };
        for (t, payload) in AttrIter::new(item) {
            match t {
                x if x == GraphNodeAttr::Name as u16 => {
                    node.name = get::string(payload)?.to_string();
                }
                x if x == GraphNodeAttr::Uid as u16 => node.uid = get::u32_ne(payload)?,
                x if x == GraphNodeAttr::Headers as u16 => {
                    for (h_type, h_data) in AttrIter::new(payload) {
                        if h_type == GraphNodeAttr::HeaderUid as u16 {
                            node.headers.push(get::u32_ne(h_data)?);
                        }
                    }
                }
                _ => {}
            }
        }
        nodes.push(node);
    }
    Ok(nodes)
}

/// Decode the `TableGraph` collection.
pub fn parse_table_nodes(data: &[u8]) -> Result<Vec<TableNode>> {
    let mut nodes = Vec::new();
    for (attr_type, item) in AttrIter::new(data) {
        if attr_type != TableGraphAttr::Node as u16 {
            continue;
        }
        let mut node = TableNode::default();
        for (t, payload) in AttrIter::new(item) {
            match t {
                x if x == TableNodeAttr::Uid as u16 => node.uid = get::u32_ne(payload)?,
                x if x == TableNodeAttr::Flags as u16 => node.flags = get::u32_ne(payload)?,
                x if x == TableNodeAttr::Jump as u16 => {
                    for (j_type, j_data) in AttrIter::new(payload) {
                        if j_type == TableNodeAttr::Uid as u16 {
                            node.jump.push(get::u32_ne(j_data)?);
                        }
                    }
                }
                _ => {}
            }
        }
        nodes.push(node);
    }
    Ok(nodes)
}

/// Decode the `Rules` collection.
pub fn parse_rules(data: &[u8]) -> Result<Vec<Rule>> {
    let mut rules = Vec::new();
    for (attr_type, item) in AttrIter::new(data) {
        if attr_type != RulesAttr::Rule as u16 {
            continue;
        }
        match parse_rule(item) {
            Ok(rule) => rules.push(rule),
            Err(e) => warn!("skipping malformed rule: {}", e),
        }
    }
    Ok(rules)
}

fn parse_rule(data: &[u8]) -> Result<Rule> {
    let mut rule = Rule::default();
    for (attr_type, payload) in AttrIter::new(data) {
        match attr_type {
            t if t == RuleAttr::Table as u16 => rule.table_id = get::u32_ne(payload)?,
            t if t == RuleAttr::Uid as u16 => rule.uid = get::u32_ne(payload)?,
            t if t == RuleAttr::Priority as u16 => rule.priority = get::u32_ne(payload)?,
            t if t == RuleAttr::Matches as u16 => {
                for (m_type, m_data) in AttrIter::new(payload) {
                    if m_type == MatchesAttr::FieldRef as u16 {
                        rule.matches.push(parse_field_ref(m_data)?);
                    }
                }
            }
            t if t == RuleAttr::Actions as u16 => {
                for (a_type, a_data) in AttrIter::new(payload) {
                    if a_type == ActionsAttr::Action as u16 {
                        rule.actions.push(parse_action(a_data)?);
                    }
                }
            }
            _ => {}
        }
    }
    Ok(rule)
}

/// Decode the `Ports` collection.
pub fn parse_ports(data: &[u8]) -> Result<Vec<Port>> {
    let mut ports = Vec::new();
    for (attr_type, item) in AttrIter::new(data) {
        if attr_type != PortsAttr::Port as u16 {
            continue;
        }
        match parse_port(item) {
            Ok(port) => ports.push(port),
            Err(e) => warn!("skipping malformed port: {}", e),
        }
    }
    Ok(ports)
}

fn parse_port(data: &[u8]) -> Result<Port> {
    let mut port = Port::default();
    for (attr_type, payload) in AttrIter::new(data) {
        match attr_type {
            t if t == PortAttr::Id as u16 => port.id = Some(get::u32_ne(payload)?),
            t if t == PortAttr::Pci as u16 => {
                if payload.len() < 3 {
                    return Err(Error::InvalidAttribute("truncated pci attribute".into()));
                }
                port.pci = Some(super::types::PciAddress {
                    bus: payload[0],
                    device: payload[1],
                    function: payload[2],
                });
            }
            t if t == PortAttr::MacAddr as u16 => port.mac_addr = Some(get::u64_ne(payload)?),
            t if t == PortAttr::State as u16 => {
                port.state = match get::u32_ne(payload)? {
                    x if x == PortStateAttr::Up as u32 => Some(PortState::Up),
                    x if x == PortStateAttr::Down as u32 => Some(PortState::Down),
                    _ => None,
                };
            }
            t if t == PortAttr::Speed as u16 => port.speed = Some(get::u32_ne(payload)?),
            t if t == PortAttr::MaxFrameSize as u16 => {
                port.max_frame_size = Some(get::u32_ne(payload)?);
            }
            t if t == PortAttr::Vlan as u16 => {
                for (v_type, v_data) in AttrIter::new(payload) {
                    match v_type {
                        x if x == PortVlanAttr::DefVlan as u16 => {
                            port.def_vlan = Some(get::u16_ne(v_data)?);
                        }
                        x if x == PortVlanAttr::DefPriority as u16 => {
                            port.def_priority = Some(get::u8(v_data)?);
                        }
                        x if x == PortVlanAttr::DropTagged as u16 => {
                            port.drop_tagged = flag_from(get::u8(v_data)?);
                        }
                        x if x == PortVlanAttr::DropUntagged as u16 => {
                            port.drop_untagged = flag_from(get::u8(v_data)?);
                        }
                        x if x == PortVlanAttr::Membership as u16 => {
                            if v_data.len() < VLAN_BITMAP_LEN {
                                return Err(Error::InvalidAttribute(
                                    "truncated vlan membership bitmap".into(),
                                ));
                            }
                            let mut bytes = [0u8; VLAN_BITMAP_LEN];
                            bytes.copy_from_slice(&v_data[..VLAN_BITMAP_LEN]);
                            port.vlans = Some(VlanMembership::from_bytes(bytes));
                        }
                        _ => {}
                    }
                }
            }
            t if t == PortAttr::Loopback as u16 => port.loopback = flag_from(get::u8(payload)?),
            t if t == PortAttr::Learning as u16 => port.learning = flag_from(get::u8(payload)?),
            t if t == PortAttr::UpdateDscp as u16 => {
                port.update_dscp = flag_from(get::u8(payload)?);
            }
            t if t == PortAttr::UpdateTtl as u16 => port.update_ttl = flag_from(get::u8(payload)?),
            t if t == PortAttr::UpdateDmac as u16 => {
                port.update_dmac = flag_from(get::u8(payload)?);
            }
            t if t == PortAttr::UpdateSmac as u16 => {
                port.update_smac = flag_from(get::u8(payload)?);
            }
            t if t == PortAttr::UpdateVlan as u16 => {
                port.update_vlan = flag_from(get::u8(payload)?);
            }
            t if t == PortAttr::McastFlooding as u16 => {
                port.mcast_flooding = flag_from(get::u8(payload)?);
            }
            _ => {}
        }
    }
    Ok(port)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::attr::AttrIter;
    use crate::netlink::builder::MessageBuilder;
    use crate::netlink::genl::mat::encode;
    use crate::netlink::genl::mat::types::PciAddress;
    use crate::netlink::genl::mat::MatAttr;
    use crate::netlink::message::NLMSG_HDRLEN;

    /// Encode a collection nest and hand back its payload for decoding.
    fn collection(
        attr: MatAttr,
        fill: impl FnOnce(&mut MessageBuilder),
    ) -> Vec<u8> {
        let mut b = MessageBuilder::new(1, 0);
        let nest = b.nest_start(attr as u16);
        fill(&mut b);
        b.nest_end(nest);
        let msg = b.finish();

        let (_, payload) = AttrIter::new(&msg[NLMSG_HDRLEN..])
            .find(|(t, _)| *t == attr as u16)
            .expect("collection attribute present");
        payload.to_vec()
    }

    fn sample_rule(matches: usize, actions: usize) -> Rule {
        let mut rule = Rule {
            table_id: 2,
            uid: 30,
            priority: 7,
            matches: Vec::new(),
            actions: Vec::new(),
        };
        for i in 0..matches {
            rule.matches.push(FieldRef {
                instance: 1,
                header: 1,
                field: i as u32 + 1,
                mask_type: None,
                value: Some(match i % 5 {
                    0 => FieldValue::U8 {
                        value: i as u8,
                        mask: 0xff,
                    },
                    1 => FieldValue::U16 {
                        value: 0x800,
                        mask: 0xffff,
                    },
                    2 => FieldValue::U32 {
                        value: 0x0a000001 + i as u32,
                        mask: 0xffffff00,
                    },
                    3 => FieldValue::U64 {
                        value: 0x000102030405,
                        mask: u64::MAX,
                    },
                    _ => FieldValue::In6 {
                        value: [i as u8; 16],
                        mask: [0xff; 16],
                    },
                }),
            });
        }
        for i in 0..actions {
            rule.actions.push(Action {
                uid: i as u32 + 1,
                name: format!("action_{}", i),
                args: vec![ActionArg {
                    name: "port".into(),
                    arg_type: ActionArgType::U32,
                    value: Some(ActionArgValue::U32(i as u32)),
                }],
            });
        }
        rule
    }

    #[test]
    fn test_rule_roundtrip() {
        // The declared maxima: 0 through 50 matches and actions.
        for count in [0usize, 1, 3, 50] {
            let rule = sample_rule(count, count);
            let payload = collection(MatAttr::Rules, |b| encode::put_rule(b, &rule));
            let decoded = parse_rules(&payload).unwrap();
            assert_eq!(decoded, vec![rule.clone()], "count={}", count);
        }
    }

    #[test]
    fn test_table_roundtrip() {
        let table = Table {
            uid: 4,
            name: "l2fwd".into(),
            source: 1,
            size: 1024,
            matches: vec![FieldRef {
                instance: 1,
                header: 1,
                field: 1,
                mask_type: Some(MaskType::Lpm),
                value: None,
            }],
            actions: vec![2, 3],
            attribs: vec![NamedValue {
                uid: 9,
                name: "vxlan_dst_mac".into(),
                write: true,
                value: ScalarValue::U64(0x001122334455),
            }],
        };
        let payload = collection(MatAttr::Tables, |b| encode::put_table(b, &table));
        let decoded = parse_tables(&payload).unwrap();
        assert_eq!(decoded, vec![table]);
    }

    #[test]
    fn test_port_roundtrip_preserves_vlan_bitmap() {
        let mut vlans = VlanMembership::new();
        vlans.set(10);
        vlans.set(20);
        vlans.set(4095);

        let port = Port {
            id: Some(3),
            pci: Some(PciAddress {
                bus: 0x5e,
                device: 0,
                function: 1,
            }),
            mac_addr: Some(0x000102030405),
            state: Some(PortState::Up),
            speed: Some(10000),
            max_frame_size: Some(1518),
            def_vlan: Some(1),
            def_priority: Some(3),
            drop_tagged: Some(FlagState::Disabled),
            drop_untagged: Some(FlagState::Enabled),
            vlans: Some(vlans.clone()),
            loopback: Some(FlagState::Disabled),
            learning: Some(FlagState::Enabled),
            update_dscp: None,
            update_ttl: None,
            update_dmac: Some(FlagState::Enabled),
            update_smac: Some(FlagState::Enabled),
            update_vlan: None,
            mcast_flooding: Some(FlagState::Disabled),
        };

        let payload = collection(MatAttr::Ports, |b| encode::put_port(b, &port));
        let decoded = parse_ports(&payload).unwrap();
        assert_eq!(decoded, vec![port]);
        // Bit-for-bit bitmap equality.
        assert_eq!(
            decoded[0].vlans.as_ref().unwrap().as_bytes(),
            vlans.as_bytes()
        );
    }

    #[test]
    fn test_headers_roundtrip() {
        let mut b = MessageBuilder::new(1, 0);
        let nest = b.nest_start(MatAttr::Headers as u16);
        let item = b.nest_start(HeadersAttr::Header as u16);
        b.append_attr_str(HeaderAttr::Name as u16, "ethernet");
        b.append_attr_u32(HeaderAttr::Uid as u16, 1);
        let fields = b.nest_start(HeaderAttr::Fields as u16);
        let f = b.nest_start(FieldsAttr::Field as u16);
        b.append_attr_str(FieldAttr::Name as u16, "dst_mac");
        b.append_attr_u32(FieldAttr::Uid as u16, 1);
        b.append_attr_u32(FieldAttr::BitWidth as u16, 48);
        b.nest_end(f);
        b.nest_end(fields);
        b.nest_end(item);
        b.nest_end(nest);
        let msg = b.finish();

        let (_, payload) = AttrIter::new(&msg[NLMSG_HDRLEN..])
            .find(|(t, _)| *t == MatAttr::Headers as u16)
            .unwrap();
        let headers = parse_headers(payload).unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].name, "ethernet");
        assert_eq!(headers[0].fields[0].bitwidth, 48);
    }

    #[test]
    fn test_malformed_item_is_skipped() {
        // One well-formed rule and one rule whose matches nest holds a
        // field ref with an unknown type code.
        let good = sample_rule(1, 1);
        let payload = collection(MatAttr::Rules, |b| {
            encode::put_rule(b, &good);
            let rule = b.nest_start(RulesAttr::Rule as u16);
            let matches = b.nest_start(RuleAttr::Matches as u16);
            let fref = b.nest_start(MatchesAttr::FieldRef as u16);
            b.append_attr_u32(FieldRefAttr::Type as u16, 0xdead);
            b.nest_end(fref);
            b.nest_end(matches);
            b.nest_end(rule);
        });
        let decoded = parse_rules(&payload).unwrap();
        assert_eq!(decoded, vec![good]);
    }
}
