//! Record serialization into the nested attribute wire format.
//!
//! Every request starts with the identifier pair (identifier type =
//! ifindex, identifier = target interface), followed by one collection
//! nest (`Tables`, `Rules`, `Ports`) holding one item nest per record.
//! Field order within each item is fixed.

use super::types::{
    Action, ActionArgType, ActionArgValue, FieldRef, FieldValue, FlagState, MaskType, NamedValue,
    Port, PortState, Rule, ScalarValue, Table,
};
use super::{
    ActionArgAttr, ActionArgTypeAttr, ActionAttr, ActionsAttr, AttribsAttr, FieldRefAttr,
    FieldRefType, FlagStateAttr, MAT_IDENTIFIER_IFINDEX, MAT_RULES_ERROR_ABORT, MaskTypeAttr,
    MatAttr, MatchesAttr, NamedValueAttr, NamedValueTypeAttr, PortAttr, PortStateAttr,
    PortVlanAttr, PortsAttr, RuleAttr, RulesAttr, SignatureAttr, TableAttr, TablesAttr,
};
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::{Error, Result};

/// Largest encodable netlink message; nested attribute lengths are u16.
const MAX_MSG_LEN: usize = u16::MAX as usize;

/// Append the outer identifier pair addressing the target interface.
pub fn put_identifier(b: &mut MessageBuilder, ifindex: u32) {
    b.append_attr_u32(MatAttr::IdentifierType as u16, MAT_IDENTIFIER_IFINDEX);
    b.append_attr_u32(MatAttr::Identifier as u16, ifindex);
}

/// Append the abort-on-first-failure rule error policy.
pub fn put_rule_error_abort(b: &mut MessageBuilder) {
    b.append_attr_u32(MatAttr::RuleError as u16, MAT_RULES_ERROR_ABORT);
}

fn mask_type_attr(mask_type: MaskType) -> u32 {
    match mask_type {
        MaskType::Exact => MaskTypeAttr::Exact as u32,
        MaskType::Mask => MaskTypeAttr::Mask as u32,
        MaskType::Lpm => MaskTypeAttr::Lpm as u32,
    }
}

fn flag_attr(state: FlagState) -> u8 {
    match state {
        FlagState::Enabled => FlagStateAttr::Enabled as u8,
        FlagState::Disabled => FlagStateAttr::Disabled as u8,
    }
}

/// Append one field reference item.
pub fn put_field_ref(b: &mut MessageBuilder, fref: &FieldRef) {
    let nest = b.nest_start(MatchesAttr::FieldRef as u16);
    b.append_attr_u32(FieldRefAttr::Instance as u16, fref.instance);
    b.append_attr_u32(FieldRefAttr::Header as u16, fref.header);
    b.append_attr_u32(FieldRefAttr::Field as u16, fref.field);
    if let Some(mask_type) = fref.mask_type {
        b.append_attr_u32(FieldRefAttr::MaskType as u16, mask_type_attr(mask_type));
    }
    if let Some(value) = &fref.value {
        match value {
            FieldValue::U8 { value, mask } => {
                b.append_attr_u32(FieldRefAttr::Type as u16, FieldRefType::U8 as u32);
                b.append_attr_u8(FieldRefAttr::Value as u16, *value);
                b.append_attr_u8(FieldRefAttr::Mask as u16, *mask);
            }
            FieldValue::U16 { value, mask } => {
                b.append_attr_u32(FieldRefAttr::Type as u16, FieldRefType::U16 as u32);
                b.append_attr_u16(FieldRefAttr::Value as u16, *value);
                b.append_attr_u16(FieldRefAttr::Mask as u16, *mask);
            }
            FieldValue::U32 { value, mask } => {
                b.append_attr_u32(FieldRefAttr::Type as u16, FieldRefType::U32 as u32);
                b.append_attr_u32(FieldRefAttr::Value as u16, *value);
                b.append_attr_u32(FieldRefAttr::Mask as u16, *mask);
            }
            FieldValue::U64 { value, mask } => {
                b.append_attr_u32(FieldRefAttr::Type as u16, FieldRefType::U64 as u32);
                b.append_attr_u64(FieldRefAttr::Value as u16, *value);
                b.append_attr_u64(FieldRefAttr::Mask as u16, *mask);
            }
            FieldValue::In6 { value, mask } => {
                b.append_attr_u32(FieldRefAttr::Type as u16, FieldRefType::In6 as u32);
                b.append_attr(FieldRefAttr::Value as u16, value);
                b.append_attr(FieldRefAttr::Mask as u16, mask);
            }
        }
    }
    b.nest_end(nest);
}

fn put_action_arg_value(b: &mut MessageBuilder, value: &ActionArgValue) {
    match value {
        ActionArgValue::U8(v) => b.append_attr_u8(ActionArgAttr::Value as u16, *v),
        ActionArgValue::U16(v) => b.append_attr_u16(ActionArgAttr::Value as u16, *v),
        ActionArgValue::U32(v) => b.append_attr_u32(ActionArgAttr::Value as u16, *v),
        ActionArgValue::U64(v) => b.append_attr_u64(ActionArgAttr::Value as u16, *v),
        ActionArgValue::In6(v) => b.append_attr(ActionArgAttr::Value as u16, v),
    }
}

/// Append one action item with its argument signature and values.
pub fn put_action(b: &mut MessageBuilder, action: &Action) {
    let nest = b.nest_start(ActionsAttr::Action as u16);
    b.append_attr_str(ActionAttr::Name as u16, &action.name);
    b.append_attr_u32(ActionAttr::Uid as u16, action.uid);
    if !action.args.is_empty() {
        let sig = b.nest_start(ActionAttr::Signature as u16);
        for arg in &action.args {
            let arg_nest = b.nest_start(SignatureAttr::Arg as u16);
            b.append_attr_str(ActionArgAttr::Name as u16, &arg.name);
            b.append_attr_u32(
                ActionArgAttr::Type as u16,
                match arg.arg_type {
                    ActionArgType::Null => ActionArgTypeAttr::Null as u32,
                    ActionArgType::U8 => ActionArgTypeAttr::U8 as u32,
                    ActionArgType::U16 => ActionArgTypeAttr::U16 as u32,
                    ActionArgType::U32 => ActionArgTypeAttr::U32 as u32,
                    ActionArgType::U64 => ActionArgTypeAttr::U64 as u32,
                    ActionArgType::In6 => ActionArgTypeAttr::In6 as u32,
                    ActionArgType::Variadic => ActionArgTypeAttr::Variadic as u32,
                },
            );
            if let Some(value) = &arg.value {
                put_action_arg_value(b, value);
            }
            b.nest_end(arg_nest);
        }
        b.nest_end(sig);
    }
    b.nest_end(nest);
}

/// Append one named value item.
pub fn put_named_value(b: &mut MessageBuilder, nv: &NamedValue) {
    let nest = b.nest_start(AttribsAttr::NamedValue as u16);
    b.append_attr_u32(NamedValueAttr::Uid as u16, nv.uid);
    b.append_attr_str(NamedValueAttr::Name as u16, &nv.name);
    match nv.value {
        ScalarValue::U8(v) => {
            b.append_attr_u32(NamedValueAttr::Type as u16, NamedValueTypeAttr::U8 as u32);
            b.append_attr_u8(NamedValueAttr::Value as u16, v);
        }
        ScalarValue::U16(v) => {
            b.append_attr_u32(NamedValueAttr::Type as u16, NamedValueTypeAttr::U16 as u32);
            b.append_attr_u16(NamedValueAttr::Value as u16, v);
        }
        ScalarValue::U32(v) => {
            b.append_attr_u32(NamedValueAttr::Type as u16, NamedValueTypeAttr::U32 as u32);
            b.append_attr_u32(NamedValueAttr::Value as u16, v);
        }
        ScalarValue::U64(v) => {
            b.append_attr_u32(NamedValueAttr::Type as u16, NamedValueTypeAttr::U64 as u32);
            b.append_attr_u64(NamedValueAttr::Value as u16, v);
        }
    }
    b.append_attr_u8(NamedValueAttr::Write as u16, nv.write as u8);
    b.nest_end(nest);
}

/// Append one rule item.
pub fn put_rule(b: &mut MessageBuilder, rule: &Rule) {
    let nest = b.nest_start(RulesAttr::Rule as u16);
    b.append_attr_u32(RuleAttr::Table as u16, rule.table_id);
    b.append_attr_u32(RuleAttr::Uid as u16, rule.uid);
    b.append_attr_u32(RuleAttr::Priority as u16, rule.priority);
    if !rule.matches.is_empty() {
        let matches = b.nest_start(RuleAttr::Matches as u16);
        for m in &rule.matches {
            put_field_ref(b, m);
        }
        b.nest_end(matches);
    }
    if !rule.actions.is_empty() {
        let actions = b.nest_start(RuleAttr::Actions as u16);
        for a in &rule.actions {
            put_action(b, a);
        }
        b.nest_end(actions);
    }
    b.nest_end(nest);
}

/// Append one table item.
pub fn put_table(b: &mut MessageBuilder, table: &Table) {
    let nest = b.nest_start(TablesAttr::Table as u16);
    b.append_attr_str(TableAttr::Name as u16, &table.name);
    b.append_attr_u32(TableAttr::Uid as u16, table.uid);
    b.append_attr_u32(TableAttr::Source as u16, table.source);
    b.append_attr_u32(TableAttr::Size as u16, table.size);
    if !table.matches.is_empty() {
        let matches = b.nest_start(TableAttr::Matches as u16);
        for m in &table.matches {
            put_field_ref(b, m);
        }
        b.nest_end(matches);
    }
    if !table.actions.is_empty() {
        let actions = b.nest_start(TableAttr::Actions as u16);
        for uid in &table.actions {
            b.append_attr_u32(ActionsAttr::ActionUid as u16, *uid);
        }
        b.nest_end(actions);
    }
    if !table.attribs.is_empty() {
        let attribs = b.nest_start(TableAttr::Attribs as u16);
        for nv in &table.attribs {
            put_named_value(b, nv);
        }
        b.nest_end(attribs);
    }
    b.nest_end(nest);
}

/// Append one port item.
pub fn put_port(b: &mut MessageBuilder, port: &Port) {
    let nest = b.nest_start(PortsAttr::Port as u16);
    if let Some(id) = port.id {
        b.append_attr_u32(PortAttr::Id as u16, id);
    }
    if let Some(pci) = port.pci {
        b.append_attr(PortAttr::Pci as u16, &[pci.bus, pci.device, pci.function]);
    }
    if let Some(mac) = port.mac_addr {
        b.append_attr_u64(PortAttr::MacAddr as u16, mac);
    }
    if let Some(state) = port.state {
        b.append_attr_u32(
            PortAttr::State as u16,
            match state {
                PortState::Up => PortStateAttr::Up as u32,
                PortState::Down => PortStateAttr::Down as u32,
            },
        );
    }
    if let Some(speed) = port.speed {
        b.append_attr_u32(PortAttr::Speed as u16, speed);
    }
    if let Some(size) = port.max_frame_size {
        b.append_attr_u32(PortAttr::MaxFrameSize as u16, size);
    }
    if port.def_vlan.is_some()
        || port.def_priority.is_some()
        || port.drop_tagged.is_some()
        || port.drop_untagged.is_some()
        || port.vlans.is_some()
    {
        let vlan = b.nest_start(PortAttr::Vlan as u16);
        if let Some(def_vlan) = port.def_vlan {
            b.append_attr_u16(PortVlanAttr::DefVlan as u16, def_vlan);
        }
        if let Some(def_priority) = port.def_priority {
            b.append_attr_u8(PortVlanAttr::DefPriority as u16, def_priority);
        }
        if let Some(state) = port.drop_tagged {
            b.append_attr_u8(PortVlanAttr::DropTagged as u16, flag_attr(state));
        }
        if let Some(state) = port.drop_untagged {
            b.append_attr_u8(PortVlanAttr::DropUntagged as u16, flag_attr(state));
        }
        if let Some(vlans) = &port.vlans {
            b.append_attr(PortVlanAttr::Membership as u16, vlans.as_bytes());
        }
        b.nest_end(vlan);
    }
    for (attr, state) in [
        (PortAttr::Loopback, port.loopback),
        (PortAttr::Learning, port.learning),
        (PortAttr::UpdateDscp, port.update_dscp),
        (PortAttr::UpdateTtl, port.update_ttl),
        (PortAttr::UpdateDmac, port.update_dmac),
        (PortAttr::UpdateSmac, port.update_smac),
        (PortAttr::UpdateVlan, port.update_vlan),
        (PortAttr::McastFlooding, port.mcast_flooding),
    ] {
        if let Some(state) = state {
            b.append_attr_u8(attr as u16, flag_attr(state));
        }
    }
    b.nest_end(nest);
}

/// Finalize a request, enforcing the message size bound.
///
/// On failure the partial message is discarded and nothing is sent;
/// the caller may retry with fewer items.
pub fn finish_request(b: MessageBuilder) -> Result<Vec<u8>> {
    if b.len() > MAX_MSG_LEN {
        return Err(Error::MessageTooLarge { len: b.len() });
    }
    Ok(b.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netlink::message::NLMSG_HDRLEN;

    #[test]
    fn test_identifier_pair_leads_message() {
        let mut b = MessageBuilder::new(1, 0);
        put_identifier(&mut b, 7);
        let msg = b.finish();

        let attrs: Vec<_> =
            crate::netlink::attr::AttrIter::new(&msg[NLMSG_HDRLEN..]).collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].0, MatAttr::IdentifierType as u16);
        assert_eq!(attrs[1].0, MatAttr::Identifier as u16);
    }

    #[test]
    fn test_finish_request_bounds_size() {
        let mut b = MessageBuilder::new(1, 0);
        for _ in 0..2000 {
            b.append_attr(1, &[0u8; 64]);
        }
        assert!(matches!(
            finish_request(b),
            Err(Error::MessageTooLarge { .. })
        ));
    }
}
