//! Pipeline metadata repository.
//!
//! Name and id resolution for everything the grammar and the renderers
//! need: header instances from the parser graph, fields within headers,
//! action signatures, and table definitions. Populated from the
//! `get_headers`/`get_actions`/`get_tables`/`get_header_graph` replies
//! before grammar-driven commands run, then read-only.

use super::types::{Action, Field, Header, HeaderNode, NamedValue, Table};

/// Resolved pipeline metadata.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    headers: Vec<Header>,
    nodes: Vec<HeaderNode>,
    actions: Vec<Action>,
    tables: Vec<Table>,
}

impl Pipeline {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known headers.
    pub fn set_headers(&mut self, headers: Vec<Header>) {
        self.headers = headers;
    }

    /// Replace the known header-graph nodes.
    pub fn set_nodes(&mut self, nodes: Vec<HeaderNode>) {
        self.nodes = nodes;
    }

    /// Replace the known actions.
    pub fn set_actions(&mut self, actions: Vec<Action>) {
        self.actions = actions;
    }

    /// Replace the known tables.
    pub fn set_tables(&mut self, tables: Vec<Table>) {
        self.tables = tables;
    }

    /// All known headers.
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    /// All known header-graph nodes.
    pub fn nodes(&self) -> &[HeaderNode] {
        &self.nodes
    }

    /// All known actions.
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// All known tables.
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Resolve a header-instance name to its parser graph node.
    pub fn node_by_name(&self, name: &str) -> Option<&HeaderNode> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// Look up a header by uid.
    pub fn header(&self, uid: u32) -> Option<&Header> {
        self.headers.iter().find(|h| h.uid == uid)
    }

    /// Resolve a field name within a header.
    pub fn field_by_name(&self, header_uid: u32, name: &str) -> Option<&Field> {
        self.header(header_uid)?.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by uid within a header.
    pub fn field(&self, header_uid: u32, field_uid: u32) -> Option<&Field> {
        self.header(header_uid)?.fields.iter().find(|f| f.uid == field_uid)
    }

    /// Resolve an action name to its definition.
    pub fn action_by_name(&self, name: &str) -> Option<&Action> {
        self.actions.iter().find(|a| a.name == name)
    }

    /// Look up an action by uid.
    pub fn action(&self, uid: u32) -> Option<&Action> {
        self.actions.iter().find(|a| a.uid == uid)
    }

    /// Look up a table by uid.
    pub fn table(&self, uid: u32) -> Option<&Table> {
        self.tables.iter().find(|t| t.uid == uid)
    }

    /// Resolve a table name to its uid.
    pub fn table_id_by_name(&self, name: &str) -> Option<u32> {
        self.tables.iter().find(|t| t.name == name).map(|t| t.uid)
    }

    /// Resolve a table uid to its name.
    pub fn table_name(&self, uid: u32) -> Option<&str> {
        self.table(uid).map(|t| t.name.as_str())
    }

    /// A table's declared attributes, if it has any.
    pub fn table_attribs(&self, uid: u32) -> Option<&[NamedValue]> {
        let t = self.table(uid)?;
        if t.attribs.is_empty() {
            None
        } else {
            Some(&t.attribs)
        }
    }

    /// Generate an unused table id.
    pub fn gen_table_id(&self) -> u32 {
        (1u32..)
            .find(|id| self.table(*id).is_none())
            .expect("table id space exhausted")
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::netlink::genl::mat::types::{ActionArg, ActionArgType, ScalarValue};

    /// A small pipeline: ethernet/ipv4/ipv6 headers, a handful of actions
    /// (including a variadic one), and two tables.
    pub(crate) fn pipeline() -> Pipeline {
        let mut pipe = Pipeline::new();

        pipe.set_headers(vec![
            Header {
                uid: 1,
                name: "ethernet".into(),
                fields: vec![
                    Field { uid: 1, name: "dst_mac".into(), bitwidth: 48 },
                    Field { uid: 2, name: "src_mac".into(), bitwidth: 48 },
                    Field { uid: 3, name: "ethertype".into(), bitwidth: 16 },
                ],
            },
            Header {
                uid: 2,
                name: "vlan".into(),
                fields: vec![
                    Field { uid: 1, name: "pcp".into(), bitwidth: 3 },
                    Field { uid: 2, name: "vid".into(), bitwidth: 12 },
                ],
            },
            Header {
                uid: 3,
                name: "ipv4".into(),
                fields: vec![
                    Field { uid: 1, name: "tos".into(), bitwidth: 8 },
                    Field { uid: 2, name: "src_ip".into(), bitwidth: 32 },
                    Field { uid: 3, name: "dst_ip".into(), bitwidth: 32 },
                ],
            },
            Header {
                uid: 4,
                name: "ipv6".into(),
                fields: vec![
                    Field { uid: 1, name: "src_ip6".into(), bitwidth: 128 },
                    Field { uid: 2, name: "dst_ip6".into(), bitwidth: 128 },
                ],
            },
        ]);

        pipe.set_nodes(vec![
            HeaderNode { uid: 1, name: "ethernet".into(), headers: vec![1] },
            HeaderNode { uid: 2, name: "vlan".into(), headers: vec![2] },
            HeaderNode { uid: 3, name: "ipv4".into(), headers: vec![3] },
            HeaderNode { uid: 4, name: "ipv6".into(), headers: vec![4] },
            // A node exposing two headers; field resolution must reject it.
            HeaderNode { uid: 5, name: "overlay".into(), headers: vec![3, 4] },
        ]);

        pipe.set_actions(vec![
            Action { uid: 1, name: "drop_packet".into(), args: vec![] },
            Action {
                uid: 2,
                name: "set_egress_port".into(),
                args: vec![ActionArg {
                    name: "port".into(),
                    arg_type: ActionArgType::U32,
                    value: None,
                }],
            },
            Action {
                uid: 3,
                name: "set_dst_mac".into(),
                args: vec![ActionArg {
                    name: "mac".into(),
                    arg_type: ActionArgType::U64,
                    value: None,
                }],
            },
            Action {
                uid: 4,
                name: "forward_to_ports".into(),
                args: vec![
                    ActionArg {
                        name: "port".into(),
                        arg_type: ActionArgType::U32,
                        value: None,
                    },
                    ActionArg {
                        name: "ports".into(),
                        arg_type: ActionArgType::Variadic,
                        value: None,
                    },
                ],
            },
        ]);

        pipe.set_tables(vec![
            Table {
                uid: 1,
                name: "tcam".into(),
                source: 0,
                size: 4096,
                matches: vec![],
                actions: vec![1, 2, 3, 4],
                attribs: vec![
                    NamedValue {
                        uid: 1,
                        name: "vxlan_dst_mac".into(),
                        write: true,
                        value: ScalarValue::U64(0),
                    },
                    NamedValue {
                        uid: 2,
                        name: "rule_count".into(),
                        write: false,
                        value: ScalarValue::U32(0),
                    },
                ],
            },
            Table {
                uid: 2,
                name: "nexthop".into(),
                source: 1,
                size: 256,
                matches: vec![],
                actions: vec![2],
                attribs: vec![],
            },
        ]);

        pipe
    }

    #[test]
    fn test_lookups() {
        let pipe = pipeline();
        assert_eq!(pipe.node_by_name("ethernet").unwrap().uid, 1);
        assert_eq!(pipe.field_by_name(1, "dst_mac").unwrap().bitwidth, 48);
        assert_eq!(pipe.action_by_name("set_egress_port").unwrap().uid, 2);
        assert_eq!(pipe.table_id_by_name("nexthop"), Some(2));
        assert_eq!(pipe.table_name(1), Some("tcam"));
        assert!(pipe.table_attribs(2).is_none());
        assert_eq!(pipe.gen_table_id(), 3);
    }
}
