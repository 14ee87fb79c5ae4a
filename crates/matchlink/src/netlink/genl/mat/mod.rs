//! Match-action table pipeline family.
//!
//! A packet-processing pipeline (kernel module or userspace dataplane
//! daemon) registers the `net_mat` generic netlink family and exposes its
//! parser headers, header graph, actions, match-action tables, rules, and
//! ports through it. Requests carry an interface identifier pair followed
//! by one collection attribute; replies may span multiple messages and are
//! terminated by a completion marker.
//!
//! Module map:
//! - [`types`] — record types exchanged with the pipeline
//! - [`value`] — typed value/mask parsing under field bit-widths
//! - [`args`] — keyword-delimited command token grammar
//! - [`encode`] / [`decode`] — nested attribute wire format
//! - [`pipeline`] — metadata repository (name and id resolution)
//! - [`connection`] — request/reply engine

pub mod args;
pub mod connection;
pub mod decode;
pub mod encode;
pub mod pipeline;
pub mod types;
pub mod value;

pub use connection::{CancelToken, MatConnection, Reply};
pub use pipeline::Pipeline;

/// Generic netlink family name registered by the pipeline.
pub const MAT_GENL_NAME: &str = "net_mat";

/// Protocol version.
pub const MAT_GENL_VERSION: u8 = 1;

/// Longest table name accepted on the wire, in bytes.
pub const MAT_MAX_NAME: usize = 120;

/// Per-record caps on matches, actions, and attributes.
pub const MAT_MAX_MATCHES: usize = 50;
pub const MAT_MAX_ACTIONS: usize = 50;
pub const MAT_MAX_ATTRIBS: usize = 50;

/// Pipeline commands.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatCmd {
    Unspec = 0,
    GetTables = 1,
    GetHeaders = 2,
    GetActions = 3,
    GetHeaderGraph = 4,
    GetTableGraph = 5,
    GetRules = 6,
    SetRules = 7,
    DelRules = 8,
    UpdateRules = 9,
    CreateTable = 10,
    DestroyTable = 11,
    UpdateTable = 12,
    GetPorts = 13,
    GetLogicalPort = 14,
    GetPhysicalPort = 15,
    SetPorts = 16,
}

impl MatCmd {
    /// Map a raw reply command code into the closed enumeration.
    pub fn from_u8(code: u8) -> Option<Self> {
        use MatCmd::*;
        Some(match code {
            1 => GetTables,
            2 => GetHeaders,
            3 => GetActions,
            4 => GetHeaderGraph,
            5 => GetTableGraph,
            6 => GetRules,
            7 => SetRules,
            8 => DelRules,
            9 => UpdateRules,
            10 => CreateTable,
            11 => DestroyTable,
            12 => UpdateTable,
            13 => GetPorts,
            14 => GetLogicalPort,
            15 => GetPhysicalPort,
            16 => SetPorts,
            _ => return None,
        })
    }
}

/// Top-level message attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatAttr {
    Unspec = 0,
    IdentifierType = 1,
    Identifier = 2,
    Tables = 3,
    Headers = 4,
    Actions = 5,
    HeaderGraph = 6,
    TableGraph = 7,
    Rules = 8,
    RuleError = 9,
    Ports = 10,
}

/// Identifier types for the outer identifier pair.
pub const MAT_IDENTIFIER_IFINDEX: u32 = 1;

/// Rule error handling policy carried on rule requests.
pub const MAT_RULES_ERROR_ABORT: u32 = 1;

/// Contents of the `Tables` collection.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TablesAttr {
    Unspec = 0,
    Table = 1,
}

/// Per-table attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableAttr {
    Unspec = 0,
    Name = 1,
    Uid = 2,
    Source = 3,
    Size = 4,
    Matches = 5,
    Actions = 6,
    Attribs = 7,
}

/// Contents of a `Matches` nest: one field reference per item.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchesAttr {
    Unspec = 0,
    FieldRef = 1,
}

/// Per-field-reference attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRefAttr {
    Unspec = 0,
    Instance = 1,
    Header = 2,
    Field = 3,
    MaskType = 4,
    Type = 5,
    Value = 6,
    Mask = 7,
}

/// Scalar kinds used for field reference values and masks.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldRefType {
    Unspec = 0,
    U8 = 1,
    U16 = 2,
    U32 = 3,
    U64 = 4,
    In6 = 5,
}

/// Mask disciplines.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaskTypeAttr {
    Unspec = 0,
    Exact = 1,
    Mask = 2,
    Lpm = 3,
}

/// Contents of the `Actions` collection (and of a table's action list).
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionsAttr {
    Unspec = 0,
    Action = 1,
    ActionUid = 2,
}

/// Per-action attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionAttr {
    Unspec = 0,
    Name = 1,
    Uid = 2,
    Signature = 3,
}

/// Contents of an action `Signature` nest.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAttr {
    Unspec = 0,
    Arg = 1,
}

/// Per-action-argument attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionArgAttr {
    Unspec = 0,
    Name = 1,
    Type = 2,
    Value = 3,
}

/// Action argument types.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionArgTypeAttr {
    Unspec = 0,
    Null = 1,
    U8 = 2,
    U16 = 3,
    U32 = 4,
    U64 = 5,
    In6 = 6,
    Variadic = 7,
}

/// Contents of the `Headers` collection.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadersAttr {
    Unspec = 0,
    Header = 1,
}

/// Per-header attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderAttr {
    Unspec = 0,
    Name = 1,
    Uid = 2,
    Fields = 3,
}

/// Contents of a header `Fields` nest.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldsAttr {
    Unspec = 0,
    Field = 1,
}

/// Per-field attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldAttr {
    Unspec = 0,
    Name = 1,
    Uid = 2,
    BitWidth = 3,
}

/// Contents of the `HeaderGraph` collection.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderGraphAttr {
    Unspec = 0,
    Node = 1,
}

/// Per-header-graph-node attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphNodeAttr {
    Unspec = 0,
    Name = 1,
    Uid = 2,
    Headers = 3,
    HeaderUid = 4,
}

/// Contents of the `TableGraph` collection.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableGraphAttr {
    Unspec = 0,
    Node = 1,
}

/// Per-table-graph-node attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableNodeAttr {
    Unspec = 0,
    Uid = 1,
    Flags = 2,
    Jump = 3,
}

/// Contents of the `Rules` collection.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RulesAttr {
    Unspec = 0,
    Rule = 1,
    Table = 2,
    MinPrio = 3,
    MaxPrio = 4,
}

/// Per-rule attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleAttr {
    Unspec = 0,
    Table = 1,
    Uid = 2,
    Priority = 3,
    Matches = 4,
    Actions = 5,
}

/// Contents of a table's `Attribs` nest.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttribsAttr {
    Unspec = 0,
    NamedValue = 1,
}

/// Per-named-value attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedValueAttr {
    Unspec = 0,
    Name = 1,
    Uid = 2,
    Type = 3,
    Value = 4,
    Write = 5,
}

/// Named value scalar types.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedValueTypeAttr {
    Unspec = 0,
    U8 = 1,
    U16 = 2,
    U32 = 3,
    U64 = 4,
}

/// Contents of the `Ports` collection.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortsAttr {
    Unspec = 0,
    Port = 1,
    MinIndex = 2,
    MaxIndex = 3,
}

/// Per-port attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortAttr {
    Unspec = 0,
    Id = 1,
    Pci = 2,
    MacAddr = 3,
    State = 4,
    Speed = 5,
    MaxFrameSize = 6,
    Vlan = 7,
    Loopback = 8,
    Learning = 9,
    UpdateDscp = 10,
    UpdateTtl = 11,
    UpdateDmac = 12,
    UpdateSmac = 13,
    UpdateVlan = 14,
    McastFlooding = 15,
}

/// Per-port VLAN sub-attributes.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortVlanAttr {
    Unspec = 0,
    DefVlan = 1,
    DefPriority = 2,
    DropTagged = 3,
    DropUntagged = 4,
    Membership = 5,
}

/// Port link states on the wire.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStateAttr {
    Unspec = 0,
    Up = 1,
    Down = 2,
}

/// Per-feature flag states on the wire.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagStateAttr {
    Unspec = 0,
    Enabled = 1,
    Disabled = 2,
}
