//! Record types exchanged with a match-action pipeline.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::value::format_mac;

/// A packet field within a header: name, identity, and bit width.
///
/// Widths of 1–64 bits and exactly 128 bits are representable on the wire;
/// anything else has no attribute type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    pub uid: u32,
    pub name: String,
    pub bitwidth: u32,
}

/// A packet header: an ordered set of fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Header {
    pub uid: u32,
    pub name: String,
    pub fields: Vec<Field>,
}

/// A node in the parser graph: a named header instance.
///
/// Instances disambiguate repeated headers (tunnels, stacked VLANs); each
/// node lists the header types it may expose. Field resolution requires
/// the node to expose exactly one header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HeaderNode {
    pub uid: u32,
    pub name: String,
    pub headers: Vec<u32>,
}

/// Mask discipline of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MaskType {
    Exact,
    Mask,
    Lpm,
}

impl FromStr for MaskType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "exact" => Ok(MaskType::Exact),
            "mask" => Ok(MaskType::Mask),
            "lpm" => Ok(MaskType::Lpm),
            _ => Err(()),
        }
    }
}

impl fmt::Display for MaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MaskType::Exact => "exact",
            MaskType::Mask => "mask",
            MaskType::Lpm => "lpm",
        })
    }
}

/// A typed match value and its mask.
///
/// Value and mask always share one variant, derived solely from the
/// field's bit width. This is what rules carry for every field reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldValue {
    U8 { value: u8, mask: u8 },
    U16 { value: u16, mask: u16 },
    U32 { value: u32, mask: u32 },
    U64 { value: u64, mask: u64 },
    In6 { value: [u8; 16], mask: [u8; 16] },
}

impl FieldValue {
    /// Replace the mask with the all-ones exact mask of this variant.
    ///
    /// For 128-bit values all four 32-bit words go to all-ones; scalar
    /// variants take the type maximum.
    pub fn set_exact_mask(&mut self) {
        match self {
            FieldValue::U8 { mask, .. } => *mask = u8::MAX,
            FieldValue::U16 { mask, .. } => *mask = u16::MAX,
            FieldValue::U32 { mask, .. } => *mask = u32::MAX,
            FieldValue::U64 { mask, .. } => *mask = u64::MAX,
            FieldValue::In6 { mask, .. } => *mask = [0xff; 16],
        }
    }
}

/// A reference to a header-instance field, with match semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRef {
    /// Header-instance (parser graph node) uid.
    pub instance: u32,
    /// Header uid within the instance.
    pub header: u32,
    /// Field uid within the header.
    pub field: u32,
    /// Mask discipline, when the command declares one.
    pub mask_type: Option<MaskType>,
    /// Typed value and mask, when the command carries one.
    pub value: Option<FieldValue>,
}

/// Action argument types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionArgType {
    Null,
    U8,
    U16,
    U32,
    U64,
    In6,
    /// Absorbs all remaining tokens up to the next clause boundary.
    /// Only valid as the last declared argument.
    Variadic,
}

impl fmt::Display for ActionArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActionArgType::Null => "null",
            ActionArgType::U8 => "u8",
            ActionArgType::U16 => "u16",
            ActionArgType::U32 => "u32",
            ActionArgType::U64 => "u64",
            ActionArgType::In6 => "in6",
            ActionArgType::Variadic => "variadic",
        })
    }
}

/// A parsed action argument value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ActionArgValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    In6([u8; 16]),
}

/// One action argument: declared type and name, plus the bound value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionArg {
    pub name: String,
    pub arg_type: ActionArgType,
    pub value: Option<ActionArgValue>,
}

/// An action: identity plus its ordered argument sequence.
///
/// In pipeline metadata the arguments carry no values (they are the
/// signature); in a rule they carry the parsed values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    pub uid: u32,
    pub name: String,
    pub args: Vec<ActionArg>,
}

/// A plain scalar, tagged by width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ScalarValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
}

/// A table-scoped key/value attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedValue {
    pub uid: u32,
    pub name: String,
    /// Only writable attributes may be set via `update`.
    pub write: bool,
    pub value: ScalarValue,
}

/// A rule in a match-action table.
///
/// Rules are ordered lowest-priority-first; priority defaults to 1.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Rule {
    pub table_id: u32,
    pub uid: u32,
    pub priority: u32,
    pub matches: Vec<FieldRef>,
    pub actions: Vec<Action>,
}

/// A match-action table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Table {
    pub uid: u32,
    pub name: String,
    /// Parent/source table id.
    pub source: u32,
    /// Maximum rule capacity.
    pub size: u32,
    /// Allowed matches; empty inherits the source table's wholesale.
    pub matches: Vec<FieldRef>,
    /// Allowed action uids; empty inherits the source table's.
    pub actions: Vec<u32>,
    /// Declared attributes.
    pub attribs: Vec<NamedValue>,
}

/// A PCI bus/device/function triple.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PciAddress {
    pub bus: u8,
    pub device: u8,
    pub function: u8,
}

impl fmt::Display for PciAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}:{:02x}.{}", self.bus, self.device, self.function)
    }
}

impl FromStr for PciAddress {
    type Err = ();

    /// Parse `bus:device.function` (bus and device hex, function decimal).
    fn from_str(s: &str) -> Result<Self, ()> {
        let (bus, rest) = s.split_once(':').ok_or(())?;
        let (device, function) = rest.split_once('.').ok_or(())?;
        Ok(PciAddress {
            bus: u8::from_str_radix(bus, 16).map_err(|_| ())?,
            device: u8::from_str_radix(device, 16).map_err(|_| ())?,
            function: function.parse().map_err(|_| ())?,
        })
    }
}

/// Port link state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Up,
    Down,
}

impl FromStr for PortState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "up" => Ok(PortState::Up),
            "down" => Ok(PortState::Down),
            _ => Err(()),
        }
    }
}

impl fmt::Display for PortState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PortState::Up => "up",
            PortState::Down => "down",
        })
    }
}

/// Per-feature enable/disable flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagState {
    Enabled,
    Disabled,
}

impl FromStr for FlagState {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "enabled" => Ok(FlagState::Enabled),
            "disabled" => Ok(FlagState::Disabled),
            _ => Err(()),
        }
    }
}

impl fmt::Display for FlagState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FlagState::Enabled => "enabled",
            FlagState::Disabled => "disabled",
        })
    }
}

/// Number of bytes in the VLAN membership bitmap (4096 bits).
pub const VLAN_BITMAP_LEN: usize = 512;

/// VLAN membership bitmap: bit index = VLAN id, byte = id/8, bit = id%8.
#[derive(Clone, PartialEq, Eq)]
pub struct VlanMembership([u8; VLAN_BITMAP_LEN]);

impl VlanMembership {
    /// Create an empty membership map.
    pub fn new() -> Self {
        Self([0; VLAN_BITMAP_LEN])
    }

    /// Create from raw bitmap bytes.
    pub fn from_bytes(bytes: [u8; VLAN_BITMAP_LEN]) -> Self {
        Self(bytes)
    }

    /// Mark a VLAN id (0–4095) as a member.
    pub fn set(&mut self, vid: u16) {
        debug_assert!(vid < 4096);
        self.0[usize::from(vid) / 8] |= 1 << (vid % 8);
    }

    /// Check membership of a VLAN id.
    pub fn contains(&self, vid: u16) -> bool {
        vid < 4096 && self.0[usize::from(vid) / 8] & (1 << (vid % 8)) != 0
    }

    /// Iterate over member VLAN ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        (0u16..4096).filter(|&vid| self.contains(vid))
    }

    /// Raw bitmap bytes.
    pub fn as_bytes(&self) -> &[u8; VLAN_BITMAP_LEN] {
        &self.0
    }
}

impl Default for VlanMembership {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VlanMembership {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Serialize for VlanMembership {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

/// A logical port and its physical identity and feature flags.
///
/// Every field is optional: a query carries only the lookup keys, a set
/// carries only the settings being changed (plus the membership map, which
/// the peer replaces wholesale on every set).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Port {
    pub id: Option<u32>,
    pub pci: Option<PciAddress>,
    pub mac_addr: Option<u64>,
    pub state: Option<PortState>,
    pub speed: Option<u32>,
    pub max_frame_size: Option<u32>,
    pub def_vlan: Option<u16>,
    pub def_priority: Option<u8>,
    pub drop_tagged: Option<FlagState>,
    pub drop_untagged: Option<FlagState>,
    pub vlans: Option<VlanMembership>,
    pub loopback: Option<FlagState>,
    pub learning: Option<FlagState>,
    pub update_dscp: Option<FlagState>,
    pub update_ttl: Option<FlagState>,
    pub update_dmac: Option<FlagState>,
    pub update_smac: Option<FlagState>,
    pub update_vlan: Option<FlagState>,
    pub mcast_flooding: Option<FlagState>,
}

impl Port {
    /// Format the MAC address for display, if present.
    pub fn mac_string(&self) -> Option<String> {
        self.mac_addr.map(format_mac)
    }
}

/// A node of the table graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableNode {
    pub uid: u32,
    pub flags: u32,
    /// Uids of tables reachable from this node.
    pub jump: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_mask_synthesis() {
        let mut v = FieldValue::U16 { value: 7, mask: 0 };
        v.set_exact_mask();
        assert_eq!(v, FieldValue::U16 { value: 7, mask: 0xffff });

        let mut v6 = FieldValue::In6 {
            value: [0; 16],
            mask: [0; 16],
        };
        v6.set_exact_mask();
        match v6 {
            FieldValue::In6 { mask, .. } => {
                // All four 32-bit words all-ones.
                for word in mask.chunks(4) {
                    assert_eq!(word, [0xff; 4]);
                }
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_vlan_membership_bits() {
        let mut vlans = VlanMembership::new();
        vlans.set(0);
        vlans.set(10);
        vlans.set(4095);
        assert!(vlans.contains(0));
        assert!(vlans.contains(10));
        assert!(vlans.contains(4095));
        assert!(!vlans.contains(11));
        assert_eq!(vlans.iter().collect::<Vec<_>>(), vec![0, 10, 4095]);
        // byte = vid/8, bit = vid%8
        assert_eq!(vlans.as_bytes()[1], 1 << 2);
        assert_eq!(vlans.as_bytes()[511], 1 << 7);
    }

    #[test]
    fn test_pci_address_parse_display() {
        let pci: PciAddress = "5e:00.1".parse().unwrap();
        assert_eq!(
            pci,
            PciAddress {
                bus: 0x5e,
                device: 0,
                function: 1
            }
        );
        assert_eq!(pci.to_string(), "5e:00.1");
        assert!("5e00.1".parse::<PciAddress>().is_err());
    }

    #[test]
    fn test_flag_state_tokens() {
        assert_eq!("enabled".parse::<FlagState>(), Ok(FlagState::Enabled));
        assert_eq!("disabled".parse::<FlagState>(), Ok(FlagState::Disabled));
        assert!("on".parse::<FlagState>().is_err());
        assert_eq!("up".parse::<PortState>(), Ok(PortState::Up));
        assert!("1".parse::<PortState>().is_err());
    }
}
