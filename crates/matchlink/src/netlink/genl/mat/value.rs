//! Typed value and mask parsing.
//!
//! Match values are typed by the field's bit width alone: up to 8 bits is
//! a u8, up to 16 a u16, up to 32 a u32, up to 64 a u64, and exactly 128
//! bits an IPv6 address. A token parses as a base-prefixed or decimal
//! integer first, bounded by `2^bitwidth - 1`; non-numeric tokens fall
//! back to the format implied by the type (dotted IPv4 for u32, colon MAC
//! for u64, IPv6 text for 128 bits).

use std::net::{Ipv4Addr, Ipv6Addr};

use super::types::{ActionArgType, ActionArgValue, Field, FieldValue};
use crate::netlink::error::{Error, Result};

/// Largest value a MAC address can take as a 48-bit integer.
const MAC_MAX: u64 = 0xffff_ffff_ffff;

/// Parse a base-prefixed or decimal unsigned integer token.
///
/// Returns `None` for tokens that are not integers at all, so callers can
/// fall back to format-specific parsing.
pub fn parse_int(token: &str) -> Option<u64> {
    if let Some(hex) = token.strip_prefix("0x").or_else(|| token.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else {
        token.parse().ok()
    }
}

/// Largest value representable in `bitwidth` bits (valid for 1–64).
pub fn max_value(bitwidth: u32) -> u64 {
    if bitwidth >= 64 {
        u64::MAX
    } else {
        (1u64 << bitwidth) - 1
    }
}

/// Parse a colon-separated MAC address, or a hex/decimal 48-bit integer.
///
/// The display octet order maps onto the integer big-endian: the first
/// octet of `00:01:02:03:04:05` becomes the most significant byte, giving
/// `0x000102030405`.
pub fn parse_mac(token: &str) -> Result<u64> {
    if token.contains(':') {
        let mut mac = 0u64;
        let mut count = 0;
        for part in token.split(':') {
            let octet = u8::from_str_radix(part, 16)
                .map_err(|_| Error::parse(format!("'{}' is not a valid MAC address", token)))?;
            mac = (mac << 8) | u64::from(octet);
            count += 1;
        }
        if count != 6 {
            return Err(Error::parse(format!(
                "'{}' is not a valid MAC address",
                token
            )));
        }
        Ok(mac)
    } else {
        let value = parse_int(token)
            .ok_or_else(|| Error::parse(format!("'{}' is not a valid u64 value", token)))?;
        if value > MAC_MAX {
            return Err(Error::OutOfRange {
                token: token.to_string(),
                field: "mac address".to_string(),
                max: MAC_MAX,
            });
        }
        Ok(value)
    }
}

/// Format a 48-bit MAC integer back to colon-separated display order.
pub fn format_mac(mac: u64) -> String {
    let b = mac.to_be_bytes();
    format!(
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        b[2], b[3], b[4], b[5], b[6], b[7]
    )
}

/// A token parsed under a field's type, before being bound as value or mask.
enum Parsed {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    In6([u8; 16]),
}

/// Parse one token under the field's bit width.
///
/// `what` names the role ("value" or "mask") in error messages.
fn parse_typed(field: &Field, token: &str, what: &str) -> Result<Parsed> {
    if field.bitwidth == 128 {
        let addr: Ipv6Addr = token.parse().map_err(|_| {
            Error::parse(format!(
                "'{}' is invalid IPv6 address {} for {}",
                token, what, field.name
            ))
        })?;
        return Ok(Parsed::In6(addr.octets()));
    }

    if field.bitwidth == 0 || field.bitwidth > 64 {
        return Err(Error::UnsupportedWidth {
            field: field.name.clone(),
            bitwidth: field.bitwidth,
        });
    }

    // Numeric path first, bounded by the field width.
    if let Some(value) = parse_int(token) {
        let max = max_value(field.bitwidth);
        if value > max {
            return Err(Error::OutOfRange {
                token: token.to_string(),
                field: field.name.clone(),
                max,
            });
        }
        return Ok(match field.bitwidth {
            w if w <= 8 => Parsed::U8(value as u8),
            w if w <= 16 => Parsed::U16(value as u16),
            w if w <= 32 => Parsed::U32(value as u32),
            _ => Parsed::U64(value),
        });
    }

    // Format-specific fallback; u8/u16 fields have none.
    match field.bitwidth {
        w if w <= 16 => Err(Error::parse(format!(
            "'{}' is invalid u{} {} for {}",
            token,
            if w <= 8 { 8 } else { 16 },
            what,
            field.name
        ))),
        w if w <= 32 => {
            if token.contains('.') {
                let addr: Ipv4Addr = token.parse().map_err(|_| {
                    Error::parse(format!(
                        "'{}' is invalid IP address {} for {}",
                        token, what, field.name
                    ))
                })?;
                Ok(Parsed::U32(u32::from(addr)))
            } else {
                Err(Error::parse(format!(
                    "'{}' is invalid u32 {} for {}",
                    token, what, field.name
                )))
            }
        }
        _ => {
            if token.contains(':') {
                Ok(Parsed::U64(parse_mac(token).map_err(|_| {
                    Error::parse(format!(
                        "'{}' is invalid MAC address {} for {}",
                        token, what, field.name
                    ))
                })?))
            } else {
                Err(Error::parse(format!(
                    "'{}' is invalid u64 {} for {}",
                    token, what, field.name
                )))
            }
        }
    }
}

/// Parse a match value token; the mask starts out exact (all-ones).
pub fn parse_value(field: &Field, token: &str) -> Result<FieldValue> {
    let mut value = match parse_typed(field, token, "value")? {
        Parsed::U8(v) => FieldValue::U8 { value: v, mask: 0 },
        Parsed::U16(v) => FieldValue::U16 { value: v, mask: 0 },
        Parsed::U32(v) => FieldValue::U32 { value: v, mask: 0 },
        Parsed::U64(v) => FieldValue::U64 { value: v, mask: 0 },
        Parsed::In6(v) => FieldValue::In6 {
            value: v,
            mask: [0; 16],
        },
    };
    value.set_exact_mask();
    Ok(value)
}

/// Parse a mask token into an already-parsed value of the same field.
pub fn parse_mask(value: &mut FieldValue, field: &Field, token: &str) -> Result<()> {
    match (value, parse_typed(field, token, "mask")?) {
        (FieldValue::U8 { mask, .. }, Parsed::U8(m)) => *mask = m,
        (FieldValue::U16 { mask, .. }, Parsed::U16(m)) => *mask = m,
        (FieldValue::U32 { mask, .. }, Parsed::U32(m)) => *mask = m,
        (FieldValue::U64 { mask, .. }, Parsed::U64(m)) => *mask = m,
        (FieldValue::In6 { mask, .. }, Parsed::In6(m)) => *mask = m,
        // Unreachable when value was parsed under the same field.
        _ => {
            return Err(Error::InvalidAttribute(format!(
                "mask type mismatch for {}",
                field.name
            )));
        }
    }
    Ok(())
}

/// Parse an action argument token under its declared type.
///
/// Action arguments are typed independently of any field, so u8/u16 take
/// the plain hex-or-decimal path with no width inference.
pub fn parse_action_arg(
    arg_type: ActionArgType,
    name: &str,
    token: &str,
) -> Result<ActionArgValue> {
    match arg_type {
        ActionArgType::U8 => {
            let v = parse_int(token)
                .filter(|&v| v <= u64::from(u8::MAX))
                .ok_or_else(|| Error::parse(format!("'{}' is invalid u8 for {}", token, name)))?;
            Ok(ActionArgValue::U8(v as u8))
        }
        ActionArgType::U16 => {
            let v = parse_int(token)
                .filter(|&v| v <= u64::from(u16::MAX))
                .ok_or_else(|| Error::parse(format!("'{}' is invalid u16 for {}", token, name)))?;
            Ok(ActionArgValue::U16(v as u16))
        }
        ActionArgType::U32 => {
            if token.contains('.') {
                let addr: Ipv4Addr = token.parse().map_err(|_| {
                    Error::parse(format!("'{}' is invalid IP address for {}", token, name))
                })?;
                Ok(ActionArgValue::U32(u32::from(addr)))
            } else {
                let v = parse_int(token)
                    .filter(|&v| v <= u64::from(u32::MAX))
                    .ok_or_else(|| {
                        Error::parse(format!("'{}' is invalid u32 for {}", token, name))
                    })?;
                Ok(ActionArgValue::U32(v as u32))
            }
        }
        ActionArgType::U64 => Ok(ActionArgValue::U64(parse_mac(token)?)),
        ActionArgType::In6 => {
            let addr: Ipv6Addr = token.parse().map_err(|_| {
                Error::parse(format!("'{}' is invalid IPv6 address for {}", token, name))
            })?;
            Ok(ActionArgValue::In6(addr.octets()))
        }
        ActionArgType::Null | ActionArgType::Variadic => Err(Error::parse(format!(
            "argument {} has no parseable type",
            name
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(name: &str, bitwidth: u32) -> Field {
        Field {
            uid: 1,
            name: name.into(),
            bitwidth,
        }
    }

    #[test]
    fn test_parse_int_bases() {
        assert_eq!(parse_int("10"), Some(10));
        assert_eq!(parse_int("0x10"), Some(16));
        assert_eq!(parse_int("0XFF"), Some(255));
        assert_eq!(parse_int("ten"), None);
        assert_eq!(parse_int("-1"), None);
    }

    #[test]
    fn test_width_bounds_accept_and_reject() {
        // A value parses iff 0 <= v <= 2^w - 1.
        for (width, max) in [(1u32, 1u64), (3, 7), (8, 255), (12, 4095), (64, u64::MAX)] {
            let f = field("f", width);
            assert!(parse_value(&f, &max.to_string()).is_ok());
            if width < 64 {
                let err = parse_value(&f, &(max + 1).to_string()).unwrap_err();
                match err {
                    Error::OutOfRange { max: m, .. } => assert_eq!(m, max),
                    other => panic!("expected OutOfRange, got {other}"),
                }
            }
        }
    }

    #[test]
    fn test_range_error_reports_both_bases() {
        let err = parse_value(&field("vlan", 12), "5000").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("4095"));
        assert!(msg.contains("0xfff"));
    }

    #[test]
    fn test_unsupported_widths() {
        assert!(matches!(
            parse_value(&field("f", 65), "1"),
            Err(Error::UnsupportedWidth { .. })
        ));
        assert!(matches!(
            parse_value(&field("f", 127), "1"),
            Err(Error::UnsupportedWidth { .. })
        ));
    }

    #[test]
    fn test_default_mask_is_exact() {
        assert_eq!(
            parse_value(&field("f", 8), "7").unwrap(),
            FieldValue::U8 {
                value: 7,
                mask: 0xff
            }
        );
        assert_eq!(
            parse_value(&field("f", 48), "5").unwrap(),
            FieldValue::U64 {
                value: 5,
                mask: u64::MAX
            }
        );
        match parse_value(&field("f", 128), "::1").unwrap() {
            FieldValue::In6 { mask, .. } => assert_eq!(mask, [0xff; 16]),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn test_explicit_mask_overrides() {
        let f = field("dst_ip", 32);
        let mut v = parse_value(&f, "10.0.0.0").unwrap();
        parse_mask(&mut v, &f, "255.255.255.0").unwrap();
        assert_eq!(
            v,
            FieldValue::U32 {
                value: 0x0a000000,
                mask: 0xffffff00
            }
        );
    }

    #[test]
    fn test_ipv4_fallback_only_for_u32() {
        assert!(parse_value(&field("f", 32), "192.168.0.1").is_ok());
        assert!(parse_value(&field("f", 16), "192.168.0.1").is_err());
        assert!(parse_value(&field("f", 8), "not-a-number").is_err());
        assert!(parse_value(&field("f", 32), "192.168.1").is_err());
    }

    #[test]
    fn test_mac_parse_and_roundtrip() {
        let mac = parse_mac("00:01:02:03:04:05").unwrap();
        assert_eq!(mac, 0x000102030405);
        assert_eq!(format_mac(mac), "00:01:02:03:04:05");

        // Raw integer forms are accepted up to 48 bits.
        assert_eq!(parse_mac("0xffffffffffff").unwrap(), MAC_MAX);
        assert!(parse_mac("0x1000000000000").is_err());
        assert!(parse_mac("00:01:02:03:04").is_err());
        assert!(parse_mac("zz:01:02:03:04:05").is_err());
    }

    #[test]
    fn test_mac_fallback_for_u64_field() {
        assert_eq!(
            parse_value(&field("dst_mac", 48), "00:01:02:03:04:05").unwrap(),
            FieldValue::U64 {
                value: 0x000102030405,
                mask: u64::MAX
            }
        );
    }

    #[test]
    fn test_ipv6_field() {
        let v = parse_value(&field("src_ip6", 128), "2001:db8::1").unwrap();
        match v {
            FieldValue::In6 { value, .. } => {
                assert_eq!(value[0], 0x20);
                assert_eq!(value[15], 0x01);
            }
            other => panic!("wrong variant: {other:?}"),
        }
        assert!(parse_value(&field("src_ip6", 128), "5").is_err());
    }

    #[test]
    fn test_action_arg_parsing() {
        assert_eq!(
            parse_action_arg(ActionArgType::U8, "a", "0x12").unwrap(),
            ActionArgValue::U8(0x12)
        );
        assert!(parse_action_arg(ActionArgType::U8, "a", "256").is_err());
        assert_eq!(
            parse_action_arg(ActionArgType::U32, "ip", "10.1.2.3").unwrap(),
            ActionArgValue::U32(0x0a010203)
        );
        assert_eq!(
            parse_action_arg(ActionArgType::U64, "mac", "00:01:02:03:04:05").unwrap(),
            ActionArgValue::U64(0x000102030405)
        );
        assert!(parse_action_arg(ActionArgType::In6, "addr", "fe80::1").is_ok());
    }
}
