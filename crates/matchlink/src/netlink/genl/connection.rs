//! Generic Netlink family resolution.

use super::header::GENL_HDRLEN;
use super::{CtrlAttr, CtrlCmd, GENL_ID_CTRL};
use crate::netlink::attr::{AttrIter, get};
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::{Error, Result};
use crate::netlink::message::{MessageIter, NLM_F_ACK, NLM_F_REQUEST, NlMsgError};
use crate::netlink::socket::NetlinkSocket;

/// Generic Netlink connection used to resolve family names to IDs.
pub struct GenlConnection {
    socket: NetlinkSocket,
}

impl GenlConnection {
    /// Create a new Generic Netlink connection.
    pub fn new() -> Result<Self> {
        Ok(Self {
            socket: NetlinkSocket::new()?,
        })
    }

    /// Resolve a family name to its dynamically assigned ID.
    pub async fn get_family_id(&self, name: &str) -> Result<u16> {
        let mut builder = MessageBuilder::genl(
            GENL_ID_CTRL,
            NLM_F_REQUEST | NLM_F_ACK,
            CtrlCmd::GetFamily as u8,
            1,
        );
        builder.append_attr_str(CtrlAttr::FamilyName as u16, name);

        let seq = self.socket.next_seq();
        builder.set_seq(seq);
        builder.set_pid(self.socket.pid());

        self.socket.send(&builder.finish()).await?;

        let response = self.socket.recv_msg().await?;
        self.parse_family_response(&response, seq, name)
    }

    /// Parse a CTRL_CMD_GETFAMILY response.
    fn parse_family_response(&self, data: &[u8], seq: u32, name: &str) -> Result<u16> {
        for result in MessageIter::new(data) {
            let (header, payload) = result?;

            if header.nlmsg_seq != seq {
                continue;
            }

            if header.is_error() {
                let err = NlMsgError::from_bytes(payload)?;
                if !err.is_ack() {
                    // ENOENT means family not found
                    if err.error == -libc::ENOENT {
                        return Err(Error::FamilyNotFound {
                            name: name.to_string(),
                        });
                    }
                    return Err(Error::from_errno(err.error));
                }
                continue;
            }

            if header.is_done() {
                continue;
            }

            if payload.len() < GENL_HDRLEN {
                return Err(Error::InvalidMessage("GENL header too short".into()));
            }

            for (attr_type, attr_payload) in AttrIter::new(&payload[GENL_HDRLEN..]) {
                if attr_type == CtrlAttr::FamilyId as u16 {
                    return Ok(get::u16_ne(attr_payload)?);
                }
            }

            return Err(Error::InvalidMessage("missing family ID".into()));
        }

        Err(Error::FamilyNotFound {
            name: name.to_string(),
        })
    }
}
