//! Netlink protocol plumbing.
//!
//! The lower half of this module is protocol-agnostic: attribute and
//! message framing (`attr`, `message`), an append-only message builder
//! (`builder`), and an async `NETLINK_GENERIC` socket (`socket`). The
//! `genl` module layers the generic-netlink header and control-family
//! resolution on top, and `genl::mat` implements the match-action table
//! family itself.

pub mod attr;
mod builder;
mod error;
pub mod genl;
pub mod message;
mod socket;

pub use attr::{AttrIter, NlAttr};
pub use builder::{MessageBuilder, NestToken};
pub use error::{Error, Result};
pub use message::{MessageIter, NLMSG_HDRLEN, NlMsgHdr, NlMsgType};
pub use socket::NetlinkSocket;
