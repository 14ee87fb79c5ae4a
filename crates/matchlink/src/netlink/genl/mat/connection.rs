//! Request/reply engine for the pipeline family.
//!
//! One command invocation is one exchange: build the request, open a
//! fresh socket, send, then drive the receive loop until the completion
//! marker (`NLMSG_DONE`), a message without `NLM_F_MULTI`, or a transport
//! error. The socket is dropped on every exit path.
//!
//! Cancellation is honored only at the suspension point between
//! messages, never mid-decode, so a cancel cannot leave partially
//! consumed attribute state behind.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, warn};

use super::args::{PortQuery, RuleQuery};
use super::pipeline::Pipeline;
use super::types::{Action, Header, HeaderNode, Port, Rule, Table, TableNode};
use super::{decode, encode, MAT_GENL_NAME, MAT_GENL_VERSION, MatAttr, MatCmd, PortsAttr, RulesAttr};
use crate::netlink::attr::AttrIter;
use crate::netlink::builder::MessageBuilder;
use crate::netlink::error::{Error, Result};
use crate::netlink::genl::header::{GENL_HDRLEN, GenlMsgHdr};
use crate::netlink::genl::GenlConnection;
use crate::netlink::message::{MessageIter, NLM_F_ACK, NLM_F_REQUEST, NlMsgError};
use crate::netlink::socket::NetlinkSocket;

/// Cancellation token checked between reply messages.
///
/// Clone freely; `cancel` trips every clone. A typical caller wires it to
/// SIGINT so an interrupt lands at the next safe suspension point.
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    /// Create a fresh, untripped token.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Trip the token.
    pub fn cancel(&self) {
        let _ = self.tx.send(true);
    }

    /// Check without waiting.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.subscribe().borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

async fn wait_cancelled(rx: &mut watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            // Sender gone, cancellation can never fire.
            std::future::pending::<()>().await;
        }
    }
}

/// Decoded records accumulated over one reply exchange.
#[derive(Debug, Clone, Default)]
pub struct Reply {
    pub tables: Vec<Table>,
    pub headers: Vec<Header>,
    pub actions: Vec<Action>,
    pub header_nodes: Vec<HeaderNode>,
    pub table_nodes: Vec<TableNode>,
    pub rules: Vec<Rule>,
    pub ports: Vec<Port>,
}

/// Route one reply message's attributes by its command code.
///
/// The command enumeration is closed: a code outside it is a protocol
/// violation, not something to route to a default handler.
fn dispatch(cmd: MatCmd, data: &[u8], reply: &mut Reply) -> Result<()> {
    fn collection<'a>(data: &'a [u8], attr: MatAttr) -> Option<&'a [u8]> {
        AttrIter::new(data)
            .find(|(t, _)| *t == attr as u16)
            .map(|(_, payload)| payload)
    }

    match cmd {
        MatCmd::GetTables | MatCmd::CreateTable | MatCmd::DestroyTable | MatCmd::UpdateTable => {
            if let Some(payload) = collection(data, MatAttr::Tables) {
                reply.tables.extend(decode::parse_tables(payload)?);
            }
        }
        MatCmd::GetHeaders => {
            if let Some(payload) = collection(data, MatAttr::Headers) {
                reply.headers.extend(decode::parse_headers(payload)?);
            }
        }
        MatCmd::GetActions => {
            if let Some(payload) = collection(data, MatAttr::Actions) {
                reply.actions.extend(decode::parse_actions(payload)?);
            }
        }
        MatCmd::GetHeaderGraph => {
            if let Some(payload) = collection(data, MatAttr::HeaderGraph) {
                reply.header_nodes.extend(decode::parse_header_nodes(payload)?);
            }
        }
        MatCmd::GetTableGraph => {
            if let Some(payload) = collection(data, MatAttr::TableGraph) {
                reply.table_nodes.extend(decode::parse_table_nodes(payload)?);
            }
        }
        // A set reply carrying rules is the list the peer failed to set.
        MatCmd::GetRules | MatCmd::SetRules => {
            if let Some(payload) = collection(data, MatAttr::Rules) {
                reply.rules.extend(decode::parse_rules(payload)?);
            }
        }
        MatCmd::GetPorts
        | MatCmd::GetLogicalPort
        | MatCmd::GetPhysicalPort
        | MatCmd::SetPorts => {
            if let Some(payload) = collection(data, MatAttr::Ports) {
                reply.ports.extend(decode::parse_ports(payload)?);
            }
        }
        MatCmd::DelRules | MatCmd::UpdateRules | MatCmd::Unspec => {
            return Err(Error::NotSupported(format!("{:?} reply", cmd)));
        }
    }
    Ok(())
}

/// Connection to a pipeline over its generic netlink family.
///
/// Holds the resolved family id and addressing; every command opens its
/// own socket for the duration of one request/reply exchange.
pub struct MatConnection {
    family_id: u16,
    ifindex: u32,
    /// Netlink port id of the pipeline daemon; 0 addresses the kernel.
    peer: u32,
    cancel: Option<CancelToken>,
}

impl MatConnection {
    /// Create a connection with a known family id.
    pub fn new(family_id: u16, ifindex: u32, peer: u32) -> Self {
        Self {
            family_id,
            ifindex,
            peer,
            cancel: None,
        }
    }

    /// Create a connection, resolving the family id by name.
    pub async fn resolve(ifindex: u32, peer: u32) -> Result<Self> {
        let genl = GenlConnection::new()?;
        let family_id = genl.get_family_id(MAT_GENL_NAME).await?;
        Ok(Self::new(family_id, ifindex, peer))
    }

    /// The resolved family id.
    pub fn family_id(&self) -> u16 {
        self.family_id
    }

    /// Install a cancellation token, polled between reply messages.
    pub fn set_cancel(&mut self, token: CancelToken) {
        self.cancel = Some(token);
    }

    /// Fetch headers, actions, tables, and the header graph into a
    /// metadata repository.
    pub async fn load_pipeline(&self) -> Result<Pipeline> {
        let mut pipe = Pipeline::new();
        pipe.set_headers(self.get_headers().await?);
        pipe.set_actions(self.get_actions().await?);
        pipe.set_tables(self.get_tables().await?);
        pipe.set_nodes(self.get_header_graph().await?);
        Ok(pipe)
    }

    /// List the pipeline's tables.
    pub async fn get_tables(&self) -> Result<Vec<Table>> {
        Ok(self.transact(MatCmd::GetTables, |_| {}).await?.tables)
    }

    /// List the pipeline's headers.
    pub async fn get_headers(&self) -> Result<Vec<Header>> {
        Ok(self.transact(MatCmd::GetHeaders, |_| {}).await?.headers)
    }

    /// List the pipeline's actions.
    pub async fn get_actions(&self) -> Result<Vec<Action>> {
        Ok(self.transact(MatCmd::GetActions, |_| {}).await?.actions)
    }

    /// Fetch the parser header graph.
    pub async fn get_header_graph(&self) -> Result<Vec<HeaderNode>> {
        Ok(self
            .transact(MatCmd::GetHeaderGraph, |_| {})
            .await?
            .header_nodes)
    }

    /// Fetch the table graph.
    pub async fn get_table_graph(&self) -> Result<Vec<TableNode>> {
        Ok(self
            .transact(MatCmd::GetTableGraph, |_| {})
            .await?
            .table_nodes)
    }

    /// Fetch rules from a table, optionally bounded by priority range.
    pub async fn get_rules(&self, query: &RuleQuery) -> Result<Vec<Rule>> {
        let reply = self
            .transact(MatCmd::GetRules, |b| {
                encode::put_rule_error_abort(b);
                let rules = b.nest_start(MatAttr::Rules as u16);
                b.append_attr_u32(RulesAttr::Table as u16, query.table);
                if let Some(min) = query.min {
                    b.append_attr_u32(RulesAttr::MinPrio as u16, min);
                }
                if let Some(max) = query.max {
                    b.append_attr_u32(RulesAttr::MaxPrio as u16, max);
                }
                b.nest_end(rules);
            })
            .await?;
        Ok(reply.rules)
    }

    /// Install a rule. Returns the rules the peer reports failing to set.
    pub async fn set_rule(&self, rule: &Rule) -> Result<Vec<Rule>> {
        let reply = self
            .transact(MatCmd::SetRules, |b| {
                encode::put_rule_error_abort(b);
                let rules = b.nest_start(MatAttr::Rules as u16);
                encode::put_rule(b, rule);
                b.nest_end(rules);
            })
            .await?;
        Ok(reply.rules)
    }

    /// Rule deletion is not part of the protocol; nothing is sent.
    pub fn del_rule(&self) -> Result<()> {
        Err(Error::NotSupported("delete rule command".into()))
    }

    /// Rule update is not part of the protocol; nothing is sent.
    pub fn update_rules(&self) -> Result<()> {
        Err(Error::NotSupported("update rules command".into()))
    }

    /// Create a table.
    pub async fn create_table(&self, table: &Table) -> Result<()> {
        self.table_cmd(MatCmd::CreateTable, table).await
    }

    /// Destroy a table.
    pub async fn destroy_table(&self, table: &Table) -> Result<()> {
        self.table_cmd(MatCmd::DestroyTable, table).await
    }

    /// Update a table's writable attributes.
    pub async fn update_table(&self, table: &Table) -> Result<()> {
        self.table_cmd(MatCmd::UpdateTable, table).await
    }

    async fn table_cmd(&self, cmd: MatCmd, table: &Table) -> Result<()> {
        self.transact(cmd, |b| {
            let tables = b.nest_start(MatAttr::Tables as u16);
            encode::put_table(b, table);
            b.nest_end(tables);
        })
        .await?;
        Ok(())
    }

    /// Fetch ports, optionally bounded by logical port id range.
    pub async fn get_ports(&self, min: Option<u32>, max: Option<u32>) -> Result<Vec<Port>> {
        let query = PortQuery {
            min,
            max,
            ..Default::default()
        };
        self.port_query(MatCmd::GetPorts, &query).await
    }

    /// Map a PCI address or MAC address to a logical port.
    pub async fn get_logical_port(&self, query: &PortQuery) -> Result<Vec<Port>> {
        self.port_query(MatCmd::GetLogicalPort, query).await
    }

    /// Map a logical port to its physical identity.
    pub async fn get_physical_port(&self, query: &PortQuery) -> Result<Vec<Port>> {
        self.port_query(MatCmd::GetPhysicalPort, query).await
    }

    async fn port_query(&self, cmd: MatCmd, query: &PortQuery) -> Result<Vec<Port>> {
        let reply = self
            .transact(cmd, |b| {
                let ports = b.nest_start(MatAttr::Ports as u16);
                if let Some(min) = query.min {
                    b.append_attr_u32(PortsAttr::MinIndex as u16, min);
                }
                if let Some(max) = query.max {
                    b.append_attr_u32(PortsAttr::MaxIndex as u16, max);
                }
                if query.port != Port::default() {
                    encode::put_port(b, &query.port);
                }
                b.nest_end(ports);
            })
            .await?;
        Ok(reply.ports)
    }

    /// Apply port settings.
    ///
    /// When the caller supplies no VLAN membership, the currently
    /// configured map is fetched and re-sent so the set does not clear
    /// it.
    pub async fn set_port(&self, port: &Port) -> Result<Vec<Port>> {
        let id = port
            .id
            .ok_or_else(|| Error::parse("port id is required"))?;

        let mut port = port.clone();
        if port.vlans.is_none() {
            let current = self.get_ports(Some(id), Some(id)).await?;
            port.vlans = current
                .into_iter()
                .find(|p| p.id == Some(id))
                .and_then(|p| p.vlans);
        }

        let reply = self
            .transact(MatCmd::SetPorts, |b| {
                let ports = b.nest_start(MatAttr::Ports as u16);
                encode::put_port(b, &port);
                b.nest_end(ports);
            })
            .await?;
        Ok(reply.ports)
    }

    /// Build a request, send it on a fresh socket, and run the receive
    /// loop.
    async fn transact(
        &self,
        cmd: MatCmd,
        build: impl FnOnce(&mut MessageBuilder),
    ) -> Result<Reply> {
        let mut builder = MessageBuilder::genl(
            self.family_id,
            NLM_F_REQUEST | NLM_F_ACK,
            cmd as u8,
            MAT_GENL_VERSION,
        );
        encode::put_identifier(&mut builder, self.ifindex);
        build(&mut builder);

        let socket = NetlinkSocket::new()?;
        let seq = socket.next_seq();
        builder.set_seq(seq);
        builder.set_pid(socket.pid());

        let msg = encode::finish_request(builder)?;
        debug!(cmd = ?cmd, len = msg.len(), "sending request");
        socket.send_to(&msg, self.peer).await?;

        self.receive_loop(&socket, seq).await
    }

    /// Consume reply messages until the completion marker, a
    /// non-continuation message, or a receive failure.
    async fn receive_loop(&self, socket: &NetlinkSocket, seq: u32) -> Result<Reply> {
        let mut reply = Reply::default();
        let mut cancel_rx = self.cancel.as_ref().map(|c| c.subscribe());

        'exchange: loop {
            let data = match cancel_rx.as_mut() {
                Some(rx) => {
                    tokio::select! {
                        biased;
                        _ = wait_cancelled(rx) => return Err(Error::Interrupted),
                        data = socket.recv_msg() => data?,
                    }
                }
                None => socket.recv_msg().await?,
            };

            for result in MessageIter::new(&data) {
                let (header, payload) = match result {
                    Ok(msg) => msg,
                    Err(e) => {
                        warn!("skipping malformed reply message: {}", e);
                        continue;
                    }
                };

                if header.nlmsg_seq != seq {
                    continue;
                }

                if header.is_error() {
                    let err = NlMsgError::from_bytes(payload)?;
                    if !err.is_ack() {
                        return Err(Error::from_errno(err.error));
                    }
                    if !header.is_multi() {
                        break 'exchange;
                    }
                    continue;
                }

                if header.is_done() {
                    break 'exchange;
                }

                // Failure to identify the command is fatal; decode
                // failures inside a message are not.
                let genl = GenlMsgHdr::from_bytes(payload)?;
                let cmd = MatCmd::from_u8(genl.cmd)
                    .ok_or(Error::UnknownCommand { code: genl.cmd })?;
                if let Err(e) = dispatch(cmd, &payload[GENL_HDRLEN..], &mut reply) {
                    warn!("skipping reply message for {:?}: {}", cmd, e);
                }

                if !header.is_multi() {
                    break 'exchange;
                }
            }
        }

        Ok(reply)
    }
}
