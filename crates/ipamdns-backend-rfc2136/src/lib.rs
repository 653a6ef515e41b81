// # RFC 2136 Record Backend
//
// This crate provides a record backend that talks to a zone's primary
// server directly: plain DNS queries to observe, RFC 2136 UPDATE messages
// signed with TSIG to change.
//
// ## Behaviour
//
// - One TCP connection per call, with the configured transport timeout
// - Adds use UPDATE "append" without prerequisites; removes use "delete by
//   rdata". Adding a present record or removing an absent one is answered
//   NOERROR by the server and is a success-no-op here
// - NXDOMAIN on a query reads as "no records"
// - Only answers owned by the queried name count; records reached through a
//   CNAME belong to the target name
// - A PTR target that is not a usable host name is skipped with a warning
// - Any other response code, a TSIG failure or a transport error becomes a
//   `BackendError` naming the operation, zone and record
// - No retries and no caching; the engine decides what to send
//
// ## Security Requirements
//
// - The TSIG secret NEVER appears in logs or Debug output
// - A secret that is not valid base64 fails at start-up, not on first use
//
// ## Threading
//
// hickory's `SyncClient` blocks, so every call runs inside
// `tokio::task::spawn_blocking`.

mod tsig;

pub use tsig::TsigKey;

use async_trait::async_trait;
use hickory_client::client::{Client, SyncClient};
use hickory_client::op::{Message, ResponseCode};
use hickory_client::rr::rdata::PTR;
use hickory_client::rr::{DNSClass, Name, RData, Record, RecordType};
use hickory_client::tcp::TcpClientConnection;
use ipamdns_core::config::{BackendConfig, BackendSettings};
use ipamdns_core::name::reverse_name;
use ipamdns_core::traits::{RecordBackend, RecordBackendFactory};
use ipamdns_core::{AddressFamily, BackendError, DomainName, Error, Operation, Result};
use std::collections::BTreeSet;
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default DNS port
pub const DEFAULT_DNS_PORT: u16 = 53;

/// Result of one blocking exchange; the message becomes `BackendError::message`
type Exchange<T> = std::result::Result<T, String>;

/// Backend for one zone on an RFC 2136 capable primary
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the TSIG secret.
pub struct Rfc2136Backend {
    zone: DomainName,
    /// Zone apex as hickory wants it
    origin: Name,
    /// Primary server, resolved at construction
    server: SocketAddr,
    key: Option<Arc<TsigKey>>,
    ttl: u32,
    timeout: Duration,
}

// Custom Debug implementation that hides the TSIG secret
impl std::fmt::Debug for Rfc2136Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rfc2136Backend")
            .field("zone", &self.zone)
            .field("server", &self.server)
            .field("key", &self.key.as_ref().map(|k| k.name().to_string()))
            .field("ttl", &self.ttl)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Rfc2136Backend {
    /// Create a backend for `zone` on `server`
    ///
    /// Without a key, updates are sent unsigned.
    pub fn new(
        zone: DomainName,
        server: SocketAddr,
        key: Option<TsigKey>,
        settings: &BackendSettings,
    ) -> Result<Self> {
        let origin = to_name(&zone)
            .map_err(|e| Error::config(format!("invalid zone name {}: {}", zone, e)))?;

        Ok(Self {
            zone,
            origin,
            server,
            key: key.map(Arc::new),
            ttl: settings.ttl,
            timeout: settings.timeout,
        })
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }

    pub fn is_signed(&self) -> bool {
        self.key.is_some()
    }

    /// Run one exchange with the server on the blocking pool
    async fn exchange<T, F>(&self, operation: Operation, record: String, f: F) -> std::result::Result<T, BackendError>
    where
        T: Send + 'static,
        F: FnOnce(&SyncClient<TcpClientConnection>, &Name) -> Exchange<T> + Send + 'static,
    {
        let server = self.server;
        let timeout = self.timeout;
        let key = self.key.clone();
        let origin = self.origin.clone();

        debug!(zone = %self.zone, server = %server, "{} {}", operation, record);

        let outcome = tokio::task::spawn_blocking(move || {
            let client = connect(server, timeout, key.as_deref())?;
            f(&client, &origin)
        })
        .await
        .map_err(|e| format!("DNS task failed: {}", e))
        .and_then(|inner| inner);

        outcome.map_err(|message| BackendError::new(operation, self.zone.as_str(), record, message))
    }

    fn forward_record(&self, name: &DomainName, address: IpAddr) -> Exchange<Record> {
        let rdata = match address {
            IpAddr::V4(v4) => RData::A(v4.into()),
            IpAddr::V6(v6) => RData::AAAA(v6.into()),
        };
        let mut record = Record::from_rdata(to_name(name)?, self.ttl, rdata);
        record.set_dns_class(DNSClass::IN);
        Ok(record)
    }

    fn reverse_record(&self, address: IpAddr, name: &DomainName) -> Exchange<Record> {
        let owner = to_name(&reverse_name(&address))?;
        let mut record = Record::from_rdata(owner, self.ttl, RData::PTR(PTR(to_name(name)?)));
        record.set_dns_class(DNSClass::IN);
        Ok(record)
    }

    async fn update(
        &self,
        operation: Operation,
        rendered: String,
        record: Exchange<Record>,
    ) -> std::result::Result<(), BackendError> {
        self.exchange(operation, rendered, move |client, origin| {
            let record = record?;
            let response = match operation {
                Operation::AddForward | Operation::AddReverse => {
                    client.append(record, origin.clone(), false)
                }
                _ => client.delete_by_rdata(record, origin.clone()),
            }
            .map_err(|e| format!("failed to send DNS UPDATE: {}", e))?;

            update_outcome(response.response_code())
        })
        .await
    }
}

#[async_trait]
impl RecordBackend for Rfc2136Backend {
    async fn list_forward(
        &self,
        name: &DomainName,
        family: AddressFamily,
    ) -> std::result::Result<BTreeSet<IpAddr>, BackendError> {
        let owner = to_name(name);
        let record_type = match family {
            AddressFamily::V4 => RecordType::A,
            AddressFamily::V6 => RecordType::AAAA,
        };

        self.exchange(
            Operation::ListForward,
            format!("{} {}", name, family),
            move |client, _| {
                let answers = query(client, &owner?, record_type)?;
                Ok(addresses(answers, family))
            },
        )
        .await
    }

    async fn list_reverse(&self, address: IpAddr) -> std::result::Result<BTreeSet<DomainName>, BackendError> {
        let owner = reverse_name(&address);
        let rendered = format!("{} PTR", owner);
        let owner = to_name(&owner);

        self.exchange(Operation::ListReverse, rendered, move |client, _| {
            let owner = owner?;
            let answers = query(client, &owner, RecordType::PTR)?;
            Ok(ptr_targets(answers, &owner))
        })
        .await
    }

    async fn add_forward(&self, name: &DomainName, address: IpAddr) -> std::result::Result<(), BackendError> {
        let rendered = format!("{} {} {}", name, AddressFamily::of(&address), address);
        let record = self.forward_record(name, address);
        self.update(Operation::AddForward, rendered, record).await
    }

    async fn remove_forward(
        &self,
        name: &DomainName,
        address: IpAddr,
    ) -> std::result::Result<(), BackendError> {
        let rendered = format!("{} {} {}", name, AddressFamily::of(&address), address);
        let record = self.forward_record(name, address);
        self.update(Operation::RemoveForward, rendered, record).await
    }

    async fn add_reverse(&self, address: IpAddr, name: &DomainName) -> std::result::Result<(), BackendError> {
        let rendered = format!("{} PTR {}", reverse_name(&address), name);
        let record = self.reverse_record(address, name);
        self.update(Operation::AddReverse, rendered, record).await
    }

    async fn remove_reverse(
        &self,
        address: IpAddr,
        name: &DomainName,
    ) -> std::result::Result<(), BackendError> {
        let rendered = format!("{} PTR {}", reverse_name(&address), name);
        let record = self.reverse_record(address, name);
        self.update(Operation::RemoveReverse, rendered, record).await
    }

    fn zone(&self) -> &DomainName {
        &self.zone
    }

    fn backend_name(&self) -> &'static str {
        "rfc2136"
    }
}

fn to_name(name: &DomainName) -> Exchange<Name> {
    Name::from_str(&name.to_fqdn()).map_err(|e| format!("invalid DNS name {}: {}", name, e))
}

fn connect(
    server: SocketAddr,
    timeout: Duration,
    key: Option<&TsigKey>,
) -> Exchange<SyncClient<TcpClientConnection>> {
    let conn = TcpClientConnection::with_timeout(server, timeout)
        .map_err(|e| format!("cannot connect to {}: {}", server, e))?;

    match key {
        Some(key) => {
            let signer = key.signer().map_err(|e| e.to_string())?;
            Ok(SyncClient::with_tsigner(conn, signer))
        }
        None => Ok(SyncClient::new(conn)),
    }
}

fn query(
    client: &SyncClient<TcpClientConnection>,
    owner: &Name,
    record_type: RecordType,
) -> Exchange<Vec<RData>> {
    let response = client
        .query(owner, DNSClass::IN, record_type)
        .map_err(|e| format!("query failed: {}", e))?;
    answers(&response, owner, record_type)
}

/// Records of `record_type` owned by `owner` in a query response
///
/// NXDOMAIN reads as "no records". Answers owned by another name, such as
/// the target of a CNAME chain, are not records of `owner` and are dropped.
fn answers(response: &Message, owner: &Name, record_type: RecordType) -> Exchange<Vec<RData>> {
    match response.response_code() {
        ResponseCode::NoError => Ok(response
            .answers()
            .iter()
            .filter(|r| r.record_type() == record_type && same_owner(r.name(), owner))
            .filter_map(|r| r.data().cloned())
            .collect()),
        ResponseCode::NXDomain => Ok(Vec::new()),
        code => Err(format!("query answered with response code {:?}", code)),
    }
}

fn same_owner(a: &Name, b: &Name) -> bool {
    a.to_ascii()
        .trim_end_matches('.')
        .eq_ignore_ascii_case(b.to_ascii().trim_end_matches('.'))
}

/// Outcome of an UPDATE from its response code
fn update_outcome(code: ResponseCode) -> Exchange<()> {
    match code {
        ResponseCode::NoError => Ok(()),
        code => Err(format!("DNS UPDATE rejected with response code {:?}", code)),
    }
}

fn addresses(answers: Vec<RData>, family: AddressFamily) -> BTreeSet<IpAddr> {
    answers
        .into_iter()
        .filter_map(|rdata| match rdata {
            RData::A(a) => Some(IpAddr::V4(a.0)),
            RData::AAAA(aaaa) => Some(IpAddr::V6(aaaa.0)),
            _ => None,
        })
        .filter(|address| family.matches(address))
        .collect()
}

/// PTR targets as domain names
///
/// A target that is not a usable host name is skipped, so the remaining
/// PTRs of the address are still reconciled.
fn ptr_targets(answers: Vec<RData>, owner: &Name) -> BTreeSet<DomainName> {
    answers
        .into_iter()
        .filter_map(|rdata| match rdata {
            RData::PTR(ptr) => Some(ptr.0),
            _ => None,
        })
        .filter_map(|target| match DomainName::parse(&target.to_string()) {
            Ok(name) => Some(name),
            Err(e) => {
                warn!(owner = %owner, "Ignoring unusable PTR target {}: {}", target, e);
                None
            }
        })
        .collect()
}

/// Resolve a configured server to one socket address
///
/// Accepts `ip`, `ip:port`, `[v6]:port`, `host` and `host:port`; the port
/// defaults to 53. Hostnames are resolved once, here.
pub fn resolve_server(server: &str) -> Result<SocketAddr> {
    let server = server.trim();
    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = server.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_DNS_PORT));
    }

    let resolved = match server.rsplit_once(':') {
        Some((host, port)) => {
            let port: u16 = port
                .parse()
                .map_err(|_| Error::config(format!("invalid port in server '{}'", server)))?;
            (host, port).to_socket_addrs()
        }
        None => (server, DEFAULT_DNS_PORT).to_socket_addrs(),
    };

    resolved
        .map_err(|e| Error::config(format!("cannot resolve server '{}': {}", server, e)))?
        .next()
        .ok_or_else(|| Error::config(format!("server '{}' resolved to no address", server)))
}

/// Factory for creating RFC 2136 backends
pub struct Rfc2136Factory;

impl RecordBackendFactory for Rfc2136Factory {
    fn create(
        &self,
        zone: &DomainName,
        config: &BackendConfig,
        settings: &BackendSettings,
    ) -> Result<Arc<dyn RecordBackend>> {
        match config {
            BackendConfig::Rfc2136 { server, key } => {
                if server.trim().is_empty() {
                    return Err(Error::config("rfc2136 backend server cannot be empty"));
                }

                let server = resolve_server(server)?;
                let key = key.as_ref().map(TsigKey::from_config).transpose()?;

                if key.is_none() {
                    warn!(zone = %zone, "No TSIG key configured - updates will be unsigned");
                }

                Ok(Arc::new(Rfc2136Backend::new(
                    zone.clone(),
                    server,
                    key,
                    settings,
                )?))
            }
            _ => Err(Error::config("Invalid config for rfc2136 backend")),
        }
    }
}

/// Register the RFC 2136 backend with a registry
///
/// This function should be called during initialization to make the
/// `rfc2136` backend type available.
///
/// # Example
///
/// ```rust
/// use ipamdns_core::BackendRegistry;
///
/// let registry = BackendRegistry::with_builtin();
/// ipamdns_backend_rfc2136::register(&registry);
/// assert!(registry.has_backend("rfc2136"));
/// ```
pub fn register(registry: &ipamdns_core::BackendRegistry) {
    registry.register_backend("rfc2136", Box::new(Rfc2136Factory));
}
