// # RFC 2136 DNS Registrar
//
// This crate adds the device's forward record to the site zone with one
// dynamic-update request (RFC 2136) over TCP, the way `nsupdate` would.
//
// - ✅ Makes one UPDATE request per register() call
// - ✅ Full error propagation to the caller: a non-zero response code is an
//   explicit `DnsRefused` error, never a silently logged success path
// - ✅ Record type / IP family mismatch rejected before anything is sent
// - ❌ NO retry logic (the provisioning sequence is single-shot)
// - ❌ NO caching or background tasks beyond the connection's own driver
//
// ## Wire exchange
//
// ```text
// ;; ->>HEADER<<- opcode: UPDATE
// ;; ZONE:   cma4.box. IN SOA
// ;; UPDATE: sema01.cma4.box. 300 IN A 192.168.1.10
// ```
//
// The server's response code decides the outcome: NoError (0) is success,
// everything else (REFUSED, NOTAUTH, SERVFAIL, …) is surfaced.

use async_trait::async_trait;
use hickory_client::client::{Client, ClientHandle};
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::rdata::{A, AAAA};
use hickory_proto::rr::{DNSClass, Name, RData, Record};
use hickory_proto::runtime::TokioRuntimeProvider;
use hickory_proto::tcp::TcpClientStream;
use sema_core::config::{DnsConfig, RecordType};
use sema_core::error::{Error, Result};
use sema_core::traits::{DnsRegistrar, DnsRegistrarFactory, RecordRegistration};
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::str::FromStr;

/// Default port for DNS dynamic updates
const DEFAULT_DNS_PORT: u16 = 53;

/// RFC 2136 dynamic-update registrar
pub struct Rfc2136Registrar {
    /// Server that is authoritative for the zone
    server: SocketAddr,

    /// Zone the forward record is added to
    zone: Name,

    /// Time-to-live for the forward record
    ttl: u32,

    /// Record type to publish
    record_type: RecordType,
}

impl Rfc2136Registrar {
    /// Create a new registrar for a zone
    pub fn new(
        server: SocketAddr,
        domain: &str,
        ttl: u32,
        record_type: RecordType,
    ) -> Result<Self> {
        if ttl == 0 {
            return Err(Error::config("record TTL must be > 0"));
        }

        let zone = Name::from_str(domain)
            .map_err(|e| Error::config(format!("invalid zone name {}: {}", domain, e)))?;

        Ok(Self {
            server,
            zone,
            ttl,
            record_type,
        })
    }

    /// Build the resource record for one host in the zone
    fn build_record(&self, host: &str, ip: IpAddr) -> Result<Record> {
        let name = Name::from_str(host)
            .map_err(|e| Error::invalid_input(format!("invalid host label {}: {}", host, e)))?
            .append_domain(&self.zone)
            .map_err(|e| {
                Error::invalid_input(format!(
                    "host {} does not fit in zone {}: {}",
                    host, self.zone, e
                ))
            })?;

        let rdata = match (self.record_type, ip) {
            (RecordType::A, IpAddr::V4(v4)) => RData::A(A(v4)),
            (RecordType::Aaaa, IpAddr::V6(v6)) => RData::AAAA(AAAA(v6)),
            (record_type, ip) => {
                return Err(Error::invalid_input(format!(
                    "record type {} cannot hold address {}",
                    record_type, ip
                )));
            }
        };

        let mut record = Record::from_rdata(name, self.ttl, rdata);
        record.set_dns_class(DNSClass::IN);
        Ok(record)
    }
}

/// Map a dynamic-update response code to a result
///
/// Only NoError (0) counts as success; every other code is an explicit
/// refusal carried back to the operator.
fn evaluate_response(code: ResponseCode) -> Result<()> {
    if code == ResponseCode::NoError {
        Ok(())
    } else {
        Err(Error::dns_refused(code.to_string()))
    }
}

#[async_trait]
impl DnsRegistrar for Rfc2136Registrar {
    async fn register(&self, host: &str, ip: IpAddr) -> Result<RecordRegistration> {
        let record = self.build_record(host, ip)?;
        let fqdn = record.name().to_utf8();

        tracing::info!(
            "Sending dynamic update to {}: {} -> {} (ttl {})",
            self.server,
            fqdn,
            ip,
            self.ttl
        );

        let (stream, sender) =
            TcpClientStream::new(self.server, None, None, TokioRuntimeProvider::new());
        let (mut client, bg) = Client::new(stream, sender, None)
            .await
            .map_err(|e| Error::dns_update(format!("failed to connect to {}: {}", self.server, e)))?;
        tokio::spawn(bg);

        let response = client
            .append(record, self.zone.clone(), false)
            .await
            .map_err(|e| {
                Error::dns_update(format!("dynamic update to {} failed: {}", self.server, e))
            })?;

        evaluate_response(response.response_code())?;

        tracing::info!("Forward record added: {} -> {}", fqdn, ip);
        Ok(RecordRegistration {
            fqdn,
            ip,
            ttl: self.ttl,
        })
    }

    fn supports_host(&self, host: &str) -> bool {
        // One RFC 1035 label; the zone is appended by the registrar
        !host.is_empty()
            && host.len() <= 63
            && !host.contains('.')
            && host.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !host.starts_with('-')
            && !host.ends_with('-')
    }

    fn registrar_name(&self) -> &'static str {
        "rfc2136"
    }
}

/// Factory for creating RFC 2136 registrars
pub struct Rfc2136Factory;

impl DnsRegistrarFactory for Rfc2136Factory {
    fn create(&self, config: &DnsConfig) -> Result<Box<dyn DnsRegistrar>> {
        config.validate()?;
        let server = resolve_server(&config.server)?;

        Ok(Box::new(Rfc2136Registrar::new(
            server,
            &config.domain,
            config.ttl,
            config.record_type,
        )?))
    }
}

/// Parse "ip", "ip:port" or "host[:port]" into a server socket address
fn resolve_server(server: &str) -> Result<SocketAddr> {
    if server.is_empty() {
        return Err(Error::config("DNS server address cannot be empty"));
    }

    if let Ok(addr) = server.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = server.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_DNS_PORT));
    }

    (server, DEFAULT_DNS_PORT)
        .to_socket_addrs()
        .map_err(|e| Error::config(format!("cannot resolve DNS server {}: {}", server, e)))?
        .next()
        .ok_or_else(|| Error::config(format!("cannot resolve DNS server {}", server)))
}

/// Register the RFC 2136 registrar with a registry
pub fn register(registry: &sema_core::Registry) {
    registry.register_registrar("rfc2136", Box::new(Rfc2136Factory));
}
