//! Engine configuration assembly
//!
//! Turns a [`ProxyDescriptor`] into a complete [`EngineConfig`]: the local
//! listeners, the `proxy` outbound built from the descriptor, fixed `direct`
//! and `block` outbounds, DNS and routing rules. Assembly holds no state
//! between calls; every call returns a fresh document.

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::config::api::{Api, Policy};
use crate::config::dns::Dns;
use crate::config::inbound::Inbound;
use crate::config::log::Log;
use crate::config::outbound::{
    GrpcSettings, HeaderObject, HttpHeaderRequest, HttpSettings, KcpSettings, Mux, Outbound,
    OutboundSettings, QuicSettings, RealitySettings, ShadowsocksServer, ShadowsocksSettings,
    SocksServer, SocksSettings, SocksUser, StreamSettings, TcpSettings, TlsSettings,
    TrojanServer, TrojanSettings, VNextServer, VNextSettings, VNextUser, WsSettings,
};
use crate::config::route::{Routing, RoutingRule};
use crate::config::{EngineConfig, USER_LEVEL};
use crate::descriptor::{
    Extra, Identity, Network, Protocol, ProxyDescriptor, Security, SecurityLayer, Transport,
};
use crate::settings::Settings;

// ============================================================================
// Tags
// ============================================================================

pub const PROXY_TAG: &str = "proxy";
pub const DIRECT_TAG: &str = "direct";
pub const BLOCK_TAG: &str = "block";
pub const SOCKS_INBOUND_TAG: &str = "socks-in";
pub const HTTP_INBOUND_TAG: &str = "http-in";
pub const API_TAG: &str = "api";

/// Address the engine's own API listens on
const LOOPBACK: &str = "127.0.0.1";

// ============================================================================
// Config Assembler
// ============================================================================

/// Builds engine configuration documents from descriptors
#[derive(Clone, Debug, Default)]
pub struct ConfigAssembler {
    settings: Settings,
}

impl ConfigAssembler {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Assemble the full document for one descriptor.
    ///
    /// Tags are fixed, so the result always passes [`EngineConfig::validate`].
    pub fn assemble(&self, descriptor: &ProxyDescriptor) -> EngineConfig {
        debug!(
            "Assembling {} config for {}:{}",
            descriptor.protocol(),
            descriptor.address(),
            descriptor.port()
        );

        let mut builder = EngineConfig::builder()
            .log(self.log())
            .outbound(self.proxy_outbound(descriptor))
            .outbound(Outbound::freedom(DIRECT_TAG))
            .outbound(Outbound::blackhole(BLOCK_TAG))
            .dns(self.dns())
            .routing(self.routing());

        for inbound in self.inbounds() {
            builder = builder.inbound(inbound);
        }

        if self.settings.api.enabled {
            builder = builder.stats_api(Api::stats_service(API_TAG), Policy::with_counters());
        }

        let config = builder.build();
        debug!(
            "Assembled config: {} inbounds, {} outbounds, {} routing rules",
            config.inbounds.len(),
            config.outbounds.len(),
            config.routing.rules.len()
        );
        config
    }

    /// Build only the `proxy` outbound for a descriptor
    pub fn proxy_outbound(&self, descriptor: &ProxyDescriptor) -> Outbound {
        let mut outbound = Outbound::new(PROXY_TAG, outbound_settings(descriptor));
        if let Some(stream) = stream_settings(descriptor) {
            outbound = outbound.with_stream_settings(stream);
        }
        outbound.with_mux(Mux::disabled())
    }

    fn log(&self) -> Log {
        Log {
            loglevel: self.settings.log.level,
            access: self.settings.log.access.clone(),
            error: self.settings.log.error.clone(),
        }
    }

    fn dns(&self) -> Dns {
        let options = &self.settings.dns;
        let mut dns = options
            .hosts
            .iter()
            .fold(Dns::new(options.servers.clone()), |dns, (domain, address)| {
                dns.with_host(domain.as_str(), address.as_str())
            });
        dns.query_strategy = options.query_strategy.clone();
        dns
    }

    fn inbounds(&self) -> Vec<Inbound> {
        let options = &self.settings.inbound;
        let sniff = |inbound: Inbound| {
            if options.sniffing {
                inbound.with_sniffing()
            } else {
                inbound
            }
        };

        let mut inbounds = vec![sniff(Inbound::socks(
            SOCKS_INBOUND_TAG,
            options.listen.as_str(),
            options.port,
            options.udp,
        ))];

        if let Some(http_port) = options.http_port {
            inbounds.push(sniff(Inbound::http(
                HTTP_INBOUND_TAG,
                options.listen.as_str(),
                http_port,
            )));
        }

        if self.settings.api.enabled {
            inbounds.push(Inbound::dokodemo_door(
                API_TAG,
                LOOPBACK,
                self.settings.api.port,
                LOOPBACK,
            ));
        }

        inbounds
    }

    /// Routing rules. Unmatched traffic falls through to `proxy`, the first outbound.
    fn routing(&self) -> Routing {
        let options = &self.settings.routing;
        let mut routing = Routing::new().with_domain_strategy(options.domain_strategy.as_str());

        if self.settings.api.enabled {
            routing = routing
                .add_rule(RoutingRule::new(API_TAG).match_inbound_tag(vec![API_TAG.to_string()]));
        }

        routing = routing.add_rule(
            RoutingRule::new(DIRECT_TAG)
                .match_ip(vec![LOOPBACK.to_string()])
                .match_port(self.settings.api.port),
        );

        if !options.block_domains.is_empty() {
            routing = routing
                .add_rule(RoutingRule::new(BLOCK_TAG).match_domain(options.block_domains.clone()));
        }

        if !options.block_ips.is_empty() {
            routing =
                routing.add_rule(RoutingRule::new(BLOCK_TAG).match_ip(options.block_ips.clone()));
        }

        if options.bypass_lan {
            routing = routing
                .add_rule(RoutingRule::new(DIRECT_TAG).match_ip(vec!["geoip:private".to_string()]));
        }

        routing
    }
}

// ============================================================================
// Proxy Outbound Settings
// ============================================================================

fn outbound_settings(descriptor: &ProxyDescriptor) -> OutboundSettings {
    let address = descriptor.address().to_string();
    let port = descriptor.port();

    match descriptor.identity() {
        Identity::Uuid(id) => {
            let (alter_id, security, encryption, flow) = match descriptor.extra() {
                Extra::VMess { alter_id, cipher } => {
                    (Some(*alter_id), Some(cipher.clone()), None, None)
                }
                Extra::VLess { flow, encryption } => {
                    (None, None, Some(encryption.clone()), flow.clone())
                }
                Extra::None => (None, None, None, None),
            };

            let vnext = VNextSettings {
                vnext: vec![VNextServer {
                    address,
                    port,
                    users: vec![VNextUser {
                        id: id.clone(),
                        alter_id,
                        security,
                        encryption,
                        flow,
                        level: USER_LEVEL,
                    }],
                }],
            };

            if descriptor.protocol() == Protocol::VLess {
                OutboundSettings::VLess(vnext)
            } else {
                OutboundSettings::VMess(vnext)
            }
        }
        Identity::Password(password) => OutboundSettings::Trojan(TrojanSettings {
            servers: vec![TrojanServer {
                address,
                port,
                password: password.clone(),
                level: USER_LEVEL,
            }],
        }),
        Identity::Cipher { method, password } => {
            OutboundSettings::Shadowsocks(ShadowsocksSettings {
                servers: vec![ShadowsocksServer {
                    address,
                    port,
                    method: method.clone(),
                    password: password.clone(),
                    level: USER_LEVEL,
                }],
            })
        }
        Identity::Socks(auth) => OutboundSettings::Socks(SocksSettings {
            servers: vec![SocksServer {
                address,
                port,
                users: auth
                    .iter()
                    .map(|auth| SocksUser {
                        user: auth.user.clone(),
                        pass: auth.pass.clone(),
                        level: USER_LEVEL,
                    })
                    .collect(),
            }],
        }),
    }
}

// ============================================================================
// Stream Settings
// ============================================================================

fn stream_settings(descriptor: &ProxyDescriptor) -> Option<StreamSettings> {
    if !descriptor.protocol().supports_stream_settings() {
        return None;
    }

    let default_transport = Transport::default();
    let transport = descriptor.transport().unwrap_or(&default_transport);
    trace!("Building {} stream settings", transport.network.as_str());

    let mut stream = StreamSettings::new(transport.network.as_str());
    let path = || transport.path.clone().unwrap_or_else(|| "/".to_string());
    let header = || HeaderObject::new(transport.header_type.as_deref().unwrap_or("none"));

    match transport.network {
        Network::Tcp => {
            let mut header = header();
            if header.header_type == "http" {
                let mut headers = BTreeMap::new();
                if let Some(host) = &transport.host {
                    headers.insert("Host".to_string(), split_hosts(host));
                }
                header.request = Some(HttpHeaderRequest {
                    path: vec![path()],
                    headers,
                });
            }
            stream.tcp_settings = Some(TcpSettings { header });
        }
        Network::WebSocket => {
            let mut headers = BTreeMap::new();
            if let Some(host) = &transport.host {
                headers.insert("Host".to_string(), host.clone());
            }
            stream.ws_settings = Some(WsSettings {
                path: path(),
                headers,
            });
        }
        Network::Http2 => {
            stream.http_settings = Some(HttpSettings {
                host: transport.host.as_deref().map(split_hosts).unwrap_or_default(),
                path: path(),
            });
        }
        Network::Grpc => {
            stream.grpc_settings = Some(GrpcSettings {
                service_name: transport.service_name.clone().unwrap_or_default(),
                multi_mode: transport.mode.as_deref() == Some("multi"),
            });
        }
        Network::Quic => {
            stream.quic_settings = Some(QuicSettings {
                security: transport.host.clone().unwrap_or_else(|| "none".to_string()),
                key: transport.path.clone().unwrap_or_default(),
                header: header(),
            });
        }
        Network::Kcp => {
            stream.kcp_settings = Some(KcpSettings {
                header: header(),
                seed: transport.seed.clone(),
                ..Default::default()
            });
        }
    }

    Some(match descriptor.security() {
        Some(security) => apply_security(stream, security, transport),
        None => stream,
    })
}

fn apply_security(
    stream: StreamSettings,
    security: &Security,
    transport: &Transport,
) -> StreamSettings {
    // SNI falls back to the Host header
    let server_name = security.sni.clone().or_else(|| transport.host.clone());

    match &security.layer {
        SecurityLayer::Tls => stream.with_tls(TlsSettings {
            server_name,
            allow_insecure: security.allow_insecure,
            alpn: security.alpn.clone(),
            fingerprint: security.fingerprint.clone(),
        }),
        SecurityLayer::Reality {
            public_key,
            short_id,
            spider_x,
        } => stream.with_reality(RealitySettings {
            server_name,
            fingerprint: security.fingerprint.clone(),
            public_key: public_key.clone(),
            short_id: short_id.clone(),
            spider_x: spider_x.clone(),
        }),
    }
}

fn split_hosts(hosts: &str) -> Vec<String> {
    hosts
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::SocksAuth;
    use crate::parser;

    fn proxy_value(uri: &str) -> serde_json::Value {
        let descriptor = parser::parse(uri).unwrap();
        let outbound = ConfigAssembler::default().proxy_outbound(&descriptor);
        serde_json::to_value(&outbound).unwrap()
    }

    #[test]
    fn test_default_document_layout() {
        let descriptor = parser::parse("trojan://p4ssw0rd@example.com:443#MyNode").unwrap();
        let config = ConfigAssembler::default().assemble(&descriptor);

        let tags: Vec<&str> = config.outbounds.iter().map(|o| o.tag.as_str()).collect();
        assert_eq!(tags, vec!["proxy", "direct", "block"]);
        assert_eq!(config.outbounds[1].protocol(), "freedom");
        assert_eq!(config.outbounds[2].protocol(), "blackhole");

        assert_eq!(config.inbounds.len(), 1);
        assert_eq!(config.inbounds[0].tag, "socks-in");
        assert_eq!(config.inbounds[0].port, 10808);
        assert_eq!(config.inbounds[0].listen, "127.0.0.1");
        assert!(config.inbounds[0].sniffing.is_some());

        assert_eq!(config.routing.rules.len(), 1);
        let rule = &config.routing.rules[0];
        assert_eq!(rule.outbound_tag, "direct");
        assert_eq!(rule.ip, vec!["127.0.0.1"]);
        assert_eq!(rule.port.as_deref(), Some("10085"));

        assert!(config.stats.is_none());
        assert!(config.api.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_vmess_proxy_outbound() {
        let value = proxy_value(
            "vmess://eyJ2IjoiMiIsInBzIjoibXlzZXJ2ZXIiLCJhZGQiOiIxLjIuMy40IiwicG9ydCI6NDQzLCJpZCI6ImFhYWEtYmJiYi1jY2NjIiwibmV0IjoidGNwIn0=",
        );
        assert_eq!(value["tag"], "proxy");
        assert_eq!(value["protocol"], "vmess");
        let server = &value["settings"]["vnext"][0];
        assert_eq!(server["address"], "1.2.3.4");
        assert_eq!(server["port"], 443);
        assert_eq!(server["users"][0]["id"], "aaaa-bbbb-cccc");
        assert_eq!(server["users"][0]["alterId"], 0);
        assert_eq!(server["users"][0]["security"], "auto");
        assert_eq!(server["users"][0]["level"], 8);
        assert_eq!(value["streamSettings"]["network"], "tcp");
        assert_eq!(value["streamSettings"]["security"], "none");
        assert_eq!(value["mux"]["enabled"], false);
    }

    #[test]
    fn test_vless_ws_tls_outbound() {
        let value = proxy_value(
            "vless://d342d11e-d424-4583-b36e-524ab1f0afa4@example.com:443?security=tls&type=ws&path=%2Fws&host=cdn.example.com#MyNode",
        );
        assert_eq!(value["protocol"], "vless");
        let user = &value["settings"]["vnext"][0]["users"][0];
        assert_eq!(user["encryption"], "none");
        assert!(user.get("alterId").is_none());
        assert!(user.get("flow").is_none());

        let stream = &value["streamSettings"];
        assert_eq!(stream["network"], "ws");
        assert_eq!(stream["security"], "tls");
        assert_eq!(stream["wsSettings"]["path"], "/ws");
        assert_eq!(stream["wsSettings"]["headers"]["Host"], "cdn.example.com");
        assert_eq!(stream["tlsSettings"]["serverName"], "cdn.example.com");
        assert_eq!(stream["tlsSettings"]["allowInsecure"], false);
    }

    #[test]
    fn test_vless_reality_grpc_outbound() {
        let value = proxy_value(
            "vless://uuid@example.com:443?security=reality&pbk=pk&sid=ab&sni=www.example.com&fp=chrome&type=grpc&serviceName=svc&mode=multi&flow=xtls-rprx-vision",
        );
        let stream = &value["streamSettings"];
        assert_eq!(stream["security"], "reality");
        assert_eq!(stream["realitySettings"]["publicKey"], "pk");
        assert_eq!(stream["realitySettings"]["shortId"], "ab");
        assert_eq!(stream["realitySettings"]["serverName"], "www.example.com");
        assert_eq!(stream["realitySettings"]["fingerprint"], "chrome");
        assert!(stream.get("tlsSettings").is_none());
        assert_eq!(stream["grpcSettings"]["serviceName"], "svc");
        assert_eq!(stream["grpcSettings"]["multiMode"], true);
        assert_eq!(
            value["settings"]["vnext"][0]["users"][0]["flow"],
            "xtls-rprx-vision"
        );
    }

    #[test]
    fn test_trojan_outbound() {
        let value =
            proxy_value("trojan://p4ssw0rd@example.com:443?security=tls&sni=example.com#MyNode");
        assert_eq!(value["protocol"], "trojan");
        let server = &value["settings"]["servers"][0];
        assert_eq!(server["address"], "example.com");
        assert_eq!(server["port"], 443);
        assert_eq!(server["password"], "p4ssw0rd");
        assert_eq!(value["streamSettings"]["tlsSettings"]["serverName"], "example.com");
    }

    #[test]
    fn test_shadowsocks_outbound_has_no_stream_settings() {
        let value = proxy_value("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:8388#MyNode");
        assert_eq!(value["protocol"], "shadowsocks");
        let server = &value["settings"]["servers"][0];
        assert_eq!(server["method"], "aes-256-gcm");
        assert_eq!(server["password"], "password");
        assert_eq!(server["port"], 8388);
        assert!(value.get("streamSettings").is_none());
    }

    #[test]
    fn test_socks_outbound_users() {
        let value = proxy_value("socks://dXNlcjpwYXNz@example.com:1080#MyNode");
        assert_eq!(value["protocol"], "socks");
        let server = &value["settings"]["servers"][0];
        assert_eq!(server["users"][0]["user"], "user");
        assert_eq!(server["users"][0]["pass"], "pass");

        let anonymous = proxy_value("socks://example.com:1080");
        assert!(anonymous["settings"]["servers"][0].get("users").is_none());
    }

    #[test]
    fn test_tcp_http_header() {
        let value = proxy_value(
            "vless://uuid@example.com:80?type=tcp&headerType=http&host=a.com,b.com&path=%2Findex",
        );
        let header = &value["streamSettings"]["tcpSettings"]["header"];
        assert_eq!(header["type"], "http");
        assert_eq!(header["request"]["path"][0], "/index");
        assert_eq!(header["request"]["headers"]["Host"][1], "b.com");
    }

    #[test]
    fn test_h2_quic_kcp_settings() {
        let h2 =
            proxy_value("vless://uuid@example.com:443?type=h2&host=a.com&path=%2Fh2&security=tls");
        assert_eq!(h2["streamSettings"]["network"], "h2");
        assert_eq!(h2["streamSettings"]["httpSettings"]["host"][0], "a.com");
        assert_eq!(h2["streamSettings"]["httpSettings"]["path"], "/h2");

        let quic = proxy_value("vless://uuid@example.com:443?type=quic&headerType=wechat-video");
        assert_eq!(quic["streamSettings"]["quicSettings"]["security"], "none");
        assert_eq!(quic["streamSettings"]["quicSettings"]["header"]["type"], "wechat-video");

        let kcp = proxy_value("vless://uuid@example.com:443?type=kcp&seed=s3cret");
        assert_eq!(kcp["streamSettings"]["network"], "kcp");
        assert_eq!(kcp["streamSettings"]["kcpSettings"]["seed"], "s3cret");
        assert_eq!(kcp["streamSettings"]["kcpSettings"]["header"]["type"], "none");
    }

    #[test]
    fn test_settings_drive_inbounds_and_rules() {
        let mut settings = Settings::default();
        settings.inbound.http_port = Some(10809);
        settings.inbound.sniffing = false;
        settings.api.enabled = true;
        settings.routing.block_domains = vec!["geosite:category-ads-all".to_string()];
        settings.routing.block_ips = vec!["10.9.8.7".to_string()];
        settings.routing.bypass_lan = true;

        let descriptor = ProxyDescriptor::new(
            Protocol::Socks,
            "example.com",
            1080,
            Identity::Socks(Some(SocksAuth {
                user: "u".to_string(),
                pass: "p".to_string(),
            })),
        )
        .unwrap();
        let config = ConfigAssembler::new(settings).assemble(&descriptor);

        let inbound_tags: Vec<&str> = config.inbounds.iter().map(|i| i.tag.as_str()).collect();
        assert_eq!(inbound_tags, vec!["socks-in", "http-in", "api"]);
        assert!(config.inbounds.iter().all(|i| i.sniffing.is_none()));

        let targets: Vec<&str> = config
            .routing
            .rules
            .iter()
            .map(|r| r.outbound_tag.as_str())
            .collect();
        assert_eq!(targets, vec!["api", "direct", "block", "block", "direct"]);
        assert_eq!(config.routing.rules[4].ip, vec!["geoip:private"]);

        assert!(config.stats.is_some());
        assert_eq!(config.api.as_ref().unwrap().tag, "api");
        assert!(config.policy.is_some());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_dns_from_settings() {
        let mut settings = Settings::default();
        settings.dns.servers = vec!["9.9.9.9".to_string()];
        settings.dns.hosts.insert("dns.google".to_string(), "8.8.8.8".to_string());
        settings.dns.query_strategy = Some("UseIPv4".to_string());

        let descriptor = parser::parse("trojan://p4ssw0rd@example.com:443").unwrap();
        let config = ConfigAssembler::new(settings).assemble(&descriptor);

        let dns = config.dns.unwrap();
        assert_eq!(dns.servers, vec!["9.9.9.9"]);
        assert_eq!(dns.hosts.get("dns.google").map(String::as_str), Some("8.8.8.8"));
        assert_eq!(dns.query_strategy.as_deref(), Some("UseIPv4"));
    }

    #[test]
    fn test_assemble_is_fresh_per_call() {
        let descriptor =
            parser::parse("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:8388").unwrap();
        let assembler = ConfigAssembler::default();
        assert_eq!(assembler.assemble(&descriptor), assembler.assemble(&descriptor));
    }
}
