//! End-to-end tests: share link in, engine configuration out.

use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::Value;
use sharelink::parser::protocols::VMessParser;
use sharelink::{ParseError, Protocol, Settings, ShareLink, parse, parse_link_list_lossy};

const VMESS: &str = "vmess://eyJ2IjoiMiIsInBzIjoibXlzZXJ2ZXIiLCJhZGQiOiIxLjIuMy40IiwicG9ydCI6NDQzLCJpZCI6ImFhYWEtYmJiYi1jY2NjIiwibmV0IjoidGNwIn0=";
const VLESS: &str = "vless://d342d11e-d424-4583-b36e-524ab1f0afa4@example.com:443?security=tls&type=ws&path=%2Fws#MyNode";
const TROJAN: &str = "trojan://p4ssw0rd@example.com:443?security=tls&sni=example.com#MyNode";
const SHADOWSOCKS: &str = "ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ=@example.com:8388#MyNode";
const SOCKS: &str = "socks://dXNlcjpwYXNz@example.com:1080#MyNode";

fn parsed(uri: &str) -> ShareLink {
    let mut link = ShareLink::new();
    link.parse(uri).unwrap();
    link
}

fn document(link: &ShareLink) -> Value {
    serde_json::from_str(&link.json(2).unwrap()).unwrap()
}

// ============================================================================
// Sample Links
// ============================================================================

#[test]
fn test_sample_links_accessors() {
    let cases = [
        (VMESS, Protocol::VMess, "1.2.3.4", 443, "myserver"),
        (VLESS, Protocol::VLess, "example.com", 443, "MyNode"),
        (TROJAN, Protocol::Trojan, "example.com", 443, "MyNode"),
        (SHADOWSOCKS, Protocol::Shadowsocks, "example.com", 8388, "MyNode"),
        (SOCKS, Protocol::Socks, "example.com", 1080, "MyNode"),
    ];

    for (uri, protocol, address, port, remark) in cases {
        let link = parsed(uri);
        assert_eq!(link.descriptor().unwrap().protocol(), protocol, "{uri}");
        assert_eq!(link.address(), address, "{uri}");
        assert_eq!(link.port(), port, "{uri}");
        assert_eq!(link.remark(), remark, "{uri}");
    }
}

#[test]
fn test_sample_links_produce_valid_documents() {
    for uri in [VMESS, VLESS, TROJAN, SHADOWSOCKS, SOCKS] {
        let link = parsed(uri);
        let config = link.full_configuration().unwrap();
        assert!(config.validate().is_ok(), "{uri}");

        let value = document(&link);
        assert_eq!(value["outbounds"][0]["tag"], "proxy");
        assert_eq!(value["outbounds"][1]["protocol"], "freedom");
        assert_eq!(value["outbounds"][2]["protocol"], "blackhole");
        assert_eq!(value["inbounds"][0]["protocol"], "socks");
    }
}

#[test]
fn test_json_is_deterministic() {
    for uri in [VMESS, VLESS, TROJAN, SHADOWSOCKS, SOCKS] {
        let first = parsed(uri).json(2).unwrap();
        let second = parsed(uri).json(2).unwrap();
        assert_eq!(first, second);
    }
}

#[test]
fn test_vless_outbound_shape() {
    let link = parsed(VLESS);
    let outbound: Value = serde_json::from_str(&link.outbound_json(0).unwrap()).unwrap();

    assert_eq!(outbound["protocol"], "vless");
    let user = &outbound["settings"]["vnext"][0]["users"][0];
    assert_eq!(user["id"], "d342d11e-d424-4583-b36e-524ab1f0afa4");
    assert_eq!(user["encryption"], "none");
    assert_eq!(outbound["streamSettings"]["network"], "ws");
    assert_eq!(outbound["streamSettings"]["security"], "tls");
    assert_eq!(outbound["streamSettings"]["wsSettings"]["path"], "/ws");
}

#[test]
fn test_shadowsocks_outbound_shape() {
    let value = document(&parsed(SHADOWSOCKS));
    let server = &value["outbounds"][0]["settings"]["servers"][0];
    assert_eq!(server["address"], "example.com");
    assert_eq!(server["port"], 8388);
    assert_eq!(server["method"], "aes-256-gcm");
    assert_eq!(server["password"], "password");
}

#[test]
fn test_socks_outbound_credentials() {
    let value = document(&parsed(SOCKS));
    let user = &value["outbounds"][0]["settings"]["servers"][0]["users"][0];
    assert_eq!(user["user"], "user");
    assert_eq!(user["pass"], "pass");
}

// ============================================================================
// Shadowsocks Shapes
// ============================================================================

#[test]
fn test_legacy_shadowsocks_link() {
    let link = parsed("ss://YWVzLTI1Ni1nY206cGFzc3dvcmRAZXhhbXBsZS5jb206ODM4OA==#Legacy");
    assert_eq!(link.address(), "example.com");
    assert_eq!(link.port(), 8388);
    assert_eq!(link.remark(), "Legacy");
}

#[test]
fn test_raw_at_selects_modern_shadowsocks() {
    let link = parsed("ss://YWVzLTI1Ni1nY206cA==@host.example:1234");
    assert_eq!(link.address(), "host.example");
    assert_eq!(link.port(), 1234);
    assert_eq!(link.remark(), "");
}

// ============================================================================
// Links From Other Generators
// ============================================================================

#[test]
fn test_trojan_password_keeps_colons() {
    let value = document(&parsed("trojan://pa:ss@example.com:443#n"));
    assert_eq!(value["outbounds"][0]["settings"]["servers"][0]["password"], "pa:ss");
}

#[test]
fn test_vmess_numeric_version_and_null_remark() {
    // {"v":2,"ps":null,"add":"example.com","port":443,"id":"uuid"}
    let link = parsed(
        "vmess://eyJ2IjoyLCJwcyI6bnVsbCwiYWRkIjoiZXhhbXBsZS5jb20iLCJwb3J0Ijo0NDMsImlkIjoidXVpZCJ9",
    );
    assert_eq!(link.address(), "example.com");
    assert_eq!(link.remark(), "");
}

#[test]
fn test_shadowsocks_percent_encoded_padding() {
    let value = document(&parsed("ss://YWVzLTI1Ni1nY206cGFzc3dvcmQ%3D@example.com:8388"));
    let server = &value["outbounds"][0]["settings"]["servers"][0];
    assert_eq!(server["method"], "aes-256-gcm");
    assert_eq!(server["password"], "password");
}

// ============================================================================
// Errors and State
// ============================================================================

#[test]
fn test_unsupported_schemes() {
    for uri in ["vmess2://abc", "http://example.com", "VMESS://abc", "no scheme"] {
        let mut link = ShareLink::new();
        let err = link.parse(uri).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedScheme(_)), "{uri}");
        assert!(!link.is_parsed());
    }
}

#[test]
fn test_malformed_vmess_is_parse_error() {
    let err = parse("vmess://not-valid-base64!!").unwrap_err();
    assert!(matches!(
        err,
        ParseError::ParseUri {
            protocol: Protocol::VMess,
            ..
        }
    ));
}

#[test]
fn test_not_yet_parsed() {
    let link = ShareLink::new();
    assert!(matches!(link.json(2), Err(ParseError::NotYetParsed)));
    assert_eq!(link.address(), "");
    assert_eq!(link.port(), 0);
}

#[test]
fn test_failed_parse_keeps_last_good_link() {
    let mut link = parsed(SHADOWSOCKS);
    let before = link.json(2).unwrap();

    assert!(link.parse("ss://%%%").is_err());
    assert!(link.parse("trojan://example.com:443").is_err());

    assert_eq!(link.port(), 8388);
    assert_eq!(link.json(2).unwrap(), before);
}

#[test]
fn test_shared_instance_behind_mutex() {
    let shared = Arc::new(Mutex::new(ShareLink::new()));
    let uris = [VMESS, VLESS, TROJAN, SHADOWSOCKS, SOCKS];

    let handles: Vec<_> = uris
        .into_iter()
        .map(|uri| {
            let shared = Arc::clone(&shared);
            thread::spawn(move || {
                let mut link = shared.lock().unwrap();
                link.parse(uri).unwrap();
                let value: Value = serde_json::from_str(&link.json(0).unwrap()).unwrap();
                let protocol = link.descriptor().unwrap().protocol();
                assert_eq!(value["outbounds"][0]["protocol"], protocol.as_str());
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }
    assert!(shared.lock().unwrap().is_parsed());
}

// ============================================================================
// Link Lists and Settings
// ============================================================================

#[test]
fn test_link_list_skips_bad_lines() {
    let content = format!("# subscription\n{VMESS}\nhttp://nope\n\n{SOCKS}\n");
    let descriptors = parse_link_list_lossy(&content);
    assert_eq!(descriptors.len(), 2);

    let mut link = ShareLink::new();
    link.set_descriptor(descriptors[1].clone());
    assert_eq!(link.port(), 1080);
}

#[test]
fn test_vmess_link_round_trip() {
    let first = parse(VMESS).unwrap();
    let link = VMessParser.to_link(&first).unwrap();
    assert_eq!(parse(&link).unwrap(), first);
}

#[test]
fn test_settings_enable_stats_api() {
    let settings = Settings::from_toml(
        r#"
        [inbound]
        port = 1081
        http_port = 8118

        [api]
        enabled = true
        port = 10086
        "#,
    )
    .unwrap();

    let mut link = ShareLink::with_settings(settings);
    link.parse(TROJAN).unwrap();
    let value = document(&link);

    assert_eq!(value["inbounds"][0]["port"], 1081);
    assert_eq!(value["inbounds"][1]["protocol"], "http");
    assert_eq!(value["inbounds"][2]["protocol"], "dokodemo-door");
    assert_eq!(value["routing"]["rules"][0]["outboundTag"], "api");
    assert_eq!(value["routing"]["rules"][1]["port"], "10086");
    assert!(value["stats"].is_object());
    assert!(link.full_configuration().unwrap().validate().is_ok());
}
