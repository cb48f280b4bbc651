//! Routing configuration types.
//!
//! Rules are evaluated in order; traffic that matches no rule goes to the
//! first outbound.

use serde::{Deserialize, Serialize};

// ============================================================================
// Routing Configuration
// ============================================================================

/// Main routing configuration
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Routing {
    /// How domains are resolved for IP rules: `AsIs`, `IPIfNonMatch` or `IPOnDemand`
    pub domain_strategy: String,

    /// Ordered routing rules
    #[serde(default)]
    pub rules: Vec<RoutingRule>,
}

impl Default for Routing {
    fn default() -> Self {
        Self {
            domain_strategy: "AsIs".to_string(),
            rules: Vec::new(),
        }
    }
}

impl Routing {
    /// Create an empty routing section with the default domain strategy
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the domain strategy
    pub fn with_domain_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.domain_strategy = strategy.into();
        self
    }

    /// Append a rule
    pub fn add_rule(mut self, rule: RoutingRule) -> Self {
        self.rules.push(rule);
        self
    }
}

// ============================================================================
// Routing Rule
// ============================================================================

/// A `field` rule. All populated matchers must match.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutingRule {
    #[serde(rename = "type")]
    pub rule_type: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inbound_tag: Vec<String>,

    /// Domain matchers such as `domain:example.com` or `geosite:category-ads`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub domain: Vec<String>,

    /// IP or CIDR matchers, including `geoip:` entries
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip: Vec<String>,

    /// Port or port range, e.g. `53` or `1000-2000`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,

    /// Target outbound tag
    pub outbound_tag: String,
}

impl RoutingRule {
    /// Create a rule sending matched traffic to `outbound_tag`
    pub fn new(outbound_tag: impl Into<String>) -> Self {
        Self {
            rule_type: "field".to_string(),
            inbound_tag: Vec::new(),
            domain: Vec::new(),
            ip: Vec::new(),
            port: None,
            outbound_tag: outbound_tag.into(),
        }
    }

    pub fn match_inbound_tag(mut self, tags: Vec<String>) -> Self {
        self.inbound_tag = tags;
        self
    }

    pub fn match_domain(mut self, domains: Vec<String>) -> Self {
        self.domain = domains;
        self
    }

    pub fn match_ip(mut self, ips: Vec<String>) -> Self {
        self.ip = ips;
        self
    }

    pub fn match_port(mut self, port: impl ToString) -> Self {
        self.port = Some(port.to_string());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_default() {
        let json = serde_json::to_string(&Routing::new()).unwrap();
        assert_eq!(json, r#"{"domainStrategy":"AsIs","rules":[]}"#);
    }

    #[test]
    fn test_rule_serialization() {
        let rule = RoutingRule::new("direct")
            .match_ip(vec!["127.0.0.1".to_string()])
            .match_port(10085);
        let json = serde_json::to_string(&rule).unwrap();
        assert_eq!(
            json,
            r#"{"type":"field","ip":["127.0.0.1"],"port":"10085","outboundTag":"direct"}"#
        );
    }

    #[test]
    fn test_rule_inbound_tag() {
        let rule = RoutingRule::new("api").match_inbound_tag(vec!["api".to_string()]);
        let json = serde_json::to_string(&rule).unwrap();
        assert!(json.contains(r#""inboundTag":["api"]"#));
        assert!(!json.contains("domain"));
    }

    #[test]
    fn test_routing_builder() {
        let routing = Routing::new()
            .with_domain_strategy("IPIfNonMatch")
            .add_rule(
                RoutingRule::new("block").match_domain(vec!["geosite:category-ads".to_string()]),
            );
        assert_eq!(routing.domain_strategy, "IPIfNonMatch");
        assert_eq!(routing.rules.len(), 1);
        assert_eq!(routing.rules[0].outbound_tag, "block");
    }
}
