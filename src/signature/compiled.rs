//! Compiled signatures.
//!
//! Compilation turns a [`SignatureDefinition`] into matchers once: literal
//! lists become case-insensitive Aho-Corasick automata, regular expressions
//! are built up front, and probe payloads are decoded. Evaluation afterwards
//! only reads the compiled form, so a [`Signature`] is freely shared across
//! threads.

use super::content::Content;
use super::definition::{FaviconHashes, Protocol, RuleDefinition, SignatureDefinition};
use super::types::{Probe, Sender};
use crate::error::{FingerprintError, Result};
use crate::framework::{Framework, Vuln};
use aho_corasick::AhoCorasick;
use base64::Engine as _;
use regex::{Regex, RegexBuilder};
use tracing::debug;

/// Probe level granted to a rule that does not declare one.
pub const DEFAULT_RULE_LEVEL: u8 = 1;

#[derive(Debug, Clone)]
struct CompiledRule {
    body: Option<AhoCorasick>,
    header: Option<AhoCorasick>,
    cert: Option<AhoCorasick>,
    regexps: Vec<Regex>,
    versions: Vec<Regex>,
    probe: Option<Vec<u8>>,
    level: u8,
    vuln: Option<(String, Option<String>)>,
    favicon: Option<FaviconHashes>,
}

impl CompiledRule {
    fn compile(name: &str, rule: &RuleDefinition, is_socket: bool) -> Result<Self> {
        let regexps = &rule.regexps;
        if is_socket && !regexps.cert.is_empty() {
            return Err(FingerprintError::compile(
                name,
                "certificate patterns are not valid for socket signatures",
            ));
        }

        let probe = match (&rule.send_data, &rule.send_data_base64) {
            (Some(_), Some(_)) => {
                return Err(FingerprintError::compile(
                    name,
                    "send_data and send_data_base64 are mutually exclusive",
                ))
            }
            (Some(text), None) if !text.is_empty() => Some(text.as_bytes().to_vec()),
            (None, Some(encoded)) => Some(
                base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| {
                        FingerprintError::compile(name, format!("invalid probe payload: {e}"))
                    })?,
            ),
            _ => None,
        };

        Ok(Self {
            body: build_literals(name, &regexps.body)?,
            header: build_literals(name, &regexps.header)?,
            cert: build_literals(name, &regexps.cert)?,
            regexps: build_regexes(name, &regexps.regexp)?,
            versions: build_regexes(name, &regexps.version)?,
            probe,
            level: rule.level.unwrap_or(DEFAULT_RULE_LEVEL).max(DEFAULT_RULE_LEVEL),
            vuln: rule
                .vuln
                .as_ref()
                .map(|vuln| (vuln.clone(), rule.severity.clone())),
            favicon: rule.favicon.clone(),
        })
    }

    fn has_content_matchers(&self) -> bool {
        self.body.is_some()
            || self.header.is_some()
            || self.cert.is_some()
            || !self.regexps.is_empty()
    }

    fn is_match(&self, content: &Content) -> bool {
        let literal = |automaton: &Option<AhoCorasick>, haystack: &str| {
            automaton
                .as_ref()
                .map_or(false, |ac| ac.is_match(haystack))
        };

        if literal(&self.header, content.header())
            || literal(&self.body, content.body())
            || literal(&self.cert, content.cert())
            || self.regexps.iter().any(|re| re.is_match(content.text()))
        {
            return true;
        }

        // Version expressions double as matchers for rules with nothing else.
        !self.has_content_matchers() && self.versions.iter().any(|re| re.is_match(content.text()))
    }

    fn extract_version(&self, content: &Content) -> Option<String> {
        self.versions.iter().find_map(|re| {
            re.captures(content.text()).and_then(|caps| {
                caps.get(1)
                    .or_else(|| caps.get(0))
                    .map(|m| m.as_str().trim().to_string())
                    .filter(|v| !v.is_empty())
            })
        })
    }
}

fn build_literals(name: &str, patterns: &[String]) -> Result<Option<AhoCorasick>> {
    let patterns: Vec<&str> = patterns
        .iter()
        .map(String::as_str)
        .filter(|p| !p.is_empty())
        .collect();
    if patterns.is_empty() {
        return Ok(None);
    }
    AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build(patterns)
        .map(Some)
        .map_err(|e| FingerprintError::compile(name, e.to_string()))
}

fn build_regexes(name: &str, patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    FingerprintError::compile(name, format!("invalid regex '{pattern}': {e}"))
                })
        })
        .collect()
}

/// A compiled product signature.
#[derive(Debug, Clone)]
pub struct Signature {
    name: String,
    protocol: Protocol,
    namespace: String,
    focus: bool,
    tags: Vec<String>,
    ports: Vec<String>,
    is_socket: bool,
    rules: Vec<CompiledRule>,
}

impl Signature {
    /// Compile a definition.
    ///
    /// `is_socket` selects banner matching: the whole banner is visible to
    /// header and body literals, and certificate patterns are rejected.
    /// `namespace` is stamped on every identity the signature produces.
    pub fn compile(
        definition: &SignatureDefinition,
        is_socket: bool,
        namespace: &str,
    ) -> Result<Self> {
        if definition.name.trim().is_empty() {
            return Err(FingerprintError::compile(&definition.name, "signature name is empty"));
        }

        let rules = definition
            .rules
            .iter()
            .map(|rule| CompiledRule::compile(&definition.name, rule, is_socket))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            name: definition.name.clone(),
            protocol: definition.protocol,
            namespace: namespace.to_string(),
            focus: definition.focus,
            tags: definition.tags.clone(),
            ports: definition.default_port.clone(),
            is_socket,
            rules,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// Declared port specs (unexpanded).
    pub fn ports(&self) -> &[String] {
        &self.ports
    }

    pub fn is_socket(&self) -> bool {
        self.is_socket
    }

    /// True when any rule may send a probe.
    pub fn is_active(&self) -> bool {
        self.rules.iter().any(|rule| rule.probe.is_some())
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Favicon hash lists declared by this signature's rules.
    pub fn favicon_hashes(&self) -> impl Iterator<Item = &FaviconHashes> {
        self.rules.iter().filter_map(|rule| rule.favicon.as_ref())
    }

    pub fn has_favicons(&self) -> bool {
        self.favicon_hashes().next().is_some()
    }

    /// Identity this signature reports, without a version.
    pub fn framework(&self) -> Framework {
        Framework {
            name: self.name.clone(),
            from: self.namespace.clone(),
            tags: self.tags.clone(),
            focus: self.focus,
            ..Default::default()
        }
    }

    /// Evaluate this signature against `content`.
    ///
    /// Passive rules test `content`. Probe rules run only with a sender and
    /// when `level` reaches the rule's level; they test the probe response.
    /// The first matching rule decides the result.
    pub fn match_one(
        &self,
        content: &Content,
        level: u8,
        sender: Option<&Sender<'_>>,
    ) -> Option<(Framework, Option<Vuln>)> {
        self.evaluate(Some(content), level, sender)
    }

    /// Evaluate only the probe rules. Used for active HTTP matching, where
    /// there is no captured content to test.
    pub fn match_active(
        &self,
        level: u8,
        sender: &Sender<'_>,
    ) -> Option<(Framework, Option<Vuln>)> {
        self.evaluate(None, level, Some(sender))
    }

    fn evaluate(
        &self,
        content: Option<&Content>,
        level: u8,
        sender: Option<&Sender<'_>>,
    ) -> Option<(Framework, Option<Vuln>)> {
        for rule in &self.rules {
            let hit = match (&rule.probe, content) {
                (None, Some(content)) => rule
                    .is_match(content)
                    .then(|| rule.extract_version(content)),
                (None, None) => None,
                (Some(payload), _) => self.send_probe(rule, payload, level, sender),
            };

            if let Some(version) = hit {
                let mut framework = self.framework();
                framework.version = version;
                let vuln = rule.vuln.as_ref().map(|(name, severity)| Vuln {
                    name: name.clone(),
                    severity: severity.clone(),
                    framework: self.name.clone(),
                });
                return Some((framework, vuln));
            }
        }
        None
    }

    fn send_probe(
        &self,
        rule: &CompiledRule,
        payload: &[u8],
        level: u8,
        sender: Option<&Sender<'_>>,
    ) -> Option<Option<String>> {
        let sender = sender.filter(|_| level >= rule.level)?;
        let probe = Probe {
            signature: self.name.clone(),
            protocol: self.protocol,
            payload: payload.to_vec(),
            level: rule.level,
        };

        match sender(&probe) {
            Ok(response) => {
                let response = Content::new(&response, "", !self.is_socket);
                rule.is_match(&response)
                    .then(|| rule.extract_version(&response))
            }
            Err(err) => {
                debug!(signature = %self.name, error = %err, "probe failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::definition::Regexps;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn http_signature(rule: RuleDefinition) -> Signature {
        let definition = SignatureDefinition::new("nginx", Protocol::Http).with_rule(rule);
        Signature::compile(&definition, false, "fingerprint").unwrap()
    }

    #[test]
    fn test_header_literal_case_insensitive() {
        let signature = http_signature(RuleDefinition {
            regexps: Regexps {
                header: vec!["server: nginx".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        let content = Content::http(b"HTTP/1.1 200 OK\r\nServer: NGINX\r\n\r\nbody", "");
        let (framework, vuln) = signature.match_one(&content, 0, None).unwrap();
        assert_eq!(framework.name, "nginx");
        assert_eq!(framework.from, "fingerprint");
        assert!(vuln.is_none());

        // Header literal does not look into the body.
        let content = Content::http(b"HTTP/1.1 200 OK\r\n\r\nserver: nginx", "");
        assert!(signature.match_one(&content, 0, None).is_none());
    }

    #[test]
    fn test_version_extraction() {
        let signature = http_signature(RuleDefinition {
            regexps: Regexps {
                header: vec!["nginx".to_string()],
                version: vec![r"nginx/([\d.]+)".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });

        let content = Content::http(b"HTTP/1.1 200 OK\r\nServer: nginx/1.25.3\r\n\r\n", "");
        let (framework, _) = signature.match_one(&content, 0, None).unwrap();
        assert_eq!(framework.version.as_deref(), Some("1.25.3"));
    }

    #[test]
    fn test_version_only_rule_matches() {
        let signature = http_signature(RuleDefinition {
            regexps: Regexps {
                version: vec![r"X-Powered-By: PHP/([\d.]+)".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        let content = Content::http(b"HTTP/1.1 200 OK\r\nX-Powered-By: PHP/8.2.1\r\n\r\n", "");
        let (framework, _) = signature.match_one(&content, 0, None).unwrap();
        assert_eq!(framework.version.as_deref(), Some("8.2.1"));
    }

    #[test]
    fn test_cert_patterns() {
        let signature = http_signature(RuleDefinition {
            regexps: Regexps {
                cert: vec!["O=Fortinet".to_string()],
                ..Default::default()
            },
            vuln: Some("default-certificate".to_string()),
            severity: Some("low".to_string()),
            ..Default::default()
        });

        let content = Content::http(b"HTTP/1.1 200 OK\r\n\r\n", "CN=FGT60E, O=Fortinet Ltd.");
        let (_, vuln) = signature.match_one(&content, 0, None).unwrap();
        let vuln = vuln.unwrap();
        assert_eq!(vuln.name, "default-certificate");
        assert_eq!(vuln.severity.as_deref(), Some("low"));
        assert_eq!(vuln.framework, "nginx");
    }

    #[test]
    fn test_socket_rejects_cert_patterns() {
        let definition = SignatureDefinition::new("ssh", Protocol::Tcp).with_rule(RuleDefinition {
            regexps: Regexps {
                cert: vec!["x".to_string()],
                ..Default::default()
            },
            ..Default::default()
        });
        assert!(Signature::compile(&definition, true, "fingerprint").is_err());
        assert!(Signature::compile(&definition, false, "fingerprint").is_ok());
    }

    #[test]
    fn test_invalid_regex_names_signature() {
        let definition =
            SignatureDefinition::new("broken", Protocol::Http).with_rule(RuleDefinition {
                regexps: Regexps {
                    regexp: vec!["(unclosed".to_string()],
                    ..Default::default()
                },
                ..Default::default()
            });
        let err = Signature::compile(&definition, false, "fingerprint").unwrap_err();
        match err {
            FingerprintError::SignatureCompile { name, reason } => {
                assert_eq!(name, "broken");
                assert!(reason.starts_with("invalid regex '(unclosed'"));
            }
            other => panic!("Expected SignatureCompile, got {other:?}"),
        }
    }

    #[test]
    fn test_base64_probe_payload() {
        let definition = SignatureDefinition::new("rdp", Protocol::Tcp).with_rule(RuleDefinition {
            regexps: Regexps {
                body: vec!["\u{3}\u{0}".to_string()],
                ..Default::default()
            },
            send_data_base64: Some("AwAACw==".to_string()),
            ..Default::default()
        });
        let signature = Signature::compile(&definition, true, "fingerprint").unwrap();
        assert!(signature.is_active());

        let seen = std::sync::Mutex::new(Vec::new());
        let sender: &Sender<'_> = &|probe: &Probe| {
            seen.lock().unwrap().push(probe.payload.clone());
            Ok(vec![3, 0, 0, 11])
        };
        assert!(signature.match_one(&Content::socket(b""), 1, Some(sender)).is_some());
        assert_eq!(seen.lock().unwrap()[0], vec![3, 0, 0, 11]);
    }

    #[test]
    fn test_invalid_base64_rejected() {
        let definition = SignatureDefinition::new("rdp", Protocol::Tcp).with_rule(RuleDefinition {
            send_data_base64: Some("***".to_string()),
            ..Default::default()
        });
        assert!(matches!(
            Signature::compile(&definition, true, "fingerprint"),
            Err(FingerprintError::SignatureCompile { ref name, ref reason })
                if name == "rdp" && reason.starts_with("invalid probe payload")
        ));
    }

    #[test]
    fn test_probe_respects_level_and_sender() {
        let rule = RuleDefinition::body(["+PONG"]).with_probe("PING\r\n", 2);
        let definition = SignatureDefinition::new("redis", Protocol::Tcp).with_rule(rule);
        let signature = Signature::compile(&definition, true, "fingerprint").unwrap();

        let calls = AtomicUsize::new(0);
        let sender: &Sender<'_> = &|_probe: &Probe| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"+PONG\r\n".to_vec())
        };
        let banner = Content::socket(b"");

        assert!(signature.match_one(&banner, 2, None).is_none());
        assert!(signature.match_one(&banner, 1, Some(sender)).is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(signature.match_one(&banner, 2, Some(sender)).is_some());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_probe_errors_are_not_matches() {
        let rule = RuleDefinition::body(["+PONG"]).with_probe("PING\r\n", 1);
        let definition = SignatureDefinition::new("redis", Protocol::Tcp).with_rule(rule);
        let signature = Signature::compile(&definition, true, "fingerprint").unwrap();

        let sender: &Sender<'_> = &|_probe: &Probe| Err(anyhow::anyhow!("connection reset"));
        assert!(signature.match_one(&Content::socket(b""), 1, Some(sender)).is_none());
    }

    #[test]
    fn test_match_active_skips_passive_rules() {
        let definition = SignatureDefinition::new("catch-all", Protocol::Http)
            .with_rule(RuleDefinition {
                regexps: Regexps {
                    regexp: vec![".*".to_string()],
                    ..Default::default()
                },
                ..Default::default()
            });
        let signature = Signature::compile(&definition, false, "fingerprint").unwrap();
        let sender: &Sender<'_> = &|_probe: &Probe| Ok(Vec::new());
        assert!(signature.match_active(5, sender).is_none());
    }

    #[test]
    fn test_favicon_only_rule_never_matches_content() {
        let signature = http_signature(RuleDefinition::default().with_favicon(&["abc"], &["123"]));
        assert!(signature.has_favicons());
        assert!(signature
            .match_one(&Content::http(b"anything", ""), 0, None)
            .is_none());
    }
}
