//! End-to-end tests over the embedded data sets and custom resources.

use fingerprint_engine::signature::{load_signatures_json, Regexps};
use fingerprint_engine::{
    Detector, EngineConfig, FingerprintError, MatchOrchestrator, Protocol, Resources,
    RuleDefinition, SignatureDefinition,
};
use std::io::Write;

#[test]
fn test_layered_http_response_matches_every_signature() {
    let engine = MatchOrchestrator::with_defaults().unwrap();
    let response = b"HTTP/1.1 200 OK\r\n\
        Server: nginx/1.24.0\r\n\
        X-Powered-By: PHP/8.1.27\r\n\r\n\
        <html><head><meta name=\"generator\" content=\"WordPress 6.4.2\" />\
        <link rel=stylesheet href=\"/wp-content/themes/x/style.css\"></head></html>";

    let (frameworks, vulns) = engine.http_match(response, "");
    assert_eq!(frameworks.names(), vec!["nginx", "php", "wordpress"]);
    assert_eq!(frameworks.get("nginx").unwrap().version.as_deref(), Some("1.24.0"));
    assert_eq!(frameworks.get("php").unwrap().version.as_deref(), Some("8.1.27"));
    assert_eq!(frameworks.get("wordpress").unwrap().version.as_deref(), Some("6.4.2"));
    assert!(frameworks.get("wordpress").unwrap().focus);
    assert!(vulns.is_empty());
}

#[test]
fn test_no_match_is_empty_not_error() {
    let engine = MatchOrchestrator::with_defaults().unwrap();
    let (frameworks, vulns) = engine.http_match(b"HTTP/1.1 404 Not Found\r\n\r\n", "");
    assert!(frameworks.is_empty());
    assert!(vulns.is_empty());
    assert!(engine.match_content(b"").is_empty());
}

#[test]
fn test_bare_body_with_blank_line_matches() {
    let engine = MatchOrchestrator::with_defaults().unwrap();
    let page = b"<link href=\"/wp-content/themes/x.css\">\n\n<body></body>";
    assert!(engine.match_content(page).contains("wordpress"));
}

#[test]
fn test_certificate_text_matches() {
    let engine = MatchOrchestrator::with_defaults().unwrap();
    let (frameworks, _) = engine.http_match(
        b"HTTP/1.1 200 OK\r\n\r\n",
        "C=US, O=Fortinet, OU=FortiGate, CN=FG100F",
    );
    assert_eq!(frameworks.names(), vec!["fortinet-fortigate"]);

    // Certificate patterns never look at the response itself.
    let (frameworks, _) = engine.http_match(b"HTTP/1.1 200 OK\r\n\r\nO=Fortinet", "");
    assert!(frameworks.is_empty());
}

#[test]
fn test_embedded_favicon_hashes() {
    let engine = MatchOrchestrator::with_defaults().unwrap();
    assert_eq!(
        engine.favicon_match("", "945408572").unwrap().name,
        "fortinet-fortigate"
    );
    assert_eq!(
        engine
            .favicon_match("2e2d5a5e4e0b6a8c06a8c0bd0fd6ba0b", "")
            .unwrap()
            .name,
        "grafana"
    );
    assert!(engine.favicon_match("", "").is_none());
}

#[test]
fn test_favicon_collision_resolves_to_last_declared() {
    let shared = |name: &str| {
        SignatureDefinition::new(name, Protocol::Http)
            .with_rule(RuleDefinition::default().with_favicon(&["d41d8cd9"], &["116323821"]))
    };
    let engine = MatchOrchestrator::new(
        vec![shared("first"), shared("second"), shared("third")],
        None,
        None,
        EngineConfig::default(),
    )
    .unwrap();

    assert_eq!(engine.favicon_match("d41d8cd9", "").unwrap().name, "third");
    assert_eq!(engine.favicon_match("", "116323821").unwrap().name, "third");
}

#[test]
fn test_passive_match_sends_no_probes() {
    let engine = MatchOrchestrator::with_defaults().unwrap();
    // The actuator rule only matches its probe response.
    let body = br#"HTTP/1.1 200 OK

{"_links":{"self":{"href":"http://t/actuator"}}}"#;
    let (frameworks, _) = engine.http_match(body, "");
    assert!(!frameworks.contains("spring-boot-actuator"));
}

#[test]
fn test_match_results_serialize() {
    let engine = MatchOrchestrator::with_defaults().unwrap();
    let (frameworks, _) = engine.http_match(b"HTTP/1.1 200 OK\r\nServer: nginx/1.25.3\r\n\r\n", "");

    let json = serde_json::to_value(&frameworks).unwrap();
    assert_eq!(
        json,
        serde_json::json!([{
            "name": "nginx",
            "from": "fingerprint",
            "version": "1.25.3",
            "tags": ["web-server"],
            "focus": false
        }])
    );
}

#[test]
fn test_json_signature_definitions() {
    let json = br#"[
        {"name": "traefik", "rule": [{"regexps": {"body": ["traefik-dashboard"]}}]},
        {"name": "mqtt", "protocol": "tcp", "default_port": ["1883"],
         "rule": [{"send_data_base64": "EAwABE1RVFQEAgA8AAA=", "regexps": {"body": [" "]}}]}
    ]"#;
    let definitions = load_signatures_json(json).unwrap();
    assert_eq!(definitions[1].protocol, Protocol::Tcp);

    let (http, socket): (Vec<_>, Vec<_>) = definitions
        .into_iter()
        .partition(|d| !d.protocol.is_socket());
    let engine = MatchOrchestrator::new(http, Some(socket), None, EngineConfig::default()).unwrap();

    assert!(engine.match_content(b"<div id=traefik-dashboard>").contains("traefik"));
    assert!(engine.socket_signatures().get("mqtt").unwrap().is_active());
    assert_eq!(engine.port_groups().ports().collect::<Vec<_>>(), vec!["1883"]);
}

#[test]
fn test_resources_from_files() {
    let mut http = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        http,
        r#"
- name: intranet
  rule:
    - regexps:
        body: ["ACME Intranet"]
"#
    )
    .unwrap();

    let mut ports = tempfile::NamedTempFile::new().unwrap();
    writeln!(ports, "- name: admin\n  ports: [\"9000-9002\"]").unwrap();

    let mut socket = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        socket,
        r#"
- name: admin-console
  protocol: tcp
  default_port: [admin]
  rule:
    - regexps:
        body: ["ACME console ready"]
"#
    )
    .unwrap();

    let resources = Resources::embedded()
        .with_http_file(http.path())
        .unwrap()
        .with_socket_file(socket.path())
        .unwrap()
        .with_ports_file(ports.path())
        .unwrap();
    let engine = MatchOrchestrator::with_resources(&resources, EngineConfig::default()).unwrap();

    assert_eq!(engine.http_signatures().len(), 1);
    assert!(engine.match_content(b"<h1>ACME Intranet</h1>").contains("intranet"));
    assert_eq!(
        engine.port_groups().ports().collect::<Vec<_>>(),
        vec!["9000", "9001", "9002"]
    );
    let (framework, _) = engine
        .socket_match(b"ACME console ready\r\n", "9001", 0, None, None)
        .unwrap();
    assert_eq!(framework.name, "admin-console");
}

#[test]
fn test_construction_errors() {
    let empty = Resources::embedded().with_http("");
    assert_eq!(
        MatchOrchestrator::with_resources(&empty, EngineConfig::default()).unwrap_err(),
        FingerprintError::MissingHttpSignatures
    );

    let unresolved_port = Resources::embedded().without_ports();
    assert!(matches!(
        MatchOrchestrator::with_resources(&unresolved_port, EngineConfig::default()),
        Err(FingerprintError::InvalidPort(_))
    ));

    let bad_regex = Resources::embedded().with_http(
        r#"
- name: broken
  rule:
    - regexps:
        regexp: ["(unclosed"]
"#,
    );
    assert!(matches!(
        MatchOrchestrator::with_resources(&bad_regex, EngineConfig::default()),
        Err(FingerprintError::SignatureCompile { .. })
    ));
}

#[test]
fn test_custom_namespace_stamped_on_identities() {
    let engine = MatchOrchestrator::with_resources(
        &Resources::embedded(),
        EngineConfig::default().with_namespace("recon"),
    )
    .unwrap();
    assert_eq!(engine.name(), "recon");

    let frameworks = engine.match_content(b"HTTP/1.1 200 OK\r\nServer: nginx\r\n\r\n");
    assert_eq!(frameworks.one().unwrap().from, "recon");
}

#[test]
fn test_concurrent_matching_after_compile() {
    let engine = MatchOrchestrator::with_defaults().unwrap();
    let response: &[u8] = b"HTTP/1.1 200 OK\r\nServer: Microsoft-IIS/10.0\r\n\r\n";
    let expected = engine.http_match(response, "");

    std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let http = engine.http_match(response, "");
                    let banner: &[u8] = b"-NOAUTH Authentication required.";
                    let socket = engine.socket_match(banner, "", 0, None, None);
                    (http, socket.map(|(framework, _)| framework.name))
                })
            })
            .collect();

        for handle in handles {
            let (http, socket) = handle.join().unwrap();
            assert_eq!(http, expected);
            assert_eq!(socket.as_deref(), Some("redis"));
        }
    });
}

#[test]
fn test_detector_end_to_end() {
    let detector = Detector::with_defaults().unwrap();

    let (frameworks, _) = detector.http_match(
        b"HTTP/1.1 200 OK\r\nServer: Apache/2.4.58 (Unix)\r\n\r\n<html></html>",
        "",
    );
    let apache = frameworks.one().unwrap();
    assert_eq!(apache.name, "apache-httpd");
    assert_eq!(apache.version.as_deref(), Some("2.4.58"));
    assert_eq!(apache.vendor.as_deref(), Some("apache"));
    assert_eq!(apache.product.as_deref(), Some("http_server"));

    let record = detector.resolve_any("Apache-Web-Server").unwrap();
    assert_eq!(record.name, "apache-httpd");
}

#[test]
fn test_cert_patterns_rejected_for_socket_definitions() {
    let socket = SignatureDefinition::new("tls-thing", Protocol::Tcp).with_rule(RuleDefinition {
        regexps: Regexps {
            cert: vec!["CN=thing".to_string()],
            ..Default::default()
        },
        ..Default::default()
    });
    let result = MatchOrchestrator::new(
        vec![SignatureDefinition::new("placeholder", Protocol::Http)
            .with_rule(RuleDefinition::body(["placeholder"]))],
        Some(vec![socket]),
        None,
        EngineConfig::default(),
    );
    assert!(matches!(
        result,
        Err(FingerprintError::SignatureCompile { ref name, .. }) if name == "tls-thing"
    ));
}
