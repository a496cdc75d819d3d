//! Ordered collections of compiled signatures.

use super::compiled::Signature;
use super::content::Content;
use super::types::{Callback, Sender};
use crate::error::Result;
use crate::framework::{Framework, Frameworks, Vuln, Vulns};
use crate::ports::{expand_specs, PortTable, WILDCARD_PORT};
use rayon::prelude::*;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

/// Declaration-ordered collection of shared signatures.
///
/// Signatures are reference counted, so subsets (active-eligible HTTP
/// signatures, port groups) share members with the full collection.
#[derive(Debug, Clone, Default)]
pub struct SignatureSet {
    signatures: Vec<Arc<Signature>>,
}

impl SignatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, signature: Arc<Signature>) {
        self.signatures.push(signature);
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Signature>> {
        self.signatures.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.signatures.iter().map(|s| s.name())
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Signature>> {
        self.signatures.iter().find(|s| s.name() == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Members with at least one probe rule.
    pub fn active_subset(&self) -> SignatureSet {
        self.signatures
            .iter()
            .filter(|s| s.is_active())
            .cloned()
            .collect()
    }

    /// Evaluate every member against static content, without probing.
    pub fn passive_match(&self, content: &Content, stop_at_first: bool) -> (Frameworks, Vulns) {
        self.scan(
            |signature| signature.match_one(content, 0, None),
            None,
            stop_at_first,
        )
    }

    /// Parallel all-matches variant of [`passive_match`](Self::passive_match).
    /// Results keep declaration order.
    pub fn par_passive_match(&self, content: &Content) -> (Frameworks, Vulns) {
        let hits: Vec<(Framework, Option<Vuln>)> = self
            .signatures
            .par_iter()
            .filter_map(|signature| signature.match_one(content, 0, None))
            .collect();
        collect_hits(hits)
    }

    /// Evaluate the probe rules of every member through `sender`, streaming
    /// each hit through `callback`.
    pub fn active_match(
        &self,
        level: u8,
        sender: &Sender<'_>,
        callback: Option<&Callback<'_>>,
        stop_at_first: bool,
    ) -> (Frameworks, Vulns) {
        self.scan(
            |signature| signature.match_active(level, sender),
            callback,
            stop_at_first,
        )
    }

    /// Evaluate passive and (level permitting) probe rules of each member
    /// whose name is not yet in `attempted`, stopping at the first hit.
    /// Every evaluated name is recorded in `attempted`; `callback` sees the
    /// hit.
    pub fn first_match<'s>(
        &'s self,
        content: &Content,
        level: u8,
        sender: Option<&Sender<'_>>,
        callback: Option<&Callback<'_>>,
        attempted: &mut HashSet<&'s str>,
    ) -> Option<(Framework, Option<Vuln>)> {
        let (framework, vuln) = self
            .signatures
            .iter()
            .filter(|signature| attempted.insert(signature.name()))
            .find_map(|signature| signature.match_one(content, level, sender))?;
        if let Some(callback) = callback {
            callback(&framework, vuln.as_ref());
        }
        Some((framework, vuln))
    }

    fn scan<F>(
        &self,
        mut evaluate: F,
        callback: Option<&Callback<'_>>,
        stop_at_first: bool,
    ) -> (Frameworks, Vulns)
    where
        F: FnMut(&Signature) -> Option<(Framework, Option<Vuln>)>,
    {
        let mut frameworks = Frameworks::new();
        let mut vulns = Vulns::new();
        for signature in &self.signatures {
            if let Some((framework, vuln)) = evaluate(signature.as_ref()) {
                if let Some(callback) = callback {
                    callback(&framework, vuln.as_ref());
                }
                frameworks.add(framework);
                if let Some(vuln) = vuln {
                    vulns.add(vuln);
                }
                if stop_at_first {
                    break;
                }
            }
        }
        (frameworks, vulns)
    }

    /// Partition members by declared port. Members without ports land in the
    /// wildcard group `"0"`. Port names are resolved through `table`.
    pub fn group_by_port(&self, table: Option<&PortTable>) -> Result<PortGroups> {
        let mut groups = PortGroups::new();
        for signature in &self.signatures {
            groups.insert(signature.clone(), table)?;
        }
        Ok(groups)
    }
}

fn collect_hits(hits: Vec<(Framework, Option<Vuln>)>) -> (Frameworks, Vulns) {
    let mut frameworks = Frameworks::new();
    let mut vulns = Vulns::new();
    for (framework, vuln) in hits {
        frameworks.add(framework);
        if let Some(vuln) = vuln {
            vulns.add(vuln);
        }
    }
    (frameworks, vulns)
}

impl FromIterator<Arc<Signature>> for SignatureSet {
    fn from_iter<I: IntoIterator<Item = Arc<Signature>>>(iter: I) -> Self {
        Self {
            signatures: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a SignatureSet {
    type Item = &'a Arc<Signature>;
    type IntoIter = std::slice::Iter<'a, Arc<Signature>>;

    fn into_iter(self) -> Self::IntoIter {
        self.signatures.iter()
    }
}

/// Socket signatures partitioned by port, iterated in port-key order.
#[derive(Debug, Clone, Default)]
pub struct PortGroups {
    groups: BTreeMap<String, SignatureSet>,
}

impl PortGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a signature to every group its port specs expand to.
    ///
    /// The expansion is computed before anything is inserted, so an invalid
    /// port spec leaves the groups unchanged.
    pub fn insert(&mut self, signature: Arc<Signature>, table: Option<&PortTable>) -> Result<()> {
        let mut ports = expand_specs(signature.ports(), table)?;
        if ports.is_empty() {
            ports.push(WILDCARD_PORT.to_string());
        }
        for port in ports {
            self.groups.entry(port).or_default().push(signature.clone());
        }
        Ok(())
    }

    pub fn get(&self, port: &str) -> Option<&SignatureSet> {
        self.groups.get(port)
    }

    pub fn wildcard(&self) -> Option<&SignatureSet> {
        self.groups.get(WILDCARD_PORT)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SignatureSet)> {
        self.groups.iter().map(|(port, set)| (port.as_str(), set))
    }

    pub fn ports(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    /// Number of port groups.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signature::definition::{Protocol, RuleDefinition, SignatureDefinition};
    use crate::signature::types::Probe;
    use std::sync::Mutex;

    fn http(name: &str, literal: &str) -> Arc<Signature> {
        let definition = SignatureDefinition::new(name, Protocol::Http)
            .with_rule(RuleDefinition::body([literal]));
        Arc::new(Signature::compile(&definition, false, "fingerprint").unwrap())
    }

    fn tcp(name: &str, ports: &[&str]) -> Arc<Signature> {
        let definition = SignatureDefinition::new(name, Protocol::Tcp)
            .with_ports(ports.iter().copied())
            .with_rule(RuleDefinition::body([name]));
        Arc::new(Signature::compile(&definition, true, "fingerprint").unwrap())
    }

    #[test]
    fn test_passive_match_all_and_first() {
        let set: SignatureSet = vec![
            http("wordpress", "wp-content"),
            http("php", "wp-content"),
            http("drupal", "drupal"),
        ]
        .into_iter()
        .collect();
        let content = Content::http(b"HTTP/1.1 200 OK\r\n\r\n<link href=/wp-content/x.css>", "");

        let (frameworks, _) = set.passive_match(&content, false);
        assert_eq!(frameworks.names(), vec!["wordpress", "php"]);

        let (frameworks, _) = set.passive_match(&content, true);
        assert_eq!(frameworks.names(), vec!["wordpress"]);
    }

    #[test]
    fn test_par_passive_match_keeps_order() {
        let set: SignatureSet = (0..64)
            .map(|i| http(&format!("sig-{i:02}"), "marker"))
            .collect();
        let content = Content::http(b"marker", "");

        let (sequential, _) = set.passive_match(&content, false);
        let (parallel, _) = set.par_passive_match(&content);
        assert_eq!(sequential, parallel);
        assert_eq!(parallel.len(), 64);
    }

    #[test]
    fn test_active_match_streams_callback() {
        let jenkins = SignatureDefinition::new("jenkins", Protocol::Http).with_rule(
            RuleDefinition::body(["X-Jenkins"]).with_probe("GET /login HTTP/1.1\r\n\r\n", 1),
        );
        let set: SignatureSet = vec![
            Arc::new(Signature::compile(&jenkins, false, "fingerprint").unwrap()),
            http("static", "never"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.active_subset().len(), 1);

        let sender: &Sender<'_> =
            &|_probe: &Probe| Ok(b"HTTP/1.1 200 OK\r\n\r\nX-Jenkins: 2.4".to_vec());
        let streamed = Mutex::new(Vec::new());
        let callback: &Callback<'_> = &|framework: &Framework, _vuln: Option<&Vuln>| {
            streamed.lock().unwrap().push(framework.name.clone());
        };

        let (frameworks, _) = set.active_match(1, sender, Some(callback), false);
        assert_eq!(frameworks.names(), vec!["jenkins"]);
        assert_eq!(*streamed.lock().unwrap(), vec!["jenkins".to_string()]);
    }

    #[test]
    fn test_group_by_port() {
        let set: SignatureSet = vec![
            tcp("ssh", &["22"]),
            tcp("generic", &[]),
            tcp("web", &["80", "8080"]),
        ]
        .into_iter()
        .collect();
        let groups = set.group_by_port(None).unwrap();

        assert_eq!(groups.ports().collect::<Vec<_>>(), vec!["0", "22", "80", "8080"]);
        assert!(groups.wildcard().unwrap().contains("generic"));
        assert!(groups.get("8080").unwrap().contains("web"));
        assert!(groups.get("443").is_none());
    }

    #[test]
    fn test_group_by_port_with_table() {
        let table = PortTable::from_yaml("- name: db\n  ports: [\"3306\", \"5432\"]\n").unwrap();
        let set: SignatureSet = vec![tcp("database", &["db"])].into_iter().collect();

        let groups = set.group_by_port(Some(&table)).unwrap();
        assert_eq!(groups.ports().collect::<Vec<_>>(), vec!["3306", "5432"]);
        assert!(set.group_by_port(None).is_err());
    }
}
