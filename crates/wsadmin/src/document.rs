//! WebSphere configuration documents
//!
//! Documents are read-only snapshots of the cell configuration. They are
//! parsed into an owned element tree keyed by local names, so callers never
//! deal with the `xmi:`/`resources.jdbc:` namespace prefixes.
//!
//! Some documents carry large foreign payloads (base64 keystores, XML dumped
//! into attribute values). Attributes and elements whose names end with an
//! ignored suffix are cut out of the raw text before parsing.

use crate::error::{Error, Result};
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};

/// Name suffixes always stripped before parsing
pub const DEFAULT_IGNORE_SUFFIXES: &[&str] = &["Blob", "Binary", "Bytes"];

/// One parsed element
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    /// Local element name (namespace prefix dropped)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute value by local name
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Direct text content, trimmed
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// First direct child with the given local name
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given local name
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// This element and everything below it, in document order
    fn descendants(&self) -> Vec<&Element> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.descendants());
        }
        out
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let text: String = node
            .children()
            .filter(roxmltree::Node::is_text)
            .filter_map(|n| n.text())
            .collect();

        Self {
            name: node.tag_name().name().to_string(),
            attributes: node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            text: text.trim().to_string(),
            children: node
                .children()
                .filter(roxmltree::Node::is_element)
                .map(Self::from_node)
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Predicate {
    Attr(String, String),
    ChildText(String, String),
}

/// One level of a document query: a local element name plus predicates
///
/// `"*"` matches any element name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    name: String,
    predicates: Vec<Predicate>,
}

impl Step {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            predicates: Vec::new(),
        }
    }

    /// Require `[@name='value']`
    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.predicates
            .push(Predicate::Attr(name.to_string(), value.to_string()));
        self
    }

    /// Require `[child='text']`
    pub fn child_text(mut self, child: &str, text: &str) -> Self {
        self.predicates
            .push(Predicate::ChildText(child.to_string(), text.to_string()));
        self
    }

    fn matches(&self, element: &Element) -> bool {
        (self.name == "*" || self.name == element.name)
            && self.predicates.iter().all(|p| match p {
                Predicate::Attr(k, v) => element.attr(k) == Some(v.as_str()),
                Predicate::ChildText(k, v) => element.children_named(k).any(|c| c.text == *v),
            })
    }
}

/// A parsed configuration document
#[derive(Debug, Clone)]
pub struct ConfigDocument {
    path: PathBuf,
    root: Element,
}

impl ConfigDocument {
    /// Open and parse a document.
    ///
    /// A missing file is `Ok(None)`: the object simply does not exist yet.
    /// `ignore_suffixes` extends [`DEFAULT_IGNORE_SUFFIXES`].
    pub fn open(path: &Path, ignore_suffixes: &[String]) -> Result<Option<Self>> {
        if !path.exists() {
            log::debug!("{} does not exist, treating as absent", path.display());
            return Ok(None);
        }

        log::debug!("reading {}", path.display());
        let raw = fs::read_to_string(path)?;
        Self::parse(path, &raw, ignore_suffixes).map(Some)
    }

    /// Parse document text that was already read
    pub fn parse(path: &Path, raw: &str, ignore_suffixes: &[String]) -> Result<Self> {
        let suffixes: Vec<&str> = DEFAULT_IGNORE_SUFFIXES
            .iter()
            .copied()
            .chain(ignore_suffixes.iter().map(String::as_str))
            .filter(|s| !s.is_empty())
            .collect();
        let text = strip_blobs(raw, &suffixes);

        let doc = roxmltree::Document::parse(&text).map_err(|e| Error::Malformed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self {
            path: path.to_path_buf(),
            root: Element::from_node(doc.root_element()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    /// First element matching an N-level query.
    ///
    /// The first step matches at any depth; each following step matches
    /// a direct child of the previous match.
    pub fn find(&self, path: &[Step]) -> Option<&Element> {
        let (first, rest) = path.split_first()?;
        self.root
            .descendants()
            .into_iter()
            .filter(|e| first.matches(e))
            .find_map(|e| resolve(e, rest))
    }

    /// Every element matching an N-level query, in document order
    pub fn find_all(&self, path: &[Step]) -> Vec<&Element> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };
        let mut out = Vec::new();
        for element in self.root.descendants() {
            if first.matches(element) {
                resolve_all(element, rest, &mut out);
            }
        }
        out
    }

    /// Fixed-depth lookup: section, then element, then one attribute
    pub fn lookup(&self, section: Step, element: Step, attribute: &str) -> Option<&str> {
        self.find(&[section, element])?.attr(attribute)
    }
}

fn resolve<'e>(element: &'e Element, rest: &[Step]) -> Option<&'e Element> {
    match rest.split_first() {
        None => Some(element),
        Some((step, tail)) => element
            .children
            .iter()
            .filter(|c| step.matches(c))
            .find_map(|c| resolve(c, tail)),
    }
}

fn resolve_all<'e>(element: &'e Element, rest: &[Step], out: &mut Vec<&'e Element>) {
    match rest.split_first() {
        None => out.push(element),
        Some((step, tail)) => {
            for child in element.children.iter().filter(|c| step.matches(c)) {
                resolve_all(child, tail, out);
            }
        }
    }
}

/// Cut attributes and elements named `*<suffix>` out of raw XML text.
///
/// Attributes are only removed from inside start tags, so text and other
/// attribute values that merely mention a blob name are left alone.
fn strip_blobs(raw: &str, suffixes: &[&str]) -> String {
    if suffixes.is_empty() {
        return raw.to_string();
    }
    let Ok(attribute) = Regex::new(r#"\s+([\w:.\-]+)\s*=\s*(?:"[^"]*"|'[^']*')"#) else {
        log::warn!("attribute pattern failed to compile, parsing unfiltered");
        return raw.to_string();
    };
    let ignored = |name: &str| suffixes.iter().any(|s| name.ends_with(s));

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    let mut attrs_removed = 0usize;
    let mut elements_removed = 0usize;
    while let Some((piece, tail)) = next_piece(rest) {
        match piece {
            Piece::Start {
                name, empty: false, ..
            } if ignored(name) => {
                elements_removed += 1;
                match element_end(tail, name) {
                    Some(end) => rest = &tail[end..],
                    None => {
                        // Unterminated; leave it to the parser to report
                        out.push_str(rest);
                        rest = "";
                    }
                }
                continue;
            }
            Piece::Start { name, .. } if ignored(name) => elements_removed += 1,
            Piece::Start { tag, .. } => {
                let mut kept = 0;
                for caps in attribute.captures_iter(tag) {
                    let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                        continue;
                    };
                    if ignored(name.as_str()) {
                        out.push_str(&tag[kept..whole.start()]);
                        kept = whole.end();
                        attrs_removed += 1;
                    }
                }
                out.push_str(&tag[kept..]);
            }
            Piece::Other(text) => out.push_str(text),
        }
        rest = tail;
    }

    log::trace!("stripped {attrs_removed} blob attributes and {elements_removed} blob elements");
    out
}

/// One lexical piece of raw XML
enum Piece<'a> {
    /// `<name ...>` or `<name .../>`
    Start {
        name: &'a str,
        tag: &'a str,
        empty: bool,
    },
    /// Text, end tags, comments, CDATA and declarations, copied through
    Other(&'a str),
}

/// Split the next piece off the front of `raw`
fn next_piece(raw: &str) -> Option<(Piece<'_>, &str)> {
    if raw.is_empty() {
        return None;
    }

    let verbatim = [("<!--", "-->"), ("<![CDATA[", "]]>"), ("<?", "?>")]
        .iter()
        .find(|(open, _)| raw.starts_with(open));
    let end = if !raw.starts_with('<') {
        raw.find('<').unwrap_or(raw.len())
    } else if let Some((open, close)) = verbatim {
        raw[open.len()..]
            .find(close)
            .map_or(raw.len(), |i| open.len() + i + close.len())
    } else {
        tag_end(raw)
    };

    let (piece, rest) = raw.split_at(end);
    let is_start =
        piece.starts_with('<') && !["</", "<!", "<?"].iter().any(|p| piece.starts_with(p));
    if !is_start {
        return Some((Piece::Other(piece), rest));
    }
    let name_len = piece[1..]
        .find(|c: char| c.is_whitespace() || c == '/' || c == '>')
        .unwrap_or(piece.len() - 1);
    let start = Piece::Start {
        name: &piece[1..=name_len],
        tag: piece,
        empty: piece.ends_with("/>"),
    };
    Some((start, rest))
}

/// Length of the tag opening `raw`, up to the first `>` outside quotes
fn tag_end(raw: &str) -> usize {
    let mut quote = None;
    for (i, c) in raw.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == '>' => return i + 1,
            None => {}
        }
    }
    raw.len()
}

/// Offset just past the end tag closing an element `name` whose start tag
/// precedes `content`. Nested elements of the same name are counted; other
/// content is opaque and may not be XML at all.
fn element_end(content: &str, name: &str) -> Option<usize> {
    let boundary = Regex::new(&format!(r"<(/?){}(?:[\s/][^>]*)?>", regex::escape(name))).ok()?;
    let mut depth = 1usize;
    for caps in boundary.captures_iter(content) {
        let whole = caps.get(0)?;
        if &caps[1] == "/" {
            depth -= 1;
            if depth == 0 {
                return Some(whole.end());
            }
        } else if !whole.as_str().ends_with("/>") {
            depth += 1;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const RESOURCES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xmi:XMI xmi:version="2.0" xmlns:xmi="http://www.omg.org/XMI" xmlns:resources.jdbc="http://www.ibm.com/websphere/appserver/schemas/5.0/resources.jdbc.xmi">
  <resources.jdbc:JDBCProvider xmi:id="JDBCProvider_1" name="Oracle" providerType="Oracle JDBC Driver" implementationClassName="oracle.jdbc.pool.OracleConnectionPoolDataSource" xa="false">
    <classpath>${ORACLE_JDBC_DRIVER_PATH}/ojdbc8.jar</classpath>
    <factories xmi:id="DataSource_1" name="appDS" jndiName="jdbc/app" statementCacheSize="10"/>
    <factories xmi:id="DataSource_2" name="batchDS" jndiName="jdbc/batch"/>
  </resources.jdbc:JDBCProvider>
  <resources.jdbc:JDBCProvider xmi:id="JDBCProvider_2" name="Derby" providerType="Derby JDBC Provider"/>
</xmi:XMI>
"#;

    fn parse(text: &str) -> ConfigDocument {
        ConfigDocument::parse(Path::new("resources.xml"), text, &[]).unwrap()
    }

    #[test]
    fn test_missing_file_is_absent() {
        let dir = TempDir::new().unwrap();
        let doc = ConfigDocument::open(&dir.path().join("resources.xml"), &[]).unwrap();
        assert!(doc.is_none());
    }

    #[test]
    fn test_malformed_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("resources.xml");
        fs::write(&path, "<xmi:XMI><unclosed></xmi:XMI>").unwrap();
        assert!(matches!(
            ConfigDocument::open(&path, &[]),
            Err(Error::Malformed { .. })
        ));
    }

    #[test]
    fn test_local_names_and_attributes() {
        let doc = parse(RESOURCES);
        assert_eq!(doc.root().name(), "XMI");
        let provider = doc
            .find(&[Step::new("JDBCProvider").attr("name", "Oracle")])
            .unwrap();
        assert_eq!(provider.attr("id"), Some("JDBCProvider_1"));
        assert_eq!(
            provider.child("classpath").map(Element::text),
            Some("${ORACLE_JDBC_DRIVER_PATH}/ojdbc8.jar")
        );
    }

    #[test]
    fn test_n_level_find() {
        let doc = parse(RESOURCES);
        let ds = doc
            .find(&[
                Step::new("JDBCProvider").attr("name", "Oracle"),
                Step::new("factories").attr("name", "batchDS"),
            ])
            .unwrap();
        assert_eq!(ds.attr("jndiName"), Some("jdbc/batch"));

        // Later steps only match direct children
        assert!(doc
            .find(&[Step::new("XMI"), Step::new("factories")])
            .is_none());
    }

    #[test]
    fn test_three_level_lookup() {
        let doc = parse(RESOURCES);
        assert_eq!(
            doc.lookup(
                Step::new("JDBCProvider").attr("name", "Oracle"),
                Step::new("factories").attr("name", "appDS"),
                "statementCacheSize"
            ),
            Some("10")
        );
        assert_eq!(
            doc.lookup(
                Step::new("JDBCProvider").attr("name", "Derby"),
                Step::new("factories"),
                "name"
            ),
            None
        );
    }

    #[test]
    fn test_first_match_wins_and_find_all_sees_every_match() {
        let doc = parse(RESOURCES);
        let first = doc.find(&[Step::new("factories")]).unwrap();
        assert_eq!(first.attr("name"), Some("appDS"));
        assert_eq!(doc.find_all(&[Step::new("JDBCProvider")]).len(), 2);
        assert_eq!(
            doc.find_all(&[Step::new("*"), Step::new("factories")]).len(),
            2
        );
    }

    #[test]
    fn test_child_text_predicate() {
        let doc = parse(
            r#"<Security><entries><name>alice</name><role>admin</role></entries><entries><name>bob</name><role>monitor</role></entries></Security>"#,
        );
        let entry = doc
            .find(&[Step::new("entries").child_text("name", "bob")])
            .unwrap();
        assert_eq!(entry.child("role").map(Element::text), Some("monitor"));
    }

    #[test]
    fn test_blobs_are_stripped_before_parsing() {
        // The blob attribute value would break the parser (unescaped '<')
        let raw = r#"<Server name="s1" keystoreBlob="<<binary>>" >
  <serializedBlob encoding="base64">PD94bWwgdmVyc2lvbj0iMS4wIj8+<not-xml</serializedBlob>
  <dumpData/>
  <jvm maxHeap="512"/>
</Server>"#;
        let doc =
            ConfigDocument::parse(Path::new("server.xml"), raw, &["Data".to_string()]).unwrap();
        assert!(doc.root().attr("keystoreBlob").is_none());
        assert!(doc.root().child("serializedBlob").is_none());
        assert!(doc.root().child("dumpData").is_none());
        assert_eq!(doc.find(&[Step::new("jvm")]).unwrap().attr("maxHeap"), Some("512"));
    }

    #[test]
    fn test_blob_names_in_values_and_text_are_kept() {
        let raw = r#"<Server note="see fooBlob='x' here" certBlob='abc'>
  <description>keyBlob="abc" is legacy</description>
</Server>"#;
        let doc = ConfigDocument::parse(Path::new("server.xml"), raw, &[]).unwrap();
        assert_eq!(doc.root().attr("note"), Some("see fooBlob='x' here"));
        assert!(doc.root().attr("certBlob").is_none());
        assert_eq!(
            doc.root().child("description").map(Element::text),
            Some(r#"keyBlob="abc" is legacy"#)
        );
    }

    #[test]
    fn test_nested_blob_elements_are_skipped_whole() {
        let raw = r#"<Security>
  <dataBlob><dataBlob>inner</dataBlob><dataBlob/>tail<x</dataBlob>
  <!-- <dataBlob> in a comment -->
  <user name="alice"/>
</Security>"#;
        let doc = ConfigDocument::parse(Path::new("security.xml"), raw, &[]).unwrap();
        let names: Vec<&str> = doc.root().children().iter().map(Element::name).collect();
        assert_eq!(names, ["user"]);
    }

    #[test]
    fn test_unfiltered_blob_is_malformed() {
        let raw = r#"<Server><payload><not-xml</payload></Server>"#;
        assert!(ConfigDocument::parse(Path::new("server.xml"), raw, &[]).is_err());
        let doc =
            ConfigDocument::parse(Path::new("server.xml"), raw, &["payload".to_string()]).unwrap();
        assert!(doc.root().children().is_empty());
    }
}
