//! ODF package manifest parsing.
//!
//! The manifest (`META-INF/manifest.xml`) lists every package member with its
//! media type. Members declared as `text/xml` are the ones a render pass
//! substitutes data into.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::TemplateError;

/// Member path of the package manifest.
pub const MANIFEST_PATH: &str = "META-INF/manifest.xml";

/// XML namespace of manifest elements and attributes.
pub const MANIFEST_NAMESPACE: &str = "urn:oasis:names:tc:opendocument:xmlns:manifest:1.0";

const XML_MEDIA_TYPE: &str = "text/xml";

/// Namespace bindings declared on one element: `(prefix, uri)`.
///
/// `None` is the default namespace.
type Frame = Vec<(Option<Vec<u8>>, Vec<u8>)>;

/// Return the `full-path` of every `text/xml` file entry, in document order.
///
/// Namespace prefixes are resolved from the document's own `xmlns`
/// declarations, so any prefix bound to [`MANIFEST_NAMESPACE`] matches.
pub fn parse_manifest(data: &[u8]) -> Result<Vec<String>, TemplateError> {
    let mut reader = Reader::from_reader(data);
    let mut scopes: Vec<Frame> = Vec::new();
    let mut paths = Vec::new();
    let mut seen_root = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(malformed)? {
            Event::Start(e) => {
                seen_root = true;
                scopes.push(bindings(&e)?);
                collect_entry(&e, &scopes, &mut paths)?;
            }
            Event::Empty(e) => {
                seen_root = true;
                scopes.push(bindings(&e)?);
                let result = collect_entry(&e, &scopes, &mut paths);
                scopes.pop();
                result?;
            }
            Event::End(_) => {
                scopes.pop();
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !seen_root {
        return Err(TemplateError::MalformedPackage("manifest is empty".to_owned()));
    }
    if !scopes.is_empty() {
        return Err(TemplateError::MalformedPackage(
            "manifest ends inside an open element".to_owned(),
        ));
    }
    Ok(paths)
}

/// Push the entry's `full-path` if `e` is a `text/xml` `file-entry`.
fn collect_entry(
    e: &BytesStart<'_>,
    scopes: &[Frame],
    paths: &mut Vec<String>,
) -> Result<(), TemplateError> {
    let qname = e.name();
    let (prefix, local) = split_qname(qname.as_ref());
    if local != b"file-entry" || !in_manifest_namespace(scopes, prefix) {
        return Ok(());
    }

    let mut media_type = None;
    let mut full_path = None;
    for attr in e.attributes() {
        let attr = attr.map_err(malformed)?;
        let (prefix, local) = split_qname(attr.key.as_ref());
        // Unprefixed attributes carry no namespace.
        if prefix.is_none() || !in_manifest_namespace(scopes, prefix) {
            continue;
        }
        let value = attr.unescape_value().map_err(malformed)?.into_owned();
        match local {
            b"media-type" => media_type = Some(value),
            b"full-path" => full_path = Some(value),
            _ => {}
        }
    }

    if media_type.as_deref() == Some(XML_MEDIA_TYPE) {
        let path = full_path.ok_or_else(|| {
            TemplateError::MalformedPackage("text/xml file-entry without full-path".to_owned())
        })?;
        paths.push(path);
    }
    Ok(())
}

/// Collect the `xmlns` declarations of an element.
fn bindings(e: &BytesStart<'_>) -> Result<Frame, TemplateError> {
    let mut frame = Frame::new();
    for attr in e.attributes() {
        let attr = attr.map_err(malformed)?;
        let key = attr.key.as_ref();
        let prefix = if key == b"xmlns" {
            None
        } else if let Some(name) = key.strip_prefix(b"xmlns:") {
            Some(name.to_vec())
        } else {
            continue;
        };
        frame.push((prefix, attr.value.into_owned()));
    }
    Ok(frame)
}

/// Whether `prefix` resolves to the manifest namespace in the current scope.
fn in_manifest_namespace(scopes: &[Frame], prefix: Option<&[u8]>) -> bool {
    scopes
        .iter()
        .rev()
        .flat_map(|frame| frame.iter().rev())
        .find(|(bound, _)| bound.as_deref() == prefix)
        .is_some_and(|(_, uri)| uri.as_slice() == MANIFEST_NAMESPACE.as_bytes())
}

/// Split a qualified name into prefix and local name.
fn split_qname(name: &[u8]) -> (Option<&[u8]>, &[u8]) {
    match name.iter().position(|&b| b == b':') {
        Some(i) => (Some(&name[..i]), &name[i + 1..]),
        None => (None, name),
    }
}

fn malformed(e: impl std::fmt::Display) -> TemplateError {
    TemplateError::MalformedPackage(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TYPICAL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" manifest:version="1.2">
 <manifest:file-entry manifest:full-path="/" manifest:version="1.2" manifest:media-type="application/vnd.oasis.opendocument.text"/>
 <manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
 <manifest:file-entry manifest:full-path="styles.xml" manifest:media-type="text/xml"/>
 <manifest:file-entry manifest:full-path="meta.xml" manifest:media-type="text/xml"/>
 <manifest:file-entry manifest:full-path="Pictures/logo.png" manifest:media-type="image/png"/>
</manifest:manifest>"#;

    #[test]
    fn test_collects_xml_members_in_order() {
        let paths = parse_manifest(TYPICAL.as_bytes()).unwrap();
        assert_eq!(paths, vec!["content.xml", "styles.xml", "meta.xml"]);
    }

    #[test]
    fn test_other_prefix_bound_to_namespace() {
        let xml = r#"<m:manifest xmlns:m="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
<m:file-entry m:full-path="content.xml" m:media-type="text/xml"></m:file-entry>
</m:manifest>"#;
        assert_eq!(parse_manifest(xml.as_bytes()).unwrap(), vec!["content.xml"]);
    }

    #[test]
    fn test_ignores_entries_in_other_namespace() {
        let xml = r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0" xmlns:x="urn:example">
<x:file-entry x:full-path="evil.xml" x:media-type="text/xml"/>
<manifest:file-entry full-path="plain.xml" media-type="text/xml"/>
<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>
</manifest:manifest>"#;
        assert_eq!(parse_manifest(xml.as_bytes()).unwrap(), vec!["content.xml"]);
    }

    #[test]
    fn test_unescapes_attribute_values() {
        let xml = r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
<manifest:file-entry manifest:full-path="a&amp;b.xml" manifest:media-type="text/xml"/>
</manifest:manifest>"#;
        assert_eq!(parse_manifest(xml.as_bytes()).unwrap(), vec!["a&b.xml"]);
    }

    #[test]
    fn test_no_xml_members() {
        let xml = r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0"/>"#;
        assert!(parse_manifest(xml.as_bytes()).unwrap().is_empty());
    }

    #[test]
    fn test_empty_manifest_is_malformed() {
        assert!(matches!(
            parse_manifest(b""),
            Err(TemplateError::MalformedPackage(_))
        ));
    }

    #[test]
    fn test_unclosed_manifest_is_malformed() {
        let xml = r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
<manifest:file-entry manifest:full-path="content.xml" manifest:media-type="text/xml"/>"#;
        assert!(matches!(
            parse_manifest(xml.as_bytes()),
            Err(TemplateError::MalformedPackage(_))
        ));
    }

    #[test]
    fn test_mismatched_tags_are_malformed() {
        let xml = r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0"></manifest:other>"#;
        assert!(matches!(
            parse_manifest(xml.as_bytes()),
            Err(TemplateError::MalformedPackage(_))
        ));
    }

    #[test]
    fn test_xml_entry_without_full_path_is_malformed() {
        let xml = r#"<manifest:manifest xmlns:manifest="urn:oasis:names:tc:opendocument:xmlns:manifest:1.0">
<manifest:file-entry manifest:media-type="text/xml"/>
</manifest:manifest>"#;
        assert!(matches!(
            parse_manifest(xml.as_bytes()),
            Err(TemplateError::MalformedPackage(_))
        ));
    }
}
