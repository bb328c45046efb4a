//! String-level XMP packet model.
//!
//! XMP is XML, but full XML parsing is out of scope here: the document is
//! held as its packet string and edited by targeted element surgery, which
//! preserves everything we do not understand. Typed accessors cover the
//! Dublin Core fields (title, description, subject), the XMP base fields
//! (Rating, CreatorTool, ModifyDate) and the xmpMM history log the editor
//! appends to on save.

use crate::error::{MetadataError, Result};

/// Namespace marker that prefixes the packet inside a JPEG APP1 segment.
pub const XMP_SEGMENT_HEADER: &[u8] = b"http://ns.adobe.com/xap/1.0/\0";

const NS_DC: (&str, &str) = ("xmlns:dc", "http://purl.org/dc/elements/1.1/");
const NS_XMP: (&str, &str) = ("xmlns:xmp", "http://ns.adobe.com/xap/1.0/");
const NS_XMP_MM: (&str, &str) = ("xmlns:xmpMM", "http://ns.adobe.com/xap/1.0/mm/");
const NS_ST_EVT: (&str, &str) =
    ("xmlns:stEvt", "http://ns.adobe.com/xap/1.0/sType/ResourceEvent#");

/// An XMP packet held as its serialized string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmpDocument {
    xml: String,
}

impl Default for XmpDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmpDocument {
    /// A fresh packet with an empty `rdf:Description` carrying the
    /// namespaces the typed accessors write into.
    pub fn new() -> Self {
        let mut xml = String::new();
        xml.push_str("<?xpacket begin=\"\u{feff}\" id=\"W5M0MpCehiHzreSzNTczkc9d\"?>\n");
        xml.push_str("<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n");
        xml.push_str("<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n");
        xml.push_str("<rdf:Description rdf:about=\"\"\n");
        xml.push_str(&format!("  {}=\"{}\"\n", NS_DC.0, NS_DC.1));
        xml.push_str(&format!("  {}=\"{}\"\n", NS_XMP.0, NS_XMP.1));
        xml.push_str(&format!("  {}=\"{}\"\n", NS_XMP_MM.0, NS_XMP_MM.1));
        xml.push_str(&format!("  {}=\"{}\">\n", NS_ST_EVT.0, NS_ST_EVT.1));
        xml.push_str("</rdf:Description>\n");
        xml.push_str("</rdf:RDF>\n");
        xml.push_str("</x:xmpmeta>\n");
        xml.push_str("<?xpacket end=\"w\"?>");
        Self { xml }
    }

    /// Adopt an existing packet as-is. No validation happens here; unknown
    /// content is preserved verbatim through edits.
    pub fn parse(xml: &str) -> Self {
        Self { xml: xml.to_string() }
    }

    pub fn as_xml(&self) -> &str {
        &self.xml
    }

    pub fn into_xml(self) -> String {
        self.xml
    }

    /// Set `dc:title` (language-alternative form).
    pub fn set_title(&mut self, title: &str) {
        let escaped = xml_escape(title);
        self.set_element(
            "dc:title",
            &format!(
                "<dc:title><rdf:Alt><rdf:li xml:lang=\"x-default\">{escaped}</rdf:li></rdf:Alt></dc:title>"
            ),
            &[NS_DC],
        );
    }

    /// Set `dc:description` (language-alternative form).
    pub fn set_description(&mut self, description: &str) {
        let escaped = xml_escape(description);
        self.set_element(
            "dc:description",
            &format!(
                "<dc:description><rdf:Alt><rdf:li xml:lang=\"x-default\">{escaped}</rdf:li></rdf:Alt></dc:description>"
            ),
            &[NS_DC],
        );
    }

    /// Set `dc:subject` as an unordered keyword bag.
    pub fn set_keywords(&mut self, keywords: &[String]) {
        let mut element = String::from("<dc:subject><rdf:Bag>");
        for keyword in keywords {
            element.push_str(&format!("<rdf:li>{}</rdf:li>", xml_escape(keyword)));
        }
        element.push_str("</rdf:Bag></dc:subject>");
        self.set_element("dc:subject", &element, &[NS_DC]);
    }

    /// Set `xmp:Rating` (0–5).
    pub fn set_rating(&mut self, rating: u8) -> Result<()> {
        if rating > 5 {
            return Err(MetadataError::value(
                "xmp:Rating",
                format!("rating {rating} is outside 0..=5"),
            ));
        }
        self.set_element(
            "xmp:Rating",
            &format!("<xmp:Rating>{rating}</xmp:Rating>"),
            &[NS_XMP],
        );
        Ok(())
    }

    pub fn set_creator_tool(&mut self, tool: &str) {
        let escaped = xml_escape(tool);
        self.set_element(
            "xmp:CreatorTool",
            &format!("<xmp:CreatorTool>{escaped}</xmp:CreatorTool>"),
            &[NS_XMP],
        );
    }

    /// Set `xmp:ModifyDate` to an ISO 8601 timestamp string.
    pub fn set_modify_date(&mut self, date: &str) {
        let escaped = xml_escape(date);
        self.set_element(
            "xmp:ModifyDate",
            &format!("<xmp:ModifyDate>{escaped}</xmp:ModifyDate>"),
            &[NS_XMP],
        );
    }

    /// Append one event to the `xmpMM:History` sequence, creating the
    /// sequence if the packet has none.
    pub fn add_history_event(&mut self, action: &str, software_agent: &str, when: &str) {
        for ns in [NS_XMP_MM, NS_ST_EVT] {
            self.ensure_namespace(ns.0, ns.1);
        }
        let entry = format!(
            "<rdf:li stEvt:action=\"{}\" stEvt:softwareAgent=\"{}\" stEvt:when=\"{}\"/>",
            xml_escape(action),
            xml_escape(software_agent),
            xml_escape(when),
        );

        // Existing history: append inside its rdf:Seq.
        if let Some(history_start) = self.xml.find("<xmpMM:History") {
            if let Some(seq_end) = self.xml[history_start..].find("</rdf:Seq>") {
                self.xml.insert_str(history_start + seq_end, &entry);
                return;
            }
        }

        let element =
            format!("<xmpMM:History><rdf:Seq>{entry}</rdf:Seq></xmpMM:History>");
        self.insert_into_description(&element);
    }

    /// Read back `dc:title` (first `rdf:li` of the alternative).
    pub fn title(&self) -> Option<String> {
        self.alt_text("dc:title")
    }

    /// Read back `dc:description` (first `rdf:li` of the alternative).
    pub fn description(&self) -> Option<String> {
        self.alt_text("dc:description")
    }

    /// Read back the `dc:subject` keyword bag.
    pub fn keywords(&self) -> Vec<String> {
        let Some(inner) = element_inner(&self.xml, "dc:subject") else {
            return Vec::new();
        };
        let mut keywords = Vec::new();
        let mut rest = inner;
        while let Some(item) = element_inner(rest, "rdf:li") {
            keywords.push(xml_unescape(item.trim()));
            let consumed = rest.find("</rdf:li>").map(|p| p + "</rdf:li>".len());
            match consumed {
                Some(end) => rest = &rest[end..],
                None => break,
            }
        }
        keywords
    }

    fn alt_text(&self, tag: &str) -> Option<String> {
        let inner = element_inner(&self.xml, tag)?;
        let li = element_inner(inner, "rdf:li").unwrap_or(inner);
        let text = xml_unescape(li.trim());
        if text.is_empty() { None } else { Some(text) }
    }

    /// Replace `tag` with `element`, inserting it fresh if absent.
    fn set_element(&mut self, tag: &str, element: &str, namespaces: &[(&str, &str)]) {
        for (attr, uri) in namespaces {
            self.ensure_namespace(attr, uri);
        }
        remove_element(&mut self.xml, tag);
        self.insert_into_description(element);
    }

    /// Declare a namespace on the `rdf:Description` if it is missing.
    fn ensure_namespace(&mut self, attr: &str, uri: &str) {
        if self.xml.contains(attr) {
            return;
        }
        if let Some(pos) = self.xml.find("rdf:about=\"\"") {
            let insert_at = pos + "rdf:about=\"\"".len();
            self.xml.insert_str(insert_at, &format!("\n  {attr}=\"{uri}\""));
        }
    }

    /// Insert an element before `</rdf:Description>`, converting a
    /// self-closing description to open/close form first if needed.
    fn insert_into_description(&mut self, element: &str) {
        if !self.xml.contains("</rdf:Description>") {
            if let Some(desc_start) = self.xml.find("<rdf:Description") {
                if let Some(close) = self.xml[desc_start..].find("/>") {
                    let abs_close = desc_start + close;
                    self.xml.replace_range(abs_close..abs_close + 2, ">");
                    if let Some(rdf_end) = self.xml.find("</rdf:RDF>") {
                        self.xml.insert_str(rdf_end, "</rdf:Description>\n");
                    }
                }
            }
        }
        if let Some(pos) = self.xml.find("</rdf:Description>") {
            self.xml.insert_str(pos, &format!("{element}\n"));
        }
    }
}

/// The content between `<tag ...>` and `</tag>`, if present.
fn element_inner<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    let start = xml.find(&open)?;
    let content_start = start + xml[start..].find('>')? + 1;
    let content_end = content_start + xml[content_start..].find(&close)?;
    Some(&xml[content_start..content_end])
}

/// Remove one element (open tag through matching close tag) from the packet.
fn remove_element(xml: &mut String, tag: &str) {
    let open = format!("<{tag}");
    let close = format!("</{tag}>");
    if let Some(start) = xml.find(&open) {
        if let Some(end) = xml[start..].find(&close) {
            let mut end_abs = start + end + close.len();
            if xml.as_bytes().get(end_abs) == Some(&b'\n') {
                end_abs += 1;
            }
            xml.replace_range(start..end_abs, "");
        }
    }
}

/// Escape special XML characters.
fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn xml_unescape(s: &str) -> String {
    s.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_document_round_trips_title() {
        let mut doc = XmpDocument::new();
        doc.set_title("Morning Fog");
        assert_eq!(doc.title().as_deref(), Some("Morning Fog"));
    }

    #[test]
    fn set_title_replaces_an_existing_one() {
        let mut doc = XmpDocument::new();
        doc.set_title("Old");
        doc.set_title("New Title");
        assert_eq!(doc.title().as_deref(), Some("New Title"));
        assert_eq!(doc.as_xml().matches("<dc:title>").count(), 1);
    }

    #[test]
    fn keywords_round_trip_through_the_bag() {
        let mut doc = XmpDocument::new();
        doc.set_keywords(&["fog".into(), "sea & sky".into()]);
        assert_eq!(doc.keywords(), vec!["fog".to_string(), "sea & sky".to_string()]);
    }

    #[test]
    fn escapes_markup_in_values() {
        let mut doc = XmpDocument::new();
        doc.set_description("a <b> & \"c\"");
        assert!(doc.as_xml().contains("a &lt;b&gt; &amp; &quot;c&quot;"));
        assert_eq!(doc.description().as_deref(), Some("a <b> & \"c\""));
    }

    #[test]
    fn rejects_out_of_range_rating() {
        let mut doc = XmpDocument::new();
        assert!(doc.set_rating(6).is_err());
        doc.set_rating(5).unwrap();
        assert!(doc.as_xml().contains("<xmp:Rating>5</xmp:Rating>"));
    }

    #[test]
    fn injects_into_a_foreign_self_closing_description() {
        let foreign = concat!(
            "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">",
            "<rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">",
            "<rdf:Description rdf:about=\"\" xmlns:tiff=\"http://ns.adobe.com/tiff/1.0/\"/>",
            "</rdf:RDF></x:xmpmeta>",
        );
        let mut doc = XmpDocument::parse(foreign);
        doc.set_title("Injected");
        assert_eq!(doc.title().as_deref(), Some("Injected"));
        // Foreign namespace survives the surgery.
        assert!(doc.as_xml().contains("xmlns:tiff"));
    }

    #[test]
    fn history_events_accumulate_in_one_sequence() {
        let mut doc = XmpDocument::new();
        doc.add_history_event("saved", "jpegmeta", "2026-08-31T10:00:00Z");
        doc.add_history_event("saved", "jpegmeta", "2026-08-31T11:00:00Z");
        assert_eq!(doc.as_xml().matches("<xmpMM:History>").count(), 1);
        assert_eq!(doc.as_xml().matches("stEvt:action=\"saved\"").count(), 2);
    }
}
