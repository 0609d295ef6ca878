//! Streaming markup sink used by every part of the document model.
//!
//! Entities never build markup text themselves: they call [`XmlWriter::element`],
//! [`XmlWriter::empty`] and friends, and the writer takes care of escaping and of
//! rendering attribute scalars (integers through `itoa`, reals through `ryu`).

use std::fmt::Write;

pub const XML_DECLARATION: &str =
    "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n";

pub const NS_SPREADSHEETML: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub const NS_OFFICE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const NS_PACKAGE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";
pub const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
pub const NS_CHART: &str = "http://schemas.openxmlformats.org/drawingml/2006/chart";
pub const NS_DRAWINGML: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
pub const NS_SPREADSHEET_DRAWING: &str =
    "http://schemas.openxmlformats.org/drawingml/2006/spreadsheetDrawing";

/// A scalar attribute value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attr<'a> {
    Str(&'a str),
    Int(i64),
    UInt(u64),
    Float(f64),
    /// Real rendered in fixed-point notation, never with an exponent
    Decimal(f64),
    Bool(bool),
}

impl<'a> From<&'a str> for Attr<'a> {
    fn from(v: &'a str) -> Self {
        Attr::Str(v)
    }
}

impl<'a> From<&'a String> for Attr<'a> {
    fn from(v: &'a String) -> Self {
        Attr::Str(v.as_str())
    }
}

impl From<u32> for Attr<'_> {
    fn from(v: u32) -> Self {
        Attr::UInt(v as u64)
    }
}

impl From<u64> for Attr<'_> {
    fn from(v: u64) -> Self {
        Attr::UInt(v)
    }
}

impl From<usize> for Attr<'_> {
    fn from(v: usize) -> Self {
        Attr::UInt(v as u64)
    }
}

impl From<i64> for Attr<'_> {
    fn from(v: i64) -> Self {
        Attr::Int(v)
    }
}

impl From<i32> for Attr<'_> {
    fn from(v: i32) -> Self {
        Attr::Int(v as i64)
    }
}

impl From<f64> for Attr<'_> {
    fn from(v: f64) -> Self {
        Attr::Float(v)
    }
}

impl From<bool> for Attr<'_> {
    fn from(v: bool) -> Self {
        Attr::Bool(v)
    }
}

/// The serialization contract: emit exactly the markup this entity needs into `xml`.
pub trait ToXml {
    fn to_xml(&self, xml: &mut XmlWriter);

    /// Serialize into a fresh buffer. Convenient for tests and single-fragment output.
    fn to_xml_string(&self) -> String {
        let mut xml = XmlWriter::new();
        self.to_xml(&mut xml);
        xml.finish()
    }
}

#[derive(Debug, Default, Clone)]
pub struct XmlWriter {
    buf: String,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
        }
    }

    pub fn declaration(&mut self) {
        self.buf.push_str(XML_DECLARATION);
    }

    /// `<name attrs/>`
    pub fn empty(&mut self, name: &str, attrs: &[(&str, Attr)]) {
        self.open_tag(name, attrs);
        self.buf.push_str("/>");
    }

    /// `<name attrs>body</name>`
    pub fn element<F>(&mut self, name: &str, attrs: &[(&str, Attr)], body: F)
    where
        F: FnOnce(&mut Self),
    {
        self.open_tag(name, attrs);
        self.buf.push('>');
        body(self);
        self.close_tag(name);
    }

    /// `<name attrs>text</name>` with `text` escaped
    pub fn text_element(&mut self, name: &str, attrs: &[(&str, Attr)], text: &str) {
        self.open_tag(name, attrs);
        self.buf.push('>');
        xml_escape(text, &mut self.buf);
        self.close_tag(name);
    }

    /// Like [`XmlWriter::text_element`] for elements whose text Excel decodes
    /// from `_xHHHH_` escapes.
    pub fn string_element(&mut self, name: &str, attrs: &[(&str, Attr)], text: &str) {
        self.open_tag(name, attrs);
        self.buf.push('>');
        xstring_escape(text, &mut self.buf);
        self.close_tag(name);
    }

    pub fn text(&mut self, text: &str) {
        xml_escape(text, &mut self.buf);
    }

    /// Append markup that is already well-formed and escaped.
    pub fn raw(&mut self, markup: &str) {
        self.buf.push_str(markup);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn finish(self) -> String {
        self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf.into_bytes()
    }

    #[inline(always)]
    fn open_tag(&mut self, name: &str, attrs: &[(&str, Attr)]) {
        self.buf.push('<');
        self.buf.push_str(name);
        for (key, value) in attrs {
            self.buf.push(' ');
            self.buf.push_str(key);
            self.buf.push_str("=\"");
            self.write_attr_value(value);
            self.buf.push('"');
        }
    }

    #[inline(always)]
    fn close_tag(&mut self, name: &str) {
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
    }

    fn write_attr_value(&mut self, value: &Attr) {
        match *value {
            Attr::Str(s) => xml_escape(s, &mut self.buf),
            Attr::Int(n) => self.buf.push_str(itoa::Buffer::new().format(n)),
            Attr::UInt(n) => self.buf.push_str(itoa::Buffer::new().format(n)),
            Attr::Float(n) => self.buf.push_str(ryu::Buffer::new().format(n)),
            Attr::Decimal(n) => write_decimal(n, &mut self.buf),
            Attr::Bool(b) => self.buf.push(if b { '1' } else { '0' }),
        }
    }
}

/// Fixed-point rendering with at least one fractional digit ("1.0", "0.0000001").
pub fn write_decimal(n: f64, out: &mut String) {
    let start = out.len();
    let _ = write!(out, "{}", n);
    if !out[start..].contains('.') {
        out.push_str(".0");
    }
}

#[inline(always)]
fn is_restricted_control(byte: u8) -> bool {
    byte < 0x20 && !matches!(byte, b'\t' | b'\n' | b'\r')
}

/// SIMD-accelerated XML escaping for attributes and element text.
///
/// Control characters that XML 1.0 cannot carry are dropped. Content that
/// Excel decodes from the `_xHHHH_` form goes through [`xstring_escape`].
#[inline(always)]
pub fn xml_escape(input: &str, output: &mut String) {
    let bytes = input.as_bytes();
    let needs_escape = memchr::memchr3(b'&', b'<', b'>', bytes).is_some()
        || memchr::memchr2(b'"', b'\'', bytes).is_some()
        || bytes.iter().any(|b| is_restricted_control(*b));

    if !needs_escape {
        output.push_str(input);
        return;
    }

    let mut last = 0;
    for (pos, &byte) in bytes.iter().enumerate() {
        let escape = match byte {
            b'&' => "&amp;",
            b'<' => "&lt;",
            b'>' => "&gt;",
            b'"' => "&quot;",
            b'\'' => "&apos;",
            b if is_restricted_control(b) => "",
            _ => continue,
        };

        output.push_str(&input[last..pos]);
        output.push_str(escape);
        last = pos + 1;
    }

    output.push_str(&input[last..]);
}

/// Escaping for shared-string style text (`<t>`, `<c:v>`, `<a:t>`).
///
/// Excel decodes `_xHHHH_` in these elements, so restricted control
/// characters are written in that form and an underscore that would start a
/// literal `_xHHHH_` is itself written as `_x005F_`.
pub fn xstring_escape(input: &str, output: &mut String) {
    let bytes = input.as_bytes();
    if memchr::memchr(b'_', bytes).is_none() && !bytes.iter().any(|b| is_restricted_control(*b)) {
        xml_escape(input, output);
        return;
    }

    let mut last = 0;
    for (pos, &byte) in bytes.iter().enumerate() {
        let code = match byte {
            b'_' if starts_encoded_char(&bytes[pos..]) => byte,
            b if is_restricted_control(b) => b,
            _ => continue,
        };

        xml_escape(&input[last..pos], output);
        output.push_str("_x00");
        output.push(char::from(HEX_DIGITS[(code >> 4) as usize]));
        output.push(char::from(HEX_DIGITS[(code & 0x0f) as usize]));
        output.push('_');
        last = pos + 1;
    }

    xml_escape(&input[last..], output);
}

/// `_xHHHH_` at the start of `bytes`.
fn starts_encoded_char(bytes: &[u8]) -> bool {
    bytes.len() >= 7
        && bytes[0] == b'_'
        && bytes[1] == b'x'
        && bytes[2..6].iter().all(u8::is_ascii_hexdigit)
        && bytes[6] == b'_'
}

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Zero-allocation column letter writing - returns length written
#[inline(always)]
pub fn write_col_letter(col: usize, buf: &mut [u8; 4]) -> usize {
    if col < 26 {
        buf[0] = b'A' + col as u8;
        return 1;
    }

    let mut col = col;
    let mut stack = [0u8; 4];
    let mut stack_len = 0;

    while col >= 26 {
        stack[stack_len] = b'A' + (col % 26) as u8;
        stack_len += 1;
        col = col / 26 - 1;
    }
    stack[stack_len] = b'A' + col as u8;
    stack_len += 1;

    for i in 0..stack_len {
        buf[i] = stack[stack_len - 1 - i];
    }

    stack_len
}

/// Column letters for a zero-based column index ("A", "Z", "AA", ...)
pub fn col_letters(col: usize) -> String {
    let mut col_buf = [0u8; 4];
    let len = write_col_letter(col, &mut col_buf);
    col_buf[..len].iter().map(|b| char::from(*b)).collect()
}

/// Write an A1-style cell reference for zero-based coordinates
#[inline(always)]
pub fn write_cell_ref(row: usize, col: usize, out: &mut String) {
    let mut col_buf = [0u8; 4];
    let col_len = write_col_letter(col, &mut col_buf);
    out.extend(col_buf[..col_len].iter().map(|b| char::from(*b)));
    out.push_str(itoa::Buffer::new().format(row + 1));
}

pub fn cell_ref(row: usize, col: usize) -> String {
    let mut out = String::with_capacity(8);
    write_cell_ref(row, col, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_col_letters() {
        assert_eq!(col_letters(0), "A");
        assert_eq!(col_letters(25), "Z");
        assert_eq!(col_letters(26), "AA");
        assert_eq!(col_letters(701), "ZZ");
        assert_eq!(col_letters(702), "AAA");
        assert_eq!(col_letters(16_383), "XFD");
    }

    #[test]
    fn test_cell_ref() {
        assert_eq!(cell_ref(0, 0), "A1");
        assert_eq!(cell_ref(9, 27), "AB10");
    }

    #[test]
    fn test_escape() {
        let mut out = String::new();
        xml_escape("plain", &mut out);
        assert_eq!(out, "plain");

        let mut out = String::new();
        xml_escape("a<b & \"c\" 'd'>", &mut out);
        assert_eq!(out, "a&lt;b &amp; &quot;c&quot; &apos;d&apos;&gt;");

        let mut out = String::new();
        xml_escape("tab\tbell\u{7}é _x0041_", &mut out);
        assert_eq!(out, "tab\tbellé _x0041_");
    }

    #[test]
    fn test_xstring_escape_keeps_literal_sequences_distinct() {
        let mut out = String::new();
        xstring_escape("_x0041_ and bell\u{7}", &mut out);
        assert_eq!(out, "_x005F_x0041_ and bell_x0007_");

        let mut out = String::new();
        xstring_escape("snake_case _x00 <b>", &mut out);
        assert_eq!(out, "snake_case _x00 &lt;b&gt;");

        let mut out = String::new();
        xstring_escape("plain", &mut out);
        assert_eq!(out, "plain");
    }

    #[test]
    fn test_writer_elements() {
        let mut xml = XmlWriter::new();
        xml.element("c:ser", &[], |xml| {
            xml.empty("c:idx", &[("val", Attr::UInt(0))]);
            xml.text_element("c:v", &[], "A & B");
        });
        assert_eq!(
            xml.as_str(),
            "<c:ser><c:idx val=\"0\"/><c:v>A &amp; B</c:v></c:ser>"
        );
    }

    #[test]
    fn test_attr_rendering() {
        let mut xml = XmlWriter::new();
        xml.empty(
            "x",
            &[
                ("f", Attr::Float(0.75)),
                ("g", Attr::Float(1.0)),
                ("i", Attr::Int(-3)),
                ("b", Attr::Bool(true)),
                ("s", Attr::Str("a\"b")),
            ],
        );
        assert_eq!(
            xml.finish(),
            "<x f=\"0.75\" g=\"1.0\" i=\"-3\" b=\"1\" s=\"a&quot;b\"/>"
        );
    }

    #[test]
    fn test_decimal_never_uses_exponent() {
        let mut xml = XmlWriter::new();
        xml.empty(
            "m",
            &[
                ("a", Attr::Decimal(1e-7)),
                ("b", Attr::Decimal(2.0)),
                ("c", Attr::Decimal(0.75)),
                ("d", Attr::Decimal(1e21)),
            ],
        );
        assert_eq!(
            xml.finish(),
            "<m a=\"0.0000001\" b=\"2.0\" c=\"0.75\" d=\"1000000000000000000000.0\"/>"
        );

        let mut xml = XmlWriter::new();
        xml.empty("f", &[("a", Attr::Float(1e-7))]);
        assert_eq!(xml.finish(), "<f a=\"1e-7\"/>");
    }
}
