//! Worksheet print margins.
//!
//! For compatibility, page margins serialize to nothing unless at least one margin
//! differs from its default. Once customized, all six margins are written, using the
//! defaults for the ones that were never set.
use crate::types::{Result, Value};
use crate::validation::validate_unsigned_numeric;
use crate::xml::{Attr, ToXml, XmlWriter};
use tracing::debug;

/// Default left and right margin (in inches)
pub const DEFAULT_LEFT_RIGHT: f64 = 0.75;

/// Default top and bottom margin (in inches)
pub const DEFAULT_TOP_BOTTOM: f64 = 1.00;

/// Default header and footer margin (in inches)
pub const DEFAULT_HEADER_FOOTER: f64 = 0.50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarginField {
    Left,
    Right,
    Top,
    Bottom,
    Header,
    Footer,
}

impl MarginField {
    /// Attribute order of the `pageMargins` element
    pub const ALL: [MarginField; 6] = [
        MarginField::Left,
        MarginField::Right,
        MarginField::Top,
        MarginField::Bottom,
        MarginField::Header,
        MarginField::Footer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MarginField::Left => "left",
            MarginField::Right => "right",
            MarginField::Top => "top",
            MarginField::Bottom => "bottom",
            MarginField::Header => "header",
            MarginField::Footer => "footer",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|field| field.name() == name)
    }

    pub fn default_value(&self) -> f64 {
        match self {
            MarginField::Left | MarginField::Right => DEFAULT_LEFT_RIGHT,
            MarginField::Top | MarginField::Bottom => DEFAULT_TOP_BOTTOM,
            MarginField::Header | MarginField::Footer => DEFAULT_HEADER_FOOTER,
        }
    }

    fn context(&self) -> &'static str {
        match self {
            MarginField::Left => "PageMargins.left",
            MarginField::Right => "PageMargins.right",
            MarginField::Top => "PageMargins.top",
            MarginField::Bottom => "PageMargins.bottom",
            MarginField::Header => "PageMargins.header",
            MarginField::Footer => "PageMargins.footer",
        }
    }
}

/// Margins applied on top of the defaults by [`PageMargins::with_options`].
#[derive(Debug, Clone, Default)]
pub struct PageMarginsOptions {
    values: Vec<(MarginField, Value)>,
}

impl PageMarginsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, field: MarginField, value: impl Into<Value>) -> Self {
        self.values.push((field, value.into()));
        self
    }

    pub fn left(self, value: impl Into<Value>) -> Self {
        self.with(MarginField::Left, value)
    }

    pub fn right(self, value: impl Into<Value>) -> Self {
        self.with(MarginField::Right, value)
    }

    pub fn top(self, value: impl Into<Value>) -> Self {
        self.with(MarginField::Top, value)
    }

    pub fn bottom(self, value: impl Into<Value>) -> Self {
        self.with(MarginField::Bottom, value)
    }

    pub fn header(self, value: impl Into<Value>) -> Self {
        self.with(MarginField::Header, value)
    }

    pub fn footer(self, value: impl Into<Value>) -> Self {
        self.with(MarginField::Footer, value)
    }
}

/// Print margins of a worksheet, in inches.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMargins {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    header: f64,
    footer: f64,
}

impl Default for PageMargins {
    fn default() -> Self {
        Self {
            left: DEFAULT_LEFT_RIGHT,
            right: DEFAULT_LEFT_RIGHT,
            top: DEFAULT_TOP_BOTTOM,
            bottom: DEFAULT_TOP_BOTTOM,
            header: DEFAULT_HEADER_FOOTER,
            footer: DEFAULT_HEADER_FOOTER,
        }
    }
}

impl PageMargins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: PageMarginsOptions) -> Result<Self> {
        let mut margins = Self::default();
        for (field, value) in options.values {
            margins.set_field(field, value)?;
        }
        Ok(margins)
    }

    pub fn left(&self) -> f64 {
        self.left
    }

    pub fn right(&self) -> f64 {
        self.right
    }

    pub fn top(&self) -> f64 {
        self.top
    }

    pub fn bottom(&self) -> f64 {
        self.bottom
    }

    pub fn header(&self) -> f64 {
        self.header
    }

    pub fn footer(&self) -> f64 {
        self.footer
    }

    pub fn get(&self, field: MarginField) -> f64 {
        match field {
            MarginField::Left => self.left,
            MarginField::Right => self.right,
            MarginField::Top => self.top,
            MarginField::Bottom => self.bottom,
            MarginField::Header => self.header,
            MarginField::Footer => self.footer,
        }
    }

    fn slot(&mut self, field: MarginField) -> &mut f64 {
        match field {
            MarginField::Left => &mut self.left,
            MarginField::Right => &mut self.right,
            MarginField::Top => &mut self.top,
            MarginField::Bottom => &mut self.bottom,
            MarginField::Header => &mut self.header,
            MarginField::Footer => &mut self.footer,
        }
    }

    /// Validate and assign a single margin. On error the old value is kept.
    pub fn set_field(&mut self, field: MarginField, value: impl Into<Value>) -> Result<()> {
        let value = validate_unsigned_numeric(field.context(), &value.into())?;
        *self.slot(field) = value;
        Ok(())
    }

    pub fn set_left(&mut self, value: impl Into<Value>) -> Result<()> {
        self.set_field(MarginField::Left, value)
    }

    pub fn set_right(&mut self, value: impl Into<Value>) -> Result<()> {
        self.set_field(MarginField::Right, value)
    }

    pub fn set_top(&mut self, value: impl Into<Value>) -> Result<()> {
        self.set_field(MarginField::Top, value)
    }

    pub fn set_bottom(&mut self, value: impl Into<Value>) -> Result<()> {
        self.set_field(MarginField::Bottom, value)
    }

    pub fn set_header(&mut self, value: impl Into<Value>) -> Result<()> {
        self.set_field(MarginField::Header, value)
    }

    pub fn set_footer(&mut self, value: impl Into<Value>) -> Result<()> {
        self.set_field(MarginField::Footer, value)
    }

    /// Set some or all margins at once from `(name, value)` pairs.
    ///
    /// Names other than `left`, `right`, `top`, `bottom`, `header` and `footer` are
    /// skipped. Pairs are applied in order and the update is not atomic: if one value
    /// is rejected, the margins applied before it stay applied.
    pub fn set<'a, I, V>(&mut self, margins: I) -> Result<()>
    where
        I: IntoIterator<Item = (&'a str, V)>,
        V: Into<Value>,
    {
        for (name, value) in margins {
            match MarginField::from_name(name) {
                Some(field) => self.set_field(field, value)?,
                None => debug!(key = name, "ignoring unknown page margin"),
            }
        }
        Ok(())
    }

    /// True when any margin differs from its default.
    pub fn is_custom(&self) -> bool {
        MarginField::ALL
            .iter()
            .any(|field| self.get(*field) != field.default_value())
    }
}

impl ToXml for PageMargins {
    fn to_xml(&self, xml: &mut XmlWriter) {
        if !self.is_custom() {
            return;
        }
        let attrs = MarginField::ALL.map(|field| (field.name(), Attr::Decimal(self.get(field))));
        xml.empty("pageMargins", &attrs);
    }
}
