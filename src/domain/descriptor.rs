use regex::Regex;
use serde_json::Value;

/// The closed set of value kinds a descriptor can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    DataArray,
    Number,
    Integer,
    Boolean,
    String,
    Color,
    ColorList,
    ColorScale,
    Angle,
    Enumerated,
    FlagList,
    Any,
    InfoArray,
    SubplotId,
}

impl ValueKind {
    pub const ALL: [ValueKind; 14] = [
        ValueKind::DataArray,
        ValueKind::Number,
        ValueKind::Integer,
        ValueKind::Boolean,
        ValueKind::String,
        ValueKind::Color,
        ValueKind::ColorList,
        ValueKind::ColorScale,
        ValueKind::Angle,
        ValueKind::Enumerated,
        ValueKind::FlagList,
        ValueKind::Any,
        ValueKind::InfoArray,
        ValueKind::SubplotId,
    ];

    /// Canonical `valType` tag.
    pub fn tag(self) -> &'static str {
        match self {
            ValueKind::DataArray => "data_array",
            ValueKind::Number => "number",
            ValueKind::Integer => "integer",
            ValueKind::Boolean => "boolean",
            ValueKind::String => "string",
            ValueKind::Color => "color",
            ValueKind::ColorList => "colorlist",
            ValueKind::ColorScale => "colorscale",
            ValueKind::Angle => "angle",
            ValueKind::Enumerated => "enumerated",
            ValueKind::FlagList => "flaglist",
            ValueKind::Any => "any",
            ValueKind::InfoArray => "info_array",
            ValueKind::SubplotId => "subplotid",
        }
    }

    /// Accepts canonical tags and the descriptive aliases.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "data_array" | "data-array" | "numeric-sequence" => ValueKind::DataArray,
            "number" | "numeric" => ValueKind::Number,
            "integer" => ValueKind::Integer,
            "boolean" => ValueKind::Boolean,
            "string" => ValueKind::String,
            "color" => ValueKind::Color,
            "colorlist" | "color-list" => ValueKind::ColorList,
            "colorscale" | "color-scale" => ValueKind::ColorScale,
            "angle" => ValueKind::Angle,
            "enumerated" => ValueKind::Enumerated,
            "flaglist" | "flag-combination" => ValueKind::FlagList,
            "any" | "free-form" => ValueKind::Any,
            "info_array" | "nested-info-sequence" => ValueKind::InfoArray,
            "subplotid" | "subplot-id" => ValueKind::SubplotId,
            _ => return None,
        };
        Some(kind)
    }
}

/// One entry of an enumerated allow-list.
#[derive(Debug, Clone)]
pub enum EnumValue {
    Literal(Value),
    /// Declared as `/pattern/` in the schema; matched against strings only.
    Pattern(Regex),
}

/// Accepted nesting of an info sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dimensions {
    #[default]
    One,
    Two,
    OneOrTwo,
}

/// Element descriptors of an info sequence.
#[derive(Debug, Clone)]
pub enum InfoItems {
    /// Every position uses the same descriptor.
    Shared(Box<Descriptor>),
    /// Position `i` uses descriptor `i`.
    Positional(Vec<Descriptor>),
    /// Row-major descriptors for two dimensional sequences.
    Grid(Vec<Vec<Descriptor>>),
}

impl InfoItems {
    pub fn fixed_len(&self) -> Option<usize> {
        match self {
            InfoItems::Shared(_) => None,
            InfoItems::Positional(items) => Some(items.len()),
            InfoItems::Grid(rows) => Some(rows.len()),
        }
    }

    /// Descriptor for element `index` of a one dimensional sequence.
    pub fn at(&self, index: usize) -> Option<&Descriptor> {
        match self {
            InfoItems::Shared(item) => Some(item),
            InfoItems::Positional(items) => items.get(index),
            InfoItems::Grid(rows) => rows.get(index).and_then(|row| row.first()),
        }
    }

    /// Descriptor for element `[row][column]` of a two dimensional sequence.
    pub fn at2(&self, row: usize, column: usize) -> Option<&Descriptor> {
        match self {
            InfoItems::Shared(item) => Some(item),
            InfoItems::Positional(items) => items.get(column),
            InfoItems::Grid(rows) => rows.get(row).and_then(|cells| cells.get(column)),
        }
    }
}

/// Schema node describing one attribute.
#[derive(Debug, Clone)]
pub struct Descriptor {
    pub kind: ValueKind,
    pub dflt: Option<Value>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub values: Vec<EnumValue>,
    pub coerce_number: bool,
    pub array_ok: bool,
    pub strict: bool,
    pub no_blank: bool,
    pub flags: Vec<String>,
    pub extras: Vec<Value>,
    pub items: Option<InfoItems>,
    pub free_length: bool,
    pub dimensions: Dimensions,
    pub regex: Option<Regex>,
    /// Empty sequences written here are deletions.
    pub is_info_array: bool,
    pub no_templating: bool,
}

impl Descriptor {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            dflt: None,
            min: None,
            max: None,
            values: Vec::new(),
            coerce_number: false,
            array_ok: false,
            strict: false,
            no_blank: false,
            flags: Vec::new(),
            extras: Vec::new(),
            items: None,
            free_length: false,
            dimensions: Dimensions::One,
            regex: None,
            is_info_array: kind == ValueKind::InfoArray,
            no_templating: false,
        }
    }

    #[must_use]
    pub fn with_default(mut self, dflt: Value) -> Self {
        self.dflt = Some(dflt);
        self
    }

    #[must_use]
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    #[must_use]
    pub fn with_values(mut self, values: Vec<EnumValue>) -> Self {
        self.values = values;
        self
    }

    #[must_use]
    pub fn with_flags<I, S>(mut self, flags: I, extras: Vec<Value>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags = flags.into_iter().map(Into::into).collect();
        self.extras = extras;
        self
    }

    #[must_use]
    pub fn with_items(mut self, items: InfoItems) -> Self {
        self.items = Some(items);
        self
    }

    #[must_use]
    pub fn with_dimensions(mut self, dimensions: Dimensions) -> Self {
        self.dimensions = dimensions;
        self
    }

    #[must_use]
    pub fn array_ok(mut self) -> Self {
        self.array_ok = true;
        self
    }

    #[must_use]
    pub fn strict(mut self) -> Self {
        self.strict = true;
        self
    }

    #[must_use]
    pub fn no_blank(mut self) -> Self {
        self.no_blank = true;
        self
    }

    #[must_use]
    pub fn free_length(mut self) -> Self {
        self.free_length = true;
        self
    }

    #[must_use]
    pub fn coerce_number(mut self) -> Self {
        self.coerce_number = true;
        self
    }

    /// Descriptors whose values are per-point data rather than style.
    pub fn is_data(&self) -> bool {
        self.kind == ValueKind::DataArray
    }
}
