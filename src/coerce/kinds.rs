//! One coercion strategy per [`ValueKind`].

use regex::Regex;
use serde_json::{Number, Value};

use crate::domain::{Descriptor, Dimensions, EnumValue, InfoItems, ValueKind};

use super::color::{default_scale, is_valid_color, is_valid_color_list, parse_scale};
use super::coerce_value;

/// Outcome of checking one present input value against a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum Coerced {
    /// Accepted as is, or in its canonical form.
    Valid(Value),
    /// Accepted after dropping or defaulting some of its parts.
    Repaired(Value),
    /// Rejected; the caller falls back to a default.
    Invalid,
}

impl Coerced {
    pub fn is_valid(&self) -> bool {
        matches!(self, Coerced::Valid(_))
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Coerced::Valid(value) | Coerced::Repaired(value) => Some(value),
            Coerced::Invalid => None,
        }
    }
}

/// Coercion strategy for one value kind.
///
/// `coerce` only ever sees present, non-null input.
pub trait KindHandler: Sync {
    fn coerce(&self, value: &Value, descriptor: &Descriptor) -> Coerced;

    fn validate(&self, value: &Value, descriptor: &Descriptor) -> bool {
        self.coerce(value, descriptor).is_valid()
    }

    /// The value used when the input is absent or rejected.
    fn default_value(&self, dflt: Option<&Value>) -> Option<Value> {
        dflt.cloned()
    }
}

struct DataArrayKind;
struct NumberKind;
struct IntegerKind;
struct BooleanKind;
struct StringKind;
struct ColorKind;
struct ColorListKind;
struct ColorScaleKind;
struct AngleKind;
struct EnumeratedKind;
struct FlagListKind;
struct AnyKind;
struct InfoArrayKind;
struct SubplotIdKind;

/// The handler registered for `kind`.
pub fn handler(kind: ValueKind) -> &'static dyn KindHandler {
    match kind {
        ValueKind::DataArray => &DataArrayKind,
        ValueKind::Number => &NumberKind,
        ValueKind::Integer => &IntegerKind,
        ValueKind::Boolean => &BooleanKind,
        ValueKind::String => &StringKind,
        ValueKind::Color => &ColorKind,
        ValueKind::ColorList => &ColorListKind,
        ValueKind::ColorScale => &ColorScaleKind,
        ValueKind::Angle => &AngleKind,
        ValueKind::Enumerated => &EnumeratedKind,
        ValueKind::FlagList => &FlagListKind,
        ValueKind::Any => &AnyKind,
        ValueKind::InfoArray => &InfoArrayKind,
        ValueKind::SubplotId => &SubplotIdKind,
    }
}

/// Numbers and numeric strings, as a finite float.
pub(crate) fn number_value(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(number) => number.as_f64()?,
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()?
        }
        _ => return None,
    };
    number.is_finite().then_some(number)
}

/// Integral floats become JSON integers.
pub(crate) fn number_to_value(number: f64) -> Value {
    if number.fract() == 0.0 && number.abs() < 9_007_199_254_740_992.0 {
        return Value::from(number as i64);
    }
    Number::from_f64(number).map_or(Value::Null, Value::Number)
}

fn in_range(number: f64, descriptor: &Descriptor) -> bool {
    descriptor.min.is_none_or(|min| number >= min)
        && descriptor.max.is_none_or(|max| number <= max)
}

/// Keep JSON numbers as written; convert numeric strings.
fn canonical_number(value: &Value, number: f64) -> Value {
    match value {
        Value::Number(_) => value.clone(),
        _ => number_to_value(number),
    }
}

fn same_value(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64() == b.as_f64(),
        _ => left == right,
    }
}

impl KindHandler for DataArrayKind {
    fn coerce(&self, value: &Value, _: &Descriptor) -> Coerced {
        match value {
            Value::Array(_) => Coerced::Valid(value.clone()),
            _ => Coerced::Invalid,
        }
    }
}

impl KindHandler for NumberKind {
    fn coerce(&self, value: &Value, descriptor: &Descriptor) -> Coerced {
        match number_value(value) {
            Some(number) if in_range(number, descriptor) => {
                Coerced::Valid(canonical_number(value, number))
            }
            _ => Coerced::Invalid,
        }
    }
}

impl KindHandler for IntegerKind {
    fn coerce(&self, value: &Value, descriptor: &Descriptor) -> Coerced {
        if descriptor.extras.iter().any(|extra| same_value(extra, value)) {
            return Coerced::Valid(value.clone());
        }
        match number_value(value) {
            Some(number) if number.fract() == 0.0 && in_range(number, descriptor) => {
                Coerced::Valid(canonical_number(value, number))
            }
            _ => Coerced::Invalid,
        }
    }
}

impl KindHandler for BooleanKind {
    fn coerce(&self, value: &Value, _: &Descriptor) -> Coerced {
        match value {
            Value::Bool(_) => Coerced::Valid(value.clone()),
            _ => Coerced::Invalid,
        }
    }
}

impl KindHandler for StringKind {
    fn coerce(&self, value: &Value, descriptor: &Descriptor) -> Coerced {
        let text = match value {
            Value::String(text) => text.clone(),
            _ if descriptor.strict => return Coerced::Invalid,
            Value::Number(number) => number.to_string(),
            Value::Bool(flag) => flag.to_string(),
            _ => return Coerced::Invalid,
        };
        if descriptor.no_blank && text.is_empty() {
            return Coerced::Invalid;
        }
        Coerced::Valid(Value::String(text))
    }
}

impl KindHandler for ColorKind {
    fn coerce(&self, value: &Value, _: &Descriptor) -> Coerced {
        if is_valid_color(value) {
            Coerced::Valid(value.clone())
        } else {
            Coerced::Invalid
        }
    }
}

impl KindHandler for ColorListKind {
    fn coerce(&self, value: &Value, _: &Descriptor) -> Coerced {
        if is_valid_color_list(value) {
            Coerced::Valid(value.clone())
        } else {
            Coerced::Invalid
        }
    }
}

impl KindHandler for ColorScaleKind {
    fn coerce(&self, value: &Value, _: &Descriptor) -> Coerced {
        parse_scale(value).map_or(Coerced::Invalid, Coerced::Valid)
    }

    fn default_value(&self, dflt: Option<&Value>) -> Option<Value> {
        Some(dflt.and_then(parse_scale).unwrap_or_else(default_scale))
    }
}

impl KindHandler for AngleKind {
    fn coerce(&self, value: &Value, _: &Descriptor) -> Coerced {
        if value.as_str() == Some("auto") {
            return Coerced::Valid(value.clone());
        }
        let Some(degrees) = number_value(value) else {
            return Coerced::Invalid;
        };
        if degrees > 180.0 || degrees <= -180.0 {
            // into (-180, 180]
            let wrapped = 180.0 - (180.0 - degrees).rem_euclid(360.0);
            return Coerced::Valid(number_to_value(wrapped));
        }
        Coerced::Valid(canonical_number(value, degrees))
    }
}

impl KindHandler for EnumeratedKind {
    fn coerce(&self, value: &Value, descriptor: &Descriptor) -> Coerced {
        let candidate = if descriptor.coerce_number {
            match number_value(value) {
                Some(number) => number_to_value(number),
                None => return Coerced::Invalid,
            }
        } else {
            value.clone()
        };

        let accepted = descriptor.values.iter().any(|allowed| match allowed {
            EnumValue::Literal(literal) => same_value(literal, &candidate),
            EnumValue::Pattern(pattern) => candidate.as_str().is_some_and(|s| pattern.is_match(s)),
        });
        if accepted {
            Coerced::Valid(candidate)
        } else {
            Coerced::Invalid
        }
    }
}

impl KindHandler for FlagListKind {
    fn coerce(&self, value: &Value, descriptor: &Descriptor) -> Coerced {
        let Value::String(raw) = value else {
            return Coerced::Invalid;
        };
        if descriptor.extras.iter().any(|extra| extra == value) {
            return Coerced::Valid(value.clone());
        }

        let mut kept: Vec<&str> = Vec::new();
        let mut dropped = false;
        for token in raw.split('+') {
            if descriptor.flags.iter().any(|flag| flag == token) && !kept.contains(&token) {
                kept.push(token);
            } else {
                dropped = true;
            }
        }

        if kept.is_empty() {
            return Coerced::Invalid;
        }
        let joined = Value::String(kept.join("+"));
        if dropped {
            Coerced::Repaired(joined)
        } else {
            Coerced::Valid(joined)
        }
    }
}

impl KindHandler for AnyKind {
    fn coerce(&self, value: &Value, _: &Descriptor) -> Coerced {
        Coerced::Valid(value.clone())
    }
}

impl KindHandler for SubplotIdKind {
    fn coerce(&self, value: &Value, descriptor: &Descriptor) -> Coerced {
        let Value::String(id) = value else {
            return Coerced::Invalid;
        };
        let matched = match (&descriptor.regex, descriptor.dflt.as_ref().and_then(Value::as_str)) {
            (Some(regex), _) => regex.is_match(id),
            (None, Some(base)) => {
                let pattern = format!(r"^{}([2-9]|[1-9][0-9]+)?$", regex::escape(base));
                Regex::new(&pattern).is_ok_and(|regex| regex.is_match(id))
            }
            (None, None) => false,
        };
        if matched {
            Coerced::Valid(value.clone())
        } else {
            Coerced::Invalid
        }
    }
}

/// Tracks whether any part of an info sequence fell back to a default.
struct PartCoercer<'a> {
    defaults: &'a [Value],
    repaired: bool,
}

impl PartCoercer<'_> {
    fn part(&mut self, part: Option<&Value>, item: Option<&Descriptor>, dflt: Option<&Value>) -> Value {
        let part = part.filter(|value| !value.is_null());
        let Some(item) = item else {
            return part.cloned().unwrap_or(Value::Null);
        };
        if let Some(value) = part
            && !handler(item.kind).validate(value, item)
            && !(item.array_ok && value.is_array())
        {
            self.repaired = true;
        }
        coerce_value(part, item, dflt).unwrap_or(Value::Null)
    }

    fn default_at(&self, index: usize) -> Option<&Value> {
        self.defaults.get(index).filter(|value| !value.is_null())
    }
}

fn trim_holes(values: &mut Vec<Value>) {
    while values.last().is_some_and(Value::is_null) {
        values.pop();
    }
}

impl KindHandler for InfoArrayKind {
    fn coerce(&self, value: &Value, descriptor: &Descriptor) -> Coerced {
        let Value::Array(values) = value else {
            return Coerced::Invalid;
        };
        let Some(items) = descriptor.items.as_ref() else {
            return Coerced::Valid(value.clone());
        };
        let defaults = match &descriptor.dflt {
            Some(Value::Array(defaults)) => defaults.as_slice(),
            _ => &[],
        };
        let mut parts = PartCoercer {
            defaults,
            repaired: false,
        };

        let two_dimensional = match descriptor.dimensions {
            Dimensions::One => false,
            Dimensions::Two => true,
            Dimensions::OneOrTwo => values.first().is_some_and(Value::is_array),
        };

        let out = if two_dimensional {
            coerce_grid(values, items, descriptor.free_length, &mut parts)
        } else {
            coerce_row(values, items, descriptor.free_length, &mut parts)
        };

        if parts.repaired {
            Coerced::Repaired(Value::Array(out))
        } else {
            Coerced::Valid(Value::Array(out))
        }
    }
}

fn coerce_row(
    values: &[Value],
    items: &InfoItems,
    free_length: bool,
    parts: &mut PartCoercer<'_>,
) -> Vec<Value> {
    let len = match items.fixed_len() {
        Some(fixed) if free_length => fixed.min(values.len()),
        Some(fixed) => fixed,
        None => values.len(),
    };
    if let Some(fixed) = items.fixed_len()
        && (values.len() > fixed || (values.len() < fixed && !free_length))
    {
        parts.repaired = true;
    }

    let mut out = Vec::with_capacity(len);
    for index in 0..len {
        let dflt = parts.default_at(index).cloned();
        out.push(parts.part(values.get(index), items.at(index), dflt.as_ref()));
    }
    trim_holes(&mut out);
    out
}

fn coerce_grid(
    values: &[Value],
    items: &InfoItems,
    free_length: bool,
    parts: &mut PartCoercer<'_>,
) -> Vec<Value> {
    let rows = match items {
        InfoItems::Grid(grid) if !free_length => grid.len(),
        InfoItems::Grid(grid) => grid.len().min(values.len()),
        _ => values.len(),
    };
    if let InfoItems::Grid(grid) = items
        && grid.len() != values.len()
        && (!free_length || values.len() > grid.len())
    {
        parts.repaired = true;
    }

    let mut out = Vec::with_capacity(rows);
    for row_index in 0..rows {
        let row: &[Value] = match values.get(row_index) {
            Some(Value::Array(row)) => row,
            Some(_) => {
                parts.repaired = true;
                &[]
            }
            None => &[],
        };
        let columns = match items {
            InfoItems::Shared(_) => row.len(),
            InfoItems::Positional(columns) => columns.len(),
            InfoItems::Grid(grid) => grid.get(row_index).map_or(0, Vec::len),
        };
        let row_defaults = parts
            .default_at(row_index)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut cells = Vec::with_capacity(columns);
        for column in 0..columns {
            let dflt = row_defaults.get(column).filter(|value| !value.is_null());
            cells.push(parts.part(row.get(column), items.at2(row_index, column), dflt));
        }
        trim_holes(&mut cells);
        out.push(Value::Array(cells));
    }
    out
}
