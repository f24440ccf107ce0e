//! Symbol table shared by the front end, the command engine and the cache.
//!
//! The table is the unit of caching: it carries the version of the runtime
//! that built it so that a snapshot can be checked after decoding.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Data types a symbol may be declared with.
pub const DATA_TYPES: [&str; 22] = [
    "ffp", "dword", "word", "byte", "u32", "u16", "u8", "dpi", "spi", "s32", "s16", "s8", "ssi",
    "dis_32", "d32", "dis_16", "d16", "dis", "dis_8", "d8", "u24", "s24",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SymbolError {
    #[error("Name not found.")]
    NotFound,
    #[error("Name not a symbol.")]
    NotASymbol,
    #[error("Nothing was loaded from the file '{0}'.")]
    NothingLoadedFrom(String),
    #[error("Invalid attribute or editing of attribute not supported.")]
    InvalidAttribute,
    #[error("Attribute value not updated due to incorrect/empty given value.")]
    InvalidValue,
}

/// Session value bound by an assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    /// Interpret a literal: integers (decimal or `0x` hex), floats,
    /// `true`/`false`, or a quoted or bare string.
    pub fn parse(literal: &str) -> Self {
        let literal = literal.trim();
        if let Some(hex) = literal
            .strip_prefix("0x")
            .or_else(|| literal.strip_prefix("0X"))
        {
            if let Ok(value) = i64::from_str_radix(hex, 16) {
                return Value::Int(value);
            }
        }
        if let Ok(value) = literal.parse::<i64>() {
            return Value::Int(value);
        }
        if let Ok(value) = literal.parse::<f64>() {
            return Value::Float(value);
        }
        match literal.to_lowercase().as_str() {
            "true" => return Value::Bool(true),
            "false" => return Value::Bool(false),
            _ => {}
        }
        let unquoted = literal
            .strip_prefix('"')
            .and_then(|rest| rest.strip_suffix('"'))
            .unwrap_or(literal);
        Value::Text(unquoted.to_string())
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Int(value) => *value != 0,
            Value::Float(value) => *value != 0.0,
            Value::Text(text) => !text.is_empty(),
            Value::Bool(flag) => *flag,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(value) => write!(f, "{value}"),
            Value::Float(value) => write!(f, "{value}"),
            Value::Text(text) => f.write_str(text),
            Value::Bool(flag) => write!(f, "{flag}"),
        }
    }
}

/// Editable symbol attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Chan,
    Addr,
    DataType,
    Min,
    Max,
    Ofst1,
    Ofst2,
    Ofst3,
    Ofst4,
    Slpe,
    Bias,
    Mask,
    Id,
    Ofst,
    Mask1,
    Mask2,
    Mask3,
    Mask4,
}

impl FromStr for Attribute {
    type Err = SymbolError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Ok(match name {
            "chan" => Attribute::Chan,
            "addr" => Attribute::Addr,
            "type" | "dtype" => Attribute::DataType,
            "min" => Attribute::Min,
            "max" => Attribute::Max,
            "ofst1" => Attribute::Ofst1,
            "ofst2" => Attribute::Ofst2,
            "ofst3" => Attribute::Ofst3,
            "ofst4" => Attribute::Ofst4,
            "slpe" => Attribute::Slpe,
            "bias" => Attribute::Bias,
            "mask" => Attribute::Mask,
            "id" => Attribute::Id,
            "ofst" => Attribute::Ofst,
            "mask1" => Attribute::Mask1,
            "mask2" => Attribute::Mask2,
            "mask3" => Attribute::Mask3,
            "mask4" => Attribute::Mask4,
            _ => return Err(SymbolError::InvalidAttribute),
        })
    }
}

/// Hardware description attached to a symbol.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolAttributes {
    pub chan: Option<u64>,
    pub addr: Option<u64>,
    pub dtype: Option<String>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub ofst1: Option<i64>,
    pub ofst2: Option<i64>,
    pub ofst3: Option<i64>,
    pub ofst4: Option<i64>,
    pub slpe: Option<f64>,
    pub slpe_text: String,
    pub bias: Option<f64>,
    pub bias_text: String,
    pub mask: Option<u64>,
    pub id: Option<i64>,
    pub ofst: Option<u64>,
    pub mask1: Option<u64>,
    pub mask2: Option<u64>,
    pub mask3: Option<u64>,
    pub mask4: Option<u64>,
}

fn parse_radix(text: &str, radix: u32, prefix: &str) -> Result<u64, SymbolError> {
    let text = text.trim();
    let digits = text.strip_prefix(prefix).unwrap_or(text);
    u64::from_str_radix(digits, radix).map_err(|_| SymbolError::InvalidValue)
}

fn parse_decimal(text: &str) -> Result<i64, SymbolError> {
    text.trim().parse().map_err(|_| SymbolError::InvalidValue)
}

fn parse_number(text: &str) -> Result<f64, SymbolError> {
    match Value::parse(text) {
        Value::Int(value) => Ok(value as f64),
        Value::Float(value) if value.is_finite() => Ok(value),
        _ => Err(SymbolError::InvalidValue),
    }
}

fn shown<T>(value: Option<T>, render: impl Fn(T) -> String) -> Option<String> {
    value.map(render)
}

impl SymbolAttributes {
    /// Current value of `attribute` as it is shown when editing; `None` when unset.
    pub fn current(&self, attribute: Attribute) -> Option<String> {
        let hex = |value: u64| format!("{value:#x}");
        let plain = |value: i64| value.to_string();
        let number = |value: f64| value.to_string();
        match attribute {
            Attribute::Chan => shown(self.chan, |value| format!("{value:#b}")),
            Attribute::Addr => shown(self.addr, hex),
            Attribute::DataType => self.dtype.clone(),
            Attribute::Min => shown(self.min, number),
            Attribute::Max => shown(self.max, number),
            Attribute::Ofst1 => shown(self.ofst1, plain),
            Attribute::Ofst2 => shown(self.ofst2, plain),
            Attribute::Ofst3 => shown(self.ofst3, plain),
            Attribute::Ofst4 => shown(self.ofst4, plain),
            Attribute::Slpe => shown(self.slpe, number),
            Attribute::Bias => shown(self.bias, number),
            Attribute::Mask => shown(self.mask, hex),
            Attribute::Id => shown(self.id, plain),
            Attribute::Ofst => shown(self.ofst, hex),
            Attribute::Mask1 => shown(self.mask1, hex),
            Attribute::Mask2 => shown(self.mask2, hex),
            Attribute::Mask3 => shown(self.mask3, hex),
            Attribute::Mask4 => shown(self.mask4, hex),
        }
    }

    /// Parse `text` in the notation of `attribute` and store it.
    ///
    /// The attribute is left unchanged when the text does not parse.
    pub fn set(&mut self, attribute: Attribute, text: &str) -> Result<(), SymbolError> {
        match attribute {
            Attribute::Chan => self.chan = Some(parse_radix(text, 2, "0b")?),
            Attribute::Addr => self.addr = Some(parse_radix(text, 16, "0x")?),
            Attribute::DataType => {
                let dtype = text.trim().to_lowercase();
                if !DATA_TYPES.contains(&dtype.as_str()) {
                    return Err(SymbolError::InvalidValue);
                }
                self.dtype = Some(dtype);
            }
            Attribute::Min => self.min = Some(parse_number(text)?),
            Attribute::Max => self.max = Some(parse_number(text)?),
            Attribute::Ofst1 => self.ofst1 = Some(parse_decimal(text)?),
            Attribute::Ofst2 => self.ofst2 = Some(parse_decimal(text)?),
            Attribute::Ofst3 => self.ofst3 = Some(parse_decimal(text)?),
            Attribute::Ofst4 => self.ofst4 = Some(parse_decimal(text)?),
            Attribute::Slpe => {
                self.slpe = Some(parse_number(text)?);
                self.slpe_text.clear();
            }
            Attribute::Bias => {
                self.bias = Some(parse_number(text)?);
                self.bias_text.clear();
            }
            Attribute::Mask => self.mask = Some(parse_radix(text, 16, "0x")?),
            Attribute::Id => self.id = Some(parse_decimal(text)?),
            Attribute::Ofst => self.ofst = Some(parse_radix(text, 16, "0x")?),
            Attribute::Mask1 => self.mask1 = Some(parse_radix(text, 16, "0x")?),
            Attribute::Mask2 => self.mask2 = Some(parse_radix(text, 16, "0x")?),
            Attribute::Mask3 => self.mask3 = Some(parse_radix(text, 16, "0x")?),
            Attribute::Mask4 => self.mask4 = Some(parse_radix(text, 16, "0x")?),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EntryData {
    Symbol(SymbolAttributes),
    Variable(Value),
    Macro(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub name: String,
    pub data: EntryData,
    /// File the entry was loaded from; `None` for names created at the prompt.
    pub source: Option<String>,
}

impl Entry {
    pub fn new(name: impl Into<String>, data: EntryData, source: Option<String>) -> Self {
        Self {
            name: name.into(),
            data,
            source,
        }
    }

    pub fn is_symbol(&self) -> bool {
        matches!(self.data, EntryData::Symbol(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolTable {
    entries: BTreeMap<String, Entry>,
    cache_version: String,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: Entry) -> Option<Entry> {
        self.entries.insert(entry.name.clone(), entry)
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Entry> {
        self.entries.get_mut(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Entry> {
        self.entries.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry; the version stamp is kept.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Distinct files that contributed entries, sorted.
    pub fn external_sources(&self) -> Vec<String> {
        self.entries
            .values()
            .filter_map(|entry| entry.source.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Remove every entry loaded from `file`, matched either exactly or by
    /// file name.
    pub fn purge_file(&mut self, file: &str) -> Result<usize, SymbolError> {
        let wanted = Path::new(file);
        let bare_name = wanted.components().count() == 1;
        let matches = |source: &str| {
            source == file || (bare_name && Path::new(source).file_name() == wanted.file_name())
        };
        let before = self.entries.len();
        self.entries
            .retain(|_, entry| !entry.source.as_deref().is_some_and(matches));
        let removed = before - self.entries.len();
        if removed == 0 {
            return Err(SymbolError::NothingLoadedFrom(file.to_string()));
        }
        Ok(removed)
    }

    /// Change one attribute of a symbol entry.
    pub fn edit_attribute(
        &mut self,
        name: &str,
        attribute: &str,
        text: &str,
    ) -> Result<(), SymbolError> {
        let attributes = self.symbol_attributes_mut(name)?;
        let attribute = attribute.parse::<Attribute>()?;
        attributes.set(attribute, text)
    }

    pub fn symbol_attributes_mut(&mut self, name: &str) -> Result<&mut SymbolAttributes, SymbolError> {
        match self.entries.get_mut(name) {
            None => Err(SymbolError::NotFound),
            Some(Entry {
                data: EntryData::Symbol(attributes),
                ..
            }) => Ok(attributes),
            Some(_) => Err(SymbolError::NotASymbol),
        }
    }

    pub fn cache_version(&self) -> &str {
        &self.cache_version
    }

    pub fn update_cache_version(&mut self, version: impl Into<String>) {
        self.cache_version = version.into();
    }
}
