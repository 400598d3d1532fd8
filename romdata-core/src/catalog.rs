use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

const GEN2_OFFSETS: &str = include_str!("../data/gen2_offsets.ini");
const GEN7_OFFSETS: &str = include_str!("../data/gen7_offsets.ini");

/// Errors raised while parsing a catalog resource or reading an entry.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("line {line}: key/value pair outside of a [section]")]
    OrphanEntry { line: usize },

    #[error("line {line}: expected Key=Value, got '{text}'")]
    MissingEquals { line: usize, text: String },

    #[error("line {line}: unterminated section header '{text}'")]
    BadSection { line: usize, text: String },

    #[error("failed to parse integer '{token}' on line {line}")]
    ParseInt {
        line: usize,
        token: String,
        #[source]
        source: std::num::ParseIntError,
    },

    #[error("line {line}: CopyFrom refers to unknown entry '{name}'")]
    UnknownCopySource { line: usize, name: String },

    #[error("line {line}: entry '{name}' is defined twice")]
    DuplicateEntry { line: usize, name: String },

    #[error("entry '{name}' does not declare a Generation")]
    MissingGeneration { name: String },

    #[error("entry '{entry}' is missing key '{key}'")]
    MissingKey { entry: String, key: String },

    #[error("entry '{entry}' key '{key}' is not {expected}")]
    WrongType {
        entry: String,
        key: String,
        expected: &'static str,
    },

    #[error("IO error reading catalog: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Generation {
    /// Flat-bank cartridges (Gold, Silver, Crystal).
    Gen2,
    /// Archive-based 3D titles (Sun, Moon, Ultra Sun, Ultra Moon).
    Gen7,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Int(i64),
    Array(Vec<i64>),
    /// Array written with `a:b` tokens; a bare `a` leaves the second half open.
    Pairs(Vec<(i64, Option<i64>)>),
    Bool(bool),
    Str(String),
}

/// Layout descriptor for one title.
#[derive(Clone, Debug)]
pub struct RomEntry {
    pub name: String,
    pub generation: Generation,
    values: BTreeMap<String, Value>,
}

impl RomEntry {
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    fn missing(&self, key: &str) -> CatalogError {
        CatalogError::MissingKey {
            entry: self.name.clone(),
            key: key.to_string(),
        }
    }

    fn wrong_type(&self, key: &str, expected: &'static str) -> CatalogError {
        CatalogError::WrongType {
            entry: self.name.clone(),
            key: key.to_string(),
            expected,
        }
    }

    pub fn opt_int(&self, key: &str) -> Result<Option<usize>, CatalogError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(Value::Int(v)) if *v >= 0 => Ok(Some(*v as usize)),
            Some(_) => Err(self.wrong_type(key, "a non-negative integer")),
        }
    }

    pub fn int(&self, key: &str) -> Result<usize, CatalogError> {
        self.opt_int(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn int_or(&self, key: &str, default: usize) -> Result<usize, CatalogError> {
        Ok(self.opt_int(key)?.unwrap_or(default))
    }

    /// Large identifiers such as title IDs.
    pub fn opt_u64(&self, key: &str) -> Result<Option<u64>, CatalogError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(Value::Int(v)) => Ok(Some(*v as u64)),
            Some(_) => Err(self.wrong_type(key, "an integer")),
        }
    }

    pub fn array(&self, key: &str) -> Result<Vec<usize>, CatalogError> {
        self.opt_array(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn opt_array(&self, key: &str) -> Result<Option<Vec<usize>>, CatalogError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(Value::Array(items)) if items.iter().all(|v| *v >= 0) => {
                Ok(Some(items.iter().map(|v| *v as usize).collect()))
            }
            Some(_) => Err(self.wrong_type(key, "an array of non-negative integers")),
        }
    }

    /// `(species, form)` exceptions. A bare species number stands for every
    /// form of that species.
    pub fn opt_form_list(
        &self,
        key: &str,
    ) -> Result<Option<Vec<(usize, Option<usize>)>>, CatalogError> {
        let pairs: Vec<(i64, Option<i64>)> = match self.values.get(key) {
            None => return Ok(None),
            Some(Value::Array(items)) => items.iter().map(|&v| (v, None)).collect(),
            Some(Value::Pairs(pairs)) => pairs.clone(),
            Some(_) => return Err(self.wrong_type(key, "a list of species[:form] numbers")),
        };
        pairs
            .into_iter()
            .map(|(species, form)| match form {
                _ if species < 0 => Err(self.wrong_type(key, "a list of species[:form] numbers")),
                Some(f) if f < 0 => Err(self.wrong_type(key, "a list of species[:form] numbers")),
                f => Ok((species as usize, f.map(|f| f as usize))),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some)
    }

    pub fn string(&self, key: &str) -> Result<&str, CatalogError> {
        self.opt_string(key)?.ok_or_else(|| self.missing(key))
    }

    pub fn opt_string(&self, key: &str) -> Result<Option<&str>, CatalogError> {
        match self.values.get(key) {
            None => Ok(None),
            Some(Value::Str(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(self.wrong_type(key, "a string")),
        }
    }

    /// Booleans may be written as `true`/`false` or `1`/`0`; absent means false.
    pub fn flag(&self, key: &str) -> bool {
        match self.values.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::Int(v)) => *v != 0,
            _ => false,
        }
    }
}

/// Immutable set of known titles.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    entries: Vec<RomEntry>,
}

impl Catalog {
    pub fn parse(src: &str) -> Result<Self, CatalogError> {
        let sections = parse_sections(src)?;
        let mut entries = Vec::with_capacity(sections.len());
        for (name, values) in sections {
            let generation = match values.get("Generation") {
                Some(Value::Int(2)) => Generation::Gen2,
                Some(Value::Int(7)) => Generation::Gen7,
                _ => return Err(CatalogError::MissingGeneration { name }),
            };
            entries.push(RomEntry {
                name,
                generation,
                values,
            });
        }
        Ok(Catalog { entries })
    }

    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let src = fs::read_to_string(path)?;
        Self::parse(&src)
    }

    pub fn merge(&mut self, other: Catalog) {
        self.entries.extend(other.entries);
    }

    pub fn entries(&self) -> &[RomEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&RomEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    /// Matches a cartridge image by cartridge code (0x13F), version (0x14C),
    /// destination code (0x14A) and, when catalogued, header checksum (0x14D).
    pub fn find_cartridge(&self, rom: &[u8]) -> Option<&RomEntry> {
        if rom.len() < 0x150 {
            return None;
        }
        let code = String::from_utf8_lossy(&rom[0x13F..0x143]).to_string();
        let version = rom[0x14C] as usize;
        let non_japanese = rom[0x14A] as usize;
        let header_checksum = rom[0x14D] as usize;

        self.entries
            .iter()
            .filter(|e| e.generation == Generation::Gen2)
            .find(|e| {
                matches!(e.opt_string("Game"), Ok(Some(game)) if game == code)
                    && e.opt_int("Version").ok().flatten() == Some(version)
                    && e.opt_int("NonJapanese").ok().flatten() == Some(non_japanese)
                    && match e.opt_int("HeaderChecksum") {
                        Ok(Some(expected)) => expected == header_checksum,
                        _ => true,
                    }
            })
    }

    /// Matches an extracted 3D title by title ID; the product code is
    /// compared only when the dump provides one.
    pub fn find_archive_title(
        &self,
        product_code: &Option<String>,
        title_id: u64,
    ) -> Option<&RomEntry> {
        self.entries
            .iter()
            .filter(|e| e.generation == Generation::Gen7)
            .find(|e| {
                e.opt_u64("TitleId").ok().flatten() == Some(title_id)
                    && match (product_code, e.opt_string("Game")) {
                        (Some(found), Ok(Some(expected))) => found == expected,
                        _ => true,
                    }
            })
    }
}

static BUILTIN: OnceLock<Catalog> = OnceLock::new();

/// The embedded catalog, parsed on first use and never mutated.
pub fn builtin() -> Result<&'static Catalog, CatalogError> {
    if let Some(catalog) = BUILTIN.get() {
        return Ok(catalog);
    }
    let mut catalog = Catalog::parse(GEN2_OFFSETS)?;
    catalog.merge(Catalog::parse(GEN7_OFFSETS)?);
    Ok(BUILTIN.get_or_init(|| catalog))
}

fn parse_int(line: usize, token: &str) -> Result<i64, CatalogError> {
    let t = token.trim();
    let res = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else {
        t.parse::<i64>()
    };

    res.map_err(|e| CatalogError::ParseInt {
        line,
        token: t.to_string(),
        source: e,
    })
}

fn looks_numeric(token: &str) -> bool {
    let t = token.trim();
    t.starts_with("0x")
        || t.starts_with("0X")
        || (!t.is_empty() && t.chars().all(|c| c.is_ascii_digit() || c == '-'))
}

fn parse_value(line: usize, raw: &str) -> Result<Value, CatalogError> {
    let raw = raw.trim();
    if let Some(inner) = raw.strip_prefix('[') {
        let inner = inner.strip_suffix(']').unwrap_or(inner);
        let tokens: Vec<&str> = inner.split(',').filter(|t| !t.trim().is_empty()).collect();
        if tokens.iter().any(|t| t.contains(':')) {
            let mut pairs = Vec::with_capacity(tokens.len());
            for token in tokens {
                pairs.push(match token.split_once(':') {
                    Some((a, b)) => (parse_int(line, a)?, Some(parse_int(line, b)?)),
                    None => (parse_int(line, token)?, None),
                });
            }
            return Ok(Value::Pairs(pairs));
        }
        let mut items = Vec::with_capacity(tokens.len());
        for token in tokens {
            items.push(parse_int(line, token)?);
        }
        return Ok(Value::Array(items));
    }
    if raw.eq_ignore_ascii_case("true") {
        return Ok(Value::Bool(true));
    }
    if raw.eq_ignore_ascii_case("false") {
        return Ok(Value::Bool(false));
    }
    if looks_numeric(raw) {
        return Ok(Value::Int(parse_int(line, raw)?));
    }
    Ok(Value::Str(raw.to_string()))
}

type Section = (String, BTreeMap<String, Value>);

fn parse_sections(src: &str) -> Result<Vec<Section>, CatalogError> {
    let mut sections: Vec<Section> = Vec::new();

    for (idx, raw_line) in src.lines().enumerate() {
        let line = idx + 1;
        let text = raw_line.trim();
        if text.is_empty() || text.starts_with(';') || text.starts_with('#') {
            continue;
        }

        if let Some(rest) = text.strip_prefix('[') {
            let name = rest.strip_suffix(']').ok_or_else(|| CatalogError::BadSection {
                line,
                text: text.to_string(),
            })?;
            let name = name.trim().to_string();
            if sections.iter().any(|(n, _)| *n == name) {
                return Err(CatalogError::DuplicateEntry { line, name });
            }
            sections.push((name, BTreeMap::new()));
            continue;
        }

        let (key, value) = text.split_once('=').ok_or_else(|| CatalogError::MissingEquals {
            line,
            text: text.to_string(),
        })?;
        let key = key.trim();

        if key == "CopyFrom" {
            let source = value.trim();
            let inherited = sections
                .iter()
                .find(|(n, _)| n == source)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| CatalogError::UnknownCopySource {
                    line,
                    name: source.to_string(),
                })?;
            let (_, current) = sections
                .last_mut()
                .ok_or(CatalogError::OrphanEntry { line })?;
            for (k, v) in inherited {
                current.insert(k, v);
            }
            continue;
        }

        let parsed = parse_value(line, value)?;
        let (_, current) = sections
            .last_mut()
            .ok_or(CatalogError::OrphanEntry { line })?;
        current.insert(key.to_string(), parsed);
    }

    Ok(sections)
}
