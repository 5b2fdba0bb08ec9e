//! Display groups and the field specification grammar.
//!
//! Each command-line argument describes one chart:
//!
//! ```text
//! mem.heap+mem.sys+mem.stack
//! counter:cpu.sTime+counter:cpu.uTime
//! marker:gc.running+threads
//! ```
//!
//! Fields inside a group are joined with `+`. A field name may carry any
//! number of `counter:` / `marker:` prefixes in any order.

use std::fmt;

/// A single metric series within a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Unique within a run, derived from position and name.
    pub id: String,
    pub name: String,
    /// Raw values are cumulative and get converted to per-interval deltas.
    pub counter: bool,
    /// Rendered as vertical markers wherever the value is positive.
    pub marker: bool,
}

/// Fields drawn together as one chart.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GraphSpec {
    pub fields: Vec<Field>,
}

impl GraphSpec {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }
}

/// Iterates over every field of every group in declaration order.
pub fn all_fields(specs: &[GraphSpec]) -> impl Iterator<Item = &Field> {
    specs.iter().flat_map(|spec| spec.fields.iter())
}

/// Errors in the field specification grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecError {
    /// No group arguments were given.
    NoGroups,
    /// A group argument was empty.
    EmptyGroup { group: usize },
    /// A field had no name after its prefixes.
    EmptyName { group: usize, field: usize },
    /// A prefix other than `counter` or `marker`.
    UnknownOption { option: String },
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecError::NoGroups => write!(f, "no fields to graph"),
            SpecError::EmptyGroup { group } => write!(f, "group {} is empty", group),
            SpecError::EmptyName { group, field } => {
                write!(f, "field {} of group {} has no name", field, group)
            }
            SpecError::UnknownOption { option } => write!(f, "invalid field option: {}", option),
        }
    }
}

impl std::error::Error for SpecError {}

/// Parses one argument per display group.
pub fn parse_specs<S: AsRef<str>>(args: &[S]) -> Result<Vec<GraphSpec>, SpecError> {
    if args.is_empty() {
        return Err(SpecError::NoGroups);
    }

    args.iter()
        .enumerate()
        .map(|(i, arg)| parse_group(i, arg.as_ref()))
        .collect()
}

fn parse_group(group: usize, arg: &str) -> Result<GraphSpec, SpecError> {
    if arg.trim().is_empty() {
        return Err(SpecError::EmptyGroup { group });
    }

    let fields = arg
        .split('+')
        .enumerate()
        .map(|(j, raw)| parse_field(group, j, raw))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GraphSpec::new(fields))
}

fn parse_field(group: usize, index: usize, raw: &str) -> Result<Field, SpecError> {
    let mut parts: Vec<&str> = raw.split(':').collect();
    let name = parts.pop().unwrap_or_default().trim();

    let mut counter = false;
    let mut marker = false;
    for option in parts {
        match option.trim() {
            "counter" => counter = true,
            "marker" => marker = true,
            other => {
                return Err(SpecError::UnknownOption {
                    option: other.to_string(),
                });
            }
        }
    }

    if name.is_empty() {
        return Err(SpecError::EmptyName {
            group,
            field: index,
        });
    }

    Ok(Field {
        id: format!("{}.{}.{}", group, index, name),
        name: name.to_string(),
        counter,
        marker,
    })
}
