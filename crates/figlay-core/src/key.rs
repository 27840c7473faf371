#![forbid(unsafe_code)]

//! Placement keys.
//!
//! Every placement request (`add_axes`, `add_subplot`, ...) is reduced to a
//! [`PlacementKey`] built from its positional and named arguments. Two
//! requests with value-equal arguments produce equal keys and therefore
//! resolve to the same panel.
//!
//! # Normalization rules
//!
//! | Input                        | Atom                                  |
//! |------------------------------|---------------------------------------|
//! | `List` (any depth)           | `Tuple`, element-wise normalized      |
//! | integral `Float` (|x| < 2^53)| `Int` (so `1` and `1.0` collide)      |
//! | `-0.0`                       | `Int(0)`                              |
//! | `NaN` float                  | fresh `Sentinel`                      |
//! | `Opaque`                     | fresh `Sentinel`                      |
//!
//! A sentinel is unique per normalization, so a key containing one is only
//! ever equal to itself (cloned) and never aliases another request.

use std::fmt;

use crate::id::{GridId, PanelId, next_sentinel};

/// Largest magnitude at which every integer is exactly representable in f64.
const EXACT_INT_LIMIT: f64 = 9_007_199_254_740_992.0;

/// Identity of a grid slot inside a placement key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotKey {
    /// Grid the slot belongs to.
    pub grid: GridId,
    /// Half-open row span.
    pub rows: (u16, u16),
    /// Half-open column span.
    pub cols: (u16, u16),
}

/// A raw placement argument, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyArg {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// A list-like value; normalized to a fixed tuple.
    List(Vec<KeyArg>),
    /// An existing panel passed as an argument.
    Panel(PanelId),
    /// A grid slot.
    Slot(SlotKey),
    /// A value with no usable equality (callbacks, foreign handles).
    Opaque,
}

impl From<i64> for KeyArg {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for KeyArg {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u32> for KeyArg {
    fn from(v: u32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<u16> for KeyArg {
    fn from(v: u16) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for KeyArg {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for KeyArg {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for KeyArg {
    fn from(v: &str) -> Self {
        Self::Str(v.to_owned())
    }
}

impl From<String> for KeyArg {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<PanelId> for KeyArg {
    fn from(v: PanelId) -> Self {
        Self::Panel(v)
    }
}

impl From<SlotKey> for KeyArg {
    fn from(v: SlotKey) -> Self {
        Self::Slot(v)
    }
}

impl From<[f64; 4]> for KeyArg {
    fn from(v: [f64; 4]) -> Self {
        Self::List(v.iter().copied().map(Self::Float).collect())
    }
}

impl<T: Into<KeyArg>> From<Vec<T>> for KeyArg {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<KeyArg>> From<Option<T>> for KeyArg {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::None, Into::into)
    }
}

/// A normalized, hashable placement argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyAtom {
    None,
    Bool(bool),
    Int(i64),
    /// Bit pattern of a finite or infinite, non-integral float.
    Float(u64),
    Str(String),
    Tuple(Vec<KeyAtom>),
    Panel(PanelId),
    Slot(SlotKey),
    /// Stand-in for a value that cannot be compared.
    Sentinel(u64),
}

impl fmt::Display for KeyAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(bits) => write!(f, "{}", f64::from_bits(*bits)),
            Self::Str(s) => write!(f, "{s:?}"),
            Self::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                if items.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Self::Panel(id) => write!(f, "{id}"),
            Self::Slot(slot) => write!(
                f,
                "{}[{}:{}, {}:{}]",
                slot.grid, slot.rows.0, slot.rows.1, slot.cols.0, slot.cols.1
            ),
            Self::Sentinel(n) => write!(f, "<opaque#{n}>"),
        }
    }
}

/// Canonical identity of a placement request.
///
/// Named arguments keep the order they were supplied in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlacementKey {
    args: Vec<KeyAtom>,
    kwargs: Vec<(String, KeyAtom)>,
}

impl PlacementKey {
    /// Normalized positional arguments.
    #[must_use]
    pub fn args(&self) -> &[KeyAtom] {
        &self.args
    }

    /// Normalized named arguments, in supplied order.
    #[must_use]
    pub fn kwargs(&self) -> &[(String, KeyAtom)] {
        &self.kwargs
    }

    /// Look up a named argument.
    #[must_use]
    pub fn kwarg(&self, name: &str) -> Option<&KeyAtom> {
        self.kwargs
            .iter()
            .find_map(|(k, v)| (k == name).then_some(v))
    }

    /// True when both keys carry identical named arguments, ignoring the
    /// positional part.
    #[must_use]
    pub fn same_options(&self, other: &Self) -> bool {
        self.kwargs == other.kwargs
    }

    /// True when some atom is a sentinel (the key can only match itself).
    #[must_use]
    pub fn is_unique(&self) -> bool {
        fn has_sentinel(atom: &KeyAtom) -> bool {
            match atom {
                KeyAtom::Sentinel(_) => true,
                KeyAtom::Tuple(items) => items.iter().any(has_sentinel),
                _ => false,
            }
        }
        self.args.iter().any(has_sentinel) || self.kwargs.iter().any(|(_, v)| has_sentinel(v))
    }
}

impl fmt::Display for PlacementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        let mut first = true;
        for atom in &self.args {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{atom}")?;
        }
        for (name, atom) in &self.kwargs {
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{name}={atom}")?;
        }
        write!(f, ")")
    }
}

/// Builds [`PlacementKey`]s from raw arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyCodec;

impl KeyCodec {
    /// Normalize positional and named arguments into a key. Never fails.
    #[must_use]
    pub fn encode<'a, I>(args: &[KeyArg], kwargs: I) -> PlacementKey
    where
        I: IntoIterator<Item = (&'a str, &'a KeyArg)>,
    {
        PlacementKey {
            args: args.iter().map(Self::normalize).collect(),
            kwargs: kwargs
                .into_iter()
                .map(|(name, value)| (name.to_owned(), Self::normalize(value)))
                .collect(),
        }
    }

    /// Normalize a single argument.
    #[must_use]
    pub fn normalize(arg: &KeyArg) -> KeyAtom {
        match arg {
            KeyArg::None => KeyAtom::None,
            KeyArg::Bool(b) => KeyAtom::Bool(*b),
            KeyArg::Int(i) => KeyAtom::Int(*i),
            KeyArg::Float(x) => Self::normalize_float(*x),
            KeyArg::Str(s) => KeyAtom::Str(s.clone()),
            KeyArg::List(items) => KeyAtom::Tuple(items.iter().map(Self::normalize).collect()),
            KeyArg::Panel(id) => KeyAtom::Panel(*id),
            KeyArg::Slot(slot) => KeyAtom::Slot(*slot),
            KeyArg::Opaque => KeyAtom::Sentinel(next_sentinel()),
        }
    }

    fn normalize_float(x: f64) -> KeyAtom {
        if x.is_nan() {
            return KeyAtom::Sentinel(next_sentinel());
        }
        if x.fract() == 0.0 && x.abs() < EXACT_INT_LIMIT {
            return KeyAtom::Int(x as i64);
        }
        // -0.0 is integral and handled above; remaining values have a unique
        // bit pattern per value.
        KeyAtom::Float(x.to_bits())
    }
}
