//! Argument presence checks.
//!
//! Once variables have been deserialized into typed inputs, an omitted field and
//! a field explicitly set to its zero value look the same. [`FieldChecker`] looks
//! at the raw variables instead, so partial updates can tell them apart.

use std::borrow::Cow;

use crate::json_ext::Object;
use crate::json_ext::Value;

/// Maps one segment of a field path to the variables key it is stored under.
pub type KeyMapper = fn(&str) -> Cow<'_, str>;

/// Something that knows which fields a caller supplied.
pub trait Checker {
    /// Whether the caller supplied a value for the dot separated `field` path,
    /// e.g. `"Input.Name"`.
    fn field_provided(&self, field: &str) -> bool;
}

/// Lower cases the first character of `segment`: `Input` is looked up as `input`.
pub fn lowercase_first(segment: &str) -> Cow<'_, str> {
    let mut chars = segment.chars();
    match chars.next() {
        Some(first) if !first.is_lowercase() => {
            Cow::Owned(first.to_lowercase().chain(chars).collect())
        }
        _ => Cow::Borrowed(segment),
    }
}

/// Uses path segments as variable keys without any conversion.
pub fn verbatim(segment: &str) -> Cow<'_, str> {
    Cow::Borrowed(segment)
}

/// A [`Checker`] over a request's variables.
///
/// Path segments go through a [`KeyMapper`] before lookup, [`lowercase_first`]
/// by default, to bridge capitalized field names and camel cased variables.
#[derive(Clone, Copy, Debug)]
pub struct FieldChecker<'a> {
    args: &'a Object,
    key_mapper: KeyMapper,
}

impl<'a> FieldChecker<'a> {
    pub fn new(args: &'a Object) -> Self {
        Self {
            args,
            key_mapper: lowercase_first,
        }
    }

    /// Replace the segment to key conversion.
    pub fn with_key_mapper(mut self, key_mapper: KeyMapper) -> Self {
        self.key_mapper = key_mapper;
        self
    }

    /// The variables backing this checker, as supplied.
    pub fn provided_fields(&self) -> &'a Object {
        self.args
    }

    fn step(&self, args: &Object, path: &[&str]) -> bool {
        let Some((segment, rest)) = path.split_first() else {
            return false;
        };
        let key = (self.key_mapper)(segment);
        match args.get(&*key) {
            None => false,
            Some(_) if rest.is_empty() => true,
            Some(Value::Object(nested)) => self.step(nested, rest),
            // A scalar (or list, or null) ends the walk early and counts as provided.
            Some(_) => true,
        }
    }
}

impl Checker for FieldChecker<'_> {
    fn field_provided(&self, field: &str) -> bool {
        let path: Vec<&str> = field.split('.').collect();
        self.step(self.args, &path)
    }
}
