use sbdf_array::{Value, Values};
use sbdf_dtype::ValueType;
use sbdf_error::{SbdfResult, sbdf_bail, sbdf_err};

/// A named metadata value with an optional default.
///
/// Entries created through [`Metadata::add`] always carry a value. Entries read from a file
/// may carry only a default.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataEntry {
    name: String,
    value_type: ValueType,
    value: Option<Value>,
    default: Option<Value>,
}

impl MetadataEntry {
    pub(crate) fn new(
        name: String,
        value_type: ValueType,
        value: Option<Value>,
        default: Option<Value>,
    ) -> Self {
        Self {
            name,
            value_type,
            value,
            default,
        }
    }

    /// The entry name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The type of both the value and the default.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// The value, if one was set.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The default, if one was set.
    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }
}

/// An insertion-ordered collection of uniquely named metadata entries.
///
/// Once locked with [`Metadata::set_immutable`] every mutation fails with `MetadataReadOnly`.
///
/// Two collections are equal when they hold the same entries, in any order and regardless of
/// whether they are locked.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    entries: Vec<MetadataEntry>,
    readonly: bool,
}

impl PartialEq for Metadata {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len()
            && self
                .entries
                .iter()
                .all(|entry| other.entries.contains(entry))
    }
}

fn single(values: &Values, what: &str, name: &str) -> SbdfResult<Value> {
    if values.len() != 1 {
        sbdf_bail!(
            ArrayLengthMustBe1: "metadata {} of {} has {} elements",
            what,
            name,
            values.len()
        );
    }
    values.value(0)
}

impl Metadata {
    /// An empty, mutable collection.
    pub fn new() -> Self {
        Self::default()
    }

    fn check_writable(&self, name: &str) -> SbdfResult<()> {
        if self.readonly {
            sbdf_bail!(MetadataReadOnly: "cannot modify {}, metadata is read only", name);
        }
        Ok(())
    }

    /// Add an entry. `value` and `default` must each hold exactly one element of the same type.
    pub fn add(&mut self, name: &str, value: &Values, default: Option<&Values>) -> SbdfResult<()> {
        let value = single(value, "value", name)?;
        let default = default.map(|d| single(d, "default", name)).transpose()?;
        self.add_value(name, value, default)
    }

    /// Add an entry from single values.
    pub fn add_value(&mut self, name: &str, value: Value, default: Option<Value>) -> SbdfResult<()> {
        self.check_writable(name)?;
        if self.exists(name) {
            sbdf_bail!(MetadataAlreadyExists: "metadata {} already exists", name);
        }
        let value_type = value.value_type();
        if let Some(default) = &default {
            if default.value_type() != value_type {
                sbdf_bail!(
                    IncorrectMetadata: "default of {} is {} but the value is {}",
                    name,
                    default.value_type(),
                    value_type
                );
            }
        }
        self.entries.push(MetadataEntry::new(
            name.to_string(),
            value_type,
            Some(value),
            default,
        ));
        Ok(())
    }

    /// Add a String entry.
    pub fn add_str(&mut self, name: &str, value: &str, default: Option<&str>) -> SbdfResult<()> {
        self.add_value(name, Value::from(value), default.map(Value::from))
    }

    /// Add an Int32 entry.
    pub fn add_i32(&mut self, name: &str, value: i32, default: Option<i32>) -> SbdfResult<()> {
        self.add_value(name, Value::Int32(value), default.map(Value::Int32))
    }

    /// Add a Bool entry.
    pub fn add_bool(&mut self, name: &str, value: bool, default: Option<bool>) -> SbdfResult<()> {
        self.add_value(name, Value::Bool(value), default.map(Value::Bool))
    }

    /// Add an entry as read from a file, where value and default are both optional.
    pub(crate) fn push_entry(&mut self, entry: MetadataEntry) -> SbdfResult<()> {
        if self.exists(&entry.name) {
            sbdf_bail!(IncorrectMetadata: "metadata {} appears more than once", entry.name);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Remove an entry, returning it.
    pub fn remove(&mut self, name: &str) -> SbdfResult<MetadataEntry> {
        self.check_writable(name)?;
        let idx = self
            .position(name)
            .ok_or_else(|| sbdf_err!(MetadataNotFound: "metadata {} not found", name))?;
        Ok(self.entries.remove(idx))
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name == name)
    }

    /// The entry named `name`.
    pub fn entry(&self, name: &str) -> SbdfResult<&MetadataEntry> {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .ok_or_else(|| sbdf_err!(MetadataNotFound: "metadata {} not found", name))
    }

    /// The value of `name`, or its default when the entry only has a default.
    pub fn get(&self, name: &str) -> SbdfResult<&Value> {
        let entry = self.entry(name)?;
        entry
            .value
            .as_ref()
            .or(entry.default.as_ref())
            .ok_or_else(|| sbdf_err!(MetadataNotFound: "metadata {} has neither value nor default", name))
    }

    /// The default of `name`.
    pub fn get_default(&self, name: &str) -> SbdfResult<&Value> {
        self.entry(name)?
            .default
            .as_ref()
            .ok_or_else(|| sbdf_err!(MetadataNotFound: "metadata {} has no default", name))
    }

    /// The value of `name`, or `default` when there is no such entry.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a Value) -> &'a Value {
        self.get(name).unwrap_or(default)
    }

    /// Lock the collection. Idempotent.
    pub fn set_immutable(&mut self) {
        self.readonly = true;
    }

    /// Lock the collection and return it.
    pub fn lock(mut self) -> Self {
        self.set_immutable();
        self
    }

    /// Whether the collection is locked.
    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    /// Whether an entry named `name` exists.
    pub fn exists(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// The number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &MetadataEntry> + '_ {
        self.entries.iter()
    }

    /// The entry names in insertion order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.iter().map(|e| e.name.as_str())
    }
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use sbdf_error::ErrorKind;

    use super::*;

    #[test]
    fn equality_ignores_order_and_lock() {
        let mut first = Metadata::new();
        first.add_str("a", "x", None).unwrap();
        first.add_i32("b", 1, Some(0)).unwrap();
        let mut second = Metadata::new();
        second.add_i32("b", 1, Some(0)).unwrap();
        second.add_str("a", "x", None).unwrap();
        assert_eq!(first, second.lock());

        let mut third = Metadata::new();
        third.add_i32("b", 1, None).unwrap();
        third.add_str("a", "x", None).unwrap();
        assert_ne!(first, third);
    }

    #[test]
    fn add_and_get() {
        let mut metadata = Metadata::new();
        metadata.add_str("Description", "sales", None).unwrap();
        metadata.add_i32("Version", 3, Some(1)).unwrap();
        metadata
            .add("Flag", &Values::from_bools(&[true]), Some(&Values::from_bools(&[false])))
            .unwrap();

        assert_eq!(metadata.len(), 3);
        assert_eq!(metadata.get("Description").unwrap(), &Value::from("sales"));
        assert_eq!(metadata.get_default("Version").unwrap(), &Value::Int32(1));
        assert_eq!(
            metadata.get_default("Description").unwrap_err().kind(),
            ErrorKind::MetadataNotFound
        );
        assert_eq!(
            metadata.names().collect::<Vec<_>>(),
            vec!["Description", "Version", "Flag"]
        );
    }

    #[rstest]
    #[case(Values::from_i32s(&[]), None, ErrorKind::ArrayLengthMustBe1)]
    #[case(Values::from_i32s(&[1, 2]), None, ErrorKind::ArrayLengthMustBe1)]
    #[case(Values::from_i32s(&[1]), Some(Values::from_i32s(&[1, 2])), ErrorKind::ArrayLengthMustBe1)]
    #[case(Values::from_i32s(&[1]), Some(Values::from_strs(["x"])), ErrorKind::IncorrectMetadata)]
    fn add_rejects(
        #[case] value: Values,
        #[case] default: Option<Values>,
        #[case] kind: ErrorKind,
    ) {
        let mut metadata = Metadata::new();
        let err = metadata.add("bad", &value, default.as_ref()).unwrap_err();
        assert_eq!(err.kind(), kind);
        assert!(metadata.is_empty());
    }

    #[test]
    fn duplicates_and_removal() {
        let mut metadata = Metadata::new();
        metadata.add_bool("a", true, None).unwrap();
        assert_eq!(
            metadata.add_bool("a", false, None).unwrap_err().kind(),
            ErrorKind::MetadataAlreadyExists
        );
        assert_eq!(metadata.remove("a").unwrap().value(), Some(&Value::Bool(true)));
        assert_eq!(metadata.remove("a").unwrap_err().kind(), ErrorKind::MetadataNotFound);
        assert!(!metadata.exists("a"));
    }

    #[test]
    fn locked_metadata_is_read_only() {
        let mut metadata = Metadata::new();
        metadata.add_str("kept", "x", None).unwrap();
        let mut metadata = metadata.lock();
        metadata.set_immutable();
        assert!(metadata.is_readonly());
        assert_eq!(
            metadata.add_str("new", "y", None).unwrap_err().kind(),
            ErrorKind::MetadataReadOnly
        );
        assert_eq!(metadata.remove("kept").unwrap_err().kind(), ErrorKind::MetadataReadOnly);

        let copy = metadata.clone();
        assert!(copy.is_readonly());
        assert_eq!(copy, metadata);
    }

    #[test]
    fn get_or_falls_back() {
        let metadata = Metadata::new();
        let fallback = Value::Int32(9);
        assert_eq!(metadata.get_or("missing", &fallback), &fallback);
        assert_eq!(metadata.get("missing").unwrap_err().kind(), ErrorKind::MetadataNotFound);
    }

    #[test]
    fn default_only_entries() {
        let mut metadata = Metadata::new();
        metadata
            .push_entry(MetadataEntry::new(
                "d".to_string(),
                ValueType::Int32,
                None,
                Some(Value::Int32(5)),
            ))
            .unwrap();
        assert_eq!(metadata.get("d").unwrap(), &Value::Int32(5));
        assert_eq!(metadata.entry("d").unwrap().value(), None);
    }
}
