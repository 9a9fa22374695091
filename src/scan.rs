//! Scan-target protocol and slot resolution.
//!
//! A result type lists its destination slots in column order. Resolution
//! flattens one or more candidates into the slot sequence a row is scanned
//! into. Column order is the only correspondence between a query's SELECT
//! list and a type's fields.

use crate::error::{Error, Result};
use crate::value::{ConversionError, FromValue, Value};
use std::fmt;

type Assign<'a> = Box<dyn FnMut(&Value) -> std::result::Result<(), ConversionError> + 'a>;

/// A single writable destination for one column.
pub struct Slot<'a> {
    kind: &'static str,
    assign: Assign<'a>,
}

impl<'a> Slot<'a> {
    pub fn new<T: FromValue + 'a>(dest: &'a mut T) -> Self {
        Self {
            kind: std::any::type_name::<T>(),
            assign: Box::new(move |value: &Value| {
                *dest = T::from_value(value)?;
                Ok(())
            }),
        }
    }

    /// Write one column value into the destination.
    pub fn assign(&mut self, value: &Value) -> std::result::Result<(), ConversionError> {
        (self.assign)(value)
    }

    /// Type name of the destination.
    pub fn kind(&self) -> &'static str {
        self.kind
    }
}

impl fmt::Debug for Slot<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Slot").field(&self.kind).finish()
    }
}

/// A type that exposes its scan slots in the order columns arrive.
///
/// Composite types concatenate the slots of their members:
///
/// ```
/// use rust_sqlquery::{ScanTarget, Slot};
///
/// #[derive(Default)]
/// struct Audit { created_by: String }
///
/// impl ScanTarget for Audit {
///     fn fields(&mut self) -> Vec<Slot<'_>> {
///         vec![Slot::new(&mut self.created_by)]
///     }
/// }
///
/// #[derive(Default)]
/// struct Post { id: i64, audit: Audit }
///
/// impl ScanTarget for Post {
///     fn fields(&mut self) -> Vec<Slot<'_>> {
///         let mut fields = vec![Slot::new(&mut self.id)];
///         fields.extend(self.audit.fields());
///         fields
///     }
/// }
/// ```
pub trait ScanTarget {
    fn fields(&mut self) -> Vec<Slot<'_>>;
}

/// The shapes resolution accepts.
pub enum Candidate<'a> {
    Target(&'a mut dyn ScanTarget),
    Targets(Vec<&'a mut dyn ScanTarget>),
    Slot(Slot<'a>),
}

impl<'a> Candidate<'a> {
    /// A sequence candidate over a slice of targets.
    pub fn targets<S: ScanTarget>(items: &'a mut [S]) -> Self {
        Candidate::Targets(
            items
                .iter_mut()
                .map(|item| item as &mut dyn ScanTarget)
                .collect(),
        )
    }
}

/// Maps a result type onto the candidate shape used to scan into it.
///
/// Implemented for every [`ScanTarget`] and for the primitive allowlist:
/// integers of every width, `String` and `Vec<u8>`. Other types cannot be
/// used as a result type directly; wrap them in a [`ScanTarget`].
pub trait Resolve {
    fn candidate(&mut self) -> Candidate<'_>;
}

impl<T: ScanTarget> Resolve for T {
    fn candidate(&mut self) -> Candidate<'_> {
        Candidate::Target(self)
    }
}

macro_rules! resolve_as_slot {
    ($($t:ty),*) => {
        $(
            impl Resolve for $t {
                fn candidate(&mut self) -> Candidate<'_> {
                    Candidate::Slot(Slot::new(self))
                }
            }
        )*
    };
}

resolve_as_slot!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, String, Vec<u8>);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("sequence candidate is empty")]
    EmptySequence,

    #[error("sequence item {index} contributed no fields")]
    EmptyItem { index: usize },
}

/// Flatten candidates into one ordered slot sequence.
pub fn resolve<'a, I>(candidates: I) -> std::result::Result<Vec<Slot<'a>>, ResolveError>
where
    I: IntoIterator<Item = Candidate<'a>>,
{
    let mut slots = Vec::new();
    for candidate in candidates {
        match candidate {
            Candidate::Target(target) => slots.extend(target.fields()),
            Candidate::Targets(items) => {
                if items.is_empty() {
                    return Err(ResolveError::EmptySequence);
                }
                for (index, item) in items.into_iter().enumerate() {
                    let fields = item.fields();
                    if fields.is_empty() {
                        return Err(ResolveError::EmptyItem { index });
                    }
                    slots.extend(fields);
                }
            }
            Candidate::Slot(slot) => slots.push(slot),
        }
    }
    Ok(slots)
}

/// Slots for a single result value.
pub fn resolve_one<T: Resolve>(value: &mut T) -> std::result::Result<Vec<Slot<'_>>, ResolveError> {
    resolve([value.candidate()])
}

/// Write one row's values into `slots`, column by column.
pub fn scan_values(columns: &[String], values: &[Value], slots: &mut [Slot<'_>]) -> Result<()> {
    if slots.len() != values.len() {
        return Err(Error::ColumnCount {
            expected: values.len(),
            got: slots.len(),
        });
    }
    for (index, (slot, value)) in slots.iter_mut().zip(values).enumerate() {
        slot.assign(value).map_err(|source| Error::Scan {
            index,
            column: columns.get(index).cloned().unwrap_or_default(),
            source,
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Name {
        first: String,
        last: String,
    }

    impl ScanTarget for Name {
        fn fields(&mut self) -> Vec<Slot<'_>> {
            vec![Slot::new(&mut self.first), Slot::new(&mut self.last)]
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Person {
        id: i64,
        name: Name,
        age: Option<u8>,
    }

    impl ScanTarget for Person {
        fn fields(&mut self) -> Vec<Slot<'_>> {
            let mut fields = vec![Slot::new(&mut self.id)];
            fields.extend(self.name.fields());
            fields.push(Slot::new(&mut self.age));
            fields
        }
    }

    #[derive(Default)]
    struct Nothing;

    impl ScanTarget for Nothing {
        fn fields(&mut self) -> Vec<Slot<'_>> {
            Vec::new()
        }
    }

    fn kinds(slots: &[Slot<'_>]) -> Vec<&'static str> {
        slots.iter().map(Slot::kind).collect()
    }

    fn columns(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("c{i}")).collect()
    }

    #[test]
    fn nested_targets_concatenate_in_declaration_order() {
        let mut person = Person::default();
        let nested = kinds(&resolve_one(&mut person).unwrap());

        let mut id = 0i64;
        let mut name = Name::default();
        let mut age: Option<u8> = None;
        let mut expected = vec![Slot::new(&mut id)];
        expected.extend(name.fields());
        expected.push(Slot::new(&mut age));

        assert_eq!(nested, kinds(&expected));
        assert_eq!(nested.len(), 4);
    }

    #[test]
    fn primitive_resolves_to_one_slot() {
        let mut count = 0u32;
        let mut slots = resolve_one(&mut count).unwrap();
        assert_eq!(slots.len(), 1);
        slots[0].assign(&Value::Integer(9)).unwrap();
        drop(slots);
        assert_eq!(count, 9);
    }

    #[test]
    fn sequence_flattens_item_by_item() {
        let mut names = vec![Name::default(), Name::default()];
        let mut slots = resolve([Candidate::targets(&mut names)]).unwrap();
        assert_eq!(slots.len(), 4);
        let values = ["a", "b", "c", "d"].map(|s| Value::Text(s.to_string()));
        scan_values(&columns(4), &values, &mut slots).unwrap();
        drop(slots);
        assert_eq!(names[0].first, "a");
        assert_eq!(names[1].last, "d");
    }

    #[test]
    fn empty_sequence_is_an_error() {
        let mut names: Vec<Name> = Vec::new();
        let err = resolve([Candidate::targets(&mut names)]).unwrap_err();
        assert_eq!(err, ResolveError::EmptySequence);
    }

    #[test]
    fn empty_item_is_an_error() {
        let mut name = Name::default();
        let mut nothing = Nothing;
        let items = vec![&mut name as &mut dyn ScanTarget, &mut nothing];
        let err = resolve([Candidate::Targets(items)]).unwrap_err();
        assert_eq!(err, ResolveError::EmptyItem { index: 1 });
    }

    #[test]
    fn mixed_candidates_keep_order() {
        let mut id = 0i64;
        let mut name = Name::default();
        let mut slots = resolve([
            Candidate::Slot(Slot::new(&mut id)),
            Candidate::Target(&mut name),
        ])
        .unwrap();
        let values = [Value::Integer(1), Value::Text("x".into()), Value::Text("y".into())];
        scan_values(&columns(3), &values, &mut slots).unwrap();
        drop(slots);
        assert_eq!(id, 1);
        assert_eq!(name, Name { first: "x".into(), last: "y".into() });
    }

    #[test]
    fn count_mismatch_is_a_scan_error() {
        let mut name = Name::default();
        let mut slots = resolve_one(&mut name).unwrap();
        let nulls = [Value::Null, Value::Null, Value::Null];
        let err = scan_values(&columns(3), &nulls, &mut slots).unwrap_err();
        assert!(matches!(err, Error::ColumnCount { expected: 3, got: 2 }));

        let err = scan_values(&columns(1), &[Value::Null], &mut slots).unwrap_err();
        assert!(matches!(err, Error::ColumnCount { expected: 1, got: 2 }));
    }

    #[test]
    fn conversion_failure_names_the_column() {
        let mut person = Person::default();
        let mut slots = resolve_one(&mut person).unwrap();
        let values = [
            Value::Integer(1),
            Value::Text("a".into()),
            Value::Text("b".into()),
            Value::Integer(300),
        ];
        let err = scan_values(&columns(4), &values, &mut slots).unwrap_err();
        match err {
            Error::Scan { index, column, source } => {
                assert_eq!(index, 3);
                assert_eq!(column, "c3");
                assert_eq!(source, ConversionError::OutOfRange { value: 300, to: "u8" });
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
