//! Built-in knowledge about `System.Linq.Enumerable`.

use super::types::TypeRef;

/// Container name of the LINQ extension methods.
pub const ENUMERABLE: &str = "System.Linq.Enumerable";

/// Shape of a LINQ method's return value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinqResult {
    Bool,
    Int,
    Long,
    /// A single element of the source sequence.
    Element,
    /// A sequence of the same element type.
    Sequence,
    /// A sequence whose element type depends on a selector.
    Projection,
    List,
    Array,
}

const METHODS: &[(&str, LinqResult)] = &[
    ("Aggregate", LinqResult::Projection),
    ("All", LinqResult::Bool),
    ("Any", LinqResult::Bool),
    ("Concat", LinqResult::Sequence),
    ("Contains", LinqResult::Bool),
    ("Count", LinqResult::Int),
    ("Distinct", LinqResult::Sequence),
    ("ElementAt", LinqResult::Element),
    ("First", LinqResult::Element),
    ("FirstOrDefault", LinqResult::Element),
    ("Last", LinqResult::Element),
    ("LastOrDefault", LinqResult::Element),
    ("LongCount", LinqResult::Long),
    ("Max", LinqResult::Element),
    ("Min", LinqResult::Element),
    ("OrderBy", LinqResult::Sequence),
    ("OrderByDescending", LinqResult::Sequence),
    ("Reverse", LinqResult::Sequence),
    ("Select", LinqResult::Projection),
    ("SelectMany", LinqResult::Projection),
    ("Single", LinqResult::Element),
    ("SingleOrDefault", LinqResult::Element),
    ("Skip", LinqResult::Sequence),
    ("Take", LinqResult::Sequence),
    ("ThenBy", LinqResult::Sequence),
    ("ThenByDescending", LinqResult::Sequence),
    ("ToArray", LinqResult::Array),
    ("ToList", LinqResult::List),
    ("Where", LinqResult::Sequence),
];

/// Look up an `Enumerable` extension method by name.
pub fn enumerable_method(name: &str) -> Option<LinqResult> {
    METHODS
        .binary_search_by(|(n, _)| n.cmp(&name))
        .ok()
        .map(|i| METHODS[i].1)
}

/// Return type of a LINQ call over a sequence of `element`.
pub fn result_type(result: LinqResult, element: TypeRef) -> Option<TypeRef> {
    match result {
        LinqResult::Bool => Some(TypeRef::bool()),
        LinqResult::Int => Some(TypeRef::int()),
        LinqResult::Long => Some(TypeRef::named("long")),
        LinqResult::Element => Some(element),
        LinqResult::Sequence => Some(TypeRef::generic("IEnumerable", vec![element])),
        LinqResult::Projection => None,
        LinqResult::List => Some(TypeRef::generic("List", vec![element])),
        LinqResult::Array => Some(TypeRef::Array(Box::new(element))),
    }
}
