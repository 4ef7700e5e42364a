//! Compile `@assert/validate` annotations into per-node validation rules.
//!
//! Each annotation carries 2-tuples `(message, assertion)` as positional
//! arguments and a fixed set of keyword options. Keyword options become
//! additional synthetic rules appended after the explicit ones.
//!
//! | keyword | value | synthetic rule |
//! |---------|-------|----------------|
//! | `when` | function | none (guards the rule set) |
//! | `when_null_skip` | bool | none (null passes) |
//! | `min_len` / `max_len` | number | length bound |
//! | `min` / `max` | any ordered value | value bound |
//! | `not_null` | bool | value is not null |
//! | `one_not_null` | `True` or sequence of keys | exactly one key is not null |

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value as Literal;
use tracing::{debug, trace};

use crate::error::{AnnotationError, CompileError};
use crate::tree::{AnnotationRecord, NodeId, Tree};
use crate::types::{SourcePosition, ANNOTATION_ASSERT_VALIDATE};
use crate::value::{Callable, HasAttrs, Value};

/// Recognized keyword options of `@assert/validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationKeyword {
    When,
    WhenNullSkip,
    MinLength,
    MaxLength,
    Min,
    Max,
    NotNull,
    OneNotNull,
}

impl ValidationKeyword {
    /// Returns `None` for unknown names (caller should error).
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "when" => Some(Self::When),
            "when_null_skip" => Some(Self::WhenNullSkip),
            "min_len" => Some(Self::MinLength),
            "max_len" => Some(Self::MaxLength),
            "min" => Some(Self::Min),
            "max" => Some(Self::Max),
            "not_null" => Some(Self::NotNull),
            "one_not_null" => Some(Self::OneNotNull),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::When => "when",
            Self::WhenNullSkip => "when_null_skip",
            Self::MinLength => "min_len",
            Self::MaxLength => "max_len",
            Self::Min => "min",
            Self::Max => "max",
            Self::NotNull => "not_null",
            Self::OneNotNull => "one_not_null",
        }
    }
}

impl fmt::Display for ValidationKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Target of `one_not_null`.
#[derive(Debug, Clone, PartialEq)]
pub enum OneNotNull {
    /// `one_not_null=True`: every key of the map.
    AllKeys,
    /// Only the listed keys.
    Keys(Vec<String>),
}

/// Keyword options of one validation annotation, each present or absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationKwargs {
    pub when: Option<Callable>,
    pub when_null_skip: Option<bool>,
    pub min_length: Option<i64>,
    pub max_length: Option<i64>,
    pub min: Option<Value>,
    pub max: Option<Value>,
    pub not_null: Option<bool>,
    pub one_not_null: Option<OneNotNull>,
}

impl ValidationKwargs {
    /// Check and collect keyword arguments.
    ///
    /// # Errors
    ///
    /// `UnknownOption` for unrecognized names, `TypeMismatch` for values of
    /// the wrong kind, `InvalidConstraint` for `one_not_null=False`.
    pub fn parse(
        kwargs: &[(String, Value)],
        position: &SourcePosition,
    ) -> Result<Self, CompileError> {
        let mut parsed = Self::default();
        for (name, value) in kwargs {
            let Some(keyword) = ValidationKeyword::parse(name) else {
                return Err(CompileError::UnknownOption {
                    name: name.clone(),
                    position: position.clone(),
                });
            };
            let mismatch = |expected: &str| {
                CompileError::type_mismatch(
                    format!("keyword argument \"{}\"", keyword),
                    expected,
                    value.type_name(),
                    position,
                )
            };
            match keyword {
                ValidationKeyword::When => match value {
                    Value::Callable(f) => parsed.when = Some(f.clone()),
                    _ => return Err(mismatch("a function")),
                },
                ValidationKeyword::WhenNullSkip => {
                    parsed.when_null_skip = Some(value.as_bool().ok_or_else(|| mismatch("a boolean"))?);
                }
                ValidationKeyword::MinLength => {
                    parsed.min_length = Some(value.to_int().ok_or_else(|| mismatch("a number"))?);
                }
                ValidationKeyword::MaxLength => {
                    parsed.max_length = Some(value.to_int().ok_or_else(|| mismatch("a number"))?);
                }
                // Compared against the node's value when rules run.
                ValidationKeyword::Min => parsed.min = Some(value.clone()),
                ValidationKeyword::Max => parsed.max = Some(value.clone()),
                ValidationKeyword::NotNull => {
                    parsed.not_null = Some(value.as_bool().ok_or_else(|| mismatch("a boolean"))?);
                }
                ValidationKeyword::OneNotNull => {
                    parsed.one_not_null = Some(parse_one_not_null(value, position)?);
                }
            }
        }
        Ok(parsed)
    }

    /// Synthetic rules for the keyword options, in a fixed order.
    pub fn to_rules(&self) -> Vec<Rule> {
        let mut rules = Vec::new();

        if let Some(min) = self.min_length {
            rules.push(Rule::keyword(
                ValidationKeyword::MinLength,
                format!("length greater than or equal to {}", min),
                move |v| length_of(v).is_some_and(|len| len >= min),
            ));
        }
        if let Some(max) = self.max_length {
            rules.push(Rule::keyword(
                ValidationKeyword::MaxLength,
                format!("length less than or equal to {}", max),
                move |v| length_of(v).is_some_and(|len| len <= max),
            ));
        }
        if let Some(min) = self.min.clone() {
            rules.push(Rule::keyword(
                ValidationKeyword::Min,
                format!("a value greater than or equal to {}", min),
                move |v| matches!(compare(v, &min), Some(Ordering::Greater | Ordering::Equal)),
            ));
        }
        if let Some(max) = self.max.clone() {
            rules.push(Rule::keyword(
                ValidationKeyword::Max,
                format!("a value less than or equal to {}", max),
                move |v| matches!(compare(v, &max), Some(Ordering::Less | Ordering::Equal)),
            ));
        }
        if self.not_null == Some(true) {
            rules.push(Rule::keyword(ValidationKeyword::NotNull, "not null", |v| {
                !v.is_null()
            }));
        }
        match &self.one_not_null {
            Some(OneNotNull::AllKeys) => {
                rules.push(Rule::keyword(
                    ValidationKeyword::OneNotNull,
                    "exactly one child not null",
                    |v| count_not_null(v, None) == Some(1),
                ));
            }
            Some(OneNotNull::Keys(keys)) => {
                let keys = keys.clone();
                rules.push(Rule::keyword(
                    ValidationKeyword::OneNotNull,
                    format!("exactly one of {:?} not null", keys),
                    move |v| count_not_null(v, Some(&keys)) == Some(1),
                ));
            }
            None => {}
        }

        rules
    }
}

fn parse_one_not_null(value: &Value, position: &SourcePosition) -> Result<OneNotNull, CompileError> {
    match value {
        Value::Bool(true) => Ok(OneNotNull::AllKeys),
        Value::Bool(false) => Err(CompileError::InvalidConstraint {
            message: "one_not_null= cannot be False".to_string(),
            position: position.clone(),
        }),
        other => {
            let keys = other.as_sequence().ok_or_else(|| {
                CompileError::type_mismatch(
                    "keyword argument \"one_not_null\"",
                    "True or a sequence of keys",
                    other.type_name(),
                    position,
                )
            })?;
            keys.iter()
                .map(|key| {
                    key.as_str().map(str::to_string).ok_or_else(|| {
                        CompileError::type_mismatch(
                            "keys of keyword argument \"one_not_null\"",
                            "strings",
                            key.type_name(),
                            position,
                        )
                    })
                })
                .collect::<Result<Vec<_>, _>>()
                .map(OneNotNull::Keys)
        }
    }
}

/// Where a rule came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSource {
    /// A `(message, assertion)` positional argument.
    Explicit,
    /// Synthesized from a keyword option.
    Keyword(ValidationKeyword),
}

/// A single assertion: the valid value it describes and its predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub message: String,
    pub predicate: Callable,
    pub source: RuleSource,
}

impl Rule {
    fn keyword<F>(keyword: ValidationKeyword, message: impl Into<String>, check: F) -> Self
    where
        F: Fn(&Literal) -> bool + Send + Sync + 'static,
    {
        Self {
            message: message.into(),
            predicate: Callable::new(keyword.name(), check),
            source: RuleSource::Keyword(keyword),
        }
    }

    /// Run the predicate against a data value.
    pub fn holds(&self, value: &Literal) -> bool {
        self.predicate.call(value)
    }
}

/// Compiled validations of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeValidation {
    pub rules: Vec<Rule>,
    pub kwargs: ValidationKwargs,
    pub position: SourcePosition,
}

/// The two accepted shapes of an assertion.
enum Assertion {
    Direct(Callable),
    CheckMethod(Arc<dyn HasAttrs>),
}

impl Assertion {
    fn classify(value: &Value, position: &SourcePosition) -> Result<Self, CompileError> {
        match value {
            Value::Callable(f) => Ok(Assertion::Direct(f.clone())),
            Value::Object(obj) => Ok(Assertion::CheckMethod(Arc::clone(obj))),
            other => Err(CompileError::type_mismatch(
                "second item in the 2-tuple",
                "an assertion function",
                other.type_name(),
                position,
            )),
        }
    }

    /// Collapse both shapes into a plain predicate.
    fn resolve(self, position: &SourcePosition) -> Result<Callable, CompileError> {
        match self {
            Assertion::Direct(f) => Ok(f),
            Assertion::CheckMethod(obj) => match obj.attr("check") {
                Some(Value::Callable(check)) => Ok(check),
                Some(other) => Err(CompileError::type_mismatch(
                    "assertion object attribute \"check()\"",
                    "a function",
                    other.type_name(),
                    position,
                )),
                None => Err(CompileError::type_mismatch(
                    "second item in the 2-tuple",
                    "an assertion function or assertion object",
                    obj.type_name(),
                    position,
                )),
            },
        }
    }
}

/// Compile one `@assert/validate` annotation.
///
/// # Errors
///
/// Returns `CompileError` describing the first malformed argument.
pub fn compile(annotation: &AnnotationRecord) -> Result<NodeValidation, CompileError> {
    let position = &annotation.position;
    if annotation.args.is_empty() && annotation.kwargs.is_empty() {
        return Err(CompileError::MalformedAnnotation {
            message: "expected 2-tuple argument(s), found none".to_string(),
            position: position.clone(),
        });
    }

    let mut rules = Vec::with_capacity(annotation.args.len());
    for arg in &annotation.args {
        let (message, assertion) = match arg {
            Value::Tuple(items) if items.len() == 2 => (&items[0], &items[1]),
            Value::Tuple(items) => {
                return Err(CompileError::MalformedAnnotation {
                    message: format!("expected 2-tuple, but found tuple with length {}", items.len()),
                    position: position.clone(),
                })
            }
            other => {
                return Err(CompileError::MalformedAnnotation {
                    message: format!("expected 2-tuple argument(s), but found: {}", other),
                    position: position.clone(),
                })
            }
        };

        let Value::String(message) = message else {
            return Err(CompileError::type_mismatch(
                "first item in the 2-tuple",
                "a string describing a valid value",
                message.type_name(),
                position,
            ));
        };
        let predicate = Assertion::classify(assertion, position)?.resolve(position)?;

        rules.push(Rule {
            message: message.clone(),
            predicate,
            source: RuleSource::Explicit,
        });
    }

    let kwargs = ValidationKwargs::parse(&annotation.kwargs, position)?;
    rules.extend(kwargs.to_rules());

    Ok(NodeValidation {
        rules,
        kwargs,
        position: position.clone(),
    })
}

/// Compile the validation annotation of a single node, if it has one.
///
/// # Errors
///
/// `UnsupportedTarget` when the node is a document set, map or array as a
/// whole; otherwise whatever [`compile`] reports.
pub fn compile_node(tree: &Tree, id: NodeId) -> Result<Option<NodeValidation>, AnnotationError> {
    let node = tree.node(id);
    let Some(annotation) = node.annotations.get(ANNOTATION_ASSERT_VALIDATE) else {
        return Ok(None);
    };
    let wrap = |source: CompileError| {
        AnnotationError::new(ANNOTATION_ASSERT_VALIDATE, annotation.position.clone(), source)
    };

    let kind = node.kind();
    if kind.is_container() {
        return Err(wrap(CompileError::UnsupportedTarget {
            node_kind: kind.name().to_string(),
            position: node.position.clone(),
        }));
    }

    compile(annotation).map(Some).map_err(wrap)
}

/// Validations attached to nodes, keyed by node id.
///
/// Attaching only ever appends.
#[derive(Debug, Clone, Default)]
pub struct ValidationStore {
    by_node: HashMap<NodeId, Vec<NodeValidation>>,
}

impl ValidationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attach(&mut self, id: NodeId, validation: NodeValidation) {
        self.by_node.entry(id).or_default().push(validation);
    }

    pub fn get(&self, id: NodeId) -> &[NodeValidation] {
        self.by_node.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of nodes carrying at least one validation.
    pub fn node_count(&self) -> usize {
        self.by_node.len()
    }

    /// Number of validations across all nodes.
    pub fn validation_count(&self) -> usize {
        self.by_node.values().map(Vec::len).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[NodeValidation])> {
        self.by_node.iter().map(|(id, v)| (*id, v.as_slice()))
    }
}

/// Compile every `@assert/validate` annotation under `root` into `store`.
///
/// Stops at the first malformed annotation in depth-first order; in that
/// case `store` is left untouched. Returns the number of validations added.
///
/// # Errors
///
/// Returns the first `AnnotationError` encountered.
pub fn process_assert_annotations(
    tree: &Tree,
    root: NodeId,
    store: &mut ValidationStore,
) -> Result<usize, AnnotationError> {
    debug!(nodes = tree.len(), "compiling validation annotations");

    let mut compiled = Vec::new();
    tree.walk(root, |id, _| -> Result<(), AnnotationError> {
        if let Some(validation) = compile_node(tree, id)? {
            trace!(node = id.index(), rules = validation.rules.len(), "compiled validation");
            compiled.push((id, validation));
        }
        Ok(())
    })?;

    let count = compiled.len();
    for (id, validation) in compiled {
        store.attach(id, validation);
    }
    debug!(validations = count, "validation annotations compiled");
    Ok(count)
}

/// Length of a string (in chars), array or map.
fn length_of(value: &Literal) -> Option<i64> {
    let len = match value {
        Literal::String(s) => s.chars().count(),
        Literal::Array(items) => items.len(),
        Literal::Object(map) => map.len(),
        _ => return None,
    };
    i64::try_from(len).ok()
}

/// Order a data value against a bound. `None` when they are not comparable.
fn compare(value: &Literal, bound: &Value) -> Option<Ordering> {
    match (value, bound) {
        (Literal::Number(n), Value::Int(b)) => match n.as_i64() {
            Some(i) => Some(i.cmp(b)),
            None => n.as_f64()?.partial_cmp(&(*b as f64)),
        },
        (Literal::Number(n), Value::Float(b)) => n.as_f64()?.partial_cmp(b),
        (Literal::String(s), Value::String(b)) => Some(s.as_str().cmp(b.as_str())),
        (Literal::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Count non-null entries of a map, optionally restricted to `keys`.
fn count_not_null(value: &Literal, keys: Option<&[String]>) -> Option<usize> {
    let map = value.as_object()?;
    let count = match keys {
        Some(keys) => keys
            .iter()
            .filter(|k| map.get(k.as_str()).is_some_and(|v| !v.is_null()))
            .count(),
        None => map.values().filter(|v| !v.is_null()).count(),
    };
    Some(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttrStruct;
    use serde_json::json;

    fn pos() -> SourcePosition {
        SourcePosition::new("values.yml", 2)
    }

    fn positive() -> Callable {
        Callable::new("positive", |v| v.as_f64().is_some_and(|n| n > 0.0))
    }

    fn annotation() -> AnnotationRecord {
        AnnotationRecord::new(pos())
    }

    // === Positional arguments ===

    #[test]
    fn compiles_explicit_rule() {
        let ann = annotation().arg(Value::tuple("must be positive", positive()));
        let validation = compile(&ann).unwrap();
        assert_eq!(validation.rules.len(), 1);
        assert_eq!(validation.rules[0].message, "must be positive");
        assert_eq!(validation.rules[0].source, RuleSource::Explicit);
        assert!(validation.rules[0].holds(&json!(3)));
        assert!(!validation.rules[0].holds(&json!(-1)));
        assert_eq!(validation.kwargs, ValidationKwargs::default());
        assert_eq!(validation.position, pos());
    }

    #[test]
    fn no_arguments_is_malformed() {
        let err = compile(&annotation()).unwrap_err();
        assert_eq!(
            err,
            CompileError::MalformedAnnotation {
                message: "expected 2-tuple argument(s), found none".into(),
                position: pos(),
            }
        );
    }

    #[test]
    fn wrong_tuple_length_is_malformed() {
        let ann = annotation().arg(Value::Tuple(vec!["a".into(), positive().into(), 1i64.into()]));
        let err = compile(&ann).unwrap_err();
        assert!(matches!(
            err,
            CompileError::MalformedAnnotation { ref message, .. } if message.contains("length 3")
        ));
    }

    #[test]
    fn non_tuple_argument_is_malformed() {
        let ann = annotation().arg("just a string");
        let err = compile(&ann).unwrap_err();
        assert!(matches!(
            err,
            CompileError::MalformedAnnotation { ref message, .. } if message.contains("\"just a string\"")
        ));
    }

    #[test]
    fn message_must_be_string() {
        let ann = annotation().arg(Value::tuple(1i64, positive()));
        let err = compile(&ann).unwrap_err();
        assert!(matches!(
            err,
            CompileError::TypeMismatch { ref actual, .. } if actual == "int"
        ));
    }

    #[test]
    fn assertion_object_with_check() {
        let obj = AttrStruct::new("struct").with("check", positive());
        let ann = annotation().arg(Value::tuple("positive", Value::object(obj)));
        let validation = compile(&ann).unwrap();
        assert!(validation.rules[0].holds(&json!(1)));
    }

    #[test]
    fn assertion_object_without_check() {
        let obj = AttrStruct::new("struct").with("other", positive());
        let ann = annotation().arg(Value::tuple("positive", Value::object(obj)));
        let err = compile(&ann).unwrap_err();
        assert!(matches!(
            err,
            CompileError::TypeMismatch { ref expected, ref actual, .. }
                if expected == "an assertion function or assertion object" && actual == "struct"
        ));
    }

    #[test]
    fn assertion_object_with_non_callable_check() {
        let obj = AttrStruct::new("struct").with("check", "nope");
        let ann = annotation().arg(Value::tuple("positive", Value::object(obj)));
        let err = compile(&ann).unwrap_err();
        assert!(matches!(
            err,
            CompileError::TypeMismatch { ref expected, ref actual, .. }
                if expected == "a function" && actual == "string"
        ));
    }

    #[test]
    fn assertion_must_be_callable() {
        let ann = annotation().arg(Value::tuple("positive", 5i64));
        let err = compile(&ann).unwrap_err();
        assert!(matches!(err, CompileError::TypeMismatch { .. }));
    }

    // === Keyword arguments ===

    #[test]
    fn min_adds_one_synthetic_rule() {
        let ann = annotation()
            .arg(Value::tuple("must be positive", positive()))
            .kwarg("min", 1i64);
        let validation = compile(&ann).unwrap();
        assert_eq!(validation.rules.len(), 2);
        assert_eq!(validation.rules[0].source, RuleSource::Explicit);
        assert_eq!(
            validation.rules[1].source,
            RuleSource::Keyword(ValidationKeyword::Min)
        );
        assert_eq!(validation.kwargs.min, Some(Value::Int(1)));
        assert!(validation.rules[1].holds(&json!(1)));
        assert!(!validation.rules[1].holds(&json!(0.5)));
        assert!(!validation.rules[1].holds(&json!("1")));
    }

    #[test]
    fn kwargs_only_is_enough() {
        let ann = annotation().kwarg("not_null", true);
        let validation = compile(&ann).unwrap();
        assert_eq!(validation.rules.len(), 1);
        assert!(!validation.rules[0].holds(&json!(null)));
        assert!(validation.rules[0].holds(&json!("x")));
    }

    #[test]
    fn all_keywords_parse() {
        let when = Callable::new("when", |_| true);
        let ann = annotation()
            .kwarg("when", when.clone())
            .kwarg("when_null_skip", true)
            .kwarg("min_len", 1i64)
            .kwarg("max_len", 3.0)
            .kwarg("min", "a")
            .kwarg("max", "m")
            .kwarg("not_null", false)
            .kwarg("one_not_null", Value::Sequence(vec!["a".into(), "b".into()]));
        let kwargs = compile(&ann).unwrap().kwargs;
        assert_eq!(kwargs.when, Some(when));
        assert_eq!(kwargs.when_null_skip, Some(true));
        assert_eq!(kwargs.min_length, Some(1));
        assert_eq!(kwargs.max_length, Some(3));
        assert_eq!(kwargs.not_null, Some(false));
        assert_eq!(
            kwargs.one_not_null,
            Some(OneNotNull::Keys(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn synthetic_rules_in_keyword_order() {
        let ann = annotation()
            .kwarg("one_not_null", true)
            .kwarg("not_null", true)
            .kwarg("max", 10i64)
            .kwarg("min", 0i64)
            .kwarg("max_len", 5i64)
            .kwarg("min_len", 1i64);
        let sources: Vec<_> = compile(&ann)
            .unwrap()
            .rules
            .iter()
            .map(|r| r.source)
            .collect();
        assert_eq!(
            sources,
            vec![
                RuleSource::Keyword(ValidationKeyword::MinLength),
                RuleSource::Keyword(ValidationKeyword::MaxLength),
                RuleSource::Keyword(ValidationKeyword::Min),
                RuleSource::Keyword(ValidationKeyword::Max),
                RuleSource::Keyword(ValidationKeyword::NotNull),
                RuleSource::Keyword(ValidationKeyword::OneNotNull),
            ]
        );
    }

    #[test]
    fn length_rules() {
        let ann = annotation().kwarg("min_len", 2i64).kwarg("max_len", 3i64);
        let rules = compile(&ann).unwrap().rules;
        assert!(rules[0].holds(&json!("ab")));
        assert!(!rules[0].holds(&json!("a")));
        assert!(rules[1].holds(&json!([1, 2, 3])));
        assert!(!rules[1].holds(&json!({"a": 1, "b": 2, "c": 3, "d": 4})));
        assert!(!rules[0].holds(&json!(12)));
    }

    #[test]
    fn one_not_null_rules() {
        let all = compile(&annotation().kwarg("one_not_null", true)).unwrap().rules;
        assert!(all[0].holds(&json!({"a": 1, "b": null})));
        assert!(!all[0].holds(&json!({"a": 1, "b": 2})));
        assert!(!all[0].holds(&json!("not a map")));

        let keys = compile(
            &annotation().kwarg("one_not_null", Value::Sequence(vec!["a".into(), "c".into()])),
        )
        .unwrap()
        .rules;
        assert!(keys[0].holds(&json!({"a": null, "b": 2, "c": 3})));
        assert!(!keys[0].holds(&json!({"a": null, "b": 2})));

        let tuple = ValidationKwargs::parse(
            &[("one_not_null".to_string(), Value::Tuple(vec!["a".into(), "b".into()]))],
            &SourcePosition::unknown(),
        )
        .unwrap();
        assert_eq!(tuple.one_not_null, Some(OneNotNull::Keys(vec!["a".into(), "b".into()])));
    }

    #[test]
    fn one_not_null_false_is_invalid() {
        let err = compile(&annotation().kwarg("one_not_null", false)).unwrap_err();
        assert!(matches!(err, CompileError::InvalidConstraint { .. }));
    }

    #[test]
    fn one_not_null_wrong_kind() {
        let err = compile(&annotation().kwarg("one_not_null", 1i64)).unwrap_err();
        assert!(matches!(
            err,
            CompileError::TypeMismatch { ref expected, .. } if expected == "True or a sequence of keys"
        ));
    }

    #[test]
    fn keyword_kind_mismatches() {
        let cases: Vec<(&str, Value, &str)> = vec![
            ("when", "x".into(), "a function"),
            ("when_null_skip", 1i64.into(), "a boolean"),
            ("min_len", "1".into(), "a number"),
            ("max_len", true.into(), "a number"),
            ("not_null", "yes".into(), "a boolean"),
        ];
        for (name, value, expected_kind) in cases {
            let err = compile(&annotation().kwarg(name, value)).unwrap_err();
            match err {
                CompileError::TypeMismatch { subject, expected, .. } => {
                    assert!(subject.contains(name));
                    assert_eq!(expected, expected_kind);
                }
                other => panic!("expected type mismatch for {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn unknown_keyword() {
        let err = compile(&annotation().kwarg("maximum", 1i64)).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnknownOption {
                name: "maximum".into(),
                position: pos(),
            }
        );
    }

    #[test]
    fn min_max_accept_any_value() {
        let ann = annotation().kwarg("min", Value::None).kwarg("max", positive());
        let kwargs = compile(&ann).unwrap().kwargs;
        assert_eq!(kwargs.min, Some(Value::None));
        assert!(matches!(kwargs.max, Some(Value::Callable(_))));
    }

    // === Store ===

    #[test]
    fn store_appends() {
        let ann = annotation().kwarg("not_null", true);
        let mut store = ValidationStore::new();
        let (tree, doc) = Tree::document_from_literal(&json!(1), None);
        store.attach(doc, compile(&ann).unwrap());
        store.attach(doc, compile(&ann).unwrap());
        assert_eq!(store.get(doc).len(), 2);
        assert_eq!(store.node_count(), 1);
        assert_eq!(store.validation_count(), 2);
        assert!(store.get(tree.node(doc).children()[0]).is_empty());
    }
}
