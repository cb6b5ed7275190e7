//! # Function Inliner Module
//!
//! ## Aim
//! Models may define rate laws through user-defined functions, e.g.
//! `hill(x, n, k) = x^n / (k^n + x^n)` called as `hill(S, 2, Km)`. The catalog
//! only holds primitive formulas, so every call site has to be expanded into
//! the function body before matching. Expansion is a structural substitution of
//! formal parameters by the actual arguments; nothing is evaluated numerically.
//!
//! ## Main Data Structures and Logic
//! - `FunctionDefinition`: name, formal parameter list and body tree
//! - `inline_functions()`: bottom-up replacement of every `Call` node; nested
//!   and chained definitions are resolved by recursing into the substituted
//!   body, with a depth cap so a cyclic call graph is reported instead of
//!   looping forever
//!
//! Since substitution happens on tree nodes, a formal parameter named `S` can
//! never capture part of an identifier like `S2`; the regex pitfalls of the
//! text-based approach do not exist here.

use crate::symbolic::symbolic_engine::Expr;
use std::collections::HashMap;
use thiserror::Error;

/// Recursion cap for chained/nested definitions. Real models nest a handful of
/// levels at most; hitting the cap means a cyclic call graph.
const MAX_INLINE_DEPTH: usize = 64;

/// error types for function inlining
#[derive(Debug, Error, PartialEq)]
pub enum InlineError {
    #[error("call to unknown function '{0}'")]
    UnknownFunction(String),
    #[error("function '{0}' expects {1} arguments, call site has {2}")]
    ArityMismatch(String, usize, usize),
    #[error("function '{0}' has duplicated formal parameter '{1}'")]
    MalformedParameterList(String, String),
    #[error("recursion limit exceeded while inlining '{0}'; cyclic function definitions?")]
    RecursionLimit(String),
}

/// A user-defined function: formal parameters and a body expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDefinition {
    pub id: String,
    pub arguments: Vec<String>,
    pub body: Expr,
}

impl FunctionDefinition {
    pub fn new(id: &str, arguments: &[&str], body: Expr) -> Self {
        Self {
            id: id.to_string(),
            arguments: arguments.iter().map(|s| s.to_string()).collect(),
            body,
        }
    }

    fn check_parameter_list(&self) -> Result<(), InlineError> {
        for (i, arg) in self.arguments.iter().enumerate() {
            if self.arguments[..i].contains(arg) {
                return Err(InlineError::MalformedParameterList(
                    self.id.clone(),
                    arg.clone(),
                ));
            }
        }
        Ok(())
    }
}

/// Expand every user-defined function call in `expr` until none remain.
pub fn inline_functions(
    expr: &Expr,
    definitions: &HashMap<String, FunctionDefinition>,
) -> Result<Expr, InlineError> {
    inline_with_depth(expr, definitions, 0)
}

fn inline_with_depth(
    expr: &Expr,
    definitions: &HashMap<String, FunctionDefinition>,
    depth: usize,
) -> Result<Expr, InlineError> {
    match expr {
        Expr::Var(_) | Expr::Const(_) => Ok(expr.clone()),
        Expr::Add(lhs, rhs) => Ok(Expr::Add(
            Box::new(inline_with_depth(lhs, definitions, depth)?),
            Box::new(inline_with_depth(rhs, definitions, depth)?),
        )),
        Expr::Sub(lhs, rhs) => Ok(Expr::Sub(
            Box::new(inline_with_depth(lhs, definitions, depth)?),
            Box::new(inline_with_depth(rhs, definitions, depth)?),
        )),
        Expr::Mul(lhs, rhs) => Ok(Expr::Mul(
            Box::new(inline_with_depth(lhs, definitions, depth)?),
            Box::new(inline_with_depth(rhs, definitions, depth)?),
        )),
        Expr::Div(lhs, rhs) => Ok(Expr::Div(
            Box::new(inline_with_depth(lhs, definitions, depth)?),
            Box::new(inline_with_depth(rhs, definitions, depth)?),
        )),
        Expr::Pow(lhs, rhs) => Ok(Expr::Pow(
            Box::new(inline_with_depth(lhs, definitions, depth)?),
            Box::new(inline_with_depth(rhs, definitions, depth)?),
        )),
        Expr::Call(name, args) => {
            if depth >= MAX_INLINE_DEPTH {
                return Err(InlineError::RecursionLimit(name.clone()));
            }
            let definition = definitions
                .get(name)
                .ok_or_else(|| InlineError::UnknownFunction(name.clone()))?;
            definition.check_parameter_list()?;
            if definition.arguments.len() != args.len() {
                return Err(InlineError::ArityMismatch(
                    name.clone(),
                    definition.arguments.len(),
                    args.len(),
                ));
            }
            // arguments may themselves contain calls
            let mut substitution: HashMap<String, Expr> = HashMap::new();
            for (formal, actual) in definition.arguments.iter().zip(args) {
                substitution.insert(
                    formal.clone(),
                    inline_with_depth(actual, definitions, depth + 1)?,
                );
            }
            let expanded = definition.body.substitute(&substitution);
            // the body may call further functions (or itself)
            inline_with_depth(&expanded, definitions, depth + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::symbolic_simplify::symbolic_eq;

    fn parse(s: &str) -> Expr {
        Expr::parse_expression(s).unwrap()
    }

    fn defs(list: Vec<FunctionDefinition>) -> HashMap<String, FunctionDefinition> {
        list.into_iter().map(|d| (d.id.clone(), d)).collect()
    }

    #[test]
    fn test_inline_hill_function() {
        let hill = FunctionDefinition::new("hill", &["x", "n", "k"], parse("x^n / (k^n + x^n)"));
        let law = parse("Vmax * hill(S, 2, Km)");
        let inlined = inline_functions(&law, &defs(vec![hill])).unwrap();
        assert!(!inlined.contains_calls());
        assert!(symbolic_eq(
            &inlined,
            &parse("Vmax * S^2 / (Km^2 + S^2)")
        ));
    }

    #[test]
    fn test_inline_round_trip_semantics() {
        // substituting the actual arguments into the body by hand must agree
        // with the inliner, up to symbolic equality
        let body = parse("a * b / (c + b)");
        let f = FunctionDefinition::new("f", &["a", "b", "c"], body.clone());
        let inlined = inline_functions(&parse("f(kcat, S, Km)"), &defs(vec![f])).unwrap();
        let mut manual = HashMap::new();
        manual.insert("a".to_string(), Expr::var("kcat"));
        manual.insert("b".to_string(), Expr::var("S"));
        manual.insert("c".to_string(), Expr::var("Km"));
        assert!(symbolic_eq(&inlined, &body.substitute(&manual)));
    }

    #[test]
    fn test_inline_nested_definitions() {
        let inner = FunctionDefinition::new("sq", &["x"], parse("x * x"));
        let outer = FunctionDefinition::new("f", &["y", "k"], parse("sq(y) / k"));
        let inlined =
            inline_functions(&parse("f(S, Km)"), &defs(vec![inner, outer])).unwrap();
        assert!(symbolic_eq(&inlined, &parse("S^2 / Km")));
    }

    #[test]
    fn test_inline_call_in_argument() {
        let sq = FunctionDefinition::new("sq", &["x"], parse("x * x"));
        let inlined = inline_functions(&parse("sq(sq(S))"), &defs(vec![sq])).unwrap();
        assert!(symbolic_eq(&inlined, &parse("S^4")));
    }

    #[test]
    fn test_unknown_function_is_error() {
        let err = inline_functions(&parse("2 * ghost(S)"), &HashMap::new()).unwrap_err();
        assert_eq!(err, InlineError::UnknownFunction("ghost".to_string()));
    }

    #[test]
    fn test_arity_mismatch_is_error() {
        let f = FunctionDefinition::new("f", &["a", "b"], parse("a + b"));
        let err = inline_functions(&parse("f(S)"), &defs(vec![f])).unwrap_err();
        assert_eq!(err, InlineError::ArityMismatch("f".to_string(), 2, 1));
    }

    #[test]
    fn test_duplicate_formal_parameter_is_error() {
        let f = FunctionDefinition::new("f", &["a", "a"], parse("a + a"));
        let err = inline_functions(&parse("f(S, Km)"), &defs(vec![f])).unwrap_err();
        assert_eq!(
            err,
            InlineError::MalformedParameterList("f".to_string(), "a".to_string())
        );
    }

    #[test]
    fn test_cyclic_definitions_reported() {
        let f = FunctionDefinition::new("f", &["x"], parse("g(x)"));
        let g = FunctionDefinition::new("g", &["x"], parse("f(x)"));
        let err = inline_functions(&parse("f(S)"), &defs(vec![f, g])).unwrap_err();
        match err {
            InlineError::RecursionLimit(_) => {}
            other => panic!("expected recursion limit, got {:?}", other),
        }
    }

    #[test]
    fn test_no_capture_of_similar_identifiers() {
        // formal parameter S must not touch the distinct variable S2
        let f = FunctionDefinition::new("f", &["S"], parse("S * S2"));
        let inlined = inline_functions(&parse("f(A)"), &defs(vec![f])).unwrap();
        assert!(symbolic_eq(&inlined, &parse("A * S2")));
    }
}
