//! # SBO Client Module
//!
//! ## Aim
//! Remote catalog source: fetches SBO term definitions from the EBI
//! webservice, converts the MathML lambda of a rate-law term into an
//! expression tree, and derives the chemical role of every bound variable by
//! following the term hierarchy. Successfully resolved terms are appended to
//! the in-memory catalog; a term whose roles cannot be resolved is reported
//! and skipped without aborting the session.
//!
//! ## Main Data Structures and Logic
//! - `SboService`: trait boundary over the webservice (term XML by id, is-a
//!   hierarchy queries); enables mocking in tests, the same dependency
//!   injection the NIST handler of the sister crate uses for its HTTP client
//! - `SboRest`: blocking reqwest implementation against a configurable base URL
//! - `parse_term_formula()`: walks the MathML lambda with CSS selectors and
//!   builds the `Expr` tree plus the (variable, SBO id) list of bound variables
//! - `resolve_role()`: classifies a bound variable's SBO id against the four
//!   parent categories (reactant/product/modifier concentration, quantitative
//!   parameter) and, for the species categories, derives the participant role
//!   id from the parent term's definition text

use crate::Matcher::catalog::{CatalogEntry, RateLawCatalog, TermRole};
use crate::Matcher::role_partition::RoleKind;
use crate::symbolic::symbolic_engine::{Expr, ExprError};
use log::{error, info, warn};
use regex::Regex;
use reqwest::blocking::Client;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

/// entity categories a bound variable may descend from:
/// concentrations of (reactant, product, modifier), quantitative parameter
const PARAMETER_ROOTS: [(RoleKind, u32); 4] = [
    (RoleKind::Reactant, 509),
    (RoleKind::Product, 512),
    (RoleKind::Modifier, 518),
    (RoleKind::Parameter, 2),
];
/// participant-role reference roots for (reactant, product, modifier)
const PARTICIPANT_ROLE_ROOTS: [u32; 3] = [10, 11, 19];

/// error types for the remote catalog source
#[derive(Debug, Error)]
pub enum SboError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),
    #[error("term SBO:{0:07} carries no usable MathML lambda")]
    MissingMath(u32),
    #[error("unsupported MathML element '{0}'")]
    UnsupportedMathMl(String),
    #[error("bound variable '{0}' carries no SBO definition URL")]
    MissingDefinitionUrl(String),
    #[error("formula extracted from term does not parse: {0}")]
    Formula(#[from] ExprError),
    #[error("term SBO:{0:07} has no definition text to derive a role from")]
    MissingDefinition(u32),
    #[error("derived role SBO:{role:07} of term SBO:{term:07} is not under participant root SBO:{expected:07}")]
    RoleResolutionFailure { term: u32, role: u32, expected: u32 },
    #[error("term SBO:{0:07} descends from none of the known participant categories")]
    UnresolvedRole(u32),
}

/// Webservice boundary, injectable for tests.
pub trait SboService {
    fn term_xml(&self, id: u32) -> Result<String, SboError>;
    fn is_child_of(&self, child: u32, parent: u32) -> Result<bool, SboError>;
}

/// Blocking REST client against the EBI SBO service.
pub struct SboRest {
    client: Client,
    base: String,
}

impl SboRest {
    pub fn new() -> Self {
        Self::with_base("https://www.ebi.ac.uk/sbo/main/services/rest")
    }

    pub fn with_base(base: &str) -> Self {
        Self {
            client: Client::new(),
            base: base.trim_end_matches('/').to_string(),
        }
    }

    fn fetch(&self, url: &Url) -> Result<String, SboError> {
        Ok(self.client.get(url.as_str()).send()?.text()?)
    }
}

impl SboService for SboRest {
    fn term_xml(&self, id: u32) -> Result<String, SboError> {
        let url = Url::parse(&format!("{}/term/SBO:{:07}/xml", self.base, id))?;
        self.fetch(&url)
    }

    fn is_child_of(&self, child: u32, parent: u32) -> Result<bool, SboError> {
        let url = Url::parse(&format!(
            "{}/ischildof?child=SBO:{:07}&parent=SBO:{:07}",
            self.base, child, parent
        ))?;
        let body = self.fetch(&url)?;
        Ok(body.to_lowercase().contains("true"))
    }
}

/// Query the webservice for the given term ids, appending every successfully
/// resolved rate-law pattern to the catalog. Per-term failures are reported
/// and returned; they never abort the remaining queries.
pub fn query_terms(
    catalog: &mut RateLawCatalog,
    service: &impl SboService,
    ids: &[u32],
) -> Vec<(u32, String)> {
    let mut failures = Vec::new();
    for id in ids {
        match fetch_entry(service, *id) {
            Ok(entry) => {
                info!("registered SBO:{:07} as '{}'", id, entry.expression);
                catalog.push_entry(entry);
            }
            Err(err) => {
                error!("SBO:{:07} is unusable: {}", id, err);
                failures.push((*id, err.to_string()));
            }
        }
    }
    failures
}

fn fetch_entry(service: &impl SboService, id: u32) -> Result<CatalogEntry, SboError> {
    let xml = service.term_xml(id)?;
    let (expression, bound_vars) = parse_term_formula(&xml, id)?;
    let mut role_map = HashMap::new();
    for (variable, child_id) in bound_vars {
        role_map.insert(variable, resolve_role(service, child_id)?);
    }
    for var in expression.free_variables() {
        if !role_map.contains_key(&var) {
            warn!(
                "SBO:{:07}: variable '{}' of '{}' is not a bound variable",
                id, var, expression
            );
        }
    }
    Ok(CatalogEntry {
        sbo_id: id,
        expression,
        role_map,
    })
}

/// Classify a bound variable's term against the four parent categories. For
/// the three species categories the participant role is derived from the
/// term's definition text and checked against the expected role root; for
/// quantitative parameters the role id is the term id itself.
pub fn resolve_role(service: &impl SboService, child_id: u32) -> Result<TermRole, SboError> {
    for (num, (kind, root)) in PARAMETER_ROOTS.iter().enumerate() {
        if child_id == *root || service.is_child_of(child_id, *root)? {
            if num < 3 {
                let xml = service.term_xml(child_id)?;
                let role_id = definition_role_id(&xml).ok_or(SboError::MissingDefinition(child_id))?;
                let expected = PARTICIPANT_ROLE_ROOTS[num];
                if role_id != expected && !service.is_child_of(role_id, expected)? {
                    return Err(SboError::RoleResolutionFailure {
                        term: child_id,
                        role: role_id,
                        expected,
                    });
                }
                return Ok(TermRole::new(vec![*kind], child_id, role_id));
            }
            // no extra reference lookup for plain parameters
            return Ok(TermRole::new(vec![*kind], child_id, child_id));
        }
    }
    Err(SboError::UnresolvedRole(child_id))
}

// the role is referenced as "SBO:nnnnnnn" inside the term's defstr element
fn definition_role_id(xml: &str) -> Option<u32> {
    let defstr = Regex::new(r"(?s)<(?:\w+:)?defstr[^>]*>(.*?)</")
        .unwrap()
        .captures(xml)?
        .get(1)?
        .as_str()
        .to_string();
    let id = Regex::new(r"SBO:0*([0-9]+)")
        .unwrap()
        .captures(&defstr)?
        .get(1)?
        .as_str()
        .parse()
        .ok()?;
    Some(id)
}

/// Extract the rate-law formula and the bound-variable table of a term.
pub fn parse_term_formula(
    xml: &str,
    id: u32,
) -> Result<(Expr, Vec<(String, u32)>), SboError> {
    let document = Html::parse_document(xml);
    let lambda_selector = Selector::parse("math lambda").unwrap();
    let lambda = document
        .select(&lambda_selector)
        .next()
        .ok_or(SboError::MissingMath(id))?;

    // bound variables with the SBO id at the tail of their definition URL
    let bvar_selector = Selector::parse("bvar > ci").unwrap();
    let trailing_id = Regex::new(r"([0-9]+)$").unwrap();
    let mut bound_vars = Vec::new();
    for ci in lambda.select(&bvar_selector) {
        let name = ci.text().collect::<String>().trim().to_string();
        // the MathML attribute adjustment of lenient parsers may restore the
        // mixed-case spelling, so try both
        let url = ci
            .value()
            .attr("definitionurl")
            .or_else(|| ci.value().attr("definitionURL"))
            .ok_or_else(|| SboError::MissingDefinitionUrl(name.clone()))?;
        let child_id = trailing_id
            .captures(url)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(|| SboError::MissingDefinitionUrl(name.clone()))?;
        bound_vars.push((name, child_id));
    }

    // the body is the last non-bvar child of the lambda
    let body = lambda
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() != "bvar")
        .last()
        .ok_or(SboError::MissingMath(id))?;
    let expression = mathml_to_expr(body)?;
    Ok((expression, bound_vars))
}

fn mathml_to_expr(node: ElementRef) -> Result<Expr, SboError> {
    match node.value().name() {
        "ci" => Ok(Expr::Var(node.text().collect::<String>().trim().to_string())),
        "cn" => {
            let text = node.text().collect::<String>();
            let text = text.trim();
            text.parse::<f64>()
                .map(Expr::Const)
                .map_err(|_| SboError::UnsupportedMathMl(format!("cn '{}'", text)))
        }
        "apply" => {
            let mut children = node.children().filter_map(ElementRef::wrap);
            let operator = children
                .next()
                .ok_or_else(|| SboError::UnsupportedMathMl("empty apply".to_string()))?;
            let operands: Vec<Expr> = children
                .map(mathml_to_expr)
                .collect::<Result<Vec<_>, _>>()?;
            apply_operator(operator.value().name(), operands)
        }
        other => Err(SboError::UnsupportedMathMl(other.to_string())),
    }
}

fn apply_operator(name: &str, operands: Vec<Expr>) -> Result<Expr, SboError> {
    let fold = |operands: Vec<Expr>, op: fn(Expr, Expr) -> Expr| -> Result<Expr, SboError> {
        let mut iter = operands.into_iter();
        let first = iter
            .next()
            .ok_or_else(|| SboError::UnsupportedMathMl("operator without operands".to_string()))?;
        Ok(iter.fold(first, op))
    };
    match name {
        "times" => fold(operands, |a, b| a * b),
        "plus" => fold(operands, |a, b| a + b),
        "divide" => fold(operands, |a, b| a / b),
        "power" => fold(operands, |a, b| a.pow(b)),
        "minus" => {
            if operands.len() == 1 {
                let mut iter = operands.into_iter();
                Ok(Expr::Const(-1.0) * iter.next().unwrap())
            } else {
                fold(operands, |a, b| a - b)
            }
        }
        other => Err(SboError::UnsupportedMathMl(other.to_string())),
    }
}
