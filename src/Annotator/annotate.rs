//! # Annotation Pipeline Module
//!
//! ## Aim
//! Drives the matcher over a whole model document, reaction by reaction in
//! document order, and writes the resulting identifiers back in place:
//! `StripCompartments -> InlineFunctions -> Partition -> Match ->
//! {Annotate | Unmatched}`.
//!
//! ## Semantics
//! - compartment identifiers are replaced by 1 before matching: the catalog
//!   shapes describe species-count kinetics, volume factors are not part of
//!   the pattern
//! - on a match the entry's SBO id goes onto the kinetic law; every mapped
//!   variable annotates the species references of its kinds, parameter kinds
//!   go to the reaction-local parameter of that name if one exists, else to
//!   the model-global one (overwriting a different existing annotation is a
//!   logged conflict, last write wins)
//! - declared reactants/products/modifiers that end up with no role identifier
//!   receive the generic one for their kind, so every participant of a
//!   processed reaction is annotated at least coarsely
//! - failures are isolated per reaction and reported; one bad reaction never
//!   aborts the model pass

use crate::Annotator::model_document::{ModelDocument, Parameter, Reaction};
use crate::Matcher::catalog::RateLawCatalog;
use crate::Matcher::function_inliner::{FunctionDefinition, InlineError, inline_functions};
use crate::Matcher::permutation_matcher::{MatchError, MatcherConfig, match_rate_law};
use crate::Matcher::role_partition::{RoleError, RoleKind, RoleSet};
use crate::symbolic::symbolic_engine::{Expr, ExprError};
use log::{error, info, warn};
use std::collections::HashMap;
use thiserror::Error;

/// generic SBO role identifiers for (reactant, product, modifier)
pub const GENERIC_REACTANT_ROLE: u32 = 10;
pub const GENERIC_PRODUCT_ROLE: u32 = 11;
pub const GENERIC_MODIFIER_ROLE: u32 = 19;

/// error types for one reaction's trip through the pipeline
#[derive(Debug, Error)]
pub enum AnnotateError {
    #[error("rate-law formula does not parse: {0}")]
    Formula(#[from] ExprError),
    #[error("function inlining failed: {0}")]
    Inline(#[from] InlineError),
    #[error("role classification failed: {0}")]
    Roles(#[from] RoleError),
    #[error("permutation search refused: {0}")]
    Match(#[from] MatchError),
}

/// Outcome summary of one whole-model pass.
#[derive(Debug, Clone, Default)]
pub struct AnnotationReport {
    /// reaction id and matched catalog id
    pub matched: Vec<(String, u32)>,
    /// reactions that fell back to generic role annotation
    pub unmatched: Vec<String>,
    /// reactions skipped with an error
    pub failed: Vec<(String, String)>,
    /// overwrites of differing parameter annotations
    pub conflicts: usize,
}

/// Annotate every reaction of the model against the catalog, in place.
pub fn annotate_model(
    model: &mut ModelDocument,
    catalog: &RateLawCatalog,
    config: &MatcherConfig,
) -> AnnotationReport {
    let compartment_ids: Vec<String> =
        model.compartments.iter().map(|c| c.id.clone()).collect();
    let definitions = parse_function_definitions(model);

    let mut report = AnnotationReport::default();
    let globals = &mut model.parameters;
    for reaction in &mut model.reactions {
        match annotate_reaction(
            reaction,
            globals,
            &compartment_ids,
            &definitions,
            catalog,
            config,
            &mut report.conflicts,
        ) {
            Ok(Some(sbo_id)) => {
                info!("reaction '{}' matched SBO:{:07}", reaction.id, sbo_id);
                report.matched.push((reaction.id.clone(), sbo_id));
            }
            Ok(None) => report.unmatched.push(reaction.id.clone()),
            Err(err) => {
                error!("reaction '{}' skipped: {}", reaction.id, err);
                report.failed.push((reaction.id.clone(), err.to_string()));
            }
        }
        // every declared participant must end up with at least a coarse role
        apply_generic_fallback(reaction);
    }
    info!(
        "annotation pass done: {} matched, {} unmatched, {} failed, {} conflicts",
        report.matched.len(),
        report.unmatched.len(),
        report.failed.len(),
        report.conflicts
    );
    report
}

/// A broken definition poisons only the reactions calling it (they fail with
/// an unknown-function error); every other definition stays usable.
fn parse_function_definitions(model: &ModelDocument) -> HashMap<String, FunctionDefinition> {
    let mut definitions = HashMap::new();
    for f in &model.functions {
        match Expr::parse_expression(&f.body) {
            Ok(body) => {
                definitions.insert(
                    f.id.clone(),
                    FunctionDefinition {
                        id: f.id.clone(),
                        arguments: f.arguments.clone(),
                        body,
                    },
                );
            }
            Err(err) => warn!("function definition '{}' is unusable: {}", f.id, err),
        }
    }
    definitions
}

fn annotate_reaction(
    reaction: &mut Reaction,
    globals: &mut Vec<Parameter>,
    compartment_ids: &[String],
    definitions: &HashMap<String, FunctionDefinition>,
    catalog: &RateLawCatalog,
    config: &MatcherConfig,
    conflicts: &mut usize,
) -> Result<Option<u32>, AnnotateError> {
    let raw = Expr::parse_expression(&reaction.kinetic_law.formula)?;

    // StripCompartments: volume factors become the multiplicative identity
    let strip: HashMap<String, Expr> = compartment_ids
        .iter()
        .map(|id| (id.clone(), Expr::Const(1.0)))
        .collect();
    let stripped = raw.substitute(&strip);

    // InlineFunctions
    let formula = inline_functions(&stripped, definitions)?;

    // Partition
    let free_vars = formula.free_variables();
    let roles = RoleSet::partition(
        &reaction.declared_reactants(),
        &reaction.declared_products(),
        &reaction.declared_modifiers(),
        &free_vars,
    );
    roles.check_covers(&formula)?;

    // Match
    let result = match match_rate_law(catalog, &roles, &formula, config)? {
        Some(result) => result,
        None => {
            warn!(
                "could not map reaction '{}': {} with roles {:?}",
                reaction.id, formula, roles
            );
            return Ok(None);
        }
    };

    // Annotate; a dual-role species carries one role per catalog variable,
    // each annotating the references of its own kind only
    reaction.kinetic_law.sbo_term = Some(result.sbo_id);
    for (variable, roles) in &result.variable_map {
        for role in roles {
            for (kind, refs) in [
                (RoleKind::Reactant, &mut reaction.reactants),
                (RoleKind::Product, &mut reaction.products),
                (RoleKind::Modifier, &mut reaction.modifiers),
            ] {
                if role.has_kind(kind) {
                    for species_ref in refs.iter_mut().filter(|r| r.species == *variable) {
                        species_ref.sbo_term = Some(role.role_id);
                    }
                }
            }
            if role.has_kind(RoleKind::Parameter) {
                annotate_parameter(reaction, globals, variable, role.role_id, conflicts);
            }
        }
    }
    Ok(Some(result.sbo_id))
}

/// Reaction-local parameter if one exists with this name, else model-global.
fn annotate_parameter(
    reaction: &mut Reaction,
    globals: &mut Vec<Parameter>,
    name: &str,
    role_id: u32,
    conflicts: &mut usize,
) {
    if let Some(local) = reaction
        .kinetic_law
        .parameters
        .iter_mut()
        .find(|p| p.id == name)
    {
        local.sbo_term = Some(role_id);
        return;
    }
    match globals.iter_mut().find(|p| p.id == name) {
        Some(global) => {
            if let Some(old) = global.sbo_term {
                if old != role_id {
                    warn!(
                        "overwriting SBO:{:07} with SBO:{:07} on global parameter '{}'",
                        old, role_id, name
                    );
                    *conflicts += 1;
                }
            }
            global.sbo_term = Some(role_id);
        }
        None => warn!(
            "mapped parameter '{}' of reaction '{}' is declared nowhere",
            name, reaction.id
        ),
    }
}

fn apply_generic_fallback(reaction: &mut Reaction) {
    for (refs, generic) in [
        (&mut reaction.reactants, GENERIC_REACTANT_ROLE),
        (&mut reaction.products, GENERIC_PRODUCT_ROLE),
        (&mut reaction.modifiers, GENERIC_MODIFIER_ROLE),
    ] {
        for species_ref in refs.iter_mut() {
            if species_ref.sbo_term.is_none() {
                species_ref.sbo_term = Some(generic);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Annotator::model_document::ModelDocument;
    use crate::Matcher::catalog::builtin_laws;

    fn model_from(json: &str) -> ModelDocument {
        serde_json::from_str(json).unwrap()
    }

    const MM_MODEL: &str = r#"{
        "id": "mm",
        "compartments": [{"id": "cell", "size": 1.0}],
        "parameters": [{"id": "K1", "value": 0.5}],
        "reactions": [
            {
                "id": "veq",
                "reactants": [{"species": "Sub"}],
                "modifiers": [{"species": "Enz"}],
                "kinetic_law": {
                    "formula": "cell * k1 * Enz * Sub / (K1 + Sub)",
                    "parameters": [{"id": "k1", "value": 2.0}]
                }
            }
        ]
    }"#;

    #[test]
    fn test_annotate_michaelis_menten_model() {
        let mut model = model_from(MM_MODEL);
        let catalog = builtin_laws();
        let report = annotate_model(&mut model, &catalog, &MatcherConfig::default());

        assert_eq!(report.matched, vec![("veq".to_string(), 28)]);
        assert!(report.unmatched.is_empty());
        assert!(report.failed.is_empty());

        let reaction = &model.reactions[0];
        assert_eq!(reaction.kinetic_law.sbo_term, Some(28));
        assert_eq!(reaction.reactants[0].sbo_term, Some(10));
        assert_eq!(reaction.modifiers[0].sbo_term, Some(461));
        // local parameter k1 plays kcat, global K1 plays Km
        assert_eq!(reaction.kinetic_law.parameters[0].sbo_term, Some(25));
        assert_eq!(model.parameters[0].sbo_term, Some(371));
    }

    #[test]
    fn test_unmatched_reaction_gets_generic_fallback() {
        let mut model = model_from(
            r#"{
            "id": "odd",
            "reactions": [
                {
                    "id": "r1",
                    "reactants": [{"species": "A"}],
                    "products": [{"species": "B"}],
                    "modifiers": [{"species": "M"}],
                    "kinetic_law": {"formula": "k / (1 + A^4) * M - B"}
                }
            ]
        }"#,
        );
        let catalog = builtin_laws();
        let report = annotate_model(&mut model, &catalog, &MatcherConfig::default());

        assert_eq!(report.unmatched, vec!["r1".to_string()]);
        let reaction = &model.reactions[0];
        assert_eq!(reaction.kinetic_law.sbo_term, None);
        assert_eq!(reaction.reactants[0].sbo_term, Some(GENERIC_REACTANT_ROLE));
        assert_eq!(reaction.products[0].sbo_term, Some(GENERIC_PRODUCT_ROLE));
        assert_eq!(reaction.modifiers[0].sbo_term, Some(GENERIC_MODIFIER_ROLE));
    }

    #[test]
    fn test_parameter_conflict_is_counted_and_overwritten() {
        let mut model = model_from(
            r#"{
            "id": "conflict",
            "parameters": [{"id": "K1", "sbo_term": 9}, {"id": "k1"}],
            "reactions": [
                {
                    "id": "veq",
                    "reactants": [{"species": "Sub"}],
                    "modifiers": [{"species": "Enz"}],
                    "kinetic_law": {"formula": "k1 * Enz * Sub / (K1 + Sub)"}
                }
            ]
        }"#,
        );
        let catalog = builtin_laws();
        let report = annotate_model(&mut model, &catalog, &MatcherConfig::default());

        assert_eq!(report.conflicts, 1);
        // last write wins
        assert_eq!(model.parameters[0].sbo_term, Some(371));
        assert_eq!(model.parameters[1].sbo_term, Some(25));
    }

    #[test]
    fn test_reaction_failures_are_isolated() {
        let mut model = model_from(
            r#"{
            "id": "mixed",
            "reactions": [
                {
                    "id": "broken",
                    "reactants": [{"species": "A"}],
                    "kinetic_law": {"formula": "ghost(A) * k"}
                },
                {
                    "id": "fine",
                    "reactants": [{"species": "A"}],
                    "kinetic_law": {"formula": "k * A"}
                }
            ]
        }"#,
        );
        let catalog = builtin_laws();
        let report = annotate_model(&mut model, &catalog, &MatcherConfig::default());

        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "broken");
        assert_eq!(report.matched, vec![("fine".to_string(), 41)]);
        // even the skipped reaction's participants carry generic roles
        assert_eq!(model.reactions[0].reactants[0].sbo_term, Some(10));
        assert_eq!(model.reactions[1].reactants[0].sbo_term, Some(10));
    }

    #[test]
    fn test_broken_function_definition_only_poisons_its_callers() {
        // one unparseable body must not take down reactions calling the
        // other, valid definitions
        let mut model = model_from(
            r#"{
            "id": "mixed_defs",
            "functions": [
                {"id": "bad", "arguments": ["x"], "body": "(x"},
                {"id": "hill", "arguments": ["x", "n", "k"], "body": "x^n / (k^n + x^n)"}
            ],
            "reactions": [
                {
                    "id": "uses_bad",
                    "reactants": [{"species": "A"}],
                    "kinetic_law": {"formula": "k * bad(A)"}
                },
                {
                    "id": "uses_hill",
                    "reactants": [{"species": "S"}],
                    "kinetic_law": {"formula": "Vmax * hill(S, 2, Km)"}
                }
            ]
        }"#,
        );
        let mut catalog = RateLawCatalog::new();
        catalog
            .add_law(
                192,
                "V * x^2 / (k^2 + x^2)",
                &[
                    ("V", "parameter", 324, 324),
                    ("x", "reactant", 509, 10),
                    ("k", "parameter", 371, 371),
                ],
            )
            .unwrap();
        let report = annotate_model(&mut model, &catalog, &MatcherConfig::default());

        assert_eq!(report.matched, vec![("uses_hill".to_string(), 192)]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "uses_bad");
        assert!(report.failed[0].1.contains("bad"));
    }

    #[test]
    fn test_dual_role_species_annotated_on_both_references() {
        // a species declared reactant and product of the same reaction gets
        // its reactant reference and its product reference annotated with the
        // role of the respective kind
        let mut model = model_from(
            r#"{
            "id": "isomerization",
            "reactions": [
                {
                    "id": "rev",
                    "reactants": [{"species": "A"}],
                    "products": [{"species": "A"}],
                    "kinetic_law": {
                        "formula": "k1 * A - k2 * A",
                        "parameters": [{"id": "k1"}, {"id": "k2"}]
                    }
                }
            ]
        }"#,
        );
        let catalog = builtin_laws();
        let report = annotate_model(&mut model, &catalog, &MatcherConfig::default());

        assert_eq!(report.matched, vec![("rev".to_string(), 42)]);
        let reaction = &model.reactions[0];
        assert_eq!(reaction.reactants[0].sbo_term, Some(10));
        assert_eq!(reaction.products[0].sbo_term, Some(11));
    }

    #[test]
    fn test_hill_function_model_end_to_end() {
        let mut model = model_from(
            r#"{
            "id": "hill_model",
            "functions": [
                {"id": "hill", "arguments": ["x", "n", "k"], "body": "x^n / (k^n + x^n)"}
            ],
            "reactions": [
                {
                    "id": "rh",
                    "reactants": [{"species": "S"}],
                    "kinetic_law": {"formula": "Vmax * hill(S, 2, Km)"}
                }
            ]
        }"#,
        );
        let mut catalog = RateLawCatalog::new();
        catalog
            .add_law(
                192,
                "V * x^2 / (k^2 + x^2)",
                &[
                    ("V", "parameter", 324, 324),
                    ("x", "reactant", 509, 10),
                    ("k", "parameter", 371, 371),
                ],
            )
            .unwrap();
        let report = annotate_model(&mut model, &catalog, &MatcherConfig::default());
        assert_eq!(report.matched, vec![("rh".to_string(), 192)]);
        assert_eq!(model.reactions[0].reactants[0].sbo_term, Some(10));
    }
}
