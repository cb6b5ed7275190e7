//! # Permutation Matcher Module
//!
//! ## Aim
//! The combinatorial core of the crate. Given a test formula with its role
//! sets, walk the catalog in insertion order and search, per entry, for a
//! per-role bijection of variable names under which the catalog formula is
//! symbolically identical to the test formula. The first passing bijection of
//! the first passing entry wins; everything else is short-circuited.
//!
//! ## Algorithm
//! 1. derive the entry's role sets from its role map (a combined
//!    "reactant,product" variable is counted in both sets)
//! 2. cardinality precheck: per-role variable counts must agree, otherwise the
//!    entry is skipped without any search
//! 3. exhaustive search over the Cartesian product of per-role permutations of
//!    the catalog variables, assigned to the fixed (sorted) test variables;
//!    reactants outermost, then products, modifiers, parameters innermost;
//!    permutations are enumerated lexicographically, so matching is
//!    deterministic and order-sensitive only in catalog insertion order
//! 4. each candidate renaming is substituted into the catalog formula and
//!    checked with the canonical-form equality oracle
//!
//! Cost is factorial in per-role arity. Real rate laws keep arities tiny
//! (usually <= 3 per role), so this is a deliberate bounded brute force; the
//! config caps below turn pathological inputs into a fast descriptive error
//! instead of unbounded CPU burn. No approximate matching.

use crate::Matcher::catalog::{CatalogEntry, RateLawCatalog, TermRole};
use crate::Matcher::role_partition::{RoleKind, RoleSet};
use crate::symbolic::symbolic_engine::Expr;
use crate::symbolic::symbolic_simplify::symbolic_eq;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// error types for the permutation search
#[derive(Debug, Error, PartialEq)]
pub enum MatchError {
    #[error("role {role} has {arity} variables, above the hard cap of {max}")]
    RoleArityExceeded {
        role: RoleKind,
        arity: usize,
        max: usize,
    },
    #[error("{total} candidate bijections exceed the budget of {max}")]
    PermutationBudgetExceeded { total: usize, max: usize },
}

/// Hard caps for the brute-force search (structural bounding, no timeouts).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatcherConfig {
    pub max_role_arity: usize,
    pub max_total_permutations: usize,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            max_role_arity: 6,
            max_total_permutations: 100_000,
        }
    }
}

/// Successful classification of one test formula: the matched entry's SBO id
/// plus the role annotations for every TEST variable. A test variable playing
/// several catalog variables at once (a species declared both reactant and
/// product against an entry with distinct variables for the two roles) carries
/// one role per catalog variable, ordered by catalog variable name.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub sbo_id: u32,
    pub variable_map: HashMap<String, Vec<TermRole>>,
}

/// Search the catalog for the first entry matching the test formula. `Ok(None)`
/// is the expected no-match outcome, not an error.
pub fn match_rate_law(
    catalog: &RateLawCatalog,
    test_roles: &RoleSet,
    test_expr: &Expr,
    config: &MatcherConfig,
) -> Result<Option<MatchResult>, MatchError> {
    check_budget(test_roles, config)?;
    for entry in catalog.entries() {
        let entry_roles = entry_role_set(entry);
        if !arities_agree(test_roles, &entry_roles) {
            debug!(
                "SBO:{} skipped, role arities {:?} vs {:?}",
                entry.sbo_id,
                entry_roles.arities(),
                test_roles.arities()
            );
            continue;
        }
        if let Some(renaming) = search_entry(entry, &entry_roles, test_roles, test_expr) {
            // sorted catalog-variable order keeps the per-variable role list
            // deterministic when several catalog variables rename to the same
            // test variable; no role is ever dropped
            let mut pairs: Vec<(&String, &String)> = renaming.iter().collect();
            pairs.sort();
            let mut variable_map: HashMap<String, Vec<TermRole>> = HashMap::new();
            for (catalog_var, test_var) in pairs {
                variable_map
                    .entry(test_var.clone())
                    .or_default()
                    .push(entry.role_map[catalog_var].clone());
            }
            return Ok(Some(MatchResult {
                sbo_id: entry.sbo_id,
                variable_map,
            }));
        }
    }
    Ok(None)
}

/// Derive the role sets of a catalog entry from its role map; combined-kind
/// variables land in every set their kinds name.
pub fn entry_role_set(entry: &CatalogEntry) -> RoleSet {
    let mut roles = RoleSet::new();
    for (var, role) in &entry.role_map {
        for kind in &role.kinds {
            roles.kind_set_mut(*kind).insert(var.clone());
        }
    }
    roles
}

fn arities_agree(test: &RoleSet, entry: &RoleSet) -> bool {
    RoleKind::ALL
        .iter()
        .all(|kind| test.kind_set(*kind).len() == entry.kind_set(*kind).len())
}

fn check_budget(test_roles: &RoleSet, config: &MatcherConfig) -> Result<(), MatchError> {
    let mut total: usize = 1;
    for kind in RoleKind::ALL {
        let arity = test_roles.kind_set(kind).len();
        if arity > config.max_role_arity {
            return Err(MatchError::RoleArityExceeded {
                role: kind,
                arity,
                max: config.max_role_arity,
            });
        }
        total = total.saturating_mul(factorial(arity));
    }
    if total > config.max_total_permutations {
        return Err(MatchError::PermutationBudgetExceeded {
            total,
            max: config.max_total_permutations,
        });
    }
    Ok(())
}

fn factorial(n: usize) -> usize {
    (1..=n).product::<usize>().max(1)
}

/// Exhaustive per-role permutation search for one entry. Returns the first
/// catalog-variable -> test-variable renaming under which the substituted
/// entry formula equals the test formula.
fn search_entry(
    entry: &CatalogEntry,
    entry_roles: &RoleSet,
    test_roles: &RoleSet,
    test_expr: &Expr,
) -> Option<HashMap<String, String>> {
    let test_of = |kind: RoleKind| -> Vec<String> {
        test_roles.kind_set(kind).iter().cloned().collect()
    };
    let entry_of = |kind: RoleKind| -> Vec<String> {
        entry_roles.kind_set(kind).iter().cloned().collect()
    };

    let (test_r, test_p, test_m, test_k) = (
        test_of(RoleKind::Reactant),
        test_of(RoleKind::Product),
        test_of(RoleKind::Modifier),
        test_of(RoleKind::Parameter),
    );

    // reactants outermost, parameters innermost
    for perm_r in permutations(&entry_of(RoleKind::Reactant)) {
        for perm_p in permutations(&entry_of(RoleKind::Product)) {
            for perm_m in permutations(&entry_of(RoleKind::Modifier)) {
                for perm_k in permutations(&entry_of(RoleKind::Parameter)) {
                    let mut renaming: HashMap<String, String> = HashMap::new();
                    for (catalog_vars, test_vars) in [
                        (&perm_r, &test_r),
                        (&perm_p, &test_p),
                        (&perm_m, &test_m),
                        (&perm_k, &test_k),
                    ] {
                        for (catalog_var, test_var) in catalog_vars.iter().zip(test_vars) {
                            // a combined-role variable is assigned once per
                            // kind; the last assignment stands, inconsistent
                            // ones simply fail the equality check below
                            renaming.insert(catalog_var.clone(), test_var.clone());
                        }
                    }
                    let substituted = entry.expression.rename_variables(&renaming);
                    if symbolic_eq(&substituted, test_expr) {
                        return Some(renaming);
                    }
                }
            }
        }
    }
    None
}

/// All permutations of `items`, lexicographic when the input is sorted.
fn permutations(items: &[String]) -> Vec<Vec<String>> {
    if items.is_empty() {
        return vec![Vec::new()];
    }
    let mut result = Vec::new();
    for i in 0..items.len() {
        let mut rest = items.to_vec();
        let head = rest.remove(i);
        for mut tail in permutations(&rest) {
            let mut perm = Vec::with_capacity(items.len());
            perm.push(head.clone());
            perm.append(&mut tail);
            result.push(perm);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Matcher::catalog::builtin_laws;
    use std::collections::BTreeSet;

    fn parse(s: &str) -> Expr {
        Expr::parse_expression(s).unwrap()
    }

    fn roles_of(
        reactants: &[&str],
        products: &[&str],
        modifiers: &[&str],
        formula: &Expr,
    ) -> RoleSet {
        let to_vec = |xs: &[&str]| xs.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        RoleSet::partition(
            &to_vec(reactants),
            &to_vec(products),
            &to_vec(modifiers),
            &formula.free_variables(),
        )
    }

    #[test]
    fn test_permutations_lexicographic_and_complete() {
        let items: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let perms = permutations(&items);
        assert_eq!(perms.len(), 6);
        assert_eq!(perms[0], vec!["a", "b", "c"]);
        assert_eq!(perms[5], vec!["c", "b", "a"]);
        let unique: BTreeSet<Vec<String>> = perms.iter().cloned().collect();
        assert_eq!(unique.len(), 6);
    }

    #[test]
    fn test_match_with_renamed_parameters() {
        // two same-role parameters force a real permutation search
        let catalog = builtin_laws();
        let formula = parse("q2 * Enz * Sub / (q1 + Sub)");
        let roles = roles_of(&["Sub"], &[], &["Enz"], &formula);
        let result = match_rate_law(&catalog, &roles, &formula, &MatcherConfig::default())
            .unwrap()
            .expect("should match the kcat Michaelis-Menten form");
        assert_eq!(result.sbo_id, 28);
        assert_eq!(result.variable_map["Sub"][0].kinds, vec![RoleKind::Reactant]);
        assert_eq!(result.variable_map["Enz"][0].kinds, vec![RoleKind::Modifier]);
        // q2 plays kcat, q1 plays Km; the roles must not be swapped
        assert_eq!(result.variable_map["q2"][0].role_id, 25);
        assert_eq!(result.variable_map["q1"][0].role_id, 371);
    }

    #[test]
    fn test_cardinality_precheck_is_necessary() {
        // one-reactant entries can never match a two-reactant test case
        let mut catalog = RateLawCatalog::new();
        catalog
            .add_law(
                28,
                "kcat * E * S / (Km + S)",
                &[
                    ("kcat", "parameter", 25, 25),
                    ("E", "modifier", 524, 461),
                    ("S", "reactant", 509, 10),
                    ("Km", "parameter", 371, 371),
                ],
            )
            .unwrap();
        let formula = parse("k1 * R1 * R2 / c");
        let roles = roles_of(&["R1", "R2"], &[], &[], &formula);
        let result =
            match_rate_law(&catalog, &roles, &formula, &MatcherConfig::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_first_match_wins_on_catalog_order() {
        let law = "k * R";
        let role_table: &[(&str, &str, u32, u32)] =
            &[("k", "parameter", 35, 35), ("R", "reactant", 509, 10)];
        let mut forward = RateLawCatalog::new();
        forward.add_law(41, law, role_table).unwrap();
        forward.add_law(99, law, role_table).unwrap();
        let mut reversed = RateLawCatalog::new();
        reversed.add_law(99, law, role_table).unwrap();
        reversed.add_law(41, law, role_table).unwrap();

        let formula = parse("k1 * A");
        let roles = roles_of(&["A"], &[], &[], &formula);
        let config = MatcherConfig::default();
        let first = match_rate_law(&forward, &roles, &formula, &config).unwrap().unwrap();
        let second = match_rate_law(&reversed, &roles, &formula, &config).unwrap().unwrap();
        assert_eq!(first.sbo_id, 41);
        assert_eq!(second.sbo_id, 99);
    }

    #[test]
    fn test_matching_is_deterministic() {
        let catalog = builtin_laws();
        let formula = parse("k1 * Enz * Sub / (K1 + Sub)");
        let roles = roles_of(&["Sub"], &[], &["Enz"], &formula);
        let config = MatcherConfig::default();
        let a = match_rate_law(&catalog, &roles, &formula, &config).unwrap();
        let b = match_rate_law(&catalog, &roles, &formula, &config).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_combined_role_variable_counts_in_both_sets() {
        // A + B -> A + C with rate k * A * B: A is reactant and product
        let catalog = builtin_laws();
        let formula = parse("k1 * A * B");
        let roles = roles_of(&["A", "B"], &["A", "C"], &[], &formula);
        let result = match_rate_law(&catalog, &roles, &formula, &MatcherConfig::default())
            .unwrap()
            .expect("should match the modifier mass-action form");
        assert_eq!(result.sbo_id, 45);
        // a single combined-kind catalog variable yields one role entry
        assert_eq!(result.variable_map["A"].len(), 1);
        assert!(result.variable_map["A"][0].has_kind(RoleKind::Reactant));
        assert!(result.variable_map["A"][0].has_kind(RoleKind::Product));
        assert_eq!(result.variable_map["B"][0].kinds, vec![RoleKind::Reactant]);
    }

    #[test]
    fn test_dual_role_species_collects_both_roles() {
        // A <-> A' style case: the same species is declared reactant and
        // product, while the entry uses distinct variables for the two roles;
        // both roles must survive in the result, in catalog-variable order
        let catalog = builtin_laws();
        let formula = parse("k1 * A - k2 * A");
        let roles = roles_of(&["A"], &["A"], &[], &formula);
        let result = match_rate_law(&catalog, &roles, &formula, &MatcherConfig::default())
            .unwrap()
            .expect("should match the reversible mass-action form");
        assert_eq!(result.sbo_id, 42);

        let a_roles = &result.variable_map["A"];
        assert_eq!(a_roles.len(), 2);
        // entry variable P sorts before R
        assert!(a_roles[0].has_kind(RoleKind::Product));
        assert_eq!(a_roles[0].role_id, 11);
        assert!(a_roles[1].has_kind(RoleKind::Reactant));
        assert_eq!(a_roles[1].role_id, 10);
    }

    #[test]
    fn test_arity_cap_fails_fast() {
        let catalog = builtin_laws();
        let vars: Vec<String> = (0..8).map(|i| format!("R{}", i)).collect();
        let formula_text = vars.join(" * ");
        let formula = parse(&format!("k * {}", formula_text));
        let declared: Vec<&str> = vars.iter().map(|s| s.as_str()).collect();
        let roles = roles_of(&declared, &[], &[], &formula);
        let err = match_rate_law(&catalog, &roles, &formula, &MatcherConfig::default())
            .unwrap_err();
        assert_eq!(
            err,
            MatchError::RoleArityExceeded {
                role: RoleKind::Reactant,
                arity: 8,
                max: 6
            }
        );
    }

    #[test]
    fn test_permutation_budget_fails_fast() {
        let catalog = builtin_laws();
        let formula = parse("a * b * c * d * e * f * k1 * k2 * k3 * k4 * k5 * k6");
        let declared: Vec<&str> = vec!["a", "b", "c", "d", "e", "f"];
        let roles = roles_of(&declared, &[], &[], &formula);
        // 6! * 6! = 518400 candidate bijections
        let err = match_rate_law(&catalog, &roles, &formula, &MatcherConfig::default())
            .unwrap_err();
        match err {
            MatchError::PermutationBudgetExceeded { total, .. } => assert_eq!(total, 518_400),
            other => panic!("expected budget error, got {:?}", other),
        }
    }

    #[test]
    fn test_no_match_is_ok_none() {
        let catalog = builtin_laws();
        let formula = parse("k1 / (1 + S^4)");
        let roles = roles_of(&["S"], &[], &[], &formula);
        let result =
            match_rate_law(&catalog, &roles, &formula, &MatcherConfig::default()).unwrap();
        assert!(result.is_none());
    }
}
