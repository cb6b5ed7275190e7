//! # Role Partition Module
//!
//! ## Aim
//! Classify every free variable of a (compartment-stripped, function-inlined)
//! rate law into exactly one chemical role: reactant, product, modifier or
//! parameter. The reaction's declared participant lists drive the species
//! roles; everything left over is a parameter by exclusion.
//!
//! ## Main Data Structures and Logic
//! - `RoleKind`: the four chemical participation categories
//! - `RoleSet`: named four-field structure of variable-name sets, one per role;
//!   `BTreeSet` keeps iteration order deterministic for the matcher
//! - `RoleSet::partition()`: intersects declared participant lists with the
//!   formula's free variables and derives parameters by set difference
//! - `RoleSet::check_covers()`: every free variable must end up in some role,
//!   a variable covered by no role is a classification error, never dropped

use crate::symbolic::symbolic_engine::Expr;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use thiserror::Error;

/// error types for role classification
#[derive(Debug, Error, PartialEq)]
pub enum RoleError {
    #[error("variables {0:?} of formula '{1}' could not be classified into any role")]
    UnclassifiedVariables(Vec<String>, String),
}

/// Chemical participation category of a variable in a rate law.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleKind {
    Reactant,
    Product,
    Modifier,
    Parameter,
}

impl RoleKind {
    pub const ALL: [RoleKind; 4] = [
        RoleKind::Reactant,
        RoleKind::Product,
        RoleKind::Modifier,
        RoleKind::Parameter,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleKind::Reactant => "reactant",
            RoleKind::Product => "product",
            RoleKind::Modifier => "modifier",
            RoleKind::Parameter => "parameter",
        }
    }
}

impl fmt::Display for RoleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The four role sets of one formula. Replaces the positional tuples of the
/// legacy tooling with named fields.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoleSet {
    pub reactants: BTreeSet<String>,
    pub products: BTreeSet<String>,
    pub modifiers: BTreeSet<String>,
    pub parameters: BTreeSet<String>,
}

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Partition the free variables of a formula given the reaction's declared
    /// participant species. Declared species absent from the formula are
    /// ignored; free variables that are not declared participants become
    /// parameters by exclusion.
    pub fn partition(
        declared_reactants: &[String],
        declared_products: &[String],
        declared_modifiers: &[String],
        free_vars: &BTreeSet<String>,
    ) -> RoleSet {
        let pick = |declared: &[String]| -> BTreeSet<String> {
            declared
                .iter()
                .filter(|species| free_vars.contains(*species))
                .cloned()
                .collect()
        };
        let reactants = pick(declared_reactants);
        let products = pick(declared_products);
        let modifiers = pick(declared_modifiers);
        let parameters = free_vars
            .iter()
            .filter(|var| {
                !reactants.contains(*var) && !products.contains(*var) && !modifiers.contains(*var)
            })
            .cloned()
            .collect();
        RoleSet {
            reactants,
            products,
            modifiers,
            parameters,
        }
    }

    /// The union of the four sets must equal the formula's free-variable set
    /// exactly; anything uncovered is a classification error.
    pub fn check_covers(&self, formula: &Expr) -> Result<(), RoleError> {
        let free_vars = formula.free_variables();
        let uncovered: Vec<String> = free_vars
            .iter()
            .filter(|var| {
                !self.reactants.contains(*var)
                    && !self.products.contains(*var)
                    && !self.modifiers.contains(*var)
                    && !self.parameters.contains(*var)
            })
            .cloned()
            .collect();
        if uncovered.is_empty() {
            Ok(())
        } else {
            Err(RoleError::UnclassifiedVariables(
                uncovered,
                format!("{}", formula),
            ))
        }
    }

    pub fn kind_set(&self, kind: RoleKind) -> &BTreeSet<String> {
        match kind {
            RoleKind::Reactant => &self.reactants,
            RoleKind::Product => &self.products,
            RoleKind::Modifier => &self.modifiers,
            RoleKind::Parameter => &self.parameters,
        }
    }

    pub fn kind_set_mut(&mut self, kind: RoleKind) -> &mut BTreeSet<String> {
        match kind {
            RoleKind::Reactant => &mut self.reactants,
            RoleKind::Product => &mut self.products,
            RoleKind::Modifier => &mut self.modifiers,
            RoleKind::Parameter => &mut self.parameters,
        }
    }

    /// Per-role variable counts `(reactants, products, modifiers, parameters)`.
    pub fn arities(&self) -> (usize, usize, usize, usize) {
        (
            self.reactants.len(),
            self.products.len(),
            self.modifiers.len(),
            self.parameters.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::symbolic_engine::Expr;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_partition_briggs_haldane() {
        let formula = Expr::parse_expression("kcat * enzyme * substrate / (km + substrate)")
            .unwrap();
        let free = formula.free_variables();
        let roles = RoleSet::partition(
            &strings(&["substrate"]),
            &[],
            &strings(&["enzyme"]),
            &free,
        );
        assert_eq!(roles.reactants, strings(&["substrate"]).into_iter().collect());
        assert!(roles.products.is_empty());
        assert_eq!(roles.modifiers, strings(&["enzyme"]).into_iter().collect());
        assert_eq!(
            roles.parameters,
            strings(&["kcat", "km"]).into_iter().collect()
        );
        assert!(roles.check_covers(&formula).is_ok());
    }

    #[test]
    fn test_partition_is_disjoint_and_complete() {
        let formula = Expr::parse_expression("k1 * A * B / (K1 + A)").unwrap();
        let free = formula.free_variables();
        let roles = RoleSet::partition(&strings(&["A", "B"]), &strings(&["C"]), &[], &free);
        // pairwise disjoint
        for var in &roles.reactants {
            assert!(!roles.parameters.contains(var));
            assert!(!roles.products.contains(var));
        }
        // union covers all free variables
        let union: BTreeSet<String> = roles
            .reactants
            .iter()
            .chain(&roles.products)
            .chain(&roles.modifiers)
            .chain(&roles.parameters)
            .cloned()
            .collect();
        assert_eq!(union, free);
        // declared product C is not in the formula and must not appear anywhere
        assert!(!union.contains("C"));
    }

    #[test]
    fn test_declared_species_absent_from_formula_ignored() {
        let formula = Expr::parse_expression("k * S").unwrap();
        let free = formula.free_variables();
        let roles = RoleSet::partition(&strings(&["S", "Ghost"]), &[], &[], &free);
        assert_eq!(roles.reactants.len(), 1);
        assert_eq!(roles.parameters.len(), 1);
    }

    #[test]
    fn test_check_covers_reports_uncovered() {
        let formula = Expr::parse_expression("k * S * X").unwrap();
        let mut roles = RoleSet::new();
        roles.reactants.insert("S".to_string());
        roles.parameters.insert("k".to_string());
        let err = roles.check_covers(&formula).unwrap_err();
        match err {
            RoleError::UnclassifiedVariables(vars, _) => assert_eq!(vars, vec!["X".to_string()]),
        }
    }

    #[test]
    fn test_arities() {
        let formula = Expr::parse_expression("k1 * R1 * R2 / c").unwrap();
        let roles = RoleSet::partition(
            &strings(&["R1", "R2"]),
            &[],
            &[],
            &formula.free_variables(),
        );
        assert_eq!(roles.arities(), (2, 0, 0, 2));
    }
}
