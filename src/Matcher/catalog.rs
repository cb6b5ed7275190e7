//! # Rate-Law Catalog Module
//!
//! ## Aim
//! The append-only ordered store of canonical rate-law patterns. Every entry
//! carries an SBO identifier, a symbolic formula and a role map assigning each
//! formula variable its chemical kind(s), a semantic identifier (what the
//! variable is, e.g. substrate concentration) and a role identifier (what gets
//! written onto the model, e.g. substrate). Insertion order is match priority:
//! the matcher commits to the first entry that matches, so duplicates are
//! legal and simply unreachable behind an earlier identical-shape entry.
//!
//! ## Persistence
//! Catalogs are serde_json files holding the entry sequence verbatim, like
//! every other library file of this crate family. `load` appends, `save`
//! serializes the current store.
//!
//! ## Seed Set
//! `builtin_laws()` registers the fixed set used by the `-initialise` action:
//! Michaelis-Menten with kcat or Vmax, mass-action forms (irreversible,
//! reversible, modifier variants) and the competitive / substrate / product
//! inhibition laws.

use crate::Matcher::role_partition::RoleKind;
use crate::symbolic::symbolic_engine::{Expr, ExprError};
use log::info;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use thiserror::Error;

/// error types for catalog construction and persistence
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("cannot parse catalog formula: {0}")]
    Formula(#[from] ExprError),
    #[error("unknown role kind '{0}' in role map")]
    BadRoleKind(String),
    #[error("catalog file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("catalog (de)serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Role annotation of one catalog variable. `kinds` holds more than one entry
/// for combined roles such as "reactant,product" (a species consumed and
/// re-produced by the same reaction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermRole {
    pub kinds: Vec<RoleKind>,
    pub semantic_id: u32,
    pub role_id: u32,
}

impl TermRole {
    pub fn new(kinds: Vec<RoleKind>, semantic_id: u32, role_id: u32) -> Self {
        Self {
            kinds,
            semantic_id,
            role_id,
        }
    }

    /// Parse a comma-combined kind list, e.g. "reactant,product".
    pub fn parse_kinds(text: &str) -> Result<Vec<RoleKind>, CatalogError> {
        text.split(',')
            .map(|part| match part.trim() {
                "reactant" => Ok(RoleKind::Reactant),
                "product" => Ok(RoleKind::Product),
                "modifier" => Ok(RoleKind::Modifier),
                "parameter" => Ok(RoleKind::Parameter),
                other => Err(CatalogError::BadRoleKind(other.to_string())),
            })
            .collect()
    }

    pub fn has_kind(&self, kind: RoleKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn kinds_string(&self) -> String {
        self.kinds
            .iter()
            .map(|k| k.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// One canonical rate-law pattern. Immutable once appended to a catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub sbo_id: u32,
    pub expression: Expr,
    pub role_map: HashMap<String, TermRole>,
}

/// The ordered catalog of rate-law patterns, owned by the session/caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLawCatalog {
    entries: Vec<CatalogEntry>,
}

impl RateLawCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pattern given as formula text and a role table of
    /// `(variable, comma-combined kinds, semantic id, role id)`.
    pub fn add_law(
        &mut self,
        sbo_id: u32,
        formula: &str,
        roles: &[(&str, &str, u32, u32)],
    ) -> Result<(), CatalogError> {
        let expression = Expr::parse_expression(formula)?;
        let mut role_map = HashMap::new();
        for (var, kinds, semantic_id, role_id) in roles {
            role_map.insert(
                var.to_string(),
                TermRole::new(TermRole::parse_kinds(kinds)?, *semantic_id, *role_id),
            );
        }
        self.push_entry(CatalogEntry {
            sbo_id,
            expression,
            role_map,
        });
        Ok(())
    }

    pub fn push_entry(&mut self, entry: CatalogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append the entries of a previously saved catalog file.
    pub fn load(&mut self, path: &str) -> Result<usize, CatalogError> {
        let text = fs::read_to_string(path)?;
        let loaded: Vec<CatalogEntry> = serde_json::from_str(&text)?;
        let count = loaded.len();
        self.entries.extend(loaded);
        info!("loaded {} catalog entries from {}", count, path);
        Ok(count)
    }

    /// Serialize the current store verbatim.
    pub fn save(&self, path: &str) -> Result<(), CatalogError> {
        let text = serde_json::to_string_pretty(&self.entries)?;
        fs::write(path, text)?;
        info!("saved {} catalog entries to {}", self.entries.len(), path);
        Ok(())
    }

    /// Print the catalog as a table, one row per entry.
    pub fn pretty_print_catalog(&self) {
        let mut table = Table::new();
        table.add_row(Row::new(vec![
            Cell::new("SBO"),
            Cell::new("formula"),
            Cell::new("roles"),
        ]));
        for entry in &self.entries {
            let mut roles: Vec<String> = entry
                .role_map
                .iter()
                .map(|(var, role)| format!("{}:{} ({})", var, role.kinds_string(), role.role_id))
                .collect();
            roles.sort();
            table.add_row(Row::new(vec![
                Cell::new(&format!("SBO:{:07}", entry.sbo_id)),
                Cell::new(&format!("{}", entry.expression)),
                Cell::new(&roles.join("\n")),
            ]));
        }
        table.printstd();
    }
}

/// The fixed seed set registered by the `-initialise` action.
pub fn builtin_laws() -> RateLawCatalog {
    let mut catalog = RateLawCatalog::new();
    // Michaelis-Menten with Briggs-Haldane approximation (kcat form)
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
    // Michaelis-Menten with Vmax instead of kcat
    catalog
        .add_law(
            28,
            "Vmax * S / (Km + S)",
            &[
                ("Vmax", "parameter", 324, 324),
                ("S", "reactant", 509, 10),
                ("Km", "parameter", 371, 371),
            ],
        )
        .unwrap();
    // mass action with constant in denominator
    catalog
        .add_law(
            28,
            "R1 * R2 / c",
            &[
                ("R1", "reactant", 509, 10),
                ("R2", "reactant", 509, 10),
                ("c", "parameter", 36, 36),
            ],
        )
        .unwrap();
    // enzymatic rate law with Km + E in denominator
    catalog
        .add_law(
            28,
            "kcat * E * S / (Km + E)",
            &[
                ("kcat", "parameter", 25, 25),
                ("E", "modifier", 524, 461),
                ("S", "reactant", 509, 10),
                ("Km", "parameter", 371, 371),
            ],
        )
        .unwrap();
    // mass action with modifier: A; B
    catalog
        .add_law(
            49,
            "k * M",
            &[("k", "parameter", 35, 35), ("M", "modifier", 524, 461)],
        )
        .unwrap();
    // mass action with modifier: A + B -> A + C
    catalog
        .add_law(
            45,
            "k * M * R",
            &[
                ("R", "reactant", 509, 10),
                ("M", "reactant,product", 524, 461),
                ("k", "parameter", 36, 36),
            ],
        )
        .unwrap();
    // irreversible mass action, first and second order
    catalog
        .add_law(
            41,
            "k * R",
            &[("k", "parameter", 35, 35), ("R", "reactant", 509, 10)],
        )
        .unwrap();
    catalog
        .add_law(
            41,
            "k * R1 * R2",
            &[
                ("k", "parameter", 36, 36),
                ("R1", "reactant", 509, 10),
                ("R2", "reactant", 509, 10),
            ],
        )
        .unwrap();
    // reversible mass action
    catalog
        .add_law(
            42,
            "kf * R - kr * P",
            &[
                ("kf", "parameter", 36, 36),
                ("kr", "parameter", 36, 36),
                ("R", "reactant", 509, 10),
                ("P", "product", 512, 11),
            ],
        )
        .unwrap();
    // simple competitive inhibition
    catalog
        .add_law(
            260,
            "Vmax * S / (Km * (1 + I / Ki) + S)",
            &[
                ("Vmax", "parameter", 324, 324),
                ("S", "reactant", 509, 10),
                ("Km", "parameter", 371, 371),
                ("I", "modifier", 520, 20),
                ("Ki", "parameter", 261, 261),
            ],
        )
        .unwrap();
    // substrate inhibition
    catalog
        .add_law(
            455,
            "Vmax * S / (Km + S * (1 + S / Ki))",
            &[
                ("Vmax", "parameter", 324, 324),
                ("S", "reactant", 509, 10),
                ("Km", "parameter", 371, 371),
                ("Ki", "parameter", 261, 261),
            ],
        )
        .unwrap();
    // product inhibition
    catalog
        .add_law(
            387,
            "Vmax * S / (Km * (1 + P / Ki) + S)",
            &[
                ("Vmax", "parameter", 324, 324),
                ("S", "reactant", 509, 10),
                ("Km", "parameter", 371, 371),
                ("P", "product", 512, 11),
                ("Ki", "parameter", 261, 261),
            ],
        )
        .unwrap();
    catalog
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_law_preserves_order() {
        let mut catalog = RateLawCatalog::new();
        catalog
            .add_law(49, "k * M", &[("k", "parameter", 35, 35), ("M", "modifier", 524, 461)])
            .unwrap();
        catalog
            .add_law(41, "k * R", &[("k", "parameter", 35, 35), ("R", "reactant", 509, 10)])
            .unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.entries()[0].sbo_id, 49);
        assert_eq!(catalog.entries()[1].sbo_id, 41);
    }

    #[test]
    fn test_duplicates_are_legal() {
        let mut catalog = RateLawCatalog::new();
        for _ in 0..2 {
            catalog
                .add_law(41, "k * R", &[("k", "parameter", 35, 35), ("R", "reactant", 509, 10)])
                .unwrap();
        }
        assert_eq!(catalog.len(), 2);
    }

    #[test]
    fn test_bad_role_kind_rejected() {
        let mut catalog = RateLawCatalog::new();
        let result = catalog.add_law(41, "k * R", &[("k", "konstant", 35, 35)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_combined_kinds() {
        let kinds = TermRole::parse_kinds("reactant,product").unwrap();
        assert_eq!(kinds, vec![RoleKind::Reactant, RoleKind::Product]);
    }

    #[test]
    fn test_builtin_role_maps_cover_formulas() {
        // every variable of every seed formula must carry a role
        let catalog = builtin_laws();
        assert!(!catalog.is_empty());
        for entry in catalog.entries() {
            let free = entry.expression.free_variables();
            for var in &free {
                assert!(
                    entry.role_map.contains_key(var),
                    "SBO:{} leaves '{}' unclassified",
                    entry.sbo_id,
                    var
                );
            }
            assert_eq!(free.len(), entry.role_map.len());
        }
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("laws.json");
        let path = path.to_str().unwrap();

        let catalog = builtin_laws();
        catalog.save(path).unwrap();

        let mut reloaded = RateLawCatalog::new();
        let count = reloaded.load(path).unwrap();
        assert_eq!(count, catalog.len());
        assert_eq!(reloaded.entries(), catalog.entries());

        // load appends rather than replaces
        reloaded.load(path).unwrap();
        assert_eq!(reloaded.len(), 2 * catalog.len());
    }
}
