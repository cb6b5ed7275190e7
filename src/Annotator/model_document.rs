//! # Model Document Module
//!
//! ## Aim
//! The model collaborator of the annotation pipeline: a structured-record
//! document holding, per reaction, the rate-law formula, the declared
//! reactant/product/modifier species, local parameters, plus the model-wide
//! compartments, global parameters and user-defined function definitions.
//! The engine reads these fields and writes SBO identifiers back onto the
//! rate law, the species references and the parameters.
//!
//! The on-disk representation is serde_json, like every library file of this
//! crate family; any format preserving the record structure would do.

use serde::{Deserialize, Serialize};
use std::fs;
use thiserror::Error;

/// error types for model document I/O
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model file error: {0}")]
    Io(#[from] std::io::Error),
    #[error("model (de)serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Compartment {
    pub id: String,
    #[serde(default)]
    pub size: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub id: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbo_term: Option<u32>,
}

/// Reference from a reaction to a participating species; the annotation
/// pipeline writes the role identifier into `sbo_term`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeciesReference {
    pub species: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbo_term: Option<u32>,
}

impl SpeciesReference {
    pub fn new(species: &str) -> Self {
        Self {
            species: species.to_string(),
            sbo_term: None,
        }
    }
}

/// A user-defined function as written in the model: formal parameter names and
/// an infix body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub id: String,
    pub arguments: Vec<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KineticLaw {
    pub formula: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sbo_term: Option<u32>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    #[serde(default)]
    pub reactants: Vec<SpeciesReference>,
    #[serde(default)]
    pub products: Vec<SpeciesReference>,
    #[serde(default)]
    pub modifiers: Vec<SpeciesReference>,
    pub kinetic_law: KineticLaw,
}

impl Reaction {
    pub fn declared_reactants(&self) -> Vec<String> {
        self.reactants.iter().map(|r| r.species.clone()).collect()
    }
    pub fn declared_products(&self) -> Vec<String> {
        self.products.iter().map(|r| r.species.clone()).collect()
    }
    pub fn declared_modifiers(&self) -> Vec<String> {
        self.modifiers.iter().map(|r| r.species.clone()).collect()
    }
}

/// The whole model document, annotated in place by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDocument {
    pub id: String,
    #[serde(default)]
    pub compartments: Vec<Compartment>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub functions: Vec<FunctionDef>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
}

impl ModelDocument {
    pub fn read_from_file(path: &str) -> Result<ModelDocument, ModelError> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn write_to_file(&self, path: &str) -> Result<(), ModelError> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text)?;
        Ok(())
    }
}
