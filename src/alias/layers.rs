//! Layered alias definitions.
//!
//! Built-in definitions and caller-supplied definitions live in separate
//! layers. [`AliasLayers::merged`] produces the compile order for a given
//! [`AliasPrecedence`]; the winning layer is compiled last.

use super::record::{load_aliases, AliasDefinition};
use crate::config::AliasPrecedence;
use crate::error::Result;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasLayers {
    builtin: Vec<AliasDefinition>,
    extra: Vec<AliasDefinition>,
}

impl AliasLayers {
    pub fn new(builtin: Vec<AliasDefinition>) -> Self {
        Self {
            builtin,
            extra: Vec::new(),
        }
    }

    /// Layers whose built-in part is parsed from YAML.
    pub fn from_builtin_yaml(data: &str) -> Result<Self> {
        Ok(Self::new(load_aliases(data)?))
    }

    pub fn with_extra(mut self, extra: Vec<AliasDefinition>) -> Self {
        self.extra.extend(extra);
        self
    }

    pub fn push_extra(&mut self, definition: AliasDefinition) {
        self.extra.push(definition);
    }

    pub fn builtin(&self) -> &[AliasDefinition] {
        &self.builtin
    }

    pub fn extra(&self) -> &[AliasDefinition] {
        &self.extra
    }

    /// Definitions in compile order for `precedence`.
    pub fn merged(&self, precedence: AliasPrecedence) -> Vec<AliasDefinition> {
        let (first, last) = match precedence {
            AliasPrecedence::BuiltinWins => (&self.extra, &self.builtin),
            AliasPrecedence::ExtraWins => (&self.builtin, &self.extra),
        };
        first.iter().chain(last.iter()).cloned().collect()
    }
}
