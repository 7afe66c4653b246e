//
// Copyright (c) 2025-2026 Jeff Garzik
//
// This file is part of the posixutils-rs project covered under
// the MIT License.  For the full license text, please see the LICENSE
// file in the root directory of this project.
// SPDX-License-Identifier: MIT
//
// Run configuration for ccgo
//

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::target::Target;

/// Scalar type accepted when no --allow-type is given
pub const DEFAULT_ALLOWED_TYPE: &str = "int64_t";

/// Everything one extraction run depends on besides the input file
#[derive(Debug, Clone)]
pub struct Config {
    /// -I directories, searched in order
    pub include_paths: Vec<PathBuf>,
    /// Default system directories, searched after `include_paths`
    pub system_include_paths: Vec<PathBuf>,
    /// Scalar type names a non-pointer parameter may have
    pub allowed_types: BTreeSet<String>,
    /// -D arguments, `name` or `name=value`
    pub defines: Vec<String>,
    /// -U arguments, applied after all defines
    pub undefines: Vec<String>,
    pub target: Target,
}

impl Default for Config {
    fn default() -> Self {
        Self::for_target(Target::host())
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_target(target: Target) -> Self {
        Self {
            include_paths: Vec::new(),
            system_include_paths: target.include_paths().into_iter().map(PathBuf::from).collect(),
            allowed_types: BTreeSet::from([DEFAULT_ALLOWED_TYPE.to_string()]),
            defines: Vec::new(),
            undefines: Vec::new(),
            target,
        }
    }

    pub fn with_include_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_paths.push(dir.into());
        self
    }

    /// Drop the default system include directories
    pub fn without_system_includes(mut self) -> Self {
        self.system_include_paths.clear();
        self
    }

    /// Replace the allowed scalar types
    pub fn with_allowed_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_define(mut self, def: impl Into<String>) -> Self {
        self.defines.push(def.into());
        self
    }

    pub fn with_undef(mut self, name: impl Into<String>) -> Self {
        self.undefines.push(name.into());
        self
    }

    /// Full search list: -I directories, then system directories
    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.include_paths
            .iter()
            .chain(&self.system_include_paths)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{Arch, Os};

    #[test]
    fn test_defaults() {
        let config = Config::for_target(Target::new(Arch::X86_64, Os::Linux));
        assert!(config.include_paths.is_empty());
        assert!(config.allowed_types.contains("int64_t"));
        assert_eq!(config.allowed_types.len(), 1);
        assert_eq!(
            config.search_paths().last(),
            Some(&PathBuf::from("/usr/include"))
        );
    }

    #[test]
    fn test_user_paths_first() {
        let config = Config::new()
            .with_include_path("inc")
            .with_include_path("/opt/inc");
        let paths = config.search_paths();
        assert_eq!(paths[0], PathBuf::from("inc"));
        assert_eq!(paths[1], PathBuf::from("/opt/inc"));
        assert!(paths.len() > 2);
    }

    #[test]
    fn test_without_system_includes() {
        let config = Config::new().with_include_path("inc").without_system_includes();
        assert_eq!(config.search_paths(), vec![PathBuf::from("inc")]);
    }

    #[test]
    fn test_allowed_types_replaced() {
        let config = Config::new().with_allowed_types(["int", "unsigned long"]);
        assert!(!config.allowed_types.contains("int64_t"));
        assert!(config.allowed_types.contains("unsigned long"));
    }

    #[test]
    fn test_macros_recorded_in_order() {
        let config = Config::new()
            .with_define("A")
            .with_define("B=2")
            .with_undef("A");
        assert_eq!(config.defines, vec!["A", "B=2"]);
        assert_eq!(config.undefines, vec!["A"]);
    }
}
