//! JSON-shaped pipeline description: the input to the render system
//! builder.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::errors::{Result, WeaveError};

#[derive(Deserialize)]
struct RawDependency {
    src: String,
    map: Vec<(String, String)>,
}

#[derive(Deserialize)]
struct RawPipelineDescription {
    #[allow(dead_code)]
    name: String,
    graphics_systems: Vec<String>,
    pipeline_order: Vec<String>,
    #[serde(default)]
    flags: FxHashMap<String, Vec<(String, crate::config::ConfigValue)>>,
    #[serde(default)]
    texture_inputs: FxHashMap<String, Vec<RawDependency>>,
    #[serde(default)]
    buffer_inputs: FxHashMap<String, Vec<RawDependency>>,
    #[serde(default)]
    data_inputs: FxHashMap<String, Vec<RawDependency>>,
}

/// One `(src_gs, [(src_output, dst_input)])` dependency entry, with
/// every name already lowercased.
#[derive(Clone, Debug)]
pub struct DependencyEntry {
    pub src_gs: String,
    pub map: Vec<(String, String)>,
}

/// A fully parsed, name-lowercased pipeline description.
pub struct PipelineDescription {
    pub graphics_system_names: BTreeSet<String>,
    pub pipeline_order: Vec<String>,
    pub flags: FxHashMap<String, Vec<(String, crate::config::ConfigValue)>>,
    pub texture_inputs: FxHashMap<String, Vec<DependencyEntry>>,
    pub buffer_inputs: FxHashMap<String, Vec<DependencyEntry>>,
    pub data_inputs: FxHashMap<String, Vec<DependencyEntry>>,
}

fn lower_dep_map(raw: FxHashMap<String, Vec<RawDependency>>) -> FxHashMap<String, Vec<DependencyEntry>> {
    raw.into_iter()
        .map(|(dst, deps)| {
            let deps = deps
                .into_iter()
                .map(|d| DependencyEntry {
                    src_gs: d.src.to_lowercase(),
                    map: d
                        .map
                        .into_iter()
                        .map(|(src_out, dst_in)| (src_out.to_lowercase(), dst_in.to_lowercase()))
                        .collect(),
                })
                .collect();
            (dst.to_lowercase(), deps)
        })
        .collect()
}

impl PipelineDescription {
    /// Parses a pipeline description from JSON text, lowercasing every
    /// graphics-system and key name and validating that
    /// `pipeline_order` is a permutation of `graphics_systems` and that
    /// every dependency source is a known, active GS.
    pub fn parse(json: &str) -> Result<Self> {
        let raw: RawPipelineDescription = serde_json::from_str(json).map_err(WeaveError::PipelineJson)?;

        let graphics_system_names: BTreeSet<String> = raw
            .graphics_systems
            .iter()
            .map(|s| s.to_lowercase())
            .collect();
        let pipeline_order: Vec<String> = raw.pipeline_order.iter().map(|s| s.to_lowercase()).collect();

        for name in &pipeline_order {
            if !graphics_system_names.contains(name) {
                return Err(WeaveError::UnknownGraphicsSystem(name.clone()));
            }
        }

        let flags = raw
            .flags
            .into_iter()
            .map(|(gs, pairs)| (gs.to_lowercase(), pairs))
            .collect();

        let texture_inputs = lower_dep_map(raw.texture_inputs);
        let buffer_inputs = lower_dep_map(raw.buffer_inputs);
        let data_inputs = lower_dep_map(raw.data_inputs);

        let description = Self {
            graphics_system_names,
            pipeline_order,
            flags,
            texture_inputs,
            buffer_inputs,
            data_inputs,
        };
        description.validate_dependency_sources()?;
        Ok(description)
    }

    fn validate_dependency_sources(&self) -> Result<()> {
        for deps_map in [&self.texture_inputs, &self.buffer_inputs, &self.data_inputs] {
            for (dst, deps) in deps_map {
                for dep in deps {
                    if !self.graphics_system_names.contains(&dep.src_gs) {
                        return Err(WeaveError::MissingDependencySource {
                            gs: dst.clone(),
                            src: dep.src_gs.clone(),
                        });
                    }
                }
            }
        }
        Ok(())
    }

    /// The union of producer GS names a given destination GS depends
    /// on, across all three dependency kinds, restricted to active GSs.
    #[must_use]
    pub fn dependencies_of(&self, gs_name: &str) -> rustc_hash::FxHashSet<String> {
        let mut deps = rustc_hash::FxHashSet::default();
        for deps_map in [&self.texture_inputs, &self.buffer_inputs, &self.data_inputs] {
            if let Some(entries) = deps_map.get(gs_name) {
                for entry in entries {
                    if self.graphics_system_names.contains(&entry.src_gs) {
                        deps.insert(entry.src_gs.clone());
                    }
                }
            }
        }
        deps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_description() {
        let json = r#"{
            "name": "test",
            "graphics_systems": ["A", "B"],
            "pipeline_order": ["A", "B"]
        }"#;
        let desc = PipelineDescription::parse(json).unwrap();
        assert_eq!(desc.pipeline_order, vec!["a", "b"]);
    }

    #[test]
    fn unknown_pipeline_order_entry_is_rejected() {
        let json = r#"{
            "name": "test",
            "graphics_systems": ["A"],
            "pipeline_order": ["A", "Ghost"]
        }"#;
        assert!(matches!(
            PipelineDescription::parse(json),
            Err(WeaveError::UnknownGraphicsSystem(_))
        ));
    }

    #[test]
    fn missing_dependency_source_is_rejected() {
        let json = r#"{
            "name": "test",
            "graphics_systems": ["A"],
            "pipeline_order": ["A"],
            "texture_inputs": { "A": [ { "src": "Ghost", "map": [["out", "in"]] } ] }
        }"#;
        assert!(matches!(
            PipelineDescription::parse(json),
            Err(WeaveError::MissingDependencySource { .. })
        ));
    }

    #[test]
    fn dependencies_of_unions_all_three_kinds() {
        let json = r#"{
            "name": "test",
            "graphics_systems": ["A", "B", "C"],
            "pipeline_order": ["A", "B", "C"],
            "texture_inputs": { "C": [ { "src": "A", "map": [["out", "in"]] } ] },
            "buffer_inputs": { "C": [ { "src": "B", "map": [["out", "in"]] } ] }
        }"#;
        let desc = PipelineDescription::parse(json).unwrap();
        let deps = desc.dependencies_of("c");
        assert_eq!(deps.len(), 2);
        assert!(deps.contains("a"));
        assert!(deps.contains("b"));
    }
}
