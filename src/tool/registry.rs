//! Tool registry
//!
//! Built once at startup from the static catalog (one Rust module per
//! category). Every descriptor is strictly validated and indexed by name and
//! category; duplicate names are fatal. After startup the registry is
//! read-only for dispatch; `reload` builds a complete replacement index off
//! to the side and swaps it in atomically, so concurrent dispatches always
//! see either the old index or the new one, never a partial rebuild.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::protocol::Tool;

use super::DxTool;

/// One registered tool with its startup-derived metadata
pub struct RegisteredTool {
    /// Descriptor name (unique)
    pub name: String,
    /// Category tag
    pub category: String,
    /// Rust module the tool was registered from
    pub module_path: &'static str,
    /// Wire-form definition, pre-rendered at build time
    pub wire: Tool,
    /// The behavior object
    pub instance: Arc<dyn DxTool>,
}

/// A catalog entry: the registering module plus a tool instance.
pub type CatalogEntry = (&'static str, Arc<dyn DxTool>);

struct Index {
    by_name: HashMap<String, Arc<RegisteredTool>>,
    /// Names in sorted order
    names: Vec<String>,
    /// Category → sorted tool names
    by_category: BTreeMap<String, Vec<String>>,
}

impl Index {
    fn build(catalog: Vec<CatalogEntry>) -> Result<Self> {
        let mut by_name: HashMap<String, Arc<RegisteredTool>> = HashMap::new();
        let mut by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (module_path, instance) in catalog {
            let descriptor = instance.definition();
            descriptor.validate().map_err(|e| {
                Error::Registry(format!(
                    "Invalid descriptor for tool '{}' ({module_path}): {e}",
                    descriptor.name
                ))
            })?;

            let name = descriptor.name.clone();
            if by_name.contains_key(&name) {
                return Err(Error::Registry(format!(
                    "Duplicate tool name '{name}' (registered again from {module_path})"
                )));
            }

            let category = instance.category().to_string();
            let wire = Tool {
                name: name.clone(),
                description: Some(descriptor.description.clone()),
                input_schema: descriptor.input.to_wire(),
            };

            debug!(tool = %name, category = %category, module = module_path, "Registered tool");

            by_category.entry(category.clone()).or_default().push(name.clone());
            by_name.insert(
                name.clone(),
                Arc::new(RegisteredTool {
                    name,
                    category,
                    module_path,
                    wire,
                    instance,
                }),
            );
        }

        let mut names: Vec<String> = by_name.keys().cloned().collect();
        names.sort();
        for tools in by_category.values_mut() {
            tools.sort();
        }

        Ok(Self {
            by_name,
            names,
            by_category,
        })
    }
}

/// Name- and category-indexed tool lookup
pub struct ToolRegistry {
    index: RwLock<Arc<Index>>,
}

impl fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("names", &self.index.read().names)
            .finish()
    }
}

impl ToolRegistry {
    /// Build the registry from a catalog.
    ///
    /// # Errors
    ///
    /// Fails on the first invalid descriptor or duplicate name; startup must
    /// abort in that case.
    pub fn build(catalog: Vec<CatalogEntry>) -> Result<Self> {
        let index = Index::build(catalog)?;

        for (category, tools) in &index.by_category {
            info!(category = %category, tools = tools.len(), "Tool category ready");
        }
        info!(total = index.names.len(), "Tool registry built");

        Ok(Self {
            index: RwLock::new(Arc::new(index)),
        })
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<Arc<RegisteredTool>> {
        self.index.read().by_name.get(name).cloned()
    }

    /// All tool names, sorted.
    #[must_use]
    pub fn list_names(&self) -> Vec<String> {
        self.index.read().names.clone()
    }

    /// All wire definitions in stable (sorted-name) order.
    #[must_use]
    pub fn all_definitions(&self) -> Vec<Tool> {
        let index = self.index.read();
        index
            .names
            .iter()
            .filter_map(|name| index.by_name.get(name))
            .map(|tool| tool.wire.clone())
            .collect()
    }

    /// Tool counts per category.
    #[must_use]
    pub fn category_counts(&self) -> BTreeMap<String, usize> {
        self.index
            .read()
            .by_category
            .iter()
            .map(|(category, tools)| (category.clone(), tools.len()))
            .collect()
    }

    /// Number of registered tools.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.read().names.len()
    }

    /// True when no tools are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Rebuild from a new catalog and swap the index in atomically.
    ///
    /// In-flight dispatches keep the `Arc` they resolved through and finish
    /// against the old index.
    ///
    /// # Errors
    ///
    /// On failure the existing index is left untouched.
    pub fn reload(&self, catalog: Vec<CatalogEntry>) -> Result<()> {
        let fresh = Index::build(catalog)?;
        *self.index.write() = Arc::new(fresh);
        info!(total = self.len(), "Tool registry reloaded");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::schema::{InputSchema, PropertySchema, ToolDescriptor};
    use crate::tool::{ToolContext, ToolReply};
    use async_trait::async_trait;
    use serde_json::Value;

    struct FakeTool {
        name: &'static str,
        category: &'static str,
    }

    #[async_trait]
    impl DxTool for FakeTool {
        fn category(&self) -> &'static str {
            self.category
        }

        fn definition(&self) -> ToolDescriptor {
            ToolDescriptor::new(
                self.name,
                "A test tool",
                InputSchema::new()
                    .property("caseID", PropertySchema::string("Case handle"))
                    .require(&["caseID"]),
            )
        }

        async fn execute(&self, _arguments: Value, _ctx: &ToolContext) -> ToolReply {
            ToolReply::Content("## ok".to_string())
        }
    }

    fn entry(name: &'static str, category: &'static str) -> CatalogEntry {
        (module_path!(), Arc::new(FakeTool { name, category }))
    }

    // ── Build and lookup ──────────────────────────────────────────────

    #[test]
    fn build_indexes_by_name_and_category() {
        let registry = ToolRegistry::build(vec![
            entry("get_case", "cases"),
            entry("get_assignment", "assignments"),
            entry("create_case", "cases"),
        ])
        .unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(
            registry.list_names(),
            vec!["create_case", "get_assignment", "get_case"]
        );
        assert_eq!(registry.category_counts()["cases"], 2);
        assert!(registry.lookup("get_case").is_some());
        assert!(registry.lookup("nope").is_none());
    }

    #[test]
    fn duplicate_names_are_fatal() {
        let err = ToolRegistry::build(vec![
            entry("get_case", "cases"),
            entry("get_case", "assignments"),
        ])
        .unwrap_err();

        assert!(matches!(err, Error::Registry(_)));
        assert!(err.to_string().contains("Duplicate tool name 'get_case'"));
    }

    #[test]
    fn invalid_descriptor_is_fatal() {
        struct BadTool;

        #[async_trait]
        impl DxTool for BadTool {
            fn category(&self) -> &'static str {
                "broken"
            }
            fn definition(&self) -> ToolDescriptor {
                // Required name that is never declared
                ToolDescriptor::new(
                    "broken_tool",
                    "desc",
                    InputSchema::new().require(&["ghost"]),
                )
            }
            async fn execute(&self, _a: Value, _c: &ToolContext) -> ToolReply {
                ToolReply::Content(String::new())
            }
        }

        let err = ToolRegistry::build(vec![(module_path!(), Arc::new(BadTool))]).unwrap_err();
        assert!(err.to_string().contains("broken_tool"));
    }

    #[test]
    fn definitions_are_stable_and_sorted() {
        let registry =
            ToolRegistry::build(vec![entry("zeta", "z"), entry("alpha", "a")]).unwrap();

        let defs = registry.all_definitions();
        let names: Vec<&str> = defs.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "zeta"]);

        // The wire schema carries the shared sessionCredentials property
        assert!(defs[0].input_schema["properties"]["sessionCredentials"].is_object());
    }

    // ── Reload ────────────────────────────────────────────────────────

    #[test]
    fn reload_swaps_the_index() {
        let registry = ToolRegistry::build(vec![entry("old_tool", "cases")]).unwrap();
        registry.reload(vec![entry("new_tool", "cases")]).unwrap();

        assert!(registry.lookup("old_tool").is_none());
        assert!(registry.lookup("new_tool").is_some());
    }

    #[test]
    fn failed_reload_keeps_the_old_index() {
        let registry = ToolRegistry::build(vec![entry("keeper", "cases")]).unwrap();

        let err = registry
            .reload(vec![entry("dup", "a"), entry("dup", "b")])
            .unwrap_err();
        assert!(matches!(err, Error::Registry(_)));

        // Old index still serves lookups
        assert!(registry.lookup("keeper").is_some());
        assert_eq!(registry.len(), 1);
    }
}
