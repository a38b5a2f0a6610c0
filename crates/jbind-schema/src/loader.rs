//! Class loaders and namespaces
//!
//! A [`Namespace`] pairs the class registry with the statically known class
//! loaders. Each loader directly supports a set of classes and delegates to a
//! parent; classes no custom loader claims belong to the default (system)
//! loader.
//!
//! Loader indices double as cache partitions: the default loader is
//! partition 0 and custom loaders take `1..=n` in declaration order. The null
//! (bootstrap) loader never owns a declared class and has no partition.

use crate::class::ClassDescriptor;
use crate::error::SchemaError;
use crate::registry::{ClassIdx, ClassRegistry};
use rustc_hash::FxHashMap;
use std::fmt;

/// Identity of a loader inside a namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LoaderId {
    /// The bootstrap loader sentinel
    Null,
    /// The process-wide system loader
    Default,
    /// A declared loader, by position in the namespace
    Custom(u16),
}

impl LoaderId {
    /// Cache partition used for identifiers resolved under this loader
    pub fn cache_index(self) -> Option<usize> {
        match self {
            LoaderId::Null => None,
            LoaderId::Default => Some(0),
            LoaderId::Custom(i) => Some(i as usize + 1),
        }
    }

    /// Check if this is a declared loader
    pub fn is_custom(self) -> bool {
        matches!(self, LoaderId::Custom(_))
    }
}

impl fmt::Display for LoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoaderId::Null => write!(f, "<null>"),
            LoaderId::Default => write!(f, "<default>"),
            LoaderId::Custom(i) => write!(f, "loader#{}", i),
        }
    }
}

/// Parent of a declared loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderParent {
    /// Bootstrap loader
    Null,
    /// System loader
    Default,
    /// Another declared loader, by name
    Named(String),
}

/// Declaration of one custom class loader
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLoaderDescriptor {
    /// Loader name (unique in the namespace)
    pub name: String,
    /// Delegation parent
    pub parent: LoaderParent,
    /// Classes this loader defines directly
    pub classes: Vec<String>,
}

impl ClassLoaderDescriptor {
    /// Declare a loader
    pub fn new(name: impl Into<String>, parent: LoaderParent) -> Self {
        Self {
            name: name.into(),
            parent,
            classes: Vec::new(),
        }
    }

    /// Add a directly supported class
    pub fn supports(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Check if the class is in this loader's direct set
    pub fn defines(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// Builder for [`Namespace`]
#[derive(Debug, Clone, Default)]
pub struct NamespaceBuilder {
    classes: Vec<ClassDescriptor>,
    loaders: Vec<ClassLoaderDescriptor>,
}

impl NamespaceBuilder {
    /// Declare a class
    pub fn class(mut self, class: ClassDescriptor) -> Self {
        self.classes.push(class);
        self
    }

    /// Declare several classes
    pub fn classes(mut self, classes: impl IntoIterator<Item = ClassDescriptor>) -> Self {
        self.classes.extend(classes);
        self
    }

    /// Declare a custom loader
    pub fn loader(mut self, loader: ClassLoaderDescriptor) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Validate and freeze the namespace
    pub fn build(self) -> Result<Namespace, SchemaError> {
        let registry = ClassRegistry::build(self.classes)?;
        let loaders = self.loaders;

        let mut by_name: FxHashMap<String, LoaderId> = FxHashMap::default();
        for (i, loader) in loaders.iter().enumerate() {
            if by_name.insert(loader.name.clone(), LoaderId::Custom(i as u16)).is_some() {
                return Err(SchemaError::DuplicateLoader {
                    name: loader.name.clone(),
                });
            }
        }

        let mut parents = Vec::with_capacity(loaders.len());
        for loader in &loaders {
            let parent = match &loader.parent {
                LoaderParent::Null => LoaderId::Null,
                LoaderParent::Default => LoaderId::Default,
                LoaderParent::Named(name) => {
                    *by_name.get(name).ok_or_else(|| SchemaError::UnknownLoader { name: name.clone() })?
                }
            };
            parents.push(parent);
        }

        let mut owners: FxHashMap<String, LoaderId> = FxHashMap::default();
        for (i, loader) in loaders.iter().enumerate() {
            for class in &loader.classes {
                registry.class(class)?;
                if let Some(LoaderId::Custom(first)) = owners.get(class) {
                    return Err(SchemaError::ClassInMultipleLoaders {
                        class: class.clone(),
                        first: loaders[*first as usize].name.clone(),
                        second: loader.name.clone(),
                    });
                }
                owners.insert(class.clone(), LoaderId::Custom(i as u16));
            }
        }

        let namespace = Namespace {
            registry,
            loaders,
            parents,
            by_name,
            owners,
        };
        namespace.check_chains()?;
        Ok(namespace)
    }
}

/// Frozen set of classes and loaders
#[derive(Debug, Clone)]
pub struct Namespace {
    registry: ClassRegistry,
    loaders: Vec<ClassLoaderDescriptor>,
    parents: Vec<LoaderId>,
    by_name: FxHashMap<String, LoaderId>,
    owners: FxHashMap<String, LoaderId>,
}

impl Namespace {
    /// Start declaring a namespace
    pub fn builder() -> NamespaceBuilder {
        NamespaceBuilder::default()
    }

    fn check_chains(&self) -> Result<(), SchemaError> {
        for start in 0..self.loaders.len() {
            let mut seen = vec![start];
            let mut current = self.parents[start];
            while let LoaderId::Custom(i) = current {
                let i = i as usize;
                if seen.contains(&i) {
                    let mut names: Vec<&str> = seen.iter().map(|s| self.loaders[*s].name.as_str()).collect();
                    names.push(&self.loaders[i].name);
                    return Err(SchemaError::CircularLoaderChain {
                        cycle: names.join(" -> "),
                    });
                }
                seen.push(i);
                current = self.parents[i];
            }
        }
        Ok(())
    }

    /// Declared classes
    pub fn registry(&self) -> &ClassRegistry {
        &self.registry
    }

    /// Declared loaders in index order
    pub fn loaders(&self) -> &[ClassLoaderDescriptor] {
        &self.loaders
    }

    /// Look up a loader by name
    pub fn loader_id(&self, name: &str) -> Option<LoaderId> {
        self.by_name.get(name).copied()
    }

    /// Get the descriptor of a custom loader
    pub fn loader(&self, id: LoaderId) -> Option<&ClassLoaderDescriptor> {
        match id {
            LoaderId::Custom(i) => self.loaders.get(i as usize),
            _ => None,
        }
    }

    /// Human-readable loader name
    pub fn loader_name(&self, id: LoaderId) -> String {
        match self.loader(id) {
            Some(loader) => loader.name.clone(),
            None => id.to_string(),
        }
    }

    /// Delegation parent of a loader; the sentinels have none
    pub fn parent_of(&self, id: LoaderId) -> Option<LoaderId> {
        match id {
            LoaderId::Custom(i) => self.parents.get(i as usize).copied(),
            _ => None,
        }
    }

    /// The loader followed by its delegation parents
    pub fn chain(&self, id: LoaderId) -> impl Iterator<Item = LoaderId> + '_ {
        let mut current = Some(id);
        std::iter::from_fn(move || {
            let id = current?;
            current = self.parent_of(id);
            Some(id)
        })
    }

    /// Loader that owns a class: the custom loader whose direct set lists
    /// it, or the default loader
    pub fn owning_loader(&self, class: &str) -> LoaderId {
        self.owners.get(class).copied().unwrap_or(LoaderId::Default)
    }

    /// Resolve a class as seen from `loader`.
    ///
    /// Walks the loader then its parents and returns the first one defining
    /// the class. A chain ending at a sentinel falls back to the default
    /// loader, unless the class is claimed by a custom loader the chain never
    /// visited.
    pub fn owning_loader_from(&self, loader: LoaderId, class: &str) -> Result<LoaderId, SchemaError> {
        let owner = self.owning_loader(class);
        if owner == LoaderId::Default || self.chain(loader).any(|l| l == owner) {
            return Ok(owner);
        }
        Err(SchemaError::ClassUnreachable {
            class: class.to_string(),
            loader: self.loader_name(loader),
        })
    }

    /// Parent hops from `loader` to the loader that defines `class`.
    ///
    /// `None` when the class falls back to the system loader or is not
    /// reachable from `loader` at all.
    pub fn ancestor_depth_index(&self, class: &str, loader: LoaderId) -> Option<usize> {
        let owner = self.owning_loader(class);
        if owner == LoaderId::Default {
            return None;
        }
        self.chain(loader).position(|l| l == owner)
    }

    /// Check whether an object loaded under `loader` may stand in for a
    /// parameter of class `class`
    pub fn is_visible_from(&self, class: &str, loader: LoaderId) -> bool {
        self.owning_loader_from(loader, class).is_ok()
    }

    /// Look up a class by name together with its owning loader
    pub fn resolve_class(&self, name: &str) -> Result<(ClassIdx, LoaderId), SchemaError> {
        let (idx, _) = self.registry.class(name)?;
        Ok((idx, self.owning_loader(name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plugin_namespace() -> Namespace {
        Namespace::builder()
            .class(ClassDescriptor::new("host/HostClass"))
            .class(ClassDescriptor::new("plugin/PluginClass"))
            .class(ClassDescriptor::new("plugin/Extension"))
            .loader(ClassLoaderDescriptor::new("Plugin", LoaderParent::Null).supports("plugin/PluginClass"))
            .loader(
                ClassLoaderDescriptor::new("Extension", LoaderParent::Named("Plugin".to_string()))
                    .supports("plugin/Extension"),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_cache_indices() {
        assert_eq!(LoaderId::Default.cache_index(), Some(0));
        assert_eq!(LoaderId::Custom(0).cache_index(), Some(1));
        assert_eq!(LoaderId::Custom(4).cache_index(), Some(5));
        assert_eq!(LoaderId::Null.cache_index(), None);
    }

    #[test]
    fn test_owning_loader() {
        let ns = plugin_namespace();
        assert_eq!(ns.owning_loader("host/HostClass"), LoaderId::Default);
        assert_eq!(ns.owning_loader("plugin/PluginClass"), LoaderId::Custom(0));
        assert_eq!(ns.owning_loader("opaque/Undeclared"), LoaderId::Default);
    }

    #[test]
    fn test_owning_loader_from_walks_parents() {
        let ns = plugin_namespace();
        let ext = ns.loader_id("Extension").unwrap();
        let plugin = ns.loader_id("Plugin").unwrap();

        assert_eq!(ns.owning_loader_from(ext, "plugin/Extension").unwrap(), ext);
        assert_eq!(ns.owning_loader_from(ext, "plugin/PluginClass").unwrap(), plugin);
        assert_eq!(ns.owning_loader_from(ext, "host/HostClass").unwrap(), LoaderId::Default);
        assert!(matches!(
            ns.owning_loader_from(plugin, "plugin/Extension"),
            Err(SchemaError::ClassUnreachable { .. })
        ));
    }

    #[test]
    fn test_null_parent_falls_back_to_system() {
        let ns = plugin_namespace();
        let plugin = ns.loader_id("Plugin").unwrap();
        assert_eq!(ns.parent_of(plugin), Some(LoaderId::Null));
        assert_eq!(ns.owning_loader_from(plugin, "host/HostClass").unwrap(), LoaderId::Default);
        assert_eq!(ns.owning_loader_from(LoaderId::Null, "host/HostClass").unwrap(), LoaderId::Default);
    }

    #[test]
    fn test_ancestor_depth_index() {
        let ns = plugin_namespace();
        let ext = ns.loader_id("Extension").unwrap();
        assert_eq!(ns.ancestor_depth_index("plugin/Extension", ext), Some(0));
        assert_eq!(ns.ancestor_depth_index("plugin/PluginClass", ext), Some(1));
        assert_eq!(ns.ancestor_depth_index("host/HostClass", ext), None);
    }

    #[test]
    fn test_visibility() {
        let ns = plugin_namespace();
        let ext = ns.loader_id("Extension").unwrap();
        assert!(ns.is_visible_from("plugin/PluginClass", ext));
        assert!(ns.is_visible_from("host/HostClass", LoaderId::Default));
        assert!(!ns.is_visible_from("plugin/PluginClass", LoaderId::Default));
    }

    #[test]
    fn test_class_in_two_loaders() {
        let err = Namespace::builder()
            .class(ClassDescriptor::new("A"))
            .loader(ClassLoaderDescriptor::new("L1", LoaderParent::Default).supports("A"))
            .loader(ClassLoaderDescriptor::new("L2", LoaderParent::Default).supports("A"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::ClassInMultipleLoaders {
                class: "A".to_string(),
                first: "L1".to_string(),
                second: "L2".to_string(),
            }
        );
    }

    #[test]
    fn test_loader_validation() {
        let unknown = Namespace::builder()
            .loader(ClassLoaderDescriptor::new("L", LoaderParent::Named("Missing".to_string())))
            .build()
            .unwrap_err();
        assert!(matches!(unknown, SchemaError::UnknownLoader { .. }));

        let cycle = Namespace::builder()
            .loader(ClassLoaderDescriptor::new("A", LoaderParent::Named("B".to_string())))
            .loader(ClassLoaderDescriptor::new("B", LoaderParent::Named("A".to_string())))
            .build()
            .unwrap_err();
        assert!(matches!(cycle, SchemaError::CircularLoaderChain { .. }));

        let dup = Namespace::builder()
            .loader(ClassLoaderDescriptor::new("A", LoaderParent::Null))
            .loader(ClassLoaderDescriptor::new("A", LoaderParent::Null))
            .build()
            .unwrap_err();
        assert!(matches!(dup, SchemaError::DuplicateLoader { .. }));

        let undeclared = Namespace::builder()
            .loader(ClassLoaderDescriptor::new("A", LoaderParent::Null).supports("x/Missing"))
            .build()
            .unwrap_err();
        assert!(matches!(undeclared, SchemaError::UnknownClass { .. }));
    }
}
