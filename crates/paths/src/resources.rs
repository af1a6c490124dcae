//! Resource file resolution
//!
//! Applications ship auxiliary files (templates, reference data) that can be
//! overridden per installation or per user. The resolver searches an ordered
//! list of `resources/` directories — user data (100), app data (200),
//! working directory (300), plus any custom entries — and returns the first
//! hit. Lower priority number wins, mirroring the settings layers.

use crate::Paths;
use std::path::{Path, PathBuf};

/// Ordered search list for resource files.
#[derive(Debug, Clone)]
pub struct ResourceResolver {
    // (directory, priority), kept sorted ascending by priority.
    search_paths: Vec<(PathBuf, u32)>,
}

impl ResourceResolver {
    /// Resolver with the three default roots derived from the resolved
    /// paths.
    pub fn new(paths: &Paths) -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let mut resolver = Self {
            search_paths: vec![
                (paths.usr_data.join("resources"), 100),
                (paths.app_data.join("resources"), 200),
                (cwd.join("resources"), 300),
            ],
        };
        resolver.sort();
        resolver
    }

    fn sort(&mut self) {
        self.search_paths.sort_by_key(|(_, priority)| *priority);
    }

    /// Add a custom search directory. Lower priority numbers are consulted
    /// first; custom paths default to 10, ahead of every standard root.
    pub fn add_path(&mut self, path: impl Into<PathBuf>, priority: u32) {
        self.search_paths.push((path.into(), priority));
        self.sort();
    }

    /// Remove a previously-added directory.
    pub fn remove_path(&mut self, path: &Path) {
        self.search_paths.retain(|(entry, _)| entry != path);
    }

    /// The search list, highest precedence first.
    pub fn search_paths(&self) -> impl Iterator<Item = &Path> {
        self.search_paths.iter().map(|(path, _)| path.as_path())
    }

    /// Locate a resource by name; first hit in priority order wins.
    pub fn resolve(&self, resource: &str) -> Option<PathBuf> {
        for (dir, _) in &self.search_paths {
            let candidate = dir.join(resource);
            if candidate.exists() {
                tracing::info!("returning resource from {:?}", candidate);
                return Some(candidate);
            }
        }
        tracing::error!("resource {resource:?} could not be found");
        None
    }

    /// Read a resource file as UTF-8.
    pub fn load(&self, resource: &str) -> Option<String> {
        let path = self.resolve(resource)?;
        match std::fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(err) => {
                tracing::error!("failed to load resource {:?}: {err}", path);
                None
            }
        }
    }

    /// Write a resource into the highest-precedence directory, creating it
    /// if needed. Returns the written path.
    pub fn save(&self, resource: &str, content: &str) -> Option<PathBuf> {
        let (dir, _) = self.search_paths.first()?;
        if let Err(err) = std::fs::create_dir_all(dir) {
            tracing::error!("failed to create resource directory {:?}: {err}", dir);
            return None;
        }
        let path = dir.join(resource);
        match std::fs::write(&path, content) {
            Ok(()) => {
                tracing::info!("resource saved to {:?}", path);
                Some(path)
            }
            Err(err) => {
                tracing::error!("failed to save resource {resource:?}: {err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paths_in(dir: &Path) -> Paths {
        Paths {
            logging: dir.join("logs"),
            app_data: dir.join("app"),
            usr_data: dir.join("usr"),
            tmp: dir.join("tmp"),
        }
    }

    #[test]
    fn first_hit_in_priority_order_wins() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());

        std::fs::create_dir_all(paths.usr_data.join("resources")).unwrap();
        std::fs::create_dir_all(paths.app_data.join("resources")).unwrap();
        std::fs::write(paths.usr_data.join("resources/template.txt"), "user copy").unwrap();
        std::fs::write(paths.app_data.join("resources/template.txt"), "app copy").unwrap();

        let resolver = ResourceResolver::new(&paths);
        let hit = resolver.resolve("template.txt").unwrap();
        assert_eq!(hit, paths.usr_data.join("resources/template.txt"));
        assert_eq!(resolver.load("template.txt").unwrap(), "user copy");
    }

    #[test]
    fn custom_paths_outrank_the_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());

        std::fs::create_dir_all(paths.usr_data.join("resources")).unwrap();
        std::fs::write(paths.usr_data.join("resources/logo.svg"), "standard").unwrap();

        let custom = dir.path().join("branding");
        std::fs::create_dir_all(&custom).unwrap();
        std::fs::write(custom.join("logo.svg"), "branded").unwrap();

        let mut resolver = ResourceResolver::new(&paths);
        resolver.add_path(&custom, 10);
        assert_eq!(resolver.load("logo.svg").unwrap(), "branded");

        resolver.remove_path(&custom);
        assert_eq!(resolver.load("logo.svg").unwrap(), "standard");
    }

    #[test]
    fn save_targets_the_highest_precedence_root() {
        let dir = tempfile::tempdir().unwrap();
        let paths = paths_in(dir.path());

        let resolver = ResourceResolver::new(&paths);
        let written = resolver.save("generated.txt", "content").unwrap();
        assert!(written.starts_with(paths.usr_data.join("resources")));
        assert_eq!(resolver.load("generated.txt").unwrap(), "content");
    }

    #[test]
    fn missing_resource_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = ResourceResolver::new(&paths_in(dir.path()));
        assert_eq!(resolver.resolve("nope.bin"), None);
        assert_eq!(resolver.load("nope.bin"), None);
    }
}
