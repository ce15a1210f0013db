use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::debug;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::assembler::{Assembler, ConfigUnit};
use crate::config::{CollectionSpec, Environment, Options};
use crate::fs::current_root;
use crate::merge::OptionLayer;
use crate::path_map::{folder_glob, PathMapper};
use crate::source::{GlobLister, Lister};
use crate::template::Template;
use crate::Error;

/// The result of a generator invocation: a single configuration unit, or one
/// unit per non-empty collection, in declared order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Generated {
    Single(ConfigUnit),
    Multiple(Vec<ConfigUnit>),
}

impl Generated {
    pub fn units(&self) -> &[ConfigUnit] {
        match self {
            Self::Single(unit) => std::slice::from_ref(unit),
            Self::Multiple(units) => units,
        }
    }

    pub fn into_units(self) -> Vec<ConfigUnit> {
        match self {
            Self::Single(unit) => vec![unit],
            Self::Multiple(units) => units,
        }
    }
}

/// Produces build configurations for the project rooted at a given
/// directory.
pub struct Generator {
    root: PathBuf,
    env: Environment,
    lister: Box<dyn Lister>,
}

impl Generator {
    /// Constructor. Sources are searched for beneath `root`. Builds are in
    /// development mode until [`Generator::with_environment`] says otherwise.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            lister: Box::new(GlobLister::new(&root)),
            env: Environment::default(),
            root,
        }
    }

    /// A generator for the project in the current working directory.
    pub fn from_current_dir() -> Result<Self, Error> {
        Ok(Self::new(current_root()?))
    }

    pub fn with_environment(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Replaces the file system listing used to discover sources.
    pub fn with_lister<L: Lister + 'static>(mut self, lister: L) -> Self {
        self.lister = Box::new(lister);
        self
    }

    /// Generates using the default template.
    pub fn generate_default(&self, options: JsonValue) -> Result<Generated, Error> {
        self.generate(Template::Default, options)
    }

    /// Generates using the named template, falling back to the default
    /// template if there is no template with that name.
    pub fn generate_named(&self, id: &str, options: JsonValue) -> Result<Generated, Error> {
        self.generate(Template::resolve(id), options)
    }

    /// Generates using the named template, failing if there is no template
    /// with that name.
    pub fn generate_named_strict(&self, id: &str, options: JsonValue) -> Result<Generated, Error> {
        self.generate(id.parse()?, options)
    }

    /// Layers the template's options and then the caller's over the built-in
    /// defaults, and builds a configuration unit per collection.
    pub fn generate(&self, template: Template, options: JsonValue) -> Result<Generated, Error> {
        let caller = OptionLayer::new("caller", options)?;
        self.generate_layered(template, caller)
    }

    /// Like [`Generator::generate`], with the caller's options already in a
    /// layer, e.g. one loaded from a file.
    pub fn generate_layered(
        &self,
        template: Template,
        caller: OptionLayer,
    ) -> Result<Generated, Error> {
        debug!("Generating with template \"{}\"", template);
        let shaped = template.shape(&caller)?;
        let options = Options::from_layers(&[Options::defaults_layer()?, shaped, caller])?;
        let assembler = Assembler::new(&options, self.env, &self.root);

        match &options.collections {
            None => {
                let entries = self.mapper(&options).resolve_folders(&options.folders)?;
                Ok(Generated::Single(assembler.assemble(None, entries, true)?))
            }
            Some(collections) => {
                check_collections(&options, collections)?;
                let mut units = Vec::new();
                for (i, collection) in collections.iter().enumerate() {
                    let mut patterns = collection
                        .folders
                        .iter()
                        .map(|f| folder_glob(f))
                        .collect::<Vec<_>>();
                    patterns.extend(collection.patterns.iter().cloned());
                    let entries = self.mapper(&options).resolve(&patterns)?;
                    if let Some(unit) =
                        assembler.assemble_nonempty(Some(&collection.name), entries, i == 0)?
                    {
                        units.push(unit);
                    }
                }
                Ok(Generated::Multiple(units))
            }
        }
    }

    fn mapper<'a>(&'a self, options: &Options) -> PathMapper<'a> {
        PathMapper::new(self.lister.as_ref(), &self.root)
            .with_rule(options.rewrite.clone())
            .with_collision_policy(options.collision_policy)
            .with_debug_paths(options.debug_paths)
    }
}

fn check_collections(options: &Options, collections: &[CollectionSpec]) -> Result<(), Error> {
    if options.entry.is_some() && collections.len() > 1 {
        return Err(Error::EntryWithCollections(collections.len()));
    }
    let mut seen = HashSet::new();
    for collection in collections {
        if !seen.insert(collection.name.as_str()) {
            return Err(Error::DuplicateCollection(collection.name.clone()));
        }
    }
    Ok(())
}

/// Generates for the current working directory with the default template,
/// in the mode selected by the process environment.
pub fn generate_default(options: JsonValue) -> Result<Generated, Error> {
    Generator::from_current_dir()?
        .with_environment(Environment::from_env())
        .generate_default(options)
}

/// Generates for the current working directory with the named template,
/// falling back to the default template for unknown names. The process
/// environment selects the mode.
pub fn generate_named(id: &str, options: JsonValue) -> Result<Generated, Error> {
    Generator::from_current_dir()?
        .with_environment(Environment::from_env())
        .generate_named(id, options)
}
