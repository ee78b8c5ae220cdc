//! document sources and recipes
//!
//! A [DocumentSource] builds a base [Template]. A [Recipe] patches an existing one through
//! [Template::add] and [Template::merge], without access to the code that built it. Recipes run
//! strictly in the order given; a later recipe overwrites whatever an earlier one (or the base
//! document) set. There is no conflict detection.
//!
//! Both are plain traits with blanket impls for closures, so any function of the right shape can be
//! used. The [Registry] makes them addressable by name, which is how the CLI picks them.
use crate::error::Result;
use crate::template::Template;
use indexmap::IndexMap;

pub trait DocumentSource {
    fn generate(&self) -> Result<Template>;
}

impl<F> DocumentSource for F
where
    F: Fn() -> Result<Template>,
{
    fn generate(&self) -> Result<Template> {
        self()
    }
}

pub trait Recipe {
    fn apply(&self, template: &mut Template) -> Result<()>;
}

impl<F> Recipe for F
where
    F: Fn(&mut Template) -> Result<()>,
{
    fn apply(&self, template: &mut Template) -> Result<()> {
        self(template)
    }
}

/// Apply `recipes` to `template`, in order
///
/// Stops at the first failing recipe. The template may already contain the changes of the recipes
/// before it.
#[tracing::instrument(level = "debug", skip_all)]
pub fn apply_recipes<'r>(
    template: &mut Template,
    recipes: impl IntoIterator<Item = &'r dyn Recipe>,
) -> Result<()> {
    for (index, recipe) in recipes.into_iter().enumerate() {
        tracing::debug!(index, "apply recipe");
        recipe.apply(template)?;
    }

    Ok(())
}

/// Named document sources and recipes
#[derive(Default, derive_new::new)]
pub struct Registry {
    #[new(default)]
    sources: IndexMap<String, Box<dyn DocumentSource>>,
    #[new(default)]
    recipes: IndexMap<String, Box<dyn Recipe>>,
}

impl Registry {
    pub fn source(mut self, name: impl Into<String>, source: impl DocumentSource + 'static) -> Self {
        self.sources.insert(name.into(), Box::new(source));
        self
    }

    pub fn recipe(mut self, name: impl Into<String>, recipe: impl Recipe + 'static) -> Self {
        self.recipes.insert(name.into(), Box::new(recipe));
        self
    }

    pub fn get_source(&self, name: &str) -> Option<&dyn DocumentSource> {
        self.sources.get(name).map(Box::as_ref)
    }

    pub fn get_recipe(&self, name: &str) -> Option<&dyn Recipe> {
        self.recipes.get(name).map(Box::as_ref)
    }

    pub fn source_names(&self) -> impl Iterator<Item = &str> {
        self.sources.keys().map(String::as_str)
    }

    pub fn recipe_names(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }

    /// Generate document `source` and apply `recipes` to it
    ///
    /// Fails with [RegistryError] for unknown names before anything is generated.
    pub fn build<S: AsRef<str>>(
        &self,
        source: &str,
        recipes: &[S],
    ) -> Result<Template, RegistryError> {
        let document_source = self
            .get_source(source)
            .ok_or_else(|| RegistryError::UnknownSource(source.to_string()))?;

        let recipes = recipes
            .iter()
            .map(|name| {
                self.get_recipe(name.as_ref())
                    .ok_or_else(|| RegistryError::UnknownRecipe(name.as_ref().to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(source, recipes = recipes.len(), "generating document");
        let mut template = document_source.generate()?;
        apply_recipes(&mut template, recipes)?;
        Ok(template)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum RegistryError {
    #[error("no document source named `{0}`")]
    UnknownSource(String),
    #[error("no recipe named `{0}`")]
    UnknownRecipe(String),
    #[error(transparent)]
    Template(#[from] crate::error::Error),
}
