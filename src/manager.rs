//! Generation manager: turns a recipe into rendered skeleton files

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::info;
use toml::Table;

use crate::recipe::Recipe;
use crate::skel::{
    LangFile, PhpFile, ReadmeFile, RenderedArtifact, SkelError, SkelKind, VersionFile,
};
use crate::template::TemplateRegistry;
use crate::GenerateError;

/// A rendered file, with its path relative to the plugin root
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub content: RenderedArtifact,
}

/// Shared handle over the recipe and the templates used to render it.
///
/// Cloning is cheap; every binding generated by a manager holds a clone.
#[derive(Debug, Clone)]
pub struct Manager {
    inner: Arc<ManagerInner>,
}

#[derive(Debug)]
struct ManagerInner {
    recipe: Recipe,
    registry: TemplateRegistry,
}

impl Manager {
    pub fn new(recipe: Recipe, registry: TemplateRegistry) -> Self {
        Self {
            inner: Arc::new(ManagerInner { recipe, registry }),
        }
    }

    pub fn recipe(&self) -> &Recipe {
        &self.inner.recipe
    }

    pub fn registry(&self) -> &TemplateRegistry {
        &self.inner.registry
    }

    /// Render every file the recipe asks for.
    ///
    /// Order: `version.php`, the language file, `README.md` when enabled,
    /// then the recipe's extra files in declaration order.
    pub fn generate(&self) -> Result<Vec<GeneratedFile>, SkelError> {
        let recipe = self.recipe();
        let mut files = vec![
            self.render_kind::<VersionFile>(VersionFile::PATH, None, None)?,
            self.render_kind::<LangFile>(&LangFile::path(recipe), None, None)?,
        ];

        if recipe.features.readme {
            files.push(self.render_kind::<ReadmeFile>(ReadmeFile::PATH, None, None)?);
        }

        for extra in &recipe.files {
            files.push(self.render_kind::<PhpFile>(
                &extra.path,
                Some(&extra.template),
                Some(&extra.data),
            )?);
        }

        Ok(files)
    }

    fn render_kind<K: SkelKind>(
        &self,
        path: &str,
        template: Option<&str>,
        extra_data: Option<&Table>,
    ) -> Result<GeneratedFile, SkelError> {
        let mut binding = K::binding();
        binding.set_manager(self.clone())?;
        binding.set_log_target(format!("{}::{}", module_path!(), K::NAME));
        if let Some(template) = template {
            binding.set_template(template);
        }

        let mut data = self.recipe().template_data();
        if let Some(extra) = extra_data {
            data.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        binding.set_data(data);
        K::prepare(&mut binding)?;

        let content = binding.render(self.registry())?.clone();
        info!("generated {} ({} bytes)", path, content.len());
        Ok(GeneratedFile {
            path: PathBuf::from(path),
            content,
        })
    }
}

/// Write generated files below `target`, creating directories as needed.
///
/// Existing files are left alone and reported unless `overwrite` is set.
/// Nothing is written if any file would be refused.
pub fn write_files(
    target: &Path,
    files: &[GeneratedFile],
    overwrite: bool,
) -> Result<(), GenerateError> {
    if !overwrite {
        if let Some(existing) = files
            .iter()
            .map(|file| target.join(&file.path))
            .find(|path| path.exists())
        {
            return Err(GenerateError::FileExists { path: existing });
        }
    }

    for file in files {
        let path = target.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| GenerateError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(&path, file.content.as_str()).map_err(|source| GenerateError::Io {
            path: path.clone(),
            source,
        })?;
        info!("wrote {}", path.display());
    }
    Ok(())
}
