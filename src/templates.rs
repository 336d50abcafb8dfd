//! Settings templates.
//!
//! A template is a JSON object whose top-level keys are merged over a
//! profile's `settings.json`. Two templates ship inside the binary; users can
//! add or shadow them with `~/.cdp/templates/<name>.json`.

use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use crate::config::write_atomic;
use crate::error::{Entity, Error, IoContext, Result};
use crate::metadata::CLAUDE_SETTINGS_FILE;

const TEMPLATE_EXTENSION: &str = "json";

/// Templates compiled into the binary, in listing order
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    ("permissive", include_str!("templates/permissive.json")),
    ("restrictive", include_str!("templates/restrictive.json")),
];

/// A loaded template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub content: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct TemplateManager {
    custom_dir: PathBuf,
}

impl TemplateManager {
    pub fn new(custom_dir: PathBuf) -> Self {
        Self { custom_dir }
    }

    pub fn custom_dir(&self) -> &Path {
        &self.custom_dir
    }

    /// Built-in names first, then user templates that don't shadow one
    pub fn list_templates(&self) -> Result<Vec<String>> {
        let mut names: Vec<String> = BUILTIN_TEMPLATES
            .iter()
            .map(|(name, _)| name.to_string())
            .collect();

        let entries = match fs::read_dir(&self.custom_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(names),
            Err(e) => {
                return Err(Error::Io {
                    context: format!(
                        "Failed to read templates directory: {}",
                        self.custom_dir.display()
                    ),
                    source: e,
                });
            }
        };

        let mut custom = Vec::new();
        for entry in entries {
            let path = entry
                .io_context(|| format!("Failed to read entry in {}", self.custom_dir.display()))?
                .path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(TEMPLATE_EXTENSION)
            {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str())
                && !names.iter().any(|n| n == stem)
            {
                custom.push(stem.to_string());
            }
        }
        custom.sort();
        names.extend(custom);

        Ok(names)
    }

    /// Load a template; a user file wins over a built-in of the same name
    pub fn load_template(&self, name: &str) -> Result<Template> {
        if name.is_empty() || name.contains(['/', '\\']) || name == ".." {
            return Err(Error::not_found(Entity::Template, name));
        }

        let custom_path = self.custom_path(name);
        let (body, origin) = if custom_path.is_file() {
            let body = fs::read_to_string(&custom_path).io_context(|| {
                format!("Failed to read template: {}", custom_path.display())
            })?;
            (body, custom_path)
        } else {
            let body = BUILTIN_TEMPLATES
                .iter()
                .find(|(builtin, _)| *builtin == name)
                .map(|(_, body)| body.to_string())
                .ok_or_else(|| Error::not_found(Entity::Template, name))?;
            (body, PathBuf::from(format!("<builtin>/{name}.{TEMPLATE_EXTENSION}")))
        };

        let value: Value = serde_json::from_str(&body).map_err(|source| Error::Malformed {
            path: origin.clone(),
            source,
        })?;

        match value {
            Value::Object(content) => Ok(Template {
                name: name.to_string(),
                content,
            }),
            _ => Err(Error::Corrupted {
                name: name.to_string(),
                reason: format!("template {} is not a JSON object", origin.display()),
            }),
        }
    }

    pub fn template_exists(&self, name: &str) -> bool {
        self.load_template(name).is_ok()
    }

    /// Shallow-merge a template into `<profile_path>/settings.json`.
    ///
    /// Template keys replace existing keys wholesale; nested objects are not
    /// merged. A missing or unparseable settings file counts as empty.
    pub fn apply_template(&self, profile_path: &Path, name: &str) -> Result<()> {
        let template = self.load_template(name)?;
        let settings_path = profile_path.join(CLAUDE_SETTINGS_FILE);

        let mut settings = fs::read_to_string(&settings_path)
            .ok()
            .and_then(|body| serde_json::from_str::<Map<String, Value>>(&body).ok())
            .unwrap_or_default();

        for (key, value) in template.content {
            settings.insert(key, value);
        }

        let body = serde_json::to_string_pretty(&Value::Object(settings)).map_err(|source| {
            Error::Malformed {
                path: settings_path.clone(),
                source,
            }
        })?;
        write_atomic(&settings_path, body.as_bytes())?;
        log::debug!("applied template '{name}' to {}", settings_path.display());

        Ok(())
    }

    fn custom_path(&self, name: &str) -> PathBuf {
        self.custom_dir.join(format!("{name}.{TEMPLATE_EXTENSION}"))
    }
}
