//! Prompt templates and the reference lists appended to them.

use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::ConfigError;

/// Placeholder in the validation template replaced by the request JSON.
pub const VALIDATION_PLACEHOLDER: &str = "{initial_data_json}";

/// Valid tipsters, houses, sports and bet types, one per line in `CONTEXT_DIR`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextLists {
    pub tipsters: Vec<String>,
    pub houses: Vec<String>,
    pub sports: Vec<String>,
    pub bet_types: Vec<String>,
}

fn read_list(dir: &Path, file: &str) -> Vec<String> {
    match fs::read_to_string(dir.join(file)) {
        Ok(content) => content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && *l != "-")
            .map(str::to_string)
            .collect(),
        Err(_) => {
            warn!("Context file {} not found", dir.join(file).display());
            Vec::new()
        }
    }
}

impl ContextLists {
    /// Missing files yield empty lists.
    pub fn load(dir: &Path) -> Self {
        Self {
            tipsters: read_list(dir, "tipster.txt"),
            houses: read_list(dir, "casas.txt"),
            sports: read_list(dir, "esporte.txt"),
            bet_types: read_list(dir, "tiposDeAposta.txt"),
        }
    }

    /// Reference block for the extraction prompt; the channel name always
    /// leads the tipster list.
    pub fn prompt_block(&self, channel_name: &str) -> String {
        let mut tipsters = vec![channel_name.to_string()];
        tipsters.extend(self.tipsters.iter().filter(|t| *t != channel_name).cloned());

        let mut lines = vec![format!(
            "- Valid tipsters (use the channel name when the post names none): {}",
            tipsters.join(", ")
        )];
        for (label, values) in [
            ("Valid houses", &self.houses),
            ("Valid sports", &self.sports),
            ("Valid bet types", &self.bet_types),
        ] {
            if !values.is_empty() {
                lines.push(format!("- {}: {}", label, values.join(", ")));
            }
        }
        lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PromptSet {
    pub extraction: String,
    pub validation: String,
}

fn read_prompt(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::MissingPrompt {
        path: path.display().to_string(),
        source,
    })
}

impl PromptSet {
    /// Both templates must exist; a missing one is a start-up failure.
    pub fn load(extraction_path: &Path, validation_path: &Path) -> Result<Self, ConfigError> {
        Ok(Self {
            extraction: read_prompt(extraction_path)?,
            validation: read_prompt(validation_path)?,
        })
    }

    pub fn render_validation(&self, request_json: &str) -> String {
        if self.validation.contains(VALIDATION_PLACEHOLDER) {
            self.validation.replace(VALIDATION_PLACEHOLDER, request_json)
        } else {
            format!("{}\n\n{}", self.validation, request_json)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_block() {
        let lists = ContextLists {
            tipsters: vec!["Canal A".to_string(), "Outro".to_string()],
            houses: vec!["Bet365".to_string()],
            sports: vec![],
            bet_types: vec!["Simples".to_string()],
        };
        let block = lists.prompt_block("Canal A");
        assert!(block.starts_with("- Valid tipsters (use the channel name when the post names none): Canal A, Outro"));
        assert!(block.contains("- Valid houses: Bet365"));
        assert!(!block.contains("Valid sports"));
    }

    #[test]
    fn test_missing_prompt_is_fatal() {
        let err = PromptSet::load(Path::new("/nonexistent/a.txt"), Path::new("/nonexistent/b.txt"))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingPrompt { .. }));
    }

    #[test]
    fn test_render_validation() {
        let prompts = PromptSet {
            extraction: String::new(),
            validation: "Dados:\n{initial_data_json}\nFim".to_string(),
        };
        assert_eq!(prompts.render_validation("{}"), "Dados:\n{}\nFim");
    }

    #[test]
    fn test_context_lists_skip_blank_and_dash() {
        let dir = std::env::temp_dir().join(format!("ctx_{}", uuid::Uuid::new_v4().simple()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("tipster.txt"), "Canal A\n\n-\n  Canal B \n").unwrap();
        let lists = ContextLists::load(&dir);
        assert_eq!(lists.tipsters, vec!["Canal A", "Canal B"]);
        assert!(lists.houses.is_empty());
        let _ = fs::remove_dir_all(&dir);
    }
}
