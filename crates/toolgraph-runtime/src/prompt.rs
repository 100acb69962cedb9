//! System Prompt Loading

use std::path::Path;

use toolgraph_core::error::{AgentError, Result};

/// Load a system prompt override from a text file.
///
/// A missing or empty file is a configuration error: a half-configured
/// prompt should fail at startup rather than silently degrade the agent.
pub fn load_system_prompt(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();

    let content = std::fs::read_to_string(path).map_err(|e| {
        AgentError::Config(format!("failed to read system prompt {}: {e}", path.display()))
    })?;

    let content = content.trim();
    if content.is_empty() {
        return Err(AgentError::Config(format!(
            "system prompt file is empty: {}",
            path.display()
        )));
    }

    Ok(content.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_loads_and_trims_prompt() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  You are terse.  ").unwrap();

        let prompt = load_system_prompt(file.path()).unwrap();
        assert_eq!(prompt, "You are terse.");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = load_system_prompt("/nonexistent/prompt.txt").unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }

    #[test]
    fn test_empty_file_is_config_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let err = load_system_prompt(file.path()).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
    }
}
