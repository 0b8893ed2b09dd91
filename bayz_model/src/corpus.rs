// Training corpus files: a JSON array of token sequences.
//
//     [["C_E_G", "D", "REST"], ["F_A", "G"]]

use std::path::Path;

use crate::error::ModelError;

pub type Corpus = Vec<Vec<String>>;

pub fn load_corpus(path: &Path) -> Result<Corpus, ModelError> {
    let data = std::fs::read_to_string(path)?;
    let corpus: Corpus = serde_json::from_str(&data)?;
    tracing::info!(path = %path.display(), sequences = corpus.len(), "loaded corpus");
    Ok(corpus)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_nested_arrays() {
        let path = std::env::temp_dir().join(format!("bayz_corpus_{}.json", std::process::id()));
        std::fs::write(&path, r#"[["A", "B"], [], ["C_E"]]"#).unwrap();
        let corpus = load_corpus(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(corpus.len(), 3);
        assert_eq!(corpus[0], vec!["A", "B"]);
        assert!(corpus[1].is_empty());
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let result = load_corpus(Path::new("/nonexistent/bayz/corpus.json"));
        assert!(matches!(result, Err(ModelError::Io(_))));
    }
}
