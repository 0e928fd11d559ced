use fe_core::FeError;
use fe_results::ResultsError;
use std::path::PathBuf;

pub type IngestResult<T> = Result<T, IngestError>;

#[derive(thiserror::Error, Debug)]
pub enum IngestError {
    #[error("Could not parse {file} ({path}) at line {line}: {context}")]
    Parse {
        file: String,
        path: PathBuf,
        line: usize,
        context: String,
    },

    #[error("{file} references {what} {id}, which is not part of the mesh")]
    MissingMeshReference {
        file: String,
        what: &'static str,
        id: String,
    },

    #[error("The eigenvalue summary in {file} came out empty")]
    EmptyEigenvalueSummary { file: String },

    #[error("No strategy registered for result family {family}")]
    NoStrategy { family: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid listing pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error(transparent)]
    Core(#[from] FeError),
}

impl IngestError {
    /// Maps mesh lookup failures raised while resolving rows of `file`.
    pub fn from_mesh(file: &str, err: ResultsError) -> Self {
        let (what, id) = match err {
            ResultsError::MissingMeshNode { id } => ("mesh node", id.to_string()),
            ResultsError::MissingElement { id } => ("beam element", id.to_string()),
            ResultsError::NodeNotOnElement { element, node } => {
                ("element end node", format!("{node} of element {element}"))
            }
            other => ("mesh entity", other.to_string()),
        };
        IngestError::MissingMeshReference {
            file: file.to_string(),
            what,
            id,
        }
    }
}
