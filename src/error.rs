use std::path::PathBuf;

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the application
#[derive(Debug)]
pub enum Error {
    IoError(std::io::Error),
    ParseError { file: PathBuf, message: String },
    /// A doc-comment annotation line that does not follow its grammar
    GrammarError {
        file: PathBuf,
        operation: String,
        line: String,
        message: String,
    },
    InvalidArgument(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "IO 错误: {}", e),
            Error::ParseError { file, message } => {
                write!(f, "解析错误 {}: {}", file.display(), message)
            }
            Error::GrammarError {
                file,
                operation,
                line,
                message,
            } => {
                if operation.is_empty() {
                    write!(f, "注释语法错误 {}: {}: \"{}\"", file.display(), message, line)
                } else {
                    write!(
                        f,
                        "注释语法错误 {} {}(): {}: \"{}\"",
                        file.display(),
                        operation,
                        message,
                        line
                    )
                }
            }
            Error::InvalidArgument(msg) => write!(f, "无效参数: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}
