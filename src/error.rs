use std::{error, fmt};

/**
An error from collecting, configuring, or exporting metrics.
*/
pub struct Error {
    msg: String,
    source: Option<Box<dyn error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(msg: impl fmt::Display, e: impl error::Error + Send + Sync + 'static) -> Self {
        Error {
            msg: msg.to_string(),
            source: Some(Box::new(e)),
        }
    }

    pub fn msg(msg: impl fmt::Display) -> Self {
        Error {
            msg: msg.to_string(),
            source: None,
        }
    }
}

impl From<metrix_otlp::Error> for Error {
    fn from(e: metrix_otlp::Error) -> Self {
        // Displayed as the OTLP error alone
        Error {
            msg: String::new(),
            source: Some(Box::new(e)),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| &**source as &(dyn error::Error + 'static))
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Error")
            .field("msg", &self.msg)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            Some(ref source) if self.msg.is_empty() => fmt::Display::fmt(source, f),
            Some(ref source) => write!(f, "{}: {}", self.msg, source),
            None => f.write_str(&self.msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::error::Error as _;

    #[test]
    fn otlp_errors_keep_their_message() {
        let otlp = metrix_otlp::validate_endpoint("not a url").unwrap_err();
        let expected = otlp.to_string();

        let err = Error::from(otlp);

        assert_eq!(expected, err.to_string());
        assert!(!err.to_string().contains("export"));
        assert!(err.source().is_some());
    }

    #[test]
    fn display_includes_source() {
        let err = Error::new("failed to read config file", fmt::Error);

        assert_eq!(
            format!("failed to read config file: {}", fmt::Error),
            err.to_string()
        );
        assert_eq!(
            "interval must be positive",
            Error::msg("interval must be positive").to_string()
        );
    }
}
