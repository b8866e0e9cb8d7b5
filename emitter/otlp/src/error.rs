use std::{error, fmt};

/**
An error encountered building a payload or delivering it to a collector.

HTTP failures carry the status code the collector responded with.
*/
pub struct Error {
    msg: String,
    status_code: Option<u16>,
    source: Option<Box<dyn error::Error + Send + Sync>>,
}

impl Error {
    pub(crate) fn new(msg: impl fmt::Display, e: impl error::Error + Send + Sync + 'static) -> Self {
        Error {
            msg: msg.to_string(),
            status_code: None,
            source: Some(Box::new(e)),
        }
    }

    pub(crate) fn msg(msg: impl fmt::Display) -> Self {
        Error {
            msg: msg.to_string(),
            status_code: None,
            source: None,
        }
    }

    pub(crate) fn http_status(status_code: u16, body: &str) -> Self {
        Error {
            msg: format!("HTTP {status_code}: {body}").trim().to_owned(),
            status_code: Some(status_code),
            source: None,
        }
    }

    /**
    The HTTP status the collector responded with, if it responded at all.
    */
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
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
            .field("status_code", &self.status_code)
            .field("source", &self.source)
            .finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            Some(ref source) => write!(f, "{}: {}", self.msg, source),
            None => f.write_str(&self.msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_message_is_trimmed() {
        let err = Error::http_status(503, "");

        assert_eq!("HTTP 503:", err.to_string());
        assert_eq!(Some(503), err.status_code());

        let err = Error::http_status(400, "bad request\n");

        assert_eq!("HTTP 400: bad request", err.to_string());
    }

    #[test]
    fn source_is_rendered_inline() {
        let err = Error::new(
            "failed to connect TCP stream",
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
        );

        assert_eq!(
            "failed to connect TCP stream: connection refused",
            err.to_string()
        );
        assert_eq!(None, err.status_code());
        assert!(error::Error::source(&err).is_some());
    }
}
