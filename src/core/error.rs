// Error taxonomy shared by the compiler, the store transports, and the bindings.
use std::error::Error as StdError;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// Caller-supplied descriptor, option, key, or bin set is malformed.
    Param,
    /// The store rejected or could not complete the request.
    Store,
    /// A returned record could not be converted to the caller's bin mapping.
    Demarshal,
}

/// Store-side status codes surfaced verbatim to callers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusCode {
    Client,
    Param,
    Connection,
    Server,
    RecordNotFound,
    GenerationMismatch,
    RequestInvalid,
    Timeout,
    BinIncompatibleType,
    BinNotFound,
}

impl StatusCode {
    pub fn code(self) -> i32 {
        match self {
            StatusCode::Client => -1,
            StatusCode::Param => -2,
            StatusCode::Connection => -10,
            StatusCode::Server => 1,
            StatusCode::RecordNotFound => 2,
            StatusCode::GenerationMismatch => 3,
            StatusCode::RequestInvalid => 4,
            StatusCode::Timeout => 9,
            StatusCode::BinIncompatibleType => 12,
            StatusCode::BinNotFound => 17,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        let status = match code {
            -1 => StatusCode::Client,
            -2 => StatusCode::Param,
            -10 => StatusCode::Connection,
            1 => StatusCode::Server,
            2 => StatusCode::RecordNotFound,
            3 => StatusCode::GenerationMismatch,
            4 => StatusCode::RequestInvalid,
            9 => StatusCode::Timeout,
            12 => StatusCode::BinIncompatibleType,
            17 => StatusCode::BinNotFound,
            _ => return None,
        };
        Some(status)
    }

    fn default_message(self) -> &'static str {
        match self {
            StatusCode::Client => "client error",
            StatusCode::Param => "invalid parameter",
            StatusCode::Connection => "store connection failed",
            StatusCode::Server => "store error",
            StatusCode::RecordNotFound => "record not found",
            StatusCode::GenerationMismatch => "generation mismatch",
            StatusCode::RequestInvalid => "invalid request",
            StatusCode::Timeout => "timeout",
            StatusCode::BinIncompatibleType => "bin type incompatible with operation",
            StatusCode::BinNotFound => "bin not found",
        }
    }
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    status: Option<StatusCode>,
    message: Option<String>,
    hint: Option<String>,
    bin: Option<String>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            status: None,
            message: None,
            hint: None,
            bin: None,
            source: None,
        }
    }

    /// Shorthand for a store error carrying `status`.
    pub fn store(status: StatusCode) -> Self {
        Self::new(ErrorKind::Store).with_status(status)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    pub fn bin(&self) -> Option<&str> {
        self.bin.as_deref()
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::Store && self.status == Some(StatusCode::RecordNotFound)
    }

    /// Numeric half of the (code, message) pair reported to bindings.
    pub fn code(&self) -> i32 {
        match self.kind {
            ErrorKind::Param => StatusCode::Param.code(),
            ErrorKind::Demarshal => StatusCode::Client.code(),
            ErrorKind::Store => self.status.unwrap_or(StatusCode::Client).code(),
        }
    }

    /// Message half of the (code, message) pair; never empty.
    pub fn describe(&self) -> String {
        if let Some(message) = &self.message {
            return message.clone();
        }
        match self.kind {
            ErrorKind::Param => "invalid parameter".to_string(),
            ErrorKind::Demarshal => "unable to get bins of a record".to_string(),
            ErrorKind::Store => self
                .status
                .unwrap_or(StatusCode::Client)
                .default_message()
                .to_string(),
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn with_bin(mut self, bin: impl Into<String>) -> Self {
        self.bin = Some(bin.into());
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(status) = self.status {
            write!(f, " [{status:?} {}]", status.code())?;
        }
        write!(f, ": {}", self.describe())?;
        if let Some(bin) = &self.bin {
            write!(f, " (bin: {bin})")?;
        }
        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn StdError + 'static))
    }
}

pub fn to_exit_code(err: &Error) -> i32 {
    match (err.kind(), err.status()) {
        (ErrorKind::Param, _) => 2,
        (ErrorKind::Store, Some(StatusCode::RecordNotFound)) => 5,
        (ErrorKind::Store, Some(StatusCode::GenerationMismatch)) => 6,
        (ErrorKind::Store, Some(StatusCode::Timeout)) => 7,
        (ErrorKind::Store, _) => 3,
        (ErrorKind::Demarshal, _) => 4,
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind, StatusCode, to_exit_code};

    #[test]
    fn exit_code_mapping_is_stable() {
        let cases = [
            (Error::new(ErrorKind::Param), 2),
            (Error::store(StatusCode::Server), 3),
            (Error::new(ErrorKind::Demarshal), 4),
            (Error::store(StatusCode::RecordNotFound), 5),
            (Error::store(StatusCode::GenerationMismatch), 6),
            (Error::store(StatusCode::Timeout), 7),
        ];

        for (err, code) in cases {
            assert_eq!(to_exit_code(&err), code);
        }
    }

    #[test]
    fn status_codes_round_trip_through_numeric_form() {
        let all = [
            StatusCode::Client,
            StatusCode::Param,
            StatusCode::Connection,
            StatusCode::Server,
            StatusCode::RecordNotFound,
            StatusCode::GenerationMismatch,
            StatusCode::RequestInvalid,
            StatusCode::Timeout,
            StatusCode::BinIncompatibleType,
            StatusCode::BinNotFound,
        ];
        for status in all {
            assert_eq!(StatusCode::from_code(status.code()), Some(status));
        }
        assert_eq!(StatusCode::from_code(42), None);
    }

    #[test]
    fn code_and_message_pair_follows_kind() {
        let param = Error::new(ErrorKind::Param).with_message("bin name is empty");
        assert_eq!(param.code(), -2);
        assert_eq!(param.describe(), "bin name is empty");

        let demarshal = Error::new(ErrorKind::Demarshal);
        assert_eq!(demarshal.code(), -1);
        assert_eq!(demarshal.describe(), "unable to get bins of a record");

        let missing = Error::store(StatusCode::RecordNotFound);
        assert_eq!(missing.code(), 2);
        assert_eq!(missing.describe(), "record not found");
        assert!(missing.is_not_found());
    }

    #[test]
    fn display_includes_status_and_bin() {
        let err = Error::store(StatusCode::BinNotFound).with_bin("name");
        assert_eq!(err.to_string(), "Store [BinNotFound 17]: bin not found (bin: name)");
    }
}
