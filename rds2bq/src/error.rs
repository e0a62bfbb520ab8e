//! Error types and result definitions for export and transfer operations.
//!
//! [`TransferError`] carries a classification ([`ErrorKind`]), a static description, optional
//! dynamic detail and source, and the call-site location and backtrace where it was created.
//! Several errors can be aggregated into one, which is how per-table failures of a
//! reconciliation pass are reported together.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

use gcp_bigquery_client::error::BQError;

/// Convenient result type for operations failing with [`TransferError`].
pub type TransferResult<T> = Result<T, TransferError>;

/// Detailed payload stored for single [`TransferError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type of the crate.
///
/// Either a single classified error or an aggregation of several errors, for example one per
/// table that failed to reconcile.
#[derive(Debug, Clone)]
pub struct TransferError {
    repr: ErrorRepr,
}

#[derive(Debug, Clone)]
enum ErrorRepr {
    Single(ErrorPayload),
    Many {
        errors: Vec<TransferError>,
        location: &'static Location<'static>,
    },
}

/// Categories of failures.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Configuration Errors
    ConfigError,

    // Export Metadata Errors
    MalformedMetadata,
    InvalidData,

    // Remote Service Errors
    SnapshotServiceFailed,
    ObjectStorageFailed,
    SecretsProviderFailed,
    WarehouseQueryFailed,
    TransferServiceFailed,
    AuthenticationError,

    // IO & Serialization Errors
    IoError,
    SerializationError,
    DeserializationError,
    ConversionError,

    // Unknown / Uncategorized
    Unknown,
}

impl ErrorKind {
    /// Returns `true` for failures reported by a remote service.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            ErrorKind::SnapshotServiceFailed
                | ErrorKind::ObjectStorageFailed
                | ErrorKind::SecretsProviderFailed
                | ErrorKind::WarehouseQueryFailed
                | ErrorKind::TransferServiceFailed
                | ErrorKind::AuthenticationError
        )
    }
}

impl TransferError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For aggregated errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the aggregation is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error, flattening aggregations.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => {
                errors.iter().flat_map(|err| err.kinds()).collect()
            }
        }
    }

    /// Returns the aggregated errors, or [`None`] for a single error.
    pub fn errors(&self) -> Option<&[TransferError]> {
        match self.repr {
            ErrorRepr::Single(_) => None,
            ErrorRepr::Many { ref errors, .. } => Some(errors),
        }
    }

    /// Returns the dynamic detail, if any.
    ///
    /// For aggregated errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace for a single error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the call-site location where this error was created.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating error and returns the modified instance.
    ///
    /// Has no effect on aggregated errors, which forward their first error as source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }

        self
    }

    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        TransferError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for TransferError {
    fn eq(&self, other: &TransferError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (ErrorRepr::Many { errors: a, .. }, ErrorRepr::Many { errors: b, .. }) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                write_detail(payload.detail.as_deref(), f, 1)?;
                write_backtrace(payload.backtrace.as_ref(), f, 1)
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                for (index, error) in errors.iter().enumerate() {
                    let rendered = error.to_string();
                    let mut lines = rendered.lines();
                    match lines.next() {
                        Some(first_line) => write!(f, "\n  {}. {}", index + 1, first_line)?,
                        None => write!(f, "\n  {}.", index + 1)?,
                    }

                    for line in lines {
                        write!(f, "\n     {line}")?;
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for TransferError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source.as_ref() as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

fn write_backtrace(
    backtrace: &Backtrace,
    f: &mut fmt::Formatter<'_>,
    indent: usize,
) -> fmt::Result {
    let rendered_backtrace = backtrace.to_string();
    if rendered_backtrace.trim().is_empty() || rendered_backtrace.contains("disabled backtrace")
    {
        return Ok(());
    }

    let indent_str = "  ".repeat(indent);
    write!(f, "\n{indent_str}Backtrace:")?;
    for line in rendered_backtrace.lines() {
        write!(f, "\n{indent_str}  {line}")?;
    }

    Ok(())
}

fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
    let Some(detail) = detail else {
        return Ok(());
    };

    let indent_str = "  ".repeat(indent);
    if detail.trim().is_empty() {
        return write!(f, "\n{indent_str}Detail: <empty>");
    }

    write!(f, "\n{indent_str}Detail:")?;
    for line in detail.lines() {
        write!(f, "\n{indent_str}  {line}")?;
    }

    Ok(())
}

/// Creates a [`TransferError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for TransferError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> TransferError {
        TransferError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`TransferError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for TransferError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> TransferError {
        TransferError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Aggregates several errors into one.
///
/// A vector holding exactly one error yields that error unchanged.
impl<E> From<Vec<E>> for TransferError
where
    E: Into<TransferError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> TransferError {
        let location = Location::caller();
        let mut errors: Vec<TransferError> = errors.into_iter().map(Into::into).collect();

        if errors.len() == 1
            && let Some(error) = errors.pop()
        {
            return error;
        }

        TransferError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

impl From<std::io::Error> for TransferError {
    #[track_caller]
    fn from(err: std::io::Error) -> TransferError {
        let detail = err.to_string();
        TransferError::from_components(
            ErrorKind::IoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Maps syntax and data failures to [`ErrorKind::DeserializationError`].
impl From<serde_json::Error> for TransferError {
    #[track_caller]
    fn from(err: serde_json::Error) -> TransferError {
        let (kind, description) = match err.classify() {
            serde_json::error::Category::Io => (ErrorKind::IoError, "JSON I/O operation failed"),
            serde_json::error::Category::Syntax
            | serde_json::error::Category::Data
            | serde_json::error::Category::Eof => (
                ErrorKind::DeserializationError,
                "JSON deserialization failed",
            ),
        };

        let detail = err.to_string();
        TransferError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

impl From<std::string::FromUtf8Error> for TransferError {
    #[track_caller]
    fn from(err: std::string::FromUtf8Error) -> TransferError {
        let detail = err.to_string();
        TransferError::from_components(
            ErrorKind::ConversionError,
            Cow::Borrowed("UTF-8 string conversion failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Maps HTTP client failures to [`ErrorKind::TransferServiceFailed`].
///
/// Body decoding failures are reported as [`ErrorKind::DeserializationError`].
impl From<reqwest::Error> for TransferError {
    #[track_caller]
    fn from(err: reqwest::Error) -> TransferError {
        let (kind, description) = if err.is_decode() {
            (
                ErrorKind::DeserializationError,
                "HTTP response body could not be decoded",
            )
        } else if err.is_status() {
            (
                ErrorKind::TransferServiceFailed,
                "HTTP request returned an error status",
            )
        } else {
            (ErrorKind::TransferServiceFailed, "HTTP request failed")
        };

        let detail = err.to_string();
        TransferError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Classifies BigQuery client failures.
impl From<BQError> for TransferError {
    #[track_caller]
    fn from(err: BQError) -> TransferError {
        let (kind, description) = match &err {
            BQError::InvalidServiceAccountKey(_)
            | BQError::InvalidServiceAccountAuthenticator(_)
            | BQError::AuthError(_)
            | BQError::YupAuthError(_)
            | BQError::NoToken => (
                ErrorKind::AuthenticationError,
                "BigQuery authentication failed",
            ),
            BQError::RequestError(_) => {
                (ErrorKind::WarehouseQueryFailed, "BigQuery request failed")
            }
            BQError::ResponseError { .. } => {
                (ErrorKind::WarehouseQueryFailed, "BigQuery response error")
            }
            BQError::SerializationError(_) => (
                ErrorKind::SerializationError,
                "BigQuery JSON serialization error",
            ),
            _ => (ErrorKind::WarehouseQueryFailed, "BigQuery operation failed"),
        };

        let detail = err.to_string();
        TransferError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}
