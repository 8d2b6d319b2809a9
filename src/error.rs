use std::fmt;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Field or configuration key that caused the error (e.g., "private_key", "voice.name")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., the offending path or value)
    pub details: Option<String>,
    /// Component that raised the error (e.g., "credential_store", "audio_materializer")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the speech pipeline.
///
/// Every variant is terminal for the invocation that raised it; nothing is
/// retried internally.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Credential unavailable: {message}{}", format_context(.context))]
    CredentialUnavailable {
        message: String,
        context: ErrorContext,
    },

    #[error("Credential malformed: {message}{}", format_context(.context))]
    CredentialMalformed {
        message: String,
        context: ErrorContext,
    },

    #[error("Key extraction error: {message}")]
    KeyExtraction { message: String },

    #[error("Token exchange rejected{}: {message}", format_status(.status))]
    TokenExchangeRejected { status: Option<u16>, message: String },

    #[error("Token response malformed: {message}")]
    TokenResponseMalformed { message: String },

    #[error("Synthesis rejected{}: {message}", format_status(.status))]
    SynthesisRejected { status: Option<u16>, message: String },

    #[error("Synthesis response malformed: {message}")]
    SynthesisResponseMalformed { message: String },

    #[error("Audio persist error: {message}{}", format_context(.context))]
    AudioPersist {
        message: String,
        context: ErrorContext,
    },

    #[error("Audio decode error: {message}{}", format_context(.context))]
    AudioDecode {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Runtime error: {message}{}", format_context(.context))]
    Runtime {
        message: String,
        context: ErrorContext,
    },
}

/// Fieldless tag for an [`Error`], used in pipeline state reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    CredentialUnavailable,
    CredentialMalformed,
    KeyExtraction,
    TokenExchangeRejected,
    TokenResponseMalformed,
    SynthesisRejected,
    SynthesisResponseMalformed,
    AudioPersist,
    AudioDecode,
    Configuration,
    Validation,
    Runtime,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CredentialUnavailable => "credential_unavailable",
            Self::CredentialMalformed => "credential_malformed",
            Self::KeyExtraction => "key_extraction",
            Self::TokenExchangeRejected => "token_exchange_rejected",
            Self::TokenResponseMalformed => "token_response_malformed",
            Self::SynthesisRejected => "synthesis_rejected",
            Self::SynthesisResponseMalformed => "synthesis_response_malformed",
            Self::AudioPersist => "audio_persist",
            Self::AudioDecode => "audio_decode",
            Self::Configuration => "configuration",
            Self::Validation => "validation",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (HTTP {})", code),
        None => String::new(),
    }
}

impl Error {
    pub fn credential_unavailable(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::CredentialUnavailable {
            message: msg.into(),
            context,
        }
    }

    pub fn credential_malformed(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::CredentialMalformed {
            message: msg.into(),
            context,
        }
    }

    pub fn audio_persist(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::AudioPersist {
            message: msg.into(),
            context,
        }
    }

    pub fn audio_decode(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::AudioDecode {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new validation error with structured context
    pub fn validation_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Validation {
            message: msg.into(),
            context,
        }
    }

    /// Create a new runtime error with structured context
    pub fn runtime_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Runtime {
            message: msg.into(),
            context,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::CredentialUnavailable { .. } => ErrorKind::CredentialUnavailable,
            Error::CredentialMalformed { .. } => ErrorKind::CredentialMalformed,
            Error::KeyExtraction { .. } => ErrorKind::KeyExtraction,
            Error::TokenExchangeRejected { .. } => ErrorKind::TokenExchangeRejected,
            Error::TokenResponseMalformed { .. } => ErrorKind::TokenResponseMalformed,
            Error::SynthesisRejected { .. } => ErrorKind::SynthesisRejected,
            Error::SynthesisResponseMalformed { .. } => ErrorKind::SynthesisResponseMalformed,
            Error::AudioPersist { .. } => ErrorKind::AudioPersist,
            Error::AudioDecode { .. } => ErrorKind::AudioDecode,
            Error::Configuration { .. } => ErrorKind::Configuration,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Runtime { .. } => ErrorKind::Runtime,
        }
    }

    /// HTTP status reported by a remote endpoint, if the failure got that far.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::TokenExchangeRejected { status, .. } | Error::SynthesisRejected { status, .. } => {
                *status
            }
            _ => None,
        }
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::CredentialUnavailable { context, .. }
            | Error::CredentialMalformed { context, .. }
            | Error::AudioPersist { context, .. }
            | Error::AudioDecode { context, .. }
            | Error::Configuration { context, .. }
            | Error::Validation { context, .. }
            | Error::Runtime { context, .. } => Some(context),
            _ => None,
        }
    }
}
