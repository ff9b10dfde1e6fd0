//! Error types with rich diagnostics using miette
//!
//! Markup errors carry byte spans into the layout document. They are
//! collected, never raised: attach the document with
//! [`miette::Report::with_source_code`] to render snippets.

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

// ============================================================================
// Markup Errors
// ============================================================================

/// Problems found while interpreting a layout document.
///
/// The parser records these as diagnostics and skips the offending element.
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum MarkupError {
    #[error("malformed layout document: {message}")]
    #[diagnostic(
        code(parkview::markup::malformed_document),
        help("the layout is treated as not yet available")
    )]
    MalformedDocument {
        message: String,
        #[label("parsing stopped here")]
        span: SourceSpan,
    },

    #[error("invalid `{attribute}` on <{element}>: {reason}")]
    #[diagnostic(code(parkview::markup::invalid_attribute))]
    InvalidAttribute {
        element: String,
        attribute: String,
        value: String,
        reason: String,
        #[label("this element")]
        span: SourceSpan,
    },

    #[error("group nesting deeper than {limit} levels under <{element}>")]
    #[diagnostic(
        code(parkview::markup::group_too_deep),
        help("the element is skipped; flatten the layout's groups")
    )]
    GroupTooDeep {
        element: String,
        limit: usize,
        #[label("search started here")]
        span: SourceSpan,
    },

    #[error("no usable geometry for `{id}`")]
    #[diagnostic(code(parkview::markup::missing_geometry))]
    MissingGeometry {
        id: String,
        #[label("this element")]
        span: SourceSpan,
    },

    #[error("`{id}` is {width}x{height}, outside the plausible spot size")]
    #[diagnostic(code(parkview::markup::implausible_size))]
    ImplausibleSize {
        id: String,
        width: f64,
        height: f64,
        #[label("discarded")]
        span: SourceSpan,
    },

    #[error("capacity section `{name}` not found in the document")]
    #[diagnostic(
        code(parkview::markup::section_not_placed),
        help("expected a group at the section's grid offset or a text label with its name")
    )]
    SectionNotPlaced { name: String },
}

// ============================================================================
// Geometry Errors
// ============================================================================

/// Errors that occur when fitting a document into a render target
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum GeometryError {
    #[error("invalid viewBox size: {width}x{height}")]
    #[diagnostic(code(parkview::geometry::invalid_view_box))]
    InvalidViewBox { width: f64, height: f64 },

    #[error("invalid render target size: {width}x{height}")]
    #[diagnostic(code(parkview::geometry::invalid_target))]
    InvalidTarget { width: f64, height: f64 },
}

// ============================================================================
// Backend Errors
// ============================================================================

/// Failures reported by the remote parking API
#[derive(Error, Diagnostic, Debug)]
pub enum BackendError {
    #[error("session is no longer authenticated")]
    #[diagnostic(code(parkview::backend::unauthorized))]
    Unauthorized,

    #[error("reservation {reservation_id} does not belong to the current user")]
    #[diagnostic(code(parkview::backend::not_owned))]
    NotOwned { reservation_id: String },

    #[error("{what} not found")]
    #[diagnostic(code(parkview::backend::not_found))]
    NotFound { what: String },

    #[error("network failure: {0}")]
    #[diagnostic(code(parkview::backend::network))]
    Network(String),

    #[error("could not decode response")]
    #[diagnostic(code(parkview::backend::decode))]
    Decode(#[from] serde_json::Error),
}

// ============================================================================
// Handoff Errors
// ============================================================================

/// Failures writing or reading the expiration handoff slot
#[derive(Error, Diagnostic, Debug)]
pub enum HandoffError {
    #[error("handoff slot I/O failed")]
    #[diagnostic(code(parkview::handoff::io))]
    Io(#[from] std::io::Error),

    #[error("handoff payload could not be encoded")]
    #[diagnostic(code(parkview::handoff::encode))]
    Encode(#[from] serde_json::Error),
}

// ============================================================================
// Config Errors
// ============================================================================

/// Invalid engine configuration
#[derive(Error, Diagnostic, Debug)]
pub enum ConfigError {
    #[error("could not parse configuration")]
    #[diagnostic(code(parkview::config::parse))]
    Parse(#[from] serde_json::Error),

    #[error("invalid `{field}`: {reason}")]
    #[diagnostic(code(parkview::config::invalid))]
    Invalid { field: &'static str, reason: String },
}

// ============================================================================
// Screen Errors
// ============================================================================

/// Failures while loading a layout onto the screen
#[derive(Error, Diagnostic, Debug)]
pub enum ScreenError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Geometry(#[from] GeometryError),
}
