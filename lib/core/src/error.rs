//! Error handling foundation for the atomlab backend.
//!
//! Only the `Result` alias lives here. Each crate defines its own
//! domain-specific error enums and wraps them in a rootcause `Report` on
//! paths where callers benefit from layered context (startup, collaborator
//! calls). Pure verification paths return their error enums directly.

use rootcause::Report;

/// A Result type alias carrying a rootcause `Report` of the given context.
pub type Result<T, C> = std::result::Result<T, Report<C>>;
