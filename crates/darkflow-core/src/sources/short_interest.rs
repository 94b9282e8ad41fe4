use std::future::Future;
use std::pin::Pin;

use crate::sources::SourceError;
use crate::{ShortInterestSnapshot, Symbol};

/// Standard short-interest statistics for a symbol.
///
/// Best-effort: the pipeline substitutes [`ShortInterestSnapshot::degraded`]
/// for any error, so adapters should not try to paper over failures.
pub trait ShortInterestSource: Send + Sync {
    fn snapshot<'a>(
        &'a self,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<ShortInterestSnapshot, SourceError>> + Send + 'a>>;
}
