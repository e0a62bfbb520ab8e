//! Shorthands for constructing [`crate::error::TransferError`] at the failure site.

/// Builds a [`crate::error::TransferError`] of the given kind.
///
/// The third argument is rendered into the error detail with `to_string`. Pass
/// `detail = value` instead when the detail is already an owned [`String`]. A trailing
/// `source: err` attaches the underlying error.
#[macro_export]
macro_rules! transfer_error {
    ($kind:expr, $desc:expr) => {
        $crate::error::TransferError::from(($kind, $desc))
    };
    ($kind:expr, $desc:expr, detail = $detail:expr) => {
        $crate::error::TransferError::from(($kind, $desc, $detail))
    };
    ($kind:expr, $desc:expr, $detail:expr) => {
        $crate::error::TransferError::from(($kind, $desc, $detail.to_string()))
    };
    ($kind:expr, $desc:expr, $detail:expr, source: $source:expr) => {
        $crate::error::TransferError::from(($kind, $desc, $detail.to_string()))
            .with_source($source)
    };
}

/// Returns early with a [`crate::error::TransferError`] carrying a rendered detail.
#[macro_export]
macro_rules! bail {
    ($kind:expr, $desc:expr, $detail:expr) => {
        return ::core::result::Result::Err($crate::transfer_error!($kind, $desc, $detail))
    };
}
