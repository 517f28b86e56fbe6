// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use core::fmt;

/// Configuration error returned by [`EngineBuilder::build`](crate::EngineBuilder::build).
///
/// An engine cannot reconcile anything without a presentation factory, so
/// callers are expected to treat this as fatal.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuildError {
    /// No [`Presenter`](crate::Presenter) was supplied.
    MissingPresenter,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPresenter => {
                f.write_str("tooltip engine built without a presentation factory")
            }
        }
    }
}

impl core::error::Error for BuildError {}

/// Failure to load or persist a [`FileStore`](crate::FileStore).
#[cfg(feature = "persistence")]
#[derive(Debug)]
pub enum StoreError {
    /// Reading, writing or renaming the backing file failed.
    Io(std::io::Error),
    /// The backing file is not valid JSON for the seen-state format.
    Format(serde_json::Error),
    /// The backing file was written by an incompatible format version.
    UnsupportedVersion {
        /// Version found in the file.
        found: u64,
        /// Version this build reads and writes.
        expected: u64,
    },
}

#[cfg(feature = "persistence")]
impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "seen store i/o failed: {err}"),
            Self::Format(err) => write!(f, "seen store is malformed: {err}"),
            Self::UnsupportedVersion { found, expected } => write!(
                f,
                "unsupported seen store version {found} (expected {expected})"
            ),
        }
    }
}

#[cfg(feature = "persistence")]
impl core::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn core::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Format(err) => Some(err),
            Self::UnsupportedVersion { .. } => None,
        }
    }
}

#[cfg(feature = "persistence")]
impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

#[cfg(feature = "persistence")]
impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Format(err)
    }
}
