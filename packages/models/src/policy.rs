//! Per-step failure policy.
//!
//! Every step of the pipeline maps to exactly one [`FailurePolicy`] in
//! [`PipelineStep::failure_policy`]. Call sites hand their failure to
//! [`PipelineStep::tolerate`] instead of deciding for themselves whether
//! to continue.
//!
//! [`PipelineStep::Geocode`], [`PipelineStep::AssembleRaw`],
//! [`PipelineStep::LocateSnapshot`] and [`PipelineStep::BulkLoad`] produce
//! nothing a later step could run without, so their errors always
//! propagate and the table must keep them at [`FailurePolicy::Abort`].

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// What the pipeline does when a step fails.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FailurePolicy {
    /// Propagate the error and terminate the run.
    Abort,
    /// Log a warning, drop this unit of work, and carry on.
    SkipAndContinue,
    /// Log a warning and carry on with the data unchanged.
    Warn,
}

/// A failure point in the pipeline.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineStep {
    /// Postcode lookup.
    Geocode,
    /// A single month's crime request returned a non-success status.
    FetchMonth,
    /// The category-listing request returned a non-success status.
    FetchCatalog,
    /// Writing the raw snapshot.
    AssembleRaw,
    /// No raw or tidy snapshot could be found.
    LocateSnapshot,
    /// A column the transformer relies on is absent.
    RequireColumn,
    /// `outcome_status_category` is absent when filling nulls.
    FillOutcomeCategory,
    /// A row has more than one category column set.
    OneHotValidation,
    /// A column type has no SQL mapping.
    SchemaMapping,
    /// Any statement of the drop/create/copy/grant sequence.
    BulkLoad,
}

impl PipelineStep {
    /// Every step, in pipeline order.
    pub const ALL: &[Self] = &[
        Self::Geocode,
        Self::FetchMonth,
        Self::FetchCatalog,
        Self::AssembleRaw,
        Self::LocateSnapshot,
        Self::RequireColumn,
        Self::FillOutcomeCategory,
        Self::OneHotValidation,
        Self::SchemaMapping,
        Self::BulkLoad,
    ];

    /// The policy applied when this step fails.
    #[must_use]
    pub const fn failure_policy(self) -> FailurePolicy {
        match self {
            Self::Geocode
            | Self::AssembleRaw
            | Self::LocateSnapshot
            | Self::RequireColumn
            | Self::BulkLoad => FailurePolicy::Abort,
            Self::FetchMonth => FailurePolicy::SkipAndContinue,
            Self::FetchCatalog
            | Self::FillOutcomeCategory
            | Self::OneHotValidation
            | Self::SchemaMapping => FailurePolicy::Warn,
        }
    }

    /// Whether a failure of this step terminates the run.
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(self.failure_policy(), FailurePolicy::Abort)
    }

    /// Applies this step's policy to `err`.
    ///
    /// # Errors
    ///
    /// Returns `err` unchanged if the step is fatal. Otherwise the failure
    /// is logged as a warning and the caller carries on.
    pub fn tolerate<E: std::fmt::Display>(self, err: E) -> Result<(), E> {
        let policy = self.failure_policy();
        if policy == FailurePolicy::Abort {
            return Err(err);
        }
        log::warn!("{self} failed ({policy}): {err}");
        Ok(())
    }
}
