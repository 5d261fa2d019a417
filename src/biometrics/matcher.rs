//! Enrollment and verification for a single modality

use super::digest::SampleHasher;
use super::features::{CaptureSample, Modality};
use super::scorer::{MatchResult, SimilarityScorer};
use super::store::{EnrollmentRecord, EnrollmentStore, StoreError};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MatchError {
    #[error("No {0} enrollment")]
    NoEnrollment(Modality),

    #[error("Empty {0} sample")]
    EmptySample(Modality),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Extractor + store + threshold for one modality
pub struct ModalityMatcher<E> {
    extractor: E,
    store: Arc<dyn EnrollmentStore>,
    threshold: f64,
}

impl<E: SampleHasher> ModalityMatcher<E> {
    pub fn new(extractor: E, store: Arc<dyn EnrollmentStore>, threshold: f64) -> Self {
        Self {
            extractor,
            store,
            threshold,
        }
    }

    pub fn modality(&self) -> Modality {
        self.extractor.modality()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Capture a reference record, replacing any previous one
    pub fn enroll(&self, sample: &E::Sample) -> Result<EnrollmentRecord, MatchError> {
        let modality = self.modality();
        if sample.is_blank() {
            return Err(MatchError::EmptySample(modality));
        }

        let record = EnrollmentRecord::new(
            modality,
            self.extractor.digest(sample),
            self.extractor.extract(sample),
        );
        self.store.put(modality.storage_key(), &record)?;

        log::info!("Enrolled {} modality", modality);
        Ok(record)
    }

    pub fn is_enrolled(&self) -> Result<bool, StoreError> {
        Ok(self.store.get(self.modality().storage_key())?.is_some())
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.store.delete(self.modality().storage_key())
    }

    /// Score a live sample against the stored record.
    ///
    /// A record whose shape does not match this modality is reported as
    /// corrupt without being scored.
    pub fn verify(&self, sample: &E::Sample) -> Result<MatchResult, MatchError> {
        let modality = self.modality();
        if sample.is_blank() {
            return Err(MatchError::EmptySample(modality));
        }

        let record = self
            .store
            .get(modality.storage_key())?
            .ok_or(MatchError::NoEnrollment(modality))?;
        record
            .check_shape(modality)
            .map_err(|detail| MatchError::Store(StoreError::Corrupt(detail)))?;

        let features = self.extractor.extract(sample);
        let digest = self.extractor.digest(sample);
        let similarity =
            SimilarityScorer::score(&features, &record.features, &digest, &record.digest);
        let result = SimilarityScorer::decide(similarity, self.threshold);

        log::info!(
            "{} match: score={:.3} (features={:.3}, digest={:.3}), threshold={:.2}, result={}",
            modality,
            similarity.overall,
            similarity.features,
            similarity.digest,
            self.threshold,
            if result.authenticated { "PASS" } else { "FAIL" }
        );

        Ok(result)
    }
}
