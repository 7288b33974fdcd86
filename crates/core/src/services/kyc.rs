//! Buyer identity verification (KYC)

use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::error::{ConciergeError, ConciergeResult};
use crate::models::{DocumentKind, KycCase, KycDocument, KycStatus};
use crate::ports::{DocumentVerifier, Repository, VerificationOutcome, VerificationResult};
use crate::types::{BuyerId, KycCaseId};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewKycDocument {
    pub id: String,
    pub kind: DocumentKind,
}

pub struct KycService {
    cases: Arc<dyn Repository<KycCase>>,
    verifier: Arc<dyn DocumentVerifier>,
}

impl KycService {
    pub fn new(cases: Arc<dyn Repository<KycCase>>, verifier: Arc<dyn DocumentVerifier>) -> Self {
        Self { cases, verifier }
    }

    #[instrument(skip(self, documents))]
    pub async fn open_case(
        &self,
        buyer_id: BuyerId,
        documents: Vec<NewKycDocument>,
    ) -> ConciergeResult<KycCase> {
        if documents.is_empty() {
            return Err(ConciergeError::validation("at least one document is required"));
        }
        if documents.iter().any(|d| d.id.trim().is_empty()) {
            return Err(ConciergeError::validation("document id must not be empty"));
        }

        let now = Utc::now();
        let case = KycCase {
            id: KycCaseId::new(),
            buyer_id,
            documents: documents
                .into_iter()
                .map(|d| KycDocument {
                    id: d.id.trim().to_string(),
                    kind: d.kind,
                    verification: None,
                })
                .collect(),
            status: KycStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        self.cases.put(case.clone()).await?;
        info!(kyc_case_id = %case.id, documents = case.documents.len(), "KYC case opened");

        Ok(case)
    }

    pub async fn get(&self, id: KycCaseId) -> ConciergeResult<KycCase> {
        self.cases
            .get(&id)
            .await?
            .ok_or_else(|| ConciergeError::not_found("KycCase", id))
    }

    /// Run every document through the verifier and settle the case status
    #[instrument(skip(self))]
    pub async fn verify(&self, id: KycCaseId) -> ConciergeResult<KycCase> {
        let mut case = self.get(id).await?;

        for document in &mut case.documents {
            document.verification = Some(self.verifier.verify_document(&document.id).await?);
        }
        case.status = settle(
            case.documents
                .iter()
                .filter_map(|d| d.verification.as_ref()),
        );
        case.updated_at = Utc::now();
        self.cases.put(case.clone()).await?;
        info!(kyc_case_id = %id, status = ?case.status, "KYC case verified");

        Ok(case)
    }
}

fn settle<'a>(results: impl Iterator<Item = &'a VerificationResult>) -> KycStatus {
    let mut all_verified = true;
    for result in results {
        match result.outcome {
            VerificationOutcome::Rejected => return KycStatus::Rejected,
            VerificationOutcome::Inconclusive => all_verified = false,
            VerificationOutcome::Verified => {}
        }
    }
    if all_verified {
        KycStatus::Verified
    } else {
        KycStatus::NeedsReview
    }
}
