//! Role-scoped visibility of ranked documents.
//!
//! Applied after ranking so scores never depend on who is asking.

use super::types::{DocumentRecord, RankedResult, RequesterScope};

pub fn is_visible(scope: &RequesterScope, doc: &DocumentRecord) -> bool {
    match scope {
        RequesterScope::Unrestricted => true,
        RequesterScope::Restricted { branch, semester } => {
            doc.branch == *branch && doc.semester == *semester
        }
    }
}

/// Drop results the requester may not see, keeping the ranked order.
pub fn filter(scope: &RequesterScope, mut results: Vec<RankedResult>) -> Vec<RankedResult> {
    if scope.is_unrestricted() {
        return results;
    }

    results.retain(|result| is_visible(scope, &result.document));
    results
}
